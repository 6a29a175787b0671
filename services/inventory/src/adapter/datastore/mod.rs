mod in_mem;
mod sql_db;

use std::boxed::Box;
use std::sync::Arc;

use erp_common::confidentiality::AbstractConfidentiality;
use erp_common::config::{AppDataStoreCfg, AppDbServerCfg, AppInMemoryDbCfg};
use erp_common::logging::{app_log_event, AppLogContext, AppLogLevel};

pub use in_mem::{
    AbsDStoreFilterKeyOp, AbstInMemoryDStore, AppInMemDeleteInfo, AppInMemFetchKeys,
    AppInMemFetchedSingleTable, AppInMemUpdateData, AppInMemoryDStore,
};
pub use sql_db::AppMariaDbStore;

/// Storage backends holding staging rows, product barcodes, stock-balance
/// documents and outbox events. Repositories pick the in-memory store or
/// one of the database pools, see `repository::app_repo_staging`
pub(crate) struct InventoryDataStores {
    pub in_mem: Option<Box<dyn AbstInMemoryDStore>>,
    pub sql_dbs: Option<Vec<AppMariaDbStore>>,
}

fn init_inmem_store(cfg: &AppInMemoryDbCfg) -> Box<dyn AbstInMemoryDStore> {
    Box::new(AppInMemoryDStore::new(cfg))
}

fn init_db_pools(
    logctx: &Arc<AppLogContext>,
    cfgs: Vec<&AppDbServerCfg>,
    confidential: &Arc<Box<dyn AbstractConfidentiality>>,
) -> Option<Vec<AppMariaDbStore>> {
    if cfgs.is_empty() {
        return None;
    }
    // a server failing to build is skipped, the import endpoints report
    // missing storage when no pool is left
    let pools = cfgs
        .into_iter()
        .filter_map(|srv| match AppMariaDbStore::try_build(srv, confidential.clone()) {
            Ok(pool) => Some(pool),
            Err(e) => {
                app_log_event!(logctx, AppLogLevel::ERROR, "db-alias:{}, {}", srv.alias, e);
                None
            }
        })
        .collect::<Vec<_>>();
    Some(pools)
}

pub(crate) fn build_context(
    logctx: Arc<AppLogContext>,
    cfgs: &[AppDataStoreCfg],
    confidential: Arc<Box<dyn AbstractConfidentiality>>,
) -> InventoryDataStores {
    // only the last in-memory entry takes effect
    let in_mem = cfgs
        .iter()
        .filter_map(|c| match c {
            AppDataStoreCfg::InMemory(d) => Some(d),
            _others => None,
        })
        .last()
        .map(init_inmem_store);
    let db_cfgs = cfgs
        .iter()
        .filter_map(|c| match c {
            AppDataStoreCfg::DbServer(d) => Some(d),
            _others => None,
        })
        .collect::<Vec<_>>();
    let sql_dbs = init_db_pools(&logctx, db_cfgs, &confidential);
    InventoryDataStores { in_mem, sql_dbs }
} // end of fn build_context
