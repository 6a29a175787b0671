mod auth;
mod network;
mod task_lock;
mod usecase;

use std::result::Result as DefaultResult;
use std::sync::Arc;

use chrono::{DateTime, FixedOffset};

use erp_common::confidentiality::AbstractConfidentiality;
use erp_common::config::{AppBasepathCfg, AppCfgHardLimit, AppConfig, AppInMemoryDbCfg};
use erp_common::error::AppConfidentialityError;
use erp_common::logging::AppLogContext;

use inventory::constant::hard_limit;
use inventory::datastore::{AbstInMemoryDStore, AppInMemoryDStore};
use inventory::model::{NameXModel, ProductBarcodeModel, StagingRowModel};
use inventory::AppSharedState;

pub(crate) const EXAMPLE_REL_PATH: &str = "/tests/unit/examples/";
pub(crate) const UT_SHOP_ID: &str = "shop-a8v2";
pub(crate) const UT_USERNAME: &str = "maria_w";

pub(crate) fn ut_example_path() -> String {
    env!("CARGO_MANIFEST_DIR").to_string() + EXAMPLE_REL_PATH
}

pub(crate) fn ut_setup_config(cfg_fname: &str) -> AppConfig {
    let basepath = ut_example_path();
    let limit = AppCfgHardLimit {
        nitems_per_inmem_table: hard_limit::MAX_ITEMS_STORED_PER_MODEL,
        num_db_conns: hard_limit::MAX_DB_CONNECTIONS,
        seconds_db_idle: hard_limit::MAX_SECONDS_DB_IDLE,
        max_import_chunk: hard_limit::MAX_IMPORT_CHUNK,
    };
    let fullpath = basepath.clone() + cfg_fname;
    AppConfig {
        api_server: AppConfig::parse_from_file(fullpath, limit).unwrap(),
        basepath: AppBasepathCfg {
            system: basepath.clone(),
            service: basepath,
        },
    }
}

pub(crate) fn ut_setup_share_state(
    cfg_fname: &str,
    cfdntl: Box<dyn AbstractConfidentiality>,
) -> AppSharedState {
    let cfg = ut_setup_config(cfg_fname);
    let logctx = AppLogContext::new(&cfg.basepath, &cfg.api_server.logging);
    AppSharedState::new(cfg, logctx, cfdntl).unwrap()
}

pub(crate) fn ut_setup_logctx() -> Arc<AppLogContext> {
    let cfg = ut_setup_config("config_ok.json");
    Arc::new(AppLogContext::new(&cfg.basepath, &cfg.api_server.logging))
}

pub(crate) fn ut_inmem_dstore(max_items: u32) -> Arc<Box<dyn AbstInMemoryDStore>> {
    let cfg = AppInMemoryDbCfg {
        alias: "utest".to_string(),
        max_items,
    };
    let obj: Box<dyn AbstInMemoryDStore> = Box::new(AppInMemoryDStore::new(&cfg));
    Arc::new(obj)
}

pub(crate) fn ut_time(s: &str) -> DateTime<FixedOffset> {
    DateTime::parse_from_rfc3339(s).unwrap()
}

pub(crate) fn ut_staging_row(
    task_id: &str,
    guid: &str,
    row_number: u32,
    barcode: &str,
    qty: f64,
    sum_amount: f64,
) -> StagingRowModel {
    StagingRowModel {
        shop_id: UT_SHOP_ID.to_string(),
        task_id: task_id.to_string(),
        guid: guid.to_string(),
        row_number,
        barcode: barcode.to_string(),
        name: format!("item {barcode}"),
        unit_code: "PCS".to_string(),
        warehouse_code: "WH01".to_string(),
        shelf_code: "S-3".to_string(),
        qty,
        price: StagingRowModel::derive_price(qty, sum_amount),
        sum_amount,
        is_not_exist: false,
        created_by: UT_USERNAME.to_string(),
        created_at: ut_time("2024-03-11T09:15:00+07:00"),
    }
}

pub(crate) fn ut_product(barcode: &str, item_code: &str) -> ProductBarcodeModel {
    ProductBarcodeModel {
        item_code: item_code.to_string(),
        barcode: barcode.to_string(),
        names: vec![
            NameXModel {
                code: "en".to_string(),
                name: format!("product {item_code}"),
            },
            NameXModel {
                code: "th".to_string(),
                name: format!("สินค้า {item_code}"),
            },
        ],
        item_unit_code: "PCS".to_string(),
        item_unit_names: vec![NameXModel {
            code: "en".to_string(),
            name: "piece".to_string(),
        }],
        divide_value: 1.0,
        stand_value: 1.0,
        item_type: 0,
        tax_type: 1,
        vat_type: 1,
        vat_cal: 0,
    }
}

struct MockConfidential {}

impl AbstractConfidentiality for MockConfidential {
    fn try_get_payload(&self, _id: &str) -> DefaultResult<String, AppConfidentialityError> {
        Ok("unit-test".to_string())
    }
}
