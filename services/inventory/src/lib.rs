use std::boxed::Box;
use std::result::Result as DefaultResult;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use rand::distributions::{Alphanumeric, DistString};
use uuid::{Builder, NoContext, Timestamp, Uuid};

use erp_common::confidentiality::AbstractConfidentiality;
use erp_common::config::AppConfig;
use erp_common::logging::AppLogContext;

pub mod api;
pub mod constant;
pub mod error;
pub mod model;
pub mod network;
pub mod repository;
pub mod usecase;

mod adapter;
pub use adapter::datastore;

mod auth;
pub use auth::{AbstractAuthKeystore, AppAuthKeystore, AppAuthedClaim, AppKeystoreRefreshResult};

mod rpc;
pub use rpc::{AbstractEventPublisher, AppEventMessage};

mod task_lock;
pub use task_lock::{AppTaskLockGuard, AppTaskLockTable};

use constant::app_meta;
use error::AppError;

type WebApiHdlrLabel = &'static str;

pub struct AppDataStoreContext {
    pub in_mem: Option<Arc<Box<dyn datastore::AbstInMemoryDStore>>>,
    pub sql_dbs: Option<Vec<Arc<datastore::AppMariaDbStore>>>,
}

// global state shared by all threads
pub struct AppSharedState {
    _cfg: Arc<AppConfig>,
    _log: Arc<AppLogContext>,
    _publisher: Arc<Box<dyn AbstractEventPublisher>>,
    dstore: Arc<AppDataStoreContext>,
    _auth_keys: Arc<Box<dyn AbstractAuthKeystore>>,
    _task_locks: Arc<AppTaskLockTable>,
    _shutdown: Arc<AtomicBool>,
}

impl AppSharedState {
    pub fn new(
        cfg: AppConfig,
        log: AppLogContext,
        confidential: Box<dyn AbstractConfidentiality>,
    ) -> DefaultResult<Self, AppError> {
        let confidential = Arc::new(confidential);
        let log = Arc::new(log);
        let publisher = rpc::build_context(&cfg.api_server.rpc, log.clone(), confidential.clone())?;
        let stores = datastore::build_context(log.clone(), &cfg.api_server.data_store, confidential);
        let in_mem = stores.in_mem.map(Arc::new);
        let sql_dbs = stores.sql_dbs.map(|m| m.into_iter().map(Arc::new).collect());
        let ds_ctx = Arc::new(AppDataStoreContext { in_mem, sql_dbs });
        let auth_keys = AppAuthKeystore::new(&cfg.api_server.auth, cfg.basepath.system.as_str());
        Ok(Self {
            _cfg: Arc::new(cfg),
            _log: log,
            _publisher: Arc::new(publisher),
            dstore: ds_ctx,
            _auth_keys: Arc::new(Box::new(auth_keys)),
            _task_locks: Arc::new(AppTaskLockTable::new()),
            _shutdown: Arc::new(AtomicBool::new(false)),
        })
    } // end of fn new

    pub fn config(&self) -> &Arc<AppConfig> {
        &self._cfg
    }

    pub fn log_context(&self) -> &Arc<AppLogContext> {
        &self._log
    }

    pub fn publisher(&self) -> Arc<Box<dyn AbstractEventPublisher>> {
        self._publisher.clone()
    }

    pub fn datastore(&self) -> Arc<AppDataStoreContext> {
        self.dstore.clone()
    }

    pub fn auth_keystore(&self) -> Arc<Box<dyn AbstractAuthKeystore>> {
        self._auth_keys.clone()
    }

    pub fn task_locks(&self) -> Arc<AppTaskLockTable> {
        self._task_locks.clone()
    }

    pub fn shutdown(&self) -> Arc<AtomicBool> {
        self._shutdown.clone()
    }
} // end of impl AppSharedState

impl Clone for AppSharedState {
    fn clone(&self) -> Self {
        Self {
            _cfg: self._cfg.clone(),
            _log: self._log.clone(),
            _publisher: self._publisher.clone(),
            dstore: self.dstore.clone(),
            _auth_keys: self._auth_keys.clone(),
            _task_locks: self._task_locks.clone(),
            _shutdown: self._shutdown.clone(),
        }
    }
}

fn generate_custom_uid(machine_code: u8) -> Uuid {
    // UUIDv7 is for single-node application. This app needs to consider
    // scalability of multi-node environment, UUIDv8 can be utilized cuz it
    // allows custom ID layout, so few bits of the ID can be assigned to
    // represent each machine/node ID,  rest of that should be timestamp with
    // random byte sequence
    let ts_ctx = NoContext;
    let (secs, nano) = Timestamp::now(ts_ctx).to_unix();
    let millis = (secs * 1000).saturating_add((nano as u64) / 1_000_000);
    let mut node_id = rand::random::<[u8; 10]>();
    node_id[0] = machine_code;
    let builder = Builder::from_unix_timestamp_millis(millis, &node_id);
    builder.into_uuid()
}

/// identifier of staging rows, stock-balance headers and outbox records
pub(crate) fn generate_guid() -> String {
    generate_custom_uid(app_meta::MACHINE_CODE)
        .simple()
        .to_string()
}

pub(crate) fn generate_task_id(length: u8) -> String {
    Alphanumeric.sample_string(&mut rand::thread_rng(), length as usize)
}
