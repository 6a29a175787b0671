use std::boxed::Box;
use std::result::Result as DefaultResult;
use std::sync::Arc;

#[cfg(feature = "mariadb")]
use std::time::Duration;

#[cfg(feature = "mariadb")]
use serde::Deserialize;
#[cfg(feature = "mariadb")]
use sqlx::mysql::MySqlConnectOptions;
#[cfg(feature = "mariadb")]
use sqlx::pool::{PoolConnection, PoolOptions};
#[cfg(feature = "mariadb")]
use sqlx::{MySql, Pool};

use erp_common::confidentiality::AbstractConfidentiality;
#[cfg(feature = "mariadb")]
use erp_common::config::AppDbServerType;
use erp_common::config::AppDbServerCfg;

use crate::error::{AppError, AppErrorCode};

// credential of database server, kept in confidential source
#[cfg(feature = "mariadb")]
#[allow(non_snake_case)]
#[derive(Deserialize)]
struct DbSecret {
    HOST: String,
    PORT: u16,
    USER: String,
    PASSWORD: String,
}

#[cfg(feature = "mariadb")]
impl DbSecret {
    fn try_parse(serial: &str) -> DefaultResult<Self, AppError> {
        serde_json::from_str::<Self>(serial).map_err(|e| AppError {
            code: AppErrorCode::InvalidJsonFormat,
            detail: Some(format!("db-secret-parse: {e}")),
        })
    }

    fn connect_options(&self, db_name: &str) -> MySqlConnectOptions {
        MySqlConnectOptions::new()
            .host(self.HOST.as_str())
            .port(self.PORT)
            .username(self.USER.as_str())
            .password(self.PASSWORD.as_str())
            .database(db_name)
    }
}

/// Connection pool to one MariaDB server, the staging rows, product master,
/// stock-balance documents and outbox share the same pool
#[cfg(feature = "mariadb")]
pub struct AppMariaDbStore {
    pub alias: String,
    pool: Pool<MySql>,
}
#[cfg(not(feature = "mariadb"))]
pub struct AppMariaDbStore {}

#[cfg(feature = "mariadb")]
impl AppMariaDbStore {
    pub fn try_build(
        cfg: &AppDbServerCfg,
        confidential: Arc<Box<dyn AbstractConfidentiality>>,
    ) -> DefaultResult<Self, AppError> {
        if !matches!(cfg.srv_type, AppDbServerType::MariaDB) {
            return Err(AppError {
                code: AppErrorCode::InvalidInput,
                detail: Some(format!("db-cfg-server-type: {:?}", cfg.srv_type)),
            });
        }
        let serial = confidential.try_get_payload(cfg.confidentiality_path.as_str())?;
        let conn_opts = DbSecret::try_parse(serial.as_str())?.connect_options(&cfg.db_name);
        // connections are established on demand
        let pool = PoolOptions::<MySql>::new()
            .min_connections(0)
            .max_connections(cfg.max_conns)
            .idle_timeout(Some(Duration::from_secs(cfg.idle_timeout_secs as u64)))
            .acquire_timeout(Duration::from_secs(cfg.acquire_timeout_secs as u64))
            .connect_lazy_with(conn_opts);
        Ok(Self {
            pool,
            alias: cfg.alias.clone(),
        })
    }

    pub async fn acquire(&self) -> DefaultResult<PoolConnection<MySql>, AppError> {
        self.pool.acquire().await.map_err(|e| AppError {
            code: AppErrorCode::DatabaseServerBusy,
            detail: Some(format!(
                "alias:{}, pool-size:{}, {}",
                self.alias,
                self.pool.size(),
                e
            )),
        })
    }
} // end of impl AppMariaDbStore

#[cfg(not(feature = "mariadb"))]
impl AppMariaDbStore {
    pub fn try_build(
        cfg: &AppDbServerCfg,
        _confidential: Arc<Box<dyn AbstractConfidentiality>>,
    ) -> DefaultResult<Self, AppError> {
        Err(AppError {
            code: AppErrorCode::FeatureDisabled,
            detail: Some(format!("sql-db, type:{:?}, alias:{}", cfg.srv_type, cfg.alias)),
        })
    }
}
