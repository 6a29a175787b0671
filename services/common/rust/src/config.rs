use std::collections::hash_map::RandomState;
use std::collections::{HashMap, HashSet};
use std::fmt::Display;
use std::fs::File;
use std::io::BufReader;
use std::result::Result as DefaultResult;

use serde::de::{Error as DeserializeError, Expected};
use serde::Deserialize;

use crate::constant::{env_vars, logging as const_log};
use crate::error::{AppCfgError, AppErrorCode};
use crate::{AppLogAlias, WebApiPath};

#[derive(Deserialize)]
pub struct AppLogHandlerCfg {
    pub min_level: const_log::Level,
    pub destination: const_log::Destination,
    pub alias: AppLogAlias,
    pub path: Option<String>,
}

#[derive(Deserialize)]
pub struct AppLoggerCfg {
    pub alias: AppLogAlias,
    pub handlers: Vec<String>,
    pub level: Option<const_log::Level>,
}

#[derive(Deserialize)]
pub struct AppLoggingCfg {
    pub handlers: Vec<AppLogHandlerCfg>,
    pub loggers: Vec<AppLoggerCfg>,
}

#[derive(Deserialize)]
pub struct PIDfileCfg {
    pub web_api: String,
}

#[derive(Deserialize)]
pub struct WebApiRouteCfg {
    pub path: WebApiPath,
    #[serde(deserialize_with = "jsn_deny_empty_string")]
    pub handler: String,
}

impl Display for WebApiRouteCfg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "path:{}, handler:{}", self.path, self.handler)
    }
}

#[derive(Deserialize)]
pub struct WebApiListenCfg {
    #[serde(deserialize_with = "jsn_deny_empty_string")]
    pub api_version: String,
    #[serde(deserialize_with = "jsn_deny_empty_string")]
    pub host: String,
    pub port: u16,
    pub max_connections: u32,
    pub cors: String,
    pub routes: Vec<WebApiRouteCfg>,
}

#[derive(Deserialize, Clone)]
pub struct AppAmqpPublishCfg {
    #[serde(deserialize_with = "jsn_deny_empty_string")]
    pub exchange: String,
    #[serde(deserialize_with = "jsn_deny_empty_string")]
    pub routing_key: String,
    pub durable: bool,
}

#[derive(Deserialize, Clone)]
pub struct AppAmqpAttriCfg {
    #[serde(deserialize_with = "jsn_deny_empty_string")]
    pub vhost: String,
    pub timeout_secs: u16,
}

#[derive(Deserialize, Clone)]
pub struct AppRpcAmqpCfg {
    pub publish: AppAmqpPublishCfg,
    pub attributes: AppAmqpAttriCfg,
    // path to broker credential in the confidential source
    #[serde(deserialize_with = "jsn_deny_empty_string")]
    pub confidential_id: String,
}

#[allow(non_camel_case_types)]
#[derive(Deserialize)]
#[serde(tag = "handler_type")]
pub enum AppRpcCfg {
    dummy,
    AMQP(AppRpcAmqpCfg),
}

#[derive(Deserialize)]
pub struct AppAuthCfg {
    // JWK set stored in local file, relative to system base path
    #[serde(deserialize_with = "jsn_deny_empty_string")]
    pub keystore_path: String,
}

#[derive(Deserialize)]
pub struct AppStockImportCfg {
    // number of staging rows resolved against product master per round trip
    pub chunk_size: usize,
    pub task_id_length: u8,
    pub outbox_dispatch_interval_secs: u16,
    pub outbox_batch_size: u16,
}

#[derive(Deserialize)]
#[serde(tag = "source")]
pub enum AppConfidentialCfg {
    UserSpace {
        #[serde(deserialize_with = "jsn_deny_empty_string")]
        sys_path: String,
    }, // TODO, support kernel key management utility,
       // or hardware-specific approach e.g. ARM TrustZone
}

#[allow(non_camel_case_types)]
#[derive(Deserialize, Debug, Clone)]
pub enum AppDbServerType {
    MariaDB,
    PostgreSQL,
}

#[derive(Deserialize, Debug)]
pub struct AppInMemoryDbCfg {
    #[serde(deserialize_with = "jsn_deny_empty_string")]
    pub alias: String,
    pub max_items: u32,
}

#[derive(Deserialize, Debug)]
pub struct AppDbServerCfg {
    #[serde(deserialize_with = "jsn_deny_empty_string")]
    pub alias: String,
    pub srv_type: AppDbServerType,
    pub max_conns: u32,
    pub acquire_timeout_secs: u16, // for acquiring connection from pool
    pub idle_timeout_secs: u16,
    pub confidentiality_path: String,
    pub db_name: String,
}

#[allow(non_camel_case_types)]
#[derive(Deserialize)]
#[serde(tag = "_type")]
pub enum AppDataStoreCfg {
    InMemory(AppInMemoryDbCfg),
    DbServer(AppDbServerCfg),
}

#[derive(Deserialize)]
pub struct ApiServerCfg {
    pub pid_file: PIDfileCfg,
    pub logging: AppLoggingCfg,
    pub listen: WebApiListenCfg,
    pub limit_req_body_in_bytes: usize,
    pub num_workers: u8,
    pub stack_sz_kb: u16,
    pub data_store: Vec<AppDataStoreCfg>,
    pub rpc: AppRpcCfg,
    pub auth: AppAuthCfg,
    pub confidentiality: AppConfidentialCfg,
    pub stock_import: AppStockImportCfg,
}

pub struct AppBasepathCfg {
    pub system: String,
    pub service: String,
}

pub struct AppConfig {
    pub basepath: AppBasepathCfg,
    pub api_server: ApiServerCfg,
}

pub struct AppCfgHardLimit {
    pub nitems_per_inmem_table: u32,
    pub num_db_conns: u32,
    pub seconds_db_idle: u16,
    pub max_import_chunk: usize,
}
pub struct AppCfgInitArgs {
    pub env_var_map: HashMap<String, String, RandomState>,
    pub limit: AppCfgHardLimit,
}

fn cfg_error(code: AppErrorCode, detail: Option<String>) -> AppCfgError {
    AppCfgError { code, detail }
}

impl AppConfig {
    pub fn new(args: AppCfgInitArgs) -> DefaultResult<Self, AppCfgError> {
        let (mut env_var_map, limit) = (args.env_var_map, args.limit);
        let mut take_dir = |label: &str, code: AppErrorCode| {
            env_var_map
                .remove(label)
                .map(|p| p + "/")
                .ok_or(cfg_error(code, None))
        };
        let system = take_dir(env_vars::SYS_BASEPATH, AppErrorCode::MissingSysBasePath)?;
        let service = take_dir(env_vars::SERVICE_BASEPATH, AppErrorCode::MissingAppBasePath)?;
        let cfg_path = env_var_map
            .remove(env_vars::CFG_FILEPATH)
            .ok_or(cfg_error(AppErrorCode::MissingConfigPath, None))?;
        let api_server = Self::parse_from_file(service.clone() + &cfg_path, limit)?;
        Ok(Self {
            api_server,
            basepath: AppBasepathCfg { system, service },
        })
    } // end of fn new

    /// load the JSON config file, then validate each section against the
    /// given hard limits
    pub fn parse_from_file(
        filepath: String,
        limit: AppCfgHardLimit,
    ) -> DefaultResult<ApiServerCfg, AppCfgError> {
        let fileobj = File::open(filepath)
            .map_err(|e| cfg_error(AppErrorCode::IOerror(e.kind()), Some(e.to_string())))?;
        let reader = BufReader::new(fileobj);
        let cfg = serde_json::from_reader::<BufReader<File>, ApiServerCfg>(reader)
            .map_err(|e| cfg_error(AppErrorCode::InvalidJsonFormat, Some(e.to_string())))?;
        Self::_check_web_listener(&cfg.listen)?;
        Self::_check_rpc(&cfg.rpc)?;
        Self::_check_logging(&cfg.logging)?;
        Self::_check_stock_import(&cfg.stock_import, &limit)?;
        Self::_check_datastore(&cfg.data_store, &limit)?;
        Ok(cfg)
    }

    fn _check_web_listener(obj: &WebApiListenCfg) -> DefaultResult<(), AppCfgError> {
        if obj.routes.is_empty() {
            return Err(cfg_error(AppErrorCode::NoRouteApiServerCfg, None));
        }
        let numeric_version = obj
            .api_version
            .split('.')
            .all(|v| v.parse::<u16>().is_ok());
        if !numeric_version {
            let detail = format!("non-numeric api version: {}", obj.api_version);
            return Err(cfg_error(AppErrorCode::InvalidVersion, Some(detail)));
        }
        match obj
            .routes
            .iter()
            .find(|r| r.path.is_empty() || r.handler.is_empty())
        {
            Some(bad) => Err(cfg_error(
                AppErrorCode::InvalidRouteConfig,
                Some(bad.to_string()),
            )),
            None => Ok(()),
        }
    } // end of fn _check_web_listener

    fn _check_rpc(obj: &AppRpcCfg) -> DefaultResult<(), AppCfgError> {
        match obj {
            AppRpcCfg::AMQP(c) if c.attributes.timeout_secs == 0 => Err(cfg_error(
                AppErrorCode::InvalidInput,
                Some("rpc-amqp-timeout".to_string()),
            )),
            _others => Ok(()),
        }
    }

    fn _check_logging(obj: &AppLoggingCfg) -> DefaultResult<(), AppCfgError> {
        if obj.handlers.is_empty() {
            return Err(cfg_error(AppErrorCode::NoLogHandlerCfg, None));
        } else if obj.loggers.is_empty() {
            return Err(cfg_error(AppErrorCode::NoLoggerCfg, None));
        }
        if let Some(lg) = obj.loggers.iter().find(|lg| lg.handlers.is_empty()) {
            let detail = format!("logger without handler: {}", lg.alias);
            return Err(cfg_error(AppErrorCode::NoHandlerInLoggerCfg, Some(detail)));
        }
        if obj.handlers.iter().any(|h| h.alias.is_empty()) {
            return Err(cfg_error(AppErrorCode::MissingAliasLogHdlerCfg, None));
        }
        if obj.loggers.iter().any(|lg| lg.alias.is_empty()) {
            return Err(cfg_error(AppErrorCode::MissingAliasLoggerCfg, None));
        }
        // local file handler needs a path
        let no_path = obj.handlers.iter().find(|h| {
            matches!(h.destination, const_log::Destination::LOCALFS) && h.path.is_none()
        });
        if let Some(h) = no_path {
            let detail = format!("file handler without path: {}", h.alias);
            return Err(cfg_error(AppErrorCode::InvalidHandlerLoggerCfg, Some(detail)));
        }
        let known: HashSet<&str> = obj.handlers.iter().map(|h| h.alias.as_str()).collect();
        let unknown = obj.loggers.iter().find(|lg| {
            lg.handlers
                .iter()
                .any(|alias| !known.contains(alias.as_str()))
        });
        match unknown {
            Some(lg) => {
                let detail = format!("logger refers to unknown handler: {}", lg.alias);
                Err(cfg_error(AppErrorCode::InvalidHandlerLoggerCfg, Some(detail)))
            }
            None => Ok(()),
        }
    } // end of fn _check_logging

    fn _check_stock_import(
        obj: &AppStockImportCfg,
        limit: &AppCfgHardLimit,
    ) -> DefaultResult<(), AppCfgError> {
        let detail = if obj.chunk_size == 0 || obj.chunk_size > limit.max_import_chunk {
            format!(
                "chunk-size:{}, limit:{}",
                obj.chunk_size, limit.max_import_chunk
            )
        } else if obj.task_id_length == 0 {
            "task-id-length".to_string()
        } else if obj.outbox_batch_size == 0 || obj.outbox_dispatch_interval_secs == 0 {
            "outbox-dispatch".to_string()
        } else {
            return Ok(());
        };
        Err(cfg_error(AppErrorCode::InvalidImportCfg, Some(detail)))
    }

    fn _check_datastore(
        obj: &[AppDataStoreCfg],
        limit: &AppCfgHardLimit,
    ) -> DefaultResult<(), AppCfgError> {
        if obj.is_empty() {
            return Err(cfg_error(AppErrorCode::NoDatabaseCfg, None));
        }
        let exceeded = obj.iter().find_map(|item| match item {
            AppDataStoreCfg::InMemory(c) if c.max_items > limit.nitems_per_inmem_table => {
                Some(format!("{}, limit-items:{}", c.alias, limit.nitems_per_inmem_table))
            }
            AppDataStoreCfg::DbServer(c) if c.max_conns > limit.num_db_conns => {
                Some(format!("{}, limit-conn:{}", c.alias, limit.num_db_conns))
            }
            AppDataStoreCfg::DbServer(c) if c.idle_timeout_secs > limit.seconds_db_idle => {
                Some(format!("{}, limit-idle-time:{}", c.alias, limit.seconds_db_idle))
            }
            _others => None,
        });
        match exceeded {
            Some(d) => Err(cfg_error(AppErrorCode::ExceedingMaxLimit, Some(d))),
            None => Ok(()),
        }
    } // end of fn _check_datastore
} // end of impl AppConfig

struct ExpectNonEmptyString;

impl Expected for ExpectNonEmptyString {
    fn fmt(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
        formatter.write_str("non-empty string")
    }
}

// mandatory text fields in config file cannot be empty
fn jsn_deny_empty_string<'de, D>(raw: D) -> DefaultResult<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(raw)?;
    if s.is_empty() {
        Err(DeserializeError::invalid_length(0, &ExpectNonEmptyString))
    } else {
        Ok(s)
    }
}
