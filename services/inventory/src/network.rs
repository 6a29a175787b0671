use std::io::ErrorKind;
use std::net::ToSocketAddrs;
use std::result::Result as DefaultResult;

use axum::Router;
use http_body::Body as HttpBody;
use hyper::server::conn::AddrIncoming;
use hyper::server::Builder as HyperSrvBuilder;

use erp_common::config::{WebApiListenCfg, WebApiRouteCfg};

use crate::api::web::{ApiRouteTableType, ApiRouteType};
use crate::error::{AppError, AppErrorCode};
use crate::AppSharedState;

// In axum 0.6 the body type of the final router is decided by all the
// middleware layers wrapped around it (see axum issue #1110), callers pick
// `HB` to match the outermost layer

/// bind the handlers in route table to the paths listed in config, all the
/// paths are nested under the API version, the number of bound routes is
/// returned along with the router
pub fn app_web_service<HB>(
    cfg: &WebApiListenCfg,
    rtable: ApiRouteTableType<HB>,
    shr_state: AppSharedState,
) -> (Router<(), HB>, u16)
where
    HB: HttpBody + Send + 'static,
{
    let bound = cfg
        .routes
        .iter()
        .filter_map(|r: &WebApiRouteCfg| {
            rtable
                .get(r.handler.as_str())
                .map(|mr: &ApiRouteType<HB>| (r.path.as_str(), mr.clone()))
        })
        .collect::<Vec<_>>();
    let num_applied = bound.len() as u16;
    let inner = bound
        .into_iter()
        .fold(Router::<AppSharedState, HB>::new(), |rt, (path, mr)| {
            rt.route(path, mr)
        });
    let router = if num_applied == 0 {
        inner
    } else {
        let prefix = format!("/{}", cfg.api_version);
        Router::new().nest(prefix.as_str(), inner)
    };
    // state type `S` turns into `()` only after the state is provided
    (router.with_state(shr_state), num_applied)
} // end of fn app_web_service

pub mod middleware {
    use std::fs::File;
    use std::str::FromStr;
    use std::time::Duration;

    use axum::http;
    use serde::Deserialize;
    use tower::limit::RateLimitLayer;
    use tower_http::cors::CorsLayer;
    use tower_http::limit::RequestBodyLimitLayer;

    use super::{AppError, AppErrorCode, DefaultResult};

    #[derive(Deserialize)]
    struct CorsAllowedOrigin {
        inventory: String,
    }

    #[allow(non_snake_case)]
    #[derive(Deserialize)]
    struct CorsConfig {
        ALLOWED_ORIGIN: CorsAllowedOrigin,
        ALLOWED_METHODS: Vec<String>,
        ALLOWED_HEADERS: Vec<String>,
        ALLOW_CREDENTIALS: bool,
        PREFLIGHT_MAX_AGE: u64,
    }

    pub fn rate_limit(max_conn: u32) -> RateLimitLayer {
        let num = max_conn as u64;
        let period = Duration::from_secs(1);
        RateLimitLayer::new(num, period)
    }

    pub fn cors(cfg_path: String) -> DefaultResult<CorsLayer, AppError> {
        let f = File::open(cfg_path).map_err(|e| AppError {
            detail: Some(e.to_string()),
            code: AppErrorCode::IOerror(e.kind()),
        })?;
        let val = serde_json::from_reader::<File, CorsConfig>(f).map_err(|e| AppError {
            detail: Some(e.to_string()),
            code: AppErrorCode::InvalidJsonFormat,
        })?;

        let invalid = |label: &str| AppError {
            detail: Some(label.to_string()),
            code: AppErrorCode::InvalidInput,
        };
        let methods = val
            .ALLOWED_METHODS
            .iter()
            .map(|m| http::Method::from_bytes(m.as_bytes()))
            .collect::<DefaultResult<Vec<_>, _>>()
            .map_err(|_e| invalid("invalid-allowed-method"))?;
        let headers = val
            .ALLOWED_HEADERS
            .iter()
            .filter_map(|h| http::HeaderName::from_str(h.as_str()).ok())
            .collect::<Vec<http::HeaderName>>();
        // bearer token and uploaded workbook always come with these headers
        let required = [
            http::header::AUTHORIZATION,
            http::header::CONTENT_TYPE,
            http::header::ACCEPT,
        ];
        if required.iter().any(|r| !headers.contains(r)) {
            return Err(invalid("invalid-allowed-header"));
        }
        let origin = val
            .ALLOWED_ORIGIN
            .inventory
            .parse::<http::HeaderValue>()
            .map_err(|e| AppError {
                detail: Some(format!("invalid-origin-header: {}", e)),
                code: AppErrorCode::InvalidInput,
            })?;
        let co = CorsLayer::new()
            .allow_origin(origin)
            .allow_methods(methods)
            .allow_headers(headers)
            .allow_credentials(val.ALLOW_CREDENTIALS)
            .max_age(Duration::from_secs(val.PREFLIGHT_MAX_AGE));
        Ok(co)
    } // end of fn cors

    pub fn req_body_limit(limit: usize) -> RequestBodyLimitLayer {
        RequestBodyLimitLayer::new(limit)
    }
} // end of inner-module middleware

/// resolve the host, then bind the first address available with the given port
pub fn net_server_listener(
    domain_host: String,
    port: u16,
) -> DefaultResult<HyperSrvBuilder<AddrIncoming>, AppError> {
    let host_port = if domain_host.contains(':') {
        domain_host
    } else {
        format!("{domain_host}:{port}")
    };
    let addrs = host_port.to_socket_addrs().map_err(|e| AppError {
        detail: Some(format!("{e}, domain_host:{host_port}")),
        code: AppErrorCode::IOerror(ErrorKind::AddrNotAvailable),
    })?;
    addrs
        .map(|mut addr| {
            addr.set_port(port);
            addr
        })
        .find_map(|addr| axum::Server::try_bind(&addr).ok())
        .ok_or(AppError {
            detail: Some("failed to bind with all resolved IPs".to_string()),
            code: AppErrorCode::IOerror(ErrorKind::AddrInUse),
        })
} // end of fn net_server_listener
