use std::boxed::Box;
use std::collections::hash_map::RandomState;
use std::collections::HashMap;
use std::env;
use std::sync::atomic::Ordering;
use std::time::Duration;

use http_body::Limited;
use hyper::Body as HyperBody;
use tokio::runtime::Builder as RuntimeBuilder;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;

use erp_common::confidentiality::{self, AbstractConfidentiality};
use erp_common::config::{AppCfgHardLimit, AppCfgInitArgs, AppConfig};
use erp_common::constant::env_vars::EXPECTED_LABELS;
use erp_common::logging::{app_log_event, AppLogContext, AppLogLevel};

use inventory::api::web::route_table;
use inventory::constant::hard_limit;
use inventory::network::{app_web_service, middleware, net_server_listener};
use inventory::repository::app_repo_outbox;
use inventory::usecase::OutboxDispatchUseCase;
use inventory::AppSharedState;

type AppFinalHttpBody = Limited<HyperBody>;

async fn shutdown_signal(shr_state: AppSharedState) {
    let log_ctx_p = shr_state.log_context().clone();
    if let Err(e) = tokio::signal::ctrl_c().await {
        app_log_event!(log_ctx_p, AppLogLevel::ERROR, "signal-handler, {}", e);
    }
    shr_state.shutdown().store(true, Ordering::Relaxed);
    app_log_event!(log_ctx_p, AppLogLevel::WARNING, "shutdown signal received");
}

// pick up outbox events which were not delivered right after document
// creation, e.g. due to broker outage
async fn dispatch_outbox_periodically(shr_state: AppSharedState) {
    let log_ctx_p = shr_state.log_context().clone();
    let (interval_secs, batch_sz) = {
        let c = &shr_state.config().api_server.stock_import;
        (c.outbox_dispatch_interval_secs.max(1), c.outbox_batch_size)
    };
    let mut ticker = tokio::time::interval(Duration::from_secs(interval_secs as u64));
    let flag = shr_state.shutdown();
    loop {
        ticker.tick().await;
        if flag.load(Ordering::Relaxed) {
            break;
        }
        let repo = match app_repo_outbox(shr_state.datastore()).await {
            Ok(r) => r,
            Err(e) => {
                app_log_event!(log_ctx_p, AppLogLevel::ERROR, "outbox-repo, {}", e);
                continue;
            }
        };
        let uc = OutboxDispatchUseCase {
            repo,
            publisher: shr_state.publisher(),
            logctx: log_ctx_p.clone(),
        };
        if let Err(e) = uc.execute(batch_sz as usize).await {
            app_log_event!(log_ctx_p, AppLogLevel::ERROR, "outbox-dispatch, {}", e);
        }
    } // end of loop
    app_log_event!(log_ctx_p, AppLogLevel::INFO, "outbox dispatcher terminated");
} // end of fn dispatch_outbox_periodically

async fn start_server(shr_state: AppSharedState) {
    let log_ctx_p = shr_state.log_context().clone();
    let cfg = shr_state.config().clone();
    let routes = route_table::<AppFinalHttpBody>();
    let listener = &cfg.api_server.listen;
    let (service, num_applied) =
        app_web_service::<AppFinalHttpBody>(listener, routes, shr_state.clone());
    if num_applied == 0 {
        app_log_event!(
            log_ctx_p,
            AppLogLevel::ERROR,
            "no route created, web API server failed to start"
        );
        return;
    }
    let result = net_server_listener(listener.host.clone(), listener.port);
    match result {
        Ok(b) => {
            let ratelm = middleware::rate_limit(listener.max_connections);
            let reqlm = middleware::req_body_limit(cfg.api_server.limit_req_body_in_bytes);
            let co = match middleware::cors(cfg.basepath.system.clone() + listener.cors.as_str())
            {
                Ok(v) => v,
                Err(e) => {
                    app_log_event!(
                        log_ctx_p,
                        AppLogLevel::ERROR,
                        "cors layer init error, detail: {}",
                        e
                    );
                    CorsLayer::new()
                }
            };
            let middlewares1 = ServiceBuilder::new().layer(reqlm).layer(co);
            let service = service.layer(middlewares1);
            let middlewares2 = ServiceBuilder::new()
                .layer(ratelm) // rate-limit not allowed to clone
                .service(service.into_make_service());
            let dispatcher = tokio::spawn(dispatch_outbox_periodically(shr_state.clone()));
            let sr = b
                .serve(middlewares2)
                .with_graceful_shutdown(shutdown_signal(shr_state.clone()));
            if let Err(e) = sr.await {
                app_log_event!(log_ctx_p, AppLogLevel::ERROR, "API server error, {}", e);
            }
            shr_state.shutdown().store(true, Ordering::Relaxed);
            dispatcher.abort();
            app_log_event!(log_ctx_p, AppLogLevel::WARNING, "API server terminating");
        }
        Err(e) => {
            app_log_event!(
                log_ctx_p,
                AppLogLevel::ERROR,
                "API server failed to start, {}",
                e
            );
        }
    }
} // end of fn start_server

fn start_async_runtime(cfg: AppConfig, confidential: Box<dyn AbstractConfidentiality>) {
    let log_ctx = AppLogContext::new(&cfg.basepath, &cfg.api_server.logging);
    let shr_state = match AppSharedState::new(cfg, log_ctx, confidential) {
        Ok(v) => v,
        Err(e) => {
            println!("app failed to init shared state, error: {} ", e);
            return;
        }
    };
    let cfg = shr_state.config();
    let log_ctx = shr_state.log_context().clone();
    let log_ctx2 = log_ctx.clone();
    let stack_nbytes: usize = (cfg.api_server.stack_sz_kb as usize) << 10;
    let result = RuntimeBuilder::new_multi_thread()
        .worker_threads(cfg.api_server.num_workers as usize)
        .on_thread_start(move || {
            // this `Fn()` closure will be invoked several times by new thread,
            // depending on number of work threads in the application, all variables
            // moved into this closure have to be clonable.
            let log_cpy = log_ctx.clone();
            app_log_event!(log_cpy, AppLogLevel::INFO, "[API server] worker started");
        })
        .on_thread_stop(move || {
            let log_cpy = log_ctx2.clone();
            app_log_event!(log_cpy, AppLogLevel::INFO, "[API server] worker terminating");
        })
        .thread_stack_size(stack_nbytes)
        .thread_name("web-api-worker")
        // manage low-level I/O drivers used by network types
        .enable_io()
        // rate limiter in crate `tower` requires the timer in the runtime builder
        .enable_time()
        .build();
    match result {
        Ok(rt) => {
            rt.block_on(async move {
                start_server(shr_state).await;
            });
        }
        Err(e) => {
            let log_ctx_p = shr_state.log_context();
            app_log_event!(
                log_ctx_p,
                AppLogLevel::ERROR,
                "async runtime failed to build, {} ",
                e
            );
        }
    };
} // end of fn start_async_runtime

fn main() {
    let iter = env::vars().filter(|(k, _v)| EXPECTED_LABELS.contains(&k.as_str()));
    let arg_map: HashMap<String, String, RandomState> = HashMap::from_iter(iter);
    let args = AppCfgInitArgs {
        env_var_map: arg_map,
        limit: AppCfgHardLimit {
            nitems_per_inmem_table: hard_limit::MAX_ITEMS_STORED_PER_MODEL,
            num_db_conns: hard_limit::MAX_DB_CONNECTIONS,
            seconds_db_idle: hard_limit::MAX_SECONDS_DB_IDLE,
            max_import_chunk: hard_limit::MAX_IMPORT_CHUNK,
        },
    };
    match AppConfig::new(args) {
        Ok(cfg) => match confidentiality::build_context(&cfg) {
            Ok(confidential) => start_async_runtime(cfg, confidential),
            Err(e) => {
                println!("app failed to init confidentiality handler, error: {} ", e);
            }
        },
        Err(e) => {
            println!("app failed to configure, error: {} ", e);
        }
    };
} // end of main
