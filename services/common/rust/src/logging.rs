use std::collections::HashMap;
use std::io::stdout;
use std::path::Path;

use tracing::dispatcher::Dispatch;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt::Layer as TraceLayer;
use tracing_subscriber::prelude::__tracing_subscriber_SubscriberExt;
use tracing_subscriber::{Layer as LayerIntf, Registry};

use crate::config::{AppBasepathCfg, AppLogHandlerCfg, AppLoggerCfg, AppLoggingCfg};
use crate::constant::logging::{Destination as DstOption, Level as AppLogLevelInner};
use crate::AppLogAlias;

pub type AppLogLevel = AppLogLevelInner;
type DefaultHandler = (NonBlocking, tracing::Level, WorkerGuard);

/// One `tracing` dispatcher per configured logger, each logger is looked up
/// by the module path of the caller, see `app_log_event`
pub struct AppLogContext {
    _io_guards: Vec<WorkerGuard>,
    loggers: HashMap<AppLogAlias, Dispatch>,
}

// this macro has to be exposed since top-level binary executable (e.g. web)
// will invoke this macro indirectly
#[macro_export]
macro_rules! to_3rdparty_level {
    ($lvlin:expr) => {
        match $lvlin {
            $crate::logging::AppLogLevel::FATAL | $crate::logging::AppLogLevel::ERROR => {
                tracing::Level::ERROR
            }
            $crate::logging::AppLogLevel::WARNING => tracing::Level::WARN,
            $crate::logging::AppLogLevel::INFO => tracing::Level::INFO,
            $crate::logging::AppLogLevel::DEBUG => tracing::Level::DEBUG,
            $crate::logging::AppLogLevel::TRACE => tracing::Level::TRACE,
        } // in `tracing` ecosystem, level comparison is like
          // TRACE > DEBUG > INFO > WARN > ERROR
    };
}

fn _gen_localfile_writer(basepath: &str, rpath: &str) -> Option<(NonBlocking, WorkerGuard)> {
    let mut fullpath = basepath.to_string();
    if !basepath.ends_with('/') && !rpath.starts_with('/') {
        fullpath += "/";
    }
    fullpath += rpath;
    let p = Path::new(&fullpath);
    let (dir, fname_prefix) = (p.parent()?, p.file_name()?);
    let wr_dst = RollingFileAppender::new(Rotation::NEVER, dir, fname_prefix);
    Some(tracing_appender::non_blocking(wr_dst))
}

// Note tracing spawns new thread dedicating to each non-blocking writer,
// the context-switching rule depends on underlying OS platform.
fn _gen_console_writer() -> (NonBlocking, WorkerGuard) {
    tracing_appender::non_blocking(stdout())
}

fn _init_handler(basepath: &AppBasepathCfg, cfg: &AppLogHandlerCfg) -> DefaultHandler {
    let lvl = to_3rdparty_level!(&cfg.min_level);
    let maybe_file = match (&cfg.destination, cfg.path.as_ref()) {
        (DstOption::LOCALFS, Some(rpath)) => _gen_localfile_writer(&basepath.system, rpath),
        _others => None,
    };
    // config validation rejects file handler without path, console is the
    // last resort if the path still cannot be resolved
    let (io_wr, guard) = maybe_file.unwrap_or_else(_gen_console_writer);
    // callers MUST always keep the guard along with writer, for successfully
    // flushing log messages to I/O
    (io_wr, lvl, guard)
}

fn _init_logger(cfg: &AppLoggerCfg, hdlrs: &HashMap<AppLogAlias, DefaultHandler>) -> Dispatch {
    let layers = cfg
        .handlers
        .iter()
        .filter_map(|alias| hdlrs.get(alias))
        .map(|(wr_ptr, default_lvl, _guard)| {
            let lvl = cfg
                .level
                .as_ref()
                .map(|l| to_3rdparty_level!(l))
                .unwrap_or(*default_lvl);
            TraceLayer::new()
                .with_writer(wr_ptr.clone())
                .with_file(false) // to prevent full path exposed
                .with_line_number(true)
                .with_thread_ids(true)
                .with_level(true)
                .with_filter(LevelFilter::from_level(lvl))
        })
        .collect::<Vec<_>>();
    Dispatch::new(Registry::default().with(layers))
}

impl AppLogContext {
    pub fn new(basepath: &AppBasepathCfg, cfg: &AppLoggingCfg) -> Self {
        let hdlrs = cfg
            .handlers
            .iter()
            .map(|item| (item.alias.clone(), _init_handler(basepath, item)))
            .collect::<HashMap<_, _>>();
        let loggers = cfg
            .loggers
            .iter()
            .map(|item| (item.alias.clone(), _init_logger(item, &hdlrs)))
            .collect::<HashMap<_, _>>();
        // keep guards of the IO writers during the lifetime
        let _io_guards = hdlrs.into_values().map(|(_, _, g)| g).collect();
        Self { loggers, _io_guards }
    }

    pub fn get_assigner(&self, key: &str) -> Option<&Dispatch> {
        self.loggers.get(&key.to_string())
    }
} // end of impl AppLogContext

#[macro_export]
macro_rules! app_log_event {
    ( $ctx:ident, $lvl:expr, $($arg:tt)+ ) => {{
        const MOD_PATH:&str = module_path!();
        if let Some(assigner) = $ctx.get_assigner(MOD_PATH) {
            const LVL_INNER: tracing::Level = $crate::logging::to_3rdparty_level!($lvl);
            tracing::dispatcher::with_default(assigner, || {
                tracing::event!(LVL_INNER, $($arg)+);
            });
        } else {
            // no logger registered for the caller, fall back to stdout
            println!("[{:?}] {}: {}", $lvl, MOD_PATH, format_args!($($arg)+));
        }
    }};
}

pub use app_log_event;
pub use to_3rdparty_level;
