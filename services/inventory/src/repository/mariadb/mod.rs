pub(super) mod outbox;
pub(super) mod product;
pub(super) mod staging;
pub(super) mod stock_balance;

use std::io::ErrorKind;
use std::ops::DerefMut;
use std::result::Result as DefaultResult;

use chrono::{DateTime, FixedOffset, NaiveDateTime};
use sqlx::error::{BoxDynError, Error};
use sqlx::mysql::{MySqlArguments, MySqlQueryResult};
use sqlx::{Executor, MySql, Statement, Transaction};

use crate::error::{AppError, AppErrorCode};

const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";
// upper bound of rows in one multi-value insert statement
const MAX_ROWS_PER_INSERT: usize = 2000;

impl From<Error> for AppError {
    fn from(value: Error) -> Self {
        let (code, detail) = match value {
            Error::Configuration(e) => (
                AppErrorCode::InvalidInput,
                e.to_string() + " invalid-db-config",
            ),
            Error::Io(e) => (
                AppErrorCode::IOerror(e.kind()),
                e.to_string() + " io-err-mariadb",
            ),
            Error::Database(e) => (AppErrorCode::RemoteDbServerFailure, e.to_string()),
            Error::Protocol(errmsg) => (AppErrorCode::IOerror(ErrorKind::InvalidData), errmsg),
            Error::Decode(e) => (AppErrorCode::DataCorruption, e.to_string()),
            Error::ColumnDecode { index, source } => (
                AppErrorCode::DataCorruption,
                source.to_string() + ", when decoding column at idx " + index.as_str(),
            ),
            Error::Tls(e) => (
                AppErrorCode::IOerror(ErrorKind::NotConnected),
                e.to_string(),
            ),
            Error::TypeNotFound { type_name } => {
                (AppErrorCode::InvalidInput, type_name + " wrong-col-typ")
            }
            Error::ColumnNotFound(col_name) => (
                AppErrorCode::IOerror(ErrorKind::NotFound),
                col_name + "no-col",
            ),
            Error::RowNotFound => (
                AppErrorCode::IOerror(ErrorKind::NotFound),
                "no-row".to_string(),
            ),
            Error::ColumnIndexOutOfBounds { index, len } => (
                AppErrorCode::InvalidInput,
                format!("req-idx:{}, limit:{}", index, len),
            ),
            Error::PoolTimedOut => (AppErrorCode::DatabaseServerBusy, "no-conn-avail".to_string()),
            Error::PoolClosed => (AppErrorCode::Unknown, "pool-closed".to_string()),
            Error::WorkerCrashed => (
                AppErrorCode::Unknown,
                "low-level-db-worker-crashed".to_string(),
            ),
            _others => (
                AppErrorCode::Unknown,
                "internal-implementation-issue".to_string(),
            ),
        };
        Self {
            code,
            detail: Some(detail),
        }
    } // end of fn from
} // end of impl AppError

// error returned from `Arguments::add()` when encoding a value
fn arg_encode_error(e: BoxDynError) -> AppError {
    AppError {
        code: AppErrorCode::InvalidInput,
        detail: Some(format!("sql-arg-encode: {e}")),
    }
}

fn placeholders(num: usize) -> String {
    (0..num).map(|_| "?").collect::<Vec<_>>().join(",")
}

fn to_db_time(t: &DateTime<FixedOffset>) -> String {
    t.naive_utc().format(DATETIME_FORMAT).to_string()
}

// all time columns are saved in UTC
fn from_db_time(raw: NaiveDateTime) -> DateTime<FixedOffset> {
    raw.and_utc().fixed_offset()
}

async fn run_query_once(
    tx: &mut Transaction<'_, MySql>,
    sql_patt: String,
    args: MySqlArguments,
    maybe_num_batch: Option<usize>,
) -> DefaultResult<MySqlQueryResult, AppError> {
    let stmt = tx.prepare(sql_patt.as_str()).await?;
    let query = stmt.query_with(args);
    let exec = tx.deref_mut();
    let resultset = query.execute(exec).await?;
    if let Some(num_batch) = maybe_num_batch {
        let num_affected = resultset.rows_affected() as usize;
        if num_affected == num_batch {
            Ok(resultset)
        } else {
            let detail = format!(
                "num_affected, actual:{}, expect:{}",
                num_affected, num_batch
            );
            Err(AppError {
                code: AppErrorCode::DataCorruption,
                detail: Some(detail),
            })
        }
    } else {
        Ok(resultset)
    }
}
