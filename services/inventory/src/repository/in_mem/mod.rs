pub(super) mod outbox;
pub(super) mod product;
pub(super) mod staging;
pub(super) mod stock_balance;

use std::fmt::Display;
use std::result::Result as DefaultResult;
use std::str::FromStr;

use chrono::{DateTime, FixedOffset};

use crate::error::{AppError, AppErrorCode};
use crate::model::NameXModel;

// every table in the in-memory store scopes its rows by shop, the shop ID is
// the first segment of each key. The delimiter never appears in an escaped
// shop segment, so a key prefix `{shop}/` matches exactly one shop
const KEY_DELIMITER: char = '/';

fn _escape_shop(shop_id: &str) -> String {
    shop_id.replace('%', "%25").replace(KEY_DELIMITER, "%2F")
}

fn _unescape_shop(raw: &str) -> String {
    raw.replace("%2F", "/").replace("%25", "%")
}

fn _gen_key(shop_id: &str, id: &str) -> String {
    format!("{}{KEY_DELIMITER}{id}", _escape_shop(shop_id))
}

fn _split_key(key: &str) -> DefaultResult<(String, &str), AppError> {
    key.split_once(KEY_DELIMITER)
        .map(|(shop, id)| (_unescape_shop(shop), id))
        .ok_or(AppError {
            code: AppErrorCode::DataCorruption,
            detail: Some(format!("inmem-key: {key}")),
        })
}

fn _col_str(row: &[String], idx: usize) -> DefaultResult<&str, AppError> {
    row.get(idx).map(String::as_str).ok_or(AppError {
        code: AppErrorCode::DataCorruption,
        detail: Some(format!("inmem-col-missing: {idx}")),
    })
}

fn _col_parse<T>(row: &[String], idx: usize) -> DefaultResult<T, AppError>
where
    T: FromStr,
    T::Err: Display,
{
    let raw = _col_str(row, idx)?;
    raw.parse::<T>().map_err(|e| AppError {
        code: AppErrorCode::DataCorruption,
        detail: Some(format!("inmem-col-parse: {idx}, {raw}, {e}")),
    })
}

fn _col_datetime(row: &[String], idx: usize) -> DefaultResult<DateTime<FixedOffset>, AppError> {
    let raw = _col_str(row, idx)?;
    DateTime::parse_from_rfc3339(raw).map_err(|e| AppError {
        code: AppErrorCode::DataCorruption,
        detail: Some(format!("inmem-col-time: {idx}, {e}")),
    })
}

fn _col_names(row: &[String], idx: usize) -> DefaultResult<Vec<NameXModel>, AppError> {
    let raw = _col_str(row, idx)?;
    serde_json::from_str::<Vec<NameXModel>>(raw).map_err(|e| AppError {
        code: AppErrorCode::DataCorruption,
        detail: Some(format!("inmem-col-names: {idx}, {e}")),
    })
}

fn _names_to_col(names: &[NameXModel]) -> DefaultResult<String, AppError> {
    serde_json::to_string(names).map_err(|e| AppError {
        code: AppErrorCode::DataCorruption,
        detail: Some(format!("inmem-names-serial: {e}")),
    })
}

// manually allocate space in advance, so the order of columns can be arbitrary
fn _new_row(num_cols: usize, cols: Vec<(usize, String)>) -> Vec<String> {
    let mut row = (0..num_cols).map(|_| String::new()).collect::<Vec<_>>();
    cols.into_iter()
        .map(|(idx, val)| {
            if let Some(c) = row.get_mut(idx) {
                *c = val;
            }
        })
        .count();
    row
}
