use std::collections::HashMap;
use std::result::Result as DefaultResult;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{OwnedRwLockWriteGuard, RwLock};

use erp_common::config::AppInMemoryDbCfg;

use crate::error::{AppError, AppErrorCode};

// simple implementation of in-memory data storage

// application callers are responsible to maintain the structure
// of each row in each table. Each element of a row is stringified
// regardless of its original types (integer, floating-point number)
type InnerRow = Vec<String>;
type InnerTable = HashMap<String, InnerRow>;
type AllTable = HashMap<String, InnerTable>;
pub type AppInMemUpdateData = AllTable;
pub type AppInMemDeleteInfo = HashMap<String, Vec<String>>; // list of IDs per table
pub type AppInMemFetchKeys = HashMap<String, Vec<String>>;
pub type AppInMemFetchedData = AllTable;
pub type AppInMemFetchedSingleTable = InnerTable;
pub type AppInMemFetchedSingleRow = InnerRow;

/// exclusive access to all tables, obtained from `fetch_acquire()`,
/// callers should hand it back by `save_release()` or simply drop it
pub struct AppInMemDstoreLock {
    guard: OwnedRwLockWriteGuard<AllTable>,
}

pub trait AbsDStoreFilterKeyOp: Send + Sync {
    fn filter(&self, k: &String, v: &Vec<String>) -> bool;
}

#[async_trait]
pub trait AbstInMemoryDStore: Send + Sync {
    async fn create_table(&self, label: &str) -> DefaultResult<(), AppError>;
    async fn save(&self, data: AppInMemUpdateData) -> DefaultResult<usize, AppError>;
    async fn delete(&self, info: AppInMemDeleteInfo) -> DefaultResult<usize, AppError>;
    async fn fetch(&self, info: AppInMemFetchKeys) -> DefaultResult<AppInMemFetchedData, AppError>;
    async fn fetch_acquire(
        &self,
        info: AppInMemFetchKeys,
    ) -> DefaultResult<(AppInMemFetchedData, AppInMemDstoreLock), AppError>;
    fn save_release(
        &self,
        data: AppInMemUpdateData,
        lock: AppInMemDstoreLock,
    ) -> DefaultResult<usize, AppError>;
    async fn filter_keys(
        &self,
        tbl_label: String,
        op: &dyn AbsDStoreFilterKeyOp,
    ) -> DefaultResult<Vec<String>, AppError>;
}

pub struct AppInMemoryDStore {
    max_items_per_table: u32,
    table_map: Arc<RwLock<AllTable>>,
}

impl AppInMemoryDStore {
    pub fn new(cfg: &AppInMemoryDbCfg) -> Self {
        let t_map = Arc::new(RwLock::new(HashMap::new()));
        Self {
            table_map: t_map,
            max_items_per_table: cfg.max_items,
        }
    }

    fn _check_table_existence<'a, I>(map: &AllTable, mut labels: I) -> DefaultResult<(), AppError>
    where
        I: Iterator<Item = &'a String>,
    {
        if let Some(label) = labels.find(|label| !map.contains_key(label.as_str())) {
            Err(AppError {
                detail: Some(label.to_string()),
                code: AppErrorCode::DataTableNotExist,
            })
        } else {
            Ok(())
        }
    }

    // number of rows after saving must not exceed the limit, existing rows
    // replaced by the new data are not counted twice
    fn _check_capacity(&self, map: &AllTable, data: &AppInMemUpdateData) -> DefaultResult<(), AppError> {
        let limit = self.max_items_per_table as usize;
        let exceeded = data.iter().find(|(label, rows)| {
            map.get(label.as_str())
                .map(|table| {
                    let num_new = rows.keys().filter(|k| !table.contains_key(k.as_str())).count();
                    (table.len() + num_new) > limit
                })
                .unwrap_or(false)
        });
        if let Some((label, _)) = exceeded {
            let msg = format!("table:{}, limit:{}", label, limit);
            Err(AppError {
                detail: Some(msg),
                code: AppErrorCode::ExceedingMaxLimit,
            })
        } else {
            Ok(())
        }
    }

    fn _save_inner(&self, map: &mut AllTable, data: AppInMemUpdateData) -> DefaultResult<usize, AppError> {
        Self::_check_table_existence(map, data.keys())?;
        self._check_capacity(map, &data)?;
        let tot_cnt = data
            .into_iter()
            .map(|(label, rows)| {
                if let Some(table) = map.get_mut(label.as_str()) {
                    let num = rows.len();
                    table.extend(rows);
                    num
                } else {
                    0
                }
            })
            .sum();
        Ok(tot_cnt)
    }

    fn _fetch_inner(map: &AllTable, info: AppInMemFetchKeys) -> DefaultResult<AppInMemFetchedData, AppError> {
        Self::_check_table_existence(map, info.keys())?;
        let out = info
            .into_iter()
            .map(|(label, ids)| {
                let fetched = map
                    .get(label.as_str())
                    .map(|table| {
                        ids.into_iter()
                            .filter_map(|id| table.get(id.as_str()).map(|row| (id, row.clone())))
                            .collect::<InnerTable>()
                    })
                    .unwrap_or_default();
                (label, fetched)
            })
            .collect();
        Ok(out)
    }
} // end of impl AppInMemoryDStore

#[async_trait]
impl AbstInMemoryDStore for AppInMemoryDStore {
    async fn create_table(&self, label: &str) -> DefaultResult<(), AppError> {
        let mut map = self.table_map.write().await;
        if !map.contains_key(label) {
            map.insert(label.to_string(), HashMap::new());
        }
        Ok(())
    }

    async fn save(&self, data: AppInMemUpdateData) -> DefaultResult<usize, AppError> {
        let mut map = self.table_map.write().await;
        self._save_inner(&mut map, data)
    }

    async fn delete(&self, info: AppInMemDeleteInfo) -> DefaultResult<usize, AppError> {
        let mut map = self.table_map.write().await;
        Self::_check_table_existence(&map, info.keys())?;
        let tot_cnt = info
            .into_iter()
            .map(|(label, ids)| {
                if let Some(table) = map.get_mut(label.as_str()) {
                    ids.iter().filter_map(|id| table.remove(id.as_str())).count()
                } else {
                    0
                }
            })
            .sum();
        Ok(tot_cnt)
    }

    async fn fetch(&self, info: AppInMemFetchKeys) -> DefaultResult<AppInMemFetchedData, AppError> {
        let map = self.table_map.read().await;
        Self::_fetch_inner(&map, info)
    }

    async fn fetch_acquire(
        &self,
        info: AppInMemFetchKeys,
    ) -> DefaultResult<(AppInMemFetchedData, AppInMemDstoreLock), AppError> {
        let guard = self.table_map.clone().write_owned().await;
        let fetched = Self::_fetch_inner(&guard, info)?;
        Ok((fetched, AppInMemDstoreLock { guard }))
    }

    fn save_release(
        &self,
        data: AppInMemUpdateData,
        lock: AppInMemDstoreLock,
    ) -> DefaultResult<usize, AppError> {
        let mut guard = lock.guard;
        self._save_inner(&mut guard, data)
    } // lock released as soon as the guard goes out of scope

    async fn filter_keys(
        &self,
        tbl_label: String,
        op: &dyn AbsDStoreFilterKeyOp,
    ) -> DefaultResult<Vec<String>, AppError> {
        let map = self.table_map.read().await;
        let table = map.get(tbl_label.as_str()).ok_or(AppError {
            detail: Some(tbl_label.clone()),
            code: AppErrorCode::DataTableNotExist,
        })?;
        let out = table
            .iter()
            .filter(|(k, v)| op.filter(k, v))
            .map(|(k, _)| k.clone())
            .collect();
        Ok(out)
    }
} // end of impl AbstInMemoryDStore
