use std::collections::HashSet;
use std::result::Result as DefaultResult;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::{AppError, AppErrorCode};

type TaskKey = (String, String);

/// In-process advisory lock keyed by shop and task, it prevents the same
/// import task from being committed twice at the same time.
#[derive(Default)]
pub struct AppTaskLockTable {
    inner: Arc<Mutex<HashSet<TaskKey>>>,
}

/// release the lock when dropped
pub struct AppTaskLockGuard {
    key: TaskKey,
    table: Arc<Mutex<HashSet<TaskKey>>>,
}

fn _lock_set(m: &Mutex<HashSet<TaskKey>>) -> MutexGuard<'_, HashSet<TaskKey>> {
    // the set is never left half-modified, recover it from poisoned state
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl AppTaskLockTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn try_acquire(&self, shop_id: &str, task_id: &str) -> DefaultResult<AppTaskLockGuard, AppError> {
        let key = (shop_id.to_string(), task_id.to_string());
        let mut set = _lock_set(&self.inner);
        if set.insert(key.clone()) {
            Ok(AppTaskLockGuard {
                key,
                table: self.inner.clone(),
            })
        } else {
            Err(AppError {
                code: AppErrorCode::TaskBusy,
                detail: Some(format!("task:{task_id}")),
            })
        }
    }

    pub fn is_locked(&self, shop_id: &str, task_id: &str) -> bool {
        let key = (shop_id.to_string(), task_id.to_string());
        _lock_set(&self.inner).contains(&key)
    }
}

impl Drop for AppTaskLockGuard {
    fn drop(&mut self) {
        let _removed = _lock_set(&self.table).remove(&self.key);
    }
}
