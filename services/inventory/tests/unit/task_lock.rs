use inventory::error::AppErrorCode;
use inventory::AppTaskLockTable;

use crate::UT_SHOP_ID;

#[test]
fn acquire_release_ok() {
    let locks = AppTaskLockTable::new();
    assert!(!locks.is_locked(UT_SHOP_ID, "tsk01"));
    {
        let _guard = locks.try_acquire(UT_SHOP_ID, "tsk01").unwrap();
        assert!(locks.is_locked(UT_SHOP_ID, "tsk01"));
        let result = locks.try_acquire(UT_SHOP_ID, "tsk01");
        let error = result.err().unwrap();
        assert_eq!(error.code, AppErrorCode::TaskBusy);
        assert_eq!(error.detail.as_deref(), Some("task:tsk01"));
        // locks are scoped by shop and task
        let other = locks.try_acquire("other-shop", "tsk01");
        assert!(other.is_ok());
        let other = locks.try_acquire(UT_SHOP_ID, "tsk02");
        assert!(other.is_ok());
    }
    assert!(!locks.is_locked(UT_SHOP_ID, "tsk01"));
    assert!(!locks.is_locked(UT_SHOP_ID, "tsk02"));
    let result = locks.try_acquire(UT_SHOP_ID, "tsk01");
    assert!(result.is_ok());
}

#[tokio::test]
async fn contend_across_tasks() {
    use std::sync::Arc;
    let locks = Arc::new(AppTaskLockTable::new());
    let handles = (0..8)
        .map(|_| {
            let l = locks.clone();
            tokio::spawn(async move {
                match l.try_acquire(UT_SHOP_ID, "tsk-race") {
                    Ok(guard) => {
                        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
                        drop(guard);
                        true
                    }
                    Err(_e) => false,
                }
            })
        })
        .collect::<Vec<_>>();
    let mut num_acquired = 0;
    for h in handles {
        if h.await.unwrap() {
            num_acquired += 1;
        }
    }
    assert!(num_acquired >= 1);
    assert!(!locks.is_locked(UT_SHOP_ID, "tsk-race"));
}
