use inventory::model::OutboxEventModel;
use inventory::repository::{AbsOutboxRepo, OutboxInMemRepo};

use crate::{ut_inmem_dstore, ut_time, UT_SHOP_ID};

fn ut_event(id: &str, created_at: &str) -> OutboxEventModel {
    OutboxEventModel {
        id: id.to_string(),
        shop_id: UT_SHOP_ID.to_string(),
        route: "inventory.stock_balance.created".to_string(),
        payload: format!(r#"{{"id":"{id}"}}"#),
        created_at: ut_time(created_at),
        num_attempts: 0,
        delivered: false,
    }
}

async fn ut_setup_saved_repo() -> OutboxInMemRepo {
    use std::collections::HashMap;

    let ds = ut_inmem_dstore(20);
    let repo = OutboxInMemRepo::new(ds.clone()).await.unwrap();
    // write raw rows with the same layout the stock-balance repository uses
    let events = [
        ut_event("evt-c", "2024-03-12T10:00:03+07:00"),
        ut_event("evt-a", "2024-03-12T10:00:01+07:00"),
        ut_event("evt-b", "2024-03-12T10:00:02+07:00"),
    ];
    let table = events
        .iter()
        .map(|e| {
            let row = vec![
                e.shop_id.clone(),
                e.route.clone(),
                e.payload.clone(),
                e.created_at.to_rfc3339(),
                e.num_attempts.to_string(),
                e.delivered.to_string(),
            ];
            (e.id.clone(), row)
        })
        .collect::<HashMap<_, _>>();
    let data = HashMap::from([("stock_balance_outbox".to_string(), table)]);
    let num = ds.save(data).await.unwrap();
    assert_eq!(num, 3);
    repo
}

#[tokio::test]
async fn fetch_pending_oldest_first() {
    let repo = ut_setup_saved_repo().await;
    let pending = repo.fetch_pending(2).await.unwrap();
    let actual = pending.iter().map(|e| e.id.as_str()).collect::<Vec<_>>();
    assert_eq!(actual, ["evt-a", "evt-b"]);
    assert_eq!(pending[0], ut_event("evt-a", "2024-03-12T10:00:01+07:00"));
}

#[tokio::test]
async fn mark_delivered_and_failure() {
    let repo = ut_setup_saved_repo().await;
    let num = repo.mark_delivered(vec!["evt-a".to_string()]).await.unwrap();
    assert_eq!(num, 1);
    let num = repo
        .record_failure(vec!["evt-b".to_string(), "evt-nonexist".to_string()])
        .await
        .unwrap();
    assert_eq!(num, 1);
    let num = repo.record_failure(vec!["evt-b".to_string()]).await.unwrap();
    assert_eq!(num, 1);
    let pending = repo.fetch_pending(10).await.unwrap();
    let actual = pending
        .iter()
        .map(|e| (e.id.as_str(), e.num_attempts))
        .collect::<Vec<_>>();
    assert_eq!(actual, [("evt-b", 2), ("evt-c", 0)]);
    assert_eq!(repo.mark_delivered(vec![]).await.unwrap(), 0);
}
