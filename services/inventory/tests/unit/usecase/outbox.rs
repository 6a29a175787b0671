use inventory::model::{OutboxEventModel, StockBalanceDetailModel};
use inventory::repository::{AbsStockBalanceRepo, OutboxInMemRepo, StockBalanceInMemRepo};
use inventory::usecase::{OutboxDispatchOutput, OutboxDispatchUseCase};

use super::MockEventPublisher;
use crate::{ut_inmem_dstore, ut_product, ut_setup_logctx, ut_staging_row, ut_time, UT_SHOP_ID};

// save events the same way committed documents do
async fn ut_save_events(repo: &StockBalanceInMemRepo, ids: &[&str]) {
    for (idx, id) in ids.iter().enumerate() {
        let doc_no = format!("SB20240311-{:05}", idx + 1);
        let mut detail = StockBalanceDetailModel::build(
            &ut_product("8850001", "IT-001"),
            &ut_staging_row("tsk", "guid-1", 1, "8850001", 1.0, 3.0),
        );
        detail.doc_no = doc_no.clone();
        let event = OutboxEventModel {
            id: id.to_string(),
            shop_id: UT_SHOP_ID.to_string(),
            route: "inventory.stock_balance.created".to_string(),
            payload: format!(r#"{{"docno":"{doc_no}"}}"#),
            created_at: ut_time(format!("2024-03-11T10:00:0{idx}+07:00").as_str()),
            num_attempts: 0,
            delivered: false,
        };
        repo.create_details(UT_SHOP_ID, doc_no.as_str(), vec![detail], event)
            .await
            .unwrap();
    }
}

#[tokio::test]
async fn dispatch_pending_in_batch() {
    let ds = ut_inmem_dstore(50);
    let sb_repo = StockBalanceInMemRepo::new(ds.clone()).await.unwrap();
    ut_save_events(&sb_repo, &["evt-1", "evt-2", "evt-3"]).await;
    let (publisher, published) = MockEventPublisher::build(false);
    let uc = OutboxDispatchUseCase {
        repo: Box::new(OutboxInMemRepo::new(ds.clone()).await.unwrap()),
        publisher,
        logctx: ut_setup_logctx(),
    };
    let out = uc.execute(2).await.unwrap();
    let expect = OutboxDispatchOutput {
        num_delivered: 2,
        num_failed: 0,
    };
    assert_eq!(out, expect);
    let actual = published
        .lock()
        .unwrap()
        .iter()
        .map(|(_route, body)| body.clone())
        .collect::<Vec<_>>();
    assert_eq!(
        actual,
        [r#"{"docno":"SB20240311-00001"}"#, r#"{"docno":"SB20240311-00002"}"#]
    );
    let out = uc.execute(2).await.unwrap();
    assert_eq!(out.num_delivered, 1);
    let out = uc.execute(2).await.unwrap();
    assert_eq!(out, OutboxDispatchOutput::default());
    assert_eq!(published.lock().unwrap().len(), 3);
}

#[tokio::test]
async fn dispatch_publish_failure() {
    let ds = ut_inmem_dstore(50);
    let sb_repo = StockBalanceInMemRepo::new(ds.clone()).await.unwrap();
    ut_save_events(&sb_repo, &["evt-1", "evt-2"]).await;
    let (publisher, _published) = MockEventPublisher::build(true);
    let uc = OutboxDispatchUseCase {
        repo: Box::new(OutboxInMemRepo::new(ds.clone()).await.unwrap()),
        publisher,
        logctx: ut_setup_logctx(),
    };
    for _ in 0..2 {
        let out = uc.execute(10).await.unwrap();
        assert_eq!(out.num_failed, 2);
        assert_eq!(out.num_delivered, 0);
    }
    // failed events remain pending with attempts recorded
    let pending = uc.repo.fetch_pending(10).await.unwrap();
    let actual = pending
        .iter()
        .map(|e| (e.id.as_str(), e.num_attempts, e.delivered))
        .collect::<Vec<_>>();
    assert_eq!(actual, [("evt-1", 2, false), ("evt-2", 2, false)]);

    // broker recovered
    let (publisher, published) = MockEventPublisher::build(false);
    let uc = OutboxDispatchUseCase {
        repo: Box::new(OutboxInMemRepo::new(ds).await.unwrap()),
        publisher,
        logctx: ut_setup_logctx(),
    };
    let out = uc.execute(10).await.unwrap();
    assert_eq!(out.num_delivered, 2);
    assert_eq!(published.lock().unwrap().len(), 2);
    assert!(uc.repo.fetch_pending(10).await.unwrap().is_empty());
} // end of fn dispatch_publish_failure
