use inventory::error::AppErrorCode;
use inventory::model::{StagingRowCreateModel, StagingRowEditModel, StagingRowFilterModel};
use inventory::repository::StagingRowInMemRepo;
use inventory::usecase::ManageStagingUseCase;

use crate::{ut_inmem_dstore, ut_setup_logctx, ut_staging_row, UT_SHOP_ID, UT_USERNAME};

async fn ut_usecase() -> ManageStagingUseCase {
    let ds = ut_inmem_dstore(600);
    let repo = StagingRowInMemRepo::new(ds).await.unwrap();
    ManageStagingUseCase {
        repo: Box::new(repo),
        logctx: ut_setup_logctx(),
    }
}

fn ut_edit_payload(barcode: &str, qty: f64, sum_amount: f64) -> StagingRowEditModel {
    StagingRowEditModel {
        barcode: barcode.to_string(),
        name: format!("item {barcode}"),
        unit_code: "PCS".to_string(),
        warehouse_code: "WH01".to_string(),
        shelf_code: "C-7".to_string(),
        qty,
        price: 3.0,
        sum_amount,
    }
}

fn ut_create_req(task_id: &str, row_number: Option<u32>, barcode: &str) -> StagingRowCreateModel {
    StagingRowCreateModel {
        task_id: task_id.to_string(),
        row_number,
        payload: ut_edit_payload(barcode, 2.0, 6.0),
    }
}

#[tokio::test]
async fn create_assign_row_number() {
    let uc = ut_usecase().await;
    let mut actual = Vec::new();
    for (row_number, barcode) in [
        (None, "8850001"),
        (None, "8850002"),
        (Some(7u32), "8850003"),
        (None, "8850004"),
        (Some(0u32), "8850005"),
        (None, "8850006"),
    ] {
        let req = ut_create_req("tsk01", row_number, barcode);
        let saved = uc.create(UT_SHOP_ID, UT_USERNAME, req).await.unwrap();
        assert_eq!(saved.task_id.as_str(), "tsk01");
        assert!(!saved.is_not_exist);
        actual.push(saved.row_number);
    }
    // explicit row number is kept even when it is zero
    assert_eq!(actual, [1, 2, 7, 8, 0, 9]);
    // row number is counted per task
    let saved = uc
        .create(UT_SHOP_ID, UT_USERNAME, ut_create_req("tsk02", None, "8850001"))
        .await
        .unwrap();
    assert_eq!(saved.row_number, 1);
    let meta = uc.meta(UT_SHOP_ID, "tsk01").await.unwrap();
    assert_eq!(meta.total_item, 6);
    assert_eq!(meta.total_amount, 36.0);
}

#[tokio::test]
async fn create_keep_raw_price() {
    let uc = ut_usecase().await;
    let req = StagingRowCreateModel {
        task_id: "tsk03".to_string(),
        row_number: None,
        payload: ut_edit_payload("8850001", 4.0, 100.0),
    };
    let saved = uc.create(UT_SHOP_ID, UT_USERNAME, req).await.unwrap();
    assert_eq!(saved.price, 3.0);
    assert_eq!(saved.created_by.as_str(), UT_USERNAME);
    let req = ut_create_req("", None, "8850001");
    let error = uc.create(UT_SHOP_ID, UT_USERNAME, req).await.err().unwrap();
    assert_eq!(error.code, AppErrorCode::InvalidInput);
}

#[tokio::test]
async fn list_page_limit_normalized() {
    let uc = ut_usecase().await;
    let rows = (1..=250)
        .map(|n| ut_staging_row("tsk04", format!("guid-{n:04}").as_str(), n, "8850001", 1.0, 1.0))
        .collect::<Vec<_>>();
    assert_eq!(uc.repo.create_batch(rows).await.unwrap(), 250);

    let filter = StagingRowFilterModel {
        page: 0,
        limit: 0,
        ..Default::default()
    };
    let (rows, pagination) = uc.list(UT_SHOP_ID, "tsk04", filter).await.unwrap();
    assert_eq!(rows.len(), 20);
    assert_eq!(rows[0].row_number, 1);
    assert_eq!(pagination.page, 1);
    assert_eq!(pagination.per_page, 20);
    assert_eq!(pagination.total, 250);
    assert_eq!(pagination.total_page, 13);

    let filter = StagingRowFilterModel {
        page: 2,
        limit: 1000,
        ..Default::default()
    };
    let (rows, pagination) = uc.list(UT_SHOP_ID, "tsk04", filter).await.unwrap();
    assert_eq!(pagination.per_page, 200);
    assert_eq!(rows.len(), 50);
    assert_eq!(rows[0].row_number, 201);

    let filter = StagingRowFilterModel {
        page: 3,
        limit: 5,
        ..Default::default()
    };
    let (rows, pagination) = uc.list(UT_SHOP_ID, "", filter).await.unwrap();
    assert!(rows.is_empty());
    assert_eq!(pagination.total, 0);
    assert_eq!(pagination.page, 3);
} // end of fn list_page_limit_normalized

#[tokio::test]
async fn update_delete_idempotent() {
    let uc = ut_usecase().await;
    let rows = vec![
        ut_staging_row("tsk05", "guid-01", 1, "8850001", 1.0, 5.0),
        ut_staging_row("tsk05", "guid-02", 2, "8850002", 1.0, 5.0),
        ut_staging_row("tsk05", "guid-03", 3, "8850003", 1.0, 5.0),
    ];
    uc.repo.create_batch(rows).await.unwrap();
    let num = uc
        .update(UT_SHOP_ID, "guid-02", ut_edit_payload("8850009", 9.0, 90.0))
        .await
        .unwrap();
    assert_eq!(num, 1);
    let num = uc
        .update(UT_SHOP_ID, "guid-nonexist", ut_edit_payload("8850009", 9.0, 90.0))
        .await
        .unwrap();
    assert_eq!(num, 0);
    assert_eq!(uc.delete(UT_SHOP_ID, "guid-01").await.unwrap(), 1);
    assert_eq!(uc.delete(UT_SHOP_ID, "guid-01").await.unwrap(), 0);
    let meta = uc.meta(UT_SHOP_ID, "tsk05").await.unwrap();
    assert_eq!(meta.total_item, 2);
    assert_eq!(meta.total_amount, 95.0);
    assert_eq!(uc.delete_task(UT_SHOP_ID, "tsk05").await.unwrap(), 2);
    assert_eq!(uc.delete_task(UT_SHOP_ID, "tsk05").await.unwrap(), 0);
    let meta = uc.meta(UT_SHOP_ID, "tsk05").await.unwrap();
    assert_eq!(meta.total_item, 0);
}
