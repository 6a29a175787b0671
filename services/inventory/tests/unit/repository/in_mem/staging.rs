use inventory::model::{StagingRowEditModel, StagingRowFilterModel};
use inventory::repository::{AbsStagingRowRepo, StagingRowInMemRepo};

use crate::{ut_inmem_dstore, ut_staging_row, UT_SHOP_ID};

async fn ut_setup_repo() -> StagingRowInMemRepo {
    let ds = ut_inmem_dstore(100);
    StagingRowInMemRepo::new(ds).await.unwrap()
}

async fn ut_setup_saved_repo(task_id: &str) -> StagingRowInMemRepo {
    let repo = ut_setup_repo().await;
    let rows = vec![
        ut_staging_row(task_id, "guid-03", 3, "8850123", 4.0, 100.0),
        ut_staging_row(task_id, "guid-01", 1, "8850999", 2.0, 30.0),
        ut_staging_row(task_id, "guid-02", 2, "CH-0042", 10.0, 0.0),
        ut_staging_row("other-task", "guid-91", 1, "8850123", 1.0, 1.0),
    ];
    let result = repo.create_batch(rows).await;
    assert_eq!(result.unwrap(), 4);
    repo
}

#[tokio::test]
async fn fetch_all_ordered_ok() {
    let repo = ut_setup_saved_repo("tsk01").await;
    let rows = repo.all(UT_SHOP_ID, "tsk01").await.unwrap();
    let actual = rows.iter().map(|r| r.guid.as_str()).collect::<Vec<_>>();
    assert_eq!(actual, ["guid-01", "guid-02", "guid-03"]);
    assert_eq!(rows[2].price, 25.0);
    assert_eq!(rows[1].price, 0.0);
    // rows of other shops are invisible
    let rows = repo.all("another-shop", "tsk01").await.unwrap();
    assert!(rows.is_empty());
}

#[tokio::test]
async fn list_filter_pagination() {
    let repo = ut_setup_saved_repo("tsk02").await;
    let filter = StagingRowFilterModel {
        exist: None,
        query: Some("885".to_string()),
        page: 1,
        limit: 1,
    };
    let (rows, pagination) = repo.list(UT_SHOP_ID, "tsk02", &filter).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].barcode.as_str(), "8850999");
    assert_eq!(pagination.total, 2);
    assert_eq!(pagination.total_page, 2);
    let filter = StagingRowFilterModel {
        page: 2,
        ..filter
    };
    let (rows, _) = repo.list(UT_SHOP_ID, "tsk02", &filter).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].barcode.as_str(), "8850123");
    // case-insensitive prefix match on name
    let filter = StagingRowFilterModel {
        exist: None,
        query: Some("ITEM CH".to_string()),
        page: 1,
        limit: 20,
    };
    let (rows, pagination) = repo.list(UT_SHOP_ID, "tsk02", &filter).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(pagination.total, 1);
    assert_eq!(rows[0].guid.as_str(), "guid-02");
} // end of fn list_filter_pagination

#[tokio::test]
async fn update_exist_and_count() {
    let repo = ut_setup_saved_repo("tsk03").await;
    let barcodes = vec!["8850123".to_string(), "unknown".to_string()];
    let result = repo.update_exist(UT_SHOP_ID, "tsk03", false, barcodes).await;
    // the row with the same barcode in other task is untouched
    assert_eq!(result.unwrap(), 1);
    assert_eq!(repo.count_exist(UT_SHOP_ID, "tsk03", false).await.unwrap(), 1);
    assert_eq!(repo.count_exist(UT_SHOP_ID, "tsk03", true).await.unwrap(), 2);
    let filter = StagingRowFilterModel {
        exist: Some(false),
        query: None,
        page: 1,
        limit: 20,
    };
    let (rows, _) = repo.list(UT_SHOP_ID, "tsk03", &filter).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert!(rows[0].is_not_exist);
    let other = repo.all(UT_SHOP_ID, "other-task").await.unwrap();
    assert!(!other[0].is_not_exist);

    let result = repo
        .update_exist(UT_SHOP_ID, "tsk03", true, vec!["8850123".to_string()])
        .await;
    assert_eq!(result.unwrap(), 1);
    assert_eq!(repo.count_exist(UT_SHOP_ID, "tsk03", false).await.unwrap(), 0);
    let result = repo.update_exist(UT_SHOP_ID, "tsk03", true, vec![]).await;
    assert_eq!(result.unwrap(), 0);
}

#[tokio::test]
async fn update_delete_single_row() {
    let repo = ut_setup_saved_repo("tsk04").await;
    let edit = StagingRowEditModel {
        barcode: "8850777".to_string(),
        name: "renamed".to_string(),
        unit_code: "BOX".to_string(),
        warehouse_code: "WH09".to_string(),
        shelf_code: "A-1".to_string(),
        qty: 6.0,
        price: 1.5,
        sum_amount: 999.0,
    };
    let num = repo.update(UT_SHOP_ID, "guid-02", edit.clone()).await.unwrap();
    assert_eq!(num, 1);
    let num = repo.update(UT_SHOP_ID, "guid-nonexist", edit).await.unwrap();
    assert_eq!(num, 0);
    let rows = repo.all(UT_SHOP_ID, "tsk04").await.unwrap();
    let saved = rows.iter().find(|r| r.guid == "guid-02").unwrap();
    assert_eq!(saved.barcode.as_str(), "8850777");
    assert_eq!(saved.row_number, 2);
    // price is stored as given, not derived from amount
    assert_eq!(saved.price, 1.5);
    assert_eq!(saved.sum_amount, 999.0);

    assert_eq!(repo.delete_by_guid(UT_SHOP_ID, "guid-01").await.unwrap(), 1);
    assert_eq!(repo.delete_by_guid(UT_SHOP_ID, "guid-01").await.unwrap(), 0);
    assert_eq!(repo.max_row_number(UT_SHOP_ID, "tsk04").await.unwrap(), Some(3));
    assert_eq!(repo.delete_by_task(UT_SHOP_ID, "tsk04").await.unwrap(), 2);
    assert_eq!(repo.max_row_number(UT_SHOP_ID, "tsk04").await.unwrap(), None);
    assert_eq!(repo.all(UT_SHOP_ID, "other-task").await.unwrap().len(), 1);
}

#[tokio::test]
async fn task_meta_ok() {
    let repo = ut_setup_saved_repo("tsk05").await;
    let meta = repo.meta(UT_SHOP_ID, "tsk05").await.unwrap();
    assert_eq!(meta.total_item, 3);
    assert_eq!(meta.total_amount, 130.0);
    let meta = repo.meta(UT_SHOP_ID, "nonexist").await.unwrap();
    assert_eq!(meta.total_item, 0);
    assert_eq!(meta.total_amount, 0.0);
}

#[tokio::test]
async fn shop_id_with_delimiter() {
    let repo = ut_setup_repo().await;
    let shops = ["chain", "chain/b1", "chain%2Fb1"];
    let rows = shops
        .iter()
        .enumerate()
        .map(|(idx, shop)| {
            let mut r = ut_staging_row("tsk06", format!("guid-{idx}").as_str(), 1, "8850001", 1.0, 5.0);
            r.shop_id = shop.to_string();
            r
        })
        .collect::<Vec<_>>();
    assert_eq!(repo.create_batch(rows).await.unwrap(), 3);
    for (idx, shop) in shops.iter().enumerate() {
        let rows = repo.all(shop, "tsk06").await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].shop_id.as_str(), *shop);
        assert_eq!(rows[0].guid, format!("guid-{idx}"));
    }
    assert_eq!(repo.delete_by_task("chain", "tsk06").await.unwrap(), 1);
    assert_eq!(repo.meta("chain/b1", "tsk06").await.unwrap().total_item, 1);
    assert_eq!(repo.meta("chain%2Fb1", "tsk06").await.unwrap().total_item, 1);
}
