use inventory::model::StagingRowModel;
use inventory::repository::{
    AbsProductBarcodeRepo, AbsStagingRowRepo, ProductBarcodeInMemRepo, StagingRowInMemRepo,
};
use inventory::usecase::{VerifyTaskOutput, VerifyTaskUseCase};

use super::MockProductRepo;
use crate::{ut_inmem_dstore, ut_product, ut_setup_logctx, ut_staging_row, UT_SHOP_ID};

fn ut_rows(task_id: &str, barcodes: &[&str]) -> Vec<StagingRowModel> {
    barcodes
        .iter()
        .enumerate()
        .map(|(idx, b)| {
            let guid = format!("guid-{idx:05}");
            ut_staging_row(task_id, guid.as_str(), (idx + 1) as u32, b, 1.0, 10.0)
        })
        .collect()
}

fn ut_flags(rows: &[StagingRowModel]) -> Vec<(&str, bool)> {
    rows.iter()
        .map(|r| (r.barcode.as_str(), r.is_not_exist))
        .collect()
}

#[tokio::test]
async fn flag_unknown_barcodes_idempotent() {
    let ds = ut_inmem_dstore(100);
    let staging = StagingRowInMemRepo::new(ds.clone()).await.unwrap();
    let product = ProductBarcodeInMemRepo::new(ds.clone()).await.unwrap();
    product
        .save(UT_SHOP_ID, vec![ut_product("8850001", "IT-001"), ut_product("8850002", "IT-002")])
        .await
        .unwrap();
    let rows = ut_rows("tsk01", &["8850001", "X-404", "8850002", "8850001", "Y-500", "X-404", "8850002"]);
    staging.create_batch(rows).await.unwrap();
    let uc = VerifyTaskUseCase {
        staging: Box::new(staging),
        product: Box::new(product),
        logctx: ut_setup_logctx(),
        chunk_size: 3,
    };
    let expect_flags = [
        ("8850001", false),
        ("X-404", true),
        ("8850002", false),
        ("8850001", false),
        ("Y-500", true),
        ("X-404", true),
        ("8850002", false),
    ];
    for _ in 0..3 {
        let out = uc.execute(UT_SHOP_ID, "tsk01").await.unwrap();
        // chunks : [1,2,3], [4,5,6], [7]
        let expect = VerifyTaskOutput {
            num_rows: 7,
            num_chunks: 3,
            num_not_exist: 3,
        };
        assert_eq!(out, expect);
        let rows = uc.staging.all(UT_SHOP_ID, "tsk01").await.unwrap();
        assert_eq!(ut_flags(&rows), expect_flags);
    }
    assert_eq!(uc.staging.count_exist(UT_SHOP_ID, "tsk01", false).await.unwrap(), 3);
} // end of fn flag_unknown_barcodes_idempotent

#[tokio::test]
async fn clear_flag_after_product_added() {
    let ds = ut_inmem_dstore(100);
    let staging = StagingRowInMemRepo::new(ds.clone()).await.unwrap();
    let product = ProductBarcodeInMemRepo::new(ds.clone()).await.unwrap();
    let rows = ut_rows("tsk02", &["8850001", "8850002"]);
    staging.create_batch(rows).await.unwrap();
    let uc = VerifyTaskUseCase {
        staging: Box::new(staging),
        product: Box::new(product),
        logctx: ut_setup_logctx(),
        chunk_size: 5000,
    };
    let out = uc.execute(UT_SHOP_ID, "tsk02").await.unwrap();
    assert_eq!(out.num_not_exist, 2);
    assert_eq!(out.num_chunks, 1);
    uc.product
        .save(UT_SHOP_ID, vec![ut_product("8850002", "IT-002")])
        .await
        .unwrap();
    let out = uc.execute(UT_SHOP_ID, "tsk02").await.unwrap();
    assert_eq!(out.num_not_exist, 1);
    let rows = uc.staging.all(UT_SHOP_ID, "tsk02").await.unwrap();
    assert_eq!(ut_flags(&rows), [("8850001", true), ("8850002", false)]);
    // products of other shops never resolve barcodes of this shop
    uc.product
        .save("other-shop", vec![ut_product("8850001", "IT-001")])
        .await
        .unwrap();
    let out = uc.execute(UT_SHOP_ID, "tsk02").await.unwrap();
    assert_eq!(out.num_not_exist, 1);
}

#[tokio::test]
async fn lookup_per_chunk() {
    let ds = ut_inmem_dstore(20000);
    let staging = StagingRowInMemRepo::new(ds).await.unwrap();
    let barcodes = (0..10001).map(|n| format!("885{n:07}")).collect::<Vec<_>>();
    let rows = {
        let refs = barcodes.iter().map(String::as_str).collect::<Vec<_>>();
        ut_rows("tsk03", refs.as_slice())
    };
    assert_eq!(staging.create_batch(rows).await.unwrap(), 10001);
    let (product, lookups) = MockProductRepo::build(&["8850000000", "8850010000"]);
    let uc = VerifyTaskUseCase {
        staging: Box::new(staging),
        product: Box::new(product),
        logctx: ut_setup_logctx(),
        chunk_size: 5000,
    };
    let out = uc.execute(UT_SHOP_ID, "tsk03").await.unwrap();
    assert_eq!(out.num_rows, 10001);
    assert_eq!(out.num_chunks, 3);
    assert_eq!(out.num_not_exist, 9999);
    let actual = lookups.lock().unwrap().clone();
    assert_eq!(actual, [5000, 5000, 1]);
}

#[tokio::test]
async fn empty_task() {
    let ds = ut_inmem_dstore(10);
    let staging = StagingRowInMemRepo::new(ds).await.unwrap();
    let (product, lookups) = MockProductRepo::build(&[]);
    let uc = VerifyTaskUseCase {
        staging: Box::new(staging),
        product: Box::new(product),
        logctx: ut_setup_logctx(),
        chunk_size: 3,
    };
    let out = uc.execute(UT_SHOP_ID, "nonexist").await.unwrap();
    assert_eq!(out, VerifyTaskOutput::default());
    assert!(lookups.lock().unwrap().is_empty());
}
