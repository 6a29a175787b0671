use inventory::repository::{AbsProductBarcodeRepo, ProductBarcodeInMemRepo};

use crate::{ut_inmem_dstore, ut_product, UT_SHOP_ID};

#[tokio::test]
async fn find_by_barcodes_ok() {
    let ds = ut_inmem_dstore(50);
    let repo = ProductBarcodeInMemRepo::new(ds).await.unwrap();
    let items = vec![
        ut_product("8850001", "IT-001"),
        ut_product("8850002", "IT-002"),
        ut_product("8850003", "IT-003"),
    ];
    repo.save(UT_SHOP_ID, items).await.unwrap();
    repo.save("other-shop", vec![ut_product("8850009", "IT-009")])
        .await
        .unwrap();

    let barcodes = ["8850003", "nonexist", "8850001", "8850003", "8850009"]
        .into_iter()
        .map(String::from)
        .collect();
    let found = repo.find_by_barcodes(UT_SHOP_ID, barcodes).await.unwrap();
    // missing and duplicate barcodes are omitted, products of other shops
    // are invisible
    let actual = found.iter().map(|p| p.item_code.as_str()).collect::<Vec<_>>();
    assert_eq!(actual, ["IT-003", "IT-001"]);
    assert_eq!(found[1], ut_product("8850001", "IT-001"));
    assert_eq!(found[1].names.len(), 2);
}

#[tokio::test]
async fn find_nothing() {
    let ds = ut_inmem_dstore(50);
    let repo = ProductBarcodeInMemRepo::new(ds).await.unwrap();
    let found = repo.find_by_barcodes(UT_SHOP_ID, vec![]).await.unwrap();
    assert!(found.is_empty());
    let found = repo
        .find_by_barcodes(UT_SHOP_ID, vec!["8850001".to_string()])
        .await
        .unwrap();
    assert!(found.is_empty());
}
