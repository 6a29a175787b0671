use std::boxed::Box;
use std::result::Result as DefaultResult;
use std::sync::Arc;
use std::vec::Vec;

use async_trait::async_trait;

use crate::error::{AppError, AppErrorCode};
use crate::model::{
    OutboxEventModel, PaginationModel, ProductBarcodeModel, StagingRowEditModel,
    StagingRowFilterModel, StagingRowModel, StagingTaskMetaModel, StockBalanceDetailModel,
    StockBalanceHeaderModel,
};
use crate::AppDataStoreContext;

mod in_mem;
// make in-memory repo visible only for testing purpose
pub use in_mem::outbox::OutboxInMemRepo;
pub use in_mem::product::ProductBarcodeInMemRepo;
pub use in_mem::staging::StagingRowInMemRepo;
pub use in_mem::stock_balance::StockBalanceInMemRepo;

#[cfg(feature = "mariadb")]
mod mariadb;

#[cfg(feature = "mariadb")]
use mariadb::outbox::OutboxMariaDbRepo;
#[cfg(feature = "mariadb")]
use mariadb::product::ProductBarcodeMariaDbRepo;
#[cfg(feature = "mariadb")]
use mariadb::staging::StagingRowMariaDbRepo;
#[cfg(feature = "mariadb")]
use mariadb::stock_balance::StockBalanceMariaDbRepo;

// the repository instance may be used across an await,
// the future created by app callers has to be able to pass to different threads
// , it is the reason to add `Send` and `Sync` as super-traits

/// Staging store of import tasks, all rows are scoped by shop and task
#[async_trait]
pub trait AbsStagingRowRepo: Sync + Send {
    /// all rows of a task, ordered by row number then guid
    async fn all(&self, shop_id: &str, task_id: &str) -> DefaultResult<Vec<StagingRowModel>, AppError>;

    async fn list(
        &self,
        shop_id: &str,
        task_id: &str,
        filter: &StagingRowFilterModel,
    ) -> DefaultResult<(Vec<StagingRowModel>, PaginationModel), AppError>;

    async fn create(&self, row: StagingRowModel) -> DefaultResult<(), AppError>;

    async fn create_batch(&self, rows: Vec<StagingRowModel>) -> DefaultResult<usize, AppError>;

    /// return number of rows modified, zero if the guid does not exist
    async fn update(
        &self,
        shop_id: &str,
        guid: &str,
        data: StagingRowEditModel,
    ) -> DefaultResult<usize, AppError>;

    async fn delete_by_guid(&self, shop_id: &str, guid: &str) -> DefaultResult<usize, AppError>;

    async fn delete_by_task(&self, shop_id: &str, task_id: &str) -> DefaultResult<usize, AppError>;

    async fn meta(&self, shop_id: &str, task_id: &str) -> DefaultResult<StagingTaskMetaModel, AppError>;

    async fn max_row_number(&self, shop_id: &str, task_id: &str) -> DefaultResult<Option<u32>, AppError>;

    /// set the flag `is_not_exist` to the negation of `is_exist` on all rows
    /// of the task whose barcode is in the given list
    async fn update_exist(
        &self,
        shop_id: &str,
        task_id: &str,
        is_exist: bool,
        barcodes: Vec<String>,
    ) -> DefaultResult<usize, AppError>;

    async fn count_exist(&self, shop_id: &str, task_id: &str, is_exist: bool) -> DefaultResult<u64, AppError>;
} // end of trait AbsStagingRowRepo

#[async_trait]
pub trait AbsProductBarcodeRepo: Sync + Send {
    /// records which cannot be found are absent from the returned list
    async fn find_by_barcodes(
        &self,
        shop_id: &str,
        barcodes: Vec<String>,
    ) -> DefaultResult<Vec<ProductBarcodeModel>, AppError>;

    async fn save(&self, shop_id: &str, items: Vec<ProductBarcodeModel>) -> DefaultResult<(), AppError>;
}

#[async_trait]
pub trait AbsStockBalanceRepo: Sync + Send {
    /// return the saved header, its guid, and the assigned document number
    async fn create_header(
        &self,
        shop_id: &str,
        username: &str,
        header: StockBalanceHeaderModel,
    ) -> DefaultResult<(StockBalanceHeaderModel, String, String), AppError>;

    /// details and the outbox record are written together, none of them is
    /// saved on failure
    async fn create_details(
        &self,
        shop_id: &str,
        doc_no: &str,
        details: Vec<StockBalanceDetailModel>,
        event: OutboxEventModel,
    ) -> DefaultResult<(), AppError>;

    async fn delete_header(&self, shop_id: &str, header_guid: &str, username: &str) -> DefaultResult<(), AppError>;

    async fn fetch_header(
        &self,
        shop_id: &str,
        header_guid: &str,
    ) -> DefaultResult<Option<StockBalanceHeaderModel>, AppError>;

    async fn fetch_details(
        &self,
        shop_id: &str,
        doc_no: &str,
    ) -> DefaultResult<Vec<StockBalanceDetailModel>, AppError>;
} // end of trait AbsStockBalanceRepo

#[async_trait]
pub trait AbsOutboxRepo: Sync + Send {
    /// undelivered events, oldest first
    async fn fetch_pending(&self, limit: usize) -> DefaultResult<Vec<OutboxEventModel>, AppError>;
    async fn mark_delivered(&self, ids: Vec<String>) -> DefaultResult<usize, AppError>;
    async fn record_failure(&self, ids: Vec<String>) -> DefaultResult<usize, AppError>;
}

pub async fn app_repo_staging(
    ds: Arc<AppDataStoreContext>,
) -> DefaultResult<Box<dyn AbsStagingRowRepo>, AppError> {
    #[cfg(feature = "mariadb")]
    if let Some(dbs) = ds.sql_dbs.as_ref() {
        let obj = StagingRowMariaDbRepo::new(dbs)?;
        Ok(Box::new(obj))
    } else {
        Err(AppError {
            code: AppErrorCode::FeatureDisabled,
            detail: Some("mariadb".to_string()),
        })
    }
    #[cfg(not(feature = "mariadb"))]
    if let Some(m) = ds.in_mem.as_ref() {
        let obj = StagingRowInMemRepo::new(m.clone()).await?;
        Ok(Box::new(obj))
    } else {
        Err(AppError {
            code: AppErrorCode::MissingDataStore,
            detail: Some("unknown-type".to_string()),
        })
    }
}

pub async fn app_repo_product_barcode(
    ds: Arc<AppDataStoreContext>,
) -> DefaultResult<Box<dyn AbsProductBarcodeRepo>, AppError> {
    #[cfg(feature = "mariadb")]
    if let Some(dbs) = ds.sql_dbs.as_ref() {
        let obj = ProductBarcodeMariaDbRepo::new(dbs)?;
        Ok(Box::new(obj))
    } else {
        Err(AppError {
            code: AppErrorCode::FeatureDisabled,
            detail: Some("mariadb".to_string()),
        })
    }
    #[cfg(not(feature = "mariadb"))]
    if let Some(m) = ds.in_mem.as_ref() {
        let obj = ProductBarcodeInMemRepo::new(m.clone()).await?;
        Ok(Box::new(obj))
    } else {
        Err(AppError {
            code: AppErrorCode::MissingDataStore,
            detail: Some("unknown-type".to_string()),
        })
    }
}

pub async fn app_repo_stock_balance(
    ds: Arc<AppDataStoreContext>,
) -> DefaultResult<Box<dyn AbsStockBalanceRepo>, AppError> {
    #[cfg(feature = "mariadb")]
    if let Some(dbs) = ds.sql_dbs.as_ref() {
        let obj = StockBalanceMariaDbRepo::new(dbs)?;
        Ok(Box::new(obj))
    } else {
        Err(AppError {
            code: AppErrorCode::FeatureDisabled,
            detail: Some("mariadb".to_string()),
        })
    }
    #[cfg(not(feature = "mariadb"))]
    if let Some(m) = ds.in_mem.as_ref() {
        let obj = StockBalanceInMemRepo::new(m.clone()).await?;
        Ok(Box::new(obj))
    } else {
        Err(AppError {
            code: AppErrorCode::MissingDataStore,
            detail: Some("unknown-type".to_string()),
        })
    }
}

pub async fn app_repo_outbox(
    ds: Arc<AppDataStoreContext>,
) -> DefaultResult<Box<dyn AbsOutboxRepo>, AppError> {
    #[cfg(feature = "mariadb")]
    if let Some(dbs) = ds.sql_dbs.as_ref() {
        let obj = OutboxMariaDbRepo::new(dbs)?;
        Ok(Box::new(obj))
    } else {
        Err(AppError {
            code: AppErrorCode::FeatureDisabled,
            detail: Some("mariadb".to_string()),
        })
    }
    #[cfg(not(feature = "mariadb"))]
    if let Some(m) = ds.in_mem.as_ref() {
        let obj = OutboxInMemRepo::new(m.clone()).await?;
        Ok(Box::new(obj))
    } else {
        Err(AppError {
            code: AppErrorCode::MissingDataStore,
            detail: Some("unknown-type".to_string()),
        })
    }
}
