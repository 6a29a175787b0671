use std::boxed::Box;
use std::collections::HashMap;
use std::result::Result as DefaultResult;
use std::sync::Arc;

use chrono::Local;

use erp_common::logging::{app_log_event, AppLogContext, AppLogLevel};

use super::outbox::OutboxDispatchUseCase;
use super::verify_task::{split_chunks, VerifyTaskUseCase};
use crate::constant::EVENT_ROUTE_STOCK_BALANCE_CREATED;
use crate::error::{AppError, AppErrorCode};
use crate::generate_guid;
use crate::model::{
    OutboxEventModel, ProductBarcodeModel, StagingRowModel, StockBalanceDetailModel,
    StockBalanceHeaderModel, StockBalanceMessageModel, TransactionDetailModel,
};
use crate::repository::{AbsProductBarcodeRepo, AbsStagingRowRepo, AbsStockBalanceRepo};
use crate::task_lock::AppTaskLockTable;

/// promote verified staging rows of a task into a stock-balance document
pub struct CommitTaskUseCase {
    pub staging: Box<dyn AbsStagingRowRepo>,
    pub product: Box<dyn AbsProductBarcodeRepo>,
    pub stock_balance: Box<dyn AbsStockBalanceRepo>,
    pub dispatcher: OutboxDispatchUseCase,
    pub task_locks: Arc<AppTaskLockTable>,
    pub logctx: Arc<AppLogContext>,
    pub chunk_size: usize,
}

// resolved product and the staged row it applies to
type DetailPair = (ProductBarcodeModel, StagingRowModel);

impl CommitTaskUseCase {
    /// return document number of the new stock-balance document
    pub async fn execute(
        &self,
        shop_id: &str,
        username: &str,
        task_id: &str,
        header: StockBalanceHeaderModel,
    ) -> DefaultResult<String, AppError> {
        let _guard = self.task_locks.try_acquire(shop_id, task_id)?;
        let logctx = &self.logctx;
        let _verified = VerifyTaskUseCase::run(
            self.staging.as_ref(),
            self.product.as_ref(),
            logctx,
            self.chunk_size,
            shop_id,
            task_id,
        )
        .await?;
        let num_unresolved = self.staging.count_exist(shop_id, task_id, false).await?;
        if num_unresolved > 0 {
            app_log_event!(
                logctx,
                AppLogLevel::WARNING,
                "shop:{shop_id}, task:{task_id}, num-unresolved:{num_unresolved}"
            );
            return Err(AppError {
                code: AppErrorCode::UnresolvedBarcodes,
                detail: Some(format!("{num_unresolved} rows with unknown barcode")),
            });
        }
        let rows = self.staging.all(shop_id, task_id).await?;
        if rows.is_empty() {
            return Err(AppError {
                code: AppErrorCode::InvalidInput,
                detail: Some(format!("task-not-found:{task_id}")),
            });
        }
        let pairs = self.build_details(shop_id, rows.as_slice()).await?;

        let (header, header_guid, doc_no) = self
            .stock_balance
            .create_header(shop_id, username, header)
            .await?;
        let event = match self
            .save_details(shop_id, username, &header, doc_no.as_str(), pairs)
            .await
        {
            Ok(v) => v,
            Err(e) => {
                self.rollback_header(shop_id, username, header_guid.as_str())
                    .await;
                return Err(e);
            }
        };
        let num_cleaned = self.staging.delete_by_task(shop_id, task_id).await?;
        app_log_event!(
            logctx,
            AppLogLevel::INFO,
            "shop:{shop_id}, task:{task_id}, doc_no:{doc_no}, num-rows:{num_cleaned}"
        );
        // the event stays in outbox on failure, it will be sent later by
        // periodic dispatcher
        if let Err(e) = self.dispatcher.deliver(vec![event]).await {
            app_log_event!(logctx, AppLogLevel::ERROR, "doc_no:{doc_no}, {}", e);
        }
        Ok(doc_no)
    } // end of fn execute

    async fn build_details(
        &self,
        shop_id: &str,
        rows: &[StagingRowModel],
    ) -> DefaultResult<Vec<DetailPair>, AppError> {
        let mut out = Vec::with_capacity(rows.len());
        for chunk in split_chunks(rows, self.chunk_size) {
            let barcodes = chunk.iter().map(|r| r.barcode.clone()).collect::<Vec<_>>();
            let found = self
                .product
                .find_by_barcodes(shop_id, barcodes)
                .await?
                .into_iter()
                .map(|p| (p.barcode.clone(), p))
                .collect::<HashMap<_, _>>();
            // latest row of the same barcode in a chunk takes effect
            let mut staged: HashMap<&str, &StagingRowModel> = HashMap::new();
            let mut order: Vec<&str> = Vec::new();
            for r in chunk {
                if !found.contains_key(r.barcode.as_str()) {
                    return Err(AppError {
                        code: AppErrorCode::BarcodeNotFound,
                        detail: Some(r.barcode.clone()),
                    });
                }
                if staged.insert(r.barcode.as_str(), r).is_none() {
                    order.push(r.barcode.as_str());
                }
            }
            for barcode in order {
                if let (Some(p), Some(r)) = (found.get(barcode), staged.get(barcode)) {
                    out.push((p.clone(), (*r).clone()));
                }
            }
        }
        Ok(out)
    } // end of fn build_details

    /// write details and creation event in one step, return the event
    async fn save_details(
        &self,
        shop_id: &str,
        username: &str,
        header: &StockBalanceHeaderModel,
        doc_no: &str,
        pairs: Vec<DetailPair>,
    ) -> DefaultResult<OutboxEventModel, AppError> {
        let (details, txn_details): (Vec<_>, Vec<_>) = pairs
            .iter()
            .map(|(p, r)| {
                let mut d = StockBalanceDetailModel::build(p, r);
                d.doc_no = doc_no.to_string();
                (d, TransactionDetailModel::build(p, r, header))
            })
            .unzip();
        let created_at = Local::now().fixed_offset();
        let msg = StockBalanceMessageModel {
            header: header.clone(),
            shop_id: shop_id.to_string(),
            created_by: username.to_string(),
            created_at,
            details: txn_details,
        };
        let payload = serde_json::to_string(&msg).map_err(|e| AppError {
            code: AppErrorCode::DataCorruption,
            detail: Some(format!("event-serialize: {e}")),
        })?;
        let event = OutboxEventModel {
            id: generate_guid(),
            shop_id: shop_id.to_string(),
            route: EVENT_ROUTE_STOCK_BALANCE_CREATED.to_string(),
            payload,
            created_at,
            num_attempts: 0,
            delivered: false,
        };
        self.stock_balance
            .create_details(shop_id, doc_no, details, event.clone())
            .await?;
        Ok(event)
    } // end of fn save_details

    async fn rollback_header(&self, shop_id: &str, username: &str, header_guid: &str) {
        let logctx = &self.logctx;
        match self
            .stock_balance
            .delete_header(shop_id, header_guid, username)
            .await
        {
            Ok(()) => app_log_event!(
                logctx,
                AppLogLevel::WARNING,
                "shop:{shop_id}, header:{header_guid}, rolled back"
            ),
            Err(e) => app_log_event!(
                logctx,
                AppLogLevel::ERROR,
                "shop:{shop_id}, header:{header_guid}, rollback failed, {}",
                e
            ),
        }
    }
} // end of impl CommitTaskUseCase
