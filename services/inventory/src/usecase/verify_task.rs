use std::boxed::Box;
use std::collections::HashSet;
use std::result::Result as DefaultResult;
use std::sync::Arc;

use erp_common::logging::{app_log_event, AppLogContext, AppLogLevel};

use crate::error::AppError;
use crate::model::StagingRowModel;
use crate::repository::{AbsProductBarcodeRepo, AbsStagingRowRepo};

pub struct VerifyTaskUseCase {
    pub staging: Box<dyn AbsStagingRowRepo>,
    pub product: Box<dyn AbsProductBarcodeRepo>,
    pub logctx: Arc<AppLogContext>,
    pub chunk_size: usize,
}

#[derive(Debug, Default, PartialEq)]
pub struct VerifyTaskOutput {
    pub num_rows: usize,
    pub num_chunks: usize,
    // barcodes not found in product master, counted once per chunk
    pub num_not_exist: usize,
}

/// split rows of a task into positional chunks, a chunk ends at every
/// multiple of the chunk size except the first row, or at the last row
pub(crate) fn split_chunks(rows: &[StagingRowModel], chunk_size: usize) -> Vec<&[StagingRowModel]> {
    let total = rows.len();
    let chunk_size = chunk_size.max(1);
    let mut out = Vec::new();
    let mut start = 0usize;
    for i in 1..=total {
        if (i > 1 && i % chunk_size == 0) || i == total {
            out.push(&rows[start..i]);
            start = i;
        }
    }
    out
}

impl VerifyTaskUseCase {
    pub async fn execute(&self, shop_id: &str, task_id: &str) -> DefaultResult<VerifyTaskOutput, AppError> {
        Self::run(
            self.staging.as_ref(),
            self.product.as_ref(),
            &self.logctx,
            self.chunk_size,
            shop_id,
            task_id,
        )
        .await
    }

    /// refresh the flag `is_not_exist` of all rows in the task, the result
    /// stays the same on repeated calls as long as product master is unchanged
    pub(crate) async fn run(
        staging: &dyn AbsStagingRowRepo,
        product: &dyn AbsProductBarcodeRepo,
        logctx: &Arc<AppLogContext>,
        chunk_size: usize,
        shop_id: &str,
        task_id: &str,
    ) -> DefaultResult<VerifyTaskOutput, AppError> {
        let rows = staging.all(shop_id, task_id).await?;
        let chunks = split_chunks(rows.as_slice(), chunk_size);
        let mut output = VerifyTaskOutput {
            num_rows: rows.len(),
            num_chunks: chunks.len(),
            num_not_exist: 0,
        };
        for chunk in chunks {
            let mut prev_not_exist = HashSet::new();
            let mut barcodes = Vec::with_capacity(chunk.len());
            for r in chunk {
                if r.is_not_exist {
                    prev_not_exist.insert(r.barcode.clone());
                }
                barcodes.push(r.barcode.clone());
            }
            let found = product
                .find_by_barcodes(shop_id, barcodes.clone())
                .await?
                .into_iter()
                .map(|p| p.barcode)
                .collect::<HashSet<_>>();
            let not_exist = barcodes
                .into_iter()
                .filter(|b| !found.contains(b))
                .collect::<HashSet<_>>();
            let _num = staging
                .update_exist(shop_id, task_id, true, prev_not_exist.into_iter().collect())
                .await?;
            output.num_not_exist += not_exist.len();
            let _num = staging
                .update_exist(shop_id, task_id, false, not_exist.into_iter().collect())
                .await?;
        }
        app_log_event!(
            logctx,
            AppLogLevel::INFO,
            "shop:{shop_id}, task:{task_id}, {:?}",
            output
        );
        Ok(output)
    } // end of fn run
} // end of impl VerifyTaskUseCase
