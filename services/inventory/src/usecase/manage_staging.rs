use std::boxed::Box;
use std::result::Result as DefaultResult;
use std::sync::Arc;

use chrono::Local;

use erp_common::logging::{app_log_event, AppLogContext, AppLogLevel};

use crate::constant::hard_limit;
use crate::error::{AppError, AppErrorCode};
use crate::generate_guid;
use crate::model::{
    PaginationModel, StagingRowCreateModel, StagingRowEditModel, StagingRowFilterModel,
    StagingRowModel, StagingTaskMetaModel,
};
use crate::repository::AbsStagingRowRepo;

const DEFAULT_ROWS_PER_PAGE: u32 = 20;

/// single-row operations and read-side queries of an import task
pub struct ManageStagingUseCase {
    pub repo: Box<dyn AbsStagingRowRepo>,
    pub logctx: Arc<AppLogContext>,
}

impl ManageStagingUseCase {
    pub async fn create(
        &self,
        shop_id: &str,
        username: &str,
        data: StagingRowCreateModel,
    ) -> DefaultResult<StagingRowModel, AppError> {
        let StagingRowCreateModel {
            task_id,
            row_number,
            payload,
        } = data;
        if task_id.is_empty() {
            return Err(AppError {
                code: AppErrorCode::InvalidInput,
                detail: Some("taskid-empty".to_string()),
            });
        }
        let row_number = match row_number {
            Some(n) => n,
            None => {
                let max_num = self.repo.max_row_number(shop_id, task_id.as_str()).await?;
                max_num.map(|n| n + 1).unwrap_or(1)
            }
        };
        let mut row = StagingRowModel {
            shop_id: shop_id.to_string(),
            task_id,
            guid: generate_guid(),
            row_number,
            barcode: String::new(),
            name: String::new(),
            unit_code: String::new(),
            warehouse_code: String::new(),
            shelf_code: String::new(),
            qty: 0.0,
            price: 0.0,
            sum_amount: 0.0,
            is_not_exist: false,
            created_by: username.to_string(),
            created_at: Local::now().fixed_offset(),
        };
        row.apply_edit(payload);
        self.repo.create(row.clone()).await?;
        Ok(row)
    } // end of fn create

    pub async fn update(
        &self,
        shop_id: &str,
        guid: &str,
        data: StagingRowEditModel,
    ) -> DefaultResult<usize, AppError> {
        let num = self.repo.update(shop_id, guid, data).await?;
        if num == 0 {
            let logctx = &self.logctx;
            app_log_event!(logctx, AppLogLevel::DEBUG, "shop:{shop_id}, guid:{guid}, no-match");
        }
        Ok(num)
    }

    pub async fn delete(&self, shop_id: &str, guid: &str) -> DefaultResult<usize, AppError> {
        self.repo.delete_by_guid(shop_id, guid).await
    }

    pub async fn delete_task(&self, shop_id: &str, task_id: &str) -> DefaultResult<usize, AppError> {
        let num = self.repo.delete_by_task(shop_id, task_id).await?;
        let logctx = &self.logctx;
        app_log_event!(
            logctx,
            AppLogLevel::INFO,
            "shop:{shop_id}, task:{task_id}, num-deleted:{num}"
        );
        Ok(num)
    }

    pub async fn list(
        &self,
        shop_id: &str,
        task_id: &str,
        mut filter: StagingRowFilterModel,
    ) -> DefaultResult<(Vec<StagingRowModel>, PaginationModel), AppError> {
        filter.page = filter.page.max(1);
        filter.limit = match filter.limit {
            0 => DEFAULT_ROWS_PER_PAGE,
            n => n.min(hard_limit::MAX_ROWS_PER_PAGE),
        };
        if task_id.is_empty() {
            let p = PaginationModel::build(filter.page, filter.limit, 0);
            return Ok((Vec::new(), p));
        }
        self.repo.list(shop_id, task_id, &filter).await
    }

    pub async fn meta(&self, shop_id: &str, task_id: &str) -> DefaultResult<StagingTaskMetaModel, AppError> {
        self.repo.meta(shop_id, task_id).await
    }
} // end of impl ManageStagingUseCase
