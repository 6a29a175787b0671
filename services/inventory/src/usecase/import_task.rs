use std::boxed::Box;
use std::collections::HashMap;
use std::io::Cursor;
use std::result::Result as DefaultResult;
use std::sync::Arc;

use calamine::{Data, Reader, Xlsx};
use chrono::Local;

use erp_common::logging::{app_log_event, AppLogContext, AppLogLevel};

use crate::constant::{hard_limit, import_column, UPLOAD_FILE_EXTENSION};
use crate::error::{AppError, AppErrorCode};
use crate::model::StagingRowModel;
use crate::repository::AbsStagingRowRepo;
use crate::{generate_guid, generate_task_id};

/// payload of one data row in the uploaded worksheet
#[derive(Debug, Clone, PartialEq)]
pub struct ImportSheetRow {
    pub barcode: String,
    pub name: String,
    pub unit_code: String,
    pub warehouse_code: String,
    pub shelf_code: String,
    pub qty: f64,
    pub amount: f64,
}

pub struct ImportStagingFileUseCase {
    pub repo: Box<dyn AbsStagingRowRepo>,
    pub logctx: Arc<AppLogContext>,
    pub task_id_length: u8,
}

fn check_file_type(filename: &str) -> DefaultResult<(), AppError> {
    if filename.to_lowercase().ends_with(UPLOAD_FILE_EXTENSION) {
        Ok(())
    } else {
        Err(AppError {
            code: AppErrorCode::InvalidFileType,
            detail: Some(format!("file type must be {UPLOAD_FILE_EXTENSION}")),
        })
    }
}

fn cell_text(row: &[Data], idx: usize) -> String {
    match row.get(idx) {
        Some(Data::String(s)) => s.trim().to_string(),
        Some(Data::Empty) | None => String::new(),
        Some(Data::Float(f)) if f.fract() == 0.0 => format!("{}", *f as i64),
        Some(other) => other.to_string().trim().to_string(),
    }
}

fn cell_number(row: &[Data], idx: usize) -> Option<f64> {
    match row.get(idx)? {
        Data::Float(f) => Some(*f),
        Data::Int(i) => Some(*i as f64),
        Data::String(s) => s.trim().parse::<f64>().ok(),
        _others => None,
    }
}

fn is_blank_row(row: &[Data]) -> bool {
    row.iter().all(|c| match c {
        Data::Empty => true,
        Data::String(s) => s.trim().is_empty(),
        _others => false,
    })
}

impl ImportStagingFileUseCase {
    /// stage all rows of the uploaded workbook under a new task, return
    /// the task ID. Nothing is saved if any row is invalid.
    pub async fn execute(
        self,
        shop_id: &str,
        username: &str,
        filename: &str,
        raw: Vec<u8>,
    ) -> DefaultResult<String, AppError> {
        check_file_type(filename)?;
        let sheet_rows = Self::parse_workbook(raw)?;
        let task_id = generate_task_id(self.task_id_length);
        let created_at = Local::now().fixed_offset();
        let rows = sheet_rows
            .into_iter()
            .enumerate()
            .map(|(idx, r)| StagingRowModel {
                shop_id: shop_id.to_string(),
                task_id: task_id.clone(),
                guid: generate_guid(),
                row_number: (idx + 1) as u32,
                price: StagingRowModel::derive_price(r.qty, r.amount),
                barcode: r.barcode,
                name: r.name,
                unit_code: r.unit_code,
                warehouse_code: r.warehouse_code,
                shelf_code: r.shelf_code,
                qty: r.qty,
                sum_amount: r.amount,
                is_not_exist: false,
                created_by: username.to_string(),
                created_at,
            })
            .collect::<Vec<_>>();
        let num_saved = self.repo.create_batch(rows).await?;
        let logctx = &self.logctx;
        app_log_event!(
            logctx,
            AppLogLevel::INFO,
            "shop:{shop_id}, task:{task_id}, num-rows:{num_saved}"
        );
        Ok(task_id)
    } // end of fn execute

    /// read the first worksheet, the first row of the used range is the
    /// header. Data rows are numbered by their position below the header,
    /// only the blank rows at the end of the sheet are trimmed
    pub fn parse_workbook(raw: Vec<u8>) -> DefaultResult<Vec<ImportSheetRow>, AppError> {
        let mut wb = Xlsx::new(Cursor::new(raw)).map_err(|e| AppError {
            code: AppErrorCode::InvalidInput,
            detail: Some(format!("workbook: {e}")),
        })?;
        let range = match wb.worksheet_range_at(0) {
            Some(Ok(r)) => r,
            Some(Err(e)) => {
                return Err(AppError {
                    code: AppErrorCode::InvalidInput,
                    detail: Some(format!("worksheet: {e}")),
                })
            }
            None => {
                return Err(AppError {
                    code: AppErrorCode::EmptySheet,
                    detail: Some("no-sheet".to_string()),
                })
            }
        };
        let mut row_iter = range.rows();
        let header = row_iter.next().ok_or(AppError {
            code: AppErrorCode::EmptySheet,
            detail: Some("no-header".to_string()),
        })?;
        let col_map = Self::map_columns(header)?;
        let mut data_rows = row_iter.collect::<Vec<_>>();
        while data_rows.last().is_some_and(|r| is_blank_row(r)) {
            data_rows.pop();
        }
        if data_rows.is_empty() {
            return Err(AppError {
                code: AppErrorCode::EmptySheet,
                detail: Some("no-data-row".to_string()),
            });
        } else if data_rows.len() > hard_limit::MAX_ROWS_PER_IMPORT {
            return Err(AppError {
                code: AppErrorCode::ExceedingMaxLimit,
                detail: Some(format!(
                    "num-rows:{}, limit:{}",
                    data_rows.len(),
                    hard_limit::MAX_ROWS_PER_IMPORT
                )),
            });
        }
        data_rows
            .into_iter()
            .enumerate()
            .map(|(idx, row)| Self::parse_row(idx + 1, row, &col_map))
            .collect()
    } // end of fn parse_workbook

    fn map_columns(header: &[Data]) -> DefaultResult<HashMap<&'static str, usize>, AppError> {
        let labels = header
            .iter()
            .map(|c| c.to_string().trim().to_string())
            .collect::<Vec<_>>();
        import_column::REQUIRED
            .iter()
            .map(|expect| {
                let pos = labels.iter().position(|l| l.as_str() == *expect);
                pos.map(|p| (*expect, p)).ok_or(AppError {
                    code: AppErrorCode::MissingColumn,
                    detail: Some(expect.to_string()),
                })
            })
            .collect()
    }

    fn parse_row(
        row_number: usize,
        row: &[Data],
        col_map: &HashMap<&'static str, usize>,
    ) -> DefaultResult<ImportSheetRow, AppError> {
        // all required labels were checked in `map_columns`
        let col = |label: &str| col_map.get(label).copied().unwrap_or(usize::MAX);
        let qty = cell_number(row, col(import_column::QTY)).ok_or(AppError {
            code: AppErrorCode::InvalidNumber,
            detail: Some(format!("qty in row {row_number} invalid")),
        })?;
        let amount = cell_number(row, col(import_column::AMOUNT)).ok_or(AppError {
            code: AppErrorCode::InvalidNumber,
            detail: Some(format!("amount in row {row_number} invalid")),
        })?;
        Ok(ImportSheetRow {
            barcode: cell_text(row, col(import_column::BARCODE)),
            name: cell_text(row, col(import_column::NAME)),
            unit_code: cell_text(row, col(import_column::UNIT_CODE)),
            warehouse_code: cell_text(row, col(import_column::WAREHOUSE_CODE)),
            shelf_code: cell_text(row, col(import_column::SHELF_CODE)),
            qty,
            amount,
        })
    }
} // end of impl ImportStagingFileUseCase
