use std::cmp::Ordering;

use chrono::{DateTime, FixedOffset};

use crate::api::web::dto::{StagingRowCreateReqDto, StagingRowEditReqDto};

/// one pending inventory line of an import task, owned exclusively by
/// the staging repository until the task is committed or deleted
#[derive(Debug, Clone, PartialEq)]
pub struct StagingRowModel {
    pub shop_id: String,
    pub task_id: String,
    pub guid: String,
    pub row_number: u32,
    pub barcode: String,
    pub name: String,
    pub unit_code: String,
    pub warehouse_code: String,
    pub shelf_code: String,
    pub qty: f64,
    pub price: f64,
    pub sum_amount: f64,
    // set by verification, true if the barcode was not found in product master
    pub is_not_exist: bool,
    pub created_by: String,
    pub created_at: DateTime<FixedOffset>,
}

/// raw overwrite of payload fields, price is never re-derived from it
#[derive(Debug, Clone)]
pub struct StagingRowEditModel {
    pub barcode: String,
    pub name: String,
    pub unit_code: String,
    pub warehouse_code: String,
    pub shelf_code: String,
    pub qty: f64,
    pub price: f64,
    pub sum_amount: f64,
}

#[derive(Debug, Clone, Default)]
pub struct StagingRowFilterModel {
    // `Some(true)` keeps rows whose barcode resolved in the last verification
    pub exist: Option<bool>,
    // case-insensitive prefix of barcode, name or unit code
    pub query: Option<String>,
    pub page: u32,
    pub limit: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StagingTaskMetaModel {
    pub total_item: u64,
    pub total_amount: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PaginationModel {
    pub page: u32,
    pub per_page: u32,
    pub total: u64,
    pub total_page: u64,
}

impl StagingRowModel {
    pub fn derive_price(qty: f64, amount: f64) -> f64 {
        if qty > 0.0 && amount > 0.0 {
            amount / qty
        } else {
            0.0
        }
    }

    pub fn apply_edit(&mut self, data: StagingRowEditModel) {
        let StagingRowEditModel {
            barcode,
            name,
            unit_code,
            warehouse_code,
            shelf_code,
            qty,
            price,
            sum_amount,
        } = data;
        self.barcode = barcode;
        self.name = name;
        self.unit_code = unit_code;
        self.warehouse_code = warehouse_code;
        self.shelf_code = shelf_code;
        self.qty = qty;
        self.price = price;
        self.sum_amount = sum_amount;
    }

    /// natural iteration order of rows within a task
    pub fn cmp_position(&self, other: &Self) -> Ordering {
        self.row_number
            .cmp(&other.row_number)
            .then_with(|| self.guid.cmp(&other.guid))
    }

    pub(crate) fn match_filter(&self, filter: &StagingRowFilterModel) -> bool {
        let exist_ok = filter
            .exist
            .map(|e| e == !self.is_not_exist)
            .unwrap_or(true);
        let query_ok = if let Some(q) = filter.query.as_ref() {
            let q = q.to_lowercase();
            [&self.barcode, &self.name, &self.unit_code]
                .into_iter()
                .any(|v| v.to_lowercase().starts_with(q.as_str()))
        } else {
            true
        };
        exist_ok && query_ok
    }
} // end of impl StagingRowModel

impl From<StagingRowEditReqDto> for StagingRowEditModel {
    fn from(value: StagingRowEditReqDto) -> Self {
        Self {
            barcode: value.barcode,
            name: value.name,
            unit_code: value.unit_code,
            warehouse_code: value.warehouse_code,
            shelf_code: value.shelf_code,
            qty: value.qty,
            price: value.price,
            sum_amount: value.sum_amount,
        }
    }
}

impl StagingRowFilterModel {
    pub fn offset(&self) -> usize {
        (self.page.max(1) as usize - 1) * (self.limit as usize)
    }
}

impl PaginationModel {
    pub fn build(page: u32, per_page: u32, total: u64) -> Self {
        let total_page = if per_page == 0 {
            0
        } else {
            total.div_ceil(per_page as u64)
        };
        Self {
            page,
            per_page,
            total,
            total_page,
        }
    }
}

/// row received from client, row number is assigned by the use case
/// when it is absent
pub struct StagingRowCreateModel {
    pub task_id: String,
    pub row_number: Option<u32>,
    pub payload: StagingRowEditModel,
}

impl From<StagingRowCreateReqDto> for StagingRowCreateModel {
    fn from(value: StagingRowCreateReqDto) -> Self {
        let StagingRowCreateReqDto {
            task_id,
            row_number,
            barcode,
            name,
            unit_code,
            warehouse_code,
            shelf_code,
            qty,
            price,
            sum_amount,
        } = value;
        let payload = StagingRowEditModel {
            barcode,
            name,
            unit_code,
            warehouse_code,
            shelf_code,
            qty,
            price,
            sum_amount,
        };
        Self {
            task_id,
            row_number,
            payload,
        }
    }
}
