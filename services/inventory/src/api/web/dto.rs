use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use crate::model::{PaginationModel, StagingRowModel, StagingTaskMetaModel};

#[derive(Deserialize, Serialize, Debug)]
pub struct StagingRowCreateReqDto {
    #[serde(rename = "taskid")]
    pub task_id: String,
    // absent value lets the server append the row after the last one
    #[serde(rename = "rownumber", default)]
    pub row_number: Option<u32>,
    pub barcode: String,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "unitcode", default)]
    pub unit_code: String,
    #[serde(rename = "warehousecode", default)]
    pub warehouse_code: String,
    #[serde(rename = "shelfcode", default)]
    pub shelf_code: String,
    pub qty: f64,
    #[serde(default)]
    pub price: f64,
    #[serde(rename = "sumamount", default)]
    pub sum_amount: f64,
}

#[derive(Deserialize, Serialize, Debug)]
pub struct StagingRowEditReqDto {
    pub barcode: String,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "unitcode", default)]
    pub unit_code: String,
    #[serde(rename = "warehousecode", default)]
    pub warehouse_code: String,
    #[serde(rename = "shelfcode", default)]
    pub shelf_code: String,
    pub qty: f64,
    #[serde(default)]
    pub price: f64,
    #[serde(rename = "sumamount", default)]
    pub sum_amount: f64,
}

#[derive(Deserialize, Debug, Default)]
pub struct StagingRowListQueryDto {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub exist: Option<bool>,
    pub q: Option<String>,
}

/// header of the stock-balance document created on commit
#[derive(Deserialize, Serialize, Debug)]
pub struct StockBalanceHeaderReqDto {
    #[serde(rename = "docdatetime")]
    pub doc_datetime: DateTime<FixedOffset>,
    #[serde(rename = "docrefno")]
    pub doc_ref_no: Option<String>,
    pub description: Option<String>,
    #[serde(rename = "branchcode")]
    pub branch_code: Option<String>,
    #[serde(rename = "totalvalue")]
    pub total_value: Option<f64>,
    #[serde(rename = "totalamount")]
    pub total_amount: Option<f64>,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct StagingRowRespDto {
    #[serde(rename = "guidfixed")]
    pub guid: String,
    #[serde(rename = "taskid")]
    pub task_id: String,
    #[serde(rename = "rownumber")]
    pub row_number: u32,
    pub barcode: String,
    pub name: String,
    #[serde(rename = "unitcode")]
    pub unit_code: String,
    #[serde(rename = "warehousecode")]
    pub warehouse_code: String,
    #[serde(rename = "shelfcode")]
    pub shelf_code: String,
    pub qty: f64,
    pub price: f64,
    #[serde(rename = "sumamount")]
    pub sum_amount: f64,
    #[serde(rename = "isnotexist")]
    pub is_not_exist: bool,
    #[serde(rename = "createdby")]
    pub created_by: String,
    #[serde(rename = "createdat")]
    pub created_at: DateTime<FixedOffset>,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct PaginationDto {
    pub page: u32,
    #[serde(rename = "perpage")]
    pub per_page: u32,
    pub total: u64,
    #[serde(rename = "totalpage")]
    pub total_page: u64,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct TaskMetaDto {
    #[serde(rename = "totalitem")]
    pub total_item: u64,
    #[serde(rename = "totalamount")]
    pub total_amount: f64,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct ImportUploadRespDto {
    pub success: bool,
    pub id: String,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct SuccessRespDto {
    pub success: bool,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct StagingRowListRespDto {
    pub success: bool,
    pub data: Vec<StagingRowRespDto>,
    pub pagination: PaginationDto,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct TaskMetaRespDto {
    pub success: bool,
    pub data: TaskMetaDto,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct TaskCommitRespDto {
    pub success: bool,
    #[serde(rename = "docno")]
    pub doc_no: String,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct ErrorRespDto {
    pub success: bool,
    pub message: String,
}

impl From<StagingRowModel> for StagingRowRespDto {
    fn from(value: StagingRowModel) -> Self {
        Self {
            guid: value.guid,
            task_id: value.task_id,
            row_number: value.row_number,
            barcode: value.barcode,
            name: value.name,
            unit_code: value.unit_code,
            warehouse_code: value.warehouse_code,
            shelf_code: value.shelf_code,
            qty: value.qty,
            price: value.price,
            sum_amount: value.sum_amount,
            is_not_exist: value.is_not_exist,
            created_by: value.created_by,
            created_at: value.created_at,
        }
    }
}

impl From<PaginationModel> for PaginationDto {
    fn from(value: PaginationModel) -> Self {
        Self {
            page: value.page,
            per_page: value.per_page,
            total: value.total,
            total_page: value.total_page,
        }
    }
}

impl From<StagingTaskMetaModel> for TaskMetaDto {
    fn from(value: StagingTaskMetaModel) -> Self {
        Self {
            total_item: value.total_item,
            total_amount: value.total_amount,
        }
    }
}
