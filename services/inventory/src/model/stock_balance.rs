use chrono::{DateTime, FixedOffset};
use serde::Serialize;

use super::{NameXModel, ProductBarcodeModel, StagingRowModel};
use crate::api::web::dto::StockBalanceHeaderReqDto;

/// header fields supplied by the client when committing an import task,
/// the document number is always assigned by the stock-balance repository
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StockBalanceHeaderModel {
    #[serde(rename = "docno")]
    pub doc_no: String,
    #[serde(rename = "docdatetime")]
    pub doc_datetime: DateTime<FixedOffset>,
    #[serde(rename = "docrefno")]
    pub doc_ref_no: String,
    pub description: String,
    #[serde(rename = "branchcode")]
    pub branch_code: String,
    #[serde(rename = "totalvalue")]
    pub total_value: f64,
    #[serde(rename = "totalamount")]
    pub total_amount: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StockBalanceDetailModel {
    pub doc_no: String,
    pub item_code: String,
    pub barcode: String,
    pub item_names: Vec<NameXModel>,
    pub item_type: i8,
    pub tax_type: i8,
    pub vat_type: i8,
    pub vat_cal: i8,
    pub divide_value: f64,
    pub stand_value: f64,
    pub unit_code: String,
    pub unit_names: Vec<NameXModel>,
    pub qty: f64,
    pub price: f64,
    pub sum_amount: f64,
}

/// detail line carried by the creation event, it also records where the
/// stock is located
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransactionDetailModel {
    #[serde(rename = "docref")]
    pub doc_ref: String,
    #[serde(rename = "docrefdatetime")]
    pub doc_ref_datetime: DateTime<FixedOffset>,
    #[serde(rename = "itemcode")]
    pub item_code: String,
    pub barcode: String,
    #[serde(rename = "itemnames")]
    pub item_names: Vec<NameXModel>,
    #[serde(rename = "itemtype")]
    pub item_type: i8,
    #[serde(rename = "taxtype")]
    pub tax_type: i8,
    #[serde(rename = "vattype")]
    pub vat_type: i8,
    #[serde(rename = "vatcal")]
    pub vat_cal: i8,
    #[serde(rename = "standvalue")]
    pub stand_value: f64,
    #[serde(rename = "dividevalue")]
    pub divide_value: f64,
    #[serde(rename = "unitcode")]
    pub unit_code: String,
    #[serde(rename = "whcode")]
    pub wh_code: String,
    #[serde(rename = "locationcode")]
    pub location_code: String,
    pub qty: f64,
    pub price: f64,
    #[serde(rename = "priceexcludevat")]
    pub price_exclude_vat: f64,
    #[serde(rename = "totalvaluevat")]
    pub total_value_vat: f64,
    #[serde(rename = "sumamount")]
    pub sum_amount: f64,
    #[serde(rename = "sumamountexcludevat")]
    pub sum_amount_exclude_vat: f64,
}

/// creation event published to downstream services after commit
#[derive(Debug, Clone, Serialize)]
pub struct StockBalanceMessageModel {
    #[serde(flatten)]
    pub header: StockBalanceHeaderModel,
    #[serde(rename = "shopid")]
    pub shop_id: String,
    #[serde(rename = "createdby")]
    pub created_by: String,
    #[serde(rename = "createdat")]
    pub created_at: DateTime<FixedOffset>,
    pub details: Vec<TransactionDetailModel>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OutboxEventModel {
    pub id: String,
    pub shop_id: String,
    // routing key of the message broker
    pub route: String,
    pub payload: String,
    pub created_at: DateTime<FixedOffset>,
    pub num_attempts: u16,
    pub delivered: bool,
}

impl From<StockBalanceHeaderReqDto> for StockBalanceHeaderModel {
    fn from(value: StockBalanceHeaderReqDto) -> Self {
        Self {
            doc_no: String::new(),
            doc_datetime: value.doc_datetime,
            doc_ref_no: value.doc_ref_no.unwrap_or_default(),
            description: value.description.unwrap_or_default(),
            branch_code: value.branch_code.unwrap_or_default(),
            total_value: value.total_value.unwrap_or(0.0),
            total_amount: value.total_amount.unwrap_or(0.0),
        }
    }
}

impl StockBalanceDetailModel {
    pub fn build(product: &ProductBarcodeModel, staged: &StagingRowModel) -> Self {
        Self {
            doc_no: String::new(),
            item_code: product.item_code.clone(),
            barcode: product.barcode.clone(),
            item_names: product.names.clone(),
            item_type: product.item_type,
            tax_type: product.tax_type,
            vat_type: product.vat_type,
            vat_cal: product.vat_cal,
            divide_value: product.divide_value,
            stand_value: product.stand_value,
            unit_code: product.item_unit_code.clone(),
            unit_names: product.item_unit_names.clone(),
            qty: staged.qty,
            price: staged.price,
            sum_amount: staged.sum_amount,
        }
    }
}

impl TransactionDetailModel {
    pub fn build(
        product: &ProductBarcodeModel,
        staged: &StagingRowModel,
        header: &StockBalanceHeaderModel,
    ) -> Self {
        Self {
            doc_ref: header.doc_no.clone(),
            doc_ref_datetime: header.doc_datetime,
            item_code: product.item_code.clone(),
            barcode: product.barcode.clone(),
            item_names: product.names.clone(),
            item_type: product.item_type,
            tax_type: product.tax_type,
            vat_type: product.vat_type,
            vat_cal: product.vat_cal,
            stand_value: product.stand_value,
            divide_value: product.divide_value,
            unit_code: product.item_unit_code.clone(),
            wh_code: staged.warehouse_code.clone(),
            location_code: staged.shelf_code.clone(),
            qty: staged.qty,
            price: staged.price,
            price_exclude_vat: staged.price,
            total_value_vat: staged.sum_amount,
            sum_amount: staged.sum_amount,
            sum_amount_exclude_vat: staged.sum_amount,
        }
    }
}
