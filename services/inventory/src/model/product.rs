use serde::{Deserialize, Serialize};

/// localized name, `code` is language code e.g. `th`, `en`
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct NameXModel {
    pub code: String,
    pub name: String,
}

/// read-only master data of a product barcode, resolved in bulk by the
/// verification and commit steps
#[derive(Debug, Clone, PartialEq)]
pub struct ProductBarcodeModel {
    pub item_code: String,
    pub barcode: String,
    pub names: Vec<NameXModel>,
    pub item_unit_code: String,
    pub item_unit_names: Vec<NameXModel>,
    pub divide_value: f64,
    pub stand_value: f64,
    pub item_type: i8,
    pub tax_type: i8,
    pub vat_type: i8,
    pub vat_cal: i8,
}
