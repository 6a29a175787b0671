use std::boxed::Box;
use std::collections::{HashMap, HashSet};
use std::result::Result as DefaultResult;
use std::sync::Arc;

use async_trait::async_trait;

use super::super::AbsProductBarcodeRepo;
use super::{_col_names, _col_parse, _col_str, _gen_key, _names_to_col, _new_row};
use crate::datastore::AbstInMemoryDStore;
use crate::error::AppError;
use crate::model::ProductBarcodeModel;

const TABLE_LABEL: &str = "product_barcode";

enum InMemColIdx {
    ItemCode,
    Names,
    UnitCode,
    UnitNames,
    DivideValue,
    StandValue,
    ItemType,
    TaxType,
    VatType,
    VatCal,
    TotNumColumns,
}

impl From<InMemColIdx> for usize {
    fn from(value: InMemColIdx) -> usize {
        match value {
            InMemColIdx::ItemCode => 0,
            InMemColIdx::Names => 1,
            InMemColIdx::UnitCode => 2,
            InMemColIdx::UnitNames => 3,
            InMemColIdx::DivideValue => 4,
            InMemColIdx::StandValue => 5,
            InMemColIdx::ItemType => 6,
            InMemColIdx::TaxType => 7,
            InMemColIdx::VatType => 8,
            InMemColIdx::VatCal => 9,
            InMemColIdx::TotNumColumns => 10,
        }
    }
}

pub struct ProductBarcodeInMemRepo {
    datastore: Arc<Box<dyn AbstInMemoryDStore>>,
}

impl ProductBarcodeInMemRepo {
    pub async fn new(m: Arc<Box<dyn AbstInMemoryDStore>>) -> DefaultResult<Self, AppError> {
        m.create_table(TABLE_LABEL).await?;
        Ok(Self { datastore: m })
    }

    fn to_inmem_row(shop_id: &str, m: &ProductBarcodeModel) -> DefaultResult<(String, Vec<String>), AppError> {
        let key = _gen_key(shop_id, m.barcode.as_str());
        let cols: Vec<(usize, String)> = vec![
            (InMemColIdx::ItemCode.into(), m.item_code.clone()),
            (InMemColIdx::Names.into(), _names_to_col(&m.names)?),
            (InMemColIdx::UnitCode.into(), m.item_unit_code.clone()),
            (InMemColIdx::UnitNames.into(), _names_to_col(&m.item_unit_names)?),
            (InMemColIdx::DivideValue.into(), m.divide_value.to_string()),
            (InMemColIdx::StandValue.into(), m.stand_value.to_string()),
            (InMemColIdx::ItemType.into(), m.item_type.to_string()),
            (InMemColIdx::TaxType.into(), m.tax_type.to_string()),
            (InMemColIdx::VatType.into(), m.vat_type.to_string()),
            (InMemColIdx::VatCal.into(), m.vat_cal.to_string()),
        ];
        Ok((key, _new_row(InMemColIdx::TotNumColumns.into(), cols)))
    }

    fn from_inmem_row(barcode: &str, row: &[String]) -> DefaultResult<ProductBarcodeModel, AppError> {
        Ok(ProductBarcodeModel {
            barcode: barcode.to_string(),
            item_code: _col_str(row, InMemColIdx::ItemCode.into())?.to_string(),
            names: _col_names(row, InMemColIdx::Names.into())?,
            item_unit_code: _col_str(row, InMemColIdx::UnitCode.into())?.to_string(),
            item_unit_names: _col_names(row, InMemColIdx::UnitNames.into())?,
            divide_value: _col_parse(row, InMemColIdx::DivideValue.into())?,
            stand_value: _col_parse(row, InMemColIdx::StandValue.into())?,
            item_type: _col_parse(row, InMemColIdx::ItemType.into())?,
            tax_type: _col_parse(row, InMemColIdx::TaxType.into())?,
            vat_type: _col_parse(row, InMemColIdx::VatType.into())?,
            vat_cal: _col_parse(row, InMemColIdx::VatCal.into())?,
        })
    }
} // end of impl ProductBarcodeInMemRepo

#[async_trait]
impl AbsProductBarcodeRepo for ProductBarcodeInMemRepo {
    async fn find_by_barcodes(
        &self,
        shop_id: &str,
        barcodes: Vec<String>,
    ) -> DefaultResult<Vec<ProductBarcodeModel>, AppError> {
        let mut visited = HashSet::new();
        let barcodes = barcodes
            .into_iter()
            .filter(|b| visited.insert(b.clone()))
            .collect::<Vec<_>>();
        let keys = barcodes.iter().map(|b| _gen_key(shop_id, b)).collect();
        let info = HashMap::from([(TABLE_LABEL.to_string(), keys)]);
        let mut fetched = self.datastore.fetch(info).await?;
        let table = fetched.remove(TABLE_LABEL).unwrap_or_default();
        // keep the order of given barcodes
        barcodes
            .iter()
            .filter_map(|b| {
                table
                    .get(_gen_key(shop_id, b).as_str())
                    .map(|row| Self::from_inmem_row(b, row))
            })
            .collect()
    }

    async fn save(&self, shop_id: &str, items: Vec<ProductBarcodeModel>) -> DefaultResult<(), AppError> {
        let table = items
            .iter()
            .map(|m| Self::to_inmem_row(shop_id, m))
            .collect::<DefaultResult<HashMap<_, _>, AppError>>()?;
        let data = HashMap::from([(TABLE_LABEL.to_string(), table)]);
        let _num = self.datastore.save(data).await?;
        Ok(())
    }
} // end of impl ProductBarcodeInMemRepo
