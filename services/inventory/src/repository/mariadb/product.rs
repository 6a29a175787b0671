use std::collections::{HashMap, HashSet};
use std::result::Result as DefaultResult;
use std::sync::Arc;

use async_trait::async_trait;
use sqlx::mysql::{MySqlArguments, MySqlRow};
use sqlx::{Arguments, Executor, Row, Statement};

use super::{arg_encode_error, placeholders};
use crate::datastore::AppMariaDbStore;
use crate::error::{AppError, AppErrorCode};
use crate::model::{NameXModel, ProductBarcodeModel};
use crate::repository::AbsProductBarcodeRepo;

#[rustfmt::skip]
const SELECT_COLUMN_SEQ: [&str; 11] = [
    "`barcode`", "`itemcode`", "`names`", "`itemunitcode`", "`itemunitnames`",
    "`dividevalue`", "`standvalue`", "`itemtype`", "`taxtype`", "`vattype`", "`vatcal`",
];

struct FetchByBarcodesArg<'a>(&'a str, &'a [String]);
struct UpsertArg<'a>(&'a str, Vec<ProductBarcodeModel>);

fn names_serialize(names: &[NameXModel]) -> DefaultResult<String, AppError> {
    serde_json::to_string(names).map_err(|e| AppError {
        code: AppErrorCode::DataCorruption,
        detail: Some(format!("product-names-serial: {e}")),
    })
}

fn names_deserialize(raw: &str) -> DefaultResult<Vec<NameXModel>, AppError> {
    serde_json::from_str(raw).map_err(|e| AppError {
        code: AppErrorCode::DataCorruption,
        detail: Some(format!("product-names-parse: {e}")),
    })
}

impl<'a> TryFrom<FetchByBarcodesArg<'a>> for (String, MySqlArguments) {
    type Error = AppError;
    fn try_from(value: FetchByBarcodesArg<'a>) -> DefaultResult<Self, Self::Error> {
        let FetchByBarcodesArg(shop_id, barcodes) = value;
        let sql_patt = format!(
            "SELECT {} FROM `product_barcode` WHERE `shopid`=? AND `barcode` IN ({})",
            SELECT_COLUMN_SEQ.join(","),
            placeholders(barcodes.len())
        );
        let mut args = MySqlArguments::default();
        args.add(shop_id.to_string()).map_err(arg_encode_error)?;
        for b in barcodes {
            args.add(b.clone()).map_err(arg_encode_error)?;
        }
        Ok((sql_patt, args))
    }
}

impl<'a> TryFrom<UpsertArg<'a>> for (String, MySqlArguments) {
    type Error = AppError;
    fn try_from(value: UpsertArg<'a>) -> DefaultResult<Self, Self::Error> {
        let UpsertArg(shop_id, items) = value;
        let item = format!("(?,{})", placeholders(SELECT_COLUMN_SEQ.len()));
        let items_patt = (0..items.len()).map(|_| item.as_str()).collect::<Vec<_>>();
        let update_cols = SELECT_COLUMN_SEQ
            .iter()
            .skip(1)
            .map(|c| format!("{c}=VALUES({c})"))
            .collect::<Vec<_>>();
        let sql_patt = format!(
            "INSERT INTO `product_barcode`(`shopid`,{}) VALUES {} ON DUPLICATE KEY UPDATE {}",
            SELECT_COLUMN_SEQ.join(","),
            items_patt.join(","),
            update_cols.join(",")
        );
        let mut args = MySqlArguments::default();
        for m in items {
            args.add(shop_id.to_string()).map_err(arg_encode_error)?;
            args.add(m.barcode).map_err(arg_encode_error)?;
            args.add(m.item_code).map_err(arg_encode_error)?;
            args.add(names_serialize(&m.names)?).map_err(arg_encode_error)?;
            args.add(m.item_unit_code).map_err(arg_encode_error)?;
            args.add(names_serialize(&m.item_unit_names)?).map_err(arg_encode_error)?;
            args.add(m.divide_value).map_err(arg_encode_error)?;
            args.add(m.stand_value).map_err(arg_encode_error)?;
            args.add(m.item_type).map_err(arg_encode_error)?;
            args.add(m.tax_type).map_err(arg_encode_error)?;
            args.add(m.vat_type).map_err(arg_encode_error)?;
            args.add(m.vat_cal).map_err(arg_encode_error)?;
        }
        Ok((sql_patt, args))
    }
} // end of impl TryFrom for UpsertArg

impl TryFrom<MySqlRow> for ProductBarcodeModel {
    type Error = AppError;
    fn try_from(value: MySqlRow) -> DefaultResult<Self, Self::Error> {
        let names = value.try_get::<String, usize>(2)?;
        let unit_names = value.try_get::<String, usize>(4)?;
        Ok(Self {
            barcode: value.try_get::<String, usize>(0)?,
            item_code: value.try_get::<String, usize>(1)?,
            names: names_deserialize(names.as_str())?,
            item_unit_code: value.try_get::<String, usize>(3)?,
            item_unit_names: names_deserialize(unit_names.as_str())?,
            divide_value: value.try_get::<f64, usize>(5)?,
            stand_value: value.try_get::<f64, usize>(6)?,
            item_type: value.try_get::<i8, usize>(7)?,
            tax_type: value.try_get::<i8, usize>(8)?,
            vat_type: value.try_get::<i8, usize>(9)?,
            vat_cal: value.try_get::<i8, usize>(10)?,
        })
    }
}

pub struct ProductBarcodeMariaDbRepo {
    db: Arc<AppMariaDbStore>,
}

impl ProductBarcodeMariaDbRepo {
    pub fn new(dbs: &[Arc<AppMariaDbStore>]) -> DefaultResult<Self, AppError> {
        let db = dbs.first().cloned().ok_or(AppError {
            code: AppErrorCode::MissingDataStore,
            detail: Some("mariadb".to_string()),
        })?;
        Ok(Self { db })
    }
}

#[async_trait]
impl AbsProductBarcodeRepo for ProductBarcodeMariaDbRepo {
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
        if barcodes.is_empty() {
            return Ok(Vec::new());
        }
        let (sql_patt, args) = FetchByBarcodesArg(shop_id, &barcodes).try_into()?;
        let mut conn = self.db.acquire().await?;
        let stmt = conn.prepare(sql_patt.as_str()).await?;
        let query = stmt.query_with(args);
        let exec = conn.as_mut();
        let rows = query.fetch_all(exec).await?;
        let mut found = rows
            .into_iter()
            .map(|r| ProductBarcodeModel::try_from(r).map(|m| (m.barcode.clone(), m)))
            .collect::<DefaultResult<HashMap<_, _>, AppError>>()?;
        // keep the order of given barcodes
        let out = barcodes.iter().filter_map(|b| found.remove(b)).collect();
        Ok(out)
    }

    async fn save(&self, shop_id: &str, items: Vec<ProductBarcodeModel>) -> DefaultResult<(), AppError> {
        if items.is_empty() {
            return Err(AppError {
                code: AppErrorCode::EmptyInputData,
                detail: Some("product-barcode".to_string()),
            });
        }
        let (sql_patt, args) = UpsertArg(shop_id, items).try_into()?;
        let mut conn = self.db.acquire().await?;
        let stmt = conn.prepare(sql_patt.as_str()).await?;
        let query = stmt.query_with(args);
        let exec = conn.as_mut();
        let _resultset = query.execute(exec).await?;
        Ok(())
    }
} // end of impl ProductBarcodeMariaDbRepo
