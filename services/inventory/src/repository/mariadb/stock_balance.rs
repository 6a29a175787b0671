use std::cmp::min;
use std::ops::DerefMut;
use std::result::Result as DefaultResult;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{FixedOffset, Local, NaiveDateTime};
use sqlx::mysql::{MySqlArguments, MySqlRow};
use sqlx::{Acquire, Arguments, Executor, Row, Statement};

use super::outbox::InsertEventArg;
use super::{arg_encode_error, placeholders, run_query_once, to_db_time, MAX_ROWS_PER_INSERT};
use crate::constant::DOC_NO_PREFIX;
use crate::datastore::AppMariaDbStore;
use crate::error::{AppError, AppErrorCode};
use crate::generate_guid;
use crate::model::{NameXModel, OutboxEventModel, StockBalanceDetailModel, StockBalanceHeaderModel};
use crate::repository::AbsStockBalanceRepo;

#[rustfmt::skip]
const HEADER_COLUMN_SEQ: [&str; 8] = [
    "`docno`", "`docdatetime`", "`doctzutc`", "`docrefno`", "`description`",
    "`branchcode`", "`totalvalue`", "`totalamount`",
];

#[rustfmt::skip]
const DETAIL_COLUMN_SEQ: [&str; 14] = [
    "`itemcode`", "`barcode`", "`itemnames`", "`itemtype`", "`taxtype`", "`vattype`",
    "`vatcal`", "`dividevalue`", "`standvalue`", "`unitcode`", "`unitnames`", "`qty`",
    "`price`", "`sumamount`",
];

struct IncrementDocSeqArg<'a>(&'a str, &'a str);
struct FetchDocSeqArg<'a>(&'a str, &'a str);
struct InsertHeaderArg<'a>(&'a str, &'a str, &'a str, &'a StockBalanceHeaderModel);
struct InsertDetailsArg<'a>(&'a str, &'a str, usize, Vec<StockBalanceDetailModel>);

fn names_serialize(names: &[NameXModel]) -> DefaultResult<String, AppError> {
    serde_json::to_string(names).map_err(|e| AppError {
        code: AppErrorCode::DataCorruption,
        detail: Some(format!("detail-names-serial: {e}")),
    })
}

fn names_deserialize(raw: &str) -> DefaultResult<Vec<NameXModel>, AppError> {
    serde_json::from_str(raw).map_err(|e| AppError {
        code: AppErrorCode::DataCorruption,
        detail: Some(format!("detail-names-parse: {e}")),
    })
}

fn _shop_prefix_args(shop_id: &str, prefix: &str) -> DefaultResult<MySqlArguments, AppError> {
    let mut args = MySqlArguments::default();
    args.add(shop_id.to_string()).map_err(arg_encode_error)?;
    args.add(prefix.to_string()).map_err(arg_encode_error)?;
    Ok(args)
}

impl<'a> TryFrom<IncrementDocSeqArg<'a>> for (String, MySqlArguments) {
    type Error = AppError;
    fn try_from(value: IncrementDocSeqArg<'a>) -> DefaultResult<Self, Self::Error> {
        // the updated row remains locked until the transaction ends
        let sql_patt = "INSERT INTO `stock_balance_docno_seq`(`shopid`,`prefix`,`lastseq`) \
            VALUES (?,?,1) ON DUPLICATE KEY UPDATE `lastseq`=`lastseq`+1";
        Ok((sql_patt.to_string(), _shop_prefix_args(value.0, value.1)?))
    }
}

impl<'a> TryFrom<FetchDocSeqArg<'a>> for (String, MySqlArguments) {
    type Error = AppError;
    fn try_from(value: FetchDocSeqArg<'a>) -> DefaultResult<Self, Self::Error> {
        let sql_patt = "SELECT `lastseq` FROM `stock_balance_docno_seq` WHERE `shopid`=? AND `prefix`=?";
        Ok((sql_patt.to_string(), _shop_prefix_args(value.0, value.1)?))
    }
}

impl<'a> TryFrom<InsertHeaderArg<'a>> for (String, MySqlArguments) {
    type Error = AppError;
    fn try_from(value: InsertHeaderArg<'a>) -> DefaultResult<Self, Self::Error> {
        let InsertHeaderArg(shop_id, guid, username, h) = value;
        let sql_patt = format!(
            "INSERT INTO `stock_balance_header`(`shopid`,`guidfixed`,{},`createdby`,`createdat`) \
             VALUES (?,?,{},?,?)",
            HEADER_COLUMN_SEQ.join(","),
            placeholders(HEADER_COLUMN_SEQ.len())
        );
        let tz_utc = h.doc_datetime.timezone().local_minus_utc() / 60;
        let now = Local::now().fixed_offset();
        let mut args = MySqlArguments::default();
        args.add(shop_id.to_string()).map_err(arg_encode_error)?;
        args.add(guid.to_string()).map_err(arg_encode_error)?;
        args.add(h.doc_no.clone()).map_err(arg_encode_error)?;
        args.add(to_db_time(&h.doc_datetime)).map_err(arg_encode_error)?;
        args.add(tz_utc as i16).map_err(arg_encode_error)?;
        args.add(h.doc_ref_no.clone()).map_err(arg_encode_error)?;
        args.add(h.description.clone()).map_err(arg_encode_error)?;
        args.add(h.branch_code.clone()).map_err(arg_encode_error)?;
        args.add(h.total_value).map_err(arg_encode_error)?;
        args.add(h.total_amount).map_err(arg_encode_error)?;
        args.add(username.to_string()).map_err(arg_encode_error)?;
        args.add(to_db_time(&now)).map_err(arg_encode_error)?;
        Ok((sql_patt, args))
    }
} // end of impl TryFrom for InsertHeaderArg

impl<'a> TryFrom<InsertDetailsArg<'a>> for (String, MySqlArguments) {
    type Error = AppError;
    fn try_from(value: InsertDetailsArg<'a>) -> DefaultResult<Self, Self::Error> {
        let InsertDetailsArg(shop_id, doc_no, line_start, details) = value;
        let item = format!("(?,?,?,{})", placeholders(DETAIL_COLUMN_SEQ.len()));
        let items = (0..details.len()).map(|_| item.as_str()).collect::<Vec<_>>();
        let sql_patt = format!(
            "INSERT INTO `stock_balance_detail`(`shopid`,`docno`,`linenumber`,{}) VALUES {}",
            DETAIL_COLUMN_SEQ.join(","),
            items.join(",")
        );
        let mut args = MySqlArguments::default();
        for (idx, d) in details.into_iter().enumerate() {
            args.add(shop_id.to_string()).map_err(arg_encode_error)?;
            args.add(doc_no.to_string()).map_err(arg_encode_error)?;
            args.add((line_start + idx) as u32).map_err(arg_encode_error)?;
            args.add(d.item_code).map_err(arg_encode_error)?;
            args.add(d.barcode).map_err(arg_encode_error)?;
            args.add(names_serialize(&d.item_names)?).map_err(arg_encode_error)?;
            args.add(d.item_type).map_err(arg_encode_error)?;
            args.add(d.tax_type).map_err(arg_encode_error)?;
            args.add(d.vat_type).map_err(arg_encode_error)?;
            args.add(d.vat_cal).map_err(arg_encode_error)?;
            args.add(d.divide_value).map_err(arg_encode_error)?;
            args.add(d.stand_value).map_err(arg_encode_error)?;
            args.add(d.unit_code).map_err(arg_encode_error)?;
            args.add(names_serialize(&d.unit_names)?).map_err(arg_encode_error)?;
            args.add(d.qty).map_err(arg_encode_error)?;
            args.add(d.price).map_err(arg_encode_error)?;
            args.add(d.sum_amount).map_err(arg_encode_error)?;
        }
        Ok((sql_patt, args))
    }
} // end of impl TryFrom for InsertDetailsArg

fn header_from_row(value: MySqlRow) -> DefaultResult<StockBalanceHeaderModel, AppError> {
    let doc_datetime = {
        let raw = value.try_get::<NaiveDateTime, usize>(1)?;
        let tz_utc = value.try_get::<i16, usize>(2)?;
        let tz = FixedOffset::east_opt((tz_utc as i32) * 60).ok_or(AppError {
            code: AppErrorCode::DataCorruption,
            detail: Some(format!("doc-tz-utc: {tz_utc}")),
        })?;
        // saved in UTC, convert back to the time zone of the document
        raw.and_utc().with_timezone(&tz)
    };
    Ok(StockBalanceHeaderModel {
        doc_no: value.try_get::<String, usize>(0)?,
        doc_datetime,
        doc_ref_no: value.try_get::<String, usize>(3)?,
        description: value.try_get::<String, usize>(4)?,
        branch_code: value.try_get::<String, usize>(5)?,
        total_value: value.try_get::<f64, usize>(6)?,
        total_amount: value.try_get::<f64, usize>(7)?,
    })
}

fn detail_from_row(value: MySqlRow) -> DefaultResult<StockBalanceDetailModel, AppError> {
    let item_names = value.try_get::<String, usize>(3)?;
    let unit_names = value.try_get::<String, usize>(11)?;
    Ok(StockBalanceDetailModel {
        doc_no: value.try_get::<String, usize>(0)?,
        item_code: value.try_get::<String, usize>(1)?,
        barcode: value.try_get::<String, usize>(2)?,
        item_names: names_deserialize(item_names.as_str())?,
        item_type: value.try_get::<i8, usize>(4)?,
        tax_type: value.try_get::<i8, usize>(5)?,
        vat_type: value.try_get::<i8, usize>(6)?,
        vat_cal: value.try_get::<i8, usize>(7)?,
        divide_value: value.try_get::<f64, usize>(8)?,
        stand_value: value.try_get::<f64, usize>(9)?,
        unit_code: value.try_get::<String, usize>(10)?,
        unit_names: names_deserialize(unit_names.as_str())?,
        qty: value.try_get::<f64, usize>(12)?,
        price: value.try_get::<f64, usize>(13)?,
        sum_amount: value.try_get::<f64, usize>(14)?,
    })
}

pub struct StockBalanceMariaDbRepo {
    db: Arc<AppMariaDbStore>,
}

impl StockBalanceMariaDbRepo {
    pub fn new(dbs: &[Arc<AppMariaDbStore>]) -> DefaultResult<Self, AppError> {
        let db = dbs.first().cloned().ok_or(AppError {
            code: AppErrorCode::MissingDataStore,
            detail: Some("mariadb".to_string()),
        })?;
        Ok(Self { db })
    }

    async fn _fetch_common(
        &self,
        sql_patt: String,
        args: MySqlArguments,
    ) -> DefaultResult<Vec<MySqlRow>, AppError> {
        let mut conn = self.db.acquire().await?;
        let stmt = conn.prepare(sql_patt.as_str()).await?;
        let query = stmt.query_with(args);
        let exec = conn.as_mut();
        let rows = query.fetch_all(exec).await?;
        Ok(rows)
    }
} // end of impl StockBalanceMariaDbRepo

#[async_trait]
impl AbsStockBalanceRepo for StockBalanceMariaDbRepo {
    async fn create_header(
        &self,
        shop_id: &str,
        username: &str,
        mut header: StockBalanceHeaderModel,
    ) -> DefaultResult<(StockBalanceHeaderModel, String, String), AppError> {
        let prefix = format!("{DOC_NO_PREFIX}{}", header.doc_datetime.format("%Y%m%d"));
        let guid = generate_guid();
        let mut conn = self.db.acquire().await?;
        let mut tx = conn.begin().await?;
        let (sql_patt, args) = IncrementDocSeqArg(shop_id, prefix.as_str()).try_into()?;
        let _rs = run_query_once(&mut tx, sql_patt, args, None).await?;
        let last_seq = {
            let (sql_patt, args) = FetchDocSeqArg(shop_id, prefix.as_str()).try_into()?;
            let stmt = tx.prepare(sql_patt.as_str()).await?;
            let query = stmt.query_with(args);
            let row = query.fetch_one(tx.deref_mut()).await?;
            row.try_get::<u32, usize>(0)?
        };
        let doc_no = format!("{prefix}-{last_seq:05}");
        header.doc_no = doc_no.clone();
        let (sql_patt, args) =
            InsertHeaderArg(shop_id, guid.as_str(), username, &header).try_into()?;
        let _rs = run_query_once(&mut tx, sql_patt, args, Some(1)).await?;
        tx.commit().await?;
        Ok((header, guid, doc_no))
    } // end of fn create_header

    async fn create_details(
        &self,
        shop_id: &str,
        doc_no: &str,
        mut details: Vec<StockBalanceDetailModel>,
        event: OutboxEventModel,
    ) -> DefaultResult<(), AppError> {
        if details.is_empty() {
            return Err(AppError {
                code: AppErrorCode::EmptyInputData,
                detail: Some("stock-balance-detail".to_string()),
            });
        }
        let mut conn = self.db.acquire().await?;
        let mut tx = conn.begin().await?;
        let mut line_start = 1usize;
        while !details.is_empty() {
            let num_batch = min(details.len(), MAX_ROWS_PER_INSERT);
            let remaining = details.split_off(num_batch);
            let processing = std::mem::replace(&mut details, remaining);
            let (sql_patt, args) =
                InsertDetailsArg(shop_id, doc_no, line_start, processing).try_into()?;
            let _rs = run_query_once(&mut tx, sql_patt, args, Some(num_batch)).await?;
            line_start += num_batch;
        }
        let (sql_patt, args) = InsertEventArg(event).try_into()?;
        let _rs = run_query_once(&mut tx, sql_patt, args, Some(1)).await?;
        tx.commit().await?;
        Ok(())
    } // end of fn create_details

    async fn delete_header(&self, shop_id: &str, header_guid: &str, _username: &str) -> DefaultResult<(), AppError> {
        let sql_patt = "DELETE FROM `stock_balance_header` WHERE `shopid`=? AND `guidfixed`=?";
        let args = _shop_prefix_args(shop_id, header_guid)?;
        let mut conn = self.db.acquire().await?;
        let stmt = conn.prepare(sql_patt).await?;
        let query = stmt.query_with(args);
        let exec = conn.as_mut();
        let _resultset = query.execute(exec).await?;
        Ok(())
    }

    async fn fetch_header(
        &self,
        shop_id: &str,
        header_guid: &str,
    ) -> DefaultResult<Option<StockBalanceHeaderModel>, AppError> {
        let sql_patt = format!(
            "SELECT {} FROM `stock_balance_header` WHERE `shopid`=? AND `guidfixed`=?",
            HEADER_COLUMN_SEQ.join(",")
        );
        let args = _shop_prefix_args(shop_id, header_guid)?;
        let mut rows = self._fetch_common(sql_patt, args).await?;
        if rows.is_empty() {
            Ok(None)
        } else {
            header_from_row(rows.remove(0)).map(Some)
        }
    }

    async fn fetch_details(
        &self,
        shop_id: &str,
        doc_no: &str,
    ) -> DefaultResult<Vec<StockBalanceDetailModel>, AppError> {
        let sql_patt = format!(
            "SELECT `docno`,{} FROM `stock_balance_detail` WHERE `shopid`=? AND `docno`=? \
             ORDER BY `linenumber` ASC",
            DETAIL_COLUMN_SEQ.join(",")
        );
        let args = _shop_prefix_args(shop_id, doc_no)?;
        let rows = self._fetch_common(sql_patt, args).await?;
        rows.into_iter().map(detail_from_row).collect()
    }
} // end of impl StockBalanceMariaDbRepo

