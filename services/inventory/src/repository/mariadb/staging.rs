use std::cmp::min;
use std::result::Result as DefaultResult;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use sqlx::mysql::{MySqlArguments, MySqlRow};
use sqlx::{Acquire, Arguments, Executor, Row, Statement};

use super::{
    arg_encode_error, from_db_time, placeholders, run_query_once, to_db_time, MAX_ROWS_PER_INSERT,
};
use crate::datastore::AppMariaDbStore;
use crate::error::{AppError, AppErrorCode};
use crate::model::{
    PaginationModel, StagingRowEditModel, StagingRowFilterModel, StagingRowModel,
    StagingTaskMetaModel,
};
use crate::repository::AbsStagingRowRepo;

#[rustfmt::skip]
const SELECT_COLUMN_SEQ: [&str; 15] = [
    "`shopid`", "`guidfixed`", "`taskid`", "`rownumber`", "`barcode`", "`name`",
    "`unitcode`", "`warehousecode`", "`shelfcode`", "`qty`", "`price`", "`sumamount`",
    "`isnotexist`", "`createdat`", "`createdby`",
];

struct InsertRowsArg(Vec<StagingRowModel>);
struct FetchTaskRowsArg<'a>(&'a str, &'a str);
struct ListTaskRowsArg<'a>(&'a str, &'a str, &'a StagingRowFilterModel);
struct UpdateRowArg<'a>(&'a str, &'a str, StagingRowEditModel);
struct DeleteRowArg<'a>(&'a str, &'a str);
struct DeleteTaskArg<'a>(&'a str, &'a str);
struct UpdateExistArg<'a>(&'a str, &'a str, bool, Vec<String>);
struct CountExistArg<'a>(&'a str, &'a str, bool);

impl TryFrom<InsertRowsArg> for (String, MySqlArguments) {
    type Error = AppError;
    fn try_from(value: InsertRowsArg) -> DefaultResult<Self, Self::Error> {
        let item = format!("({})", placeholders(SELECT_COLUMN_SEQ.len()));
        let items = (0..value.0.len()).map(|_| item.as_str()).collect::<Vec<_>>();
        let sql_patt = format!(
            "INSERT INTO `stock_balance_import_staging`({}) VALUES {}",
            SELECT_COLUMN_SEQ.join(","),
            items.join(",")
        );
        let mut args = MySqlArguments::default();
        for r in value.0 {
            let created_at = to_db_time(&r.created_at);
            args.add(r.shop_id).map_err(arg_encode_error)?;
            args.add(r.guid).map_err(arg_encode_error)?;
            args.add(r.task_id).map_err(arg_encode_error)?;
            args.add(r.row_number).map_err(arg_encode_error)?;
            args.add(r.barcode).map_err(arg_encode_error)?;
            args.add(r.name).map_err(arg_encode_error)?;
            args.add(r.unit_code).map_err(arg_encode_error)?;
            args.add(r.warehouse_code).map_err(arg_encode_error)?;
            args.add(r.shelf_code).map_err(arg_encode_error)?;
            args.add(r.qty).map_err(arg_encode_error)?;
            args.add(r.price).map_err(arg_encode_error)?;
            args.add(r.sum_amount).map_err(arg_encode_error)?;
            args.add(r.is_not_exist).map_err(arg_encode_error)?;
            args.add(created_at).map_err(arg_encode_error)?;
            args.add(r.created_by).map_err(arg_encode_error)?;
        }
        Ok((sql_patt, args))
    }
} // end of impl TryFrom for InsertRowsArg

fn _task_args(shop_id: &str, task_id: &str) -> DefaultResult<MySqlArguments, AppError> {
    let mut args = MySqlArguments::default();
    args.add(shop_id.to_string()).map_err(arg_encode_error)?;
    args.add(task_id.to_string()).map_err(arg_encode_error)?;
    Ok(args)
}

impl<'a> TryFrom<FetchTaskRowsArg<'a>> for (String, MySqlArguments) {
    type Error = AppError;
    fn try_from(value: FetchTaskRowsArg<'a>) -> DefaultResult<Self, Self::Error> {
        let sql_patt = format!(
            "SELECT {} FROM `stock_balance_import_staging` WHERE `shopid`=? AND `taskid`=? \
             ORDER BY `rownumber` ASC, `guidfixed` ASC",
            SELECT_COLUMN_SEQ.join(",")
        );
        Ok((sql_patt, _task_args(value.0, value.1)?))
    }
}

impl<'a> ListTaskRowsArg<'a> {
    // common search condition for both of the page query and the count query
    fn condition(&self) -> String {
        let mut out = "`shopid`=? AND `taskid`=?".to_string();
        if self.2.exist.is_some() {
            out += " AND `isnotexist`=?";
        }
        if self.2.query.is_some() {
            out += " AND (LOWER(`barcode`) LIKE ? OR LOWER(`name`) LIKE ? OR LOWER(`unitcode`) LIKE ?)";
        }
        out
    }
    fn condition_args(&self) -> DefaultResult<MySqlArguments, AppError> {
        let mut args = _task_args(self.0, self.1)?;
        if let Some(e) = self.2.exist {
            args.add(!e).map_err(arg_encode_error)?;
        }
        if let Some(q) = self.2.query.as_ref() {
            let escaped = q
                .to_lowercase()
                .replace('\\', "\\\\")
                .replace('%', "\\%")
                .replace('_', "\\_");
            let patt = format!("{escaped}%");
            for _ in 0..3 {
                args.add(patt.clone()).map_err(arg_encode_error)?;
            }
        }
        Ok(args)
    }
    fn count_query(&self) -> DefaultResult<(String, MySqlArguments), AppError> {
        let sql_patt = format!(
            "SELECT COUNT(*) FROM `stock_balance_import_staging` WHERE {}",
            self.condition()
        );
        Ok((sql_patt, self.condition_args()?))
    }
    fn page_query(&self) -> DefaultResult<(String, MySqlArguments), AppError> {
        let sql_patt = format!(
            "SELECT {} FROM `stock_balance_import_staging` WHERE {} \
             ORDER BY `rownumber` ASC, `guidfixed` ASC LIMIT ? OFFSET ?",
            SELECT_COLUMN_SEQ.join(","),
            self.condition()
        );
        let mut args = self.condition_args()?;
        args.add(self.2.limit).map_err(arg_encode_error)?;
        args.add(self.2.offset() as u64).map_err(arg_encode_error)?;
        Ok((sql_patt, args))
    }
} // end of impl ListTaskRowsArg

impl<'a> TryFrom<UpdateRowArg<'a>> for (String, MySqlArguments) {
    type Error = AppError;
    fn try_from(value: UpdateRowArg<'a>) -> DefaultResult<Self, Self::Error> {
        let UpdateRowArg(shop_id, guid, d) = value;
        let sql_patt = "UPDATE `stock_balance_import_staging` SET `barcode`=?, `name`=?, \
            `unitcode`=?, `warehousecode`=?, `shelfcode`=?, `qty`=?, `price`=?, `sumamount`=? \
            WHERE `shopid`=? AND `guidfixed`=?"
            .to_string();
        let mut args = MySqlArguments::default();
        args.add(d.barcode).map_err(arg_encode_error)?;
        args.add(d.name).map_err(arg_encode_error)?;
        args.add(d.unit_code).map_err(arg_encode_error)?;
        args.add(d.warehouse_code).map_err(arg_encode_error)?;
        args.add(d.shelf_code).map_err(arg_encode_error)?;
        args.add(d.qty).map_err(arg_encode_error)?;
        args.add(d.price).map_err(arg_encode_error)?;
        args.add(d.sum_amount).map_err(arg_encode_error)?;
        args.add(shop_id.to_string()).map_err(arg_encode_error)?;
        args.add(guid.to_string()).map_err(arg_encode_error)?;
        Ok((sql_patt, args))
    }
}

impl<'a> TryFrom<DeleteRowArg<'a>> for (String, MySqlArguments) {
    type Error = AppError;
    fn try_from(value: DeleteRowArg<'a>) -> DefaultResult<Self, Self::Error> {
        let sql_patt =
            "DELETE FROM `stock_balance_import_staging` WHERE `shopid`=? AND `guidfixed`=?";
        Ok((sql_patt.to_string(), _task_args(value.0, value.1)?))
    }
}

impl<'a> TryFrom<DeleteTaskArg<'a>> for (String, MySqlArguments) {
    type Error = AppError;
    fn try_from(value: DeleteTaskArg<'a>) -> DefaultResult<Self, Self::Error> {
        let sql_patt = "DELETE FROM `stock_balance_import_staging` WHERE `shopid`=? AND `taskid`=?";
        Ok((sql_patt.to_string(), _task_args(value.0, value.1)?))
    }
}

impl<'a> TryFrom<UpdateExistArg<'a>> for (String, MySqlArguments) {
    type Error = AppError;
    fn try_from(value: UpdateExistArg<'a>) -> DefaultResult<Self, Self::Error> {
        let UpdateExistArg(shop_id, task_id, is_exist, barcodes) = value;
        let sql_patt = format!(
            "UPDATE `stock_balance_import_staging` SET `isnotexist`=? WHERE `shopid`=? \
             AND `taskid`=? AND `barcode` IN ({})",
            placeholders(barcodes.len())
        );
        let mut args = MySqlArguments::default();
        args.add(!is_exist).map_err(arg_encode_error)?;
        args.add(shop_id.to_string()).map_err(arg_encode_error)?;
        args.add(task_id.to_string()).map_err(arg_encode_error)?;
        for b in barcodes {
            args.add(b).map_err(arg_encode_error)?;
        }
        Ok((sql_patt, args))
    }
}

impl<'a> TryFrom<CountExistArg<'a>> for (String, MySqlArguments) {
    type Error = AppError;
    fn try_from(value: CountExistArg<'a>) -> DefaultResult<Self, Self::Error> {
        let sql_patt = "SELECT COUNT(*) FROM `stock_balance_import_staging` WHERE `shopid`=? \
                        AND `taskid`=? AND `isnotexist`=?";
        let mut args = _task_args(value.0, value.1)?;
        args.add(!value.2).map_err(arg_encode_error)?;
        Ok((sql_patt.to_string(), args))
    }
}

impl TryFrom<MySqlRow> for StagingRowModel {
    type Error = AppError;
    fn try_from(value: MySqlRow) -> DefaultResult<Self, Self::Error> {
        let created_at = value.try_get::<NaiveDateTime, usize>(13)?;
        Ok(Self {
            shop_id: value.try_get::<String, usize>(0)?,
            guid: value.try_get::<String, usize>(1)?,
            task_id: value.try_get::<String, usize>(2)?,
            row_number: value.try_get::<u32, usize>(3)?,
            barcode: value.try_get::<String, usize>(4)?,
            name: value.try_get::<String, usize>(5)?,
            unit_code: value.try_get::<String, usize>(6)?,
            warehouse_code: value.try_get::<String, usize>(7)?,
            shelf_code: value.try_get::<String, usize>(8)?,
            qty: value.try_get::<f64, usize>(9)?,
            price: value.try_get::<f64, usize>(10)?,
            sum_amount: value.try_get::<f64, usize>(11)?,
            is_not_exist: value.try_get::<bool, usize>(12)?,
            created_at: from_db_time(created_at),
            created_by: value.try_get::<String, usize>(14)?,
        })
    }
}

pub struct StagingRowMariaDbRepo {
    db: Arc<AppMariaDbStore>,
}

impl StagingRowMariaDbRepo {
    pub fn new(dbs: &[Arc<AppMariaDbStore>]) -> DefaultResult<Self, AppError> {
        // TODO, currently this repo always grabs the first db pool,
        // figure out how to balance loading when the app data grows
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

    async fn _execute_common(
        &self,
        sql_patt: String,
        args: MySqlArguments,
    ) -> DefaultResult<usize, AppError> {
        let mut conn = self.db.acquire().await?;
        let stmt = conn.prepare(sql_patt.as_str()).await?;
        let query = stmt.query_with(args);
        let exec = conn.as_mut();
        let resultset = query.execute(exec).await?;
        Ok(resultset.rows_affected() as usize)
    }

    async fn _count_common(
        &self,
        sql_patt: String,
        args: MySqlArguments,
    ) -> DefaultResult<u64, AppError> {
        let rows = self._fetch_common(sql_patt, args).await?;
        let num = match rows.first() {
            Some(r) => r.try_get::<i64, usize>(0)?,
            None => 0,
        };
        Ok(num as u64)
    }

    fn _rows_to_models(rows: Vec<MySqlRow>) -> DefaultResult<Vec<StagingRowModel>, AppError> {
        rows.into_iter().map(StagingRowModel::try_from).collect()
    }
} // end of impl StagingRowMariaDbRepo

#[async_trait]
impl AbsStagingRowRepo for StagingRowMariaDbRepo {
    async fn all(&self, shop_id: &str, task_id: &str) -> DefaultResult<Vec<StagingRowModel>, AppError> {
        let (sql_patt, args) = FetchTaskRowsArg(shop_id, task_id).try_into()?;
        let rows = self._fetch_common(sql_patt, args).await?;
        Self::_rows_to_models(rows)
    }

    async fn list(
        &self,
        shop_id: &str,
        task_id: &str,
        filter: &StagingRowFilterModel,
    ) -> DefaultResult<(Vec<StagingRowModel>, PaginationModel), AppError> {
        let arg = ListTaskRowsArg(shop_id, task_id, filter);
        let (sql_patt, args) = arg.count_query()?;
        let total = self._count_common(sql_patt, args).await?;
        let (sql_patt, args) = arg.page_query()?;
        let rows = self._fetch_common(sql_patt, args).await?;
        let pagination = PaginationModel::build(filter.page, filter.limit, total);
        Ok((Self::_rows_to_models(rows)?, pagination))
    }

    async fn create(&self, row: StagingRowModel) -> DefaultResult<(), AppError> {
        let _num = self.create_batch(vec![row]).await?;
        Ok(())
    }

    async fn create_batch(&self, mut rows: Vec<StagingRowModel>) -> DefaultResult<usize, AppError> {
        let tot_num = rows.len();
        let mut conn = self.db.acquire().await?;
        let mut tx = conn.begin().await?;
        while !rows.is_empty() {
            let num_batch = min(rows.len(), MAX_ROWS_PER_INSERT);
            let processing = rows.split_off(rows.len() - num_batch);
            let (sql_patt, args) = InsertRowsArg(processing).try_into()?;
            let _rs = run_query_once(&mut tx, sql_patt, args, Some(num_batch)).await?;
        }
        tx.commit().await?;
        Ok(tot_num)
    }

    async fn update(
        &self,
        shop_id: &str,
        guid: &str,
        data: StagingRowEditModel,
    ) -> DefaultResult<usize, AppError> {
        let (sql_patt, args) = UpdateRowArg(shop_id, guid, data).try_into()?;
        self._execute_common(sql_patt, args).await
    }

    async fn delete_by_guid(&self, shop_id: &str, guid: &str) -> DefaultResult<usize, AppError> {
        let (sql_patt, args) = DeleteRowArg(shop_id, guid).try_into()?;
        self._execute_common(sql_patt, args).await
    }

    async fn delete_by_task(&self, shop_id: &str, task_id: &str) -> DefaultResult<usize, AppError> {
        let (sql_patt, args) = DeleteTaskArg(shop_id, task_id).try_into()?;
        self._execute_common(sql_patt, args).await
    }

    async fn meta(&self, shop_id: &str, task_id: &str) -> DefaultResult<StagingTaskMetaModel, AppError> {
        let sql_patt = "SELECT COUNT(*), COALESCE(SUM(`sumamount`),0) FROM \
            `stock_balance_import_staging` WHERE `shopid`=? AND `taskid`=?"
            .to_string();
        let args = _task_args(shop_id, task_id)?;
        let rows = self._fetch_common(sql_patt, args).await?;
        let (total_item, total_amount) = match rows.first() {
            Some(r) => (r.try_get::<i64, usize>(0)?, r.try_get::<f64, usize>(1)?),
            None => (0, 0.0),
        };
        Ok(StagingTaskMetaModel {
            total_item: total_item as u64,
            total_amount,
        })
    }

    async fn max_row_number(&self, shop_id: &str, task_id: &str) -> DefaultResult<Option<u32>, AppError> {
        let sql_patt = "SELECT `rownumber` FROM `stock_balance_import_staging` WHERE `shopid`=? \
            AND `taskid`=? ORDER BY `rownumber` DESC LIMIT 1"
            .to_string();
        let args = _task_args(shop_id, task_id)?;
        let rows = self._fetch_common(sql_patt, args).await?;
        let out = match rows.first() {
            Some(r) => Some(r.try_get::<u32, usize>(0)?),
            None => None,
        };
        Ok(out)
    }

    async fn update_exist(
        &self,
        shop_id: &str,
        task_id: &str,
        is_exist: bool,
        barcodes: Vec<String>,
    ) -> DefaultResult<usize, AppError> {
        if barcodes.is_empty() {
            return Ok(0);
        }
        let (sql_patt, args) = UpdateExistArg(shop_id, task_id, is_exist, barcodes).try_into()?;
        self._execute_common(sql_patt, args).await
    }

    async fn count_exist(&self, shop_id: &str, task_id: &str, is_exist: bool) -> DefaultResult<u64, AppError> {
        let (sql_patt, args) = CountExistArg(shop_id, task_id, is_exist).try_into()?;
        self._count_common(sql_patt, args).await
    }
} // end of impl StagingRowMariaDbRepo
