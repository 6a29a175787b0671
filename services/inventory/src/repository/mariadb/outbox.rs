use std::result::Result as DefaultResult;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use sqlx::mysql::{MySqlArguments, MySqlRow};
use sqlx::{Arguments, Executor, Row, Statement};

use super::{arg_encode_error, from_db_time, placeholders, to_db_time};
use crate::datastore::AppMariaDbStore;
use crate::error::{AppError, AppErrorCode};
use crate::model::OutboxEventModel;
use crate::repository::AbsOutboxRepo;

#[rustfmt::skip]
const SELECT_COLUMN_SEQ: [&str; 7] = [
    "`id`", "`shopid`", "`route`", "`payload`", "`createdat`", "`numattempts`", "`delivered`",
];

/// also used by stock-balance repository within its transaction
pub(super) struct InsertEventArg(pub(super) OutboxEventModel);
struct FetchPendingArg(usize);
struct MarkDeliveredArg(Vec<String>);
struct RecordFailureArg(Vec<String>);

impl TryFrom<InsertEventArg> for (String, MySqlArguments) {
    type Error = AppError;
    fn try_from(value: InsertEventArg) -> DefaultResult<Self, Self::Error> {
        let m = value.0;
        let sql_patt = format!(
            "INSERT INTO `stock_balance_outbox`({}) VALUES ({})",
            SELECT_COLUMN_SEQ.join(","),
            placeholders(SELECT_COLUMN_SEQ.len())
        );
        let mut args = MySqlArguments::default();
        let created_at = to_db_time(&m.created_at);
        args.add(m.id).map_err(arg_encode_error)?;
        args.add(m.shop_id).map_err(arg_encode_error)?;
        args.add(m.route).map_err(arg_encode_error)?;
        args.add(m.payload).map_err(arg_encode_error)?;
        args.add(created_at).map_err(arg_encode_error)?;
        args.add(m.num_attempts).map_err(arg_encode_error)?;
        args.add(m.delivered).map_err(arg_encode_error)?;
        Ok((sql_patt, args))
    }
}

impl TryFrom<FetchPendingArg> for (String, MySqlArguments) {
    type Error = AppError;
    fn try_from(value: FetchPendingArg) -> DefaultResult<Self, Self::Error> {
        let sql_patt = format!(
            "SELECT {} FROM `stock_balance_outbox` WHERE `delivered`=FALSE \
             ORDER BY `createdat` ASC, `id` ASC LIMIT ?",
            SELECT_COLUMN_SEQ.join(",")
        );
        let mut args = MySqlArguments::default();
        args.add(value.0 as u64).map_err(arg_encode_error)?;
        Ok((sql_patt, args))
    }
}

fn _ids_args(ids: Vec<String>) -> DefaultResult<MySqlArguments, AppError> {
    let mut args = MySqlArguments::default();
    for id in ids {
        args.add(id).map_err(arg_encode_error)?;
    }
    Ok(args)
}

impl TryFrom<MarkDeliveredArg> for (String, MySqlArguments) {
    type Error = AppError;
    fn try_from(value: MarkDeliveredArg) -> DefaultResult<Self, Self::Error> {
        let sql_patt = format!(
            "UPDATE `stock_balance_outbox` SET `delivered`=TRUE WHERE `id` IN ({})",
            placeholders(value.0.len())
        );
        Ok((sql_patt, _ids_args(value.0)?))
    }
}

impl TryFrom<RecordFailureArg> for (String, MySqlArguments) {
    type Error = AppError;
    fn try_from(value: RecordFailureArg) -> DefaultResult<Self, Self::Error> {
        let sql_patt = format!(
            "UPDATE `stock_balance_outbox` SET `numattempts`=`numattempts`+1 WHERE `id` IN ({})",
            placeholders(value.0.len())
        );
        Ok((sql_patt, _ids_args(value.0)?))
    }
}

impl TryFrom<MySqlRow> for OutboxEventModel {
    type Error = AppError;
    fn try_from(value: MySqlRow) -> DefaultResult<Self, Self::Error> {
        let created_at = value.try_get::<NaiveDateTime, usize>(4)?;
        Ok(Self {
            id: value.try_get::<String, usize>(0)?,
            shop_id: value.try_get::<String, usize>(1)?,
            route: value.try_get::<String, usize>(2)?,
            payload: value.try_get::<String, usize>(3)?,
            created_at: from_db_time(created_at),
            num_attempts: value.try_get::<u16, usize>(5)?,
            delivered: value.try_get::<bool, usize>(6)?,
        })
    }
}

pub struct OutboxMariaDbRepo {
    db: Arc<AppMariaDbStore>,
}

impl OutboxMariaDbRepo {
    pub fn new(dbs: &[Arc<AppMariaDbStore>]) -> DefaultResult<Self, AppError> {
        let db = dbs.first().cloned().ok_or(AppError {
            code: AppErrorCode::MissingDataStore,
            detail: Some("mariadb".to_string()),
        })?;
        Ok(Self { db })
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
}

#[async_trait]
impl AbsOutboxRepo for OutboxMariaDbRepo {
    async fn fetch_pending(&self, limit: usize) -> DefaultResult<Vec<OutboxEventModel>, AppError> {
        let (sql_patt, args) = FetchPendingArg(limit).try_into()?;
        let mut conn = self.db.acquire().await?;
        let stmt = conn.prepare(sql_patt.as_str()).await?;
        let query = stmt.query_with(args);
        let exec = conn.as_mut();
        let rows = query.fetch_all(exec).await?;
        rows.into_iter().map(OutboxEventModel::try_from).collect()
    }

    async fn mark_delivered(&self, ids: Vec<String>) -> DefaultResult<usize, AppError> {
        if ids.is_empty() {
            return Ok(0);
        }
        let (sql_patt, args) = MarkDeliveredArg(ids).try_into()?;
        self._execute_common(sql_patt, args).await
    }

    async fn record_failure(&self, ids: Vec<String>) -> DefaultResult<usize, AppError> {
        if ids.is_empty() {
            return Ok(0);
        }
        let (sql_patt, args) = RecordFailureArg(ids).try_into()?;
        self._execute_common(sql_patt, args).await
    }
} // end of impl OutboxMariaDbRepo
