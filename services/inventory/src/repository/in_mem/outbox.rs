use std::boxed::Box;
use std::collections::HashMap;
use std::result::Result as DefaultResult;
use std::sync::Arc;

use async_trait::async_trait;

use super::super::AbsOutboxRepo;
use super::{_col_datetime, _col_parse, _col_str, _new_row};
use crate::datastore::{AbsDStoreFilterKeyOp, AbstInMemoryDStore, AppInMemFetchedSingleTable};
use crate::error::AppError;
use crate::model::OutboxEventModel;

pub(super) const TABLE_LABEL: &str = "stock_balance_outbox";

enum InMemColIdx {
    ShopId,
    Route,
    Payload,
    CreatedAt,
    NumAttempts,
    Delivered,
    TotNumColumns,
}

impl From<InMemColIdx> for usize {
    fn from(value: InMemColIdx) -> usize {
        match value {
            InMemColIdx::ShopId => 0,
            InMemColIdx::Route => 1,
            InMemColIdx::Payload => 2,
            InMemColIdx::CreatedAt => 3,
            InMemColIdx::NumAttempts => 4,
            InMemColIdx::Delivered => 5,
            InMemColIdx::TotNumColumns => 6,
        }
    }
}

struct PendingFilterKeyOp;

impl AbsDStoreFilterKeyOp for PendingFilterKeyOp {
    fn filter(&self, _k: &String, v: &Vec<String>) -> bool {
        v.get::<usize>(InMemColIdx::Delivered.into())
            .map(|d| d.as_str() == "false")
            .unwrap_or(false)
    }
}

/// also used by stock-balance repository to write outbox record in the
/// same save operation as the details
pub(super) fn to_inmem_row(m: &OutboxEventModel) -> (String, Vec<String>) {
    let cols: Vec<(usize, String)> = vec![
        (InMemColIdx::ShopId.into(), m.shop_id.clone()),
        (InMemColIdx::Route.into(), m.route.clone()),
        (InMemColIdx::Payload.into(), m.payload.clone()),
        (InMemColIdx::CreatedAt.into(), m.created_at.to_rfc3339()),
        (InMemColIdx::NumAttempts.into(), m.num_attempts.to_string()),
        (InMemColIdx::Delivered.into(), m.delivered.to_string()),
    ];
    (m.id.clone(), _new_row(InMemColIdx::TotNumColumns.into(), cols))
}

fn from_inmem_row(id: &str, row: &[String]) -> DefaultResult<OutboxEventModel, AppError> {
    Ok(OutboxEventModel {
        id: id.to_string(),
        shop_id: _col_str(row, InMemColIdx::ShopId.into())?.to_string(),
        route: _col_str(row, InMemColIdx::Route.into())?.to_string(),
        payload: _col_str(row, InMemColIdx::Payload.into())?.to_string(),
        created_at: _col_datetime(row, InMemColIdx::CreatedAt.into())?,
        num_attempts: _col_parse(row, InMemColIdx::NumAttempts.into())?,
        delivered: _col_parse(row, InMemColIdx::Delivered.into())?,
    })
}

fn from_inmem_table(table: AppInMemFetchedSingleTable) -> DefaultResult<Vec<OutboxEventModel>, AppError> {
    table
        .iter()
        .map(|(k, row)| from_inmem_row(k.as_str(), row))
        .collect()
}

pub struct OutboxInMemRepo {
    datastore: Arc<Box<dyn AbstInMemoryDStore>>,
}

impl OutboxInMemRepo {
    pub async fn new(m: Arc<Box<dyn AbstInMemoryDStore>>) -> DefaultResult<Self, AppError> {
        m.create_table(TABLE_LABEL).await?;
        Ok(Self { datastore: m })
    }

    async fn _modify<F>(&self, ids: Vec<String>, f: F) -> DefaultResult<usize, AppError>
    where
        F: Fn(&mut OutboxEventModel) + Send,
    {
        if ids.is_empty() {
            return Ok(0);
        }
        let info = HashMap::from([(TABLE_LABEL.to_string(), ids)]);
        let (mut fetched, lock) = self.datastore.fetch_acquire(info).await?;
        let table = fetched.remove(TABLE_LABEL).unwrap_or_default();
        let updated = from_inmem_table(table)?
            .into_iter()
            .map(|mut m| {
                f(&mut m);
                to_inmem_row(&m)
            })
            .collect::<HashMap<_, _>>();
        let data = HashMap::from([(TABLE_LABEL.to_string(), updated)]);
        self.datastore.save_release(data, lock)
    }
} // end of impl OutboxInMemRepo

#[async_trait]
impl AbsOutboxRepo for OutboxInMemRepo {
    async fn fetch_pending(&self, limit: usize) -> DefaultResult<Vec<OutboxEventModel>, AppError> {
        let keys = self
            .datastore
            .filter_keys(TABLE_LABEL.to_string(), &PendingFilterKeyOp)
            .await?;
        let info = HashMap::from([(TABLE_LABEL.to_string(), keys)]);
        let mut fetched = self.datastore.fetch(info).await?;
        let table = fetched.remove(TABLE_LABEL).unwrap_or_default();
        let mut events = from_inmem_table(table)?;
        events.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        events.truncate(limit);
        Ok(events)
    }

    async fn mark_delivered(&self, ids: Vec<String>) -> DefaultResult<usize, AppError> {
        self._modify(ids, |m| {
            m.delivered = true;
        })
        .await
    }

    async fn record_failure(&self, ids: Vec<String>) -> DefaultResult<usize, AppError> {
        self._modify(ids, |m| {
            m.num_attempts = m.num_attempts.saturating_add(1);
        })
        .await
    }
} // end of impl OutboxInMemRepo
