use std::boxed::Box;
use std::collections::{HashMap, HashSet};
use std::result::Result as DefaultResult;
use std::sync::Arc;

use async_trait::async_trait;

use super::super::AbsStagingRowRepo;
use super::{_col_datetime, _col_parse, _col_str, _gen_key, _new_row, _split_key};
use crate::datastore::{AbsDStoreFilterKeyOp, AbstInMemoryDStore, AppInMemFetchedSingleTable};
use crate::error::AppError;
use crate::model::{
    PaginationModel, StagingRowEditModel, StagingRowFilterModel, StagingRowModel,
    StagingTaskMetaModel,
};

const TABLE_LABEL: &str = "stock_balance_import_staging";

enum InMemColIdx {
    TaskId,
    RowNumber,
    Barcode,
    Name,
    UnitCode,
    WarehouseCode,
    ShelfCode,
    Qty,
    Price,
    SumAmount,
    IsNotExist,
    CreatedBy,
    CreatedAt,
    TotNumColumns,
}

impl From<InMemColIdx> for usize {
    fn from(value: InMemColIdx) -> usize {
        match value {
            InMemColIdx::TaskId => 0,
            InMemColIdx::RowNumber => 1,
            InMemColIdx::Barcode => 2,
            InMemColIdx::Name => 3,
            InMemColIdx::UnitCode => 4,
            InMemColIdx::WarehouseCode => 5,
            InMemColIdx::ShelfCode => 6,
            InMemColIdx::Qty => 7,
            InMemColIdx::Price => 8,
            InMemColIdx::SumAmount => 9,
            InMemColIdx::IsNotExist => 10,
            InMemColIdx::CreatedBy => 11,
            InMemColIdx::CreatedAt => 12,
            InMemColIdx::TotNumColumns => 13,
        }
    }
}

struct TaskFilterKeyOp {
    key_prefix: String,
    task_id: String,
    // keep only rows with these barcodes if given
    barcodes: Option<HashSet<String>>,
}

impl AbsDStoreFilterKeyOp for TaskFilterKeyOp {
    fn filter(&self, k: &String, v: &Vec<String>) -> bool {
        let task_ok = k.starts_with(self.key_prefix.as_str())
            && v.get::<usize>(InMemColIdx::TaskId.into())
                .map(|t| t == &self.task_id)
                .unwrap_or(false);
        let barcode_ok = if let Some(b) = self.barcodes.as_ref() {
            v.get::<usize>(InMemColIdx::Barcode.into())
                .map(|code| b.contains(code))
                .unwrap_or(false)
        } else {
            true
        };
        task_ok && barcode_ok
    }
}

impl TaskFilterKeyOp {
    fn new(shop_id: &str, task_id: &str) -> Self {
        Self {
            key_prefix: _gen_key(shop_id, ""),
            task_id: task_id.to_string(),
            barcodes: None,
        }
    }
    fn with_barcodes(mut self, barcodes: Vec<String>) -> Self {
        self.barcodes = Some(HashSet::from_iter(barcodes));
        self
    }
}

fn to_inmem_row(m: &StagingRowModel) -> (String, Vec<String>) {
    let key = _gen_key(m.shop_id.as_str(), m.guid.as_str());
    let cols: Vec<(usize, String)> = vec![
        (InMemColIdx::TaskId.into(), m.task_id.clone()),
        (InMemColIdx::RowNumber.into(), m.row_number.to_string()),
        (InMemColIdx::Barcode.into(), m.barcode.clone()),
        (InMemColIdx::Name.into(), m.name.clone()),
        (InMemColIdx::UnitCode.into(), m.unit_code.clone()),
        (InMemColIdx::WarehouseCode.into(), m.warehouse_code.clone()),
        (InMemColIdx::ShelfCode.into(), m.shelf_code.clone()),
        (InMemColIdx::Qty.into(), m.qty.to_string()),
        (InMemColIdx::Price.into(), m.price.to_string()),
        (InMemColIdx::SumAmount.into(), m.sum_amount.to_string()),
        (InMemColIdx::IsNotExist.into(), m.is_not_exist.to_string()),
        (InMemColIdx::CreatedBy.into(), m.created_by.clone()),
        (InMemColIdx::CreatedAt.into(), m.created_at.to_rfc3339()),
    ];
    (key, _new_row(InMemColIdx::TotNumColumns.into(), cols))
}

fn from_inmem_row(key: &str, row: &[String]) -> DefaultResult<StagingRowModel, AppError> {
    let (shop_id, guid) = _split_key(key)?;
    Ok(StagingRowModel {
        shop_id,
        guid: guid.to_string(),
        task_id: _col_str(row, InMemColIdx::TaskId.into())?.to_string(),
        row_number: _col_parse(row, InMemColIdx::RowNumber.into())?,
        barcode: _col_str(row, InMemColIdx::Barcode.into())?.to_string(),
        name: _col_str(row, InMemColIdx::Name.into())?.to_string(),
        unit_code: _col_str(row, InMemColIdx::UnitCode.into())?.to_string(),
        warehouse_code: _col_str(row, InMemColIdx::WarehouseCode.into())?.to_string(),
        shelf_code: _col_str(row, InMemColIdx::ShelfCode.into())?.to_string(),
        qty: _col_parse(row, InMemColIdx::Qty.into())?,
        price: _col_parse(row, InMemColIdx::Price.into())?,
        sum_amount: _col_parse(row, InMemColIdx::SumAmount.into())?,
        is_not_exist: _col_parse(row, InMemColIdx::IsNotExist.into())?,
        created_by: _col_str(row, InMemColIdx::CreatedBy.into())?.to_string(),
        created_at: _col_datetime(row, InMemColIdx::CreatedAt.into())?,
    })
}

fn from_inmem_table(table: AppInMemFetchedSingleTable) -> DefaultResult<Vec<StagingRowModel>, AppError> {
    table
        .iter()
        .map(|(k, row)| from_inmem_row(k.as_str(), row))
        .collect()
}

pub struct StagingRowInMemRepo {
    datastore: Arc<Box<dyn AbstInMemoryDStore>>,
}

impl StagingRowInMemRepo {
    pub async fn new(m: Arc<Box<dyn AbstInMemoryDStore>>) -> DefaultResult<Self, AppError> {
        m.create_table(TABLE_LABEL).await?;
        Ok(Self { datastore: m })
    }

    async fn _save(&self, rows: Vec<StagingRowModel>) -> DefaultResult<usize, AppError> {
        let table = rows.iter().map(to_inmem_row).collect::<HashMap<_, _>>();
        let data = HashMap::from([(TABLE_LABEL.to_string(), table)]);
        self.datastore.save(data).await
    }

    async fn _delete_keys(&self, keys: Vec<String>) -> DefaultResult<usize, AppError> {
        if keys.is_empty() {
            return Ok(0);
        }
        let info = HashMap::from([(TABLE_LABEL.to_string(), keys)]);
        self.datastore.delete(info).await
    }
} // end of impl StagingRowInMemRepo

#[async_trait]
impl AbsStagingRowRepo for StagingRowInMemRepo {
    async fn all(&self, shop_id: &str, task_id: &str) -> DefaultResult<Vec<StagingRowModel>, AppError> {
        let op = TaskFilterKeyOp::new(shop_id, task_id);
        let keys = self.datastore.filter_keys(TABLE_LABEL.to_string(), &op).await?;
        let info = HashMap::from([(TABLE_LABEL.to_string(), keys)]);
        let mut fetched = self.datastore.fetch(info).await?;
        let table = fetched.remove(TABLE_LABEL).unwrap_or_default();
        let mut rows = from_inmem_table(table)?;
        rows.sort_by(|a, b| a.cmp_position(b));
        Ok(rows)
    }

    async fn list(
        &self,
        shop_id: &str,
        task_id: &str,
        filter: &StagingRowFilterModel,
    ) -> DefaultResult<(Vec<StagingRowModel>, PaginationModel), AppError> {
        let rows = self.all(shop_id, task_id).await?;
        let matched = rows
            .into_iter()
            .filter(|r| r.match_filter(filter))
            .collect::<Vec<_>>();
        let pagination = PaginationModel::build(filter.page, filter.limit, matched.len() as u64);
        let page = matched
            .into_iter()
            .skip(filter.offset())
            .take(filter.limit as usize)
            .collect();
        Ok((page, pagination))
    }

    async fn create(&self, row: StagingRowModel) -> DefaultResult<(), AppError> {
        let _num = self._save(vec![row]).await?;
        Ok(())
    }

    async fn create_batch(&self, rows: Vec<StagingRowModel>) -> DefaultResult<usize, AppError> {
        if rows.is_empty() {
            Ok(0)
        } else {
            self._save(rows).await
        }
    }

    async fn update(
        &self,
        shop_id: &str,
        guid: &str,
        data: StagingRowEditModel,
    ) -> DefaultResult<usize, AppError> {
        let key = _gen_key(shop_id, guid);
        let info = HashMap::from([(TABLE_LABEL.to_string(), vec![key])]);
        let (mut fetched, lock) = self.datastore.fetch_acquire(info).await?;
        let table = fetched.remove(TABLE_LABEL).unwrap_or_default();
        let mut rows = from_inmem_table(table)?;
        if let Some(saved) = rows.first_mut() {
            saved.apply_edit(data);
            let table = rows.iter().map(to_inmem_row).collect::<HashMap<_, _>>();
            let data = HashMap::from([(TABLE_LABEL.to_string(), table)]);
            self.datastore.save_release(data, lock)
        } else {
            Ok(0)
        }
    }

    async fn delete_by_guid(&self, shop_id: &str, guid: &str) -> DefaultResult<usize, AppError> {
        self._delete_keys(vec![_gen_key(shop_id, guid)]).await
    }

    async fn delete_by_task(&self, shop_id: &str, task_id: &str) -> DefaultResult<usize, AppError> {
        let op = TaskFilterKeyOp::new(shop_id, task_id);
        let keys = self.datastore.filter_keys(TABLE_LABEL.to_string(), &op).await?;
        self._delete_keys(keys).await
    }

    async fn meta(&self, shop_id: &str, task_id: &str) -> DefaultResult<StagingTaskMetaModel, AppError> {
        let rows = self.all(shop_id, task_id).await?;
        let total_amount = rows.iter().map(|r| r.sum_amount).sum();
        Ok(StagingTaskMetaModel {
            total_item: rows.len() as u64,
            total_amount,
        })
    }

    async fn max_row_number(&self, shop_id: &str, task_id: &str) -> DefaultResult<Option<u32>, AppError> {
        let rows = self.all(shop_id, task_id).await?;
        Ok(rows.iter().map(|r| r.row_number).max())
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
        let op = TaskFilterKeyOp::new(shop_id, task_id).with_barcodes(barcodes);
        let keys = self.datastore.filter_keys(TABLE_LABEL.to_string(), &op).await?;
        if keys.is_empty() {
            return Ok(0);
        }
        let info = HashMap::from([(TABLE_LABEL.to_string(), keys)]);
        let (mut fetched, lock) = self.datastore.fetch_acquire(info).await?;
        let table = fetched.remove(TABLE_LABEL).unwrap_or_default();
        let updated = from_inmem_table(table)?
            .into_iter()
            .map(|mut r| {
                r.is_not_exist = !is_exist;
                to_inmem_row(&r)
            })
            .collect::<HashMap<_, _>>();
        let data = HashMap::from([(TABLE_LABEL.to_string(), updated)]);
        self.datastore.save_release(data, lock)
    } // end of fn update_exist

    async fn count_exist(&self, shop_id: &str, task_id: &str, is_exist: bool) -> DefaultResult<u64, AppError> {
        let rows = self.all(shop_id, task_id).await?;
        let num = rows.iter().filter(|r| r.is_not_exist != is_exist).count();
        Ok(num as u64)
    }
} // end of impl StagingRowInMemRepo
