use std::boxed::Box;
use std::collections::HashMap;
use std::result::Result as DefaultResult;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Local;

use super::super::AbsStockBalanceRepo;
use super::outbox::{to_inmem_row as outbox_inmem_row, TABLE_LABEL as OUTBOX_TABLE_LABEL};
use super::{
    _col_datetime, _col_names, _col_parse, _col_str, _gen_key, _names_to_col, _new_row,
};
use crate::constant::DOC_NO_PREFIX;
use crate::datastore::{AbsDStoreFilterKeyOp, AbstInMemoryDStore};
use crate::error::{AppError, AppErrorCode};
use crate::generate_guid;
use crate::model::{OutboxEventModel, StockBalanceDetailModel, StockBalanceHeaderModel};

#[allow(non_snake_case)]
mod HeaderTable {
    pub(super) const LABEL: &str = "stock_balance_header";
    pub(super) enum InMemColIdx {
        DocNo,
        DocDatetime,
        DocRefNo,
        Description,
        BranchCode,
        TotalValue,
        TotalAmount,
        CreatedBy,
        CreatedAt,
        TotNumColumns,
    }
    impl From<InMemColIdx> for usize {
        fn from(value: InMemColIdx) -> usize {
            match value {
                InMemColIdx::DocNo => 0,
                InMemColIdx::DocDatetime => 1,
                InMemColIdx::DocRefNo => 2,
                InMemColIdx::Description => 3,
                InMemColIdx::BranchCode => 4,
                InMemColIdx::TotalValue => 5,
                InMemColIdx::TotalAmount => 6,
                InMemColIdx::CreatedBy => 7,
                InMemColIdx::CreatedAt => 8,
                InMemColIdx::TotNumColumns => 9,
            }
        }
    }
}

#[allow(non_snake_case)]
mod DetailTable {
    pub(super) const LABEL: &str = "stock_balance_detail";
    pub(super) enum InMemColIdx {
        ItemCode,
        Barcode,
        ItemNames,
        ItemType,
        TaxType,
        VatType,
        VatCal,
        DivideValue,
        StandValue,
        UnitCode,
        UnitNames,
        Qty,
        Price,
        SumAmount,
        TotNumColumns,
    }
    impl From<InMemColIdx> for usize {
        fn from(value: InMemColIdx) -> usize {
            match value {
                InMemColIdx::ItemCode => 0,
                InMemColIdx::Barcode => 1,
                InMemColIdx::ItemNames => 2,
                InMemColIdx::ItemType => 3,
                InMemColIdx::TaxType => 4,
                InMemColIdx::VatType => 5,
                InMemColIdx::VatCal => 6,
                InMemColIdx::DivideValue => 7,
                InMemColIdx::StandValue => 8,
                InMemColIdx::UnitCode => 9,
                InMemColIdx::UnitNames => 10,
                InMemColIdx::Qty => 11,
                InMemColIdx::Price => 12,
                InMemColIdx::SumAmount => 13,
                InMemColIdx::TotNumColumns => 14,
            }
        }
    }
}

// last sequence number of document per shop and date
#[allow(non_snake_case)]
mod DocNoSeqTable {
    pub(super) const LABEL: &str = "stock_balance_docno_seq";
    pub(super) const COL_LAST_SEQ: usize = 0;
}

struct KeyPrefixFilterOp(String);

impl AbsDStoreFilterKeyOp for KeyPrefixFilterOp {
    fn filter(&self, k: &String, _v: &Vec<String>) -> bool {
        k.starts_with(self.0.as_str())
    }
}

fn header_to_row(m: &StockBalanceHeaderModel, username: &str) -> Vec<String> {
    use HeaderTable::InMemColIdx;
    let now = Local::now().fixed_offset();
    let cols: Vec<(usize, String)> = vec![
        (InMemColIdx::DocNo.into(), m.doc_no.clone()),
        (InMemColIdx::DocDatetime.into(), m.doc_datetime.to_rfc3339()),
        (InMemColIdx::DocRefNo.into(), m.doc_ref_no.clone()),
        (InMemColIdx::Description.into(), m.description.clone()),
        (InMemColIdx::BranchCode.into(), m.branch_code.clone()),
        (InMemColIdx::TotalValue.into(), m.total_value.to_string()),
        (InMemColIdx::TotalAmount.into(), m.total_amount.to_string()),
        (InMemColIdx::CreatedBy.into(), username.to_string()),
        (InMemColIdx::CreatedAt.into(), now.to_rfc3339()),
    ];
    _new_row(InMemColIdx::TotNumColumns.into(), cols)
}

fn header_from_row(row: &[String]) -> DefaultResult<StockBalanceHeaderModel, AppError> {
    use HeaderTable::InMemColIdx;
    Ok(StockBalanceHeaderModel {
        doc_no: _col_str(row, InMemColIdx::DocNo.into())?.to_string(),
        doc_datetime: _col_datetime(row, InMemColIdx::DocDatetime.into())?,
        doc_ref_no: _col_str(row, InMemColIdx::DocRefNo.into())?.to_string(),
        description: _col_str(row, InMemColIdx::Description.into())?.to_string(),
        branch_code: _col_str(row, InMemColIdx::BranchCode.into())?.to_string(),
        total_value: _col_parse(row, InMemColIdx::TotalValue.into())?,
        total_amount: _col_parse(row, InMemColIdx::TotalAmount.into())?,
    })
}

fn detail_to_row(m: &StockBalanceDetailModel) -> DefaultResult<Vec<String>, AppError> {
    use DetailTable::InMemColIdx;
    let cols: Vec<(usize, String)> = vec![
        (InMemColIdx::ItemCode.into(), m.item_code.clone()),
        (InMemColIdx::Barcode.into(), m.barcode.clone()),
        (InMemColIdx::ItemNames.into(), _names_to_col(&m.item_names)?),
        (InMemColIdx::ItemType.into(), m.item_type.to_string()),
        (InMemColIdx::TaxType.into(), m.tax_type.to_string()),
        (InMemColIdx::VatType.into(), m.vat_type.to_string()),
        (InMemColIdx::VatCal.into(), m.vat_cal.to_string()),
        (InMemColIdx::DivideValue.into(), m.divide_value.to_string()),
        (InMemColIdx::StandValue.into(), m.stand_value.to_string()),
        (InMemColIdx::UnitCode.into(), m.unit_code.clone()),
        (InMemColIdx::UnitNames.into(), _names_to_col(&m.unit_names)?),
        (InMemColIdx::Qty.into(), m.qty.to_string()),
        (InMemColIdx::Price.into(), m.price.to_string()),
        (InMemColIdx::SumAmount.into(), m.sum_amount.to_string()),
    ];
    Ok(_new_row(InMemColIdx::TotNumColumns.into(), cols))
}

fn detail_from_row(doc_no: &str, row: &[String]) -> DefaultResult<StockBalanceDetailModel, AppError> {
    use DetailTable::InMemColIdx;
    Ok(StockBalanceDetailModel {
        doc_no: doc_no.to_string(),
        item_code: _col_str(row, InMemColIdx::ItemCode.into())?.to_string(),
        barcode: _col_str(row, InMemColIdx::Barcode.into())?.to_string(),
        item_names: _col_names(row, InMemColIdx::ItemNames.into())?,
        item_type: _col_parse(row, InMemColIdx::ItemType.into())?,
        tax_type: _col_parse(row, InMemColIdx::TaxType.into())?,
        vat_type: _col_parse(row, InMemColIdx::VatType.into())?,
        vat_cal: _col_parse(row, InMemColIdx::VatCal.into())?,
        divide_value: _col_parse(row, InMemColIdx::DivideValue.into())?,
        stand_value: _col_parse(row, InMemColIdx::StandValue.into())?,
        unit_code: _col_str(row, InMemColIdx::UnitCode.into())?.to_string(),
        unit_names: _col_names(row, InMemColIdx::UnitNames.into())?,
        qty: _col_parse(row, InMemColIdx::Qty.into())?,
        price: _col_parse(row, InMemColIdx::Price.into())?,
        sum_amount: _col_parse(row, InMemColIdx::SumAmount.into())?,
    })
}

// key of detail rows : `<shop-id>/<doc-no>/<line-seq>`
fn detail_key(shop_id: &str, doc_no: &str, seq: usize) -> String {
    _gen_key(shop_id, format!("{doc_no}/{seq:05}").as_str())
}

pub struct StockBalanceInMemRepo {
    datastore: Arc<Box<dyn AbstInMemoryDStore>>,
}

impl StockBalanceInMemRepo {
    pub async fn new(m: Arc<Box<dyn AbstInMemoryDStore>>) -> DefaultResult<Self, AppError> {
        for label in [
            HeaderTable::LABEL,
            DetailTable::LABEL,
            DocNoSeqTable::LABEL,
            OUTBOX_TABLE_LABEL,
        ] {
            m.create_table(label).await?;
        }
        Ok(Self { datastore: m })
    }
}

#[async_trait]
impl AbsStockBalanceRepo for StockBalanceInMemRepo {
    async fn create_header(
        &self,
        shop_id: &str,
        username: &str,
        mut header: StockBalanceHeaderModel,
    ) -> DefaultResult<(StockBalanceHeaderModel, String, String), AppError> {
        let prefix = format!("{DOC_NO_PREFIX}{}", header.doc_datetime.format("%Y%m%d"));
        let seq_key = _gen_key(shop_id, prefix.as_str());
        let info = HashMap::from([(DocNoSeqTable::LABEL.to_string(), vec![seq_key.clone()])]);
        // the lock serializes concurrent callers until the new sequence is saved
        let (mut fetched, lock) = self.datastore.fetch_acquire(info).await?;
        let last_seq = match fetched
            .remove(DocNoSeqTable::LABEL)
            .and_then(|mut t| t.remove(seq_key.as_str()))
        {
            Some(row) => _col_parse::<u32>(&row, DocNoSeqTable::COL_LAST_SEQ)?,
            None => 0,
        };
        let new_seq = last_seq + 1;
        let doc_no = format!("{prefix}-{new_seq:05}");
        let guid = generate_guid();
        header.doc_no = doc_no.clone();
        let data = HashMap::from([
            (
                DocNoSeqTable::LABEL.to_string(),
                HashMap::from([(seq_key, vec![new_seq.to_string()])]),
            ),
            (
                HeaderTable::LABEL.to_string(),
                HashMap::from([(
                    _gen_key(shop_id, guid.as_str()),
                    header_to_row(&header, username),
                )]),
            ),
        ]);
        let _num = self.datastore.save_release(data, lock)?;
        Ok((header, guid, doc_no))
    } // end of fn create_header

    async fn create_details(
        &self,
        shop_id: &str,
        doc_no: &str,
        details: Vec<StockBalanceDetailModel>,
        event: OutboxEventModel,
    ) -> DefaultResult<(), AppError> {
        if details.is_empty() {
            return Err(AppError {
                code: AppErrorCode::EmptyInputData,
                detail: Some("stock-balance-detail".to_string()),
            });
        }
        let detail_rows = details
            .iter()
            .enumerate()
            .map(|(idx, d)| Ok((detail_key(shop_id, doc_no, idx + 1), detail_to_row(d)?)))
            .collect::<DefaultResult<HashMap<_, _>, AppError>>()?;
        let (evt_key, evt_row) = outbox_inmem_row(&event);
        let data = HashMap::from([
            (DetailTable::LABEL.to_string(), detail_rows),
            (
                OUTBOX_TABLE_LABEL.to_string(),
                HashMap::from([(evt_key, evt_row)]),
            ),
        ]);
        let _num = self.datastore.save(data).await?;
        Ok(())
    }

    async fn delete_header(&self, shop_id: &str, header_guid: &str, _username: &str) -> DefaultResult<(), AppError> {
        let key = _gen_key(shop_id, header_guid);
        let info = HashMap::from([(HeaderTable::LABEL.to_string(), vec![key])]);
        let _num = self.datastore.delete(info).await?;
        Ok(())
    }

    async fn fetch_header(
        &self,
        shop_id: &str,
        header_guid: &str,
    ) -> DefaultResult<Option<StockBalanceHeaderModel>, AppError> {
        let key = _gen_key(shop_id, header_guid);
        let info = HashMap::from([(HeaderTable::LABEL.to_string(), vec![key.clone()])]);
        let mut fetched = self.datastore.fetch(info).await?;
        let row = fetched
            .remove(HeaderTable::LABEL)
            .and_then(|mut t| t.remove(key.as_str()));
        row.map(|r| header_from_row(&r)).transpose()
    }

    async fn fetch_details(
        &self,
        shop_id: &str,
        doc_no: &str,
    ) -> DefaultResult<Vec<StockBalanceDetailModel>, AppError> {
        let op = KeyPrefixFilterOp(_gen_key(shop_id, format!("{doc_no}/").as_str()));
        let mut keys = self
            .datastore
            .filter_keys(DetailTable::LABEL.to_string(), &op)
            .await?;
        keys.sort();
        let info = HashMap::from([(DetailTable::LABEL.to_string(), keys.clone())]);
        let mut fetched = self.datastore.fetch(info).await?;
        let table = fetched.remove(DetailTable::LABEL).unwrap_or_default();
        keys.iter()
            .filter_map(|k| table.get(k.as_str()))
            .map(|row| detail_from_row(doc_no, row))
            .collect()
    }
} // end of impl StockBalanceInMemRepo

