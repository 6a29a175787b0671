mod manage_staging;
mod outbox;
mod verify_task;

use std::collections::HashMap;
use std::result::Result as DefaultResult;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use inventory::error::{AppError, AppErrorCode};
use inventory::model::{
    OutboxEventModel, ProductBarcodeModel, StockBalanceDetailModel, StockBalanceHeaderModel,
};
use inventory::repository::{AbsProductBarcodeRepo, AbsStockBalanceRepo, StockBalanceInMemRepo};
use inventory::{AbstractEventPublisher, AppEventMessage};

use crate::ut_product;

/// product master which records size of every lookup, products can be
/// removed from the master after given number of lookups
pub(super) struct MockProductRepo {
    items: HashMap<String, ProductBarcodeModel>,
    lookups: Arc<Mutex<Vec<usize>>>,
    vanish_after: Option<usize>,
}

impl MockProductRepo {
    pub(super) fn build(barcodes: &[&str]) -> (Self, Arc<Mutex<Vec<usize>>>) {
        let items = barcodes
            .iter()
            .enumerate()
            .map(|(idx, b)| (b.to_string(), ut_product(b, format!("IT-{idx:03}").as_str())))
            .collect();
        let lookups = Arc::new(Mutex::new(Vec::new()));
        let obj = Self {
            items,
            lookups: lookups.clone(),
            vanish_after: None,
        };
        (obj, lookups)
    }

    pub(super) fn vanish_after(mut self, num_lookups: usize) -> Self {
        self.vanish_after = Some(num_lookups);
        self
    }
}

#[async_trait]
impl AbsProductBarcodeRepo for MockProductRepo {
    async fn find_by_barcodes(
        &self,
        _shop_id: &str,
        barcodes: Vec<String>,
    ) -> DefaultResult<Vec<ProductBarcodeModel>, AppError> {
        let num_done = {
            let mut guard = self.lookups.lock().unwrap();
            guard.push(barcodes.len());
            guard.len() - 1
        };
        if self.vanish_after.is_some_and(|n| num_done >= n) {
            return Ok(Vec::new());
        }
        let out = barcodes
            .iter()
            .filter_map(|b| self.items.get(b.as_str()).cloned())
            .collect();
        Ok(out)
    }

    async fn save(&self, _shop_id: &str, _items: Vec<ProductBarcodeModel>) -> DefaultResult<(), AppError> {
        Err(AppError {
            code: AppErrorCode::NotImplemented,
            detail: None,
        })
    }
}

/// delegate to in-memory repository, saving details can be switched to
/// always fail
pub(super) struct MockStockBalanceRepo {
    inner: StockBalanceInMemRepo,
    fail_details: bool,
    header_guids: Arc<Mutex<Vec<String>>>,
}

impl MockStockBalanceRepo {
    pub(super) fn build(inner: StockBalanceInMemRepo, fail_details: bool) -> (Self, Arc<Mutex<Vec<String>>>) {
        let header_guids = Arc::new(Mutex::new(Vec::new()));
        let obj = Self {
            inner,
            fail_details,
            header_guids: header_guids.clone(),
        };
        (obj, header_guids)
    }
}

#[async_trait]
impl AbsStockBalanceRepo for MockStockBalanceRepo {
    async fn create_header(
        &self,
        shop_id: &str,
        username: &str,
        header: StockBalanceHeaderModel,
    ) -> DefaultResult<(StockBalanceHeaderModel, String, String), AppError> {
        let out = self.inner.create_header(shop_id, username, header).await?;
        self.header_guids.lock().unwrap().push(out.1.clone());
        Ok(out)
    }

    async fn create_details(
        &self,
        shop_id: &str,
        doc_no: &str,
        details: Vec<StockBalanceDetailModel>,
        event: OutboxEventModel,
    ) -> DefaultResult<(), AppError> {
        if self.fail_details {
            Err(AppError {
                code: AppErrorCode::RemoteDbServerFailure,
                detail: Some("utest-detail-failure".to_string()),
            })
        } else {
            self.inner.create_details(shop_id, doc_no, details, event).await
        }
    }

    async fn delete_header(&self, shop_id: &str, header_guid: &str, username: &str) -> DefaultResult<(), AppError> {
        self.inner.delete_header(shop_id, header_guid, username).await
    }

    async fn fetch_header(
        &self,
        shop_id: &str,
        header_guid: &str,
    ) -> DefaultResult<Option<StockBalanceHeaderModel>, AppError> {
        self.inner.fetch_header(shop_id, header_guid).await
    }

    async fn fetch_details(
        &self,
        shop_id: &str,
        doc_no: &str,
    ) -> DefaultResult<Vec<StockBalanceDetailModel>, AppError> {
        self.inner.fetch_details(shop_id, doc_no).await
    }
} // end of impl MockStockBalanceRepo

pub(super) struct MockEventPublisher {
    fail: bool,
    published: Arc<Mutex<Vec<(String, String)>>>,
}

impl MockEventPublisher {
    pub(super) fn build(fail: bool) -> (Arc<Box<dyn AbstractEventPublisher>>, Arc<Mutex<Vec<(String, String)>>>) {
        let published = Arc::new(Mutex::new(Vec::new()));
        let obj = Self {
            fail,
            published: published.clone(),
        };
        let obj: Box<dyn AbstractEventPublisher> = Box::new(obj);
        (Arc::new(obj), published)
    }
}

#[async_trait]
impl AbstractEventPublisher for MockEventPublisher {
    fn label(&self) -> &'static str {
        "utest-mock"
    }

    async fn publish(&self, msg: AppEventMessage) -> DefaultResult<(), AppError> {
        if self.fail {
            return Err(AppError {
                code: AppErrorCode::RpcRemoteUnavail,
                detail: Some("utest-broker-down".to_string()),
            });
        }
        let body = String::from_utf8(msg.msgbody).unwrap();
        self.published.lock().unwrap().push((msg.route, body));
        Ok(())
    }
}
