use std::boxed::Box;
use std::result::Result as DefaultResult;
use std::sync::Arc;

use async_trait::async_trait;

use erp_common::logging::{app_log_event, AppLogContext, AppLogLevel};

use super::{AbstractEventPublisher, AppEventMessage};
use crate::error::AppError;

pub(super) struct DummyEventPublisher {
    logctx: Arc<AppLogContext>,
}

impl DummyEventPublisher {
    pub(crate) fn build(logctx: Arc<AppLogContext>) -> Box<dyn AbstractEventPublisher> {
        Box::new(Self { logctx })
    }
}

#[async_trait]
impl AbstractEventPublisher for DummyEventPublisher {
    fn label(&self) -> &'static str {
        "dummy"
    }

    async fn publish(&self, msg: AppEventMessage) -> DefaultResult<(), AppError> {
        let logctx = &self.logctx;
        let body = String::from_utf8_lossy(msg.msgbody.as_slice());
        app_log_event!(logctx, AppLogLevel::DEBUG, "route:{}, body:{}", msg.route, body);
        Ok(())
    }
}
