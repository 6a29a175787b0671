mod amqp;
mod dummy;

use std::boxed::Box;
use std::marker::{Send, Sync};
use std::result::Result as DefaultResult;
use std::sync::Arc;
use std::vec::Vec;

use async_trait::async_trait;

use erp_common::confidentiality::AbstractConfidentiality;
use erp_common::config::AppRpcCfg;
use erp_common::logging::AppLogContext;

use crate::error::AppError;
use crate::rpc::amqp::AmqpEventPublisher;
use crate::rpc::dummy::DummyEventPublisher;

pub(crate) fn build_context(
    cfg: &AppRpcCfg,
    logctx: Arc<AppLogContext>,
    confidential: Arc<Box<dyn AbstractConfidentiality>>,
) -> DefaultResult<Box<dyn AbstractEventPublisher>, AppError> {
    match cfg {
        AppRpcCfg::dummy => Ok(DummyEventPublisher::build(logctx)),
        AppRpcCfg::AMQP(detail_cfg) => AmqpEventPublisher::build(detail_cfg, logctx, confidential),
    }
}

/// one-way delivery of domain events to message broker, the caller does
/// not wait for any reply
#[async_trait]
pub trait AbstractEventPublisher: Send + Sync {
    fn label(&self) -> &'static str;

    async fn publish(&self, msg: AppEventMessage) -> DefaultResult<(), AppError>;
}

pub struct AppEventMessage {
    pub route: String,
    pub msgbody: Vec<u8>,
}
