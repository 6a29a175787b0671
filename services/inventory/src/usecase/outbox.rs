use std::boxed::Box;
use std::result::Result as DefaultResult;
use std::sync::Arc;

use erp_common::logging::{app_log_event, AppLogContext, AppLogLevel};

use crate::error::AppError;
use crate::model::OutboxEventModel;
use crate::repository::AbsOutboxRepo;
use crate::rpc::{AbstractEventPublisher, AppEventMessage};

/// drain undelivered events recorded together with stock-balance documents,
/// each event is delivered at least once
pub struct OutboxDispatchUseCase {
    pub repo: Box<dyn AbsOutboxRepo>,
    pub publisher: Arc<Box<dyn AbstractEventPublisher>>,
    pub logctx: Arc<AppLogContext>,
}

#[derive(Debug, Default, PartialEq)]
pub struct OutboxDispatchOutput {
    pub num_delivered: usize,
    pub num_failed: usize,
}

impl OutboxDispatchUseCase {
    pub async fn execute(&self, limit: usize) -> DefaultResult<OutboxDispatchOutput, AppError> {
        let events = self.repo.fetch_pending(limit).await?;
        if events.is_empty() {
            Ok(OutboxDispatchOutput::default())
        } else {
            self.deliver(events).await
        }
    }

    pub async fn deliver(
        &self,
        events: Vec<OutboxEventModel>,
    ) -> DefaultResult<OutboxDispatchOutput, AppError> {
        let logctx = &self.logctx;
        let (mut delivered, mut failed) = (Vec::new(), Vec::new());
        for evt in events {
            let msg = AppEventMessage {
                route: evt.route.clone(),
                msgbody: evt.payload.into_bytes(),
            };
            match self.publisher.publish(msg).await {
                Ok(()) => delivered.push(evt.id),
                Err(e) => {
                    app_log_event!(
                        logctx,
                        AppLogLevel::ERROR,
                        "publisher:{}, event:{}, attempts:{}, error:{}",
                        self.publisher.label(),
                        evt.id,
                        evt.num_attempts,
                        e
                    );
                    failed.push(evt.id);
                }
            }
        }
        let out = OutboxDispatchOutput {
            num_delivered: delivered.len(),
            num_failed: failed.len(),
        };
        let _num = self.repo.mark_delivered(delivered).await?;
        let _num = self.repo.record_failure(failed).await?;
        if out.num_delivered > 0 {
            app_log_event!(logctx, AppLogLevel::INFO, "{:?}", out);
        }
        Ok(out)
    } // end of fn deliver
} // end of impl OutboxDispatchUseCase
