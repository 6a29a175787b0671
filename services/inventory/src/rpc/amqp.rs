use std::boxed::Box;
use std::result::Result as DefaultResult;
use std::sync::Arc;

use async_trait::async_trait;

use erp_common::confidentiality::AbstractConfidentiality;
use erp_common::config::AppRpcAmqpCfg;
use erp_common::logging::AppLogContext;

#[cfg(feature = "amqprs")]
use std::time::Duration;

#[cfg(feature = "amqprs")]
use amqprs::channel::BasicPublishArguments;
#[cfg(feature = "amqprs")]
use amqprs::connection::{Connection, OpenConnectionArguments};
#[cfg(feature = "amqprs")]
use amqprs::BasicProperties;
#[cfg(feature = "amqprs")]
use serde::Deserialize;
#[cfg(feature = "amqprs")]
use tokio::time::timeout;

#[cfg(feature = "amqprs")]
use erp_common::logging::{app_log_event, AppLogLevel};

use super::{AbstractEventPublisher, AppEventMessage};
#[cfg(feature = "amqprs")]
use crate::constant::{app_meta, HTTP_CONTENT_TYPE_JSON};
use crate::error::{AppError, AppErrorCode};

#[cfg(feature = "amqprs")]
#[derive(Deserialize)]
struct BrokerSecret {
    host: String,
    port: u16,
    username: String,
    password: String,
}

pub(super) struct AmqpEventPublisher {
    _cfg: AppRpcAmqpCfg,
    _logctx: Arc<AppLogContext>,
    _confidential: Arc<Box<dyn AbstractConfidentiality>>,
}

impl AmqpEventPublisher {
    #[cfg(feature = "amqprs")]
    pub(crate) fn build(
        cfg: &AppRpcAmqpCfg,
        logctx: Arc<AppLogContext>,
        confidential: Arc<Box<dyn AbstractConfidentiality>>,
    ) -> DefaultResult<Box<dyn AbstractEventPublisher>, AppError> {
        // fail early if credential of the broker is absent
        let _secret = Self::load_secret(cfg, &confidential)?;
        let obj = Self {
            _cfg: cfg.clone(),
            _logctx: logctx,
            _confidential: confidential,
        };
        Ok(Box::new(obj))
    }

    #[cfg(not(feature = "amqprs"))]
    pub(crate) fn build(
        _cfg: &AppRpcAmqpCfg,
        _logctx: Arc<AppLogContext>,
        _confidential: Arc<Box<dyn AbstractConfidentiality>>,
    ) -> DefaultResult<Box<dyn AbstractEventPublisher>, AppError> {
        Err(AppError {
            code: AppErrorCode::FeatureDisabled,
            detail: Some("amqprs".to_string()),
        })
    }

    #[cfg(feature = "amqprs")]
    fn load_secret(
        cfg: &AppRpcAmqpCfg,
        confidential: &Arc<Box<dyn AbstractConfidentiality>>,
    ) -> DefaultResult<BrokerSecret, AppError> {
        let serial = confidential.try_get_payload(cfg.confidential_id.as_str())?;
        serde_json::from_str::<BrokerSecret>(serial.as_str()).map_err(|e| AppError {
            code: AppErrorCode::InvalidJsonFormat,
            detail: Some(format!("amqp-secret-parse: {e}")),
        })
    }

    #[cfg(feature = "amqprs")]
    async fn _publish(&self, msg: AppEventMessage) -> DefaultResult<(), AppError> {
        let secret = Self::load_secret(&self._cfg, &self._confidential)?;
        let mut conn_args = OpenConnectionArguments::new(
            secret.host.as_str(),
            secret.port,
            secret.username.as_str(),
            secret.password.as_str(),
        );
        conn_args.virtual_host(self._cfg.attributes.vhost.as_str());
        let conn = Connection::open(&conn_args).await.map_err(Self::map_err_remote)?;
        let chn = conn.open_channel(None).await.map_err(Self::map_err_remote)?;
        let publish_cfg = &self._cfg.publish;
        let delivery_mode = if publish_cfg.durable { 2 } else { 1 };
        let props = BasicProperties::default()
            .with_app_id(app_meta::LABEL)
            .with_content_type(HTTP_CONTENT_TYPE_JSON)
            .with_content_encoding("utf-8")
            .with_message_type(msg.route.as_str())
            .with_delivery_mode(delivery_mode)
            .finish();
        let args = BasicPublishArguments::new(
            publish_cfg.exchange.as_str(),
            publish_cfg.routing_key.as_str(),
        );
        let result = chn
            .basic_publish(props, msg.msgbody, args)
            .await
            .map_err(|e| AppError {
                code: AppErrorCode::RpcPublishFailure,
                detail: Some(e.to_string()),
            });
        // close quietly, the message has been handed over to the broker
        let _ = chn.close().await;
        let _ = conn.close().await;
        result
    } // end of fn _publish

    #[cfg(feature = "amqprs")]
    fn map_err_remote(e: amqprs::error::Error) -> AppError {
        AppError {
            code: AppErrorCode::RpcRemoteUnavail,
            detail: Some(e.to_string()),
        }
    }
} // end of impl AmqpEventPublisher

#[async_trait]
impl AbstractEventPublisher for AmqpEventPublisher {
    fn label(&self) -> &'static str {
        "AMQP"
    }

    #[cfg(feature = "amqprs")]
    async fn publish(&self, msg: AppEventMessage) -> DefaultResult<(), AppError> {
        let logctx = &self._logctx;
        let route = msg.route.clone();
        let max_time = Duration::from_secs(self._cfg.attributes.timeout_secs as u64);
        let result = timeout(max_time, self._publish(msg))
            .await
            .unwrap_or_else(|_elapsed| {
                Err(AppError {
                    code: AppErrorCode::RpcRemoteUnavail,
                    detail: Some("amqp-publish-timeout".to_string()),
                })
            });
        if let Err(e) = result.as_ref() {
            app_log_event!(logctx, AppLogLevel::ERROR, "route:{route}, error:{:?}", e);
        }
        result
    }

    #[cfg(not(feature = "amqprs"))]
    async fn publish(&self, _msg: AppEventMessage) -> DefaultResult<(), AppError> {
        Err(AppError {
            code: AppErrorCode::FeatureDisabled,
            detail: Some("amqprs".to_string()),
        })
    }
}
