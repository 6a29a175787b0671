use std::collections::HashSet;
use std::result::Result as DefaultResult;

use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::headers::authorization::Bearer;
use axum::headers::Authorization;
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::TypedHeader;
use jsonwebtoken::jwk::{Jwk, JwkSet};
use jsonwebtoken::{decode as jwt_decode, decode_header, DecodingKey, Validation as JwtValidation};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use erp_common::config::AppAuthCfg;
use erp_common::logging::{app_log_event, AppLogLevel};

use crate::constant::app_meta;
use crate::error::{AppError, AppErrorCode};
use crate::AppSharedState;

#[async_trait]
pub trait AbstractAuthKeystore: Sync + Send {
    async fn refresh(&self) -> DefaultResult<AppKeystoreRefreshResult, AppError>;

    async fn find(&self, kid: &str) -> DefaultResult<Jwk, AppError>;
}

pub struct AppKeystoreRefreshResult {
    pub num_discarded: usize,
    pub num_added: usize,
}

/// JWK set loaded from local file, the file is reloaded when a key ID
/// cannot be found in the current set
pub struct AppAuthKeystore {
    path: String,
    keyset: RwLock<JwkSet>,
}

/// identity of the client, it determines the shop which all staging rows
/// and stock-balance documents of the request belong to
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppAuthedClaim {
    pub shop_id: String,
    pub username: String,
    pub iat: i64,
    pub exp: i64,
    pub aud: Vec<String>,
}

impl AppAuthKeystore {
    pub fn new(cfg: &AppAuthCfg, sys_basepath: &str) -> Self {
        let mut path = sys_basepath.to_string();
        if !path.ends_with('/') && !cfg.keystore_path.starts_with('/') {
            path.push('/');
        }
        path += cfg.keystore_path.as_str();
        Self {
            path,
            keyset: RwLock::new(JwkSet { keys: vec![] }),
        }
    }

    pub fn merge(target: &mut JwkSet, new: JwkSet) -> (usize, usize) {
        // in this application, key ID must be present
        let get_kid = |item: &Jwk| item.common.key_id.clone();
        let kidset1 = target.keys.iter().filter_map(get_kid).collect::<HashSet<_>>();
        let kidset2 = new.keys.iter().filter_map(get_kid).collect::<HashSet<_>>();
        let added = kidset2.difference(&kidset1).cloned().collect::<HashSet<_>>();
        let num_discarded = kidset1.difference(&kidset2).count();
        target.keys.retain(|item| match item.common.key_id.as_ref() {
            Some(id) => kidset2.contains(id),
            None => false,
        });
        let new_iter = new.keys.into_iter().filter(|item| match item.common.key_id.as_ref() {
            Some(id) => added.contains(id),
            None => false,
        });
        target.keys.extend(new_iter);
        (num_discarded, added.len())
    } // end of fn merge

    async fn load_file(&self) -> DefaultResult<JwkSet, AppError> {
        let raw = tokio::fs::read(self.path.as_str()).await.map_err(|e| AppError {
            code: AppErrorCode::IOerror(e.kind()),
            detail: Some(format!("keystore:{}, {e}", self.path)),
        })?;
        serde_json::from_slice::<JwkSet>(raw.as_slice()).map_err(|e| AppError {
            code: AppErrorCode::InvalidJsonFormat,
            detail: Some(format!("keystore-parse: {e}")),
        })
    }
} // end of impl AppAuthKeystore

#[async_trait]
impl AbstractAuthKeystore for AppAuthKeystore {
    async fn refresh(&self) -> DefaultResult<AppKeystoreRefreshResult, AppError> {
        let newkeys = self.load_file().await?;
        let mut guard = self.keyset.write().await;
        let (num_discarded, num_added) = Self::merge(&mut guard, newkeys);
        Ok(AppKeystoreRefreshResult {
            num_discarded,
            num_added,
        })
    }

    async fn find(&self, kid: &str) -> DefaultResult<Jwk, AppError> {
        if let Some(k) = self.keyset.read().await.find(kid) {
            return Ok(k.clone());
        }
        let _ = self.refresh().await?;
        let guard = self.keyset.read().await;
        guard.find(kid).cloned().ok_or(AppError {
            code: AppErrorCode::InvalidInput,
            detail: Some(format!("unknown-key-id:{kid}")),
        })
    }
} // end of impl AppAuthKeystore

impl AppAuthedClaim {
    pub async fn try_decode(
        keystore: &dyn AbstractAuthKeystore,
        encoded: &str,
    ) -> DefaultResult<Self, AppError> {
        let map_jwt_err = |e: jsonwebtoken::errors::Error| AppError {
            code: AppErrorCode::InvalidInput,
            detail: Some(format!("jwt: {e}")),
        };
        let hdr = decode_header(encoded).map_err(map_jwt_err)?;
        let key_id = hdr.kid.as_deref().ok_or(AppError {
            code: AppErrorCode::InvalidInput,
            detail: Some("jwt-missing-kid".to_string()),
        })?;
        let jwk = keystore.find(key_id).await?;
        let key = DecodingKey::from_jwk(&jwk).map_err(map_jwt_err)?;
        let validator = {
            let mut v = JwtValidation::new(hdr.alg);
            v.set_audience(&[app_meta::LABEL]);
            v.set_required_spec_claims(&["aud", "exp", "iat"]);
            v
        };
        let decoded = jwt_decode::<Self>(encoded, &key, &validator).map_err(map_jwt_err)?;
        Ok(decoded.claims)
    }
} // end of impl AppAuthedClaim

#[async_trait]
impl FromRequestParts<AppSharedState> for AppAuthedClaim {
    type Rejection = StatusCode;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppSharedState,
    ) -> DefaultResult<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_e| StatusCode::UNAUTHORIZED)?;
        let keystore = state.auth_keystore();
        match Self::try_decode(&**keystore, bearer.token()).await {
            Ok(claim) => Ok(claim),
            Err(e) => {
                let logctx = state.log_context();
                app_log_event!(logctx, AppLogLevel::WARNING, "auth-failure: {}", e);
                Err(StatusCode::UNAUTHORIZED)
            }
        }
    }
} // end of impl AppAuthedClaim
