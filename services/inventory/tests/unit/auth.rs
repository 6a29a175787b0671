use chrono::{Duration, Local};
use jsonwebtoken::jwk::JwkSet;
use jsonwebtoken::{encode as jwt_encode, Algorithm, EncodingKey, Header};

use erp_common::config::AppAuthCfg;

use inventory::constant::app_meta;
use inventory::error::AppErrorCode;
use inventory::{AbstractAuthKeystore, AppAuthKeystore, AppAuthedClaim};

use crate::{ut_example_path, UT_SHOP_ID, UT_USERNAME};

pub(crate) const UT_JWK_KEY_ID: &str = "utest-hs256-key-01";
// raw secret of the octet key in `examples/jwks.json`
const UT_JWK_SECRET: &[u8] = b"inventory-unit-test-secret-hs256-key-01";

pub(crate) fn ut_claim(shop_id: &str, aud: Vec<String>, exp_offset_secs: i64) -> AppAuthedClaim {
    let now = Local::now().fixed_offset().timestamp();
    AppAuthedClaim {
        shop_id: shop_id.to_string(),
        username: UT_USERNAME.to_string(),
        iat: now - 5,
        exp: now + exp_offset_secs,
        aud,
    }
}

pub(crate) fn ut_encode_token(kid: Option<&str>, claim: &AppAuthedClaim) -> String {
    let mut header = Header::new(Algorithm::HS256);
    header.kid = kid.map(String::from);
    let key = EncodingKey::from_secret(UT_JWK_SECRET);
    jwt_encode(&header, claim, &key).unwrap()
}

pub(crate) fn ut_valid_token(shop_id: &str) -> String {
    let claim = ut_claim(shop_id, vec![app_meta::LABEL.to_string()], 120);
    ut_encode_token(Some(UT_JWK_KEY_ID), &claim)
}

fn ut_keystore(fname: &str) -> AppAuthKeystore {
    let cfg = AppAuthCfg {
        keystore_path: fname.to_string(),
    };
    AppAuthKeystore::new(&cfg, ut_example_path().as_str())
}

#[test]
fn keyset_merge_ok() {
    let rawdata_old_keys = br#"
        {"keys": [
            {"kid": "1b7a039bf4", "alg": "HS256", "kty": "oct", "use": "sig", "k": "c2VjcmV0LTE"},
            {"kid": "00db7af03e", "alg": "HS256", "kty": "oct", "use": "sig", "k": "c2VjcmV0LTI"}
        ]}
    "#;
    let rawdata_new_keys = br#"
        {"keys": [
            {"kid": "b110fb3480", "alg": "HS256", "kty": "oct", "use": "sig", "k": "c2VjcmV0LTM"},
            {"kid": "00db7af03e", "alg": "HS256", "kty": "oct", "use": "sig", "k": "c2VjcmV0LTI"},
            {"kid": "95667b348d", "alg": "HS256", "kty": "oct", "use": "sig", "k": "c2VjcmV0LTQ"}
        ]}
    "#;
    let mut target = serde_json::from_slice::<JwkSet>(rawdata_old_keys).unwrap();
    let new = serde_json::from_slice::<JwkSet>(rawdata_new_keys).unwrap();
    let (num_discarded, num_added) = AppAuthKeystore::merge(&mut target, new);
    assert_eq!(num_discarded, 1);
    assert_eq!(num_added, 2);
    assert_eq!(target.keys.len(), 3);
    assert!(target.find("95667b348d").is_some());
    assert!(target.find("00db7af03e").is_some());
    assert!(target.find("b110fb3480").is_some());
    assert!(target.find("1b7a039bf4").is_none());
} // end of fn keyset_merge_ok

#[tokio::test]
async fn keystore_refresh_from_file() {
    let ks = ut_keystore("jwks.json");
    let result = ks.refresh().await.unwrap();
    assert_eq!(result.num_added, 1);
    assert_eq!(result.num_discarded, 0);
    let result = ks.refresh().await.unwrap();
    assert_eq!(result.num_added, 0);
    let jwk = ks.find(UT_JWK_KEY_ID).await.unwrap();
    assert_eq!(jwk.common.key_id.as_deref(), Some(UT_JWK_KEY_ID));
    let error = ks.find("nonexist-key").await.err().unwrap();
    assert_eq!(error.code, AppErrorCode::InvalidInput);
}

#[tokio::test]
async fn keystore_file_missing() {
    let ks = ut_keystore("nonexist-jwks.json");
    let error = ks.refresh().await.err().unwrap();
    assert!(matches!(error.code, AppErrorCode::IOerror(_)));
}

#[tokio::test]
async fn decode_token_ok() {
    // key is loaded lazily on the first lookup
    let ks = ut_keystore("jwks.json");
    let aud = vec!["another-service".to_string(), app_meta::LABEL.to_string()];
    let claim = ut_claim(UT_SHOP_ID, aud, 65);
    let encoded = ut_encode_token(Some(UT_JWK_KEY_ID), &claim);
    let decoded = AppAuthedClaim::try_decode(&ks, encoded.as_str()).await.unwrap();
    assert_eq!(decoded.shop_id.as_str(), UT_SHOP_ID);
    assert_eq!(decoded.username.as_str(), UT_USERNAME);
    assert_eq!(decoded.exp, claim.exp);
    assert!(decoded.aud.contains(&app_meta::LABEL.to_string()));
}

#[tokio::test]
async fn decode_token_wrong_audience() {
    let ks = ut_keystore("jwks.json");
    let claim = ut_claim(UT_SHOP_ID, vec!["another-service".to_string()], 65);
    let encoded = ut_encode_token(Some(UT_JWK_KEY_ID), &claim);
    let error = AppAuthedClaim::try_decode(&ks, encoded.as_str())
        .await
        .err()
        .unwrap();
    assert_eq!(error.code, AppErrorCode::InvalidInput);
    assert!(error.detail.unwrap().starts_with("jwt:"));
}

#[tokio::test]
async fn decode_token_expired() {
    let ks = ut_keystore("jwks.json");
    let aud = vec![app_meta::LABEL.to_string()];
    let mut claim = ut_claim(UT_SHOP_ID, aud, 0);
    claim.iat -= Duration::minutes(10).num_seconds();
    claim.exp -= Duration::minutes(5).num_seconds();
    let encoded = ut_encode_token(Some(UT_JWK_KEY_ID), &claim);
    let error = AppAuthedClaim::try_decode(&ks, encoded.as_str())
        .await
        .err()
        .unwrap();
    assert_eq!(error.code, AppErrorCode::InvalidInput);
    assert!(error.detail.unwrap().contains("ExpiredSignature"));
}

#[tokio::test]
async fn decode_token_key_id_error() {
    let ks = ut_keystore("jwks.json");
    let claim = ut_claim(UT_SHOP_ID, vec![app_meta::LABEL.to_string()], 65);
    let encoded = ut_encode_token(None, &claim);
    let error = AppAuthedClaim::try_decode(&ks, encoded.as_str())
        .await
        .err()
        .unwrap();
    assert_eq!(error.detail.as_deref(), Some("jwt-missing-kid"));
    let encoded = ut_encode_token(Some("unknown-key"), &claim);
    let error = AppAuthedClaim::try_decode(&ks, encoded.as_str())
        .await
        .err()
        .unwrap();
    assert_eq!(error.detail.as_deref(), Some("unknown-key-id:unknown-key"));
    let error = AppAuthedClaim::try_decode(&ks, "invalid.encoded.token")
        .await
        .err()
        .unwrap();
    assert_eq!(error.code, AppErrorCode::InvalidInput);
}
