use std::collections::HashMap;
use std::io::ErrorKind;

use axum::body::Body as AxumBody;
use axum::extract::{Json as ExtractJson, State as ExtractState};
use axum::http::{
    header as HttpHeader, HeaderMap as HttpHeaderMap, HeaderValue as HttpHeaderValue,
    StatusCode as HttpStatusCode,
};
use axum::response::IntoResponse;
use axum::routing;
use http_body::Limited;
use hyper::Request;
use serde::{Deserialize, Serialize};
use tower::{Layer, Service};

use erp_common::logging::{app_log_event, AppLogLevel};

use inventory::api::web::ApiRouteTableType;
use inventory::error::AppErrorCode;
use inventory::network::{app_web_service, middleware, net_server_listener};
use inventory::AppSharedState;

use crate::{ut_example_path, ut_setup_share_state, MockConfidential};

#[derive(Deserialize, Serialize)]
struct UTendpointData {
    gram: u8,
}

async fn ut_endpoint_handler(
    ExtractState(appstate): ExtractState<AppSharedState>,
    ExtractJson(mut req_body): ExtractJson<UTendpointData>,
) -> impl IntoResponse {
    let logctx = appstate.log_context().clone();
    app_log_event!(logctx, AppLogLevel::INFO, "ut_endpoint_handler reached");
    req_body.gram += 1;
    let resp_ctype_val = HttpHeaderValue::from_static("application/json");
    let mut hdr_map = HttpHeaderMap::new();
    hdr_map.insert(HttpHeader::CONTENT_TYPE, resp_ctype_val);
    let serial_resp_body = serde_json::to_string(&req_body).unwrap();
    (HttpStatusCode::OK, hdr_map, serial_resp_body)
}

fn ut_service_req_setup(method: &str, uri: &str) -> Request<AxumBody> {
    let body = {
        let d = UTendpointData { gram: 76 };
        let d = serde_json::to_string(&d).unwrap();
        AxumBody::from(d)
    };
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(body)
        .unwrap()
}

#[tokio::test]
async fn app_web_service_ok() {
    let shr_state = ut_setup_share_state("config_ok.json", Box::new(MockConfidential {}));
    let cfg = shr_state.config().clone();
    let rtable: ApiRouteTableType<AxumBody> =
        HashMap::from([("gram_increment", routing::post(ut_endpoint_handler))]);
    let (mut service, num_routes) = app_web_service(&cfg.api_server.listen, rtable, shr_state);
    assert_eq!(num_routes, 1);
    let req = ut_service_req_setup("POST", "/1.0.7/gram/increment");
    let result = service.call(req).await;
    assert!(result.is_ok());
    let r = result.unwrap();
    assert_eq!(r.status(), HttpStatusCode::OK);
    let rawdata = hyper::body::to_bytes(r.into_body()).await.unwrap();
    let data = serde_json::from_slice::<UTendpointData>(rawdata.as_ref()).unwrap();
    assert_eq!(data.gram, 77);
    // api version prefix is required
    let req = ut_service_req_setup("POST", "/gram/increment");
    let r = service.call(req).await.unwrap();
    assert_eq!(r.status(), HttpStatusCode::NOT_FOUND);
} // end of fn app_web_service_ok

#[tokio::test]
async fn app_web_service_no_route_applied() {
    let shr_state = ut_setup_share_state("config_ok.json", Box::new(MockConfidential {}));
    let cfg = shr_state.config().clone();
    let rtable: ApiRouteTableType<AxumBody> =
        HashMap::from([("nonexist_handler", routing::post(ut_endpoint_handler))]);
    let (_service, num_routes) = app_web_service(&cfg.api_server.listen, rtable, shr_state);
    assert_eq!(num_routes, 0);
}

#[tokio::test]
async fn req_body_limit_exceeded() {
    let shr_state = ut_setup_share_state("config_ok.json", Box::new(MockConfidential {}));
    let cfg = shr_state.config().clone();
    let rtable: ApiRouteTableType<Limited<AxumBody>> =
        HashMap::from([("gram_increment", routing::post(ut_endpoint_handler))]);
    let (service, _num_routes) = app_web_service(&cfg.api_server.listen, rtable, shr_state);
    // serialized request body takes 11 bytes
    let mut service = middleware::req_body_limit(8).layer(service);
    let req = ut_service_req_setup("POST", "/1.0.7/gram/increment");
    let r = service.call(req).await.unwrap();
    assert_eq!(r.status(), HttpStatusCode::PAYLOAD_TOO_LARGE);
    let mut service = {
        let shr_state = ut_setup_share_state("config_ok.json", Box::new(MockConfidential {}));
        let rtable: ApiRouteTableType<Limited<AxumBody>> =
            HashMap::from([("gram_increment", routing::post(ut_endpoint_handler))]);
        let (service, _) = app_web_service(&cfg.api_server.listen, rtable, shr_state);
        middleware::req_body_limit(64).layer(service)
    };
    let req = ut_service_req_setup("POST", "/1.0.7/gram/increment");
    let r = service.call(req).await.unwrap();
    assert_eq!(r.status(), HttpStatusCode::OK);
} // end of fn req_body_limit_exceeded

#[test]
fn cors_setup_ok() {
    let path = ut_example_path() + "cors_ok.json";
    let result = middleware::cors(path);
    assert!(result.is_ok());
}

#[test]
fn cors_setup_error() {
    let path = ut_example_path() + "cors_missing_header.json";
    let error = middleware::cors(path).err().unwrap();
    assert_eq!(error.code, AppErrorCode::InvalidInput);
    assert_eq!(error.detail.as_deref(), Some("invalid-allowed-header"));
    let path = ut_example_path() + "nonexist-cors.json";
    let error = middleware::cors(path).err().unwrap();
    assert_eq!(error.code, AppErrorCode::IOerror(ErrorKind::NotFound));
}

#[tokio::test]
async fn server_listener_ok() {
    let result = net_server_listener("localhost".to_string(), 0);
    assert!(result.is_ok());
}

#[tokio::test]
async fn server_listener_unknown_host() {
    let result = net_server_listener("nonexist.host.invalid".to_string(), 8015);
    let error = result.err().unwrap();
    assert_eq!(error.code, AppErrorCode::IOerror(ErrorKind::AddrNotAvailable));
    assert!(error.detail.unwrap().contains("nonexist.host.invalid"));
}
