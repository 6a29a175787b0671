use std::collections::HashMap;

use axum::body::Bytes;
use axum::extract::DefaultBodyLimit;
use axum::routing::{delete, get, post, put, MethodRouter};
use http_body::Body as HttpBody;

use crate::constant::api::web as WebConst;
use crate::constant::hard_limit;
use crate::{AppSharedState, WebApiHdlrLabel};

pub mod dto;
mod stock_balance_import;

// type parameter `B` for http body of the method router has to match the same
// type parameter in `axum::Router`
pub type ApiRouteType<HB> = MethodRouter<AppSharedState, HB>;
pub type ApiRouteTableType<HB> = HashMap<WebApiHdlrLabel, ApiRouteType<HB>>;

pub fn route_table<HB>() -> ApiRouteTableType<HB>
where
    HB: HttpBody + Send + 'static,
    <HB as HttpBody>::Data: Send + Into<Bytes>,
    <HB as HttpBody>::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let mut out: ApiRouteTableType<HB> = HashMap::new();
    out.insert(
        WebConst::IMPORT_UPLOAD,
        post(stock_balance_import::upload)
            .layer(DefaultBodyLimit::max(hard_limit::MAX_BYTES_UPLOAD_FILE)),
    );
    out.insert(
        WebConst::IMPORT_CREATE_ROW,
        post(stock_balance_import::create_row),
    );
    out.insert(
        WebConst::IMPORT_LIST_ROWS,
        get(stock_balance_import::list_rows),
    );
    out.insert(
        WebConst::IMPORT_TASK_COMMIT,
        post(stock_balance_import::commit_task),
    );
    out.insert(
        WebConst::IMPORT_TASK_DELETE,
        delete(stock_balance_import::delete_task),
    );
    out.insert(
        WebConst::IMPORT_UPDATE_ROW,
        put(stock_balance_import::update_row),
    );
    out.insert(
        WebConst::IMPORT_DELETE_ROW,
        delete(stock_balance_import::delete_row),
    );
    out.insert(
        WebConst::IMPORT_TASK_META,
        get(stock_balance_import::task_meta),
    );
    out.insert(
        WebConst::IMPORT_TASK_VERIFY,
        post(stock_balance_import::verify_task),
    );
    out
}
