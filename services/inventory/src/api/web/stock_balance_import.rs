use std::result::Result as DefaultResult;

use axum::debug_handler;
use axum::extract::{
    Json as ExtractJson, Multipart, Path as ExtractPath, Query as ExtractQuery,
    State as ExtractState,
};
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::IntoResponse;
use serde::Serialize;

use erp_common::logging::{app_log_event, AppLogLevel};

use super::dto::{
    ErrorRespDto, ImportUploadRespDto, StagingRowCreateReqDto, StagingRowEditReqDto,
    StagingRowListQueryDto, StagingRowListRespDto, StockBalanceHeaderReqDto, SuccessRespDto,
    TaskCommitRespDto, TaskMetaRespDto,
};
use crate::constant::HTTP_CONTENT_TYPE_JSON;
use crate::error::{AppError, AppErrorCode};
use crate::model::StagingRowFilterModel;
use crate::repository::{
    app_repo_outbox, app_repo_product_barcode, app_repo_stock_balance, app_repo_staging,
};
use crate::usecase::{
    CommitTaskUseCase, ImportStagingFileUseCase, ManageStagingUseCase, OutboxDispatchUseCase,
    VerifyTaskUseCase,
};
use crate::{AppAuthedClaim, AppSharedState};

type WebResponse = (StatusCode, HeaderMap, String);

fn json_header() -> HeaderMap {
    let mut hdr_map = HeaderMap::new();
    hdr_map.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(HTTP_CONTENT_TYPE_JSON),
    );
    hdr_map
}

fn ok_response<T: Serialize>(status: StatusCode, body: &T) -> WebResponse {
    let serial = serde_json::to_string(body).unwrap_or_else(|_e| "{}".to_string());
    (status, json_header(), serial)
}

fn error_response(appstate: &AppSharedState, e: AppError) -> WebResponse {
    let (status, message) = if e.is_client_fault() {
        let msg = e.detail.clone().unwrap_or_else(|| format!("{:?}", e.code));
        (StatusCode::BAD_REQUEST, msg)
    } else if matches!(e.code, AppErrorCode::TaskBusy) {
        let msg = e.detail.clone().unwrap_or_default();
        (StatusCode::CONFLICT, msg)
    } else {
        let logctx = appstate.log_context();
        app_log_event!(logctx, AppLogLevel::ERROR, "{}", e);
        (StatusCode::INTERNAL_SERVER_ERROR, "internal-error".to_string())
    };
    let body = ErrorRespDto {
        success: false,
        message,
    };
    ok_response(status, &body)
}

fn respond<T: Serialize>(appstate: &AppSharedState, result: DefaultResult<T, AppError>) -> WebResponse {
    match result {
        Ok(body) => ok_response(StatusCode::OK, &body),
        Err(e) => error_response(appstate, e),
    }
}

async fn manage_staging_uc(appstate: &AppSharedState) -> DefaultResult<ManageStagingUseCase, AppError> {
    let repo = app_repo_staging(appstate.datastore()).await?;
    Ok(ManageStagingUseCase {
        repo,
        logctx: appstate.log_context().clone(),
    })
}

async fn verify_task_uc(appstate: &AppSharedState) -> DefaultResult<VerifyTaskUseCase, AppError> {
    let ds = appstate.datastore();
    Ok(VerifyTaskUseCase {
        staging: app_repo_staging(ds.clone()).await?,
        product: app_repo_product_barcode(ds).await?,
        logctx: appstate.log_context().clone(),
        chunk_size: appstate.config().api_server.stock_import.chunk_size,
    })
}

async fn commit_task_uc(appstate: &AppSharedState) -> DefaultResult<CommitTaskUseCase, AppError> {
    let ds = appstate.datastore();
    let logctx = appstate.log_context().clone();
    let dispatcher = OutboxDispatchUseCase {
        repo: app_repo_outbox(ds.clone()).await?,
        publisher: appstate.publisher(),
        logctx: logctx.clone(),
    };
    Ok(CommitTaskUseCase {
        staging: app_repo_staging(ds.clone()).await?,
        product: app_repo_product_barcode(ds.clone()).await?,
        stock_balance: app_repo_stock_balance(ds).await?,
        dispatcher,
        task_locks: appstate.task_locks(),
        logctx,
        chunk_size: appstate.config().api_server.stock_import.chunk_size,
    })
}

async fn read_upload_file(mut multipart: Multipart) -> DefaultResult<(String, Vec<u8>), AppError> {
    let map_err = |e: axum::extract::multipart::MultipartError| AppError {
        code: AppErrorCode::InvalidInput,
        detail: Some(format!("multipart: {e}")),
    };
    while let Some(field) = multipart.next_field().await.map_err(map_err)? {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_string();
        let raw = field.bytes().await.map_err(map_err)?;
        return Ok((filename, raw.to_vec()));
    }
    Err(AppError {
        code: AppErrorCode::InvalidInput,
        detail: Some("file-field-missing".to_string()),
    })
}

#[debug_handler(state=AppSharedState)]
pub(super) async fn upload(
    authed_usr: AppAuthedClaim,
    ExtractState(appstate): ExtractState<AppSharedState>,
    multipart: Multipart,
) -> impl IntoResponse {
    let result = async {
        let (filename, raw) = read_upload_file(multipart).await?;
        let uc = ImportStagingFileUseCase {
            repo: app_repo_staging(appstate.datastore()).await?,
            logctx: appstate.log_context().clone(),
            task_id_length: appstate.config().api_server.stock_import.task_id_length,
        };
        uc.execute(
            authed_usr.shop_id.as_str(),
            authed_usr.username.as_str(),
            filename.as_str(),
            raw,
        )
        .await
    }
    .await
    .map(|id| ImportUploadRespDto { success: true, id });
    respond(&appstate, result)
} // end of fn upload

#[debug_handler(state=AppSharedState)]
pub(super) async fn create_row(
    authed_usr: AppAuthedClaim,
    ExtractState(appstate): ExtractState<AppSharedState>,
    ExtractJson(req_body): ExtractJson<StagingRowCreateReqDto>,
) -> impl IntoResponse {
    let result = async {
        let uc = manage_staging_uc(&appstate).await?;
        uc.create(
            authed_usr.shop_id.as_str(),
            authed_usr.username.as_str(),
            req_body.into(),
        )
        .await
    }
    .await
    .map(|_row| SuccessRespDto { success: true });
    respond(&appstate, result)
}

#[debug_handler(state=AppSharedState)]
pub(super) async fn list_rows(
    ExtractPath(task_id): ExtractPath<String>,
    ExtractQuery(query): ExtractQuery<StagingRowListQueryDto>,
    authed_usr: AppAuthedClaim,
    ExtractState(appstate): ExtractState<AppSharedState>,
) -> impl IntoResponse {
    let filter = StagingRowFilterModel {
        exist: query.exist,
        query: query.q.filter(|q| !q.trim().is_empty()),
        page: query.page.unwrap_or(1),
        limit: query.limit.unwrap_or(0),
    };
    let result = async {
        let uc = manage_staging_uc(&appstate).await?;
        uc.list(authed_usr.shop_id.as_str(), task_id.trim(), filter)
            .await
    }
    .await
    .map(|(rows, pagination)| StagingRowListRespDto {
        success: true,
        data: rows.into_iter().map(Into::into).collect(),
        pagination: pagination.into(),
    });
    respond(&appstate, result)
}

#[debug_handler(state=AppSharedState)]
pub(super) async fn update_row(
    ExtractPath(guid): ExtractPath<String>,
    authed_usr: AppAuthedClaim,
    ExtractState(appstate): ExtractState<AppSharedState>,
    ExtractJson(req_body): ExtractJson<StagingRowEditReqDto>,
) -> impl IntoResponse {
    let result = async {
        let uc = manage_staging_uc(&appstate).await?;
        uc.update(authed_usr.shop_id.as_str(), guid.as_str(), req_body.into())
            .await
    }
    .await
    .map(|_num| SuccessRespDto { success: true });
    respond(&appstate, result)
}

#[debug_handler(state=AppSharedState)]
pub(super) async fn delete_row(
    ExtractPath(guid): ExtractPath<String>,
    authed_usr: AppAuthedClaim,
    ExtractState(appstate): ExtractState<AppSharedState>,
) -> impl IntoResponse {
    let result = async {
        let uc = manage_staging_uc(&appstate).await?;
        uc.delete(authed_usr.shop_id.as_str(), guid.as_str()).await
    }
    .await
    .map(|_num| SuccessRespDto { success: true });
    respond(&appstate, result)
}

#[debug_handler(state=AppSharedState)]
pub(super) async fn delete_task(
    ExtractPath(task_id): ExtractPath<String>,
    authed_usr: AppAuthedClaim,
    ExtractState(appstate): ExtractState<AppSharedState>,
) -> impl IntoResponse {
    let result = async {
        let uc = manage_staging_uc(&appstate).await?;
        uc.delete_task(authed_usr.shop_id.as_str(), task_id.as_str())
            .await
    }
    .await
    .map(|_num| SuccessRespDto { success: true });
    respond(&appstate, result)
}

#[debug_handler(state=AppSharedState)]
pub(super) async fn task_meta(
    ExtractPath(task_id): ExtractPath<String>,
    authed_usr: AppAuthedClaim,
    ExtractState(appstate): ExtractState<AppSharedState>,
) -> impl IntoResponse {
    let result = async {
        let uc = manage_staging_uc(&appstate).await?;
        uc.meta(authed_usr.shop_id.as_str(), task_id.as_str()).await
    }
    .await
    .map(|m| TaskMetaRespDto {
        success: true,
        data: m.into(),
    });
    respond(&appstate, result)
}

#[debug_handler(state=AppSharedState)]
pub(super) async fn verify_task(
    ExtractPath(task_id): ExtractPath<String>,
    authed_usr: AppAuthedClaim,
    ExtractState(appstate): ExtractState<AppSharedState>,
) -> impl IntoResponse {
    let result = async {
        let uc = verify_task_uc(&appstate).await?;
        uc.execute(authed_usr.shop_id.as_str(), task_id.as_str())
            .await
    }
    .await
    .map(|_out| SuccessRespDto { success: true });
    respond(&appstate, result)
}

#[debug_handler(state=AppSharedState)]
pub(super) async fn commit_task(
    ExtractPath(task_id): ExtractPath<String>,
    authed_usr: AppAuthedClaim,
    ExtractState(appstate): ExtractState<AppSharedState>,
    ExtractJson(req_body): ExtractJson<StockBalanceHeaderReqDto>,
) -> impl IntoResponse {
    let result = async {
        let uc = commit_task_uc(&appstate).await?;
        uc.execute(
            authed_usr.shop_id.as_str(),
            authed_usr.username.as_str(),
            task_id.as_str(),
            req_body.into(),
        )
        .await
    }
    .await
    .map(|doc_no| TaskCommitRespDto {
        success: true,
        doc_no,
    });
    respond(&appstate, result)
} // end of fn commit_task
