use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::Json;

use super::error::ApiError;
use super::models::{
    CreateAccountRequest, CreateAccountResponse, CreateDownloadTaskRequest,
    CreateDownloadTaskResponse, CreateSessionRequest, CreateSessionResponse,
    DeleteDownloadTaskResponse, GetDownloadTaskListResponse, ListQuery,
    UpdateDownloadTaskRequest, UpdateDownloadTaskResponse,
};
use super::state::AppState;
use crate::service::CoreError;

/// Header carrying the session token on authenticated operations.
pub const AUTH_TOKEN_HEADER: &str = "goload-auth";

/// Resolve the calling account from the token header.
async fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<i64, ApiError> {
    let token = headers
        .get(AUTH_TOKEN_HEADER)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
        .ok_or_else(|| {
            ApiError::Core(CoreError::Unauthenticated("missing auth token".to_string()))
        })?;

    let (account_id, _expires_at) = state
        .tokens
        .verify(token)
        .await
        .map_err(CoreError::from)?;
    Ok(account_id)
}

/// POST /accounts
pub async fn create_account(
    State(state): State<AppState>,
    Json(request): Json<CreateAccountRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let account = state
        .accounts
        .create_account(&request.account_name, &request.password)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(CreateAccountResponse {
            account_id: account.id,
        }),
    ))
}

/// POST /sessions
pub async fn create_session(
    State(state): State<AppState>,
    Json(request): Json<CreateSessionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let session = state
        .accounts
        .create_session(&request.account_name, &request.password)
        .await?;

    Ok((
        StatusCode::OK,
        Json(CreateSessionResponse {
            account: session.account,
            token: session.token,
        }),
    ))
}

/// POST /download-tasks
pub async fn create_download_task(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<CreateDownloadTaskRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let account_id = authenticate(&state, &headers).await?;

    let task = state
        .tasks
        .create_download_task(account_id, &request.url)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(CreateDownloadTaskResponse {
            download_task: task,
        }),
    ))
}

/// GET /download-tasks?offset=&limit=
pub async fn get_download_task_list(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<ListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let account_id = authenticate(&state, &headers).await?;

    let (download_tasks, total) = state
        .tasks
        .get_download_task_list(account_id, query.offset, query.limit)
        .await?;

    Ok((
        StatusCode::OK,
        Json(GetDownloadTaskListResponse {
            download_tasks,
            total,
        }),
    ))
}

/// PUT /download-tasks/{task_id}
pub async fn update_download_task(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(task_id): Path<i64>,
    Json(request): Json<UpdateDownloadTaskRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let account_id = authenticate(&state, &headers).await?;

    let updated = state
        .tasks
        .update_download_task(
            account_id,
            task_id,
            request.url.as_deref(),
            request.download_status,
        )
        .await?;

    Ok((StatusCode::OK, Json(UpdateDownloadTaskResponse { updated })))
}

/// DELETE /download-tasks/{task_id}
pub async fn delete_download_task(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(task_id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let account_id = authenticate(&state, &headers).await?;

    let deleted = state
        .tasks
        .delete_download_task(account_id, task_id)
        .await?;

    Ok((StatusCode::OK, Json(DeleteDownloadTaskResponse { deleted })))
}

/// GET /download-tasks/{task_id}/file
///
/// Declared on the surface but not implemented; streaming stored
/// payloads to clients is out of scope.
pub async fn get_download_task_file(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(_task_id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    authenticate(&state, &headers).await?;
    Err::<(), _>(ApiError::Unimplemented("GetDownloadTaskFile"))
}
