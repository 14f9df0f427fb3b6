use serde::{Deserialize, Serialize};

use crate::service::TaskView;
use crate::store::{AccountRow, DownloadStatus};

#[derive(Debug, Deserialize)]
pub struct CreateAccountRequest {
    pub account_name: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct CreateAccountResponse {
    pub account_id: i64,
}

#[derive(Debug, Deserialize)]
pub struct CreateSessionRequest {
    pub account_name: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct CreateSessionResponse {
    pub account: AccountRow,
    pub token: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateDownloadTaskRequest {
    pub url: String,
}

#[derive(Debug, Serialize)]
pub struct CreateDownloadTaskResponse {
    pub download_task: TaskView,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub offset: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_limit() -> i64 {
    100
}

#[derive(Debug, Serialize)]
pub struct GetDownloadTaskListResponse {
    pub download_tasks: Vec<TaskView>,
    pub total: i64,
}

#[derive(Debug, Deserialize)]
pub struct UpdateDownloadTaskRequest {
    pub url: Option<String>,
    pub download_status: Option<DownloadStatus>,
}

#[derive(Debug, Serialize)]
pub struct UpdateDownloadTaskResponse {
    pub updated: bool,
}

#[derive(Debug, Serialize)]
pub struct DeleteDownloadTaskResponse {
    pub deleted: bool,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: &'static str,
    pub message: String,
}
