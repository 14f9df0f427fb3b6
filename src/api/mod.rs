//! HTTP API surface
//!
//! REST mirror of the service operations on a single axum listener.
//! Authenticated routes read the session token from the `goload-auth`
//! header; errors pass through from the domain layer already tagged with
//! their status kind.

pub mod error;
pub mod models;
pub mod services;
pub mod state;

use axum::routing::{get, post, put};
use axum::Router;
use tower_http::trace::TraceLayer;

use services::{
    create_account, create_download_task, create_session, delete_download_task,
    get_download_task_file, get_download_task_list, update_download_task,
};
use state::AppState;

pub use services::AUTH_TOKEN_HEADER;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/accounts", post(create_account))
        .route("/sessions", post(create_session))
        .route(
            "/download-tasks",
            post(create_download_task).get(get_download_task_list),
        )
        .route(
            "/download-tasks/{task_id}",
            put(update_download_task).delete(delete_download_task),
        )
        .route("/download-tasks/{task_id}/file", get(get_download_task_file))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
