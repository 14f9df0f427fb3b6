//! Domain services
//!
//! The state machine and authorization gate for accounts and download
//! tasks. Errors carry the kind the API surfaces; internal causes are
//! logged at the point of failure and never shown to callers.

mod accounts;
mod tasks;

pub use accounts::{AccountService, Session};
pub use tasks::{TaskService, TaskView, METADATA_KEY_FILE_NAME};

use crate::blob::BlobError;
use crate::bus::BusError;
use crate::fetcher::FetchError;
use crate::password::PasswordError;
use crate::store::StoreError;
use crate::token::TokenError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("unauthenticated: {0}")]
    Unauthenticated(String),

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, CoreError>;

impl From<StoreError> for CoreError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::AlreadyExists(what) => CoreError::AlreadyExists(what),
            other => CoreError::Internal(other.to_string()),
        }
    }
}

impl From<sqlx::Error> for CoreError {
    fn from(err: sqlx::Error) -> Self {
        CoreError::Internal(err.to_string())
    }
}

impl From<BusError> for CoreError {
    fn from(err: BusError) -> Self {
        CoreError::Internal(err.to_string())
    }
}

impl From<BlobError> for CoreError {
    fn from(err: BlobError) -> Self {
        match err {
            BlobError::NotFound(key) => CoreError::NotFound(key),
            other => CoreError::Internal(other.to_string()),
        }
    }
}

impl From<FetchError> for CoreError {
    fn from(err: FetchError) -> Self {
        CoreError::Internal(err.to_string())
    }
}

impl From<PasswordError> for CoreError {
    fn from(err: PasswordError) -> Self {
        CoreError::Internal(err.to_string())
    }
}

impl From<TokenError> for CoreError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::SignFailed
            | TokenError::KeyGeneration(_)
            | TokenError::Directory(_) => CoreError::Internal(err.to_string()),
            other => CoreError::Unauthenticated(other.to_string()),
        }
    }
}
