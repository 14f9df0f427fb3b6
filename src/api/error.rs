use axum::{http::StatusCode, response::IntoResponse, Json};
use thiserror::Error;

use super::models::ErrorResponse;
use crate::service::CoreError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("unimplemented: {0}")]
    Unimplemented(&'static str),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Core(CoreError::InvalidArgument(_)) => StatusCode::BAD_REQUEST,
            ApiError::Core(CoreError::Unauthenticated(_)) => StatusCode::UNAUTHORIZED,
            ApiError::Core(CoreError::PermissionDenied(_)) => StatusCode::FORBIDDEN,
            ApiError::Core(CoreError::NotFound(_)) => StatusCode::NOT_FOUND,
            ApiError::Core(CoreError::AlreadyExists(_)) => StatusCode::CONFLICT,
            ApiError::Core(CoreError::Internal(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Unimplemented(_) => StatusCode::NOT_IMPLEMENTED,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Core(CoreError::InvalidArgument(_)) => "INVALID_ARGUMENT",
            ApiError::Core(CoreError::Unauthenticated(_)) => "UNAUTHENTICATED",
            ApiError::Core(CoreError::PermissionDenied(_)) => "PERMISSION_DENIED",
            ApiError::Core(CoreError::NotFound(_)) => "NOT_FOUND",
            ApiError::Core(CoreError::AlreadyExists(_)) => "ALREADY_EXISTS",
            ApiError::Core(CoreError::Internal(_)) => "INTERNAL",
            ApiError::Unimplemented(_) => "UNIMPLEMENTED",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        // Internal causes are logged here and never shown to clients.
        let message = match &self {
            ApiError::Core(CoreError::Internal(cause)) => {
                tracing::error!(%cause, "Internal error");
                "internal error".to_string()
            }
            other => other.to_string(),
        };

        let body = ErrorResponse {
            code: self.code(),
            message,
        };
        (self.status_code(), Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (CoreError::InvalidArgument("x".into()), StatusCode::BAD_REQUEST),
            (CoreError::Unauthenticated("x".into()), StatusCode::UNAUTHORIZED),
            (CoreError::PermissionDenied("x".into()), StatusCode::FORBIDDEN),
            (CoreError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (CoreError::AlreadyExists("x".into()), StatusCode::CONFLICT),
            (
                CoreError::Internal("x".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, expected) in cases {
            assert_eq!(ApiError::Core(err).status_code(), expected);
        }
        assert_eq!(
            ApiError::Unimplemented("x").status_code(),
            StatusCode::NOT_IMPLEMENTED
        );
    }
}
