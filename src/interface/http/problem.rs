use axum::{
    Json,
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tracing::error;

use crate::domain::errors::DomainError;

pub type ApiResult<T> = Result<T, ApiError>;

/// Error returned by every handler, rendered as `{ "kind", "message" }`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    error: DomainError,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl From<DomainError> for ApiError {
    fn from(error: DomainError) -> Self {
        Self {
            status: status_for(&error),
            error,
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::from(DomainError::validation(format!(
            "invalid request body: {}",
            rejection.body_text()
        )))
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::from(DomainError::validation(format!(
            "invalid query string: {}",
            rejection.body_text()
        )))
    }
}

pub fn status_for(error: &DomainError) -> StatusCode {
    match error {
        DomainError::Validation(_)
        | DomainError::InvalidStatus(_)
        | DomainError::IllegalTransition { .. }
        | DomainError::EmptyHistory
        | DomainError::NotUndoable => StatusCode::BAD_REQUEST,
        DomainError::Unauthorized(_)
        | DomainError::CrmAuthRequired(_)
        | DomainError::Refresh(_) => StatusCode::UNAUTHORIZED,
        DomainError::NotFound(_) => StatusCode::NOT_FOUND,
        DomainError::Upstream(_) => StatusCode::BAD_GATEWAY,
        DomainError::Storage(_) | DomainError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

#[derive(Debug, Serialize)]
struct ErrorEnvelope {
    kind: &'static str,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            error!(kind = self.error.kind(), error = %self.error, "request failed");
        }

        let payload = ErrorEnvelope {
            kind: self.error.kind(),
            message: self.error.to_string(),
        };
        (self.status, Json(payload)).into_response()
    }
}
