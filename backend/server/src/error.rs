use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<ledger::Error> for AppError {
    fn from(error: ledger::Error) -> Self {
        use ledger::Error as E;

        match error {
            E::Validation(_) | E::TooManySelections(_) | E::DuplicateSelection { .. } => {
                AppError::Validation(error.to_string())
            }
            E::InvalidCredentials | E::Unauthorized(_) => AppError::Unauthorized(error.to_string()),
            E::Forbidden(message) => AppError::Forbidden(message),
            E::NotFound(message) => AppError::NotFound(message),
            E::Conflict(message) => AppError::Conflict(message),
            E::Hash(_) | E::Token(_) | E::Migrate(_) | E::Database(_) => {
                AppError::Internal(error.to_string())
            }
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match self {
            AppError::Validation { .. } => StatusCode::BAD_REQUEST,
            AppError::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            AppError::Forbidden { .. } => StatusCode::FORBIDDEN,
            AppError::NotFound { .. } => StatusCode::NOT_FOUND,
            AppError::Conflict { .. } => StatusCode::CONFLICT,
            AppError::Config { .. } | AppError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!("{self}");
            "Internal server error".to_string()
        } else {
            self.to_string()
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ledger_error_mapping() {
        let cases = [
            (ledger::Error::TooManySelections(9), StatusCode::BAD_REQUEST),
            (ledger::Error::InvalidCredentials, StatusCode::UNAUTHORIZED),
            (ledger::Error::Forbidden("no".to_string()), StatusCode::FORBIDDEN),
            (ledger::Error::NotFound("gone".to_string()), StatusCode::NOT_FOUND),
            (ledger::Error::Conflict("taken".to_string()), StatusCode::CONFLICT),
            (ledger::Error::Hash("bad".to_string()), StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (error, status) in cases {
            assert_eq!(AppError::from(error).into_response().status(), status);
        }
    }
}
