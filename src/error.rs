use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::codec::CodecError;
use crate::ports::{PublishError, RepositoryError};
use crate::validation::ValidationError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("no gateway configuration for {0}")]
    NotConfigured(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("unsupported data format: {0}")]
    UnsupportedFormat(String),

    #[error("invalid callback: {0}")]
    InvalidCallback(String),

    #[error("gateway call failed after {attempts} attempt(s): {message}")]
    GatewayCallFailed { attempts: u32, message: String },

    #[error("store failure: {0}")]
    StoreFailure(String),

    #[error("publish failure: {0}")]
    PublishFailure(String),

    #[error("request cancelled before completion")]
    Cancelled,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("{operation}: {source}")]
    Context {
        operation: &'static str,
        #[source]
        source: Box<AppError>,
    },
}

impl AppError {
    /// Wraps the error with the name of the operation that failed.
    pub fn context(self, operation: &'static str) -> Self {
        AppError::Context {
            operation,
            source: Box::new(self),
        }
    }

    /// The innermost error, with all operation context stripped.
    pub fn kind(&self) -> &AppError {
        match self {
            AppError::Context { source, .. } => source.kind(),
            other => other,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self.kind() {
            AppError::NotConfigured(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::UnsupportedFormat(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::InvalidCallback(_) => StatusCode::BAD_REQUEST,
            AppError::GatewayCallFailed { .. } => StatusCode::BAD_GATEWAY,
            AppError::StoreFailure(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::PublishFailure(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Cancelled => StatusCode::GATEWAY_TIMEOUT,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Context { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<RepositoryError> for AppError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound(what) => AppError::NotFound(what),
            RepositoryError::Database(e) => AppError::StoreFailure(e.to_string()),
        }
    }
}

impl From<CodecError> for AppError {
    fn from(err: CodecError) -> Self {
        match err {
            CodecError::UnsupportedFormat(format) => AppError::UnsupportedFormat(format),
            CodecError::InvalidCallback(reason) => AppError::InvalidCallback(reason),
            CodecError::Encode(reason) => AppError::Internal(format!("payload encoding: {}", reason)),
        }
    }
}

impl From<PublishError> for AppError {
    fn from(err: PublishError) -> Self {
        AppError::PublishFailure(err.to_string())
    }
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        AppError::Validation(err.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(json!({
            "error": self.to_string(),
            "status": status.as_u16(),
        }));

        (status, body).into_response()
    }
}
