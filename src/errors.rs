// src/errors.rs
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    ValidationError(String),

    #[error("Failed to get access token: {0}")]
    AccessToken(String),

    #[error("Request failed with status code {status}")]
    Upstream { status: u16, body: Option<Value> },

    #[error("HTTP request failed: {0}")]
    ExternalApi(String),

    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    #[error("HTTP client error: {0}")]
    HttpClientError(String),

    /// A gateway operation that failed, labelled for the caller.
    #[error("{operation} failed: {source}")]
    Relay {
        operation: &'static str,
        #[source]
        source: Box<AppError>,
    },
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The gateway's own error body, when one came back.
    pub fn upstream_body(&self) -> Option<&Value> {
        match self {
            AppError::Upstream { body, .. } => body.as_ref(),
            AppError::Relay { source, .. } => source.upstream_body(),
            _ => None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let body = Json(json!({
            "success": false,
            "message": self.to_string(),
            "error": self.upstream_body(),
        }));

        (status, body).into_response()
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::ExternalApi(err.to_string())
    }
}

// Helper conversion functions
impl AppError {
    pub fn invalid_data(msg: impl Into<String>) -> Self {
        AppError::ValidationError(msg.into())
    }

    pub fn access_token(msg: impl Into<String>) -> Self {
        AppError::AccessToken(msg.into())
    }

    pub fn configuration(msg: impl Into<String>) -> Self {
        AppError::ConfigurationError(msg.into())
    }

    pub fn relay(operation: &'static str, source: AppError) -> Self {
        AppError::Relay {
            operation,
            source: Box::new(source),
        }
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
