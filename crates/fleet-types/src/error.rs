//! Error taxonomy shared by every crate in the workspace.
//!
//! Mirrors each variant names the HTTP status its caller should
//! map it to, but this crate itself stays transport-agnostic — only
//! `fleet-gateway` knows about `axum`.

use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error, Clone)]
pub enum FleetError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("no model available: {0}")]
    NoModelAvailable(String),

    #[error("upstream timeout calling {model_id}")]
    UpstreamTimeout { model_id: String },

    #[error("upstream http error calling {model_id}: {message}")]
    UpstreamHttpError { model_id: String, message: String },

    #[error("inference server for {model_id} did not become ready in time")]
    StartupTimeout { model_id: String },

    #[error("internal error: {message}")]
    Internal { message: String, query_id: Option<String> },
}

impl FleetError {
    pub fn code(&self) -> &'static str {
        match self {
            FleetError::Validation(_) => "VALIDATION_ERROR",
            FleetError::NotFound(_) => "NOT_FOUND",
            FleetError::Conflict(_) => "CONFLICT",
            FleetError::NoModelAvailable(_) => "NO_MODEL_AVAILABLE",
            FleetError::UpstreamTimeout { .. } => "UPSTREAM_TIMEOUT",
            FleetError::UpstreamHttpError { .. } => "UPSTREAM_HTTP_ERROR",
            FleetError::StartupTimeout { .. } => "STARTUP_TIMEOUT",
            FleetError::Internal { .. } => "INTERNAL_ERROR",
        }
    }

    /// Canonical HTTP status for this error; `fleet-gateway`
    /// is free to override this for specific endpoints (e.g. CONFLICT is
    /// 200 on idempotent start/stop calls).
    pub fn status_code(&self) -> u16 {
        match self {
            FleetError::Validation(_) => 400,
            FleetError::NotFound(_) => 404,
            FleetError::Conflict(_) => 409,
            FleetError::NoModelAvailable(_) => 503,
            FleetError::UpstreamTimeout { .. } | FleetError::UpstreamHttpError { .. } => 502,
            FleetError::StartupTimeout { .. } => 500,
            FleetError::Internal { .. } => 500,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        FleetError::Internal { message: message.into(), query_id: None }
    }

    pub fn internal_for_query(message: impl Into<String>, query_id: impl Into<String>) -> Self {
        FleetError::Internal { message: message.into(), query_id: Some(query_id.into()) }
    }

    /// The structured body callers can correlate with pipeline state: `{error, message, query_id?, details?}`.
    pub fn to_body(&self) -> ErrorBody {
        let query_id = match self {
            FleetError::Internal { query_id, .. } => query_id.clone(),
            _ => None,
        };
        ErrorBody {
            error: self.code().to_string(),
            message: self.to_string(),
            query_id,
            details: None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

pub type FleetResult<T> = Result<T, FleetError>;
