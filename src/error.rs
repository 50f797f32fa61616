//! Error types for each pipeline layer.
//!
//! Provider failures are absorbed into the signal bundle. Everything from the
//! model call onwards surfaces to the caller as a `PipelineError`.

use axum::http::StatusCode;
use serde::Serialize;
use thiserror::Error;

/// Failure of a single signal provider call.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("provider is not configured")]
    NotConfigured,

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("upstream returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("upstream error: {0}")]
    Upstream(String),

    #[error("could not decode provider response: {0}")]
    Decode(String),

    #[error("no data: {0}")]
    NoData(String),
}

impl ProviderError {
    /// Only transient failures are worth another attempt against a rate-limited API.
    pub fn is_retryable(&self) -> bool {
        match self {
            ProviderError::Transport(e) => !e.is_decode() && !e.is_builder(),
            ProviderError::Status { status, .. } => is_retryable_status(*status),
            _ => false,
        }
    }
}

/// Failure of the reasoning-model request.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("model client is not configured")]
    NotConfigured,

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("model API returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("model request timed out after {after_ms}ms")]
    Timeout { after_ms: u64 },

    #[error("model refused to answer: {0}")]
    Blocked(String),

    #[error("could not decode model API envelope: {0}")]
    Decode(String),
}

impl ModelError {
    pub fn is_retryable(&self) -> bool {
        match self {
            ModelError::Transport(_) | ModelError::Timeout { .. } => true,
            ModelError::Status { status, .. } => is_retryable_status(*status),
            _ => false,
        }
    }
}

/// Failure to accept the model's reply as an analysis.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ResponseError {
    #[error("model reply is not valid JSON: {0}")]
    Parse(String),

    #[error("model reply violates the analysis schema at `{field}`: {reason}")]
    Schema { field: String, reason: String },
}

/// Terminal failure of one validation run.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("model request failed: {message}")]
    ModelRequest { message: String, retryable: bool },

    #[error(transparent)]
    Response(#[from] ResponseError),

    #[error("deadline of {deadline_ms}ms exceeded during {stage}")]
    DeadlineExceeded { stage: &'static str, deadline_ms: u64 },
}

impl From<ModelError> for PipelineError {
    fn from(err: ModelError) -> Self {
        PipelineError::ModelRequest {
            retryable: err.is_retryable(),
            message: err.to_string(),
        }
    }
}

/// Stable, client-facing discriminator for `PipelineError`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidInput,
    ModelRequestFailed,
    ResponseParseFailed,
    SchemaViolation,
    DeadlineExceeded,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::InvalidInput => "invalid_input",
            ErrorKind::ModelRequestFailed => "model_request_failed",
            ErrorKind::ResponseParseFailed => "response_parse_failed",
            ErrorKind::SchemaViolation => "schema_violation",
            ErrorKind::DeadlineExceeded => "deadline_exceeded",
        }
    }

    pub fn status_code(self) -> StatusCode {
        match self {
            ErrorKind::InvalidInput => StatusCode::BAD_REQUEST,
            ErrorKind::DeadlineExceeded => StatusCode::GATEWAY_TIMEOUT,
            _ => StatusCode::BAD_GATEWAY,
        }
    }
}

impl PipelineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PipelineError::InvalidInput(_) => ErrorKind::InvalidInput,
            PipelineError::ModelRequest { .. } => ErrorKind::ModelRequestFailed,
            PipelineError::Response(ResponseError::Parse(_)) => ErrorKind::ResponseParseFailed,
            PipelineError::Response(ResponseError::Schema { .. }) => ErrorKind::SchemaViolation,
            PipelineError::DeadlineExceeded { .. } => ErrorKind::DeadlineExceeded,
        }
    }

    pub fn is_retryable(&self) -> bool {
        match self {
            PipelineError::InvalidInput(_) => false,
            PipelineError::ModelRequest { retryable, .. } => *retryable,
            // Model output varies between attempts, so a fresh run may conform.
            PipelineError::Response(_) => true,
            PipelineError::DeadlineExceeded { .. } => true,
        }
    }

    fn guidance(&self) -> Vec<String> {
        let lines: &[&str] = match self {
            PipelineError::InvalidInput(_) => &[
                "Describe the idea in a full sentence or two (at least 10 characters)",
                "Upload a supported document type: pdf, docx, txt or md",
            ],
            PipelineError::ModelRequest { retryable: true, .. } => &[
                "Retry the validation in a few moments",
                "Market signals collected so far are included in raw_data",
            ],
            PipelineError::ModelRequest { retryable: false, .. } => &[
                "Rephrase the idea; the model declined or rejected the request",
                "Contact the operator if the problem persists",
            ],
            PipelineError::Response(_) => &[
                "Retry the validation; model output varies between attempts",
                "Make the idea description more specific",
            ],
            PipelineError::DeadlineExceeded { .. } => &[
                "Retry the validation; upstream providers were slow",
                "Disable optional signals to shorten the run",
            ],
        };
        lines.iter().map(|s| s.to_string()).collect()
    }

    /// Structured body sent to the caller.
    pub fn to_payload(&self) -> ErrorPayload {
        let field = match self {
            PipelineError::Response(ResponseError::Schema { field, .. }) => Some(field.clone()),
            _ => None,
        };
        ErrorPayload {
            kind: self.kind(),
            message: self.to_string(),
            field,
            retryable: self.is_retryable(),
            guidance: self.guidance(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorPayload {
    pub kind: ErrorKind,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    pub retryable: bool,
    pub guidance: Vec<String>,
}

fn is_retryable_status(status: u16) -> bool {
    status == 429 || (500..=599).contains(&status)
}
