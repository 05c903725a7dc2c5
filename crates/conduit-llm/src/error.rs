use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::protocol::engine::EngineErrorResponse;

/// Errors that can occur while adapting calls to the engine
#[derive(Debug, Error)]
pub enum LlmError {
    /// Caller requested a capability the adapter or engine cannot provide
    #[error("unsupported functionality: {functionality}")]
    UnsupportedFunctionality {
        /// What was requested
        functionality: String,
    },

    /// Engine construction or model load failed
    #[error("engine initialization failed: {0}")]
    EngineInitialization(String),

    /// Engine returned a structured failure payload
    #[error(transparent)]
    Backend(#[from] BackendError),

    /// Transport failure talking to the engine
    #[error("upstream error: {0}")]
    Upstream(String),

    /// Failure while consuming a chunk stream
    #[error("streaming error: {0}")]
    Stream(String),

    /// Engine payload did not match the expected schema
    #[error("failed to parse engine response: {message}")]
    ResponseParse {
        /// Parser diagnostic
        message: String,
    },

    /// Engine reply parsed but cannot be used
    #[error("invalid engine response: {0}")]
    InvalidResponse(String),

    /// Request or response could not be serialized
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Unexpected internal error
    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl LlmError {
    /// Shorthand for [`LlmError::UnsupportedFunctionality`]
    pub fn unsupported(functionality: impl Into<String>) -> Self {
        Self::UnsupportedFunctionality {
            functionality: functionality.into(),
        }
    }

    /// Re-tag a failure that happened while bringing the engine up
    pub(crate) fn into_initialization(self) -> Self {
        match self {
            Self::EngineInitialization(_) => self,
            other => Self::EngineInitialization(other.to_string()),
        }
    }
}

/// Structured failure reported by the engine
///
/// Displays as the backend's own message so it can be surfaced verbatim.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message}")]
pub struct BackendError {
    /// Human-readable message from the backend
    pub message: String,
    /// Backend error category
    pub error_type: Option<String>,
    /// Request parameter the backend blamed
    pub param: Option<serde_json::Value>,
    /// Backend error code
    pub code: Option<ErrorCode>,
}

/// Backend error codes come as either strings or numbers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ErrorCode {
    /// Symbolic code, e.g. `model_not_found`
    Text(String),
    /// Numeric code, e.g. an HTTP status
    Number(serde_json::Number),
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(code) => f.write_str(code),
            Self::Number(code) => write!(f, "{code}"),
        }
    }
}

/// Parse a failed response body against the engine's error schema
///
/// # Errors
///
/// Returns [`LlmError::ResponseParse`] if the body is not of the form
/// `{"error": {"message": ..., "type"?, "param"?, "code"?}}`
pub fn classify(body: &str) -> Result<BackendError, LlmError> {
    let parsed: EngineErrorResponse = serde_json::from_str(body).map_err(|e| LlmError::ResponseParse {
        message: format!("unrecognized error body: {e}"),
    })?;

    let detail = parsed.error;

    Ok(BackendError {
        message: detail.message,
        error_type: detail.error_type,
        param: detail.param,
        code: detail.code,
    })
}
