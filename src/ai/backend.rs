//! LLM backend abstraction
//!
//! The remediation engine talks to the external reasoning service through the
//! [`FixBackend`] trait: submit an error report, receive a proposed patch.
//! Backends are untrusted and non-deterministic; every failure mode surfaces
//! as a [`BackendError`] that the remediation engine absorbs.

use crate::remedy::types::{FixRequest, FixResponse};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Errors that can occur during backend operations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum BackendError {
    /// API request failed with the given message
    ApiError {
        message: String,
        status_code: Option<u16>,
    },

    /// Request timed out after the specified duration (in seconds)
    TimeoutError { seconds: u64 },

    /// Invalid or malformed response from the LLM
    InvalidResponse {
        message: String,
        raw_response: Option<String>,
    },

    /// Configuration error (missing API keys, invalid settings, etc.)
    ConfigurationError { message: String },

    /// The LLM response could not be parsed into a FixResponse
    ParseError { message: String, context: String },

    /// Generic error for other cases
    Other { message: String },
}

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendError::ApiError {
                message,
                status_code,
            } => {
                if let Some(code) = status_code {
                    write!(f, "API error ({}): {}", code, message)
                } else {
                    write!(f, "API error: {}", message)
                }
            }
            BackendError::TimeoutError { seconds } => {
                write!(f, "Request timed out after {} seconds", seconds)
            }
            BackendError::InvalidResponse { message, .. } => {
                write!(f, "Invalid response from LLM: {}", message)
            }
            BackendError::ConfigurationError { message } => {
                write!(f, "Configuration error: {}", message)
            }
            BackendError::ParseError { message, context } => {
                write!(f, "Parse error: {} (context: {})", message, context)
            }
            BackendError::Other { message } => {
                write!(f, "Error: {}", message)
            }
        }
    }
}

impl std::error::Error for BackendError {}

/// Core trait for the external reasoning capability.
///
/// The call is synchronous request/response from the caller's point of view,
/// bounded by the backend's own request timeout.
#[async_trait]
pub trait FixBackend: Send + Sync {
    /// Analyzes a build failure report and proposes corrective edits.
    ///
    /// # Errors
    ///
    /// Returns `BackendError` if the service call fails, times out, or the
    /// response cannot be parsed. Callers treat all of these as "no
    /// applicable fix", never as fatal.
    async fn analyze(&self, request: &FixRequest) -> Result<FixResponse, BackendError>;

    /// Human-readable name of this backend.
    fn name(&self) -> &str;

    /// Optional model information for logging.
    fn model_info(&self) -> Option<String> {
        None
    }
}
