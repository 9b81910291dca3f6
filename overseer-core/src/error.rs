//! Error types for the Overseer core library.
//!
//! This module provides a unified error handling system for all client
//! operations: transport failures, server-side state rejections, start
//! conflicts, and local parse recoveries.
//!
//! # Error Codes Reference
//!
//! | Code Range | Category | Description |
//! |------------|----------|-------------|
//! | E1001-E1099 | Transport | Network and HTTP-layer failures |
//! | E2001-E2099 | State | Server rejected an operation for the job's state |
//! | E3001-E3099 | Config | Environment, config file, and validation errors |
//! | E4001-E4099 | Parse | Payloads that could not be decoded |
//! | E9001-E9099 | General | Internal and validation errors |

use thiserror::Error;
use tracing::{error, warn};

/// The main error type for the Overseer core library.
///
/// Transport failures are recoverable and retried only by continued polling;
/// they are never retried automatically for `start` or `resume`. Parse
/// failures on step outputs are always recovered locally by falling back to
/// raw-text rendering and never reach this type from the resolver.
#[derive(Debug, Error)]
pub enum OverseerError {
    // ========================================================================
    // Transport Errors (E1001-E1099)
    // ========================================================================
    /// Network or HTTP-layer failure talking to the orchestrator
    #[error("[E1001] Transport failure: {0}")]
    Transport(String),

    /// The orchestrator returned a non-success status with a detail message
    #[error("[E1002] {0}")]
    Backend(String),

    /// Request exceeded the configured deadline
    #[error("[E1003] Request timed out after {0} seconds")]
    Timeout(u64),

    // ========================================================================
    // State Errors (E2001-E2099)
    // ========================================================================
    /// The server rejected an operation because the job is not in the
    /// expected state (e.g. resume on a job that is not waiting for a user)
    #[error("[E2001] Invalid job state: {0}")]
    InvalidState(String),

    /// A second `start` was attempted for a workflow while one is in flight
    #[error("[E2002] A start is already in flight for workflow '{0}'")]
    Conflict(String),

    /// The job was not found on the orchestrator
    #[error("[E2003] Job not found: {0}")]
    JobNotFound(String),

    // ========================================================================
    // Configuration Errors (E3001-E3099)
    // ========================================================================
    /// Configuration file parse error
    #[error("[E3001] Failed to parse configuration: {0}")]
    ConfigParse(String),

    /// Invalid configuration value
    #[error("[E3002] Invalid configuration value for '{key}': {message}")]
    InvalidConfigValue { key: String, message: String },

    // ========================================================================
    // Parse Errors (E4001-E4099)
    // ========================================================================
    /// A payload could not be decoded into the expected shape
    #[error("[E4001] Failed to decode response: {0}")]
    Decode(String),

    // ========================================================================
    // General Errors (E9001-E9099)
    // ========================================================================
    /// Internal error (catch-all for unexpected conditions)
    #[error("[E9001] Internal error: {0}")]
    Internal(String),
}

/// Result type alias for Overseer operations.
pub type OverseerResult<T> = Result<T, OverseerError>;

// ============================================================================
// From trait implementations for seamless error propagation
// ============================================================================

impl From<reqwest::Error> for OverseerError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            OverseerError::Timeout(30)
        } else if err.is_decode() {
            OverseerError::Decode(err.to_string())
        } else {
            OverseerError::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for OverseerError {
    fn from(err: serde_json::Error) -> Self {
        OverseerError::Decode(err.to_string())
    }
}

impl From<config::ConfigError> for OverseerError {
    fn from(err: config::ConfigError) -> Self {
        match err {
            config::ConfigError::NotFound(key) => OverseerError::InvalidConfigValue {
                key,
                message: "Key not found".to_string(),
            },
            _ => OverseerError::ConfigParse(err.to_string()),
        }
    }
}

// ============================================================================
// Error categorization helpers
// ============================================================================

impl OverseerError {
    /// Returns true if this error is transient and the operation might
    /// succeed on a later poll tick.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            OverseerError::Transport(_) | OverseerError::Timeout(_) | OverseerError::Backend(_)
        )
    }

    /// Returns true if this error is related to transport.
    pub fn is_transport_error(&self) -> bool {
        matches!(
            self,
            OverseerError::Transport(_) | OverseerError::Backend(_) | OverseerError::Timeout(_)
        )
    }

    /// Returns true if this error is a server-side state rejection.
    pub fn is_state_error(&self) -> bool {
        matches!(
            self,
            OverseerError::InvalidState(_)
                | OverseerError::Conflict(_)
                | OverseerError::JobNotFound(_)
        )
    }

    /// Returns an error code suitable for logging or external reporting.
    pub fn error_code(&self) -> &'static str {
        match self {
            OverseerError::Transport(_) => "E1001",
            OverseerError::Backend(_) => "E1002",
            OverseerError::Timeout(_) => "E1003",
            OverseerError::InvalidState(_) => "E2001",
            OverseerError::Conflict(_) => "E2002",
            OverseerError::JobNotFound(_) => "E2003",
            OverseerError::ConfigParse(_) => "E3001",
            OverseerError::InvalidConfigValue { .. } => "E3002",
            OverseerError::Decode(_) => "E4001",
            OverseerError::Internal(_) => "E9001",
        }
    }

    /// Log this error with appropriate severity level.
    pub fn log(&self) {
        let code = self.error_code();
        if self.is_transient() {
            warn!(error_code = %code, "Transient error occurred: {}", self);
        } else {
            error!(error_code = %code, "Error occurred: {}", self);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = OverseerError::Transport("connection refused".to_string());
        assert!(err.to_string().contains("E1001"));
        assert!(err.to_string().contains("connection refused"));

        let err = OverseerError::Conflict("wf-1".to_string());
        assert!(err.to_string().contains("E2002"));
        assert!(err.to_string().contains("wf-1"));
    }

    #[test]
    fn test_backend_detail_is_verbatim() {
        let err = OverseerError::Backend("workflow has no steps".to_string());
        assert!(err.to_string().contains("workflow has no steps"));
    }

    #[test]
    fn test_is_transient() {
        assert!(OverseerError::Transport("reset".to_string()).is_transient());
        assert!(OverseerError::Timeout(30).is_transient());
        assert!(OverseerError::Backend("502".to_string()).is_transient());

        assert!(!OverseerError::InvalidState("not waiting".to_string()).is_transient());
        assert!(!OverseerError::Conflict("wf-1".to_string()).is_transient());
        assert!(!OverseerError::Decode("bad json".to_string()).is_transient());
    }

    #[test]
    fn test_error_categorization() {
        let transport = OverseerError::Transport("reset".to_string());
        assert!(transport.is_transport_error());
        assert!(!transport.is_state_error());

        let state = OverseerError::InvalidState("not waiting".to_string());
        assert!(state.is_state_error());
        assert!(!state.is_transport_error());
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(
            OverseerError::Transport("x".to_string()).error_code(),
            "E1001"
        );
        assert_eq!(
            OverseerError::InvalidState("x".to_string()).error_code(),
            "E2001"
        );
        assert_eq!(
            OverseerError::Conflict("x".to_string()).error_code(),
            "E2002"
        );
        assert_eq!(OverseerError::Decode("x".to_string()).error_code(), "E4001");
        assert_eq!(
            OverseerError::Internal("x".to_string()).error_code(),
            "E9001"
        );
    }

    #[test]
    fn test_from_serde_json_error() {
        let json_result: Result<serde_json::Value, _> = serde_json::from_str("not json");
        let err: OverseerError = json_result.unwrap_err().into();
        assert!(matches!(err, OverseerError::Decode(_)));
    }
}
