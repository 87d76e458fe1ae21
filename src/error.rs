//! Error handling for Sonara
//!
//! Parameter problems are clamped away inside the mapper and the stages, so
//! the variants here mostly describe collaborator and configuration failures.

use thiserror::Error;

/// Result type alias for Sonara operations
pub type Result<T> = std::result::Result<T, SonaraError>;

/// Main error type for Sonara operations
#[derive(Error, Debug)]
pub enum SonaraError {
    // Parameter Errors
    #[error("Invalid parameter {param}: {value} (expected {expected})")]
    InvalidParameter {
        param: String,
        value: String,
        expected: String,
    },

    // Rewriter Errors
    #[error("Text rewriter unavailable: {reason}")]
    RewriterUnavailable { reason: String },

    #[error("Text rewrite failed: {reason}")]
    RewriteFailed { reason: String },

    #[error("Request doesn't relate to audio processing")]
    InvalidRewrite,

    #[error("Malformed rewriter response: {details}")]
    MalformedResponse { details: String },

    #[error("Rewrite worker disconnected")]
    WorkerDisconnected,

    // Configuration Errors
    #[error("Configuration error: {reason}")]
    Config { reason: String },

    // I/O Errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Serialization Errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl SonaraError {
    /// Get the error code for this error type
    pub fn error_code(&self) -> &'static str {
        match self {
            SonaraError::InvalidParameter { .. } => "INVALID_PARAMETER",
            SonaraError::RewriterUnavailable { .. } => "REWRITER_UNAVAILABLE",
            SonaraError::RewriteFailed { .. } => "REWRITE_FAILED",
            SonaraError::InvalidRewrite => "INVALID_REWRITE",
            SonaraError::MalformedResponse { .. } => "MALFORMED_RESPONSE",
            SonaraError::WorkerDisconnected => "WORKER_DISCONNECTED",
            SonaraError::Config { .. } => "CONFIG_ERROR",
            SonaraError::Io(_) => "IO_ERROR",
            SonaraError::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }

    /// Check if this error is recoverable by mapping the original text
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            SonaraError::RewriterUnavailable { .. }
                | SonaraError::RewriteFailed { .. }
                | SonaraError::InvalidRewrite
                | SonaraError::MalformedResponse { .. }
                | SonaraError::WorkerDisconnected
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let err = SonaraError::RewriterUnavailable {
            reason: "no api key".to_string(),
        };
        assert_eq!(err.error_code(), "REWRITER_UNAVAILABLE");
        assert_eq!(SonaraError::InvalidRewrite.error_code(), "INVALID_REWRITE");
    }

    #[test]
    fn test_rewriter_errors_are_recoverable() {
        assert!(SonaraError::InvalidRewrite.is_recoverable());
        assert!(SonaraError::MalformedResponse {
            details: "no candidates".to_string()
        }
        .is_recoverable());

        let config = SonaraError::Config {
            reason: "bad file".to_string(),
        };
        assert!(!config.is_recoverable());
    }

    #[test]
    fn test_display_includes_context() {
        let err = SonaraError::InvalidParameter {
            param: "sample_rate".to_string(),
            value: "0".to_string(),
            expected: "> 0 Hz".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Invalid parameter sample_rate: 0 (expected > 0 Hz)"
        );
    }
}
