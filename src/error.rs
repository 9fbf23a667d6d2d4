//! Error hierarchy for the soreness risk engine
//!
//! Missing data is never an error inside the engine. The variants here cover
//! the translation boundary (integer codes and out-of-range survey values
//! arriving from the caller) and the ambient config/IO layer.

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for all engine operations
#[derive(Debug, Error)]
pub enum RiskEngineError {
    /// Caller supplied a value the engine cannot represent
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Configuration could not be loaded or is inconsistent
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Input file missing
    #[error("Input not found: {}", path.display())]
    InputNotFound { path: PathBuf },

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding/decoding errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Rejections raised while translating caller data into engine types
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Unknown body part code: {0}")]
    UnknownBodyPart(u8),

    #[error("Unknown side code: {0}")]
    UnknownSide(u8),

    #[error("Unknown historic soreness status code: {0}")]
    UnknownStatus(u8),

    #[error("Unknown trigger type code: {0}")]
    UnknownTriggerType(u16),

    #[error("Unknown soreness cause code: {0}")]
    UnknownCause(u8),

    #[error("Unknown sport code: {0}")]
    UnknownSport(u8),

    /// Severity must be within 0..=5
    #[error("Severity out of range: {0}")]
    SeverityOutOfRange(f64),

    /// Movement score must be within 0..=5
    #[error("Movement score out of range: {0}")]
    MovementOutOfRange(f64),

    /// A report carried neither a severity nor a movement score
    #[error("Soreness report for body part {0} has no severity or movement score")]
    MissingSeverity(u8),

    /// Qualitative flags are scored 0..=3
    #[error("Qualitative flag {flag} out of range: {value}")]
    FlagOutOfRange { flag: &'static str, value: u8 },

    /// The load calculator needs exactly five weekly buckets
    #[error("Expected 5 weekly load buckets, got {0}")]
    WeekCount(usize),
}

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, RiskEngineError>;

impl RiskEngineError {
    /// Get error severity level
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            RiskEngineError::Validation(_) => ErrorSeverity::Warning,
            RiskEngineError::InputNotFound { .. } => ErrorSeverity::Warning,
            RiskEngineError::Configuration(_) => ErrorSeverity::Error,
            RiskEngineError::Io(_) => ErrorSeverity::Error,
            RiskEngineError::Serialization(_) => ErrorSeverity::Error,
        }
    }

    /// Only file access can succeed on a second attempt; computation is deterministic
    pub fn is_retryable(&self) -> bool {
        matches!(self, RiskEngineError::Io(_))
    }

    /// Get user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            RiskEngineError::InputNotFound { path } => {
                format!("Could not find athlete input file: {}", path.display())
            }
            RiskEngineError::Validation(ValidationError::UnknownBodyPart(code)) => {
                format!("Survey referenced an unknown body part ({})", code)
            }
            RiskEngineError::Validation(ValidationError::SeverityOutOfRange(value)) => {
                format!("Severity must be between 0 and 5, got {}", value)
            }
            RiskEngineError::Serialization(err) => {
                format!("Athlete input is not valid JSON: {}", err)
            }
            _ => self.to_string(),
        }
    }
}

/// Error severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    /// Error that prevents the run
    Error,
    /// Offending record is dropped, the run continues
    Warning,
    /// Informational message
    Info,
}

impl ErrorSeverity {
    /// Convert to tracing level
    pub fn to_tracing_level(&self) -> tracing::Level {
        match self {
            ErrorSeverity::Error => tracing::Level::ERROR,
            ErrorSeverity::Warning => tracing::Level::WARN,
            ErrorSeverity::Info => tracing::Level::INFO,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_severity() {
        let err = RiskEngineError::from(ValidationError::UnknownSide(7));
        assert_eq!(err.severity(), ErrorSeverity::Warning);
        assert_eq!(err.severity().to_tracing_level(), tracing::Level::WARN);

        let err = RiskEngineError::Configuration("bad threshold".to_string());
        assert_eq!(err.severity(), ErrorSeverity::Error);
    }

    #[test]
    fn test_error_retryable() {
        let err = RiskEngineError::Io(std::io::Error::new(std::io::ErrorKind::Other, "busy"));
        assert!(err.is_retryable());

        let err = RiskEngineError::from(ValidationError::WeekCount(3));
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_user_messages() {
        let err = RiskEngineError::InputNotFound {
            path: PathBuf::from("day.json"),
        };
        assert!(err.user_message().contains("Could not find"));

        let err = RiskEngineError::from(ValidationError::SeverityOutOfRange(7.5));
        assert!(err.user_message().contains("between 0 and 5"));
    }
}
