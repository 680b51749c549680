//! Error handling for the schedule compiler

use thiserror::Error;

/// Result type for compiler operations
pub type Result<T> = core::result::Result<T, QecError>;

/// Error types raised while building codes and compiling them
#[derive(Error, Debug, Clone, PartialEq)]
pub enum QecError {
    /// Malformed check (empty, repeated qubit, non-Hermitian product)
    #[error("Invalid check: {0}")]
    InvalidCheck(String),

    /// Malformed detector (floor/lid mismatch, no fresh lid check)
    #[error("Invalid detector: {0}")]
    InvalidDetector(String),

    /// Structural problem with the code or its schedules
    #[error("Invalid code: {0}")]
    InvalidCode(String),

    /// Compile request inconsistent with the code
    #[error("Invalid compile request: {0}")]
    InvalidRequest(String),

    /// Check content incompatible with the extraction strategy
    #[error("Extraction error: {0}")]
    Extraction(String),

    /// Two gates on one qubit in the same tick
    #[error("Conflict at tick {tick}: qubit {qubit} already has a gate")]
    Conflict { tick: usize, qubit: usize },

    /// Reference to a measurement that was never recorded
    #[error("Unknown measurement: {0}")]
    UnknownMeasurement(String),

    /// Resolution attempted before all constituent measurements exist
    #[error("Not yet measured: {0}")]
    NotYetMeasured(String),

    /// Logical observable could not be tracked or read out
    #[error("Observable error: {0}")]
    Observable(String),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Program text parsing errors
    #[error("Parse error: {message} at position {position}")]
    Parse { message: String, position: usize },

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// JSON (de)serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl QecError {
    /// Create an invalid check error
    pub fn invalid_check(message: impl Into<String>) -> Self {
        Self::InvalidCheck(message.into())
    }

    /// Create an invalid detector error
    pub fn invalid_detector(message: impl Into<String>) -> Self {
        Self::InvalidDetector(message.into())
    }

    /// Create an invalid code error
    pub fn invalid_code(message: impl Into<String>) -> Self {
        Self::InvalidCode(message.into())
    }

    /// Create an invalid request error
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest(message.into())
    }

    /// Create an extraction error
    pub fn extraction(message: impl Into<String>) -> Self {
        Self::Extraction(message.into())
    }

    /// Create an observable error
    pub fn observable(message: impl Into<String>) -> Self {
        Self::Observable(message.into())
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a parse error
    pub fn parse(message: impl Into<String>, position: usize) -> Self {
        Self::Parse {
            message: message.into(),
            position,
        }
    }

    /// True for errors raised while validating inputs, before any compilation
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            Self::InvalidCheck(_)
                | Self::InvalidDetector(_)
                | Self::InvalidCode(_)
                | Self::InvalidRequest(_)
                | Self::Config(_)
        )
    }
}

impl From<std::io::Error> for QecError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for QecError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = QecError::parse("Expected target", 10);
        assert_eq!(err.to_string(), "Parse error: Expected target at position 10");
    }

    #[test]
    fn test_structural_classification() {
        assert!(QecError::invalid_detector("floor/lid mismatch").is_structural());
        assert!(QecError::invalid_code("empty schedule").is_structural());
        assert!(!QecError::NotYetMeasured("x".into()).is_structural());
        assert!(!QecError::extraction("mixed word").is_structural());
    }

    #[test]
    fn test_conflict_message() {
        let err = QecError::Conflict { tick: 3, qubit: 7 };
        assert!(err.to_string().contains("tick 3"));
    }
}
