//! Error types for NimbusData.
//!
//! Defines the main error enum used throughout the crate.

use thiserror::Error;

/// Main error type for NimbusData operations.
#[derive(Error, Debug)]
pub enum NimbusError {
    /// The store could not be reached, authenticated, or answered in time.
    #[error("Connection error: {0}")]
    Connection(String),

    /// The statement was rejected or failed while executing (syntax errors,
    /// constraint violations, type mismatches, failed commits).
    #[error("Execution error{}: {message}", sqlstate_suffix(.code))]
    Execution {
        /// SQLSTATE or driver diagnostic code, when the store reported one.
        code: Option<String>,
        message: String,
    },

    /// Anything not classified above (misconfiguration, result processing defects).
    #[error("Unexpected error: {0}")]
    Unexpected(String),

    /// Process configuration errors (invalid bind address, etc.)
    #[error("Configuration error: {0}")]
    Config(String),
}

fn sqlstate_suffix(code: &Option<String>) -> String {
    code.as_ref()
        .map(|c| format!(" (SQLSTATE {c})"))
        .unwrap_or_default()
}

impl NimbusError {
    /// Creates a connection error with the given message.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    /// Creates an execution error without a diagnostic code.
    pub fn execution(msg: impl Into<String>) -> Self {
        Self::Execution {
            code: None,
            message: msg.into(),
        }
    }

    /// Creates an execution error carrying the store's diagnostic code.
    pub fn execution_with_code(code: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Execution {
            code: Some(code.into()),
            message: msg.into(),
        }
    }

    /// Creates an unexpected error with the given message.
    pub fn unexpected(msg: impl Into<String>) -> Self {
        Self::Unexpected(msg.into())
    }

    /// Creates a configuration error with the given message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Returns true for failures raised by the store while running a statement.
    pub fn is_execution(&self) -> bool {
        matches!(self, Self::Execution { .. })
    }

    /// Returns the SQLSTATE/diagnostic code, if any.
    pub fn sqlstate(&self) -> Option<&str> {
        match self {
            Self::Execution { code, .. } => code.as_deref(),
            _ => None,
        }
    }

    /// Returns the error category as a string for display purposes.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Connection(_) => "Connection Error",
            Self::Execution { .. } => "Execution Error",
            Self::Unexpected(_) => "Unexpected Error",
            Self::Config(_) => "Configuration Error",
        }
    }
}

/// Result type alias using NimbusError.
pub type Result<T> = std::result::Result<T, NimbusError>;
