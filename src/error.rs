//! Error types for bq-report.
//!
//! One variant per pipeline stage, so callers can tell a bad key file from a
//! rejected query from an unwritable output path.

use thiserror::Error;

/// Main error type for bq-report operations.
#[derive(Error, Debug)]
pub enum ReportError {
    /// Credentials file missing, unreadable, or not a service-account key.
    #[error("Credential error: {0}")]
    Credential(String),

    /// The remote service rejected the project/credentials pairing.
    #[error("Authentication error: {0}")]
    Auth(String),

    /// SQL file missing or unreadable.
    #[error("Input error: {0}")]
    Input(String),

    /// Query rejected by BigQuery, timed out, or failed on the network.
    #[error("Query error: {0}")]
    Query(String),

    /// Output document could not be written.
    #[error("Output error: {0}")]
    Output(String),

    /// Configuration errors (invalid config file, missing project id, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal application errors (unexpected states, bugs, etc.)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ReportError {
    /// Creates a credential error with the given message.
    pub fn credential(msg: impl Into<String>) -> Self {
        Self::Credential(msg.into())
    }

    /// Creates an authentication error with the given message.
    pub fn auth(msg: impl Into<String>) -> Self {
        Self::Auth(msg.into())
    }

    /// Creates an input error with the given message.
    pub fn input(msg: impl Into<String>) -> Self {
        Self::Input(msg.into())
    }

    /// Creates a query error with the given message.
    pub fn query(msg: impl Into<String>) -> Self {
        Self::Query(msg.into())
    }

    /// Creates an output error with the given message.
    pub fn output(msg: impl Into<String>) -> Self {
        Self::Output(msg.into())
    }

    /// Creates a configuration error with the given message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Creates an internal error with the given message.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Returns the error category as a string for display purposes.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Credential(_) => "Credential Error",
            Self::Auth(_) => "Auth Error",
            Self::Input(_) => "Input Error",
            Self::Query(_) => "Query Error",
            Self::Output(_) => "Output Error",
            Self::Config(_) => "Configuration Error",
            Self::Internal(_) => "Internal Error",
        }
    }
}

/// Result type alias using ReportError.
pub type Result<T> = std::result::Result<T, ReportError>;
