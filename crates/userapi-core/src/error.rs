//! Error taxonomy shared by every layer of the user-data service.

use thiserror::Error;

/// Unified error type returned across the data access layer boundary.
///
/// Backend drivers translate their native errors into one of these variants
/// before returning, so callers never see a `sqlx` or `mongodb` error type.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UserApiError {
    // ============ Startup Errors ============
    /// Unsupported backend kind or malformed configuration
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Network or authentication failure while connecting
    #[error("Connection error: {0}")]
    Connection(String),

    /// Schema or index creation rejected by the backend
    #[error("Migration error: {0}")]
    Migration(String),

    // ============ Record Errors ============
    /// No record stored under the account identifier
    #[error("User data not found for account {account_id}")]
    NotFound { account_id: String },

    /// A record already exists under the account identifier
    #[error("User data already exists for account {account_id}")]
    Duplicate { account_id: String },

    /// Input rejected before reaching the backend
    #[error("Validation error: {0}")]
    Validation(String),

    /// Backend failure during a CRUD operation
    #[error("I/O error: {0}")]
    Io(String),

    // ============ Lifecycle Errors ============
    /// Operation invoked before `connect` or after `close`
    #[error("Not connected: cannot {operation}")]
    NotConnected { operation: &'static str },

    /// `connect` invoked on a driver that already holds a pool
    #[error("Already connected")]
    AlreadyConnected,

    /// `connect` invoked on a driver that has been closed
    #[error("Driver is closed and cannot be reopened")]
    Closed,
}

impl UserApiError {
    /// Returns a machine-readable error code.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "CONFIGURATION_ERROR",
            Self::Connection(_) => "CONNECTION_ERROR",
            Self::Migration(_) => "MIGRATION_ERROR",
            Self::NotFound { .. } => "NOT_FOUND",
            Self::Duplicate { .. } => "DUPLICATE",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Io(_) => "IO_ERROR",
            Self::NotConnected { .. } => "NOT_CONNECTED",
            Self::AlreadyConnected => "ALREADY_CONNECTED",
            Self::Closed => "CLOSED",
        }
    }

    /// Creates a configuration error.
    #[must_use]
    pub fn configuration<T: Into<String>>(message: T) -> Self {
        Self::Configuration(message.into())
    }

    /// Creates a not found error for an account identifier.
    #[must_use]
    pub fn not_found<T: ToString>(account_id: T) -> Self {
        Self::NotFound {
            account_id: account_id.to_string(),
        }
    }

    /// Creates a duplicate error for an account identifier.
    #[must_use]
    pub fn duplicate<T: ToString>(account_id: T) -> Self {
        Self::Duplicate {
            account_id: account_id.to_string(),
        }
    }

    /// Creates a validation error.
    #[must_use]
    pub fn validation<T: Into<String>>(message: T) -> Self {
        Self::Validation(message.into())
    }

    /// Checks if the caller may retry this error with backoff.
    #[must_use]
    pub const fn is_retriable(&self) -> bool {
        matches!(self, Self::Connection(_) | Self::Io(_))
    }

    /// Checks if this error should abort process startup.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::Configuration(_) | Self::Migration(_))
    }
}
