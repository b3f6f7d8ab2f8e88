//! The uniform contract every backend driver implements.

use async_trait::async_trait;
use std::fmt;
use userapi_config::BackendKind;
use userapi_core::{UserApiError, UserApiResult, UserRecord};

/// Name of the table (relational) or collection (document store).
pub const USER_DATA_TABLE: &str = "user_data";

/// Lifecycle state of a driver instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    /// Constructed; no pool yet.
    Uninitialized,
    /// Holding a live pool.
    Connected,
    /// Pool released; the instance cannot be reused.
    Closed,
}

impl fmt::Display for DriverState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uninitialized => write!(f, "uninitialized"),
            Self::Connected => write!(f, "connected"),
            Self::Closed => write!(f, "closed"),
        }
    }
}

/// Driver operations, used to pick the error kind a native error maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Connect,
    Migrate,
    Insert,
    Get,
    Delete,
    HealthCheck,
}

impl Operation {
    /// Human-readable verb phrase, used in "not connected" errors.
    #[must_use]
    pub const fn describe(&self) -> &'static str {
        match self {
            Self::Connect => "connect",
            Self::Migrate => "migrate",
            Self::Insert => "insert user data",
            Self::Get => "get user data",
            Self::Delete => "delete user data",
            Self::HealthCheck => "run health check",
        }
    }
}

/// Backend driver contract.
///
/// All three implementations behave identically from the caller's side:
///
/// - inserting an existing account identifier fails with
///   [`UserApiError::Duplicate`]
/// - reading or deleting an absent one fails with [`UserApiError::NotFound`]
/// - every operation except `connect` and `close` fails with
///   [`UserApiError::NotConnected`] outside the connected state
#[async_trait]
pub trait UserDataDriver: Send + Sync + fmt::Debug {
    /// Returns the backend this driver talks to.
    fn backend(&self) -> BackendKind;

    /// Returns the current lifecycle state.
    async fn state(&self) -> DriverState;

    /// Opens the connection pool and verifies it with one round trip.
    async fn connect(&self) -> UserApiResult<()>;

    /// Ensures the user data table or collection and its unique key exist.
    async fn migrate(&self) -> UserApiResult<()>;

    /// Stores a new record.
    async fn insert_user_data(&self, account_id: &str, payload: &str) -> UserApiResult<()>;

    /// Reads the record stored under `account_id`.
    async fn get_user_data(&self, account_id: &str) -> UserApiResult<UserRecord>;

    /// Removes the record stored under `account_id`.
    async fn delete_user_data(&self, account_id: &str) -> UserApiResult<()>;

    /// Performs one round trip to the backend.
    async fn health_check(&self) -> UserApiResult<()>;

    /// Stops admitting operations, drains in-flight ones and releases the pool.
    async fn close(&self) -> UserApiResult<()>;
}

/// Longest account identifier, in characters, every backend can key on.
pub const MAX_ACCOUNT_ID_CHARS: usize = 255;

/// Rejects account identifiers that not every backend can store as a key.
pub(crate) fn validate_account_id(account_id: &str) -> UserApiResult<()> {
    if account_id.is_empty() {
        return Err(UserApiError::validation("account id must not be empty"));
    }
    if account_id.chars().count() > MAX_ACCOUNT_ID_CHARS {
        return Err(UserApiError::validation(format!(
            "account id must be at most {MAX_ACCOUNT_ID_CHARS} characters"
        )));
    }
    if account_id.contains('\0') {
        return Err(UserApiError::validation("account id must not contain NUL"));
    }
    Ok(())
}

/// Rejects payloads that PostgreSQL `TEXT` cannot hold.
pub(crate) fn validate_payload(payload: &str) -> UserApiResult<()> {
    if payload.contains('\0') {
        return Err(UserApiError::validation("payload must not contain NUL"));
    }
    Ok(())
}
