//! Relational backends.
//!
//! One generic driver runs the CRUD flow; a [`SqlDialect`] supplies what
//! differs per engine: connect options, statement text with its placeholder
//! style, and the engine's duplicate-key signal. Only the dialect touches
//! concrete sqlx database types.

mod driver;

pub use driver::SqlUserDataDriver;
pub(crate) use driver::translate_error;

use crate::connection::ConnectionConfig;
use async_trait::async_trait;
use sqlx::error::DatabaseError;
use sqlx::{FromRow, Pool};
use userapi_config::BackendKind;
use userapi_core::UserRecord;

/// Database row representation of a user record.
#[derive(Debug, FromRow)]
pub struct UserDataRow {
    pub account_id: String,
    pub payload: String,
}

impl From<UserDataRow> for UserRecord {
    fn from(row: UserDataRow) -> Self {
        UserRecord::new(row.account_id, row.payload)
    }
}

/// Engine-specific part of a relational driver.
#[async_trait]
pub trait SqlDialect: Send + Sync + 'static {
    type Db: sqlx::Database;

    /// Engine name used in log lines.
    const NAME: &'static str;
    const BACKEND: BackendKind;

    const CREATE_TABLE: &'static str;
    /// Binds `account_id, payload`.
    const INSERT: &'static str;
    /// Binds `account_id`; selects `account_id, payload`.
    const SELECT: &'static str;
    /// Binds `account_id`.
    const DELETE: &'static str;

    /// Opens a pool sized and timed from `config`.
    async fn open_pool(config: &ConnectionConfig) -> Result<Pool<Self::Db>, sqlx::Error>;

    /// Runs `sql` with string binds and returns the affected row count.
    async fn execute(
        pool: &Pool<Self::Db>,
        sql: &'static str,
        binds: &[&str],
    ) -> Result<u64, sqlx::Error>;

    /// Runs `sql` bound to `account_id` and returns at most one row.
    async fn fetch_row(
        pool: &Pool<Self::Db>,
        sql: &'static str,
        account_id: &str,
    ) -> Result<Option<UserDataRow>, sqlx::Error>;

    /// Engine-specific duplicate-key check, beyond sqlx's own classification.
    fn is_duplicate_key(err: &(dyn DatabaseError + 'static)) -> bool;
}
