//! # UserAPI DAL
//!
//! Backend-agnostic storage for user data records:
//!
//! ```text
//! Caller
//!   ↓  Dal                         (facade, one per process)
//!   ↓  Box<dyn UserDataDriver>     (uniform contract)
//! SqlUserDataDriver<PostgresDialect | MySqlDialect> | MongoUserDataDriver
//!   ↓  ConnectionState<pool>       (Uninitialized → Connected → Closed)
//! PostgreSQL | MySQL | MongoDB
//! ```
//!
//! The backend is picked once from [`ConnectionConfig`]; callers never see
//! which one is in use. Native driver errors are translated into
//! [`userapi_core::UserApiError`] before they leave this crate.

pub mod connection;
pub mod dal;
pub mod driver;
pub mod mongo;
pub mod mysql;
pub mod postgres;
pub mod sql;
pub mod state;

pub use connection::{ConnectionConfig, PoolSettings, DEFAULT_AUTH_SOURCE};
pub use dal::Dal;
pub use driver::{
    DriverState, Operation, UserDataDriver, MAX_ACCOUNT_ID_CHARS, USER_DATA_TABLE,
};
pub use mongo::{MongoUserDataDriver, ACCOUNT_ID_INDEX};
pub use mysql::{MySqlDialect, MySqlUserDataDriver};
pub use postgres::{PostgresDialect, PostgresUserDataDriver};
pub use sql::{SqlDialect, SqlUserDataDriver};
pub use state::{ConnectionState, Lease};
pub use userapi_config::BackendKind;
