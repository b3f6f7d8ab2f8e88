//! Backend selection and the facade handed to callers.

use crate::connection::ConnectionConfig;
use crate::driver::{DriverState, UserDataDriver};
use crate::mongo::MongoUserDataDriver;
use crate::mysql::MySqlUserDataDriver;
use crate::postgres::PostgresUserDataDriver;
use tracing::{info_span, Span};
use userapi_config::{BackendKind, DatabaseConfig};
use userapi_core::{UserApiResult, UserRecord};

/// Data access layer.
///
/// Owns exactly one driver, chosen from the backend kind at construction.
/// Construction performs no I/O; call [`connect`](Self::connect) and then
/// [`migrate`](Self::migrate) once at startup, and [`close`](Self::close) at
/// shutdown. The facade is `Send + Sync` and meant to be shared through an
/// `Arc` by concurrent request handlers.
#[derive(Debug)]
pub struct Dal {
    driver: Box<dyn UserDataDriver>,
}

impl Dal {
    /// Creates a DAL whose driver records under a fresh `dal` span.
    #[must_use]
    pub fn new(config: ConnectionConfig) -> Self {
        let span = info_span!("dal", backend = %config.backend());
        Self::with_span(config, span)
    }

    /// Creates a DAL whose driver records under `span`.
    #[must_use]
    pub fn with_span(config: ConnectionConfig, span: Span) -> Self {
        let driver: Box<dyn UserDataDriver> = match config.backend() {
            BackendKind::Postgres => Box::new(PostgresUserDataDriver::new(config, span)),
            BackendKind::MySql => Box::new(MySqlUserDataDriver::new(config, span)),
            BackendKind::Mongo => Box::new(MongoUserDataDriver::new(config, span)),
        };
        Self { driver }
    }

    /// Validates raw configuration and creates the matching DAL.
    ///
    /// # Errors
    ///
    /// Returns [`userapi_core::UserApiError::Configuration`] before any I/O
    /// for an unsupported backend kind, invalid port, blank host or database
    /// name, or inconsistent pool sizes.
    pub fn from_config(config: &DatabaseConfig) -> UserApiResult<Self> {
        Ok(Self::new(ConnectionConfig::try_from(config)?))
    }

    /// Wraps an already constructed driver.
    #[must_use]
    pub fn from_driver(driver: Box<dyn UserDataDriver>) -> Self {
        Self { driver }
    }

    /// Returns the underlying driver.
    #[must_use]
    pub fn driver(&self) -> &dyn UserDataDriver {
        self.driver.as_ref()
    }

    #[must_use]
    pub fn backend(&self) -> BackendKind {
        self.driver.backend()
    }

    pub async fn state(&self) -> DriverState {
        self.driver.state().await
    }

    pub async fn connect(&self) -> UserApiResult<()> {
        self.driver.connect().await
    }

    pub async fn migrate(&self) -> UserApiResult<()> {
        self.driver.migrate().await
    }

    pub async fn insert_user_data(&self, account_id: &str, payload: &str) -> UserApiResult<()> {
        self.driver.insert_user_data(account_id, payload).await
    }

    pub async fn get_user_data(&self, account_id: &str) -> UserApiResult<UserRecord> {
        self.driver.get_user_data(account_id).await
    }

    pub async fn delete_user_data(&self, account_id: &str) -> UserApiResult<()> {
        self.driver.delete_user_data(account_id).await
    }

    pub async fn health_check(&self) -> UserApiResult<()> {
        self.driver.health_check().await
    }

    pub async fn close(&self) -> UserApiResult<()> {
        self.driver.close().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::PoolSettings;
    use crate::driver::Operation;
    use crate::state::ConnectionState;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use userapi_core::UserApiError;

    type Store = Arc<Mutex<HashMap<String, String>>>;

    /// In-memory driver for exercising the facade.
    #[derive(Debug, Default)]
    struct InMemoryDriver {
        state: ConnectionState<Store>,
    }

    #[async_trait]
    impl UserDataDriver for InMemoryDriver {
        fn backend(&self) -> BackendKind {
            BackendKind::Postgres
        }

        async fn state(&self) -> DriverState {
            self.state.state().await
        }

        async fn connect(&self) -> UserApiResult<()> {
            self.state.connect(|| async { Ok(Store::default()) }).await
        }

        async fn migrate(&self) -> UserApiResult<()> {
            self.state.handle(Operation::Migrate).await.map(|_| ())
        }

        async fn insert_user_data(&self, account_id: &str, payload: &str) -> UserApiResult<()> {
            let store = self.state.handle(Operation::Insert).await?;
            let mut map = store.lock().unwrap();
            if map.contains_key(account_id) {
                return Err(UserApiError::duplicate(account_id));
            }
            map.insert(account_id.to_string(), payload.to_string());
            Ok(())
        }

        async fn get_user_data(&self, account_id: &str) -> UserApiResult<UserRecord> {
            let store = self.state.handle(Operation::Get).await?;
            let map = store.lock().unwrap();
            map.get(account_id)
                .map(|payload| UserRecord::new(account_id, payload.clone()))
                .ok_or_else(|| UserApiError::not_found(account_id))
        }

        async fn delete_user_data(&self, account_id: &str) -> UserApiResult<()> {
            let store = self.state.handle(Operation::Delete).await?;
            let removed = store.lock().unwrap().remove(account_id);
            removed.map(|_| ()).ok_or_else(|| UserApiError::not_found(account_id))
        }

        async fn health_check(&self) -> UserApiResult<()> {
            self.state.handle(Operation::HealthCheck).await.map(|_| ())
        }

        async fn close(&self) -> UserApiResult<()> {
            self.state.close().await;
            Ok(())
        }
    }

    fn config(kind: &str, port: u16) -> ConnectionConfig {
        ConnectionConfig::new(kind, "127.0.0.1", port, "testuser", "testpassword", "testdb")
            .unwrap()
            .with_pool(PoolSettings {
                connect_timeout: Duration::from_secs(1),
                shutdown_timeout: Duration::from_secs(1),
                ..PoolSettings::default()
            })
            .unwrap()
    }

    fn all_backends() -> Vec<Dal> {
        vec![
            Dal::new(config("postgres", 5432)),
            Dal::new(config("mysql", 3306)),
            Dal::new(config("mongo", 27017)),
        ]
    }

    // =============================================================================
    // Factory Tests
    // =============================================================================

    #[test]
    fn test_factory_selects_driver_by_kind() {
        let backends: Vec<_> = all_backends().iter().map(Dal::backend).collect();
        assert_eq!(
            backends,
            vec![BackendKind::Postgres, BackendKind::MySql, BackendKind::Mongo]
        );
    }

    #[test]
    fn test_from_config_rejects_unsupported_kind() {
        let db = DatabaseConfig {
            kind: "couchdb".to_string(),
            ..DatabaseConfig::default()
        };

        let err = Dal::from_config(&db).unwrap_err();
        assert!(matches!(err, UserApiError::Configuration(ref msg) if msg.contains("couchdb")));
    }

    #[test]
    fn test_from_config_rejects_invalid_pool_for_every_backend() {
        for kind in ["postgres", "mysql", "mongo"] {
            let db = DatabaseConfig {
                kind: kind.to_string(),
                min_connections: 5,
                max_connections: 2,
                ..DatabaseConfig::default()
            };

            let err = Dal::from_config(&db).unwrap_err();
            assert!(
                matches!(err, UserApiError::Configuration(ref msg) if msg.contains("pool size")),
                "{kind}: got {err:?}"
            );
        }
    }

    #[test]
    fn test_from_config_rejects_blank_host() {
        let db = DatabaseConfig {
            kind: "mongo".to_string(),
            host: "  ".to_string(),
            ..DatabaseConfig::default()
        };
        assert!(matches!(
            Dal::from_config(&db),
            Err(UserApiError::Configuration(_))
        ));
    }

    #[tokio::test]
    async fn test_new_dal_is_uninitialized() {
        for dal in all_backends() {
            assert_eq!(dal.state().await, DriverState::Uninitialized);
        }
    }

    // =============================================================================
    // Lifecycle Tests (no backend required)
    // =============================================================================

    #[tokio::test]
    async fn test_operations_before_connect_fail_not_connected() {
        for dal in all_backends() {
            assert!(matches!(dal.migrate().await, Err(UserApiError::NotConnected { .. })));
            assert!(matches!(
                dal.insert_user_data("id1", "payload").await,
                Err(UserApiError::NotConnected { operation: "insert user data" })
            ));
            assert!(matches!(
                dal.get_user_data("id1").await,
                Err(UserApiError::NotConnected { operation: "get user data" })
            ));
            assert!(matches!(
                dal.delete_user_data("id1").await,
                Err(UserApiError::NotConnected { operation: "delete user data" })
            ));
            assert!(matches!(dal.health_check().await, Err(UserApiError::NotConnected { .. })));
        }
    }

    #[tokio::test]
    async fn test_operations_after_close_fail_not_connected() {
        for dal in all_backends() {
            dal.close().await.unwrap();
            assert_eq!(dal.state().await, DriverState::Closed);

            assert!(matches!(
                dal.get_user_data("id1").await,
                Err(UserApiError::NotConnected { .. })
            ));
            assert!(matches!(
                dal.insert_user_data("id1", "payload").await,
                Err(UserApiError::NotConnected { .. })
            ));
            assert_eq!(dal.connect().await, Err(UserApiError::Closed));
        }
    }

    #[tokio::test]
    async fn test_second_close_is_noop() {
        for dal in all_backends() {
            assert!(dal.close().await.is_ok());
            assert!(dal.close().await.is_ok());
        }
    }

    #[tokio::test]
    async fn test_connect_refused_maps_to_connection_error() {
        // Nothing listens on port 1.
        for dal in [
            Dal::new(config("postgres", 1)),
            Dal::new(config("mysql", 1)),
            Dal::new(config("mongo", 1)),
        ] {
            let err = dal.connect().await.unwrap_err();
            assert!(
                matches!(err, UserApiError::Connection(_)),
                "{}: expected connection error, got {err:?}",
                dal.backend()
            );
            assert_eq!(dal.state().await, DriverState::Uninitialized);
        }
    }

    // =============================================================================
    // Facade Delegation Tests
    // =============================================================================

    fn in_memory() -> Dal {
        Dal::from_driver(Box::new(InMemoryDriver::default()))
    }

    #[tokio::test]
    async fn test_facade_crud_round_trip() {
        let dal = in_memory();
        dal.connect().await.unwrap();
        dal.migrate().await.unwrap();

        dal.insert_user_data("id1", "payload").await.unwrap();
        let record = dal.get_user_data("id1").await.unwrap();
        assert_eq!(record.payload, "payload");
        assert!(record.metadata.is_none());

        dal.delete_user_data("id1").await.unwrap();
        assert_eq!(
            dal.get_user_data("id1").await,
            Err(UserApiError::not_found("id1"))
        );
    }

    #[tokio::test]
    async fn test_facade_connect_twice() {
        let dal = in_memory();
        dal.connect().await.unwrap();
        assert_eq!(dal.connect().await, Err(UserApiError::AlreadyConnected));
        assert_eq!(dal.state().await, DriverState::Connected);
    }

    #[tokio::test]
    async fn test_facade_is_shareable_across_tasks() {
        let dal = Arc::new(in_memory());
        dal.connect().await.unwrap();

        let handles: Vec<_> = (0..16)
            .map(|i| {
                let dal = Arc::clone(&dal);
                tokio::spawn(async move {
                    dal.insert_user_data(&format!("acct-{i}"), &format!("data-{i}"))
                        .await
                })
            })
            .collect();

        for handle in handles {
            handle.await.unwrap().unwrap();
        }
        for i in 0..16 {
            let record = dal.get_user_data(&format!("acct-{i}")).await.unwrap();
            assert_eq!(record.payload, format!("data-{i}"));
        }
    }
}
