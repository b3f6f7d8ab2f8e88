//! Immutable connection settings for a single backend.

use std::fmt;
use std::time::Duration;
use userapi_config::{
    to_configuration_error, BackendKind, ConfigValidator, DatabaseConfig, UnsupportedBackend,
};
use userapi_core::{UserApiError, UserApiResult};

/// Auth database used when none is configured for the document store.
pub const DEFAULT_AUTH_SOURCE: &str = "admin";

/// Connection pool sizing and timeouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolSettings {
    /// Connections kept open while idle.
    pub min_connections: u32,
    /// Upper bound on concurrently open connections.
    pub max_connections: u32,
    /// Time allowed to establish a connection.
    pub connect_timeout: Duration,
    /// Time after which an unused connection is released.
    pub idle_timeout: Duration,
    /// Time `close` waits for in-flight operations before giving up.
    pub shutdown_timeout: Duration,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            min_connections: 1,
            max_connections: 10,
            connect_timeout: Duration::from_secs(10),
            idle_timeout: Duration::from_secs(600),
            shutdown_timeout: Duration::from_secs(30),
        }
    }
}

/// Describes which backend to use and how to reach it.
///
/// Fields are private; once built the value cannot change.
#[derive(Clone)]
pub struct ConnectionConfig {
    backend: BackendKind,
    host: String,
    port: u16,
    user: String,
    password: String,
    database: String,
    auth_source: String,
    pool: PoolSettings,
}

impl ConnectionConfig {
    /// Builds a connection config.
    ///
    /// # Errors
    ///
    /// Returns [`UserApiError::Configuration`] if `backend` is not a supported
    /// kind (the message names the offending value), `port` is 0, or `host`
    /// or `database` is blank.
    pub fn new(
        backend: &str,
        host: impl Into<String>,
        port: u16,
        user: impl Into<String>,
        password: impl Into<String>,
        database: impl Into<String>,
    ) -> UserApiResult<Self> {
        let backend: BackendKind = backend
            .parse()
            .map_err(|e: UnsupportedBackend| UserApiError::configuration(e.to_string()))?;

        if port == 0 {
            return Err(UserApiError::configuration(
                "Invalid database port: 0 (must be 1-65535)",
            ));
        }

        let host: String = host.into();
        let database: String = database.into();
        if host.trim().is_empty() {
            return Err(UserApiError::configuration("database host must not be empty"));
        }
        if database.trim().is_empty() {
            return Err(UserApiError::configuration("database name must not be empty"));
        }

        Ok(Self {
            backend,
            host,
            port,
            user: user.into(),
            password: password.into(),
            database,
            auth_source: DEFAULT_AUTH_SOURCE.to_string(),
            pool: PoolSettings::default(),
        })
    }

    /// Returns a copy with different pool settings.
    ///
    /// # Errors
    ///
    /// Returns [`UserApiError::Configuration`] if `max_connections` is 0 or
    /// below `min_connections`.
    pub fn with_pool(mut self, pool: PoolSettings) -> UserApiResult<Self> {
        if pool.max_connections == 0 {
            return Err(UserApiError::configuration(
                "max_connections must be at least 1",
            ));
        }
        if pool.min_connections > pool.max_connections {
            return Err(UserApiError::configuration(format!(
                "Invalid pool size: min ({}) cannot be greater than max ({})",
                pool.min_connections, pool.max_connections
            )));
        }
        self.pool = pool;
        Ok(self)
    }

    /// Returns a copy with a different document-store auth database.
    #[must_use]
    pub fn with_auth_source(mut self, auth_source: impl Into<String>) -> Self {
        self.auth_source = auth_source.into();
        self
    }

    #[must_use]
    pub const fn backend(&self) -> BackendKind {
        self.backend
    }

    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    #[must_use]
    pub const fn port(&self) -> u16 {
        self.port
    }

    #[must_use]
    pub fn user(&self) -> &str {
        &self.user
    }

    #[must_use]
    pub fn password(&self) -> &str {
        &self.password
    }

    #[must_use]
    pub fn database(&self) -> &str {
        &self.database
    }

    #[must_use]
    pub fn auth_source(&self) -> &str {
        &self.auth_source
    }

    #[must_use]
    pub const fn pool(&self) -> &PoolSettings {
        &self.pool
    }
}

impl TryFrom<&DatabaseConfig> for ConnectionConfig {
    type Error = UserApiError;

    fn try_from(config: &DatabaseConfig) -> Result<Self, Self::Error> {
        let errors = ConfigValidator::validate_database(config);
        if !errors.is_empty() {
            return Err(to_configuration_error(&errors));
        }

        let connection = Self::new(
            &config.kind,
            config.host.clone(),
            config.port,
            config.user.clone(),
            config.password.clone(),
            config.name.clone(),
        )?
        .with_pool(PoolSettings {
            min_connections: config.min_connections,
            max_connections: config.max_connections,
            connect_timeout: config.connect_timeout(),
            idle_timeout: config.idle_timeout(),
            shutdown_timeout: config.shutdown_timeout(),
        })?;

        Ok(match &config.auth_source {
            Some(source) => connection.with_auth_source(source.clone()),
            None => connection,
        })
    }
}

impl fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("backend", &self.backend)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"REDACTED")
            .field("database", &self.database)
            .field("auth_source", &self.auth_source)
            .field("pool", &self.pool)
            .finish()
    }
}
