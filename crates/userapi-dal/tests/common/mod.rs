//! Common test infrastructure for backend integration tests.
//!
//! Each [`TestBackend`] owns one throwaway container. Requires Docker.

use sqlx::{Connection, MySqlConnection, PgConnection};
use std::time::Duration;
use testcontainers::{runners::AsyncRunner, ContainerAsync, ImageExt};
use testcontainers_modules::{mongo::Mongo, mysql::Mysql, postgres::Postgres};
use userapi_dal::{
    BackendKind, ConnectionConfig, Dal, PoolSettings, ACCOUNT_ID_INDEX, USER_DATA_TABLE,
};

pub const TEST_USER: &str = "testuser";
pub const TEST_PASSWORD: &str = "testpassword";
pub const TEST_DB: &str = "testdb";

#[allow(dead_code)]
enum Container {
    Postgres(ContainerAsync<Postgres>),
    MySql(ContainerAsync<Mysql>),
    Mongo(ContainerAsync<Mongo>),
}

/// Running backend container plus the settings needed to reach it.
pub struct TestBackend {
    _container: Container,
    config: ConnectionConfig,
}

impl TestBackend {
    /// Starts a fresh container for `kind`.
    pub async fn start(kind: BackendKind) -> Self {
        let (container, port) = match kind {
            BackendKind::Postgres => {
                let container = Postgres::default()
                    .with_user(TEST_USER)
                    .with_password(TEST_PASSWORD)
                    .with_db_name(TEST_DB)
                    .start()
                    .await
                    .expect("Failed to start PostgreSQL container");
                let port = container
                    .get_host_port_ipv4(5432)
                    .await
                    .expect("Failed to get PostgreSQL port");
                (Container::Postgres(container), port)
            }
            BackendKind::MySql => {
                let container = Mysql::default()
                    .with_env_var("MYSQL_ROOT_PASSWORD", "rootpass")
                    .with_env_var("MYSQL_DATABASE", TEST_DB)
                    .with_env_var("MYSQL_USER", TEST_USER)
                    .with_env_var("MYSQL_PASSWORD", TEST_PASSWORD)
                    .start()
                    .await
                    .expect("Failed to start MySQL container");
                let port = container
                    .get_host_port_ipv4(3306)
                    .await
                    .expect("Failed to get MySQL port");
                (Container::MySql(container), port)
            }
            BackendKind::Mongo => {
                let container = Mongo::default()
                    .with_env_var("MONGO_INITDB_ROOT_USERNAME", TEST_USER)
                    .with_env_var("MONGO_INITDB_ROOT_PASSWORD", TEST_PASSWORD)
                    .start()
                    .await
                    .expect("Failed to start MongoDB container");
                let port = container
                    .get_host_port_ipv4(27017)
                    .await
                    .expect("Failed to get MongoDB port");
                (Container::Mongo(container), port)
            }
        };

        let config = ConnectionConfig::new(
            kind.as_str(),
            "127.0.0.1",
            port,
            TEST_USER,
            TEST_PASSWORD,
            TEST_DB,
        )
        .expect("valid test config")
        .with_pool(PoolSettings {
            max_connections: 20,
            connect_timeout: Duration::from_secs(5),
            shutdown_timeout: Duration::from_secs(5),
            ..PoolSettings::default()
        })
        .expect("valid test pool");

        Self {
            _container: container,
            config,
        }
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Returns an unconnected DAL pointed at this container.
    pub fn dal(&self) -> Dal {
        Dal::new(self.config.clone())
    }

    /// Returns a connected and migrated DAL.
    pub async fn ready_dal(&self) -> Dal {
        let dal = self.dal();
        connect_with_retry(&dal, 30).await;
        dal.migrate().await.expect("Failed to run migration");
        dal
    }

    /// Counts the storage structures a migration creates: the table for the
    /// relational backends, the named unique index for the document store.
    pub async fn structure_count(&self) -> i64 {
        let c = &self.config;
        match c.backend() {
            BackendKind::Postgres => {
                let url = format!(
                    "postgres://{}:{}@{}:{}/{}",
                    c.user(),
                    c.password(),
                    c.host(),
                    c.port(),
                    c.database()
                );
                let mut conn = PgConnection::connect(&url).await.expect("postgres connect");
                sqlx::query_scalar(
                    "SELECT COUNT(*) FROM information_schema.tables WHERE table_name = $1",
                )
                .bind(USER_DATA_TABLE)
                .fetch_one(&mut conn)
                .await
                .expect("count tables")
            }
            BackendKind::MySql => {
                let url = format!(
                    "mysql://{}:{}@{}:{}/{}",
                    c.user(),
                    c.password(),
                    c.host(),
                    c.port(),
                    c.database()
                );
                let mut conn = MySqlConnection::connect(&url).await.expect("mysql connect");
                sqlx::query_scalar(
                    "SELECT COUNT(*) FROM information_schema.tables \
                     WHERE table_schema = DATABASE() AND table_name = ?",
                )
                .bind(USER_DATA_TABLE)
                .fetch_one(&mut conn)
                .await
                .expect("count tables")
            }
            BackendKind::Mongo => {
                let uri = format!(
                    "mongodb://{}:{}@{}:{}/?authSource=admin",
                    c.user(),
                    c.password(),
                    c.host(),
                    c.port()
                );
                let client = mongodb::Client::with_uri_str(&uri).await.expect("mongo client");
                let names = client
                    .database(c.database())
                    .collection::<mongodb::bson::Document>(USER_DATA_TABLE)
                    .list_index_names()
                    .await
                    .expect("list indexes");
                let count = names.iter().filter(|n| *n == ACCOUNT_ID_INDEX).count();
                i64::try_from(count).expect("index count fits")
            }
        }
    }
}

/// Connects with retry while the container finishes starting up.
pub async fn connect_with_retry(dal: &Dal, max_attempts: u32) {
    let mut attempts = 0;
    loop {
        attempts += 1;
        match dal.connect().await {
            Ok(()) => return,
            Err(e) => {
                if attempts >= max_attempts {
                    panic!(
                        "Failed to connect to {} after {} attempts: {}",
                        dal.backend(),
                        max_attempts,
                        e
                    );
                }
                tokio::time::sleep(Duration::from_secs(1)).await;
            }
        }
    }
}
