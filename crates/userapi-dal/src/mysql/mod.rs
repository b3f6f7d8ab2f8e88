//! MySQL backend.

use crate::connection::ConnectionConfig;
use crate::sql::{SqlDialect, SqlUserDataDriver, UserDataRow};
use async_trait::async_trait;
use sqlx::error::DatabaseError;
use sqlx::mysql::{MySql, MySqlConnectOptions, MySqlDatabaseError, MySqlPool, MySqlPoolOptions};
use userapi_config::BackendKind;

/// MySQL implementation of [`crate::UserDataDriver`].
pub type MySqlUserDataDriver = SqlUserDataDriver<MySqlDialect>;

/// Server error number for `ER_DUP_ENTRY`.
const ER_DUP_ENTRY: u16 = 1062;

#[derive(Debug, Clone, Copy, Default)]
pub struct MySqlDialect;

#[async_trait]
impl SqlDialect for MySqlDialect {
    type Db = MySql;

    const NAME: &'static str = "MySQL";
    const BACKEND: BackendKind = BackendKind::MySql;

    // utf8mb4_0900_bin is binary and NO PAD: "a", "A" and "a " are three keys,
    // as on the other backends. Requires MySQL 8.0.
    const CREATE_TABLE: &'static str = r#"
        CREATE TABLE IF NOT EXISTS user_data (
            account_id VARCHAR(255) CHARACTER SET utf8mb4 COLLATE utf8mb4_0900_bin PRIMARY KEY,
            payload LONGTEXT NOT NULL
        ) DEFAULT CHARSET = utf8mb4
    "#;
    const INSERT: &'static str = "INSERT INTO user_data (account_id, payload) VALUES (?, ?)";
    const SELECT: &'static str = "SELECT account_id, payload FROM user_data WHERE account_id = ?";
    const DELETE: &'static str = "DELETE FROM user_data WHERE account_id = ?";

    async fn open_pool(config: &ConnectionConfig) -> Result<MySqlPool, sqlx::Error> {
        let pool = config.pool();
        let options = MySqlConnectOptions::new()
            .host(config.host())
            .port(config.port())
            .username(config.user())
            .password(config.password())
            .database(config.database());

        MySqlPoolOptions::new()
            .min_connections(pool.min_connections)
            .max_connections(pool.max_connections)
            .acquire_timeout(pool.connect_timeout)
            .idle_timeout(Some(pool.idle_timeout))
            .connect_with(options)
            .await
    }

    async fn execute(
        pool: &MySqlPool,
        sql: &'static str,
        binds: &[&str],
    ) -> Result<u64, sqlx::Error> {
        let mut query = sqlx::query(sql);
        for value in binds {
            query = query.bind(*value);
        }
        Ok(query.execute(pool).await?.rows_affected())
    }

    async fn fetch_row(
        pool: &MySqlPool,
        sql: &'static str,
        account_id: &str,
    ) -> Result<Option<UserDataRow>, sqlx::Error> {
        sqlx::query_as::<_, UserDataRow>(sql)
            .bind(account_id)
            .fetch_optional(pool)
            .await
    }

    fn is_duplicate_key(err: &(dyn DatabaseError + 'static)) -> bool {
        err.try_downcast_ref::<MySqlDatabaseError>()
            .is_some_and(|e| e.number() == ER_DUP_ENTRY)
    }
}
