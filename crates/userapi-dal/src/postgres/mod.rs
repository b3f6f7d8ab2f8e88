//! PostgreSQL backend.

use crate::connection::ConnectionConfig;
use crate::sql::{SqlDialect, SqlUserDataDriver, UserDataRow};
use async_trait::async_trait;
use sqlx::error::DatabaseError;
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions, Postgres};
use userapi_config::BackendKind;

/// PostgreSQL implementation of [`crate::UserDataDriver`].
pub type PostgresUserDataDriver = SqlUserDataDriver<PostgresDialect>;

/// SQLSTATE for `unique_violation`.
const UNIQUE_VIOLATION: &str = "23505";

#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresDialect;

#[async_trait]
impl SqlDialect for PostgresDialect {
    type Db = Postgres;

    const NAME: &'static str = "PostgreSQL";
    const BACKEND: BackendKind = BackendKind::Postgres;

    const CREATE_TABLE: &'static str = r#"
        CREATE TABLE IF NOT EXISTS user_data (
            account_id VARCHAR(255) PRIMARY KEY,
            payload TEXT NOT NULL
        )
    "#;
    const INSERT: &'static str = "INSERT INTO user_data (account_id, payload) VALUES ($1, $2)";
    const SELECT: &'static str = "SELECT account_id, payload FROM user_data WHERE account_id = $1";
    const DELETE: &'static str = "DELETE FROM user_data WHERE account_id = $1";

    async fn open_pool(config: &ConnectionConfig) -> Result<PgPool, sqlx::Error> {
        let pool = config.pool();
        let options = PgConnectOptions::new()
            .host(config.host())
            .port(config.port())
            .username(config.user())
            .password(config.password())
            .database(config.database());

        PgPoolOptions::new()
            .min_connections(pool.min_connections)
            .max_connections(pool.max_connections)
            .acquire_timeout(pool.connect_timeout)
            .idle_timeout(Some(pool.idle_timeout))
            .connect_with(options)
            .await
    }

    async fn execute(pool: &PgPool, sql: &'static str, binds: &[&str]) -> Result<u64, sqlx::Error> {
        let mut query = sqlx::query(sql);
        for value in binds {
            query = query.bind(*value);
        }
        Ok(query.execute(pool).await?.rows_affected())
    }

    async fn fetch_row(
        pool: &PgPool,
        sql: &'static str,
        account_id: &str,
    ) -> Result<Option<UserDataRow>, sqlx::Error> {
        sqlx::query_as::<_, UserDataRow>(sql)
            .bind(account_id)
            .fetch_optional(pool)
            .await
    }

    fn is_duplicate_key(err: &(dyn DatabaseError + 'static)) -> bool {
        err.code().as_deref() == Some(UNIQUE_VIOLATION)
    }
}
