//! Relational user data driver, shared by every SQL dialect.

use super::SqlDialect;
use crate::connection::ConnectionConfig;
use crate::driver::{
    validate_account_id, validate_payload, DriverState, Operation, UserDataDriver,
};
use crate::state::ConnectionState;
use async_trait::async_trait;
use sqlx::Pool;
use std::marker::PhantomData;
use tracing::{debug, debug_span, info, warn, Instrument, Span};
use userapi_config::BackendKind;
use userapi_core::{UserApiError, UserApiResult, UserRecord};

/// [`UserDataDriver`] over a sqlx pool for dialect `D`.
pub struct SqlUserDataDriver<D: SqlDialect> {
    config: ConnectionConfig,
    state: ConnectionState<Pool<D::Db>>,
    span: Span,
    dialect: PhantomData<D>,
}

impl<D: SqlDialect> SqlUserDataDriver<D> {
    /// Creates an unconnected driver recording under `span`.
    #[must_use]
    pub fn new(config: ConnectionConfig, span: Span) -> Self {
        Self {
            config,
            state: ConnectionState::new(),
            span,
            dialect: PhantomData,
        }
    }

    async fn open_pool(&self) -> UserApiResult<Pool<D::Db>> {
        info!(
            host = %self.config.host(),
            port = self.config.port(),
            database = %self.config.database(),
            max_connections = self.config.pool().max_connections,
            "Connecting to {}...",
            D::NAME
        );

        let pool = D::open_pool(&self.config).await.map_err(|e| {
            warn!("Failed to connect to {}: {}", D::NAME, e);
            translate_error::<D>(Operation::Connect, None, &e)
        })?;

        if let Err(e) = D::execute(&pool, "SELECT 1", &[]).await {
            pool.close().await;
            return Err(translate_error::<D>(Operation::Connect, None, &e));
        }

        info!("{} connection pool established", D::NAME);
        Ok(pool)
    }
}

#[async_trait]
impl<D: SqlDialect> UserDataDriver for SqlUserDataDriver<D> {
    fn backend(&self) -> BackendKind {
        D::BACKEND
    }

    async fn state(&self) -> DriverState {
        self.state.state().await
    }

    async fn connect(&self) -> UserApiResult<()> {
        let span = debug_span!(parent: &self.span, "connect");
        self.state.connect(|| self.open_pool()).instrument(span).await
    }

    async fn migrate(&self) -> UserApiResult<()> {
        let span = debug_span!(parent: &self.span, "migrate");
        async {
            let pool = self.state.handle(Operation::Migrate).await?;
            info!("Ensuring user_data table exists");
            D::execute(&pool, D::CREATE_TABLE, &[])
                .await
                .map_err(|e| translate_error::<D>(Operation::Migrate, None, &e))?;
            info!("{} migration completed", D::NAME);
            Ok(())
        }
        .instrument(span)
        .await
    }

    async fn insert_user_data(&self, account_id: &str, payload: &str) -> UserApiResult<()> {
        let span = debug_span!(parent: &self.span, "insert_user_data", account_id);
        async {
            let pool = self.state.handle(Operation::Insert).await?;
            validate_account_id(account_id)?;
            validate_payload(payload)?;
            debug!("Inserting user data");

            D::execute(&pool, D::INSERT, &[account_id, payload])
                .await
                .map_err(|e| translate_error::<D>(Operation::Insert, Some(account_id), &e))?;
            Ok(())
        }
        .instrument(span)
        .await
    }

    async fn get_user_data(&self, account_id: &str) -> UserApiResult<UserRecord> {
        let span = debug_span!(parent: &self.span, "get_user_data", account_id);
        async {
            let pool = self.state.handle(Operation::Get).await?;
            validate_account_id(account_id)?;
            debug!("Fetching user data");

            let row = D::fetch_row(&pool, D::SELECT, account_id)
                .await
                .map_err(|e| translate_error::<D>(Operation::Get, Some(account_id), &e))?;

            row.map(UserRecord::from)
                .ok_or_else(|| UserApiError::not_found(account_id))
        }
        .instrument(span)
        .await
    }

    async fn delete_user_data(&self, account_id: &str) -> UserApiResult<()> {
        let span = debug_span!(parent: &self.span, "delete_user_data", account_id);
        async {
            let pool = self.state.handle(Operation::Delete).await?;
            validate_account_id(account_id)?;
            debug!("Deleting user data");

            let rows_affected = D::execute(&pool, D::DELETE, &[account_id])
                .await
                .map_err(|e| translate_error::<D>(Operation::Delete, Some(account_id), &e))?;

            if rows_affected == 0 {
                return Err(UserApiError::not_found(account_id));
            }
            Ok(())
        }
        .instrument(span)
        .await
    }

    async fn health_check(&self) -> UserApiResult<()> {
        let span = debug_span!(parent: &self.span, "health_check");
        async {
            let pool = self.state.handle(Operation::HealthCheck).await?;
            D::execute(&pool, "SELECT 1", &[])
                .await
                .map_err(|e| translate_error::<D>(Operation::HealthCheck, None, &e))?;
            Ok(())
        }
        .instrument(span)
        .await
    }

    async fn close(&self) -> UserApiResult<()> {
        let span = debug_span!(parent: &self.span, "close");
        async {
            let Some(pool) = self.state.close().await else {
                debug!("{} driver already closed or never connected", D::NAME);
                return Ok(());
            };

            info!("Closing {} connection pool...", D::NAME);
            let deadline = self.config.pool().shutdown_timeout;
            if !self.state.drain(deadline).await {
                warn!(?deadline, "In-flight operations still running at the shutdown deadline");
            }
            if tokio::time::timeout(deadline, pool.close()).await.is_err() {
                warn!(?deadline, "{} pool did not release before the shutdown deadline", D::NAME);
            } else {
                info!("{} connection pool closed", D::NAME);
            }
            Ok(())
        }
        .instrument(span)
        .await
    }
}

impl<D: SqlDialect> std::fmt::Debug for SqlUserDataDriver<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqlUserDataDriver")
            .field("dialect", &D::NAME)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Maps a sqlx error raised by `operation` into the shared taxonomy.
pub(crate) fn translate_error<D: SqlDialect>(
    operation: Operation,
    account_id: Option<&str>,
    err: &sqlx::Error,
) -> UserApiError {
    match operation {
        Operation::Connect => UserApiError::Connection(err.to_string()),
        Operation::Migrate => UserApiError::Migration(err.to_string()),
        _ => match err {
            sqlx::Error::Database(db_err)
                if db_err.is_unique_violation() || D::is_duplicate_key(db_err.as_ref()) =>
            {
                UserApiError::duplicate(account_id.unwrap_or_default())
            }
            sqlx::Error::RowNotFound => UserApiError::not_found(account_id.unwrap_or_default()),
            // Pool released by close after the deadline.
            sqlx::Error::PoolClosed => UserApiError::NotConnected {
                operation: operation.describe(),
            },
            _ => UserApiError::Io(err.to_string()),
        },
    }
}
