//! MongoDB user data driver.
//!
//! Documents must be unique on `account_id`, which unlike a relational
//! primary key needs an explicit unique index. [`MongoUserDataDriver::migrate`]
//! creates it under a fixed name so repeat calls are no-ops.

use crate::connection::ConnectionConfig;
use crate::driver::{
    validate_account_id, validate_payload, DriverState, Operation, UserDataDriver,
    USER_DATA_TABLE,
};
use crate::state::ConnectionState;
use async_trait::async_trait;
use mongodb::bson::doc;
use mongodb::error::{ErrorKind, WriteFailure};
use mongodb::options::{ClientOptions, Credential, IndexOptions, ServerAddress};
use mongodb::{Client, Collection, IndexModel};
use serde::{Deserialize, Serialize};
use tracing::{debug, debug_span, info, warn, Instrument, Span};
use userapi_config::BackendKind;
use userapi_core::{UserApiError, UserApiResult, UserRecord};

/// Server error code for a duplicate key on a unique index.
const DUPLICATE_KEY: i32 = 11000;

/// Name of the unique index over `account_id`.
pub const ACCOUNT_ID_INDEX: &str = "account_id_unique";

/// Stored document shape. `_id` is left to the server.
#[derive(Debug, Serialize, Deserialize)]
struct UserDataDocument {
    account_id: String,
    payload: String,
}

impl From<UserDataDocument> for UserRecord {
    fn from(document: UserDataDocument) -> Self {
        UserRecord::new(document.account_id, document.payload)
    }
}

/// Live connection: the pooled client plus the target database name.
#[derive(Debug, Clone)]
struct MongoHandle {
    client: Client,
    database: String,
}

impl MongoHandle {
    fn collection(&self) -> Collection<UserDataDocument> {
        self.client
            .database(&self.database)
            .collection(USER_DATA_TABLE)
    }
}

/// MongoDB implementation of [`UserDataDriver`].
pub struct MongoUserDataDriver {
    config: ConnectionConfig,
    state: ConnectionState<MongoHandle>,
    span: Span,
}

impl MongoUserDataDriver {
    /// Creates an unconnected driver recording under `span`.
    #[must_use]
    pub fn new(config: ConnectionConfig, span: Span) -> Self {
        Self {
            config,
            state: ConnectionState::new(),
            span,
        }
    }

    fn client_options(&self) -> UserApiResult<ClientOptions> {
        let address = format!("{}:{}", self.config.host(), self.config.port());
        let address = ServerAddress::parse(address)
            .map_err(|e| UserApiError::configuration(format!("Invalid MongoDB address: {e}")))?;
        let pool = self.config.pool();

        let mut options = ClientOptions::builder().hosts(vec![address]).build();
        options.app_name = Some("userapi".to_string());
        options.min_pool_size = Some(pool.min_connections);
        options.max_pool_size = Some(pool.max_connections);
        options.connect_timeout = Some(pool.connect_timeout);
        options.server_selection_timeout = Some(pool.connect_timeout);
        options.max_idle_time = Some(pool.idle_timeout);

        if !self.config.user().is_empty() {
            options.credential = Some(
                Credential::builder()
                    .username(self.config.user().to_string())
                    .password(self.config.password().to_string())
                    .source(self.config.auth_source().to_string())
                    .build(),
            );
        }

        Ok(options)
    }

    async fn open_client(&self) -> UserApiResult<MongoHandle> {
        info!(
            host = %self.config.host(),
            port = self.config.port(),
            database = %self.config.database(),
            max_connections = self.config.pool().max_connections,
            "Connecting to MongoDB..."
        );

        let client = Client::with_options(self.client_options()?)
            .map_err(|e| translate_error(Operation::Connect, None, &e))?;
        let database = self.config.database().to_string();

        // The client connects lazily; ping to surface auth and network errors now.
        if let Err(e) = client.database(&database).run_command(doc! { "ping": 1 }).await {
            warn!("Failed to connect to MongoDB: {}", e);
            client.shutdown().await;
            return Err(translate_error(Operation::Connect, None, &e));
        }

        info!("MongoDB connection pool established");
        Ok(MongoHandle { client, database })
    }
}

#[async_trait]
impl UserDataDriver for MongoUserDataDriver {
    fn backend(&self) -> BackendKind {
        BackendKind::Mongo
    }

    async fn state(&self) -> DriverState {
        self.state.state().await
    }

    async fn connect(&self) -> UserApiResult<()> {
        let span = debug_span!(parent: &self.span, "connect");
        self.state.connect(|| self.open_client()).instrument(span).await
    }

    async fn migrate(&self) -> UserApiResult<()> {
        let span = debug_span!(parent: &self.span, "migrate");
        async {
            let handle = self.state.handle(Operation::Migrate).await?;
            info!("Ensuring unique index {} on {}", ACCOUNT_ID_INDEX, USER_DATA_TABLE);

            let index = IndexModel::builder()
                .keys(doc! { "account_id": 1 })
                .options(
                    IndexOptions::builder()
                        .name(ACCOUNT_ID_INDEX.to_string())
                        .unique(true)
                        .build(),
                )
                .build();

            handle
                .collection()
                .create_index(index)
                .await
                .map_err(|e| translate_error(Operation::Migrate, None, &e))?;

            info!("MongoDB migration completed");
            Ok(())
        }
        .instrument(span)
        .await
    }

    async fn insert_user_data(&self, account_id: &str, payload: &str) -> UserApiResult<()> {
        let span = debug_span!(parent: &self.span, "insert_user_data", account_id);
        async {
            let handle = self.state.handle(Operation::Insert).await?;
            validate_account_id(account_id)?;
            validate_payload(payload)?;
            debug!("Inserting user data");

            let document = UserDataDocument {
                account_id: account_id.to_string(),
                payload: payload.to_string(),
            };
            handle
                .collection()
                .insert_one(document)
                .await
                .map_err(|e| translate_error(Operation::Insert, Some(account_id), &e))?;
            Ok(())
        }
        .instrument(span)
        .await
    }

    async fn get_user_data(&self, account_id: &str) -> UserApiResult<UserRecord> {
        let span = debug_span!(parent: &self.span, "get_user_data", account_id);
        async {
            let handle = self.state.handle(Operation::Get).await?;
            validate_account_id(account_id)?;
            debug!("Fetching user data");

            let document = handle
                .collection()
                .find_one(doc! { "account_id": account_id })
                .await
                .map_err(|e| translate_error(Operation::Get, Some(account_id), &e))?;

            document
                .map(UserRecord::from)
                .ok_or_else(|| UserApiError::not_found(account_id))
        }
        .instrument(span)
        .await
    }

    async fn delete_user_data(&self, account_id: &str) -> UserApiResult<()> {
        let span = debug_span!(parent: &self.span, "delete_user_data", account_id);
        async {
            let handle = self.state.handle(Operation::Delete).await?;
            validate_account_id(account_id)?;
            debug!("Deleting user data");

            let result = handle
                .collection()
                .delete_one(doc! { "account_id": account_id })
                .await
                .map_err(|e| translate_error(Operation::Delete, Some(account_id), &e))?;

            if result.deleted_count == 0 {
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
            let handle = self.state.handle(Operation::HealthCheck).await?;
            handle
                .client
                .database(&handle.database)
                .run_command(doc! { "ping": 1 })
                .await
                .map_err(|e| translate_error(Operation::HealthCheck, None, &e))?;
            Ok(())
        }
        .instrument(span)
        .await
    }

    async fn close(&self) -> UserApiResult<()> {
        let span = debug_span!(parent: &self.span, "close");
        async {
            let Some(handle) = self.state.close().await else {
                debug!("MongoDB driver already closed or never connected");
                return Ok(());
            };

            info!("Closing MongoDB client...");
            let deadline = self.config.pool().shutdown_timeout;
            // Client::shutdown only waits for cursors and sessions, so
            // single operations are drained here first.
            if !self.state.drain(deadline).await {
                warn!(?deadline, "In-flight operations did not finish before the deadline");
            }
            let shutdown = async move { handle.client.shutdown().await };
            if tokio::time::timeout(deadline, shutdown).await.is_err() {
                warn!(?deadline, "MongoDB client did not shut down before the deadline");
            } else {
                info!("MongoDB client closed");
            }
            Ok(())
        }
        .instrument(span)
        .await
    }
}

impl std::fmt::Debug for MongoUserDataDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MongoUserDataDriver")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    match err.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(write_error)) => {
            write_error.code == DUPLICATE_KEY
        }
        ErrorKind::Command(command_error) => command_error.code == DUPLICATE_KEY,
        _ => false,
    }
}

/// Maps a driver error raised by `operation` into the shared taxonomy.
fn translate_error(
    operation: Operation,
    account_id: Option<&str>,
    err: &mongodb::error::Error,
) -> UserApiError {
    match operation {
        Operation::Connect => UserApiError::Connection(err.to_string()),
        Operation::Migrate => UserApiError::Migration(err.to_string()),
        _ if is_duplicate_key(err) => UserApiError::duplicate(account_id.unwrap_or_default()),
        _ => UserApiError::Io(err.to_string()),
    }
}
