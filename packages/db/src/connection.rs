//! Process-wide SurrealDB handle for the queue store.

use std::fmt;

use surrealdb::Surreal;
use surrealdb::engine::any::{Any, connect};
use surrealdb::opt::auth::Root;
use thiserror::Error;
use tokio::sync::OnceCell;

/// The shared store connection, set once by [`init_db`].
static STORE: OnceCell<Database> = OnceCell::const_new();

/// Database connection wrapper.
pub type Database = Surreal<Any>;

/// Where the store keeps its data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    /// Process memory; lost on exit.
    Memory,
    /// File-backed storage at the given path.
    File(String),
    /// RocksDB at the given path (requires the `rocksdb` feature).
    RocksDb(String),
}

impl Endpoint {
    /// Connection URL understood by `surrealdb::engine::any`.
    pub fn url(&self) -> String {
        match self {
            Endpoint::Memory => "mem://".to_string(),
            Endpoint::File(path) => format!("file://{}", path),
            Endpoint::RocksDb(path) => format!("rocksdb://{}", path),
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.url())
    }
}

/// Root login used when the store requires authentication.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// Store connection settings.
#[derive(Debug, Clone)]
pub struct DbConfig {
    pub endpoint: Endpoint,
    pub namespace: String,
    pub database: String,
    pub credentials: Option<Credentials>,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            endpoint: Endpoint::Memory,
            namespace: "queues".to_string(),
            database: "main".to_string(),
            credentials: None,
        }
    }
}

impl DbConfig {
    /// In-memory store, used by tests and throwaway runs.
    pub fn memory() -> Self {
        Self::default()
    }

    /// File-backed store rooted at `path`.
    pub fn file(path: impl Into<String>) -> Self {
        Self {
            endpoint: Endpoint::File(path.into()),
            ..Self::default()
        }
    }

    /// RocksDB store rooted at `path`.
    pub fn rocksdb(path: impl Into<String>) -> Self {
        Self {
            endpoint: Endpoint::RocksDb(path.into()),
            ..Self::default()
        }
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = database.into();
        self
    }

    /// Sign in as root with these credentials after connecting.
    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.credentials = Some(Credentials {
            username: username.into(),
            password: password.into(),
        });
        self
    }
}

/// Store errors.
#[derive(Debug, Error)]
pub enum DbError {
    #[error("Store not initialized, call init_db first")]
    NotInitialized,
    #[error("Store error: {0}")]
    Connection(#[from] surrealdb::Error),
    #[error("Query error: {0}")]
    Query(String),
    #[error("Not found: {0}")]
    NotFound(String),
    /// A conditional write saw a different resource version than the caller read.
    #[error("Conflict: {0}")]
    Conflict(String),
}

impl DbError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, DbError::NotFound(_))
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, DbError::Conflict(_))
    }
}

/// Open the shared store connection.
///
/// The first successful call wins; later calls return the existing
/// connection and ignore `config`.
pub async fn init_db(config: DbConfig) -> Result<&'static Database, DbError> {
    STORE
        .get_or_try_init(|| async {
            tracing::info!("Connecting to store at {}", config.endpoint);

            let url = config.endpoint.url();
            let db = connect(&url).await?;

            if let Some(credentials) = &config.credentials {
                db.signin(Root {
                    username: &credentials.username,
                    password: &credentials.password,
                })
                .await?;
            }

            db.use_ns(&config.namespace)
                .use_db(&config.database)
                .await?;

            tracing::info!(
                "Using store namespace {} database {}",
                config.namespace,
                config.database
            );
            Ok(db)
        })
        .await
}

/// The shared store connection.
pub fn get_db() -> Result<&'static Database, DbError> {
    STORE.get().ok_or(DbError::NotInitialized)
}
