//! SQL storage backend.
//!
//! ## Available Databases
//!
//! - **SQLite** (feature: `sqlite`): Embedded database
//! - **PostgreSQL** (feature: `postgres`): PostgreSQL database
//!
//! ## Architecture
//!
//! The backend uses sqlx with `AnyPool` for multi-database support. Each
//! capability maps to one table keyed by collection id, so any number of
//! collections share the same four tables.
//!
//! Per-field expiry is not supported: [`HashMapStore::set_expire`] stores the
//! value without a deadline and callers remain responsible for cleanup.
//!
//! See the [`schema`] module for the table layout and migrations.
//!
//! [`HashMapStore::set_expire`]: crate::backend::HashMapStore::set_expire

mod collections;

/// Schema definition and migration system.
pub mod schema;

use std::sync::Arc;
#[cfg(feature = "postgres")]
use std::time::Duration;

use async_trait::async_trait;
use sqlx::AnyPool;
#[cfg(feature = "postgres")]
use sqlx::Executor;
use sqlx::any::AnyPoolOptions;

use self::collections::{SqlHashMap, SqlKeyValue, SqlList, SqlSet};
use crate::Result;
use crate::backend::errors::BackendError;
use crate::backend::{Creator, HashMapStore, Host, KeyValueStore, ListStore, SetStore};

/// Extension trait for sqlx Result types to simplify error handling.
///
/// Similar to `anyhow::Context`, this trait adds a method to convert
/// sqlx errors to `BackendError::SqlxError` with a context message.
pub(crate) trait SqlxResultExt<T> {
    /// Convert sqlx error to BackendError with context message.
    fn sql_context(self, context: &str) -> Result<T>;
}

impl<T> SqlxResultExt<T> for std::result::Result<T, sqlx::Error> {
    fn sql_context(self, context: &str) -> Result<T> {
        self.map_err(|e| {
            BackendError::SqlxError {
                reason: format!("{context}: {e}"),
                source: Some(e),
            }
            .into()
        })
    }
}

/// Database backend kind for SQL dialect selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DbKind {
    /// SQLite database
    Sqlite,
    /// PostgreSQL database
    Postgres,
}

/// SQL backend implementing [`Host`] and [`Creator`] using sqlx.
///
/// Cloning shares the underlying pool.
///
/// # Test Isolation
///
/// For PostgreSQL, each backend instance can use its own schema for test isolation.
/// Use `connect_postgres_isolated()` to create an isolated backend for testing.
#[derive(Debug, Clone)]
pub struct SqlxBackend {
    pool: AnyPool,
    kind: DbKind,
}

impl SqlxBackend {
    /// Get a reference to the underlying pool.
    pub fn pool(&self) -> &AnyPool {
        &self.pool
    }

    /// Get the database kind.
    pub fn kind(&self) -> DbKind {
        self.kind
    }

    /// Check if this backend is using SQLite.
    pub fn is_sqlite(&self) -> bool {
        self.kind == DbKind::Sqlite
    }

    /// Check if this backend is using PostgreSQL.
    pub fn is_postgres(&self) -> bool {
        self.kind == DbKind::Postgres
    }

    /// Connect by URL scheme: `sqlite:` or `postgres://` / `postgresql://`.
    pub async fn connect(url: &str) -> Result<Self> {
        #[cfg(feature = "sqlite")]
        {
            if url.starts_with("sqlite:") {
                return Self::connect_sqlite(url).await;
            }
        }
        #[cfg(feature = "postgres")]
        {
            if url.starts_with("postgres://") || url.starts_with("postgresql://") {
                return Self::connect_postgres(url).await;
            }
        }
        Err(BackendError::SqlxError {
            reason: "Unsupported database URL scheme".to_string(),
            source: None,
        }
        .into())
    }
}

// SQLite-specific implementations
#[cfg(feature = "sqlite")]
impl SqlxBackend {
    /// Open a SQLite database at the given path.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Example
    ///
    /// ```ignore
    /// use tollgate::backend::sql::SqlxBackend;
    ///
    /// #[tokio::main]
    /// async fn main() {
    ///     let backend = SqlxBackend::open_sqlite("users.db").await.unwrap();
    /// }
    /// ```
    pub async fn open_sqlite<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        // mode=rwc: read-write-create (create file if it doesn't exist)
        let url = format!("sqlite:{}?mode=rwc", path.as_ref().display());
        Self::connect_sqlite(&url).await
    }

    /// Connect to a SQLite database using a connection URL.
    ///
    /// # Arguments
    ///
    /// * `url` - SQLite connection URL (e.g., "sqlite:./users.db")
    pub async fn connect_sqlite(url: &str) -> Result<Self> {
        sqlx::any::install_default_drivers();

        let is_in_memory = url.contains("mode=memory");

        // An in-memory database disappears with its last connection, so keep
        // one open for the life of the pool.
        let pool = if is_in_memory {
            AnyPoolOptions::new()
                .max_connections(5)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect(url)
                .await
                .sql_context("Failed to connect to SQLite")?
        } else {
            AnyPoolOptions::new()
                .max_connections(5)
                .connect(url)
                .await
                .sql_context("Failed to connect to SQLite")?
        };

        if is_in_memory {
            sqlx::query("PRAGMA busy_timeout = 5000;")
                .execute(&pool)
                .await
                .sql_context("Failed to configure SQLite")?;
        } else {
            // - journal_mode=WAL: Write-Ahead Logging for better concurrency
            // - synchronous=NORMAL: Balanced durability (safe with WAL)
            // - busy_timeout=5000: Wait up to 5s for locks before failing
            sqlx::query(
                "PRAGMA journal_mode = WAL;
                 PRAGMA synchronous = NORMAL;
                 PRAGMA busy_timeout = 5000;",
            )
            .execute(&pool)
            .await
            .sql_context("Failed to configure SQLite")?;
        }

        let backend = Self {
            pool,
            kind: DbKind::Sqlite,
        };
        schema::initialize(&backend).await?;
        tracing::debug!("connected to SQLite");

        Ok(backend)
    }

    /// Create an in-memory SQLite database.
    ///
    /// The database exists only for the lifetime of this backend instance.
    /// Useful for testing.
    pub async fn sqlite_in_memory() -> Result<Self> {
        // Shared cache so every pooled connection sees the same database,
        // unique name so separate instances do not.
        let unique_id = uuid::Uuid::new_v4();
        let url = format!("sqlite:file:mem_{unique_id}?mode=memory&cache=shared");
        Self::connect_sqlite(&url).await
    }
}

// PostgreSQL-specific implementations
#[cfg(feature = "postgres")]
impl SqlxBackend {
    /// Connect to a PostgreSQL database using a connection URL.
    ///
    /// This connects to the default (public) schema. For test isolation,
    /// use `connect_postgres_isolated()` instead.
    pub async fn connect_postgres(url: &str) -> Result<Self> {
        Self::connect_postgres_with_schema(url, None).await
    }

    async fn connect_postgres_with_schema(url: &str, schema_name: Option<String>) -> Result<Self> {
        sqlx::any::install_default_drivers();

        if let Some(ref schema) = schema_name {
            let temp_pool = AnyPoolOptions::new()
                .max_connections(1)
                .connect(url)
                .await
                .sql_context("Failed to connect to PostgreSQL")?;

            let create_schema = format!("CREATE SCHEMA IF NOT EXISTS {schema}");
            sqlx::query(&create_schema)
                .execute(&temp_pool)
                .await
                .sql_context(&format!("Failed to create schema {schema}"))?;

            temp_pool.close().await;
        }

        let schema_for_hook = schema_name.clone();
        let mut pool_options = AnyPoolOptions::new();
        if schema_name.is_some() {
            // Many isolated pools run side by side in tests
            pool_options = pool_options
                .max_connections(2)
                .acquire_timeout(Duration::from_secs(30));
        } else {
            pool_options = pool_options.max_connections(5);
        }

        let pool = pool_options
            .after_connect(move |conn, _meta| {
                let schema = schema_for_hook.clone();
                Box::pin(async move {
                    if let Some(ref s) = schema {
                        let set_path = format!("SET search_path TO {s}");
                        conn.execute(set_path.as_str()).await?;
                    }
                    Ok(())
                })
            })
            .connect(url)
            .await
            .sql_context("Failed to connect to PostgreSQL")?;

        let backend = Self {
            pool,
            kind: DbKind::Postgres,
        };
        schema::initialize(&backend).await?;
        tracing::debug!(isolated = schema_name.is_some(), "connected to PostgreSQL");

        Ok(backend)
    }

    /// Connect to a PostgreSQL database in a fresh, uniquely named schema.
    pub async fn connect_postgres_isolated(url: &str) -> Result<Self> {
        // PostgreSQL schema names must start with a letter and be lowercase
        let unique_id = uuid::Uuid::new_v4().simple().to_string();
        let schema_name = format!("test_{unique_id}");
        Self::connect_postgres_with_schema(url, Some(schema_name)).await
    }
}

#[async_trait]
impl Host for SqlxBackend {
    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .sql_context("Ping failed")?;
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.pool.close().await;
        tracing::debug!(kind = ?self.kind, "SQL backend closed");
        Ok(())
    }

    fn creator(&self) -> Arc<dyn Creator> {
        Arc::new(self.clone())
    }
}

#[async_trait]
impl Creator for SqlxBackend {
    async fn new_set(&self, id: &str) -> Result<Arc<dyn SetStore>> {
        Ok(Arc::new(SqlSet::new(self.clone(), id)))
    }

    async fn new_hash_map(&self, id: &str) -> Result<Arc<dyn HashMapStore>> {
        Ok(Arc::new(SqlHashMap::new(self.clone(), id)))
    }

    async fn new_key_value(&self, id: &str) -> Result<Arc<dyn KeyValueStore>> {
        Ok(Arc::new(SqlKeyValue::new(self.clone(), id)))
    }

    async fn new_list(&self, id: &str) -> Result<Arc<dyn ListStore>> {
        Ok(Arc::new(SqlList::new(self.clone(), id)))
    }
}
