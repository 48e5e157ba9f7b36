//! Backend creation and utility functions.

use std::path::PathBuf;
use std::sync::Arc;

use tollgate::{
    StateConfig, UserState,
    backend::{Host, InMemory, sql::SqlxBackend},
};

use crate::cli::{Backend, BackendArgs};

/// An opened backend.
///
/// In-memory backends keep the handle and file path so the data can be
/// written back on shutdown.
pub struct OpenedBackend {
    pub host: Arc<dyn Host>,
    pub kind: &'static str,
    pub snapshot: Option<(InMemory, PathBuf)>,
}

impl OpenedBackend {
    /// Write an in-memory backend back to its JSON file. No-op for SQL.
    pub async fn save(&self) -> tollgate::Result<()> {
        if let Some((backend, path)) = &self.snapshot {
            backend.save_to_file(path).await?;
            tracing::info!("Saved users to {}", path.display());
        }
        Ok(())
    }
}

/// Redact credentials from a PostgreSQL connection URL for safe logging
pub fn redact_postgres_url(url: &str) -> String {
    if let Ok(parsed) = url::Url::parse(url) {
        let mut redacted = parsed.clone();
        if !parsed.username().is_empty() {
            let _ = redacted.set_username("***");
        }
        if parsed.password().is_some() {
            let _ = redacted.set_password(Some("***"));
        }
        redacted.to_string()
    } else {
        "postgres://***@<unparsable-url>".to_string()
    }
}

/// Create the appropriate backend based on configuration
pub async fn create_backend(
    args: &BackendArgs,
) -> Result<OpenedBackend, Box<dyn std::error::Error>> {
    let data_dir = args.data_dir.clone().unwrap_or_else(|| PathBuf::from("."));

    // Ensure data directory exists
    tokio::fs::create_dir_all(&data_dir).await?;

    match args.backend {
        Backend::Sqlite => {
            let db_path = data_dir.join("tollgate.db");
            tracing::info!("Using SQLite backend at {}", db_path.display());
            Ok(OpenedBackend {
                host: Arc::new(SqlxBackend::open_sqlite(&db_path).await?),
                kind: "sqlite",
                snapshot: None,
            })
        }
        Backend::Postgres => {
            let url = args
                .postgres_url
                .as_ref()
                .ok_or("PostgreSQL backend requires --postgres-url or TOLLGATE_POSTGRES_URL")?;

            let display_url = redact_postgres_url(url);
            tracing::info!("Connecting to PostgreSQL backend at {}", display_url);

            match SqlxBackend::connect_postgres(url).await {
                Ok(backend) => {
                    tracing::info!("Connected to PostgreSQL successfully");
                    Ok(OpenedBackend {
                        host: Arc::new(backend),
                        kind: "postgres",
                        snapshot: None,
                    })
                }
                Err(e) => {
                    Err(format!("Failed to connect to PostgreSQL at {}: {}", display_url, e).into())
                }
            }
        }
        Backend::Inmemory => {
            let json_path = data_dir.join("tollgate.json");
            tracing::info!(
                "Using in-memory backend with persistence at {}",
                json_path.display()
            );
            let backend = InMemory::load_from_file(&json_path).await?;
            Ok(OpenedBackend {
                host: Arc::new(backend.clone()),
                kind: "inmemory",
                snapshot: Some((backend, json_path)),
            })
        }
    }
}

/// User-state settings from the command line
pub fn state_config(args: &BackendArgs) -> Result<StateConfig, Box<dyn std::error::Error>> {
    Ok(StateConfig {
        cookie_secret: args.cookie_secret.clone(),
        password_algorithm: args.password_algorithm.parse()?,
        ..StateConfig::default()
    })
}

/// Open the backend and the user state on top of it
pub async fn open_user_state(
    args: &BackendArgs,
) -> Result<(UserState, OpenedBackend), Box<dyn std::error::Error>> {
    let opened = create_backend(args).await?;
    let state = UserState::with_config(opened.host.clone(), state_config(args)?).await?;
    Ok((state, opened))
}
