//! CLI argument definitions for the Tollgate binary.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// Storage backend type
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum Backend {
    /// SQLite database (default)
    Sqlite,
    /// PostgreSQL database (for shared deployments)
    Postgres,
    /// In-memory with JSON persistence (for development)
    Inmemory,
}

/// Tollgate user accounts and path-prefix authorization
#[derive(Parser, Debug)]
#[command(name = "tollgate")]
#[command(about = "Tollgate: user accounts, signed-cookie sessions and path permissions")]
#[command(version)]
pub struct Cli {
    /// Print machine-readable JSON instead of tables
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the demo web server
    Serve(ServeArgs),
    /// Check health of a running Tollgate server
    Health(HealthArgs),
    /// Manage users in the configured backend
    #[command(subcommand)]
    Users(UsersCommand),
}

/// Storage and user-state options shared by every command that opens a backend
#[derive(clap::Args, Debug, Clone)]
pub struct BackendArgs {
    /// Storage backend to use
    #[arg(short, long, default_value = "sqlite", env = "TOLLGATE_BACKEND")]
    pub backend: Backend,

    /// Data directory for storage files.
    /// For SQLite: stores tollgate.db
    /// For InMemory: stores tollgate.json
    #[arg(short = 'D', long, env = "TOLLGATE_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// PostgreSQL connection URL (required when backend=postgres)
    #[arg(long, env = "TOLLGATE_POSTGRES_URL")]
    pub postgres_url: Option<String>,

    /// Secret for signing cookies; a random one is generated when unset,
    /// which logs everyone out on restart
    #[arg(long, env = "TOLLGATE_COOKIE_SECRET", hide_env_values = true)]
    pub cookie_secret: Option<String>,

    /// Password hashing for new passwords: sha256, bcrypt or bcrypt+
    #[arg(long, default_value = "bcrypt+", env = "TOLLGATE_PASSWORD_ALGORITHM")]
    pub password_algorithm: String,
}

/// Arguments for the serve command
#[derive(clap::Args, Debug)]
pub struct ServeArgs {
    /// Port to listen on
    #[arg(short, long, default_value_t = 3000, env = "TOLLGATE_PORT")]
    pub port: u16,

    /// Bind address
    #[arg(long, default_value = "0.0.0.0", env = "TOLLGATE_HOST")]
    pub host: String,

    /// Mark login cookies `Secure` (serve behind HTTPS)
    #[arg(long)]
    pub secure_cookies: bool,

    #[command(flatten)]
    pub backend_config: BackendArgs,
}

/// Arguments for the health command
#[derive(clap::Args, Debug)]
pub struct HealthArgs {
    /// Base URL of the server to check
    #[arg(long, default_value = "http://127.0.0.1:3000", env = "TOLLGATE_URL")]
    pub url: String,

    /// Timeout in seconds
    #[arg(short, long, default_value_t = 5)]
    pub timeout: u64,
}

#[derive(Subcommand, Debug)]
pub enum UsersCommand {
    /// List registered users and their flags
    List(UsersListArgs),
    /// Register a user
    Add(UsersAddArgs),
    /// Give a user admin rights
    Promote(UsersPromoteArgs),
}

#[derive(clap::Args, Debug)]
pub struct UsersListArgs {
    #[command(flatten)]
    pub backend_config: BackendArgs,
}

#[derive(clap::Args, Debug)]
pub struct UsersAddArgs {
    pub username: String,
    pub password: String,
    pub email: String,

    /// Skip e-mail confirmation
    #[arg(long)]
    pub confirmed: bool,

    /// Make the user an administrator
    #[arg(long)]
    pub admin: bool,

    #[command(flatten)]
    pub backend_config: BackendArgs,
}

#[derive(clap::Args, Debug)]
pub struct UsersPromoteArgs {
    pub username: String,

    #[command(flatten)]
    pub backend_config: BackendArgs,
}
