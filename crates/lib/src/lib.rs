//!
//! Tollgate: user accounts, signed-cookie sessions and path-prefix authorization
//! for web applications, on top of a pluggable key-value storage layer.
//!
//! ## Core Concepts
//!
//! * **Backends (`backend::Host`, `backend::Creator`)**: The storage layer. A host is a live
//!   connection; its creator mints named collections with four narrow capabilities:
//!     * **KeyValueStore**: string keys to string values, with an integer counter helper.
//!     * **SetStore**: a set of unique strings.
//!     * **HashMapStore**: `owner -> field -> value`, where each owner acts as a logical row.
//!     * **ListStore**: an append-only sequence of strings.
//! * **Cookie codec (`cookie::SecureCookies`)**: Mints and verifies HMAC-SHA-256 authenticated
//!   cookies bound to a per-instance secret.
//! * **Password hashing (`password::PasswordAlgorithm`)**: salted SHA-256, bcrypt, and the
//!   migrating `bcrypt+` scheme.
//! * **User store (`user::UserState`)**: users, flags, confirmation codes and tokens kept in the
//!   `usernames`, `unconfirmed` and `users` collections.
//! * **Sessions (`session`)**: binds the username cookie to HTTP requests and responses.
//! * **Permissions (`permissions::Permissions`)**: the middleware that classifies request paths
//!   as public, user-only or admin-only and dispatches to the next handler or a deny handler.

pub mod backend;
pub mod clock;
pub mod config;
pub mod constants;
pub mod cookie;
pub mod password;
pub mod permissions;
pub mod session;
pub mod user;

pub use clock::{Clock, SystemClock};
#[cfg(any(test, feature = "testing"))]
pub use clock::FixedClock;
pub use config::StateConfig;
pub use permissions::Permissions;
pub use user::UserState;

/// Result type used throughout the Tollgate library.
pub type Result<T> = std::result::Result<T, Error>;

/// Common error type for the Tollgate library.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Structured storage errors from the backend module
    #[error(transparent)]
    Backend(backend::BackendError),

    /// Structured cookie errors from the cookie module
    #[error(transparent)]
    Cookie(cookie::CookieError),

    /// Structured hashing errors from the password module
    #[error(transparent)]
    Password(password::PasswordError),

    /// Structured user store errors from the user module
    #[error(transparent)]
    User(user::UserError),
}

impl Error {
    /// Get the originating module for this error.
    pub fn module(&self) -> &'static str {
        match self {
            Error::Backend(_) => "backend",
            Error::Cookie(_) => "cookie",
            Error::Password(_) => "password",
            Error::User(_) => "user",
            Error::Io(_) => "io",
            Error::Serialize(_) => "serialize",
        }
    }

    /// Check if this error indicates a resource was not found.
    pub fn is_not_found(&self) -> bool {
        match self {
            Error::Backend(backend_err) => backend_err.is_not_found(),
            Error::Cookie(cookie_err) => cookie_err.is_missing(),
            Error::User(user_err) => user_err.is_not_found(),
            _ => false,
        }
    }

    /// Check if this error is authentication-related.
    ///
    /// Covers missing, forged or expired cookies and wrong passwords.
    pub fn is_authentication_error(&self) -> bool {
        match self {
            Error::Cookie(_) => true,
            Error::User(user_err) => user_err.is_authentication_error(),
            _ => false,
        }
    }

    /// Check if this error is caused by invalid configuration or invalid input to a setter.
    pub fn is_configuration_error(&self) -> bool {
        match self {
            Error::Password(password_err) => password_err.is_configuration_error(),
            Error::User(user_err) => user_err.is_configuration_error(),
            _ => false,
        }
    }

    /// Check if this error came from the storage layer.
    pub fn is_backend_error(&self) -> bool {
        matches!(self, Error::Backend(_))
    }

    /// Check if this error is I/O related.
    pub fn is_io_error(&self) -> bool {
        match self {
            Error::Io(_) => true,
            Error::Backend(backend_err) => backend_err.is_io_error(),
            _ => false,
        }
    }
}
