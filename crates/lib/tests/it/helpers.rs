#![allow(dead_code)]

use std::sync::Arc;

use axum::http::header::{COOKIE, SET_COOKIE};
use axum::http::{HeaderMap, HeaderValue};
use tollgate::{StateConfig, UserState, backend::Host, backend::InMemory};

// ==========================
// CORE TEST FACTORIES
// ==========================
// Single point of change for backend matrix testing via the TEST_BACKEND env var.

/// Creates a test backend based on TEST_BACKEND env var.
///
/// Supported values:
/// - "inmemory" or unset: InMemory backend (default)
/// - "sqlite": SQLite in-memory backend (requires `sqlite` feature)
/// - "postgres": PostgreSQL backend in a fresh schema (requires `postgres`
///   feature and TEST_POSTGRES_URL)
///
/// # Example
/// ```bash
/// # Run tests with InMemory (default)
/// cargo test
///
/// # Run tests with SQLite
/// TEST_BACKEND=sqlite cargo test --features sqlite
/// ```
pub async fn test_backend() -> Arc<dyn Host> {
    match std::env::var("TEST_BACKEND").as_deref() {
        Ok("sqlite") => {
            #[cfg(feature = "sqlite")]
            {
                use tollgate::backend::sql::SqlxBackend;
                Arc::new(
                    SqlxBackend::sqlite_in_memory()
                        .await
                        .expect("Failed to create SQLite backend"),
                )
            }
            #[cfg(not(feature = "sqlite"))]
            {
                panic!("TEST_BACKEND=sqlite requires the 'sqlite' feature to be enabled")
            }
        }
        Ok("postgres") => {
            #[cfg(feature = "postgres")]
            {
                use tollgate::backend::sql::SqlxBackend;
                let url = std::env::var("TEST_POSTGRES_URL")
                    .unwrap_or_else(|_| "postgres://localhost/tollgate_test".to_string());
                Arc::new(
                    SqlxBackend::connect_postgres_isolated(&url)
                        .await
                        .expect("Failed to connect to PostgreSQL"),
                )
            }
            #[cfg(not(feature = "postgres"))]
            {
                panic!("TEST_BACKEND=postgres requires the 'postgres' feature to be enabled")
            }
        }
        _ => Arc::new(InMemory::new()),
    }
}

/// Whether the matrix backend expires hash map fields on its own.
pub fn backend_expires_fields() -> bool {
    !matches!(
        std::env::var("TEST_BACKEND").as_deref(),
        Ok("sqlite") | Ok("postgres")
    )
}

/// Defaults with the cheapest bcrypt cost.
pub fn fast_config() -> StateConfig {
    StateConfig {
        bcrypt_cost: 4,
        ..StateConfig::default()
    }
}

/// A user state on a fresh matrix backend.
pub async fn test_state() -> UserState {
    test_state_with(fast_config()).await
}

pub async fn test_state_with(config: StateConfig) -> UserState {
    UserState::with_config(test_backend().await, config)
        .await
        .expect("Failed to open user state")
}

/// A user state with `bob` registered.
pub async fn state_with_bob() -> UserState {
    let state = test_state().await;
    state
        .add_user("bob", "hunter1", "bob@e.co")
        .await
        .expect("Failed to add bob");
    state
}

// ==========================
// COOKIE HELPERS
// ==========================

/// Turn the `Set-Cookie` headers of a response into the `Cookie` header of a
/// follow-up request, the way a browser would.
pub fn replay(response: &HeaderMap) -> HeaderMap {
    let mut request = HeaderMap::new();
    for value in response.get_all(SET_COOKIE) {
        let pair = value
            .to_str()
            .unwrap()
            .split(';')
            .next()
            .unwrap()
            .to_string();
        request.append(COOKIE, HeaderValue::from_str(&pair).unwrap());
    }
    request
}

/// Request headers carrying `name=value`.
pub fn cookie_header(name: &str, value: &str) -> HeaderMap {
    let mut request = HeaderMap::new();
    request.insert(
        COOKIE,
        HeaderValue::from_str(&format!("{name}={value}")).unwrap(),
    );
    request
}

/// The raw value of the `user` cookie set on a response.
pub fn user_cookie_value(response: &HeaderMap) -> String {
    let request = replay(response);
    tollgate::cookie::find_cookie(&request, "user").expect("no user cookie on response")
}

/// Log `username` in and return headers of a request carrying its cookie.
pub async fn login_headers(state: &UserState, username: &str) -> HeaderMap {
    let mut response = HeaderMap::new();
    state
        .login(&mut response, username)
        .await
        .expect("Failed to log in");
    replay(&response)
}
