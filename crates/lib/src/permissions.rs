//! Path-prefix authorization middleware.
//!
//! Each request path is checked against three prefix lists, in this order:
//!
//! 1. With `root_is_public`, the path `/` is always allowed.
//! 2. A path under an admin prefix needs [`UserState::admin_rights`].
//! 3. A path under a user prefix needs [`UserState::user_rights`].
//! 4. Whatever survives must also sit under a public prefix.
//!
//! Rules 2 and 3 are independent, so a path under both an admin and a user
//! prefix needs both rights. Matching is plain string prefixing: `/admin`
//! also covers `/administrator`.
//!
//! Allowed requests go to the next handler untouched. Rejected ones go to the
//! deny handler, which by default answers `403 Permission denied.`.
//!
//! ## Example
//!
//! ```no_run
//! # use std::sync::Arc;
//! # use axum::{Router, routing::get, middleware};
//! # use tollgate::{Permissions, UserState, backend::InMemory};
//! # #[tokio::main]
//! # async fn main() -> tollgate::Result<()> {
//! let state = UserState::new(Arc::new(InMemory::new())).await?;
//! let permissions = Permissions::new(state);
//! permissions.add_user_path("/members");
//!
//! let app: Router = Router::new()
//!     .route("/members", get(|| async { "welcome" }))
//!     .layer(middleware::from_fn_with_state(permissions, Permissions::guard));
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use axum::extract::{Request, State};
use axum::http::{HeaderMap, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use tracing::debug;

use crate::constants::{
    DEFAULT_ADMIN_PREFIXES, DEFAULT_PUBLIC_PREFIXES, DEFAULT_USER_PREFIXES, PERMISSION_DENIED,
};
use crate::user::UserState;

/// Builds the response for a rejected request.
pub type DenyFunction = Arc<dyn Fn(&Request) -> Response + Send + Sync>;

/// The prefix lists consulted for every request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathRules {
    pub admin: Vec<String>,
    pub user: Vec<String>,
    pub public: Vec<String>,
    pub root_is_public: bool,
}

impl Default for PathRules {
    fn default() -> Self {
        Self {
            admin: to_strings(DEFAULT_ADMIN_PREFIXES),
            user: to_strings(DEFAULT_USER_PREFIXES),
            public: to_strings(DEFAULT_PUBLIC_PREFIXES),
            root_is_public: true,
        }
    }
}

fn to_strings(prefixes: &[&str]) -> Vec<String> {
    prefixes.iter().map(|p| p.to_string()).collect()
}

fn under_any(prefixes: &[String], path: &str) -> bool {
    prefixes.iter().any(|prefix| path.starts_with(prefix.as_str()))
}

/// The default deny handler: `403` with `Permission denied.`.
pub fn permission_denied(_request: &Request) -> Response {
    (StatusCode::FORBIDDEN, PERMISSION_DENIED).into_response()
}

struct PermissionsInner {
    state: UserState,
    rules: RwLock<Arc<PathRules>>,
    deny: RwLock<DenyFunction>,
}

/// Path-prefix authorization on top of a [`UserState`].
///
/// Cheap to clone; clones share rules and deny handler. Every setter swaps in
/// a complete new rule set, so requests in flight see either the old rules or
/// the new ones.
#[derive(Clone)]
pub struct Permissions {
    inner: Arc<PermissionsInner>,
}

impl fmt::Debug for Permissions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Permissions")
            .field("rules", &self.rules())
            .finish_non_exhaustive()
    }
}

impl Permissions {
    /// Permissions with the default prefixes and deny handler.
    pub fn new(state: UserState) -> Self {
        Self::with_rules(state, PathRules::default())
    }

    pub fn with_rules(state: UserState, rules: PathRules) -> Self {
        let deny: DenyFunction = Arc::new(permission_denied);
        Self {
            inner: Arc::new(PermissionsInner {
                state,
                rules: RwLock::new(Arc::new(rules)),
                deny: RwLock::new(deny),
            }),
        }
    }

    pub fn user_state(&self) -> &UserState {
        &self.inner.state
    }

    /// A snapshot of the current rules.
    pub fn rules(&self) -> Arc<PathRules> {
        self.inner
            .rules
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replace all rules at once.
    pub fn set_rules(&self, rules: PathRules) {
        *self
            .inner
            .rules
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Arc::new(rules);
    }

    fn update_rules(&self, change: impl FnOnce(&mut PathRules)) {
        let mut guard = self
            .inner
            .rules
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let mut next = PathRules::clone(&guard);
        change(&mut next);
        *guard = Arc::new(next);
    }

    pub fn add_admin_path(&self, prefix: &str) {
        self.update_rules(|r| r.admin.push(prefix.to_string()));
    }

    pub fn add_user_path(&self, prefix: &str) {
        self.update_rules(|r| r.user.push(prefix.to_string()));
    }

    pub fn add_public_path(&self, prefix: &str) {
        self.update_rules(|r| r.public.push(prefix.to_string()));
    }

    pub fn set_admin_path(&self, prefixes: Vec<String>) {
        self.update_rules(|r| r.admin = prefixes);
    }

    pub fn set_user_path(&self, prefixes: Vec<String>) {
        self.update_rules(|r| r.user = prefixes);
    }

    pub fn set_public_path(&self, prefixes: Vec<String>) {
        self.update_rules(|r| r.public = prefixes);
    }

    /// Drop every admin and user prefix. Public prefixes stay.
    pub fn clear(&self) {
        self.update_rules(|r| {
            r.admin.clear();
            r.user.clear();
        });
    }

    pub fn root_is_public(&self) -> bool {
        self.rules().root_is_public
    }

    pub fn set_root_is_public(&self, public: bool) {
        self.update_rules(|r| r.root_is_public = public);
    }

    pub fn set_deny_function(&self, deny: DenyFunction) {
        *self
            .inner
            .deny
            .write()
            .unwrap_or_else(PoisonError::into_inner) = deny;
    }

    pub fn deny_function(&self) -> DenyFunction {
        self.inner
            .deny
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Whether a request for `path` with these headers would be turned away.
    pub async fn rejected(&self, headers: &HeaderMap, path: &str) -> bool {
        let rules = self.rules();
        let state = &self.inner.state;

        if rules.root_is_public && path == "/" {
            return false;
        }
        if under_any(&rules.admin, path) && !state.admin_rights(headers).await {
            return true;
        }
        if under_any(&rules.user, path) && !state.user_rights(headers).await {
            return true;
        }
        !under_any(&rules.public, path)
    }

    /// Pass the request on to `next`, or answer it with the deny handler.
    pub async fn serve_http(&self, request: Request, next: Next) -> Response {
        if self.rejected(request.headers(), request.uri().path()).await {
            debug!(path = request.uri().path(), "permission denied");
            let deny = self.deny_function();
            return deny(&request);
        }
        next.run(request).await
    }

    /// Middleware entry point for [`axum::middleware::from_fn_with_state`].
    pub async fn guard(State(permissions): State<Permissions>, request: Request, next: Next) -> Response {
        permissions.serve_http(request, next).await
    }
}
