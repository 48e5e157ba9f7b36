//! User store
//!
//! Users live in three collections opened from the backend:
//!
//! - `usernames`: a set, the single source of truth for whether a user exists.
//! - `unconfirmed`: a set of users that still have a pending confirmation code.
//! - `users`: a hash map `username -> field -> value` holding the password
//!   hash, email, boolean flags and any caller-defined fields.
//!
//! Predicates used for authorization (`has_user`, `is_logged_in`, `is_admin`,
//! `correct_password`, ...) never surface backend failures: they log a warning
//! and answer `false`. Everything else returns the error.
//!
//! No multi-step operation is transactional. Each one orders its writes so that
//! an interrupted call never makes a half-written user visible.

mod confirmation;
pub mod errors;
mod flag;
mod validation;


use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use tracing::{debug, warn};
use zeroize::Zeroizing;

pub use errors::UserError;
pub use flag::Flag;
pub use validation::valid_username_password;

use crate::backend::{Creator, HashMapStore, Host, SetStore};
use crate::clock::{Clock, SystemClock};
use crate::config::StateConfig;
use crate::constants::{
    COOKIE_SECRET_LENGTH, FIELD_ADMIN, FIELD_CONFIRMED, FIELD_EMAIL, FIELD_LOGGED_IN,
    FIELD_PASSWORD, FIELD_TOKEN, MAX_BCRYPT_COST, MIN_BCRYPT_COST, REQUIRED_FLAGS, UNCONFIRMED,
    USERNAMES, USERS,
};
use crate::cookie::{SecureCookies, random_cookie_friendly_string, random_human_friendly_string};
use crate::password::{self, PasswordAlgorithm, PasswordError};
use crate::{Error, Result};

/// Produces a candidate confirmation code of the given length.
pub type CodeGenerator = Arc<dyn Fn(usize) -> String + Send + Sync>;

/// Tunable settings, replaced as a whole on every change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub password_algorithm: PasswordAlgorithm,
    pub cookie_ttl: Duration,
    pub min_confirmation_code_length: usize,
    pub max_confirmation_code_length: usize,
    pub bcrypt_cost: u32,
    pub secure_cookies: bool,
}

impl From<&StateConfig> for Settings {
    fn from(config: &StateConfig) -> Self {
        Self {
            password_algorithm: config.password_algorithm,
            cookie_ttl: config.cookie_ttl(),
            min_confirmation_code_length: config.min_confirmation_code_length,
            max_confirmation_code_length: config.max_confirmation_code_length,
            bcrypt_cost: config.bcrypt_cost,
            secure_cookies: config.secure_cookies,
        }
    }
}

/// Internal state for UserState
///
/// UserState itself is just a cheap-to-clone handle wrapping Arc<UserStateInternal>.
pub(crate) struct UserStateInternal {
    host: Arc<dyn Host>,
    creator: Arc<dyn Creator>,
    usernames: Arc<dyn SetStore>,
    unconfirmed: Arc<dyn SetStore>,
    users: Arc<dyn HashMapStore>,
    /// HMAC key for cookies and salt for SHA-256 password hashes
    cookie_secret: Zeroizing<String>,
    cookies: SecureCookies,
    clock: Arc<dyn Clock>,
    settings: RwLock<Arc<Settings>>,
    code_generator: RwLock<CodeGenerator>,
}

impl fmt::Debug for UserStateInternal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserStateInternal")
            .field("host", &"<Host>")
            .field("cookie_secret", &"<redacted>")
            .field("clock", &self.clock)
            .field("settings", &self.settings)
            .finish()
    }
}

/// Users, flags, passwords and confirmation codes on top of a storage backend.
///
/// All methods take `&self`; clones share the same state.
///
/// ## Example
///
/// ```
/// # use std::sync::Arc;
/// # use tollgate::{UserState, backend::InMemory};
/// # #[tokio::main]
/// # async fn main() -> tollgate::Result<()> {
/// let state = UserState::new(Arc::new(InMemory::new())).await?;
///
/// state.add_user("bob", "hunter1", "bob@e.co").await?;
/// assert!(state.has_user("bob").await);
/// assert!(state.correct_password("bob", "hunter1").await);
/// assert!(!state.is_confirmed("bob").await);
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct UserState {
    inner: Arc<UserStateInternal>,
}

impl UserState {
    /// Open the user collections on `host` with default settings.
    pub async fn new(host: Arc<dyn Host>) -> Result<Self> {
        Self::with_config(host, StateConfig::default()).await
    }

    /// Open the user collections on `host`.
    pub async fn with_config(host: Arc<dyn Host>, config: StateConfig) -> Result<Self> {
        Self::with_config_and_clock(host, config, Arc::new(SystemClock)).await
    }

    /// Open the user collections on `host`, reading the time from `clock`.
    pub async fn with_config_and_clock(
        host: Arc<dyn Host>,
        config: StateConfig,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        config.validate()?;

        let creator = host.creator();
        let usernames = creator.new_set(USERNAMES).await?;
        let unconfirmed = creator.new_set(UNCONFIRMED).await?;
        let users = creator.new_hash_map(USERS).await?;

        let cookie_secret = Zeroizing::new(
            config
                .cookie_secret
                .clone()
                .unwrap_or_else(|| random_cookie_friendly_string(COOKIE_SECRET_LENGTH)),
        );
        let cookies = SecureCookies::new(cookie_secret.as_bytes(), clock.clone())?;

        debug!(
            algorithm = %config.password_algorithm,
            field_expiry = users.supports_field_expiry(),
            "user state opened"
        );

        Ok(Self {
            inner: Arc::new(UserStateInternal {
                host,
                creator,
                usernames,
                unconfirmed,
                users,
                cookie_secret,
                cookies,
                clock,
                settings: RwLock::new(Arc::new(Settings::from(&config))),
                code_generator: RwLock::new(Arc::new(random_human_friendly_string)),
            }),
        })
    }

    pub fn host(&self) -> &Arc<dyn Host> {
        &self.inner.host
    }

    pub fn creator(&self) -> &Arc<dyn Creator> {
        &self.inner.creator
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.inner.clock
    }

    /// The cookie codec bound to this state's secret.
    pub fn cookies(&self) -> &SecureCookies {
        &self.inner.cookies
    }

    /// The HMAC secret, also the salt of SHA-256 password hashes.
    pub fn cookie_secret(&self) -> &str {
        &self.inner.cookie_secret
    }

    /// The `users` hash map.
    pub fn users(&self) -> Arc<dyn HashMapStore> {
        self.inner.users.clone()
    }

    /// The `usernames` set.
    pub fn usernames(&self) -> Arc<dyn SetStore> {
        self.inner.usernames.clone()
    }

    /// The `unconfirmed` set.
    pub fn unconfirmed(&self) -> Arc<dyn SetStore> {
        self.inner.unconfirmed.clone()
    }

    /// Close the backend host.
    pub async fn close(&self) -> Result<()> {
        self.inner.host.close().await
    }

    /// A snapshot of the current settings.
    pub fn settings(&self) -> Arc<Settings> {
        self.inner
            .settings
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replace the settings with a modified copy.
    fn update_settings(&self, change: impl FnOnce(&mut Settings)) {
        let mut guard = self
            .inner
            .settings
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let mut next = Settings::clone(&guard);
        change(&mut next);
        *guard = Arc::new(next);
    }

    pub fn password_algorithm(&self) -> PasswordAlgorithm {
        self.settings().password_algorithm
    }

    /// Hash new passwords with `algorithm`. Stored hashes are not touched.
    pub fn set_password_algorithm(&self, algorithm: PasswordAlgorithm) {
        self.update_settings(|s| s.password_algorithm = algorithm);
    }

    /// Like [`UserState::set_password_algorithm`], by name: `sha256`, `bcrypt` or `bcrypt+`.
    pub fn set_password_algorithm_name(&self, name: &str) -> Result<()> {
        let algorithm: PasswordAlgorithm = name.parse()?;
        self.set_password_algorithm(algorithm);
        Ok(())
    }

    pub fn cookie_timeout(&self) -> Duration {
        self.settings().cookie_ttl
    }

    /// Change the cookie lifetime. Cookies carry whole seconds, so anything
    /// under a second is refused.
    pub fn set_cookie_timeout(&self, ttl: Duration) -> Result<()> {
        if ttl.as_secs() == 0 {
            return Err(UserError::InvalidConfiguration {
                reason: "cookie lifetime must be at least one second".to_string(),
            }
            .into());
        }
        self.update_settings(|s| s.cookie_ttl = ttl);
        Ok(())
    }

    pub fn minimum_confirmation_code_length(&self) -> usize {
        self.settings().min_confirmation_code_length
    }

    pub fn set_minimum_confirmation_code_length(&self, length: usize) -> Result<()> {
        if length == 0 {
            return Err(UserError::InvalidConfiguration {
                reason: "confirmation codes must be at least one character".to_string(),
            }
            .into());
        }
        self.update_settings(|s| s.min_confirmation_code_length = length);
        Ok(())
    }

    pub fn set_bcrypt_cost(&self, cost: u32) -> Result<()> {
        if !(MIN_BCRYPT_COST..=MAX_BCRYPT_COST).contains(&cost) {
            return Err(UserError::InvalidConfiguration {
                reason: format!("bcrypt cost {cost} outside {MIN_BCRYPT_COST}..={MAX_BCRYPT_COST}"),
            }
            .into());
        }
        self.update_settings(|s| s.bcrypt_cost = cost);
        Ok(())
    }

    pub fn secure_cookies(&self) -> bool {
        self.settings().secure_cookies
    }

    /// Make [`UserState::login`] mint `Secure` cookies.
    pub fn set_secure_cookies(&self, secure: bool) {
        self.update_settings(|s| s.secure_cookies = secure);
    }

    /// Replace the source of confirmation code candidates.
    pub fn set_confirmation_code_generator(&self, generator: CodeGenerator) {
        *self
            .inner
            .code_generator
            .write()
            .unwrap_or_else(PoisonError::into_inner) = generator;
    }

    fn code_generator(&self) -> CodeGenerator {
        self.inner
            .code_generator
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// True iff `username` is registered. Backend errors read as `false`.
    pub async fn has_user(&self, username: &str) -> bool {
        fail_closed(self.try_has_user(username).await, "user lookup", username)
    }

    /// True iff `username` is registered.
    pub async fn try_has_user(&self, username: &str) -> Result<bool> {
        self.inner.usernames.has(username).await
    }

    pub async fn all_usernames(&self) -> Result<Vec<String>> {
        self.inner.usernames.all().await
    }

    /// Register a user, overwriting any existing fields of the same name.
    ///
    /// All flags start out `false`.
    pub async fn add_user(&self, username: &str, password: &str, email: &str) -> Result<()> {
        let hash = self.hash_password(username, password).await?;
        let users = &self.inner.users;
        users.set(username, FIELD_PASSWORD, &hash).await?;
        users.set(username, FIELD_EMAIL, email).await?;
        for flag in REQUIRED_FLAGS {
            users.set(username, flag, Flag::stored(false)).await?;
        }
        // Membership last: a user only exists once every field is written
        self.inner.usernames.add(username).await?;
        debug!(username, "added user");
        Ok(())
    }

    /// Unregister a user and clear all of its fields.
    ///
    /// Every step is attempted; the first error is returned.
    pub async fn remove_user(&self, username: &str) -> Result<()> {
        let results = [
            self.inner.usernames.del(username).await,
            self.inner.unconfirmed.del(username).await,
            self.inner.users.del(username).await,
        ];
        debug!(username, "removed user");
        results.into_iter().collect()
    }

    /// The first user whose email equals `email`.
    pub async fn has_email(&self, email: &str) -> Result<String> {
        for username in self.all_usernames().await? {
            match self.inner.users.get(&username, FIELD_EMAIL).await {
                Ok(found) if found == email => return Ok(username),
                Ok(_) => {}
                Err(e) if e.is_not_found() => {}
                Err(e) => return Err(e),
            }
        }
        Err(UserError::EmailNotFound {
            email: email.to_string(),
        }
        .into())
    }

    /// A field of a registered user.
    pub async fn field(&self, username: &str, field: &str) -> Result<String> {
        if !self.try_has_user(username).await? {
            return Err(UserError::UserNotFound {
                username: username.to_string(),
            }
            .into());
        }
        self.raw_field(username, field).await
    }

    /// Read a field without checking membership.
    async fn raw_field(&self, username: &str, field: &str) -> Result<String> {
        match self.inner.users.get(username, field).await {
            Err(e) if e.is_not_found() => Err(UserError::FieldNotFound {
                username: username.to_string(),
                field: field.to_string(),
            }
            .into()),
            other => other,
        }
    }

    pub async fn set_field(&self, username: &str, field: &str, value: &str) -> Result<()> {
        self.inner.users.set(username, field, value).await
    }

    pub async fn remove_field(&self, username: &str, field: &str) -> Result<()> {
        self.inner.users.del_key(username, field).await
    }

    pub async fn email(&self, username: &str) -> Result<String> {
        self.field(username, FIELD_EMAIL).await
    }

    pub async fn password_hash(&self, username: &str) -> Result<String> {
        self.field(username, FIELD_PASSWORD).await
    }

    /// Field names stored for `username`; empty on any error.
    pub async fn properties(&self, username: &str) -> Vec<String> {
        self.inner.users.keys(username).await.unwrap_or_else(|e| {
            warn!(username, error = %e, "listing user fields failed");
            Vec::new()
        })
    }

    /// The stored state of a boolean field, ignoring membership.
    pub async fn flag(&self, username: &str, field: &str) -> Result<Flag> {
        match self.inner.users.get(username, field).await {
            Ok(raw) => Ok(Flag::from_stored(Some(&raw))),
            Err(e) if e.is_not_found() => Ok(Flag::Unset),
            Err(e) => Err(e),
        }
    }

    /// True iff the user exists and the field is `"true"`.
    pub async fn try_boolean_field(&self, username: &str, field: &str) -> Result<bool> {
        if !self.try_has_user(username).await? {
            return Ok(false);
        }
        Ok(self.flag(username, field).await?.is_true())
    }

    /// Like [`UserState::try_boolean_field`], with errors read as `false`.
    pub async fn boolean_field(&self, username: &str, field: &str) -> bool {
        fail_closed(
            self.try_boolean_field(username, field).await,
            field,
            username,
        )
    }

    pub async fn set_boolean_field(&self, username: &str, field: &str, value: bool) -> Result<()> {
        self.inner
            .users
            .set(username, field, Flag::stored(value))
            .await?;
        debug!(username, field, value, "set flag");
        Ok(())
    }

    pub async fn is_confirmed(&self, username: &str) -> bool {
        self.boolean_field(username, FIELD_CONFIRMED).await
    }

    pub async fn is_logged_in(&self, username: &str) -> bool {
        self.boolean_field(username, FIELD_LOGGED_IN).await
    }

    pub async fn is_admin(&self, username: &str) -> bool {
        self.boolean_field(username, FIELD_ADMIN).await
    }

    pub async fn mark_confirmed(&self, username: &str) -> Result<()> {
        self.set_boolean_field(username, FIELD_CONFIRMED, true).await
    }

    pub async fn set_admin_status(&self, username: &str) -> Result<()> {
        self.set_boolean_field(username, FIELD_ADMIN, true).await
    }

    pub async fn remove_admin_status(&self, username: &str) -> Result<()> {
        self.set_boolean_field(username, FIELD_ADMIN, false).await
    }

    pub async fn set_logged_in(&self, username: &str) -> Result<()> {
        self.set_boolean_field(username, FIELD_LOGGED_IN, true).await
    }

    pub async fn set_logged_out(&self, username: &str) -> Result<()> {
        self.set_boolean_field(username, FIELD_LOGGED_IN, false).await
    }

    async fn hash_password(&self, username: &str, password: &str) -> Result<String> {
        let settings = self.settings();
        let secret = Zeroizing::new(self.inner.cookie_secret.as_bytes().to_vec());
        let username = username.to_string();
        let password = Zeroizing::new(password.to_string());
        // bcrypt is deliberately slow; keep it off the async workers
        tokio::task::spawn_blocking(move || {
            password::hash_password(
                settings.password_algorithm,
                &secret,
                &username,
                &password,
                settings.bcrypt_cost,
            )
        })
        .await
        .map_err(|e| -> Error {
            PasswordError::HashingFailed {
                reason: e.to_string(),
            }
            .into()
        })?
    }

    async fn verify_hash(&self, username: &str, password: &str, stored: String) -> Result<bool> {
        let algorithm = self.password_algorithm();
        let secret = Zeroizing::new(self.inner.cookie_secret.as_bytes().to_vec());
        let username = username.to_string();
        let password = Zeroizing::new(password.to_string());
        tokio::task::spawn_blocking(move || {
            password::verify_password(algorithm, &secret, &username, &password, &stored)
        })
        .await
        .map_err(|e| {
            PasswordError::HashingFailed {
                reason: e.to_string(),
            }
            .into()
        })
    }

    /// Check a password, reporting why it was refused.
    ///
    /// Fails with [`UserError::UserNotFound`] for unknown users and
    /// [`UserError::WrongPassword`] for a mismatch or an empty stored hash.
    pub async fn verify_password(&self, username: &str, password: &str) -> Result<()> {
        if !self.try_has_user(username).await? {
            return Err(UserError::UserNotFound {
                username: username.to_string(),
            }
            .into());
        }
        let stored = match self.inner.users.get(username, FIELD_PASSWORD).await {
            Ok(hash) => hash,
            Err(e) if e.is_not_found() => String::new(),
            Err(e) => return Err(e),
        };
        if stored.is_empty() || !self.verify_hash(username, password, stored).await? {
            return Err(UserError::WrongPassword {
                username: username.to_string(),
            }
            .into());
        }
        Ok(())
    }

    /// True iff `username` exists and `password` matches its stored hash.
    pub async fn correct_password(&self, username: &str, password: &str) -> bool {
        match self.verify_password(username, password).await {
            Ok(()) => true,
            Err(e) if e.is_not_found() || e.is_authentication_error() => false,
            Err(e) => {
                warn!(username, error = %e, "password check failed");
                false
            }
        }
    }

    /// Rehash with the current algorithm and store.
    pub async fn set_password(&self, username: &str, password: &str) -> Result<()> {
        let hash = self.hash_password(username, password).await?;
        self.inner
            .users
            .set(username, FIELD_PASSWORD, &hash)
            .await?;
        debug!(username, algorithm = %self.password_algorithm(), "password updated");
        Ok(())
    }

    /// Whether tokens set with [`UserState::set_token`] expire on their own.
    ///
    /// When `false` the token is stored without a deadline and the caller
    /// must remove it.
    pub fn token_expiry_supported(&self) -> bool {
        self.inner.users.supports_field_expiry()
    }

    pub async fn set_token(&self, username: &str, token: &str, ttl: Duration) -> Result<()> {
        self.inner
            .users
            .set_expire(username, FIELD_TOKEN, token, ttl)
            .await
    }

    pub async fn get_token(&self, username: &str) -> Result<String> {
        self.raw_field(username, FIELD_TOKEN).await
    }

    pub async fn remove_token(&self, username: &str) -> Result<()> {
        self.inner.users.del_key(username, FIELD_TOKEN).await
    }
}

/// Map an error to `false`, logging it.
fn fail_closed(result: Result<bool>, what: &str, username: &str) -> bool {
    result.unwrap_or_else(|e| {
        warn!(username, error = %e, "{what} check failed; answering false");
        false
    })
}
