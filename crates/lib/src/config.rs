//! Construction-time settings for [`UserState`](crate::UserState).
//!
//! # Example
//!
//! ```
//! use tollgate::StateConfig;
//! use tollgate::password::PasswordAlgorithm;
//!
//! let config = StateConfig {
//!     password_algorithm: PasswordAlgorithm::Bcrypt,
//!     secure_cookies: true,
//!     ..Default::default()
//! };
//! assert!(config.validate().is_ok());
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::Result;
use crate::constants::{
    DEFAULT_BCRYPT_COST, DEFAULT_COOKIE_TTL, MAX_BCRYPT_COST, MAX_CONFIRMATION_CODE_LENGTH,
    MIN_BCRYPT_COST, MIN_CONFIRMATION_CODE_LENGTH,
};
use crate::password::PasswordAlgorithm;
use crate::user::UserError;

fn default_cookie_ttl_secs() -> u64 {
    DEFAULT_COOKIE_TTL.as_secs()
}

fn default_min_code_length() -> usize {
    MIN_CONFIRMATION_CODE_LENGTH
}

fn default_max_code_length() -> usize {
    MAX_CONFIRMATION_CODE_LENGTH
}

fn default_bcrypt_cost() -> u32 {
    DEFAULT_BCRYPT_COST
}

/// Settings for a [`UserState`](crate::UserState).
///
/// Every field has a default, so a partial JSON document deserializes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateConfig {
    /// Lifetime of the login cookie, in seconds.
    #[serde(default = "default_cookie_ttl_secs")]
    pub cookie_ttl_secs: u64,

    /// HMAC secret for cookies.
    ///
    /// When `None`, a random secret is generated per instance and every
    /// cookie becomes invalid when the process restarts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cookie_secret: Option<String>,

    /// Hashing scheme for new passwords.
    #[serde(default)]
    pub password_algorithm: PasswordAlgorithm,

    /// Length of the first confirmation code attempt.
    #[serde(default = "default_min_code_length")]
    pub min_confirmation_code_length: usize,

    /// Generation fails rather than produce a longer code.
    #[serde(default = "default_max_code_length")]
    pub max_confirmation_code_length: usize,

    /// bcrypt work factor.
    #[serde(default = "default_bcrypt_cost")]
    pub bcrypt_cost: u32,

    /// Mark login cookies `Secure`.
    #[serde(default)]
    pub secure_cookies: bool,
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            cookie_ttl_secs: default_cookie_ttl_secs(),
            cookie_secret: None,
            password_algorithm: PasswordAlgorithm::default(),
            min_confirmation_code_length: default_min_code_length(),
            max_confirmation_code_length: default_max_code_length(),
            bcrypt_cost: default_bcrypt_cost(),
            secure_cookies: false,
        }
    }
}

impl StateConfig {
    /// The cookie lifetime as a [`Duration`].
    pub fn cookie_ttl(&self) -> Duration {
        Duration::from_secs(self.cookie_ttl_secs)
    }

    /// Reject settings that can never work.
    pub fn validate(&self) -> Result<()> {
        if !(MIN_BCRYPT_COST..=MAX_BCRYPT_COST).contains(&self.bcrypt_cost) {
            return Err(invalid(format!(
                "bcrypt cost {} outside {MIN_BCRYPT_COST}..={MAX_BCRYPT_COST}",
                self.bcrypt_cost
            )));
        }
        if self.cookie_ttl_secs == 0 {
            return Err(invalid("cookie lifetime must be positive".to_string()));
        }
        if self.min_confirmation_code_length == 0 {
            return Err(invalid(
                "confirmation codes must be at least one character".to_string(),
            ));
        }
        if self.cookie_secret.as_deref() == Some("") {
            return Err(invalid("cookie secret must not be empty".to_string()));
        }
        Ok(())
    }
}

fn invalid(reason: String) -> crate::Error {
    UserError::InvalidConfiguration { reason }.into()
}
