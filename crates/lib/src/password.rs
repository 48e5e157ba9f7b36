//! Password hashing
//!
//! Three schemes share one hash/verify contract:
//!
//! - `sha256`: SHA-256 over `secret ‖ username ‖ password`, stored as 64
//!   lowercase hex characters.
//! - `bcrypt`: standard bcrypt.
//! - `bcrypt+`: always hashes with bcrypt, but also accepts legacy `sha256`
//!   hashes, so old accounts keep working and are upgraded the next time their
//!   password is set.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use thiserror::Error;

use crate::Result;

/// Length of a hex-encoded SHA-256 digest.
pub const SHA256_HEX_LENGTH: usize = 64;

/// Errors from the password module.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum PasswordError {
    /// Algorithm name not one of `sha256`, `bcrypt`, `bcrypt+`.
    #[error("Unsupported password algorithm: {name}")]
    UnsupportedAlgorithm { name: String },

    #[error("Password hashing failed: {reason}")]
    HashingFailed { reason: String },
}

impl PasswordError {
    /// Check if this error is caused by invalid configuration.
    pub fn is_configuration_error(&self) -> bool {
        matches!(self, PasswordError::UnsupportedAlgorithm { .. })
    }
}

impl From<PasswordError> for crate::Error {
    fn from(err: PasswordError) -> Self {
        crate::Error::Password(err)
    }
}

/// Hashing scheme used for new passwords.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PasswordAlgorithm {
    #[serde(rename = "sha256")]
    Sha256,
    #[serde(rename = "bcrypt")]
    Bcrypt,
    /// bcrypt for new hashes, bcrypt or legacy SHA-256 on verify.
    #[default]
    #[serde(rename = "bcrypt+")]
    BcryptPlus,
}

impl PasswordAlgorithm {
    /// The configuration name of this algorithm.
    pub fn as_str(&self) -> &'static str {
        match self {
            PasswordAlgorithm::Sha256 => "sha256",
            PasswordAlgorithm::Bcrypt => "bcrypt",
            PasswordAlgorithm::BcryptPlus => "bcrypt+",
        }
    }
}

impl fmt::Display for PasswordAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PasswordAlgorithm {
    type Err = PasswordError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "sha256" => Ok(PasswordAlgorithm::Sha256),
            "bcrypt" => Ok(PasswordAlgorithm::Bcrypt),
            "bcrypt+" => Ok(PasswordAlgorithm::BcryptPlus),
            other => Err(PasswordError::UnsupportedAlgorithm {
                name: other.to_string(),
            }),
        }
    }
}

/// Salted SHA-256 of a password, hex encoded.
pub fn hash_sha256(secret: &[u8], username: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(secret);
    hasher.update(username.as_bytes());
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

/// Whether a stored hash looks like a [`hash_sha256`] result rather than bcrypt.
pub fn is_sha256_shape(stored: &str) -> bool {
    stored.len() == SHA256_HEX_LENGTH
        && !stored.starts_with("$2")
        && stored.bytes().all(|b| b.is_ascii_hexdigit())
}

/// Hash `password` for storage under `algorithm`.
///
/// `secret` salts the SHA-256 scheme; `cost` is the bcrypt work factor.
pub fn hash_password(
    algorithm: PasswordAlgorithm,
    secret: &[u8],
    username: &str,
    password: &str,
    cost: u32,
) -> Result<String> {
    match algorithm {
        PasswordAlgorithm::Sha256 => Ok(hash_sha256(secret, username, password)),
        PasswordAlgorithm::Bcrypt | PasswordAlgorithm::BcryptPlus => bcrypt::hash(password, cost)
            .map_err(|e| {
                PasswordError::HashingFailed {
                    reason: e.to_string(),
                }
                .into()
            }),
    }
}

/// Check `password` against a stored hash.
///
/// Malformed hashes verify as false.
pub fn verify_password(
    algorithm: PasswordAlgorithm,
    secret: &[u8],
    username: &str,
    password: &str,
    stored: &str,
) -> bool {
    match algorithm {
        PasswordAlgorithm::Sha256 => verify_sha256(secret, username, password, stored),
        PasswordAlgorithm::Bcrypt => verify_bcrypt(password, stored),
        PasswordAlgorithm::BcryptPlus => {
            (is_sha256_shape(stored) && verify_sha256(secret, username, password, stored))
                || verify_bcrypt(password, stored)
        }
    }
}

fn verify_sha256(secret: &[u8], username: &str, password: &str, stored: &str) -> bool {
    let computed = hash_sha256(secret, username, password);
    computed.as_bytes().ct_eq(stored.as_bytes()).into()
}

fn verify_bcrypt(password: &str, stored: &str) -> bool {
    bcrypt::verify(password, stored).unwrap_or(false)
}
