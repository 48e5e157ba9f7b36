//! Signed cookies and random strings
//!
//! A cookie value carries `value|expiry` followed by an HMAC-SHA-256 tag over
//! those bytes, all base64url encoded without padding. The expiry is a Unix
//! timestamp in seconds and is checked on every read, independent of the
//! browser's `Expires` handling.
//!
//! Reading fails closed: a missing cookie, undecodable bytes, a wrong tag and a
//! passed deadline each produce a distinct [`CookieError`], and none of them
//! yield a value.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use axum::http::header::{COOKIE, SET_COOKIE};
use axum::http::{HeaderMap, HeaderValue};
use base64ct::{Base64UrlUnpadded, Encoding};
use hmac::{Hmac, Mac};
use rand::Rng;
use rand::distributions::Alphanumeric;
use sha2::Sha256;
use thiserror::Error;
use time::OffsetDateTime;
use tower_cookies::Cookie;
use zeroize::Zeroizing;

use crate::clock::Clock;

type HmacSha256 = Hmac<Sha256>;

/// Length of the HMAC-SHA-256 tag appended to the payload.
pub const TAG_LENGTH: usize = 32;

/// Errors from reading or writing signed cookies.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum CookieError {
    /// No cookie with this name on the request.
    #[error("Cookie {name} not present")]
    Missing { name: String },

    /// Not something this codec produced.
    #[error("Cookie {name} is malformed: {reason}")]
    Malformed { name: String, reason: String },

    /// The HMAC tag does not match the payload.
    #[error("Cookie {name} has an invalid signature")]
    BadSignature { name: String },

    /// The embedded deadline has passed.
    #[error("Cookie {name} has expired")]
    Expired { name: String },

    /// The HMAC secret is empty.
    #[error("Cookie secret must not be empty")]
    InvalidSecret,

    /// The cookie could not be turned into a header.
    #[error("Cookie {name} could not be encoded: {reason}")]
    Encoding { name: String, reason: String },
}

impl CookieError {
    /// Check if the cookie was simply absent.
    pub fn is_missing(&self) -> bool {
        matches!(self, CookieError::Missing { .. })
    }

    /// Check if the cookie was present but failed verification.
    pub fn is_invalid(&self) -> bool {
        matches!(
            self,
            CookieError::Malformed { .. }
                | CookieError::BadSignature { .. }
                | CookieError::Expired { .. }
        )
    }
}

impl From<CookieError> for crate::Error {
    fn from(err: CookieError) -> Self {
        crate::Error::Cookie(err)
    }
}

/// Attributes of an outgoing cookie.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CookieOptions<'a> {
    pub path: &'a str,
    pub ttl: Duration,
    pub secure: bool,
    pub http_only: bool,
}

/// Mints and verifies cookies bound to one secret.
///
/// Holds the HMAC already keyed with the secret; the secret bytes themselves
/// are wiped once the key schedule is computed.
#[derive(Clone)]
pub struct SecureCookies {
    mac: HmacSha256,
    clock: Arc<dyn Clock>,
}

impl fmt::Debug for SecureCookies {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecureCookies")
            .field("secret", &"<redacted>")
            .field("clock", &self.clock)
            .finish()
    }
}

impl SecureCookies {
    pub fn new(secret: impl Into<Vec<u8>>, clock: Arc<dyn Clock>) -> Result<Self, CookieError> {
        let secret = Zeroizing::new(secret.into());
        if secret.is_empty() {
            return Err(CookieError::InvalidSecret);
        }
        let mac = HmacSha256::new_from_slice(&secret).map_err(|_| CookieError::InvalidSecret)?;
        Ok(Self { mac, clock })
    }

    /// Encode `value` with an absolute deadline in Unix seconds.
    pub fn encode(&self, value: &str, expires_at: i64) -> String {
        let payload = format!("{value}|{expires_at}");
        let mut mac = self.mac.clone();
        mac.update(payload.as_bytes());
        let tag = mac.finalize().into_bytes();

        let mut bytes = payload.into_bytes();
        bytes.extend_from_slice(&tag);
        Base64UrlUnpadded::encode_string(&bytes)
    }

    /// Verify an encoded cookie value and return what it carries.
    pub fn decode(&self, name: &str, encoded: &str) -> Result<String, CookieError> {
        let malformed = |reason: &str| CookieError::Malformed {
            name: name.to_string(),
            reason: reason.to_string(),
        };

        let bytes = Base64UrlUnpadded::decode_vec(encoded).map_err(|_| malformed("not base64"))?;
        if bytes.len() < TAG_LENGTH {
            return Err(malformed("too short"));
        }
        let (payload, tag) = bytes.split_at(bytes.len() - TAG_LENGTH);

        let mut mac = self.mac.clone();
        mac.update(payload);
        mac.verify_slice(tag).map_err(|_| CookieError::BadSignature {
            name: name.to_string(),
        })?;

        let payload = std::str::from_utf8(payload).map_err(|_| malformed("not UTF-8"))?;
        let (value, expires_at) = payload
            .rsplit_once('|')
            .ok_or_else(|| malformed("no expiry"))?;
        let expires_at: i64 = expires_at.parse().map_err(|_| malformed("bad expiry"))?;

        if self.clock.now_secs() >= expires_at {
            return Err(CookieError::Expired {
                name: name.to_string(),
            });
        }
        Ok(value.to_string())
    }

    /// Append a signed `Set-Cookie` header to `headers`.
    pub fn set_secure_cookie(
        &self,
        headers: &mut HeaderMap,
        name: &str,
        value: &str,
        options: CookieOptions<'_>,
    ) -> Result<(), CookieError> {
        let encoding_error = |reason: String| CookieError::Encoding {
            name: name.to_string(),
            reason,
        };

        let ttl = i64::try_from(options.ttl.as_secs())
            .map_err(|_| encoding_error("lifetime out of range".to_string()))?;
        let expires_at = self.clock.now_secs().saturating_add(ttl);
        let expires = OffsetDateTime::from_unix_timestamp(expires_at)
            .map_err(|e| encoding_error(e.to_string()))?;

        let cookie = Cookie::build((name.to_string(), self.encode(value, expires_at)))
            .path(options.path.to_string())
            .expires(expires)
            .secure(options.secure)
            .http_only(options.http_only)
            .build();

        let header =
            HeaderValue::from_str(&cookie.to_string()).map_err(|e| encoding_error(e.to_string()))?;
        headers.append(SET_COOKIE, header);
        Ok(())
    }

    /// Read and verify the cookie `name` from request headers.
    ///
    /// When several cookies share the name, the first one decides.
    pub fn read_secure_cookie(&self, headers: &HeaderMap, name: &str) -> Result<String, CookieError> {
        let raw = find_cookie(headers, name).ok_or_else(|| CookieError::Missing {
            name: name.to_string(),
        })?;
        self.decode(name, &raw)
    }
}

/// Raw value of the first cookie called `name` in the `Cookie` headers.
pub fn find_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| Cookie::split_parse(value.to_string()))
        .filter_map(|parsed| parsed.ok())
        .find(|cookie| cookie.name() == name)
        .map(|cookie| cookie.value().to_string())
}

/// Append a `Set-Cookie` header that makes the browser drop `name`.
pub fn clear_cookie(headers: &mut HeaderMap, name: &str, path: &str) -> Result<(), CookieError> {
    let cookie = Cookie::build((name.to_string(), String::new()))
        .path(path.to_string())
        .expires(OffsetDateTime::UNIX_EPOCH)
        .max_age(time::Duration::ZERO)
        .build();
    let header = HeaderValue::from_str(&cookie.to_string()).map_err(|e| CookieError::Encoding {
        name: name.to_string(),
        reason: e.to_string(),
    })?;
    headers.append(SET_COOKIE, header);
    Ok(())
}

/// Random string of `length` characters from `[a-zA-Z0-9]`.
pub fn random_cookie_friendly_string(length: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(length)
        .map(char::from)
        .collect()
}

const VOWELS: &[u8] = b"aeoiu";
const CONSONANTS: &[u8] = b"bdfgklmnoprstv";
const RARE_CONSONANTS: &[u8] = b"chjqwxyz";

/// Random lowercase string that is easy to read aloud and type.
///
/// Vowels and consonants alternate, starting with either, and one consonant
/// in a hundred comes from the less common letters.
pub fn random_human_friendly_string(length: usize) -> String {
    let mut rng = rand::thread_rng();
    let offset = rng.gen_range(0..2);
    (0..length)
        .map(|i| {
            let pool = if (i + offset) % 2 == 0 {
                VOWELS
            } else if rng.gen_range(0..100) > 0 {
                CONSONANTS
            } else {
                RARE_CONSONANTS
            };
            char::from(pool[rng.gen_range(0..pool.len())])
        })
        .collect()
}
