//! Storage capabilities consumed by Tollgate
//!
//! The user store never talks to a concrete database. It asks a [`Host`] for its
//! [`Creator`] and uses that to open named collections with four narrow
//! capabilities: [`KeyValueStore`], [`SetStore`], [`HashMapStore`] and
//! [`ListStore`]. Every value is a UTF-8 string.
//!
//! Two drivers ship with the crate:
//!
//! - [`in_memory::InMemory`]: lock-protected maps with JSON persistence and
//!   native per-field expiry.
//! - `sql::SqlxBackend` (features `sqlite` / `postgres`): sqlx `AnyPool` with a
//!   portable schema.
//!
//! No operation spans more than one call to the backend; callers that need a
//! multi-step change must tolerate interleaving with other requests.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::Result;

pub mod errors;
pub mod in_memory;
#[cfg(any(feature = "sqlite", feature = "postgres"))]
pub mod sql;

pub use errors::BackendError;
pub use in_memory::InMemory;

/// A live connection to a storage backend.
#[async_trait]
pub trait Host: Send + Sync {
    /// Check that the backend is reachable.
    async fn ping(&self) -> Result<()>;

    /// Release the connection. Further operations may fail.
    async fn close(&self) -> Result<()>;

    /// The factory for named collections on this host.
    fn creator(&self) -> Arc<dyn Creator>;
}

/// Mints named collections on a [`Host`].
///
/// The id is a namespace: opening the same id twice yields two handles onto
/// the same data.
#[async_trait]
pub trait Creator: Send + Sync {
    async fn new_set(&self, id: &str) -> Result<Arc<dyn SetStore>>;
    async fn new_hash_map(&self, id: &str) -> Result<Arc<dyn HashMapStore>>;
    async fn new_key_value(&self, id: &str) -> Result<Arc<dyn KeyValueStore>>;
    async fn new_list(&self, id: &str) -> Result<Arc<dyn ListStore>>;
}

/// String keys to string values.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Returns [`BackendError::NotFound`] for a missing key.
    async fn get(&self, key: &str) -> Result<String>;

    async fn del(&self, key: &str) -> Result<()>;

    /// Increment the integer stored under `key` and return the new value.
    ///
    /// A missing or unparseable value counts as 0.
    async fn inc(&self, key: &str) -> Result<String>;

    /// Remove every key, keeping the collection.
    async fn clear(&self) -> Result<()>;

    /// Drop the collection itself.
    async fn remove(&self) -> Result<()>;
}

/// A set of unique strings.
#[async_trait]
pub trait SetStore: Send + Sync {
    /// Add a member. Adding an existing member is a no-op.
    async fn add(&self, member: &str) -> Result<()>;
    async fn has(&self, member: &str) -> Result<bool>;
    async fn del(&self, member: &str) -> Result<()>;

    /// All members, in an order that is stable between calls.
    async fn all(&self) -> Result<Vec<String>>;

    async fn clear(&self) -> Result<()>;
    async fn remove(&self) -> Result<()>;
}

/// `owner -> field -> value`, where each owner is a logical row.
#[async_trait]
pub trait HashMapStore: Send + Sync {
    async fn set(&self, owner: &str, field: &str, value: &str) -> Result<()>;

    /// Store a value that disappears after `ttl`.
    ///
    /// Backends without native per-field expiry store the value without a
    /// deadline; check [`HashMapStore::supports_field_expiry`].
    async fn set_expire(&self, owner: &str, field: &str, value: &str, ttl: Duration)
    -> Result<()>;

    /// Returns [`BackendError::NotFound`] if the field is absent.
    async fn get(&self, owner: &str, field: &str) -> Result<String>;
    async fn has(&self, owner: &str, field: &str) -> Result<bool>;

    /// True if the owner has at least one field.
    async fn exists(&self, owner: &str) -> Result<bool>;

    /// Field names stored for `owner`.
    async fn keys(&self, owner: &str) -> Result<Vec<String>>;

    async fn del_key(&self, owner: &str, field: &str) -> Result<()>;

    /// Remove every field of `owner`.
    async fn del(&self, owner: &str) -> Result<()>;

    /// Unique owner names.
    async fn all(&self) -> Result<Vec<String>>;

    async fn clear(&self) -> Result<()>;
    async fn remove(&self) -> Result<()>;

    /// Whether [`HashMapStore::set_expire`] actually expires values.
    fn supports_field_expiry(&self) -> bool;
}

/// An append-only sequence of strings.
#[async_trait]
pub trait ListStore: Send + Sync {
    async fn add(&self, item: &str) -> Result<()>;
    async fn all(&self) -> Result<Vec<String>>;

    /// Returns [`BackendError::NotFound`] on an empty list.
    async fn last(&self) -> Result<String>;

    /// Up to `n` items from the end, oldest first.
    async fn last_n(&self, n: usize) -> Result<Vec<String>>;

    async fn clear(&self) -> Result<()>;
    async fn remove(&self) -> Result<()>;
}
