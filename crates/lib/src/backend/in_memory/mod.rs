//! In-memory storage backend
//!
//! All collections live in one map behind a `tokio` read-write lock. The state
//! can be saved to and loaded from a JSON file, which is how the demo server
//! keeps its users across restarts.
//!
//! Hash-map fields written with [`HashMapStore::set_expire`] carry a deadline
//! and stop being visible once the backend's [`Clock`] passes it.
//!
//! [`HashMapStore::set_expire`]: crate::backend::HashMapStore::set_expire

mod collections;
mod persistence;

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use self::collections::{MemoryHashMap, MemoryKeyValue, MemoryList, MemorySet};
use crate::Result;
use crate::backend::errors::BackendError;
use crate::backend::{Creator, HashMapStore, Host, KeyValueStore, ListStore, SetStore};
use crate::clock::{Clock, SystemClock};

/// A hash-map field value with an optional deadline in Unix milliseconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct FieldValue {
    pub(crate) value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) expires_at: Option<u64>,
}

impl FieldValue {
    pub(crate) fn is_live(&self, now: u64) -> bool {
        self.expires_at.is_none_or(|deadline| now < deadline)
    }
}

/// owner -> field -> value
pub(crate) type Rows = BTreeMap<String, BTreeMap<String, FieldValue>>;

/// Every collection, grouped by capability and keyed by collection id.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct Collections {
    #[serde(default)]
    pub(crate) key_values: HashMap<String, BTreeMap<String, String>>,
    #[serde(default)]
    pub(crate) sets: HashMap<String, BTreeSet<String>>,
    #[serde(default)]
    pub(crate) hash_maps: HashMap<String, Rows>,
    #[serde(default)]
    pub(crate) lists: HashMap<String, Vec<String>>,
}

impl Collections {
    /// Drop every hash-map field whose deadline has passed.
    pub(crate) fn purge_expired(&mut self, now: u64) {
        for rows in self.hash_maps.values_mut() {
            for fields in rows.values_mut() {
                fields.retain(|_, v| v.is_live(now));
            }
            rows.retain(|_, fields| !fields.is_empty());
        }
    }
}

#[derive(Debug)]
struct Inner {
    data: RwLock<Collections>,
    clock: Arc<dyn Clock>,
    closed: AtomicBool,
}

/// Lock-protected in-memory backend.
///
/// Cloning is cheap and every clone shares the same data.
#[derive(Debug, Clone)]
pub struct InMemory {
    inner: Arc<Inner>,
}

impl Default for InMemory {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemory {
    /// Creates a new, empty backend on the system clock.
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Creates a new, empty backend whose field expiry follows `clock`.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self::from_collections(Collections::default(), clock)
    }

    pub(crate) fn from_collections(data: Collections, clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Arc::new(Inner {
                data: RwLock::new(data),
                clock,
                closed: AtomicBool::new(false),
            }),
        }
    }

    /// Saves every collection to `path` as JSON. Expired fields are skipped.
    pub async fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        persistence::save_to_file(self, path).await
    }

    /// Loads a backend previously written by [`InMemory::save_to_file`].
    ///
    /// A missing file yields an empty backend.
    pub async fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        persistence::load_from_file(path, Arc::new(SystemClock)).await
    }

    /// Like [`InMemory::load_from_file`] with an explicit clock.
    pub async fn load_from_file_with_clock<P: AsRef<Path>>(
        path: P,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        persistence::load_from_file(path, clock).await
    }

    /// Ids of every non-empty collection, sorted.
    pub async fn collection_ids(&self) -> Vec<String> {
        let data = self.inner.data.read().await;
        let mut ids: Vec<String> = data
            .key_values
            .keys()
            .chain(data.sets.keys())
            .chain(data.hash_maps.keys())
            .chain(data.lists.keys())
            .cloned()
            .collect();
        ids.sort();
        ids.dedup();
        ids
    }

    /// The shared collections, refused once the host is closed.
    pub(crate) fn data(&self) -> Result<&RwLock<Collections>> {
        if self.is_closed() {
            return Err(BackendError::Closed.into());
        }
        Ok(&self.inner.data)
    }

    pub(crate) fn now(&self) -> u64 {
        self.inner.clock.now_millis()
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }
}

#[async_trait]
impl Host for InMemory {
    async fn ping(&self) -> Result<()> {
        if self.is_closed() {
            return Err(BackendError::Closed.into());
        }
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.inner.closed.store(true, Ordering::Release);
        tracing::debug!("in-memory backend closed");
        Ok(())
    }

    fn creator(&self) -> Arc<dyn Creator> {
        Arc::new(self.clone())
    }
}

#[async_trait]
impl Creator for InMemory {
    async fn new_set(&self, id: &str) -> Result<Arc<dyn SetStore>> {
        Ok(Arc::new(MemorySet::new(self.clone(), id)))
    }

    async fn new_hash_map(&self, id: &str) -> Result<Arc<dyn HashMapStore>> {
        Ok(Arc::new(MemoryHashMap::new(self.clone(), id)))
    }

    async fn new_key_value(&self, id: &str) -> Result<Arc<dyn KeyValueStore>> {
        Ok(Arc::new(MemoryKeyValue::new(self.clone(), id)))
    }

    async fn new_list(&self, id: &str) -> Result<Arc<dyn ListStore>> {
        Ok(Arc::new(MemoryList::new(self.clone(), id)))
    }
}
