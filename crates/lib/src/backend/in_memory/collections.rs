//! Collection handles of the in-memory backend.

use std::time::Duration;

use async_trait::async_trait;

use super::{FieldValue, InMemory};
use crate::Result;
use crate::backend::errors::BackendError;
use crate::backend::{HashMapStore, KeyValueStore, ListStore, SetStore};

pub(crate) struct MemoryKeyValue {
    backend: InMemory,
    id: String,
}

impl MemoryKeyValue {
    pub(crate) fn new(backend: InMemory, id: &str) -> Self {
        Self {
            backend,
            id: id.to_string(),
        }
    }
}

#[async_trait]
impl KeyValueStore for MemoryKeyValue {
    async fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut data = self.backend.data()?.write().await;
        data.key_values
            .entry(self.id.clone())
            .or_default()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<String> {
        let data = self.backend.data()?.read().await;
        data.key_values
            .get(&self.id)
            .and_then(|m| m.get(key))
            .cloned()
            .ok_or_else(|| BackendError::not_found(&self.id, key).into())
    }

    async fn del(&self, key: &str) -> Result<()> {
        let mut data = self.backend.data()?.write().await;
        if let Some(m) = data.key_values.get_mut(&self.id) {
            m.remove(key);
        }
        Ok(())
    }

    async fn inc(&self, key: &str) -> Result<String> {
        let mut data = self.backend.data()?.write().await;
        let value = data
            .key_values
            .entry(self.id.clone())
            .or_default()
            .entry(key.to_string())
            .or_default();
        let current: i64 = value.parse().unwrap_or(0);
        let next = current
            .checked_add(1)
            .ok_or_else(|| BackendError::OperationFailed {
                operation: "inc".to_string(),
                collection: self.id.clone(),
                reason: format!("counter {key} overflowed"),
            })?;
        *value = next.to_string();
        Ok(value.clone())
    }

    async fn clear(&self) -> Result<()> {
        let mut data = self.backend.data()?.write().await;
        if let Some(m) = data.key_values.get_mut(&self.id) {
            m.clear();
        }
        Ok(())
    }

    async fn remove(&self) -> Result<()> {
        self.backend.data()?.write().await.key_values.remove(&self.id);
        Ok(())
    }
}

pub(crate) struct MemorySet {
    backend: InMemory,
    id: String,
}

impl MemorySet {
    pub(crate) fn new(backend: InMemory, id: &str) -> Self {
        Self {
            backend,
            id: id.to_string(),
        }
    }
}

#[async_trait]
impl SetStore for MemorySet {
    async fn add(&self, member: &str) -> Result<()> {
        let mut data = self.backend.data()?.write().await;
        data.sets
            .entry(self.id.clone())
            .or_default()
            .insert(member.to_string());
        Ok(())
    }

    async fn has(&self, member: &str) -> Result<bool> {
        let data = self.backend.data()?.read().await;
        Ok(data.sets.get(&self.id).is_some_and(|s| s.contains(member)))
    }

    async fn del(&self, member: &str) -> Result<()> {
        let mut data = self.backend.data()?.write().await;
        if let Some(s) = data.sets.get_mut(&self.id) {
            s.remove(member);
        }
        Ok(())
    }

    async fn all(&self) -> Result<Vec<String>> {
        let data = self.backend.data()?.read().await;
        Ok(data
            .sets
            .get(&self.id)
            .map(|s| s.iter().cloned().collect())
            .unwrap_or_default())
    }

    async fn clear(&self) -> Result<()> {
        let mut data = self.backend.data()?.write().await;
        if let Some(s) = data.sets.get_mut(&self.id) {
            s.clear();
        }
        Ok(())
    }

    async fn remove(&self) -> Result<()> {
        self.backend.data()?.write().await.sets.remove(&self.id);
        Ok(())
    }
}

pub(crate) struct MemoryHashMap {
    backend: InMemory,
    id: String,
}

impl MemoryHashMap {
    pub(crate) fn new(backend: InMemory, id: &str) -> Self {
        Self {
            backend,
            id: id.to_string(),
        }
    }

    async fn insert(&self, owner: &str, field: &str, value: FieldValue) -> Result<()> {
        let now = self.backend.now();
        let mut data = self.backend.data()?.write().await;
        let row = data
            .hash_maps
            .entry(self.id.clone())
            .or_default()
            .entry(owner.to_string())
            .or_default();
        row.retain(|_, v| v.is_live(now));
        row.insert(field.to_string(), value);
        Ok(())
    }
}

#[async_trait]
impl HashMapStore for MemoryHashMap {
    async fn set(&self, owner: &str, field: &str, value: &str) -> Result<()> {
        self.insert(
            owner,
            field,
            FieldValue {
                value: value.to_string(),
                expires_at: None,
            },
        )
        .await
    }

    async fn set_expire(
        &self,
        owner: &str,
        field: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<()> {
        let ttl_millis = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX);
        let deadline = self.backend.now().saturating_add(ttl_millis);
        self.insert(
            owner,
            field,
            FieldValue {
                value: value.to_string(),
                expires_at: Some(deadline),
            },
        )
        .await
    }

    async fn get(&self, owner: &str, field: &str) -> Result<String> {
        let now = self.backend.now();
        let data = self.backend.data()?.read().await;
        data.hash_maps
            .get(&self.id)
            .and_then(|rows| rows.get(owner))
            .and_then(|fields| fields.get(field))
            .filter(|v| v.is_live(now))
            .map(|v| v.value.clone())
            .ok_or_else(|| BackendError::not_found(&self.id, format!("{owner}/{field}")).into())
    }

    async fn has(&self, owner: &str, field: &str) -> Result<bool> {
        let now = self.backend.now();
        let data = self.backend.data()?.read().await;
        Ok(data
            .hash_maps
            .get(&self.id)
            .and_then(|rows| rows.get(owner))
            .and_then(|fields| fields.get(field))
            .is_some_and(|v| v.is_live(now)))
    }

    async fn exists(&self, owner: &str) -> Result<bool> {
        let now = self.backend.now();
        let data = self.backend.data()?.read().await;
        Ok(data
            .hash_maps
            .get(&self.id)
            .and_then(|rows| rows.get(owner))
            .is_some_and(|fields| fields.values().any(|v| v.is_live(now))))
    }

    async fn keys(&self, owner: &str) -> Result<Vec<String>> {
        let now = self.backend.now();
        let data = self.backend.data()?.read().await;
        Ok(data
            .hash_maps
            .get(&self.id)
            .and_then(|rows| rows.get(owner))
            .map(|fields| {
                fields
                    .iter()
                    .filter(|(_, v)| v.is_live(now))
                    .map(|(k, _)| k.clone())
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn del_key(&self, owner: &str, field: &str) -> Result<()> {
        let mut data = self.backend.data()?.write().await;
        if let Some(rows) = data.hash_maps.get_mut(&self.id)
            && let Some(fields) = rows.get_mut(owner)
        {
            fields.remove(field);
            if fields.is_empty() {
                rows.remove(owner);
            }
        }
        Ok(())
    }

    async fn del(&self, owner: &str) -> Result<()> {
        let mut data = self.backend.data()?.write().await;
        if let Some(rows) = data.hash_maps.get_mut(&self.id) {
            rows.remove(owner);
        }
        Ok(())
    }

    async fn all(&self) -> Result<Vec<String>> {
        let now = self.backend.now();
        let data = self.backend.data()?.read().await;
        Ok(data
            .hash_maps
            .get(&self.id)
            .map(|rows| {
                rows.iter()
                    .filter(|(_, fields)| fields.values().any(|v| v.is_live(now)))
                    .map(|(owner, _)| owner.clone())
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn clear(&self) -> Result<()> {
        let mut data = self.backend.data()?.write().await;
        if let Some(rows) = data.hash_maps.get_mut(&self.id) {
            rows.clear();
        }
        Ok(())
    }

    async fn remove(&self) -> Result<()> {
        self.backend.data()?.write().await.hash_maps.remove(&self.id);
        Ok(())
    }

    fn supports_field_expiry(&self) -> bool {
        true
    }
}

pub(crate) struct MemoryList {
    backend: InMemory,
    id: String,
}

impl MemoryList {
    pub(crate) fn new(backend: InMemory, id: &str) -> Self {
        Self {
            backend,
            id: id.to_string(),
        }
    }
}

#[async_trait]
impl ListStore for MemoryList {
    async fn add(&self, item: &str) -> Result<()> {
        let mut data = self.backend.data()?.write().await;
        data.lists
            .entry(self.id.clone())
            .or_default()
            .push(item.to_string());
        Ok(())
    }

    async fn all(&self) -> Result<Vec<String>> {
        let data = self.backend.data()?.read().await;
        Ok(data.lists.get(&self.id).cloned().unwrap_or_default())
    }

    async fn last(&self) -> Result<String> {
        let data = self.backend.data()?.read().await;
        data.lists
            .get(&self.id)
            .and_then(|l| l.last())
            .cloned()
            .ok_or_else(|| BackendError::not_found(&self.id, "last item").into())
    }

    async fn last_n(&self, n: usize) -> Result<Vec<String>> {
        let data = self.backend.data()?.read().await;
        Ok(data
            .lists
            .get(&self.id)
            .map(|l| l[l.len().saturating_sub(n)..].to_vec())
            .unwrap_or_default())
    }

    async fn clear(&self) -> Result<()> {
        let mut data = self.backend.data()?.write().await;
        if let Some(l) = data.lists.get_mut(&self.id) {
            l.clear();
        }
        Ok(())
    }

    async fn remove(&self) -> Result<()> {
        self.backend.data()?.write().await.lists.remove(&self.id);
        Ok(())
    }
}
