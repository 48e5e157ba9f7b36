//! Collection handles of the SQL backend.

use std::time::Duration;

use async_trait::async_trait;

use super::{SqlxBackend, SqlxResultExt};
use crate::Result;
use crate::backend::errors::BackendError;
use crate::backend::{HashMapStore, KeyValueStore, ListStore, SetStore};

pub(crate) struct SqlKeyValue {
    backend: SqlxBackend,
    id: String,
}

impl SqlKeyValue {
    pub(crate) fn new(backend: SqlxBackend, id: &str) -> Self {
        Self {
            backend,
            id: id.to_string(),
        }
    }
}

const KV_UPSERT: &str = "INSERT INTO kv_entries (collection, entry_key, entry_value) VALUES ($1, $2, $3)
     ON CONFLICT (collection, entry_key) DO UPDATE SET entry_value = excluded.entry_value";

#[async_trait]
impl KeyValueStore for SqlKeyValue {
    async fn set(&self, key: &str, value: &str) -> Result<()> {
        sqlx::query(KV_UPSERT)
            .bind(&self.id)
            .bind(key)
            .bind(value)
            .execute(self.backend.pool())
            .await
            .sql_context(&format!("set on {}", self.id))?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<String> {
        let row: Option<(String,)> = sqlx::query_as(
            "SELECT entry_value FROM kv_entries WHERE collection = $1 AND entry_key = $2",
        )
        .bind(&self.id)
        .bind(key)
        .fetch_optional(self.backend.pool())
        .await
        .sql_context(&format!("get on {}", self.id))?;
        row.map(|(v,)| v)
            .ok_or_else(|| BackendError::not_found(&self.id, key).into())
    }

    async fn del(&self, key: &str) -> Result<()> {
        sqlx::query("DELETE FROM kv_entries WHERE collection = $1 AND entry_key = $2")
            .bind(&self.id)
            .bind(key)
            .execute(self.backend.pool())
            .await
            .sql_context(&format!("del on {}", self.id))?;
        Ok(())
    }

    async fn inc(&self, key: &str) -> Result<String> {
        let context = format!("inc on {}", self.id);
        let mut tx = self.backend.pool().begin().await.sql_context(&context)?;

        // Writing first takes the SQLite write lock before the read; on
        // Postgres the row lock below serializes concurrent increments.
        sqlx::query(
            "INSERT INTO kv_entries (collection, entry_key, entry_value) VALUES ($1, $2, '0')
             ON CONFLICT (collection, entry_key) DO NOTHING",
        )
        .bind(&self.id)
        .bind(key)
        .execute(&mut *tx)
        .await
        .sql_context(&context)?;

        let select = if self.backend.is_postgres() {
            "SELECT entry_value FROM kv_entries WHERE collection = $1 AND entry_key = $2 FOR UPDATE"
        } else {
            "SELECT entry_value FROM kv_entries WHERE collection = $1 AND entry_key = $2"
        };
        let row: Option<(String,)> = sqlx::query_as(select)
            .bind(&self.id)
            .bind(key)
            .fetch_optional(&mut *tx)
            .await
            .sql_context(&context)?;

        let current: i64 = row.and_then(|(v,)| v.parse().ok()).unwrap_or(0);
        let next = current
            .checked_add(1)
            .ok_or_else(|| BackendError::OperationFailed {
                operation: "inc".to_string(),
                collection: self.id.clone(),
                reason: format!("counter {key} overflowed"),
            })?
            .to_string();

        sqlx::query(KV_UPSERT)
            .bind(&self.id)
            .bind(key)
            .bind(&next)
            .execute(&mut *tx)
            .await
            .sql_context(&context)?;
        tx.commit().await.sql_context(&context)?;

        Ok(next)
    }

    async fn clear(&self) -> Result<()> {
        sqlx::query("DELETE FROM kv_entries WHERE collection = $1")
            .bind(&self.id)
            .execute(self.backend.pool())
            .await
            .sql_context(&format!("clear on {}", self.id))?;
        Ok(())
    }

    async fn remove(&self) -> Result<()> {
        self.clear().await
    }
}

pub(crate) struct SqlSet {
    backend: SqlxBackend,
    id: String,
}

impl SqlSet {
    pub(crate) fn new(backend: SqlxBackend, id: &str) -> Self {
        Self {
            backend,
            id: id.to_string(),
        }
    }
}

#[async_trait]
impl SetStore for SqlSet {
    async fn add(&self, member: &str) -> Result<()> {
        sqlx::query(
            "INSERT INTO set_members (collection, member) VALUES ($1, $2)
             ON CONFLICT (collection, member) DO NOTHING",
        )
        .bind(&self.id)
        .bind(member)
        .execute(self.backend.pool())
        .await
        .sql_context(&format!("add on {}", self.id))?;
        Ok(())
    }

    async fn has(&self, member: &str) -> Result<bool> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT member FROM set_members WHERE collection = $1 AND member = $2")
                .bind(&self.id)
                .bind(member)
                .fetch_optional(self.backend.pool())
                .await
                .sql_context(&format!("has on {}", self.id))?;
        Ok(row.is_some())
    }

    async fn del(&self, member: &str) -> Result<()> {
        sqlx::query("DELETE FROM set_members WHERE collection = $1 AND member = $2")
            .bind(&self.id)
            .bind(member)
            .execute(self.backend.pool())
            .await
            .sql_context(&format!("del on {}", self.id))?;
        Ok(())
    }

    async fn all(&self) -> Result<Vec<String>> {
        let rows: Vec<(String,)> =
            sqlx::query_as("SELECT member FROM set_members WHERE collection = $1 ORDER BY member")
                .bind(&self.id)
                .fetch_all(self.backend.pool())
                .await
                .sql_context(&format!("all on {}", self.id))?;
        Ok(rows.into_iter().map(|(m,)| m).collect())
    }

    async fn clear(&self) -> Result<()> {
        sqlx::query("DELETE FROM set_members WHERE collection = $1")
            .bind(&self.id)
            .execute(self.backend.pool())
            .await
            .sql_context(&format!("clear on {}", self.id))?;
        Ok(())
    }

    async fn remove(&self) -> Result<()> {
        self.clear().await
    }
}

pub(crate) struct SqlHashMap {
    backend: SqlxBackend,
    id: String,
}

impl SqlHashMap {
    pub(crate) fn new(backend: SqlxBackend, id: &str) -> Self {
        Self {
            backend,
            id: id.to_string(),
        }
    }
}

#[async_trait]
impl HashMapStore for SqlHashMap {
    async fn set(&self, owner: &str, field: &str, value: &str) -> Result<()> {
        sqlx::query(
            "INSERT INTO hash_fields (collection, owner, field, field_value) VALUES ($1, $2, $3, $4)
             ON CONFLICT (collection, owner, field) DO UPDATE SET field_value = excluded.field_value",
        )
        .bind(&self.id)
        .bind(owner)
        .bind(field)
        .bind(value)
        .execute(self.backend.pool())
        .await
        .sql_context(&format!("set on {}", self.id))?;
        Ok(())
    }

    async fn set_expire(
        &self,
        owner: &str,
        field: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<()> {
        tracing::debug!(
            collection = %self.id,
            field,
            ttl_secs = ttl.as_secs(),
            "SQL backend has no field expiry; storing without deadline"
        );
        self.set(owner, field, value).await
    }

    async fn get(&self, owner: &str, field: &str) -> Result<String> {
        let row: Option<(String,)> = sqlx::query_as(
            "SELECT field_value FROM hash_fields WHERE collection = $1 AND owner = $2 AND field = $3",
        )
        .bind(&self.id)
        .bind(owner)
        .bind(field)
        .fetch_optional(self.backend.pool())
        .await
        .sql_context(&format!("get on {}", self.id))?;
        row.map(|(v,)| v)
            .ok_or_else(|| BackendError::not_found(&self.id, format!("{owner}/{field}")).into())
    }

    async fn has(&self, owner: &str, field: &str) -> Result<bool> {
        let row: Option<(String,)> = sqlx::query_as(
            "SELECT field FROM hash_fields WHERE collection = $1 AND owner = $2 AND field = $3",
        )
        .bind(&self.id)
        .bind(owner)
        .bind(field)
        .fetch_optional(self.backend.pool())
        .await
        .sql_context(&format!("has on {}", self.id))?;
        Ok(row.is_some())
    }

    async fn exists(&self, owner: &str) -> Result<bool> {
        let row: Option<(String,)> = sqlx::query_as(
            "SELECT field FROM hash_fields WHERE collection = $1 AND owner = $2 LIMIT 1",
        )
        .bind(&self.id)
        .bind(owner)
        .fetch_optional(self.backend.pool())
        .await
        .sql_context(&format!("exists on {}", self.id))?;
        Ok(row.is_some())
    }

    async fn keys(&self, owner: &str) -> Result<Vec<String>> {
        let rows: Vec<(String,)> = sqlx::query_as(
            "SELECT field FROM hash_fields WHERE collection = $1 AND owner = $2 ORDER BY field",
        )
        .bind(&self.id)
        .bind(owner)
        .fetch_all(self.backend.pool())
        .await
        .sql_context(&format!("keys on {}", self.id))?;
        Ok(rows.into_iter().map(|(f,)| f).collect())
    }

    async fn del_key(&self, owner: &str, field: &str) -> Result<()> {
        sqlx::query("DELETE FROM hash_fields WHERE collection = $1 AND owner = $2 AND field = $3")
            .bind(&self.id)
            .bind(owner)
            .bind(field)
            .execute(self.backend.pool())
            .await
            .sql_context(&format!("del_key on {}", self.id))?;
        Ok(())
    }

    async fn del(&self, owner: &str) -> Result<()> {
        sqlx::query("DELETE FROM hash_fields WHERE collection = $1 AND owner = $2")
            .bind(&self.id)
            .bind(owner)
            .execute(self.backend.pool())
            .await
            .sql_context(&format!("del on {}", self.id))?;
        Ok(())
    }

    async fn all(&self) -> Result<Vec<String>> {
        let rows: Vec<(String,)> = sqlx::query_as(
            "SELECT DISTINCT owner FROM hash_fields WHERE collection = $1 ORDER BY owner",
        )
        .bind(&self.id)
        .fetch_all(self.backend.pool())
        .await
        .sql_context(&format!("all on {}", self.id))?;
        Ok(rows.into_iter().map(|(o,)| o).collect())
    }

    async fn clear(&self) -> Result<()> {
        sqlx::query("DELETE FROM hash_fields WHERE collection = $1")
            .bind(&self.id)
            .execute(self.backend.pool())
            .await
            .sql_context(&format!("clear on {}", self.id))?;
        Ok(())
    }

    async fn remove(&self) -> Result<()> {
        self.clear().await
    }

    fn supports_field_expiry(&self) -> bool {
        false
    }
}

pub(crate) struct SqlList {
    backend: SqlxBackend,
    id: String,
}

impl SqlList {
    pub(crate) fn new(backend: SqlxBackend, id: &str) -> Self {
        Self {
            backend,
            id: id.to_string(),
        }
    }
}

#[async_trait]
impl ListStore for SqlList {
    async fn add(&self, item: &str) -> Result<()> {
        let context = format!("add on {}", self.id);
        let mut tx = self.backend.pool().begin().await.sql_context(&context)?;

        // One appender per collection at a time; released on commit
        if self.backend.is_postgres() {
            sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
                .bind(&self.id)
                .execute(&mut *tx)
                .await
                .sql_context(&context)?;
        }

        sqlx::query(
            "INSERT INTO list_items (collection, position, item)
             SELECT $1, COALESCE(MAX(position), 0) + 1, $2 FROM list_items WHERE collection = $1",
        )
        .bind(&self.id)
        .bind(item)
        .execute(&mut *tx)
        .await
        .sql_context(&context)?;
        tx.commit().await.sql_context(&context)?;
        Ok(())
    }

    async fn all(&self) -> Result<Vec<String>> {
        let rows: Vec<(String,)> = sqlx::query_as(
            "SELECT item FROM list_items WHERE collection = $1 ORDER BY position",
        )
        .bind(&self.id)
        .fetch_all(self.backend.pool())
        .await
        .sql_context(&format!("all on {}", self.id))?;
        Ok(rows.into_iter().map(|(i,)| i).collect())
    }

    async fn last(&self) -> Result<String> {
        let row: Option<(String,)> = sqlx::query_as(
            "SELECT item FROM list_items WHERE collection = $1 ORDER BY position DESC LIMIT 1",
        )
        .bind(&self.id)
        .fetch_optional(self.backend.pool())
        .await
        .sql_context(&format!("last on {}", self.id))?;
        row.map(|(i,)| i)
            .ok_or_else(|| BackendError::not_found(&self.id, "last item").into())
    }

    async fn last_n(&self, n: usize) -> Result<Vec<String>> {
        let limit = i64::try_from(n).unwrap_or(i64::MAX);
        let rows: Vec<(String,)> = sqlx::query_as(
            "SELECT item FROM list_items WHERE collection = $1 ORDER BY position DESC LIMIT $2",
        )
        .bind(&self.id)
        .bind(limit)
        .fetch_all(self.backend.pool())
        .await
        .sql_context(&format!("last_n on {}", self.id))?;
        Ok(rows.into_iter().rev().map(|(i,)| i).collect())
    }

    async fn clear(&self) -> Result<()> {
        sqlx::query("DELETE FROM list_items WHERE collection = $1")
            .bind(&self.id)
            .execute(self.backend.pool())
            .await
            .sql_context(&format!("clear on {}", self.id))?;
        Ok(())
    }

    async fn remove(&self) -> Result<()> {
        self.clear().await
    }
}
