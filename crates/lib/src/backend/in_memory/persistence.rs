//! Persistence operations for the in-memory backend
//!
//! Saves and loads every collection as a single JSON document.

use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize};

use super::{Collections, InMemory};
use crate::backend::errors::BackendError;
use crate::clock::Clock;
use crate::{Error, Result};

/// The current persistence file format version.
/// v0 indicates this is an unstable format subject to breaking changes.
const PERSISTENCE_VERSION: u8 = 0;

/// Helper to check if version is default (0) for serde skip_serializing_if
fn is_v0(v: &u8) -> bool {
    *v == 0
}

/// Validates the persistence version during deserialization.
fn validate_persistence_version<'de, D>(deserializer: D) -> std::result::Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    let version = u8::deserialize(deserializer)?;
    if version != PERSISTENCE_VERSION {
        return Err(serde::de::Error::custom(format!(
            "unsupported persistence version {version}; only version {PERSISTENCE_VERSION} is supported"
        )));
    }
    Ok(version)
}

#[derive(Serialize, Deserialize)]
struct SerializableBackend {
    /// File format version for compatibility checking
    #[serde(
        rename = "_v",
        default,
        skip_serializing_if = "is_v0",
        deserialize_with = "validate_persistence_version"
    )]
    version: u8,
    #[serde(flatten)]
    collections: Collections,
}

pub(crate) async fn save_to_file<P: AsRef<Path>>(backend: &InMemory, path: P) -> Result<()> {
    let now = backend.now();
    let mut collections = backend.data()?.read().await.clone();
    collections.purge_expired(now);

    let serializable = SerializableBackend {
        version: PERSISTENCE_VERSION,
        collections,
    };

    let json = serde_json::to_string_pretty(&serializable)
        .map_err(|e| -> Error { BackendError::SerializationFailed { source: e }.into() })?;
    tokio::fs::write(path.as_ref(), json)
        .await
        .map_err(|e| -> Error { BackendError::FileIo { source: e }.into() })?;
    tracing::debug!(path = %path.as_ref().display(), "saved in-memory backend");
    Ok(())
}

pub(crate) async fn load_from_file<P: AsRef<Path>>(
    path: P,
    clock: Arc<dyn Clock>,
) -> Result<InMemory> {
    match tokio::fs::read_to_string(path.as_ref()).await {
        Ok(json) => {
            let serializable: SerializableBackend =
                serde_json::from_str(&json).map_err(|e| -> Error {
                    BackendError::DeserializationFailed { source: e }.into()
                })?;
            tracing::debug!(path = %path.as_ref().display(), "loaded in-memory backend");
            Ok(InMemory::from_collections(serializable.collections, clock))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(InMemory::with_clock(clock)),
        Err(e) => Err(BackendError::FileIo { source: e }.into()),
    }
}
