//! JSON-backed cache of discovered instances.
//!
//! The store mirrors filesystem state into a small JSON file in the config
//! directory (`~/.config/tdconsole/instances.json` on most platforms) so
//! panels and the completion resolver can list instances without
//! re-scanning disk. It is safe to share across threads via the internal
//! `Mutex`.
//!
//! Invariant: at most one record is marked `working` — the instance the
//! console is bound to. Setting a new working instance clears the previous
//! marker in the same write, and a filesystem sync preserves the marker
//! across upserts.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::serde::ts_seconds_option;
use chrono::{DateTime, Utc};
use dirs_next::config_dir;
use serde::{Deserialize, Serialize};
use tdconsole_types::InstanceRecord;
use thiserror::Error;
use tracing::warn;

use super::discover;

/// Environment variable allowing callers to override the store file path.
pub const INSTANCE_STORE_PATH_ENV: &str = "TDCONSOLE_INSTANCE_STORE_PATH";

/// Default filename for the JSON payload.
pub const INSTANCE_STORE_FILE_NAME: &str = "instances.json";

/// Error surfaced when reading or writing the instance store fails.
#[derive(Debug, Error)]
pub enum InstanceStoreError {
    /// I/O failure (for example, permissions or missing directory).
    #[error("instance store I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// Serialization or deserialization failure.
    #[error("instance store serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
struct StorePayload {
    #[serde(default)]
    instances: Vec<InstanceRecord>,
    #[serde(default, with = "ts_seconds_option")]
    synced_at: Option<DateTime<Utc>>,
}

/// Thread-safe instance cache backed by a JSON file.
#[derive(Debug, Default)]
pub struct InstanceStore {
    path: PathBuf,
    payload: Mutex<StorePayload>,
    persist_to_disk: bool,
}

impl InstanceStore {
    /// Open the store at its default path, loading any existing payload.
    pub fn new() -> Result<Self, InstanceStoreError> {
        let path = default_store_path();
        let payload = load_payload(&path)?;
        Ok(Self {
            path,
            payload: Mutex::new(payload),
            persist_to_disk: true,
        })
    }

    /// In-memory store used as a fallback when the config directory cannot
    /// be accessed, and by tests.
    pub fn ephemeral() -> Self {
        Self {
            path: PathBuf::new(),
            payload: Mutex::new(StorePayload::default()),
            persist_to_disk: false,
        }
    }

    /// Path to the underlying JSON file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All cached records, ordered by name.
    pub fn list(&self) -> Vec<InstanceRecord> {
        self.payload.lock().expect("instance store lock poisoned").instances.clone()
    }

    /// Cached instance names, ordered.
    pub fn names(&self) -> Vec<String> {
        self.payload
            .lock()
            .expect("instance store lock poisoned")
            .instances
            .iter()
            .map(|record| record.name.clone())
            .collect()
    }

    /// Record for `name`, if cached.
    pub fn get(&self, name: &str) -> Option<InstanceRecord> {
        self.payload
            .lock()
            .expect("instance store lock poisoned")
            .instances
            .iter()
            .find(|record| record.name == name)
            .cloned()
    }

    /// The instance the console is currently bound to, if any.
    pub fn working(&self) -> Option<InstanceRecord> {
        self.payload
            .lock()
            .expect("instance store lock poisoned")
            .instances
            .iter()
            .find(|record| record.working)
            .cloned()
    }

    /// Bind the console to `name`. Clears the marker on every other record
    /// in the same write. Returns false when `name` is not cached.
    pub fn set_working(&self, name: &str) -> Result<bool, InstanceStoreError> {
        let mut payload = self.payload.lock().expect("instance store lock poisoned");
        if !payload.instances.iter().any(|record| record.name == name) {
            return Ok(false);
        }
        for record in &mut payload.instances {
            record.working = record.name == name;
        }
        self.save_locked(&payload)?;
        Ok(true)
    }

    /// Upsert freshly discovered records: new names are added, existing
    /// ones replaced (keeping their working marker), vanished ones
    /// dropped. Records end up ordered by name.
    pub fn sync_records(&self, discovered: Vec<InstanceRecord>) -> Result<Vec<InstanceRecord>, InstanceStoreError> {
        let mut payload = self.payload.lock().expect("instance store lock poisoned");
        let working_name = payload
            .instances
            .iter()
            .find(|record| record.working)
            .map(|record| record.name.clone());

        let mut next: Vec<InstanceRecord> = discovered;
        for record in &mut next {
            record.working = working_name.as_deref() == Some(record.name.as_str());
        }
        next.sort_by(|a, b| a.name.cmp(&b.name));

        payload.instances = next.clone();
        payload.synced_at = Some(Utc::now());
        self.save_locked(&payload)?;
        Ok(next)
    }

    /// Scan the filesystem and sync the result into the store.
    pub fn sync_from_filesystem(&self) -> Result<Vec<InstanceRecord>, InstanceStoreError> {
        self.sync_records(discover::discover_all())
    }

    /// Refresh a single instance from disk, preserving its working marker.
    pub fn refresh_one(&self, name: &str) -> Result<InstanceRecord, InstanceStoreError> {
        let mut record = discover::inspect_instance(name);
        let mut payload = self.payload.lock().expect("instance store lock poisoned");
        if let Some(existing) = payload.instances.iter_mut().find(|existing| existing.name == name) {
            record.working = existing.working;
            *existing = record.clone();
        } else {
            payload.instances.push(record.clone());
            payload.instances.sort_by(|a, b| a.name.cmp(&b.name));
        }
        self.save_locked(&payload)?;
        Ok(record)
    }

    fn save_locked(&self, payload: &StorePayload) -> Result<(), InstanceStoreError> {
        if !self.persist_to_disk {
            return Ok(());
        }
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_string_pretty(payload)?;
        fs::write(&self.path, data)?;
        Ok(())
    }
}

fn default_store_path() -> PathBuf {
    if let Ok(path) = env::var(INSTANCE_STORE_PATH_ENV) {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return tdconsole_util::expand_tilde(trimmed);
        }
    }

    config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("tdconsole")
        .join(INSTANCE_STORE_FILE_NAME)
}

fn load_payload(path: &Path) -> Result<StorePayload, InstanceStoreError> {
    match fs::read_to_string(path) {
        Ok(data) => match serde_json::from_str(&data) {
            Ok(payload) => Ok(payload),
            Err(error) => {
                warn!(
                    path = %path.display(),
                    error = %error,
                    "Failed to parse instance store; starting empty"
                );
                Ok(StorePayload::default())
            }
        },
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(StorePayload::default()),
        Err(error) => Err(InstanceStoreError::Io(error)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str) -> InstanceRecord {
        InstanceRecord::not_created(name)
    }

    #[test]
    fn sync_orders_and_replaces() {
        let store = InstanceStore::ephemeral();
        store.sync_records(vec![record("beta"), record("alpha")]).unwrap();
        assert_eq!(store.names(), vec!["alpha", "beta"]);

        store.sync_records(vec![record("beta")]).unwrap();
        assert_eq!(store.names(), vec!["beta"], "vanished instances are dropped");
    }

    #[test]
    fn at_most_one_working_instance() {
        let store = InstanceStore::ephemeral();
        store.sync_records(vec![record("a"), record("b")]).unwrap();

        assert!(store.set_working("a").unwrap());
        assert!(store.set_working("b").unwrap());

        let working: Vec<String> = store.list().into_iter().filter(|r| r.working).map(|r| r.name).collect();
        assert_eq!(working, vec!["b"]);
    }

    #[test]
    fn set_working_rejects_unknown_names() {
        let store = InstanceStore::ephemeral();
        store.sync_records(vec![record("a")]).unwrap();
        assert!(!store.set_working("ghost").unwrap());
        assert!(store.working().is_none());
    }

    #[test]
    fn sync_preserves_the_working_marker() {
        let store = InstanceStore::ephemeral();
        store.sync_records(vec![record("a"), record("b")]).unwrap();
        store.set_working("a").unwrap();

        store.sync_records(vec![record("a"), record("b"), record("c")]).unwrap();
        assert_eq!(store.working().map(|r| r.name).as_deref(), Some("a"));

        // The marker dies with its instance.
        store.sync_records(vec![record("b")]).unwrap();
        assert!(store.working().is_none());
    }

    #[test]
    fn persisted_payload_roundtrips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(INSTANCE_STORE_FILE_NAME);
        let store = InstanceStore {
            path: path.clone(),
            payload: Mutex::new(StorePayload::default()),
            persist_to_disk: true,
        };
        store.sync_records(vec![record("a")]).unwrap();
        store.set_working("a").unwrap();

        let reloaded = load_payload(&path).unwrap();
        assert_eq!(reloaded.instances.len(), 1);
        assert!(reloaded.instances[0].working);
        assert!(reloaded.synced_at.is_some());
    }

    #[test]
    fn corrupt_store_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(INSTANCE_STORE_FILE_NAME);
        fs::write(&path, "not json").unwrap();
        let payload = load_payload(&path).unwrap();
        assert!(payload.instances.is_empty());
    }
}
