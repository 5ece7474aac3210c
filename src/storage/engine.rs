//! Namespaced Preference Storage Engine
//!
//! This module implements the store that backs the preference shell. It
//! behaves like a small non-volatile-storage partition: values live in
//! namespaces, every value has a storage category, and names are limited to
//! 15 bytes.
//!
//! ## Design Decisions
//!
//! 1. **One RwLock over the namespace table**: the shell issues one command at
//!    a time per session, so contention is low and a single lock keeps
//!    namespace clears atomic.
//! 2. **Lazy namespace creation**: opening a namespace for writing does not
//!    create it; the first successful `put` does.
//! 3. **Write-through snapshots**: with a snapshot path configured, every
//!    mutation rewrites the snapshot file before it is reported as done. A
//!    failed write is rolled back in memory and reported as zero bytes written.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     StorageEngine                           │
//! │  RwLock<HashMap<namespace, HashMap<key, StoredValue>>>      │
//! │                                                             │
//! │   "wifi"  ─┬─ "ssid"    Str("home")                         │
//! │            └─ "retries" I32(3)                              │
//! │   "boot"  ─── "mode"    U8(1)                               │
//! └──────────────────────────────┬──────────────────────────────┘
//!                                │ commit()
//!                                ▼
//!                         snapshot file (optional)
//! ```

use crate::storage::flash::{FlashArea, FlashError};
use crate::storage::preferences::PreferenceStore;
use crate::storage::snapshot::{self, Namespaces, SnapshotError};
use crate::storage::value::{PreferenceType, StoredValue};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;
use tracing::{debug, info, trace, warn};

/// Longest namespace or key name, in bytes.
pub const MAX_NAME_LENGTH: usize = 15;

/// Largest string value, in bytes.
pub const MAX_STRING_LENGTH: usize = 4000;

/// Largest blob value, in bytes.
pub const MAX_BLOB_LENGTH: usize = 508_000;

/// The preference storage engine.
///
/// Designed to be wrapped in an `Arc` and shared by every shell session.
///
/// # Example
///
/// ```
/// use prefcli::storage::{PreferenceStore, PreferenceType, StorageEngine, StoredValue};
///
/// let engine = StorageEngine::new();
///
/// assert_eq!(engine.put("wifi", "retries", StoredValue::I32(3)), 4);
/// assert_eq!(engine.get_type("wifi", "retries"), PreferenceType::I32);
/// assert_eq!(engine.get("wifi", "retries"), Some(StoredValue::I32(3)));
/// ```
pub struct StorageEngine {
    /// Namespace table
    namespaces: RwLock<Namespaces>,

    /// Where the snapshot is written, if persistence is enabled
    snapshot_path: Option<PathBuf>,

    /// Namespaces currently open through `begin`
    open_handles: AtomicU64,

    /// Statistics: total reads
    get_count: AtomicU64,

    /// Statistics: total successful writes
    set_count: AtomicU64,

    /// Statistics: total key removals and namespace clears
    del_count: AtomicU64,
}

/// Statistics about the storage engine.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StorageStats {
    pub namespaces: u64,
    pub keys: u64,
    pub open_handles: u64,
    pub get_ops: u64,
    pub set_ops: u64,
    pub del_ops: u64,
}

impl std::fmt::Debug for StorageEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageEngine")
            .field("snapshot_path", &self.snapshot_path)
            .field("open_handles", &self.open_handles.load(Ordering::Relaxed))
            .field("get_count", &self.get_count.load(Ordering::Relaxed))
            .field("set_count", &self.set_count.load(Ordering::Relaxed))
            .finish()
    }
}

impl Default for StorageEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl StorageEngine {
    /// Creates an empty, memory-only engine.
    pub fn new() -> Self {
        Self::from_parts(Namespaces::new(), None)
    }

    /// Creates an engine persisted to `path`.
    ///
    /// An existing snapshot is loaded; a missing file starts an empty store.
    pub fn with_snapshot(path: impl Into<PathBuf>) -> Result<Self, SnapshotError> {
        let path = path.into();
        let namespaces = snapshot::load(&path)?.unwrap_or_default();
        info!(
            path = %path.display(),
            namespaces = namespaces.len(),
            "Preference snapshot loaded"
        );
        Ok(Self::from_parts(namespaces, Some(path)))
    }

    fn from_parts(namespaces: Namespaces, snapshot_path: Option<PathBuf>) -> Self {
        Self {
            namespaces: RwLock::new(namespaces),
            snapshot_path,
            open_handles: AtomicU64::new(0),
            get_count: AtomicU64::new(0),
            set_count: AtomicU64::new(0),
            del_count: AtomicU64::new(0),
        }
    }

    /// The snapshot file backing this engine, if any.
    pub fn snapshot_path(&self) -> Option<&Path> {
        self.snapshot_path.as_deref()
    }

    /// Returns the number of keys stored in a namespace.
    pub fn namespace_len(&self, namespace: &str) -> usize {
        let namespaces = self.namespaces.read().unwrap();
        namespaces.get(namespace).map(HashMap::len).unwrap_or(0)
    }

    /// Returns the total number of keys across all namespaces.
    pub fn len(&self) -> usize {
        let namespaces = self.namespaces.read().unwrap();
        namespaces.values().map(HashMap::len).sum()
    }

    /// Returns true if no namespace holds any key.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns engine statistics.
    pub fn stats(&self) -> StorageStats {
        let namespaces = self.namespaces.read().unwrap();
        StorageStats {
            namespaces: namespaces.len() as u64,
            keys: namespaces.values().map(|ns| ns.len() as u64).sum(),
            open_handles: self.open_handles.load(Ordering::Relaxed),
            get_ops: self.get_count.load(Ordering::Relaxed),
            set_ops: self.set_count.load(Ordering::Relaxed),
            del_ops: self.del_count.load(Ordering::Relaxed),
        }
    }

    /// Writes the current table to the snapshot file, if one is configured.
    fn commit(&self, namespaces: &Namespaces) -> Result<(), SnapshotError> {
        match &self.snapshot_path {
            Some(path) => snapshot::store(path, namespaces),
            None => Ok(()),
        }
    }

    /// Applies `mutate` to the table and commits it, undoing the change if
    /// the commit fails.
    fn mutate<T>(&self, mutate: impl FnOnce(&mut Namespaces) -> T) -> Result<T, SnapshotError> {
        let mut namespaces = self.namespaces.write().unwrap();
        let before = self.snapshot_path.as_ref().map(|_| namespaces.clone());

        let result = mutate(&mut namespaces);

        if let Err(e) = self.commit(&namespaces) {
            if let Some(before) = before {
                *namespaces = before;
            }
            return Err(e);
        }

        Ok(result)
    }
}

fn valid_name(name: &str) -> bool {
    !name.is_empty() && name.len() <= MAX_NAME_LENGTH
}

fn fits(value: &StoredValue) -> bool {
    match value {
        StoredValue::Str(s) => !s.is_empty() && s.len() <= MAX_STRING_LENGTH,
        StoredValue::Blob(b) => !b.is_empty() && b.len() <= MAX_BLOB_LENGTH,
        _ => true,
    }
}

impl PreferenceStore for StorageEngine {
    fn begin(&self, namespace: &str, read_only: bool) -> bool {
        if !valid_name(namespace) {
            debug!(namespace = %namespace, "Rejected namespace name");
            return false;
        }

        if read_only && !self.namespaces.read().unwrap().contains_key(namespace) {
            trace!(namespace = %namespace, "Read-only open of missing namespace");
            return false;
        }

        self.open_handles.fetch_add(1, Ordering::Relaxed);
        trace!(namespace = %namespace, read_only, "Namespace opened");
        true
    }

    fn end(&self, namespace: &str) {
        self.open_handles.fetch_sub(1, Ordering::Relaxed);
        trace!(namespace = %namespace, "Namespace closed");
    }

    fn is_key(&self, namespace: &str, key: &str) -> bool {
        let namespaces = self.namespaces.read().unwrap();
        namespaces
            .get(namespace)
            .map(|entries| entries.contains_key(key))
            .unwrap_or(false)
    }

    fn get_type(&self, namespace: &str, key: &str) -> PreferenceType {
        let namespaces = self.namespaces.read().unwrap();
        namespaces
            .get(namespace)
            .and_then(|entries| entries.get(key))
            .map(StoredValue::preference_type)
            .unwrap_or(PreferenceType::Invalid)
    }

    fn get_bytes_length(&self, namespace: &str, key: &str) -> usize {
        let namespaces = self.namespaces.read().unwrap();
        match namespaces.get(namespace).and_then(|entries| entries.get(key)) {
            Some(StoredValue::Blob(b)) => b.len(),
            _ => 0,
        }
    }

    fn get(&self, namespace: &str, key: &str) -> Option<StoredValue> {
        self.get_count.fetch_add(1, Ordering::Relaxed);

        let namespaces = self.namespaces.read().unwrap();
        namespaces
            .get(namespace)
            .and_then(|entries| entries.get(key))
            .cloned()
    }

    fn put(&self, namespace: &str, key: &str, value: StoredValue) -> usize {
        if !valid_name(namespace) || !valid_name(key) {
            debug!(namespace = %namespace, key = %key, "Rejected write with invalid name");
            return 0;
        }
        if !fits(&value) {
            debug!(
                namespace = %namespace,
                key = %key,
                len = value.len(),
                "Rejected write of empty or oversized value"
            );
            return 0;
        }

        let written = value.len();
        let ty = value.preference_type();
        let result = self.mutate(|namespaces| {
            namespaces
                .entry(namespace.to_string())
                .or_default()
                .insert(key.to_string(), value);
        });

        match result {
            Ok(()) => {
                self.set_count.fetch_add(1, Ordering::Relaxed);
                debug!(namespace = %namespace, key = %key, %ty, written, "Preference stored");
                written
            }
            Err(e) => {
                warn!(namespace = %namespace, key = %key, error = %e, "Failed to persist preference");
                0
            }
        }
    }

    fn remove(&self, namespace: &str, key: &str) -> bool {
        self.del_count.fetch_add(1, Ordering::Relaxed);

        let result = self.mutate(|namespaces| {
            namespaces
                .get_mut(namespace)
                .and_then(|entries| entries.remove(key))
                .is_some()
        });

        match result {
            Ok(removed) => {
                debug!(namespace = %namespace, key = %key, removed, "Preference removed");
                removed
            }
            Err(e) => {
                warn!(namespace = %namespace, key = %key, error = %e, "Failed to persist removal");
                false
            }
        }
    }

    fn clear(&self, namespace: &str) -> bool {
        self.del_count.fetch_add(1, Ordering::Relaxed);

        let result = self.mutate(|namespaces| {
            namespaces.remove(namespace).map(|entries| entries.len()).unwrap_or(0)
        });

        match result {
            Ok(cleared) => {
                debug!(namespace = %namespace, cleared, "Namespace cleared");
                true
            }
            Err(e) => {
                warn!(namespace = %namespace, error = %e, "Failed to persist namespace clear");
                false
            }
        }
    }
}

impl FlashArea for StorageEngine {
    /// Drops every namespace, leaving an empty snapshot behind.
    ///
    /// The snapshot is reset before memory is touched, so a failed erase
    /// leaves both intact.
    fn erase_and_init(&self) -> Result<(), FlashError> {
        let mut namespaces = self.namespaces.write().unwrap();

        self.commit(&Namespaces::new())?;

        let erased: usize = namespaces.values().map(HashMap::len).sum();
        namespaces.clear();

        info!(erased, "Preference storage erased and reinitialised");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!(
            "prefcli-engine-{}-{}.bin",
            std::process::id(),
            name
        ))
    }

    #[test]
    fn test_put_and_get() {
        let engine = StorageEngine::new();

        assert_eq!(engine.put("app", "count", StoredValue::I32(42)), 4);
        assert_eq!(engine.get("app", "count"), Some(StoredValue::I32(42)));
        assert!(engine.is_key("app", "count"));
        assert_eq!(engine.get_type("app", "count"), PreferenceType::I32);
    }

    #[test]
    fn test_get_nonexistent() {
        let engine = StorageEngine::new();

        assert_eq!(engine.get("app", "missing"), None);
        assert!(!engine.is_key("app", "missing"));
        assert_eq!(engine.get_type("app", "missing"), PreferenceType::Invalid);
        assert_eq!(engine.get_bytes_length("app", "missing"), 0);
    }

    #[test]
    fn test_put_replaces_category() {
        let engine = StorageEngine::new();

        engine.put("app", "k", StoredValue::I32(1));
        assert_eq!(engine.put("app", "k", StoredValue::Str("one".into())), 3);
        assert_eq!(engine.get_type("app", "k"), PreferenceType::Str);
        assert_eq!(engine.namespace_len("app"), 1);
    }

    #[test]
    fn test_name_limits() {
        let engine = StorageEngine::new();

        assert!(!engine.begin("", false));
        assert!(!engine.begin("sixteen_chars_xx", false));
        assert!(engine.begin("fifteen_chars_x", false));
        engine.end("fifteen_chars_x");

        assert_eq!(engine.put("app", "sixteen_chars_xx", StoredValue::U8(1)), 0);
        assert_eq!(engine.put("app", "", StoredValue::U8(1)), 0);
        assert!(engine.is_empty());
    }

    #[test]
    fn test_empty_and_oversized_values_are_refused() {
        let engine = StorageEngine::new();

        assert_eq!(engine.put("app", "s", StoredValue::Str(String::new())), 0);
        assert_eq!(engine.put("app", "b", StoredValue::Blob(Bytes::new())), 0);

        let big = "x".repeat(MAX_STRING_LENGTH + 1);
        assert_eq!(engine.put("app", "s", StoredValue::Str(big)), 0);

        let max = "x".repeat(MAX_STRING_LENGTH);
        assert_eq!(engine.put("app", "s", StoredValue::Str(max)), MAX_STRING_LENGTH);
    }

    #[test]
    fn test_namespaces_are_created_on_first_write() {
        let engine = StorageEngine::new();

        assert!(engine.begin("app", false));
        engine.end("app");
        assert!(!engine.begin("app", true));

        engine.put("app", "k", StoredValue::U8(1));
        assert!(engine.begin("app", true));
        engine.end("app");
        assert_eq!(engine.stats().open_handles, 0);
    }

    #[test]
    fn test_remove() {
        let engine = StorageEngine::new();

        engine.put("app", "a", StoredValue::U8(1));
        engine.put("app", "b", StoredValue::U8(2));

        assert!(engine.remove("app", "a"));
        assert!(!engine.remove("app", "a"));
        assert!(!engine.is_key("app", "a"));
        assert!(engine.is_key("app", "b"));
    }

    #[test]
    fn test_clear_namespace_only() {
        let engine = StorageEngine::new();

        engine.put("one", "a", StoredValue::U8(1));
        engine.put("one", "b", StoredValue::U8(2));
        engine.put("two", "a", StoredValue::U8(3));

        assert!(engine.clear("one"));
        assert_eq!(engine.namespace_len("one"), 0);
        assert_eq!(engine.namespace_len("two"), 1);

        // Clearing a namespace that does not exist is not an error
        assert!(engine.clear("three"));
    }

    #[test]
    fn test_stats() {
        let engine = StorageEngine::new();

        engine.put("one", "a", StoredValue::U8(1));
        engine.put("two", "a", StoredValue::U8(1));
        engine.get("one", "a");
        engine.remove("two", "a");

        let stats = engine.stats();
        assert_eq!(stats.namespaces, 2);
        assert_eq!(stats.keys, 1);
        assert_eq!(stats.get_ops, 1);
        assert_eq!(stats.set_ops, 2);
        assert_eq!(stats.del_ops, 1);
    }

    #[test]
    fn test_snapshot_survives_reload() {
        let path = temp_path("reload");
        let _ = std::fs::remove_file(&path);

        {
            let engine = StorageEngine::with_snapshot(&path).unwrap();
            engine.put("wifi", "ssid", StoredValue::Str("home".into()));
            engine.put("wifi", "retries", StoredValue::I32(3));
            engine.put("boot", "blob", StoredValue::Blob(Bytes::from_static(&[0xa1, 0xff])));
            engine.remove("wifi", "retries");
        }

        let engine = StorageEngine::with_snapshot(&path).unwrap();
        assert_eq!(engine.get("wifi", "ssid"), Some(StoredValue::Str("home".into())));
        assert!(!engine.is_key("wifi", "retries"));
        assert_eq!(engine.get_bytes_length("boot", "blob"), 2);

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_failed_commit_rolls_back() {
        // A directory cannot be replaced by the snapshot file
        let path = std::env::temp_dir().join(format!("prefcli-engine-{}-dir", std::process::id()));
        std::fs::create_dir_all(&path).unwrap();

        let engine = StorageEngine::from_parts(Namespaces::new(), Some(path.clone()));
        assert_eq!(engine.put("app", "k", StoredValue::U8(1)), 0);
        assert!(!engine.is_key("app", "k"));
        assert_eq!(engine.stats().set_ops, 0);

        let _ = std::fs::remove_dir_all(&path);
    }

    #[test]
    fn test_erase_and_init() {
        let path = temp_path("erase");
        let _ = std::fs::remove_file(&path);

        let engine = StorageEngine::with_snapshot(&path).unwrap();
        engine.put("one", "a", StoredValue::U8(1));
        engine.put("two", "b", StoredValue::U16(2));

        engine.erase_and_init().unwrap();
        assert!(engine.is_empty());
        assert_eq!(engine.stats().namespaces, 0);

        let reloaded = StorageEngine::with_snapshot(&path).unwrap();
        assert!(reloaded.is_empty());

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_failed_erase_keeps_preferences() {
        let path = std::env::temp_dir().join(format!("prefcli-engine-{}-erase-dir", std::process::id()));
        std::fs::create_dir_all(&path).unwrap();

        let mut app = HashMap::new();
        app.insert("k".to_string(), StoredValue::U8(1));
        let mut namespaces = Namespaces::new();
        namespaces.insert("app".to_string(), app);

        let engine = StorageEngine::from_parts(namespaces, Some(path.clone()));
        assert!(engine.erase_and_init().is_err());
        assert_eq!(engine.get("app", "k"), Some(StoredValue::U8(1)));

        let _ = std::fs::remove_dir_all(&path);
    }
}
