//! Storage Module
//!
//! This module provides everything the preference commands store data in:
//! the typed value model, the store contract and its scoped namespace handle,
//! the in-process engine with optional snapshot persistence, and the
//! storage-area erase capability.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │   Preferences<'_, S>   (open namespace, closes on drop)     │
//! └──────────────────────────────┬──────────────────────────────┘
//!                                │ PreferenceStore
//!                                ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     StorageEngine                           │
//! │   namespaces ── keys ── StoredValue (category + payload)    │
//! └──────────────┬───────────────────────────────┬──────────────┘
//!                │ snapshot::store               │ FlashArea
//!                ▼                               ▼
//!          snapshot file                 erase_and_init()
//! ```
//!
//! ## Example
//!
//! ```
//! use prefcli::storage::{Preferences, StorageEngine};
//!
//! let engine = StorageEngine::new();
//!
//! let prefs = Preferences::begin(&engine, "wifi", false).unwrap();
//! assert_eq!(prefs.put_string("ssid", "home"), 4);
//! assert_eq!(prefs.get_string("ssid").as_deref(), Some("home"));
//! drop(prefs);
//!
//! assert_eq!(engine.stats().open_handles, 0);
//! ```

pub mod engine;
pub mod flash;
pub mod preferences;
pub mod snapshot;
pub mod value;

// Re-export commonly used types
pub use engine::{StorageEngine, StorageStats, MAX_NAME_LENGTH};
pub use flash::{FlashArea, FlashError, Unsupported};
pub use preferences::{PreferenceStore, Preferences};
pub use snapshot::SnapshotError;
pub use value::{PreferenceType, StoredValue};
