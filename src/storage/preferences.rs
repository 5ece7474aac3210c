//! Preference Store Contract and Namespace Handle
//!
//! [`PreferenceStore`] is the fixed API the command layer talks to. It is
//! shaped like a platform non-volatile-storage service: a
//! namespace is opened, typed values are read and written by key, and the
//! namespace is closed again.
//!
//! [`Preferences`] is the scoped handle over one open namespace. Creating it
//! opens the namespace and dropping it closes it, so every early return in a
//! command handler still closes what it opened.
//!
//! ```text
//!   Preferences::begin(store, "wifi", false)
//!        │  store.begin("wifi")
//!        ▼
//!   put_string("ssid", ..) / get_int("retries") / remove(..) ...
//!        │
//!        ▼
//!   drop(prefs)
//!           store.end("wifi")
//! ```

use crate::storage::value::{PreferenceType, StoredValue};
use bytes::Bytes;

/// A namespaced, typed key/value store.
///
/// All methods take the namespace explicitly; `begin` and `end` bracket a
/// caller's use of one namespace. `put` returns the number of bytes written,
/// with `0` meaning the write failed.
pub trait PreferenceStore: Send + Sync {
    /// Opens a namespace. Read-only opens fail for namespaces that do not exist.
    fn begin(&self, namespace: &str, read_only: bool) -> bool;

    /// Closes a namespace opened by a successful `begin`.
    fn end(&self, namespace: &str);

    /// Checks whether a key exists in the namespace.
    fn is_key(&self, namespace: &str, key: &str) -> bool;

    /// Returns the stored category of a key, or `Invalid` if it is absent.
    fn get_type(&self, namespace: &str, key: &str) -> PreferenceType;

    /// Returns the length of a blob entry, or `0` for anything else.
    fn get_bytes_length(&self, namespace: &str, key: &str) -> usize;

    /// Reads the value stored under a key.
    fn get(&self, namespace: &str, key: &str) -> Option<StoredValue>;

    /// Writes a value, replacing whatever the key held before.
    fn put(&self, namespace: &str, key: &str, value: StoredValue) -> usize;

    /// Removes a single key.
    fn remove(&self, namespace: &str, key: &str) -> bool;

    /// Removes every key in the namespace.
    fn clear(&self, namespace: &str) -> bool;
}

/// An open namespace of a [`PreferenceStore`].
///
/// The typed getters return `None` when the key is missing or holds a
/// different category; the putters return the store's byte count.
pub struct Preferences<'a, S: PreferenceStore + ?Sized> {
    store: &'a S,
    namespace: &'a str,
}

impl<'a, S: PreferenceStore + ?Sized> Preferences<'a, S> {
    /// Opens `namespace`, returning `None` if the store refuses it.
    pub fn begin(store: &'a S, namespace: &'a str, read_only: bool) -> Option<Self> {
        if store.begin(namespace, read_only) {
            Some(Self { store, namespace })
        } else {
            None
        }
    }

    /// The namespace this handle has open.
    pub fn namespace(&self) -> &str {
        self.namespace
    }

    pub fn is_key(&self, key: &str) -> bool {
        self.store.is_key(self.namespace, key)
    }

    pub fn get_type(&self, key: &str) -> PreferenceType {
        self.store.get_type(self.namespace, key)
    }

    pub fn get_bytes_length(&self, key: &str) -> usize {
        self.store.get_bytes_length(self.namespace, key)
    }

    pub fn get_char(&self, key: &str) -> Option<i8> {
        match self.store.get(self.namespace, key)? {
            StoredValue::I8(v) => Some(v),
            _ => None,
        }
    }

    pub fn get_uchar(&self, key: &str) -> Option<u8> {
        match self.store.get(self.namespace, key)? {
            StoredValue::U8(v) => Some(v),
            _ => None,
        }
    }

    /// Booleans share the unsigned 8-bit category; any non-zero byte is true.
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get_uchar(key).map(|v| v != 0)
    }

    pub fn get_short(&self, key: &str) -> Option<i16> {
        match self.store.get(self.namespace, key)? {
            StoredValue::I16(v) => Some(v),
            _ => None,
        }
    }

    pub fn get_ushort(&self, key: &str) -> Option<u16> {
        match self.store.get(self.namespace, key)? {
            StoredValue::U16(v) => Some(v),
            _ => None,
        }
    }

    pub fn get_int(&self, key: &str) -> Option<i32> {
        match self.store.get(self.namespace, key)? {
            StoredValue::I32(v) => Some(v),
            _ => None,
        }
    }

    pub fn get_uint(&self, key: &str) -> Option<u32> {
        match self.store.get(self.namespace, key)? {
            StoredValue::U32(v) => Some(v),
            _ => None,
        }
    }

    pub fn get_long64(&self, key: &str) -> Option<i64> {
        match self.store.get(self.namespace, key)? {
            StoredValue::I64(v) => Some(v),
            _ => None,
        }
    }

    pub fn get_ulong64(&self, key: &str) -> Option<u64> {
        match self.store.get(self.namespace, key)? {
            StoredValue::U64(v) => Some(v),
            _ => None,
        }
    }

    /// Floats are stored as 4-byte little-endian blobs.
    pub fn get_float(&self, key: &str) -> Option<f32> {
        let bytes = self.blob(key)?;
        let raw: [u8; 4] = bytes[..].try_into().ok()?;
        Some(f32::from_le_bytes(raw))
    }

    /// Doubles are stored as 8-byte little-endian blobs.
    pub fn get_double(&self, key: &str) -> Option<f64> {
        let bytes = self.blob(key)?;
        let raw: [u8; 8] = bytes[..].try_into().ok()?;
        Some(f64::from_le_bytes(raw))
    }

    pub fn get_string(&self, key: &str) -> Option<String> {
        match self.store.get(self.namespace, key)? {
            StoredValue::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Reads at most `max_len` leading bytes of a blob.
    pub fn get_bytes(&self, key: &str, max_len: usize) -> Option<Bytes> {
        let mut bytes = self.blob(key)?;
        bytes.truncate(max_len);
        Some(bytes)
    }

    fn blob(&self, key: &str) -> Option<Bytes> {
        match self.store.get(self.namespace, key)? {
            StoredValue::Blob(b) => Some(b),
            _ => None,
        }
    }

    pub fn put_char(&self, key: &str, value: i8) -> usize {
        self.store.put(self.namespace, key, StoredValue::I8(value))
    }

    pub fn put_uchar(&self, key: &str, value: u8) -> usize {
        self.store.put(self.namespace, key, StoredValue::U8(value))
    }

    pub fn put_bool(&self, key: &str, value: bool) -> usize {
        self.put_uchar(key, u8::from(value))
    }

    pub fn put_short(&self, key: &str, value: i16) -> usize {
        self.store.put(self.namespace, key, StoredValue::I16(value))
    }

    pub fn put_ushort(&self, key: &str, value: u16) -> usize {
        self.store.put(self.namespace, key, StoredValue::U16(value))
    }

    pub fn put_int(&self, key: &str, value: i32) -> usize {
        self.store.put(self.namespace, key, StoredValue::I32(value))
    }

    pub fn put_uint(&self, key: &str, value: u32) -> usize {
        self.store.put(self.namespace, key, StoredValue::U32(value))
    }

    pub fn put_long64(&self, key: &str, value: i64) -> usize {
        self.store.put(self.namespace, key, StoredValue::I64(value))
    }

    pub fn put_ulong64(&self, key: &str, value: u64) -> usize {
        self.store.put(self.namespace, key, StoredValue::U64(value))
    }

    pub fn put_float(&self, key: &str, value: f32) -> usize {
        self.put_bytes(key, &value.to_le_bytes())
    }

    pub fn put_double(&self, key: &str, value: f64) -> usize {
        self.put_bytes(key, &value.to_le_bytes())
    }

    pub fn put_string(&self, key: &str, value: &str) -> usize {
        self.store
            .put(self.namespace, key, StoredValue::Str(value.to_string()))
    }

    pub fn put_bytes(&self, key: &str, value: &[u8]) -> usize {
        self.store.put(
            self.namespace,
            key,
            StoredValue::Blob(Bytes::copy_from_slice(value)),
        )
    }

    pub fn remove(&self, key: &str) -> bool {
        self.store.remove(self.namespace, key)
    }

    pub fn clear(&self) -> bool {
        self.store.clear(self.namespace)
    }
}

impl<S: PreferenceStore + ?Sized> Drop for Preferences<'_, S> {
    fn drop(&mut self) {
        self.store.end(self.namespace);
    }
}
