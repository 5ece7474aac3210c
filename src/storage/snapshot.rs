//! Snapshot Persistence
//!
//! The engine's namespace table is persisted as a single little-endian binary
//! file. The whole table is rewritten on every commit: it is written to a
//! sibling `.tmp` file first and then renamed over the old snapshot, so a
//! crash mid-write leaves the previous snapshot intact.
//!
//! ## File Layout
//!
//! ```text
//! "PRFS" | version u8 | namespace count u16
//!   per namespace: name len u8 | name | entry count u32
//!     per entry:   key len u8 | key | category u8 | payload len u32 | payload
//! ```

use crate::storage::value::{PreferenceType, StoredValue};
use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// The namespace table: namespace name -> key -> value.
pub type Namespaces = HashMap<String, HashMap<String, StoredValue>>;

/// File signature
pub const MAGIC: &[u8; 4] = b"PRFS";

/// Current format version
pub const FORMAT_VERSION: u8 = 1;

/// Errors that can occur while reading or writing a snapshot.
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("not a preference snapshot")]
    BadMagic,

    #[error("unsupported snapshot version {0}")]
    UnsupportedVersion(u8),

    #[error("snapshot truncated")]
    Truncated,

    #[error("unknown category code {0:#04x}")]
    UnknownCategory(u8),

    #[error("corrupt entry '{namespace}/{key}'")]
    CorruptEntry { namespace: String, key: String },

    #[error("name too long to encode: {0}")]
    NameTooLong(String),

    #[error("{what} count {count} exceeds the format limit")]
    TooMany { what: &'static str, count: usize },

    #[error("{0} unexpected bytes after the last namespace")]
    TrailingBytes(usize),
}

/// Encodes the namespace table.
///
/// Namespaces and keys are written in sorted order so identical tables
/// produce identical files.
pub fn encode(namespaces: &Namespaces) -> Result<Bytes, SnapshotError> {
    let mut buf = BytesMut::with_capacity(64);
    buf.put_slice(MAGIC);
    buf.put_u8(FORMAT_VERSION);
    buf.put_u16_le(count(namespaces.len(), "namespace")?);

    let mut names: Vec<&String> = namespaces.keys().collect();
    names.sort();

    for name in names {
        let entries = &namespaces[name];
        put_name(&mut buf, name)?;
        buf.put_u32_le(count(entries.len(), "entry")?);

        let mut keys: Vec<&String> = entries.keys().collect();
        keys.sort();

        for key in keys {
            let value = &entries[key];
            let payload = value.to_payload();
            put_name(&mut buf, key)?;
            buf.put_u8(value.preference_type().code());
            buf.put_u32_le(count(payload.len(), "payload byte")?);
            buf.put_slice(&payload);
        }
    }

    Ok(buf.freeze())
}

fn count<T: TryFrom<usize>>(count: usize, what: &'static str) -> Result<T, SnapshotError> {
    T::try_from(count).map_err(|_| SnapshotError::TooMany { what, count })
}

fn put_name(buf: &mut BytesMut, name: &str) -> Result<(), SnapshotError> {
    let len = u8::try_from(name.len()).map_err(|_| SnapshotError::NameTooLong(name.to_string()))?;
    buf.put_u8(len);
    buf.put_slice(name.as_bytes());
    Ok(())
}

/// Decodes a namespace table.
pub fn decode(mut data: Bytes) -> Result<Namespaces, SnapshotError> {
    need(&data, MAGIC.len() + 1 + 2)?;
    if &data[..MAGIC.len()] != MAGIC {
        return Err(SnapshotError::BadMagic);
    }
    data.advance(MAGIC.len());

    let version = data.get_u8();
    if version != FORMAT_VERSION {
        return Err(SnapshotError::UnsupportedVersion(version));
    }

    let namespace_count = data.get_u16_le();
    let mut namespaces = Namespaces::with_capacity(namespace_count as usize);

    for _ in 0..namespace_count {
        let namespace = get_name(&mut data)?;
        need(&data, 4)?;
        let entry_count = data.get_u32_le();
        let mut entries = HashMap::new();

        for _ in 0..entry_count {
            let key = get_name(&mut data)?;
            need(&data, 1 + 4)?;
            let code = data.get_u8();
            let ty = PreferenceType::from_code(code).ok_or(SnapshotError::UnknownCategory(code))?;
            let len = data.get_u32_le() as usize;
            need(&data, len)?;
            let payload = data.split_to(len);

            let value = StoredValue::from_payload(ty, payload).ok_or_else(|| {
                SnapshotError::CorruptEntry {
                    namespace: namespace.clone(),
                    key: key.clone(),
                }
            })?;
            entries.insert(key, value);
        }

        namespaces.insert(namespace, entries);
    }

    if data.has_remaining() {
        return Err(SnapshotError::TrailingBytes(data.remaining()));
    }

    Ok(namespaces)
}

fn need(data: &Bytes, len: usize) -> Result<(), SnapshotError> {
    if data.remaining() < len {
        Err(SnapshotError::Truncated)
    } else {
        Ok(())
    }
}

fn get_name(data: &mut Bytes) -> Result<String, SnapshotError> {
    need(data, 1)?;
    let len = data.get_u8() as usize;
    need(data, len)?;
    let raw = data.split_to(len);
    String::from_utf8(raw.to_vec()).map_err(|_| SnapshotError::Truncated)
}

/// Loads a snapshot, returning `None` if the file does not exist.
pub fn load(path: &Path) -> Result<Option<Namespaces>, SnapshotError> {
    match std::fs::read(path) {
        Ok(data) => decode(Bytes::from(data)).map(Some),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Replaces the snapshot at `path` with the given table.
pub fn store(path: &Path, namespaces: &Namespaces) -> Result<(), SnapshotError> {
    let data = encode(namespaces)?;
    let tmp = tmp_path(path);

    std::fs::write(&tmp, &data)?;
    if let Err(e) = std::fs::rename(&tmp, path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(e.into());
    }
    Ok(())
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Namespaces {
        let mut wifi = HashMap::new();
        wifi.insert("ssid".to_string(), StoredValue::Str("home".into()));
        wifi.insert("retries".to_string(), StoredValue::I32(-3));
        wifi.insert("mac".to_string(), StoredValue::Blob(Bytes::from_static(&[0xde, 0xad])));

        let mut boot = HashMap::new();
        boot.insert("count".to_string(), StoredValue::U64(u64::MAX));

        let mut namespaces = Namespaces::new();
        namespaces.insert("wifi".to_string(), wifi);
        namespaces.insert("boot".to_string(), boot);
        namespaces
    }

    #[test]
    fn test_encode_decode() {
        let namespaces = sample();
        let data = encode(&namespaces).unwrap();
        assert_eq!(decode(data).unwrap(), namespaces);
    }

    #[test]
    fn test_encoding_is_deterministic() {
        assert_eq!(encode(&sample()).unwrap(), encode(&sample()).unwrap());
    }

    #[test]
    fn test_empty_table() {
        let data = encode(&Namespaces::new()).unwrap();
        assert_eq!(&data[..], b"PRFS\x01\x00\x00");
        assert!(decode(data).unwrap().is_empty());
    }

    #[test]
    fn test_bad_magic() {
        let result = decode(Bytes::from_static(b"NOPE\x01\x00\x00"));
        assert!(matches!(result, Err(SnapshotError::BadMagic)));
    }

    #[test]
    fn test_unsupported_version() {
        let result = decode(Bytes::from_static(b"PRFS\x09\x00\x00"));
        assert!(matches!(result, Err(SnapshotError::UnsupportedVersion(9))));
    }

    #[test]
    fn test_truncated() {
        let data = encode(&sample()).unwrap();
        let cut = data.slice(..data.len() - 1);
        assert!(matches!(decode(cut), Err(SnapshotError::Truncated)));
    }

    #[test]
    fn test_unknown_category() {
        let mut buf = BytesMut::new();
        buf.put_slice(b"PRFS\x01");
        buf.put_u16_le(1);
        buf.put_u8(2);
        buf.put_slice(b"ns");
        buf.put_u32_le(1);
        buf.put_u8(1);
        buf.put_slice(b"k");
        buf.put_u8(0x77);
        buf.put_u32_le(0);

        assert!(matches!(
            decode(buf.freeze()),
            Err(SnapshotError::UnknownCategory(0x77))
        ));
    }

    #[test]
    fn test_corrupt_payload_width() {
        let mut buf = BytesMut::new();
        buf.put_slice(b"PRFS\x01");
        buf.put_u16_le(1);
        buf.put_u8(2);
        buf.put_slice(b"ns");
        buf.put_u32_le(1);
        buf.put_u8(1);
        buf.put_slice(b"k");
        buf.put_u8(PreferenceType::I32.code());
        buf.put_u32_le(2);
        buf.put_slice(&[0, 0]);

        assert!(matches!(
            decode(buf.freeze()),
            Err(SnapshotError::CorruptEntry { .. })
        ));
    }

    #[test]
    fn test_trailing_bytes() {
        let mut buf = BytesMut::from(&encode(&sample()).unwrap()[..]);
        buf.put_u8(0);

        assert!(matches!(
            decode(buf.freeze()),
            Err(SnapshotError::TrailingBytes(1))
        ));
    }

    #[test]
    fn test_namespace_count_overflow() {
        let namespaces: Namespaces = (0..=u16::MAX as usize + 1)
            .map(|i| (format!("ns{}", i), HashMap::new()))
            .collect();

        assert!(matches!(
            encode(&namespaces),
            Err(SnapshotError::TooMany {
                what: "namespace",
                count: 65_537
            })
        ));
    }

    #[test]
    fn test_largest_namespace_count() {
        let namespaces: Namespaces = (0..u16::MAX as usize)
            .map(|i| (format!("ns{}", i), HashMap::new()))
            .collect();

        let decoded = decode(encode(&namespaces).unwrap()).unwrap();
        assert_eq!(decoded.len(), u16::MAX as usize);
    }

    #[test]
    fn test_load_missing_file() {
        let path = std::env::temp_dir().join(format!("prefcli-missing-{}.bin", std::process::id()));
        let _ = std::fs::remove_file(&path);
        assert!(load(&path).unwrap().is_none());
    }

    #[test]
    fn test_store_and_load() {
        let path = std::env::temp_dir().join(format!("prefcli-snapshot-{}.bin", std::process::id()));

        store(&path, &sample()).unwrap();
        assert_eq!(load(&path).unwrap(), Some(sample()));
        assert!(!tmp_path(&path).exists());

        let _ = std::fs::remove_file(&path);
    }
}
