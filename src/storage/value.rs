//! Stored Value Types
//!
//! Every entry in the preference store carries exactly one of a small, closed
//! set of categories. The category is chosen by the store when the value is
//! written and is reported back on every read, so callers can refuse to read
//! a key as something it is not.
//!
//! ## Categories
//!
//! ```text
//! ┌──────────┬────────────────────┬──────────────────────────────┐
//! │ Category │ Display name       │ Written by                   │
//! ├──────────┼────────────────────┼──────────────────────────────┤
//! │ I8       │ Int8/Char          │ put_char                     │
//! │ U8       │ UInt8/UChar/Bool   │ put_uchar, put_bool          │
//! │ I16/U16  │ Int16 / UInt16     │ put_short / put_ushort       │
//! │ I32/U32  │ Int32 / UInt32     │ put_int / put_uint           │
//! │ I64/U64  │ Int64 / UInt64     │ put_long64 / put_ulong64     │
//! │ Str      │ String             │ put_string                   │
//! │ Blob     │ Float/Double/Bytes │ put_float, put_double, bytes │
//! └──────────┴────────────────────┴──────────────────────────────┘
//! ```
//!
//! Several CLI sub-types share a category, which is why the display names
//! list more than one type.

use bytes::Bytes;
use std::fmt;

/// The storage category of a preference entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PreferenceType {
    I8,
    U8,
    I16,
    U16,
    I32,
    U32,
    I64,
    U64,
    Str,
    Blob,
    /// Reported for missing keys and unrecognised type names.
    Invalid,
}

impl PreferenceType {
    /// Returns the fixed display name of this category.
    pub fn name(self) -> &'static str {
        match self {
            PreferenceType::I8 => "Int8/Char",
            PreferenceType::U8 => "UInt8/UChar/Bool",
            PreferenceType::I16 => "Int16",
            PreferenceType::U16 => "UInt16",
            PreferenceType::I32 => "Int32",
            PreferenceType::U32 => "UInt32",
            PreferenceType::I64 => "Int64",
            PreferenceType::U64 => "UInt64",
            PreferenceType::Str => "String",
            PreferenceType::Blob => "Float/Double/Bytes",
            PreferenceType::Invalid => "Invalid",
        }
    }

    /// Returns the on-disk code of this category.
    ///
    /// The low nibble is the width in bytes for integers, bit 4 marks
    /// unsigned integers.
    pub fn code(self) -> u8 {
        match self {
            PreferenceType::I8 => 0x01,
            PreferenceType::U8 => 0x11,
            PreferenceType::I16 => 0x02,
            PreferenceType::U16 => 0x12,
            PreferenceType::I32 => 0x04,
            PreferenceType::U32 => 0x14,
            PreferenceType::I64 => 0x08,
            PreferenceType::U64 => 0x18,
            PreferenceType::Str => 0x21,
            PreferenceType::Blob => 0x42,
            PreferenceType::Invalid => 0xff,
        }
    }

    /// Looks up a category by its on-disk code.
    ///
    /// `Invalid` has no stored representation, so its code is rejected too.
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0x01 => Some(PreferenceType::I8),
            0x11 => Some(PreferenceType::U8),
            0x02 => Some(PreferenceType::I16),
            0x12 => Some(PreferenceType::U16),
            0x04 => Some(PreferenceType::I32),
            0x14 => Some(PreferenceType::U32),
            0x08 => Some(PreferenceType::I64),
            0x18 => Some(PreferenceType::U64),
            0x21 => Some(PreferenceType::Str),
            0x42 => Some(PreferenceType::Blob),
            _ => None,
        }
    }
}

impl fmt::Display for PreferenceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A value held by the preference store.
#[derive(Debug, Clone, PartialEq)]
pub enum StoredValue {
    I8(i8),
    U8(u8),
    I16(i16),
    U16(u16),
    I32(i32),
    U32(u32),
    I64(i64),
    U64(u64),
    Str(String),
    Blob(Bytes),
}

impl StoredValue {
    /// Returns the storage category of this value.
    pub fn preference_type(&self) -> PreferenceType {
        match self {
            StoredValue::I8(_) => PreferenceType::I8,
            StoredValue::U8(_) => PreferenceType::U8,
            StoredValue::I16(_) => PreferenceType::I16,
            StoredValue::U16(_) => PreferenceType::U16,
            StoredValue::I32(_) => PreferenceType::I32,
            StoredValue::U32(_) => PreferenceType::U32,
            StoredValue::I64(_) => PreferenceType::I64,
            StoredValue::U64(_) => PreferenceType::U64,
            StoredValue::Str(_) => PreferenceType::Str,
            StoredValue::Blob(_) => PreferenceType::Blob,
        }
    }

    /// Number of bytes a successful write of this value reports.
    pub fn len(&self) -> usize {
        match self {
            StoredValue::I8(_) | StoredValue::U8(_) => 1,
            StoredValue::I16(_) | StoredValue::U16(_) => 2,
            StoredValue::I32(_) | StoredValue::U32(_) => 4,
            StoredValue::I64(_) | StoredValue::U64(_) => 8,
            StoredValue::Str(s) => s.len(),
            StoredValue::Blob(b) => b.len(),
        }
    }

    /// Returns true for zero-length strings and blobs.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Encodes the value as its little-endian payload.
    pub fn to_payload(&self) -> Bytes {
        match self {
            StoredValue::I8(v) => Bytes::copy_from_slice(&v.to_le_bytes()),
            StoredValue::U8(v) => Bytes::copy_from_slice(&v.to_le_bytes()),
            StoredValue::I16(v) => Bytes::copy_from_slice(&v.to_le_bytes()),
            StoredValue::U16(v) => Bytes::copy_from_slice(&v.to_le_bytes()),
            StoredValue::I32(v) => Bytes::copy_from_slice(&v.to_le_bytes()),
            StoredValue::U32(v) => Bytes::copy_from_slice(&v.to_le_bytes()),
            StoredValue::I64(v) => Bytes::copy_from_slice(&v.to_le_bytes()),
            StoredValue::U64(v) => Bytes::copy_from_slice(&v.to_le_bytes()),
            StoredValue::Str(s) => Bytes::copy_from_slice(s.as_bytes()),
            StoredValue::Blob(b) => b.clone(),
        }
    }

    /// Rebuilds a value from its category and payload.
    ///
    /// Returns `None` when the payload width does not fit the category or a
    /// string payload is not valid UTF-8.
    pub fn from_payload(ty: PreferenceType, payload: Bytes) -> Option<Self> {
        let value = match ty {
            PreferenceType::I8 => StoredValue::I8(i8::from_le_bytes(fixed(&payload)?)),
            PreferenceType::U8 => StoredValue::U8(u8::from_le_bytes(fixed(&payload)?)),
            PreferenceType::I16 => StoredValue::I16(i16::from_le_bytes(fixed(&payload)?)),
            PreferenceType::U16 => StoredValue::U16(u16::from_le_bytes(fixed(&payload)?)),
            PreferenceType::I32 => StoredValue::I32(i32::from_le_bytes(fixed(&payload)?)),
            PreferenceType::U32 => StoredValue::U32(u32::from_le_bytes(fixed(&payload)?)),
            PreferenceType::I64 => StoredValue::I64(i64::from_le_bytes(fixed(&payload)?)),
            PreferenceType::U64 => StoredValue::U64(u64::from_le_bytes(fixed(&payload)?)),
            PreferenceType::Str => StoredValue::Str(String::from_utf8(payload.to_vec()).ok()?),
            PreferenceType::Blob => StoredValue::Blob(payload),
            PreferenceType::Invalid => return None,
        };
        Some(value)
    }
}

fn fixed<const N: usize>(payload: &[u8]) -> Option<[u8; N]> {
    payload.try_into().ok()
}
