//! Preference Sub-Types
//!
//! The shell accepts fifteen type names. Each maps to one storage category,
//! and several names share a category: `Int8` and `Char` are both signed
//! bytes, `UInt8`, `UChar` and `Bool` are unsigned bytes, and `Float`,
//! `Double` and `Bytes` are all blobs.

use crate::storage::PreferenceType;
use std::fmt;

/// A type name accepted by `setpreference` and `getpreference`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PreferenceKind {
    Int8,
    Char,
    UInt8,
    UChar,
    Bool,
    Int16,
    UInt16,
    Int32,
    UInt32,
    Int64,
    UInt64,
    Float,
    Double,
    Bytes,
    String,
}

impl PreferenceKind {
    /// Every sub-type, in help-text order.
    pub const ALL: [PreferenceKind; 15] = [
        PreferenceKind::Bool,
        PreferenceKind::Char,
        PreferenceKind::UChar,
        PreferenceKind::Int8,
        PreferenceKind::UInt8,
        PreferenceKind::Int16,
        PreferenceKind::UInt16,
        PreferenceKind::Int32,
        PreferenceKind::UInt32,
        PreferenceKind::Int64,
        PreferenceKind::UInt64,
        PreferenceKind::String,
        PreferenceKind::Float,
        PreferenceKind::Double,
        PreferenceKind::Bytes,
    ];

    /// The canonical spelling of the sub-type.
    pub fn name(self) -> &'static str {
        match self {
            PreferenceKind::Int8 => "Int8",
            PreferenceKind::Char => "Char",
            PreferenceKind::UInt8 => "UInt8",
            PreferenceKind::UChar => "UChar",
            PreferenceKind::Bool => "Bool",
            PreferenceKind::Int16 => "Int16",
            PreferenceKind::UInt16 => "UInt16",
            PreferenceKind::Int32 => "Int32",
            PreferenceKind::UInt32 => "UInt32",
            PreferenceKind::Int64 => "Int64",
            PreferenceKind::UInt64 => "UInt64",
            PreferenceKind::Float => "Float",
            PreferenceKind::Double => "Double",
            PreferenceKind::Bytes => "Bytes",
            PreferenceKind::String => "String",
        }
    }

    /// Parses a type name, ignoring ASCII case.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.name().eq_ignore_ascii_case(name))
    }

    /// The storage category values of this sub-type are kept in.
    pub fn category(self) -> PreferenceType {
        match self {
            PreferenceKind::Int8 | PreferenceKind::Char => PreferenceType::I8,
            PreferenceKind::UInt8 | PreferenceKind::UChar | PreferenceKind::Bool => {
                PreferenceType::U8
            }
            PreferenceKind::Int16 => PreferenceType::I16,
            PreferenceKind::UInt16 => PreferenceType::U16,
            PreferenceKind::Int32 => PreferenceType::I32,
            PreferenceKind::UInt32 => PreferenceType::U32,
            PreferenceKind::Int64 => PreferenceType::I64,
            PreferenceKind::UInt64 => PreferenceType::U64,
            PreferenceKind::String => PreferenceType::Str,
            PreferenceKind::Float | PreferenceKind::Double | PreferenceKind::Bytes => {
                PreferenceType::Blob
            }
        }
    }

    /// Whether `setpreference` accepts this sub-type. Unsigned 32- and
    /// 64-bit values can be read but not written.
    pub fn is_writable(self) -> bool {
        !matches!(self, PreferenceKind::UInt32 | PreferenceKind::UInt64)
    }
}

impl fmt::Display for PreferenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Maps a type name straight to its storage category; unknown names map
/// to `Invalid`.
pub fn preference_type(name: &str) -> PreferenceType {
    PreferenceKind::from_name(name)
        .map(PreferenceKind::category)
        .unwrap_or(PreferenceType::Invalid)
}
