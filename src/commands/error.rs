//! Preference Command Errors
//!
//! Every failure a preference command can report. The `Display` text of each
//! variant is the exact line written back to the shell.

use crate::storage::PreferenceType;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum PreferenceError {
    /// The key (or its namespace) does not exist
    #[error("ERROR: unable to locate key '{key}' in namespace '{namespace}'")]
    KeyNotFound { namespace: String, key: String },

    /// The key holds a different category than the one requested
    #[error("ERROR: '{namespace}/{key}' is stored as a {stored}, but {requested} was requested")]
    TypeMismatch {
        namespace: String,
        key: String,
        stored: PreferenceType,
        requested: PreferenceType,
    },

    /// A blob cannot be read as a float or double of that width
    #[error("ERROR: '{namespace}/{key}' holds {len} Bytes, which cannot be read as a {requested}")]
    WidthMismatch {
        namespace: String,
        key: String,
        len: usize,
        requested: String,
    },

    /// `getpreference` was given an unknown type name
    #[error("ERROR: unable to get preferences of type '{0}'")]
    UnsupportedReadType(String),

    /// `setpreference` was given an unknown or disabled type name
    #[error("ERROR: '{0}' is not a supported data type")]
    UnsupportedWriteType(String),

    /// The store wrote nothing
    #[error("ERROR: unable to store '{value}' as a {type_name} in {namespace}/{key}")]
    StoreFailed {
        value: String,
        type_name: String,
        namespace: String,
        key: String,
    },

    #[error("ERROR: unable to open namespace '{0}'")]
    OpenFailed(String),

    #[error("ERROR: unable to clear '{key}' from namespace '{namespace}'")]
    RemoveFailed { namespace: String, key: String },

    #[error("ERROR: unable to clear namespace '{0}'")]
    ClearFailed(String),

    /// A key was given for clearing without its namespace
    #[error("ERROR: a namespace is required to clear '{0}'")]
    NamespaceRequired(String),

    /// The injected storage area cannot be erased
    #[error("ERROR: full clearing of all preferences is not supported on this platform")]
    EraseUnsupported,

    #[error("ERROR: unable to erase the NVS flash ({0})")]
    EraseFailed(String),
}
