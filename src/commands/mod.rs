//! Preference Command Module
//!
//! This module implements the command processing layer of the preference
//! shell. It receives parsed commands, executes them against a preference
//! store, and produces one bounded response line per command.
//!
//! ## Architecture
//!
//! ```text
//! Shell Input
//!       │
//!       ▼
//! ┌─────────────────┐
//! │ CommandRegistry │  (cli module)
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐
//! │ PreferencesCli  │  (this module)
//! │                 │
//! │  - Route        │
//! │  - Convert      │
//! │  - Format       │
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐
//! │ PreferenceStore │  (storage module)
//! └─────────────────┘
//! ```
//!
//! ## Supported Commands
//!
//! - `setPreference` (`setp`, `setpref`)
//! - `getPreference` (`getp`, `getpref`)
//! - `clearPreference` (`clearp`, `clearpref`)
//!
//! ## Type Names
//!
//! `Int8`, `Char`, `UInt8`, `UChar`, `Bool`, `Int16`, `UInt16`, `Int32`,
//! `UInt32`, `Int64`, `UInt64`, `Float`, `Double`, `Bytes` and `String`,
//! matched case-insensitively. `UInt32` and `UInt64` can be read but not
//! written.

pub mod convert;
pub mod error;
pub mod handler;
pub mod hex;
pub mod kind;
pub mod response;

// Re-export the main command handler
pub use error::PreferenceError;
pub use handler::PreferencesCli;
pub use kind::{preference_type, PreferenceKind};
pub use response::{ResponseBuffer, DEFAULT_RESPONSE_CAPACITY, MIN_RESPONSE_CAPACITY};
