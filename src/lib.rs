//! # prefcli - A Serial Command Shell for Typed Preferences
//!
//! prefcli exposes a namespaced, typed key/value store (in the style of a
//! microcontroller's non-volatile storage partition) through a line-oriented
//! command shell. Three commands get, set and clear values addressed by
//! `namespace/key`; byte blobs travel as uppercase hex text.
//!
//! ## Features
//!
//! - **Typed Values**: Signed and unsigned integers from 8 to 64 bits,
//!   strings, and blobs (which also carry floats and doubles)
//! - **Flexible Grammar**: Abbreviated command names, named (`-ns`, `-k`)
//!   and positional arguments, quoted values
//! - **Bounded Output**: Every response is a single line of bounded length
//! - **Persistence**: Optional write-through snapshot file
//! - **Async I/O**: Built on Tokio, serving stdin/stdout or TCP clients
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                              prefcli                                    │
//! │                                                                         │
//! │  ┌─────────────┐    ┌─────────────┐    ┌─────────────┐                  │
//! │  │ stdin / TCP │───>│ Connection  │───>│  Command    │                  │
//! │  │  session    │    │  Handler    │    │  Registry   │                  │
//! │  └─────────────┘    └─────────────┘    └──────┬──────┘                  │
//! │                                               │                         │
//! │                                               ▼                         │
//! │                     ┌──────────────────────────────────────────────┐    │
//! │                     │              PreferencesCli                  │    │
//! │                     │     setpreference / getpreference /          │    │
//! │                     │     clearpreference                          │    │
//! │                     └──────────────┬───────────────────┬───────────┘    │
//! │                                    │                   │                │
//! │                                    ▼                   ▼                │
//! │                     ┌──────────────────────┐  ┌─────────────────┐       │
//! │                     │   StorageEngine      │  │   FlashArea     │       │
//! │                     │ (PreferenceStore)    │  │ (full erase)    │       │
//! │                     └──────────────────────┘  └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```
//! use prefcli::commands::PreferencesCli;
//! use prefcli::connection::Shell;
//! use prefcli::storage::{StorageEngine, Unsupported};
//! use std::sync::Arc;
//!
//! let storage = Arc::new(StorageEngine::new());
//! let shell = Shell::new(PreferencesCli::new(storage, Arc::new(Unsupported)));
//!
//! let mut out = Vec::new();
//! shell.execute_line("setp myns mykey Int32 42", &mut out).unwrap();
//! shell.execute_line("getp myns mykey Int32", &mut out).unwrap();
//!
//! assert_eq!(
//!     String::from_utf8(out).unwrap(),
//!     "'42' stored as a Int32 (4 Bytes) in myns/mykey\r\n42\r\n"
//! );
//! ```
//!
//! ## Supported Commands
//!
//! - `setPreference <namespace> <key> <type> <value>` (`setp`, `setpref`)
//! - `getPreference <namespace> <key> [type]` (`getp`, `getpref`)
//! - `clearPreference [namespace] [key]` (`clearp`, `clearpref`)
//! - `help`
//!
//! ## Module Overview
//!
//! - [`cli`]: Command grammar, tokenizer and registry
//! - [`storage`]: Typed values, the store contract and the storage engine
//! - [`commands`]: The preference command handlers
//! - [`connection`]: Shell sessions over async streams
//!
//! ## Design Highlights
//!
//! ### Scoped Namespaces
//!
//! Every command opens its namespace through a [`storage::Preferences`]
//! handle that closes it on drop, so no error path leaves a namespace open.
//!
//! ### Categories, Not Types
//!
//! The store remembers one of ten storage categories per key. `Char` and
//! `Int8` share a category, as do `UChar`, `UInt8` and `Bool`, and floats,
//! doubles and byte arrays are all blobs. Reads check the category, and
//! floats additionally check the blob width.

pub mod cli;
pub mod commands;
pub mod connection;
pub mod storage;

// Re-export commonly used types for convenience
pub use cli::{CommandRegistry, ParseError, ParsedCommand};
pub use commands::{PreferenceError, PreferenceKind, PreferencesCli};
pub use connection::{handle_connection, run_stdio, ConnectionStats, Shell};
pub use storage::{FlashArea, PreferenceStore, Preferences, StorageEngine, Unsupported};

/// Version of prefcli
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
