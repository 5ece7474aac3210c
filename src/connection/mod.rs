//! Session Module
//!
//! This module runs the preference shell over a byte stream. The host
//! program either serves a single session on stdin/stdout, or listens on a
//! TCP port as a serial bridge where each client gets its own async task.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────┐      ┌──────────────────────────┐
//! │   stdin / stdout         │      │   TCP Listener           │
//! │   (run_stdio)            │      │   (main.rs, --listen)    │
//! └────────────┬─────────────┘      └────────────┬─────────────┘
//!              │                                 │ accept() + spawn
//!              ▼                                 ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 ConnectionHandler                           │
//! │                                                             │
//! │  ┌─────────────┐    ┌─────────────┐    ┌─────────────┐      │
//! │  │ Read bytes  │───>│ Split lines │───>│ Shell       │      │
//! │  └─────────────┘    └─────────────┘    └──────┬──────┘      │
//! │                                               │             │
//! │                                               ▼             │
//! │                                      ┌─────────────┐        │
//! │                                      │ Write resp  │        │
//! │                                      └─────────────┘        │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Features
//!
//! - **Any Stream**: Generic over `AsyncRead`/`AsyncWrite`
//! - **Buffer Management**: BytesMut line buffer with a length limit
//! - **Built-ins**: `help` lists the registered commands
//! - **Statistics**: Tracks session and line metrics
//!
//! ## Example
//!
//! ```ignore
//! use prefcli::commands::PreferencesCli;
//! use prefcli::connection::{handle_connection, ConnectionStats, Shell};
//! use prefcli::storage::{StorageEngine, Unsupported};
//! use std::sync::Arc;
//!
//! let storage = Arc::new(StorageEngine::new());
//! let shell = Shell::new(PreferencesCli::new(storage, Arc::new(Unsupported)));
//! let stats = Arc::new(ConnectionStats::new());
//!
//! // For each accepted connection...
//! let (stream, addr) = listener.accept().await?;
//! tokio::spawn(handle_connection(stream, addr, shell.clone(), stats));
//! ```

pub mod handler;
pub mod shell;

// Re-export commonly used types
pub use handler::{
    handle_connection, run_stdio, ConnectionError, ConnectionHandler, ConnectionStats,
    MAX_LINE_LENGTH,
};
pub use shell::Shell;
