//! Preference Command Handler
//!
//! This module implements the three preference commands and the routing
//! between them.
//!
//! ## Commands
//!
//! - `setpreference <namespace> <key> <type> <value>` - Write a typed value
//! - `getpreference <namespace> <key> [type]` - Read a value, or its type
//! - `clearpreference [namespace] [key]` - Remove a key, a namespace, or everything
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     PreferencesCli                          │
//! │                                                             │
//! │  ┌──────────────┐   ┌──────────────────┐   ┌─────────────┐  │
//! │  │handle_command│──>│ set/get/clear    │──>│ Response    │  │
//! │  │  (routing)   │   │ (one store op)   │   │ Buffer      │  │
//! │  └──────────────┘   └────────┬─────────┘   └─────────────┘  │
//! │                              │                              │
//! │                              ▼                              │
//! │              Preferences (open namespace)                   │
//! │                              │                              │
//! └──────────────────────────────┼──────────────────────────────┘
//!                                ▼
//!                     PreferenceStore / FlashArea
//! ```
//!
//! Every handler produces exactly one response line, whether it succeeds or
//! fails.

use crate::cli::{CommandRegistry, CommandSpec, ParsedCommand};
use crate::commands::convert::{parse_float, parse_integer};
use crate::commands::error::PreferenceError;
use crate::commands::hex;
use crate::commands::kind::PreferenceKind;
use crate::commands::response::{ResponseBuffer, DEFAULT_RESPONSE_CAPACITY, MIN_RESPONSE_CAPACITY};
use crate::storage::{FlashArea, FlashError, PreferenceStore, PreferenceType, Preferences, StorageEngine};
use std::io::{self, Write};
use std::sync::Arc;
use tracing::{debug, trace};

const SET_DESCRIPTION: &str = "Writes a preference value.\r\n\
    \tnamespace (-ns): namespace holding the preference\r\n\
    \tkey (-k): name of the preference\r\n\
    \ttype (-t): data type to write (Bool, U/Char, U/Int8, U/Int16, Int32, Int64, String, Float, Double, Bytes)\r\n\
    \tvalue (-v): value to store (Bytes are given as hex)";

const GET_DESCRIPTION: &str = "Reads a preference value.\r\n\
    \tnamespace (-ns): namespace holding the preference\r\n\
    \tkey (-k): name of the preference\r\n\
    \ttype (-t): data type to read (Bool, U/Char, U/Int8, U/Int16, U/Int32, U/Int64, String, Float, Double, Bytes); omit to print the stored type";

const CLEAR_DESCRIPTION: &str = "Clears a single preference, a whole namespace, or the entire storage area.\r\n\
    \tnamespace (-ns): namespace to clear (omit to erase all preferences)\r\n\
    \tkey (-k): preference to clear (omit to clear the whole namespace)";

/// Dispatches preference commands to a store.
///
/// The full-erase capability is injected rather than detected, so the same
/// handler runs against stores that can and cannot wipe their storage area.
pub struct PreferencesCli<S: PreferenceStore + ?Sized = StorageEngine> {
    /// The preference store
    store: Arc<S>,
    /// The storage area used by a bare `clearpreference`
    flash: Arc<dyn FlashArea>,
    /// Response line capacity in bytes
    response_capacity: usize,
}

impl<S: PreferenceStore + ?Sized> Clone for PreferencesCli<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            flash: Arc::clone(&self.flash),
            response_capacity: self.response_capacity,
        }
    }
}

impl<S: PreferenceStore + ?Sized> PreferencesCli<S> {
    /// Creates a handler over `store`, erasing through `flash`.
    pub fn new(store: Arc<S>, flash: Arc<dyn FlashArea>) -> Self {
        Self {
            store,
            flash,
            response_capacity: DEFAULT_RESPONSE_CAPACITY,
        }
    }

    /// Sets the response line capacity (clamped to a small minimum).
    pub fn with_response_capacity(mut self, capacity: usize) -> Self {
        self.response_capacity = capacity.max(MIN_RESPONSE_CAPACITY);
        self
    }

    pub fn response_capacity(&self) -> usize {
        self.response_capacity
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Registers `setpreference`, `getpreference` and `clearpreference`.
    pub fn register_commands(&self, registry: &mut CommandRegistry) {
        registry.add_command(
            CommandSpec::new("setP/ref/erence,setp")
                .description(SET_DESCRIPTION)
                .positional("namespace,ns")
                .positional("k/ey")
                .positional("t/ype")
                .positional("v/al/ue"),
        );
        registry.add_command(
            CommandSpec::new("getP/ref/erence,getp")
                .description(GET_DESCRIPTION)
                .positional("namespace,ns")
                .positional("k/ey")
                .positional_with_default("t/ype", ""),
        );
        registry.add_command(
            CommandSpec::new("clearP/ref/erence,clearp")
                .description(CLEAR_DESCRIPTION)
                .positional_with_default("namespace,ns", "")
                .positional_with_default("k/ey", ""),
        );
    }

    /// Runs a preference command and writes its response line to `out`.
    ///
    /// Returns `Ok(false)` without writing anything if the command is not a
    /// preference command.
    pub fn handle_command<W: Write + ?Sized>(
        &self,
        command: &ParsedCommand,
        out: &mut W,
    ) -> io::Result<bool> {
        match self.execute(command) {
            Some(line) => {
                out.write_all(line.as_bytes())?;
                out.write_all(b"\r\n")?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Runs a preference command and returns its response line.
    pub fn execute(&self, command: &ParsedCommand) -> Option<String> {
        let result = if command.name_equals("setp") {
            self.set_preference(command)
        } else if command.name_equals("getp") {
            self.get_preference(command)
        } else if command.name_equals("clearp") {
            self.clear_preference(command)
        } else {
            trace!(command = %command.name(), "Not a preference command");
            return None;
        };

        let mut response = ResponseBuffer::with_capacity(self.response_capacity);
        match result {
            Ok(line) => response.push_str(&line),
            Err(e) => {
                debug!(command = %command.name(), error = %e, "Preference command failed");
                response.push_str(&e.to_string());
            }
        }
        Some(response.into_string())
    }

    // ========================================================================
    // getpreference
    // ========================================================================

    /// getpreference namespace key [type]
    fn get_preference(&self, command: &ParsedCommand) -> Result<String, PreferenceError> {
        let namespace = command.value("namespace");
        let key = command.value("key");
        let type_name = command.value("type");

        let not_found = || PreferenceError::KeyNotFound {
            namespace: namespace.to_string(),
            key: key.to_string(),
        };

        let prefs = Preferences::begin(&*self.store, namespace, true).ok_or_else(not_found)?;
        if !prefs.is_key(key) {
            return Err(not_found());
        }

        let stored = prefs.get_type(key);
        if type_name.is_empty() {
            return Ok(match stored {
                PreferenceType::Blob => {
                    format!("{} ({} Bytes)", stored, prefs.get_bytes_length(key))
                }
                _ => stored.to_string(),
            });
        }

        let kind = PreferenceKind::from_name(type_name)
            .ok_or_else(|| PreferenceError::UnsupportedReadType(type_name.to_string()))?;
        if kind.category() != stored {
            return Err(PreferenceError::TypeMismatch {
                namespace: namespace.to_string(),
                key: key.to_string(),
                stored,
                requested: kind.category(),
            });
        }

        debug!(namespace = %namespace, key = %key, %kind, "Reading preference");
        self.read_value(&prefs, key, kind)?.ok_or_else(not_found)
    }

    /// Reads and formats a value already known to be of `kind`'s category.
    ///
    /// `Ok(None)` means the key vanished between the checks and the read.
    fn read_value(
        &self,
        prefs: &Preferences<'_, S>,
        key: &str,
        kind: PreferenceKind,
    ) -> Result<Option<String>, PreferenceError> {
        // Char and UChar print bytes above 0x7F as the Latin-1 character
        let text = match kind {
            PreferenceKind::Int8 => prefs.get_char(key).map(|v| v.to_string()),
            PreferenceKind::Char => prefs.get_char(key).map(|v| char::from(v as u8).to_string()),
            PreferenceKind::UInt8 => prefs.get_uchar(key).map(|v| v.to_string()),
            PreferenceKind::UChar => prefs.get_uchar(key).map(|v| char::from(v).to_string()),
            PreferenceKind::Bool => prefs
                .get_bool(key)
                .map(|v| if v { "TRUE" } else { "FALSE" }.to_string()),
            PreferenceKind::Int16 => prefs.get_short(key).map(|v| v.to_string()),
            PreferenceKind::UInt16 => prefs.get_ushort(key).map(|v| v.to_string()),
            PreferenceKind::Int32 => prefs.get_int(key).map(|v| v.to_string()),
            PreferenceKind::UInt32 => prefs.get_uint(key).map(|v| v.to_string()),
            PreferenceKind::Int64 => prefs.get_long64(key).map(|v| v.to_string()),
            PreferenceKind::UInt64 => prefs.get_ulong64(key).map(|v| v.to_string()),
            PreferenceKind::Float => {
                self.check_width(prefs, key, kind, 4)?;
                prefs.get_float(key).map(|v| format!("{:.6}", v))
            }
            PreferenceKind::Double => {
                self.check_width(prefs, key, kind, 8)?;
                prefs.get_double(key).map(|v| format!("{:.6}", v))
            }
            PreferenceKind::String => prefs.get_string(key),
            PreferenceKind::Bytes => {
                // Two hex digits per byte, leaving room for the terminator
                let max_bytes = self.response_capacity / 2 - 1;
                prefs
                    .get_bytes(key, max_bytes)
                    .map(|data| hex::encode(&data, max_bytes))
            }
        };
        Ok(text)
    }

    fn check_width(
        &self,
        prefs: &Preferences<'_, S>,
        key: &str,
        kind: PreferenceKind,
        width: usize,
    ) -> Result<(), PreferenceError> {
        let len = prefs.get_bytes_length(key);
        if len == width {
            Ok(())
        } else {
            Err(PreferenceError::WidthMismatch {
                namespace: prefs.namespace().to_string(),
                key: key.to_string(),
                len,
                requested: kind.to_string(),
            })
        }
    }

    // ========================================================================
    // setpreference
    // ========================================================================

    /// setpreference namespace key type value
    fn set_preference(&self, command: &ParsedCommand) -> Result<String, PreferenceError> {
        let namespace = command.value("namespace");
        let key = command.value("key");
        let type_name = command.value("type");
        let value = command.value("value");

        let prefs = Preferences::begin(&*self.store, namespace, false);

        let kind = PreferenceKind::from_name(type_name)
            .filter(|kind| kind.is_writable())
            .ok_or_else(|| PreferenceError::UnsupportedWriteType(type_name.to_string()))?;

        let written = match &prefs {
            Some(prefs) => write_value(prefs, key, kind, value),
            None => 0,
        };

        if written > 0 {
            debug!(namespace = %namespace, key = %key, %kind, written, "Preference written");
            Ok(format!(
                "'{}' stored as a {} ({} Bytes) in {}/{}",
                value, type_name, written, namespace, key
            ))
        } else {
            Err(PreferenceError::StoreFailed {
                value: value.to_string(),
                type_name: type_name.to_string(),
                namespace: namespace.to_string(),
                key: key.to_string(),
            })
        }
    }

    // ========================================================================
    // clearpreference
    // ========================================================================

    /// clearpreference [namespace] [key]
    fn clear_preference(&self, command: &ParsedCommand) -> Result<String, PreferenceError> {
        let namespace = command.value("namespace");
        let key = command.value("key");

        match (command.is_set("namespace"), command.is_set("key")) {
            (true, true) => {
                let prefs = Preferences::begin(&*self.store, namespace, false)
                    .ok_or_else(|| PreferenceError::OpenFailed(namespace.to_string()))?;

                if !prefs.is_key(key) {
                    return Ok(format!(
                        "'{}' was not a preference in namespace '{}'",
                        key, namespace
                    ));
                }
                if !prefs.remove(key) {
                    return Err(PreferenceError::RemoveFailed {
                        namespace: namespace.to_string(),
                        key: key.to_string(),
                    });
                }
                Ok(format!(
                    "'{}' has been cleared from namespace '{}'",
                    key, namespace
                ))
            }
            (true, false) => {
                let prefs = Preferences::begin(&*self.store, namespace, false)
                    .ok_or_else(|| PreferenceError::OpenFailed(namespace.to_string()))?;

                if !prefs.clear() {
                    return Err(PreferenceError::ClearFailed(namespace.to_string()));
                }
                Ok(format!("namespace '{}' has been cleared", namespace))
            }
            (false, true) => Err(PreferenceError::NamespaceRequired(key.to_string())),
            (false, false) => match self.flash.erase_and_init() {
                Ok(()) => Ok("All preferences have been cleared from the NVS flash".to_string()),
                Err(FlashError::Unsupported) => Err(PreferenceError::EraseUnsupported),
                Err(e) => Err(PreferenceError::EraseFailed(e.to_string())),
            },
        }
    }
}

/// Converts `value` for `kind` and writes it, returning the bytes written.
///
/// Integers are narrowed to the declared width without a range check.
fn write_value<S: PreferenceStore + ?Sized>(
    prefs: &Preferences<'_, S>,
    key: &str,
    kind: PreferenceKind,
    value: &str,
) -> usize {
    let first_byte = value.bytes().next().unwrap_or(0);

    match kind {
        PreferenceKind::Int8 => prefs.put_char(key, parse_integer(value) as i8),
        PreferenceKind::Char => prefs.put_char(key, first_byte as i8),
        PreferenceKind::UInt8 => prefs.put_uchar(key, parse_integer(value) as u8),
        PreferenceKind::UChar => prefs.put_uchar(key, first_byte),
        PreferenceKind::Bool => {
            let truthy = parse_integer(value) != 0 || first_byte.eq_ignore_ascii_case(&b't');
            prefs.put_bool(key, truthy)
        }
        PreferenceKind::Int16 => prefs.put_short(key, parse_integer(value) as i16),
        PreferenceKind::UInt16 => prefs.put_ushort(key, parse_integer(value) as u16),
        PreferenceKind::Int32 => prefs.put_int(key, parse_integer(value) as i32),
        PreferenceKind::UInt32 => prefs.put_uint(key, parse_integer(value) as u32),
        PreferenceKind::Int64 => prefs.put_long64(key, parse_integer(value)),
        PreferenceKind::UInt64 => prefs.put_ulong64(key, parse_integer(value) as u64),
        PreferenceKind::Float => prefs.put_float(key, parse_float(value) as f32),
        PreferenceKind::Double => prefs.put_double(key, parse_float(value)),
        PreferenceKind::Bytes => prefs.put_bytes(key, &hex::decode(value)),
        PreferenceKind::String => prefs.put_string(key, value),
    }
}
