//! Command Line Layer
//!
//! This module provides the command shell grammar: commands are registered
//! with a name pattern, a description and positional arguments, and each line
//! of input is tokenized and matched against them.
//!
//! ## Modules
//!
//! - `types`: Name patterns, command/argument specs and parsed commands
//! - `parser`: Tokenizer, command registry and parse errors
//!
//! ## Example
//!
//! ```
//! use prefcli::cli::{CommandRegistry, CommandSpec};
//!
//! let mut registry = CommandRegistry::new();
//! registry.add_command(
//!     CommandSpec::new("clearP/ref/erence,clearp")
//!         .positional_with_default("namespace,ns", "")
//!         .positional_with_default("k/ey", ""),
//! );
//!
//! let command = registry.parse("clearpref -k boot").unwrap();
//! assert!(command.name_equals("clearp"));
//! assert!(command.is_set("key"));
//! assert!(!command.is_set("namespace"));
//! ```

pub mod parser;
pub mod types;

// Re-export commonly used types for convenience
pub use parser::{tokenize, CommandRegistry, ParseError, ParseResult, Token};
pub use types::{Argument, ArgumentSpec, CommandSpec, NamePattern, ParsedCommand};
