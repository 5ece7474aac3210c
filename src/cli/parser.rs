//! Command Line Tokenizer and Registry
//!
//! This module turns one line of shell input into a [`ParsedCommand`].
//!
//! ## How a Line is Parsed
//!
//! 1. The line is split into tokens on whitespace. Double quotes group text
//!    (so `""` is an empty token) and `\"` / `\\` escape inside quotes.
//! 2. The first token selects a registered command by name pattern.
//! 3. `-name value` pairs bind arguments by name. A leading `-` followed by
//!    a digit or `.` is a negative number, not an argument name.
//! 4. The remaining tokens fill the unbound arguments in order.
//! 5. Unfilled arguments take their default, or fail if they have none.
//!
//! ```text
//! setp -t Int32 myns mykey -v 42
//!        │        │     │      │
//!        │        ▼     ▼      │
//!        │   namespace  key    │
//!        ▼                     ▼
//!      type                  value
//! ```

use crate::cli::types::{Argument, CommandSpec, ParsedCommand};
use thiserror::Error;
use tracing::{trace, warn};

/// Errors that can occur while parsing a command line.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// The line held no tokens
    #[error("empty input")]
    EmptyInput,

    /// No registered command matches the first token
    #[error("unknown command '{0}'")]
    UnknownCommand(String),

    /// `-name` does not name an argument of the command
    #[error("unknown argument '-{argument}' for command '{command}'")]
    UnknownArgument { command: String, argument: String },

    /// A required argument was not given
    #[error("missing argument '{argument}' for command '{command}'")]
    MissingArgument { command: String, argument: String },

    /// More positional values than the command has arguments
    #[error("too many arguments for command '{command}' (unexpected '{token}')")]
    TooManyArguments { command: String, token: String },

    /// `-name` was the last token
    #[error("argument '-{argument}' for command '{command}' has no value")]
    MissingValue { command: String, argument: String },

    /// A double quote was opened but never closed
    #[error("unterminated quote")]
    UnterminatedQuote,
}

/// Result type for parsing operations.
pub type ParseResult<T> = Result<T, ParseError>;

/// A token of a command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub text: String,
    /// Quoted tokens are always values, never argument names
    pub quoted: bool,
}

impl Token {
    /// Returns the argument name if this token is a `-name` flag.
    fn flag_name(&self) -> Option<&str> {
        if self.quoted {
            return None;
        }
        let name = self.text.strip_prefix('-')?;
        match name.chars().next() {
            Some(c) if c.is_ascii_digit() || c == '.' => None,
            Some(_) => Some(name),
            None => None,
        }
    }
}

/// Splits a command line into tokens.
pub fn tokenize(line: &str) -> ParseResult<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = line.chars().peekable();

    loop {
        while chars.peek().is_some_and(|c| c.is_whitespace()) {
            chars.next();
        }

        let Some(&first) = chars.peek() else {
            break;
        };

        let mut text = String::new();
        let quoted = first == '"';

        if quoted {
            chars.next();
            let mut closed = false;
            while let Some(c) = chars.next() {
                match c {
                    '"' => {
                        closed = true;
                        break;
                    }
                    '\\' => match chars.next() {
                        Some(escaped @ ('"' | '\\')) => text.push(escaped),
                        Some(other) => {
                            text.push('\\');
                            text.push(other);
                        }
                        None => text.push('\\'),
                    },
                    _ => text.push(c),
                }
            }
            if !closed {
                return Err(ParseError::UnterminatedQuote);
            }
        } else {
            while let Some(&c) = chars.peek() {
                if c.is_whitespace() {
                    break;
                }
                text.push(c);
                chars.next();
            }
        }

        tokens.push(Token { text, quoted });
    }

    Ok(tokens)
}

/// The table of registered commands.
///
/// # Example
///
/// ```
/// use prefcli::cli::{CommandRegistry, CommandSpec};
///
/// let mut registry = CommandRegistry::new();
/// registry.add_command(
///     CommandSpec::new("getP/ref/erence,getp")
///         .positional("namespace,ns")
///         .positional("k/ey")
///         .positional_with_default("t/ype", ""),
/// );
///
/// let command = registry.parse("getp wifi ssid").unwrap();
/// assert_eq!(command.value("namespace"), "wifi");
/// assert_eq!(command.value("key"), "ssid");
/// assert!(!command.is_set("type"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct CommandRegistry {
    commands: Vec<CommandSpec>,
}

impl CommandRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a command. A command with the same full name is replaced.
    pub fn add_command(&mut self, spec: CommandSpec) {
        let name = spec.name();
        if let Some(existing) = self.commands.iter_mut().find(|c| c.name() == name) {
            warn!(command = %name, "Replacing registered command");
            *existing = spec;
        } else {
            trace!(command = %name, "Command registered");
            self.commands.push(spec);
        }
    }

    /// The registered commands, in registration order.
    pub fn commands(&self) -> &[CommandSpec] {
        &self.commands
    }

    /// Finds the command `name` refers to.
    pub fn find(&self, name: &str) -> Option<&CommandSpec> {
        self.commands
            .iter()
            .find(|spec| spec.pattern.matches(name, spec.case_sensitive))
    }

    /// Parses a command line against the registered commands.
    pub fn parse(&self, line: &str) -> ParseResult<ParsedCommand> {
        let tokens = tokenize(line)?;
        let (first, rest) = tokens.split_first().ok_or(ParseError::EmptyInput)?;

        let spec = self
            .find(&first.text)
            .ok_or_else(|| ParseError::UnknownCommand(first.text.clone()))?;
        let command = spec.name();

        let mut values: Vec<Option<String>> = vec![None; spec.arguments.len()];
        let mut positional = Vec::new();

        let mut iter = rest.iter();
        while let Some(token) = iter.next() {
            let Some(name) = token.flag_name() else {
                positional.push(token);
                continue;
            };

            let index = spec
                .argument_index(name)
                .ok_or_else(|| ParseError::UnknownArgument {
                    command: command.clone(),
                    argument: name.to_string(),
                })?;
            let value = iter.next().ok_or_else(|| ParseError::MissingValue {
                command: command.clone(),
                argument: name.to_string(),
            })?;
            values[index] = Some(value.text.clone());
        }

        let mut positional = positional.into_iter();
        for slot in values.iter_mut().filter(|slot| slot.is_none()) {
            match positional.next() {
                Some(token) => *slot = Some(token.text.clone()),
                None => break,
            }
        }
        if let Some(extra) = positional.next() {
            return Err(ParseError::TooManyArguments {
                command,
                token: extra.text.clone(),
            });
        }

        let mut args = Vec::with_capacity(values.len());
        for (arg_spec, value) in spec.arguments.iter().zip(values) {
            let name = arg_spec.pattern.primary();
            let arg = match (value, &arg_spec.default) {
                (Some(value), _) => Argument {
                    name,
                    value,
                    is_set: true,
                },
                (None, Some(default)) => Argument {
                    name,
                    value: default.clone(),
                    is_set: false,
                },
                (None, None) => {
                    return Err(ParseError::MissingArgument {
                        command,
                        argument: name,
                    })
                }
            };
            args.push(arg);
        }

        trace!(command = %command, args = args.len(), "Parsed command line");
        Ok(ParsedCommand::new(spec.clone(), first.text.clone(), args))
    }

    /// Renders the help text for every registered command.
    pub fn help(&self) -> String {
        let mut help = String::new();
        for spec in &self.commands {
            help.push_str(&spec.usage());
            help.push_str("\r\n");
            if !spec.description.is_empty() {
                help.push('\t');
                help.push_str(&spec.description);
                help.push_str("\r\n");
            }
        }
        help
    }
}
