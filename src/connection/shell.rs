//! Command Shell
//!
//! Turns one line of input into the bytes written back: blank lines produce
//! nothing, parse failures produce an `ERROR:` line, `help` lists the
//! registered commands, and everything else goes to the preference commands.

use crate::cli::{CommandRegistry, CommandSpec, ParseError};
use crate::commands::PreferencesCli;
use crate::storage::{PreferenceStore, StorageEngine};
use std::io::{self, Write};
use std::sync::Arc;
use tracing::{debug, warn};

/// A command registry paired with the handlers for its commands.
pub struct Shell<S: PreferenceStore + ?Sized = StorageEngine> {
    registry: Arc<CommandRegistry>,
    cli: PreferencesCli<S>,
}

impl<S: PreferenceStore + ?Sized> Clone for Shell<S> {
    fn clone(&self) -> Self {
        Self {
            registry: Arc::clone(&self.registry),
            cli: self.cli.clone(),
        }
    }
}

impl<S: PreferenceStore + ?Sized> Shell<S> {
    /// Builds a shell serving `cli`'s commands plus `help`.
    pub fn new(cli: PreferencesCli<S>) -> Self {
        let mut registry = CommandRegistry::new();
        registry.add_command(
            CommandSpec::new("help,?").description("Lists the available commands"),
        );
        cli.register_commands(&mut registry);

        Self {
            registry: Arc::new(registry),
            cli,
        }
    }

    pub fn registry(&self) -> &CommandRegistry {
        &self.registry
    }

    pub fn cli(&self) -> &PreferencesCli<S> {
        &self.cli
    }

    /// Executes one input line, writing any response to `out`.
    ///
    /// Returns `false` for blank lines, which are ignored.
    pub fn execute_line<W: Write + ?Sized>(&self, line: &str, out: &mut W) -> io::Result<bool> {
        let command = match self.registry.parse(line) {
            Ok(command) => command,
            Err(ParseError::EmptyInput) => return Ok(false),
            Err(e) => {
                debug!(error = %e, "Rejected input line");
                write!(out, "ERROR: {}\r\n", e)?;
                return Ok(true);
            }
        };

        if command.name_equals("help") {
            out.write_all(self.registry.help().as_bytes())?;
            return Ok(true);
        }

        if !self.cli.handle_command(&command, out)? {
            warn!(command = %command.name(), "No handler for registered command");
            write!(out, "ERROR: no handler for command '{}'\r\n", command.name())?;
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Unsupported;

    fn shell() -> Shell {
        let cli = PreferencesCli::new(Arc::new(StorageEngine::new()), Arc::new(Unsupported));
        Shell::new(cli)
    }

    fn run(shell: &Shell, line: &str) -> String {
        let mut out = Vec::new();
        shell.execute_line(line, &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_blank_lines_are_ignored() {
        let shell = shell();
        let mut out = Vec::new();
        assert!(!shell.execute_line("", &mut out).unwrap());
        assert!(!shell.execute_line("   \t", &mut out).unwrap());
        assert!(out.is_empty());
    }

    #[test]
    fn test_preference_commands() {
        let shell = shell();
        assert_eq!(
            run(&shell, "setp wifi ssid String home"),
            "'home' stored as a String (4 Bytes) in wifi/ssid\r\n"
        );
        assert_eq!(run(&shell, "getpref -k ssid -ns wifi"), "String\r\n");
    }

    #[test]
    fn test_parse_errors() {
        let shell = shell();
        assert_eq!(run(&shell, "frobnicate"), "ERROR: unknown command 'frobnicate'\r\n");
        assert_eq!(
            run(&shell, "getp wifi"),
            "ERROR: missing argument 'key' for command 'getPreference'\r\n"
        );
        assert_eq!(run(&shell, "setp \"open"), "ERROR: unterminated quote\r\n");
    }

    #[test]
    fn test_help_lists_commands() {
        let shell = shell();
        let help = run(&shell, "help");

        assert!(help.starts_with("help\r\n\tLists the available commands\r\n"));
        assert!(help.contains("setPreference <namespace> <key> <type> <value>"));
        assert!(help.contains("getPreference <namespace> <key> [type]"));
        assert!(help.contains("clearPreference [namespace] [key]"));
        assert!(help.ends_with("\r\n"));
        assert_eq!(run(&shell, "?"), help);
    }

    #[test]
    fn test_clones_share_state() {
        let first = shell();
        let second = first.clone();

        run(&first, "setp ns k Int8 7");
        assert_eq!(run(&second, "getp ns k Int8"), "7\r\n");
    }
}
