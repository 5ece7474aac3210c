//! Command Grammar Types
//!
//! Commands and their arguments are named by *patterns*. A pattern is a list
//! of comma-separated alternatives; each alternative is split by `/` into a
//! required stem followed by optional segments that may only be added in
//! order.
//!
//! ## Examples
//!
//! ```text
//! "setP/ref/erence,setp"  accepts  setp, setpref, setpreference
//! "k/ey"                  accepts  k, key
//! "namespace,ns"          accepts  namespace, ns
//! "v/al/ue"               accepts  v, val, value
//! ```
//!
//! Matching is case-insensitive unless the command is marked case-sensitive.

use std::fmt;

/// A name with abbreviations and aliases.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamePattern {
    /// Each alternative as its list of segments
    alternatives: Vec<Vec<String>>,
}

impl NamePattern {
    /// Parses a pattern such as `"getP/ref/erence,getp"`.
    pub fn parse(pattern: &str) -> Self {
        let alternatives = pattern
            .split(',')
            .map(str::trim)
            .filter(|alt| !alt.is_empty())
            .map(|alt| alt.split('/').map(str::to_string).collect())
            .collect();
        Self { alternatives }
    }

    /// The full spelling of the first alternative.
    pub fn primary(&self) -> String {
        self.alternatives
            .first()
            .map(|segments| segments.concat())
            .unwrap_or_default()
    }

    /// Every spelling this pattern accepts, shortest first per alternative.
    pub fn spellings(&self) -> Vec<String> {
        let mut spellings = Vec::new();
        for segments in &self.alternatives {
            let mut spelling = String::new();
            for segment in segments {
                spelling.push_str(segment);
                spellings.push(spelling.clone());
            }
        }
        spellings
    }

    /// Checks whether `name` is an accepted spelling.
    pub fn matches(&self, name: &str, case_sensitive: bool) -> bool {
        self.spellings().iter().any(|spelling| {
            if case_sensitive {
                spelling == name
            } else {
                spelling.eq_ignore_ascii_case(name)
            }
        })
    }
}

impl fmt::Display for NamePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let alternatives: Vec<String> = self
            .alternatives
            .iter()
            .map(|segments| segments.concat())
            .collect();
        f.write_str(&alternatives.join(", "))
    }
}

/// A positional argument of a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgumentSpec {
    pub pattern: NamePattern,
    /// Value used when the argument is not given; `None` makes it required
    pub default: Option<String>,
}

impl ArgumentSpec {
    pub fn is_required(&self) -> bool {
        self.default.is_none()
    }
}

/// A registered command: its name, help text and positional arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub pattern: NamePattern,
    pub description: String,
    pub arguments: Vec<ArgumentSpec>,
    pub case_sensitive: bool,
}

impl CommandSpec {
    /// Starts a command definition from its name pattern.
    pub fn new(pattern: &str) -> Self {
        Self {
            pattern: NamePattern::parse(pattern),
            description: String::new(),
            arguments: Vec::new(),
            case_sensitive: false,
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Adds a required positional argument.
    pub fn positional(mut self, pattern: &str) -> Self {
        self.arguments.push(ArgumentSpec {
            pattern: NamePattern::parse(pattern),
            default: None,
        });
        self
    }

    /// Adds an optional positional argument with a default value.
    pub fn positional_with_default(mut self, pattern: &str, default: &str) -> Self {
        self.arguments.push(ArgumentSpec {
            pattern: NamePattern::parse(pattern),
            default: Some(default.to_string()),
        });
        self
    }

    pub fn case_sensitive(mut self, case_sensitive: bool) -> Self {
        self.case_sensitive = case_sensitive;
        self
    }

    /// The command's full name.
    pub fn name(&self) -> String {
        self.pattern.primary()
    }

    /// Finds the index of the argument `name` refers to.
    pub fn argument_index(&self, name: &str) -> Option<usize> {
        self.arguments
            .iter()
            .position(|arg| arg.pattern.matches(name, self.case_sensitive))
    }

    /// Renders the usage line, e.g. `getPreference <namespace> <key> [type]`.
    pub fn usage(&self) -> String {
        let mut usage = self.name();
        for arg in &self.arguments {
            let name = arg.pattern.primary();
            if arg.is_required() {
                usage.push_str(&format!(" <{}>", name));
            } else {
                usage.push_str(&format!(" [{}]", name));
            }
        }
        usage
    }
}

/// One argument of a parsed command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Argument {
    /// The argument's full name
    pub name: String,
    pub value: String,
    /// Whether the value came from the input rather than the default
    pub is_set: bool,
}

/// A command line matched against a registered command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCommand {
    spec: CommandSpec,
    /// The spelling typed by the user
    typed_name: String,
    args: Vec<Argument>,
}

impl ParsedCommand {
    pub(crate) fn new(spec: CommandSpec, typed_name: String, args: Vec<Argument>) -> Self {
        Self {
            spec,
            typed_name,
            args,
        }
    }

    /// The command's full registered name.
    pub fn name(&self) -> String {
        self.spec.name()
    }

    /// The spelling the command was invoked with.
    pub fn typed_name(&self) -> &str {
        &self.typed_name
    }

    pub fn is_case_sensitive(&self) -> bool {
        self.spec.case_sensitive
    }

    /// Checks whether `spelling` names this command, honouring the
    /// command's case sensitivity.
    pub fn name_equals(&self, spelling: &str) -> bool {
        self.spec.pattern.matches(spelling, self.spec.case_sensitive)
    }

    /// Looks up an argument by any accepted spelling of its name.
    pub fn arg(&self, name: &str) -> Option<&Argument> {
        self.spec.argument_index(name).map(|i| &self.args[i])
    }

    /// Returns the argument's value, or `""` if the command has no such argument.
    pub fn value(&self, name: &str) -> &str {
        self.arg(name).map(|arg| arg.value.as_str()).unwrap_or("")
    }

    /// Returns whether the argument was given explicitly.
    pub fn is_set(&self, name: &str) -> bool {
        self.arg(name).map(|arg| arg.is_set).unwrap_or(false)
    }

    pub fn args(&self) -> &[Argument] {
        &self.args
    }
}
