//! Command model and argument rendering
//!
//! A [`Command`] is an executable plus positional arguments and an ordered set
//! of `--flag value` pairs. Flags can be registered as sensitive; their values
//! are replaced by [`MASK`] in every rendering meant for humans.

use indexmap::IndexMap;
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};

/// Replacement text for sensitive values
pub const MASK: &str = "*****";

/// An external command invocation
#[derive(Clone, Default)]
pub struct Command {
    executable: PathBuf,
    arguments: Vec<String>,
    flags: IndexMap<String, Vec<Option<String>>>,
    sensitive: HashSet<String>,
    stdin: Option<String>,
    stdin_sensitive: bool,
}

impl Command {
    /// Create a command for `executable` with no arguments
    pub fn new(executable: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
            ..Default::default()
        }
    }

    /// Append a positional argument
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.arguments.push(arg.into());
        self
    }

    /// Append several positional arguments
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.arguments.extend(args.into_iter().map(Into::into));
        self
    }

    /// Add a flag without a value (`--name`)
    pub fn flag(mut self, name: impl Into<String>) -> Self {
        self.flags.entry(name.into()).or_default();
        self
    }

    /// Add a flag occurrence with a value (`--name value`)
    ///
    /// Repeated calls with the same name render one occurrence per value.
    pub fn flag_value(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.flags
            .entry(name.into())
            .or_default()
            .push(Some(value.into()));
        self
    }

    /// Add `--name value` only when a value is present
    pub fn flag_opt(self, name: impl Into<String>, value: Option<impl Into<String>>) -> Self {
        match value {
            Some(v) => self.flag_value(name, v),
            None => self,
        }
    }

    /// Add a flag whose value must never be logged
    pub fn secret_flag(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        self.sensitive.insert(name.clone());
        self.flag_value(name, value)
    }

    /// Mark an existing or future flag name as sensitive
    pub fn mark_sensitive(mut self, name: impl Into<String>) -> Self {
        self.sensitive.insert(name.into());
        self
    }

    /// Text written to the process's standard input
    pub fn stdin(mut self, input: impl Into<String>) -> Self {
        self.stdin = Some(input.into());
        self
    }

    /// Standard input that is itself a secret (e.g. `--password-stdin`)
    pub fn secret_stdin(mut self, input: impl Into<String>) -> Self {
        self.stdin_sensitive = true;
        self.stdin(input)
    }

    pub fn executable(&self) -> &Path {
        &self.executable
    }

    pub fn arguments(&self) -> &[String] {
        &self.arguments
    }

    pub fn stdin_input(&self) -> Option<&str> {
        self.stdin.as_deref()
    }

    pub fn is_sensitive(&self, flag: &str) -> bool {
        self.sensitive.contains(flag)
    }

    /// Argument vector handed to the process (real values)
    pub fn render(&self) -> Vec<String> {
        self.render_with(|_, value| value.to_string())
    }

    /// Argument vector safe for logs (sensitive values masked)
    pub fn render_masked(&self) -> Vec<String> {
        self.render_with(|name, value| {
            if self.is_sensitive(name) {
                MASK.to_string()
            } else {
                value.to_string()
            }
        })
    }

    /// Every secret value carried by this command, for output scrubbing
    pub fn secrets(&self) -> Vec<&str> {
        let flag_secrets = self
            .flags
            .iter()
            .filter(|(name, _)| self.is_sensitive(name))
            .flat_map(|(_, values)| values.iter().flatten())
            .map(String::as_str);

        let stdin_secret = self
            .stdin
            .as_deref()
            .filter(|_| self.stdin_sensitive)
            .map(str::trim_end);

        flag_secrets
            .chain(stdin_secret)
            .filter(|s| !s.is_empty())
            .collect()
    }

    fn render_with<F>(&self, value_for: F) -> Vec<String>
    where
        F: Fn(&str, &str) -> String,
    {
        let mut rendered = self.arguments.clone();

        for (name, values) in &self.flags {
            let flag = flag_name(name);
            if values.is_empty() {
                rendered.push(flag);
                continue;
            }
            for value in values {
                rendered.push(flag.clone());
                if let Some(value) = value {
                    rendered.push(value_for(name, value));
                }
            }
        }

        rendered
    }
}

/// `name` becomes `--name`; names already carrying dashes are kept
fn flag_name(name: &str) -> String {
    if name.starts_with('-') {
        name.to_string()
    } else {
        format!("--{}", name)
    }
}

/// Masked, shell-like rendering: `helm push chart.tgz --password *****`
impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.executable.display())?;
        for arg in self.render_masked() {
            if arg.is_empty() || arg.contains(char::is_whitespace) {
                write!(f, " '{}'", arg)?;
            } else {
                write!(f, " {}", arg)?;
            }
        }
        Ok(())
    }
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("executable", &self.executable)
            .field("args", &self.render_masked())
            .field(
                "stdin",
                &self.stdin.as_ref().map(|s| {
                    if self.stdin_sensitive {
                        MASK.to_string()
                    } else {
                        s.clone()
                    }
                }),
            )
            .finish()
    }
}
