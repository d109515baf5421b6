//! Destinations for child process output

use std::borrow::Cow;

use crate::command::MASK;

/// Receives the output of an external command, one line at a time
///
/// Lines arrive without their trailing newline. Implementations are called
/// from two concurrent reader tasks.
pub trait OutputSink: Send + Sync {
    /// A line read from standard output
    fn stdout_line(&self, line: &str);

    /// A line read from standard error
    fn stderr_line(&self, line: &str);
}

/// Forwards stdout to `info` and stderr to `error` tracing events
#[derive(Debug, Clone, Default)]
pub struct TracingSink {
    redactor: Redactor,
}

impl TracingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Also scrub these values from every line, whatever command produced it
    pub fn with_secrets<I, S>(secrets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            redactor: Redactor::new(secrets),
        }
    }
}

impl OutputSink for TracingSink {
    fn stdout_line(&self, line: &str) {
        tracing::info!(target: "chartsmith::helm", "{}", self.redactor.redact(line));
    }

    fn stderr_line(&self, line: &str) {
        tracing::error!(target: "chartsmith::helm", "{}", self.redactor.redact(line));
    }
}

/// Replaces known secret values in free text with [`MASK`]
#[derive(Debug, Clone, Default)]
pub struct Redactor {
    secrets: Vec<String>,
}

impl Redactor {
    pub fn new<I, S>(secrets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut secrets: Vec<String> = secrets
            .into_iter()
            .map(Into::into)
            .filter(|s| !s.is_empty())
            .collect();
        // longest first so a secret containing another is masked whole
        secrets.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        secrets.dedup();
        Self { secrets }
    }

    pub fn is_empty(&self) -> bool {
        self.secrets.is_empty()
    }

    pub fn redact<'a>(&self, line: &'a str) -> Cow<'a, str> {
        let mut out = Cow::Borrowed(line);
        for secret in &self.secrets {
            if out.contains(secret.as_str()) {
                out = Cow::Owned(out.replace(secret.as_str(), MASK));
            }
        }
        out
    }
}
