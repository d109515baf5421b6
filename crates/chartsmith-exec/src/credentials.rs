//! Registry credentials threaded into commands
//!
//! Credentials are resolved per invocation and attached to a single
//! [`Command`] as sensitive flags (or sensitive stdin). Nothing is stored in
//! process-wide state, so concurrent commands never see each other's secrets.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::command::{Command, MASK};
use crate::error::{ExecError, Result};

/// Credential types supported
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Credentials {
    /// Basic authentication (username/password)
    Basic { username: String, password: String },

    /// Bearer token, passed where the tool expects a password
    Bearer { token: String },

    /// Environment variable references (CI/CD friendly)
    #[serde(rename_all = "camelCase")]
    Env {
        username_var: String,
        password_var: String,
    },
}

impl Credentials {
    /// Create basic auth credentials
    pub fn basic(username: impl Into<String>, password: impl Into<String>) -> Self {
        Credentials::Basic {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Create bearer token credentials
    pub fn bearer(token: impl Into<String>) -> Self {
        Credentials::Bearer {
            token: token.into(),
        }
    }

    /// Create environment variable credentials
    pub fn from_env(username_var: impl Into<String>, password_var: impl Into<String>) -> Self {
        Credentials::Env {
            username_var: username_var.into(),
            password_var: password_var.into(),
        }
    }

    /// Resolve credentials to actual values
    pub fn resolve(&self) -> Result<ResolvedCredentials> {
        match self {
            Credentials::Basic { username, password } => Ok(ResolvedCredentials {
                username: Some(username.clone()),
                secret: password.clone(),
            }),
            Credentials::Bearer { token } => Ok(ResolvedCredentials {
                username: None,
                secret: token.clone(),
            }),
            Credentials::Env {
                username_var,
                password_var,
            } => {
                let username = std::env::var(username_var).map_err(|_| ExecError::Credentials {
                    message: format!("Environment variable {} not set", username_var),
                })?;
                let secret = std::env::var(password_var).map_err(|_| ExecError::Credentials {
                    message: format!("Environment variable {} not set", password_var),
                })?;
                Ok(ResolvedCredentials {
                    username: Some(username),
                    secret,
                })
            }
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credentials::Basic { username, .. } => f
                .debug_struct("Basic")
                .field("username", username)
                .field("password", &MASK)
                .finish(),
            Credentials::Bearer { .. } => f.debug_struct("Bearer").field("token", &MASK).finish(),
            Credentials::Env {
                username_var,
                password_var,
            } => f
                .debug_struct("Env")
                .field("username_var", username_var)
                .field("password_var", password_var)
                .finish(),
        }
    }
}

/// Resolved credentials ready to attach to a command
#[derive(Clone)]
pub struct ResolvedCredentials {
    username: Option<String>,
    secret: String,
}

impl ResolvedCredentials {
    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    /// Attach as `--username <user> --password <secret>`, secret masked in logs
    pub fn apply(&self, cmd: Command) -> Command {
        cmd.flag_opt("username", self.username.as_deref())
            .secret_flag("password", self.secret.as_str())
    }

    /// Attach as `--username <user> --password-stdin`, secret written to stdin
    pub fn apply_stdin(&self, cmd: Command) -> Command {
        cmd.flag_opt("username", self.username.as_deref())
            .flag("password-stdin")
            .secret_stdin(format!("{}\n", self.secret))
    }
}

impl fmt::Debug for ResolvedCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedCredentials")
            .field("username", &self.username)
            .field("secret", &MASK)
            .finish()
    }
}
