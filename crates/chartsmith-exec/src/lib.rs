//! Chartsmith Exec - running the external packaging tool
//!
//! - [`Command`]: executable, positional arguments and ordered flags, with
//!   sensitive flags masked in every human-facing rendering
//! - [`CommandRunner`]: spawns the process, drains stdout/stderr concurrently
//!   and maps the exit status to a `Result`
//! - [`Credentials`]: explicit per-command registry credentials
//!
//! ```rust,no_run
//! use chartsmith_exec::{Command, CommandRunner};
//!
//! # async fn example() -> chartsmith_exec::Result<()> {
//! let cmd = Command::new("helm")
//!     .arg("lint")
//!     .arg("charts/app")
//!     .flag("strict");
//!
//! CommandRunner::new().execute(&cmd, "Failed to lint chart").await?;
//! # Ok(())
//! # }
//! ```

pub mod command;
pub mod credentials;
pub mod error;
pub mod runner;
pub mod sink;

pub use command::{Command, MASK};
pub use credentials::{Credentials, ResolvedCredentials};
pub use error::{ExecError, Result};
pub use runner::CommandRunner;
pub use sink::{OutputSink, Redactor, TracingSink};
