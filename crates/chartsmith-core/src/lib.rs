//! Chartsmith Core - chart discovery and dependency overrides
//!
//! This crate provides the filesystem side of Chartsmith:
//! - `scan`: find chart directories below a root, children before parents
//! - `ChartDescriptor`: the parts of Chart.yaml Chartsmith cares about
//! - `rewrite`: redirect `file://` dependencies to a registry without
//!   touching the rest of Chart.yaml

pub mod descriptor;
pub mod error;
pub mod rewrite;
pub mod scanner;

pub use descriptor::{
    ChartDescriptor, DependencyEntry, LoadedChart, DESCRIPTOR_FILE, LOCAL_SCHEME, LOCK_FILE,
};
pub use error::{CoreError, Result};
pub use rewrite::{patch_dependencies, rewrite, rewrite_to, DependencyOverride, RewriteOutcome};
pub use scanner::{scan, ChartDir, ExclusionSet, DEFAULT_EXCLUDES};
