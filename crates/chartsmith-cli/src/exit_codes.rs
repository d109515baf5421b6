//! Standard exit codes for CLI operations
//!
//! These exit codes follow Unix conventions and sysexits.h where applicable.

/// Configuration error - missing or invalid settings
pub const CONFIG_ERROR: i32 = 2;

/// Scan error - the chart tree could not be walked
pub const SCAN_ERROR: i32 = 3;

/// Chart error - Chart.yaml could not be parsed
pub const CHART_ERROR: i32 = 4;

/// IO error - file not found, permission denied, etc.
pub const IO_ERROR: i32 = 5;

/// Execution error - helm could not be started or exited non-zero
pub const EXEC_ERROR: i32 = 6;

/// Usage error - invalid arguments or options (following sysexits.h convention)
pub const USAGE_ERROR: i32 = 64;
