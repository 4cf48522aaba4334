//! Error types for the telemetry core.
//!
//! All errors implement `std::error::Error` and carry enough structured context
//! to decide whether a retry makes sense.
//!
//! ## Error Categories
//!
//! - **Connection Errors**: a step of `connect()` failed (mapping, view or event)
//! - **Memory Errors**: an offset or length fell outside the mapped view or a row
//! - **Parse Errors**: the header or variable directory is malformed
//! - **Schema Misses**: a variable name is not present in the directory
//! - **Type Conversion Errors**: a checked read asked for the wrong scalar kind
//! - **Query Errors**: a session-text path query failed (see [`QueryError`])
//! - **Windows API Errors**: platform-specific failures
//!
//! Torn reads and tick discontinuities are not errors: they surface as
//! [`PollOutcome::NoNewData`](crate::PollOutcome::NoNewData).
//!
//! ```rust
//! use ira_telemetry::TelemetryError;
//!
//! let error = TelemetryError::connection_failed("simulator not running");
//! if error.is_retryable() {
//!     for suggestion in error.recovery_suggestions() {
//!         println!("  - {}", suggestion);
//!     }
//! }
//! ```

use thiserror::Error;

use crate::session::QueryError;

#[cfg(windows)]
use windows_core as core;

/// Result type alias for telemetry operations.
pub type Result<T, E = TelemetryError> = std::result::Result<T, E>;

/// Main error type for telemetry operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum TelemetryError {
    #[error("Failed to connect to the simulator: {reason}")]
    Connection {
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("SDK version mismatch: expected {expected}, found {found}")]
    Version { expected: u32, found: u32 },

    #[error("Memory access violation at offset {offset:#x}")]
    Memory {
        offset: usize,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Parse error in {context}: {details}")]
    Parse { context: String, details: String },

    #[error("Field '{field}' not found in telemetry data")]
    FieldNotFound { field: String },

    #[error("Type conversion error: {details}")]
    TypeConversion { details: String },

    #[error("{feature} is only available on {required_platform}")]
    UnsupportedPlatform { feature: String, required_platform: String },

    #[error("Windows API error: {operation}")]
    #[cfg(windows)]
    WindowsApi {
        operation: String,
        #[source]
        source: core::Error,
    },

    #[error(transparent)]
    Query(#[from] QueryError),
}

impl TelemetryError {
    /// Returns whether this error is potentially recoverable through retry.
    pub fn is_retryable(&self) -> bool {
        match self {
            TelemetryError::Connection { .. } => true,
            TelemetryError::Memory { .. } => false,
            TelemetryError::Version { .. } => false,
            TelemetryError::Parse { .. } => false,
            TelemetryError::FieldNotFound { .. } => false,
            TelemetryError::TypeConversion { .. } => false,
            TelemetryError::UnsupportedPlatform { .. } => false,
            #[cfg(windows)]
            TelemetryError::WindowsApi { .. } => true,
            // Session text is rewritten by the simulator; the path may resolve later.
            TelemetryError::Query(err) => matches!(err, QueryError::NotFound { .. }),
        }
    }

    /// Returns suggested recovery actions for this error.
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            TelemetryError::Connection { .. } => vec![
                "Ensure the simulator is running",
                "Check Windows permissions for shared memory access",
                "Retry connect() on the next wait cycle",
            ],
            TelemetryError::Memory { .. } => vec![
                "Check offsets against the current variable directory",
                "Reload the directory after reconnecting",
                "Verify the snapshot row length matches the directory",
            ],
            TelemetryError::Version { .. } => vec![
                "Update the simulator to the latest version",
                "Update this library to a compatible version",
            ],
            TelemetryError::Parse { .. } => vec![
                "Reconnect and reload the variable directory",
                "Verify the shared memory layout is intact",
            ],
            TelemetryError::FieldNotFound { .. } => vec![
                "Check field name spelling",
                "Verify the field exists in the current simulator session",
                "Use optional field access patterns",
            ],
            TelemetryError::TypeConversion { .. } => vec![
                "Check the declared kind in the variable descriptor",
                "Use the read method matching the declared kind",
            ],
            TelemetryError::UnsupportedPlatform { .. } => vec![
                "Use platform-appropriate features",
                "Use the simulated platform for cross-platform testing",
            ],
            #[cfg(windows)]
            TelemetryError::WindowsApi { .. } => vec![
                "Check Windows API permissions",
                "Verify system resources availability",
            ],
            TelemetryError::Query(_) => vec![
                "Check the query path spelling and nesting",
                "Re-run the query after the session info update counter changes",
            ],
        }
    }

    /// Helper constructor for connection errors.
    pub fn connection_failed(reason: impl Into<String>) -> Self {
        TelemetryError::Connection { reason: reason.into(), source: None }
    }

    /// Helper constructor for connection errors with source.
    pub fn connection_failed_with_source(
        reason: impl Into<String>,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        TelemetryError::Connection { reason: reason.into(), source: Some(source) }
    }

    /// Helper constructor for memory access errors.
    pub fn memory_access_error(offset: usize) -> Self {
        TelemetryError::Memory { offset, source: None }
    }

    /// Helper constructor for parse errors.
    pub fn parse_error(context: impl Into<String>, details: impl Into<String>) -> Self {
        TelemetryError::Parse { context: context.into(), details: details.into() }
    }

    /// Helper constructor for Windows API errors.
    #[cfg(windows)]
    pub fn windows_api_error(operation: impl Into<String>, source: core::Error) -> Self {
        TelemetryError::WindowsApi { operation: operation.into(), source }
    }

    /// Helper constructor for unsupported platform errors.
    pub fn unsupported_platform(
        feature: impl Into<String>,
        required_platform: impl Into<String>,
    ) -> Self {
        TelemetryError::UnsupportedPlatform {
            feature: feature.into(),
            required_platform: required_platform.into(),
        }
    }
}

#[cfg(windows)]
impl From<core::Error> for TelemetryError {
    fn from(err: core::Error) -> Self {
        TelemetryError::WindowsApi {
            operation: "Unknown Windows operation".to_string(),
            source: err,
        }
    }
}
