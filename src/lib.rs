//! Shared-memory telemetry client for iRacing.
//!
//! The simulator publishes telemetry rows into a named shared memory region
//! at its tick rate, signals a named event whenever a row is complete, and
//! keeps a text block of session information next to the rows. This crate
//! reads all of it without locks and can post commands back to the simulator.
//!
//! # Features
//!
//! - **Torn-read free rows**: every accepted [`Snapshot`] belongs to exactly
//!   one published tick
//! - **Variable directory**: name lookup and bounds-checked typed reads
//! - **Session queries**: zero-copy path queries over the session text
//! - **Commands**: the broadcast catalogue encoded bit-exactly
//! - **Testable**: all OS access sits behind [`Platform`], so the protocol runs
//!   against an in-process writer on any OS
//!
//! # Quick Start
//!
//! ```rust,no_run
//! # #[cfg(windows)]
//! # fn main() -> ira_telemetry::Result<()> {
//! use std::time::Duration;
//! use ira_telemetry::windows::Win32Platform;
//! use ira_telemetry::{Snapshot, SnapshotDirectory, TelemetryConnection};
//!
//! let mut conn = TelemetryConnection::new(Win32Platform::new());
//! conn.connect()?;
//! let directory = SnapshotDirectory::load(&conn)?;
//! let speed = directory.require("Speed")?.clone();
//!
//! if let Some(text) = conn.session_text() {
//!     println!("track: {}", text.value("WeekendInfo:TrackDisplayName")?);
//! }
//!
//! let mut snapshot = Snapshot::new();
//! for _ in 0..600 {
//!     if conn.wait_for_data(Duration::from_millis(16), Some(&mut snapshot))?.is_new_data() {
//!         println!("speed {:.1} m/s", snapshot.value::<f32>(&speed, 0)?);
//!     }
//! }
//! # Ok(())
//! # }
//! # #[cfg(not(windows))]
//! # fn main() {}
//! ```

// Core types and error handling
mod config;
mod error;
#[cfg(any(test, feature = "benchmark"))]
pub mod test_utils;
pub mod types;

// Shared memory protocol
pub mod connection;
pub mod schema;
pub mod session;

// Outbound commands
pub mod command;

// Platform-specific modules
#[cfg(windows)]
pub mod windows;

// Core exports
pub use config::{
    ConnectionConfig, DEFAULT_BROADCAST_MESSAGE_NAME, DEFAULT_DATA_VALID_EVENT_NAME,
    DEFAULT_MEMORY_MAP_NAME,
};
pub use error::*;
pub use types::*;

// Connection exports
pub use connection::{
    ConnectionState, DataSignal, Platform, PollOutcome, RawRegion, SharedView, TelemetryConnection,
    WaitResult,
};

// Schema and session exports
pub use schema::{Header, SnapshotDirectory};
pub use session::{QueryError, SessionSummary, SessionText, query, query_into};

// Command exports
pub use command::{BroadcastTransport, Command, CommandArgs, CommandChannel, EncodedCommand, pad_car_num};
