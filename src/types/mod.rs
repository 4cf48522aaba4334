//! Core types for telemetry data representation.
//!
//! ## Architecture
//!
//! The type system maps directly to the simulator's SDK structures:
//! - [`VariableType`] maps to `irsdk_VarType` with its byte-width table
//! - [`VariableDescriptor`] is one entry of the variable directory
//! - [`Snapshot`] is one self-consistent row with bounds-checked typed reads
//! - [`VarData`] decodes a single element of a row
//! - [`BitField`] handles bitfield variables with flag operations
//! - [`TickCursor`] tracks the last observed writer tick
//! - [`BroadcastMsg`] and the mode enums form the outbound command catalogue
//!
//! ## Usage Example
//!
//! ```rust
//! use ira_telemetry::types::{VariableDescriptor, VariableType};
//!
//! let rpm = VariableDescriptor {
//!     name: "RPM".to_string(),
//!     kind: VariableType::Float32,
//!     offset: 0,
//!     count: 1,
//!     count_as_time: false,
//!     description: "Engine rpm".to_string(),
//!     unit: "revs/min".to_string(),
//! };
//! assert!(rpm.check_fits(4).is_ok());
//! ```

mod bitfield;
pub mod broadcast;
pub mod irsdk_flags;
mod schema;
mod snapshot;
mod tick;
mod var_data;
mod variable_type;

pub use bitfield::{
    BitField, engine_mandatory_repair_needed, pit_limiter_active, session_caution,
    session_checkered, session_green,
};
pub use broadcast::BroadcastMsg;
pub use irsdk_flags::{
    CarLeftRight, PaceMode, PitServiceStatus, SessionState, TrackLocation, TrackSurface,
    TrackWetness,
};
pub use schema::VariableDescriptor;
pub use snapshot::Snapshot;
pub use tick::{TickCursor, TickOrder};
pub use var_data::VarData;
pub use variable_type::{VAR_TYPE_BYTES, VariableType};
