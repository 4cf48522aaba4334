//! Shared memory layout decoding
//!
//! - [`header`] decodes the fixed region header and its buffer slot table
//! - [`variables`] decodes the variable header array into a
//!   [`SnapshotDirectory`] used to locate values inside a row

pub mod header;
pub mod variables;

pub use header::Header;
pub use variables::SnapshotDirectory;
