//! Shared Memory Header Decoding
//!
//! The header sits at offset 0 of the mapped region and follows the C layout
//! of the simulator SDK:
//! ```c
//! typedef struct irsdk_header
//! {
//!     int ver;                    // api version, 2 for current clients
//!     int status;                 // bitfield for status
//!     int tickRate;               // ticks per second (60 or 360)
//!     int sessionInfoUpdate;      // incremented when session info changes
//!     int sessionInfoLen;         // length in bytes of session info string
//!     int sessionInfoOffset;      // offset to session info string
//!     int numVars;                // length of varHeader array
//!     int varHeaderOffset;        // offset to varHeader[0]
//!     int numBuf;                 // number of buffers (<= 4)
//!     int bufLen;                 // length in bytes of one row
//!     int pad1[2];                // 16-byte alignment
//!     irsdk_varBuf varBuf[4];     // tickCount, bufOffset, pad[2]
//! } irsdk_header;
//! ```
//!
//! The writer mutates the header while we read it, so [`Header::read`]
//! decodes each word individually into an owned copy. The copy is a
//! point-in-time view: slot tick counts must be re-read through
//! [`Header::read_slot_tick`] when verifying a row copy.

use tracing::trace;

use crate::connection::SharedView;
use crate::types::irsdk_flags::status;
use crate::{Result, TelemetryError};

/// The expected SDK version
pub const IRSDK_VER: i32 = 2;

/// Maximum number of buffer slots
pub const MAX_BUFS: usize = 4;

/// Byte offsets of the header words.
pub mod layout {
    pub const VER: usize = 0;
    pub const STATUS: usize = 4;
    pub const TICK_RATE: usize = 8;
    pub const SESSION_INFO_UPDATE: usize = 12;
    pub const SESSION_INFO_LEN: usize = 16;
    pub const SESSION_INFO_OFFSET: usize = 20;
    pub const NUM_VARS: usize = 24;
    pub const VAR_HEADER_OFFSET: usize = 28;
    pub const NUM_BUF: usize = 32;
    pub const BUF_LEN: usize = 36;
    /// First slot descriptor (after two padding words)
    pub const VAR_BUF: usize = 48;
    /// Size of one slot descriptor
    pub const VAR_BUF_STRIDE: usize = 16;
    /// Offset of `tickCount` inside a slot descriptor
    pub const SLOT_TICK: usize = 0;
    /// Offset of `bufOffset` inside a slot descriptor
    pub const SLOT_OFFSET: usize = 4;
    /// Total header size
    pub const HEADER_SIZE: usize = 112;
}

/// One buffer slot descriptor
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VarBuf {
    /// Tick of the row last published into this slot
    pub tick_count: i32,
    /// Offset of the slot's row from the start of the region
    pub buf_offset: i32,
}

/// Decoded copy of the shared memory header
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Header {
    pub ver: i32,
    pub status: i32,
    pub tick_rate: i32,
    pub session_info_update: i32,
    pub session_info_len: i32,
    pub session_info_offset: i32,
    pub num_vars: i32,
    pub var_header_offset: i32,
    pub num_buf: i32,
    pub buf_len: i32,
    pub var_buf: [VarBuf; MAX_BUFS],
}

fn word<V: SharedView + ?Sized>(view: &V, offset: usize) -> Result<i32> {
    view.read_i32(offset).ok_or_else(|| TelemetryError::memory_access_error(offset))
}

fn slot_base(slot: usize) -> usize {
    layout::VAR_BUF + slot * layout::VAR_BUF_STRIDE
}

impl Header {
    /// Decode the header from the start of a mapped view.
    pub fn read<V: SharedView + ?Sized>(view: &V) -> Result<Self> {
        if view.len() < layout::HEADER_SIZE {
            return Err(TelemetryError::memory_access_error(view.len()));
        }

        let mut var_buf = [VarBuf::default(); MAX_BUFS];
        for (slot, buf) in var_buf.iter_mut().enumerate() {
            buf.tick_count = word(view, slot_base(slot) + layout::SLOT_TICK)?;
            buf.buf_offset = word(view, slot_base(slot) + layout::SLOT_OFFSET)?;
        }

        let header = Header {
            ver: word(view, layout::VER)?,
            status: word(view, layout::STATUS)?,
            tick_rate: word(view, layout::TICK_RATE)?,
            session_info_update: word(view, layout::SESSION_INFO_UPDATE)?,
            session_info_len: word(view, layout::SESSION_INFO_LEN)?,
            session_info_offset: word(view, layout::SESSION_INFO_OFFSET)?,
            num_vars: word(view, layout::NUM_VARS)?,
            var_header_offset: word(view, layout::VAR_HEADER_OFFSET)?,
            num_buf: word(view, layout::NUM_BUF)?,
            buf_len: word(view, layout::BUF_LEN)?,
            var_buf,
        };

        trace!(
            status = header.status,
            num_buf = header.num_buf,
            session_info_update = header.session_info_update,
            "Read shared memory header"
        );

        Ok(header)
    }

    /// Re-read only the status word.
    pub fn read_status<V: SharedView + ?Sized>(view: &V) -> Option<i32> {
        view.read_i32(layout::STATUS)
    }

    /// Re-read the tick count of one slot.
    pub fn read_slot_tick<V: SharedView + ?Sized>(view: &V, slot: usize) -> Option<i32> {
        if slot >= MAX_BUFS {
            return None;
        }
        view.read_i32(slot_base(slot) + layout::SLOT_TICK)
    }

    /// Whether the simulator reports itself as connected.
    pub fn is_connected(&self) -> bool {
        (self.status & status::CONNECTED) != 0
    }

    /// Number of slots in use, clamped to the slot table size.
    pub fn slot_count(&self) -> usize {
        usize::try_from(self.num_buf).unwrap_or(0).min(MAX_BUFS)
    }

    /// Row length in bytes, 0 when the header reports a non-positive length.
    pub fn row_len(&self) -> usize {
        usize::try_from(self.buf_len).unwrap_or(0)
    }

    /// The slot holding the most recently published row.
    ///
    /// Picks the strictly greatest tick count; on ties the lowest index wins.
    pub fn latest_slot(&self) -> Option<usize> {
        let count = self.slot_count();
        if count == 0 {
            return None;
        }
        let mut latest = 0;
        for slot in 1..count {
            if self.var_buf[latest].tick_count < self.var_buf[slot].tick_count {
                latest = slot;
            }
        }
        Some(latest)
    }

    /// Check if session info has been updated since `last_update`.
    pub fn session_info_changed(&self, last_update: i32) -> bool {
        self.session_info_update != last_update
    }

    /// Validate header fields before trusting offsets derived from them.
    pub fn validate(&self) -> Result<()> {
        if self.ver != IRSDK_VER {
            return Err(TelemetryError::Version {
                expected: IRSDK_VER as u32,
                found: self.ver as u32,
            });
        }

        if self.num_buf < 1 || self.num_buf as usize > MAX_BUFS {
            return Err(TelemetryError::parse_error(
                "Header validation",
                format!("Expected 1-{} buffers, found {}", MAX_BUFS, self.num_buf),
            ));
        }

        if self.buf_len <= 0 {
            return Err(TelemetryError::parse_error(
                "Header validation",
                format!("Invalid buffer length: {}", self.buf_len),
            ));
        }

        if self.num_vars < 0 || self.var_header_offset < 0 {
            return Err(TelemetryError::parse_error(
                "Header validation",
                format!(
                    "Invalid variable array: count={}, offset={}",
                    self.num_vars, self.var_header_offset
                ),
            ));
        }

        if self.session_info_len < 0 || self.session_info_offset < 0 {
            return Err(TelemetryError::parse_error(
                "Header validation",
                format!(
                    "Invalid session info: len={}, offset={}",
                    self.session_info_len, self.session_info_offset
                ),
            ));
        }

        for (slot, buf) in self.var_buf.iter().take(self.slot_count()).enumerate() {
            if buf.buf_offset < 0 {
                return Err(TelemetryError::parse_error(
                    "Buffer validation",
                    format!("Buffer {} has negative offset: {}", slot, buf.buf_offset),
                ));
            }
        }

        Ok(())
    }

    /// Encode the header in its shared memory layout.
    pub fn to_bytes(&self) -> [u8; layout::HEADER_SIZE] {
        let mut out = [0u8; layout::HEADER_SIZE];
        let mut put = |offset: usize, value: i32| {
            out[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
        };
        put(layout::VER, self.ver);
        put(layout::STATUS, self.status);
        put(layout::TICK_RATE, self.tick_rate);
        put(layout::SESSION_INFO_UPDATE, self.session_info_update);
        put(layout::SESSION_INFO_LEN, self.session_info_len);
        put(layout::SESSION_INFO_OFFSET, self.session_info_offset);
        put(layout::NUM_VARS, self.num_vars);
        put(layout::VAR_HEADER_OFFSET, self.var_header_offset);
        put(layout::NUM_BUF, self.num_buf);
        put(layout::BUF_LEN, self.buf_len);
        for (slot, buf) in self.var_buf.iter().enumerate() {
            put(slot_base(slot) + layout::SLOT_TICK, buf.tick_count);
            put(slot_base(slot) + layout::SLOT_OFFSET, buf.buf_offset);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::RawRegion;
    use proptest::prelude::*;
    use std::ptr::NonNull;

    fn sample() -> Header {
        Header {
            ver: IRSDK_VER,
            status: status::CONNECTED,
            tick_rate: 60,
            session_info_update: 3,
            session_info_len: 5000,
            session_info_offset: 1000,
            num_vars: 150,
            var_header_offset: 500,
            num_buf: 3,
            buf_len: 2000,
            var_buf: [
                VarBuf { tick_count: 100, buf_offset: 30_000 },
                VarBuf { tick_count: 102, buf_offset: 32_000 },
                VarBuf { tick_count: 101, buf_offset: 34_000 },
                VarBuf { tick_count: 999, buf_offset: 36_000 },
            ],
        }
    }

    fn decode(bytes: &mut [u8]) -> Result<Header> {
        let view = unsafe { RawRegion::new(NonNull::new(bytes.as_mut_ptr()).unwrap(), bytes.len()) };
        Header::read(&view)
    }

    #[test]
    fn encode_then_read_preserves_fields() {
        let header = sample();
        let mut bytes = header.to_bytes();
        assert_eq!(decode(&mut bytes).unwrap(), header);
    }

    #[test]
    fn short_view_is_memory_error() {
        let mut bytes = [0u8; 40];
        assert!(matches!(decode(&mut bytes), Err(TelemetryError::Memory { .. })));
    }

    #[test]
    fn latest_slot_ignores_unused_slots() {
        // slot 3 has the highest tick but num_buf is 3
        assert_eq!(sample().latest_slot(), Some(1));

        let mut header = sample();
        header.num_buf = 0;
        assert_eq!(header.latest_slot(), None);
    }

    #[test]
    fn latest_slot_prefers_first_on_ties() {
        let mut header = sample();
        header.var_buf[0].tick_count = 102;
        assert_eq!(header.latest_slot(), Some(0));
    }

    #[test]
    fn validation_rejects_bad_fields() {
        assert!(sample().validate().is_ok());

        let mut header = sample();
        header.ver = 1;
        assert!(matches!(header.validate(), Err(TelemetryError::Version { expected: 2, found: 1 })));

        let mut header = sample();
        header.num_buf = 5;
        assert!(header.validate().is_err());

        let mut header = sample();
        header.buf_len = 0;
        assert!(header.validate().is_err());

        let mut header = sample();
        header.var_buf[2].buf_offset = -4;
        assert!(header.validate().is_err());
    }

    #[test]
    fn status_and_change_detection() {
        let mut header = sample();
        assert!(header.is_connected());
        header.status = 0;
        assert!(!header.is_connected());

        assert!(header.session_info_changed(2));
        assert!(!header.session_info_changed(3));
    }

    proptest! {
        #[test]
        fn latest_slot_has_maximum_tick(ticks in prop::collection::vec(any::<i32>(), 1..=4)) {
            let mut header = sample();
            header.num_buf = ticks.len() as i32;
            for (slot, tick) in ticks.iter().enumerate() {
                header.var_buf[slot].tick_count = *tick;
            }
            let latest = header.latest_slot().unwrap();
            let max = *ticks.iter().max().unwrap();
            prop_assert_eq!(header.var_buf[latest].tick_count, max);
            prop_assert_eq!(ticks.iter().position(|t| *t == max), Some(latest));
        }
    }
}
