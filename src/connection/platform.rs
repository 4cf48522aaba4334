//! Operating-system seams of the telemetry connection
//!
//! A [`TelemetryConnection`](super::TelemetryConnection) never calls the OS
//! directly. It acquires a named mapping, a view of it and a named data-valid
//! signal through a [`Platform`], and reads the view through [`SharedView`].
//! The Windows implementation lives in `crate::windows`; tests drive the same
//! protocol through `test_utils::SimulatedSim`.

use std::ptr::NonNull;
use std::sync::atomic::{Ordering, fence};
use std::time::Duration;

use crate::Result;

/// Result of waiting on the data-valid signal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitResult {
    Signaled,
    Timeout,
}

/// Read-only access to a mapped view the writer mutates concurrently.
///
/// Every accessor is bounds-checked against [`SharedView::len`]; an
/// out-of-range request yields `None` / `false` rather than touching memory
/// outside the view.
pub trait SharedView {
    /// Size of the view in bytes.
    fn len(&self) -> usize;

    /// Whether the view is empty.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Read a little-endian `i32` the writer may be updating.
    fn read_i32(&self, offset: usize) -> Option<i32>;

    /// Copy `dst.len()` bytes starting at `offset` into `dst`.
    fn copy_out(&self, offset: usize, dst: &mut [u8]) -> bool;

    /// Borrow `len` bytes at `offset` for as long as the view is mapped.
    fn bytes(&self, offset: usize, len: usize) -> Option<&[u8]>;
}

/// The writer's "new row published" signal. The reader only waits on it.
pub trait DataSignal {
    /// Block until signaled or until `timeout` elapses.
    fn wait(&self, timeout: Duration) -> Result<WaitResult>;
}

/// Acquisition of the three OS resources a connection needs.
///
/// Resources are released by dropping them; a connection drops them in
/// reverse order of acquisition.
pub trait Platform {
    /// Handle to the named shared-memory mapping.
    type Mapping;
    /// A read-only view of the mapping.
    type View: SharedView;
    /// Handle to the named data-valid signal.
    type Signal: DataSignal;

    /// Open the named mapping read-only.
    fn open_mapping(&mut self, name: &str) -> Result<Self::Mapping>;

    /// Map a read-only view of `mapping`.
    fn map_view(&mut self, mapping: &Self::Mapping) -> Result<Self::View>;

    /// Open the named data-valid signal with wait access.
    fn open_signal(&mut self, name: &str) -> Result<Self::Signal>;
}

/// Bounds-checked reads over a raw mapped region.
///
/// This is the only place the crate dereferences memory owned by another
/// process. Reads of header words are volatile; row copies are fenced so they
/// cannot be reordered across the tick reads that bracket them.
#[derive(Debug)]
pub struct RawRegion {
    base: NonNull<u8>,
    len: usize,
}

impl RawRegion {
    /// Wrap a mapped region.
    ///
    /// # Safety
    ///
    /// `base` must point to `len` readable bytes that stay mapped for the
    /// lifetime of the returned value.
    pub unsafe fn new(base: NonNull<u8>, len: usize) -> Self {
        Self { base, len }
    }

    /// Base address of the region.
    pub fn base(&self) -> NonNull<u8> {
        self.base
    }

    fn range_ok(&self, offset: usize, len: usize) -> bool {
        offset.checked_add(len).is_some_and(|end| end <= self.len)
    }
}

impl SharedView for RawRegion {
    fn len(&self) -> usize {
        self.len
    }

    fn read_i32(&self, offset: usize) -> Option<i32> {
        if !self.range_ok(offset, 4) {
            return None;
        }
        // SAFETY: range checked above; [u8; 4] has alignment 1.
        let raw = unsafe { std::ptr::read_volatile(self.base.as_ptr().add(offset) as *const [u8; 4]) };
        fence(Ordering::Acquire);
        Some(i32::from_le_bytes(raw))
    }

    fn copy_out(&self, offset: usize, dst: &mut [u8]) -> bool {
        if !self.range_ok(offset, dst.len()) {
            return false;
        }
        fence(Ordering::Acquire);
        // SAFETY: range checked above; dst is a distinct, exclusively borrowed buffer.
        unsafe {
            std::ptr::copy_nonoverlapping(self.base.as_ptr().add(offset), dst.as_mut_ptr(), dst.len());
        }
        fence(Ordering::Acquire);
        true
    }

    fn bytes(&self, offset: usize, len: usize) -> Option<&[u8]> {
        if !self.range_ok(offset, len) {
            return None;
        }
        // SAFETY: range checked above; the region outlives &self by construction.
        Some(unsafe { std::slice::from_raw_parts(self.base.as_ptr().add(offset), len) })
    }
}

// SAFETY: RawRegion is a read-only window; the owner guarantees the mapping
// stays valid while it exists.
unsafe impl Send for RawRegion {}

#[cfg(test)]
mod tests {
    use super::*;

    fn region(buf: &mut [u8]) -> RawRegion {
        let base = NonNull::new(buf.as_mut_ptr()).unwrap();
        unsafe { RawRegion::new(base, buf.len()) }
    }

    #[test]
    fn reads_are_bounds_checked() {
        let mut buf = [0u8; 12];
        buf[4..8].copy_from_slice(&77i32.to_le_bytes());
        let view = region(&mut buf);

        assert_eq!(view.read_i32(4), Some(77));
        assert_eq!(view.read_i32(9), None);
        assert_eq!(view.read_i32(usize::MAX), None);

        let mut dst = [0u8; 4];
        assert!(view.copy_out(4, &mut dst));
        assert_eq!(i32::from_le_bytes(dst), 77);
        assert!(!view.copy_out(10, &mut dst));

        assert_eq!(view.bytes(8, 4).map(<[u8]>::len), Some(4));
        assert!(view.bytes(8, 5).is_none());
    }
}
