//! Shared memory telemetry connection
//!
//! [`TelemetryConnection`] owns the three resources the simulator exposes (the
//! named mapping, a view of it and the data-valid signal) and implements the
//! reader side of the lock-free row protocol:
//!
//! 1. the writer publishes rows into up to four slots and bumps each slot's
//!    tick count after the row is complete;
//! 2. the reader picks the slot with the greatest tick, copies its row, then
//!    re-reads the tick; an unchanged tick proves the copy is not torn;
//! 3. a tick lower than the last observed one is a discontinuity (the writer
//!    restarted) and resynchronizes the reader without emitting a row.
//!
//! ```rust,no_run
//! # #[cfg(windows)]
//! # fn main() -> ira_telemetry::Result<()> {
//! use std::time::Duration;
//! use ira_telemetry::{PollOutcome, Snapshot, SnapshotDirectory, TelemetryConnection};
//! use ira_telemetry::windows::Win32Platform;
//!
//! let mut conn = TelemetryConnection::new(Win32Platform::new());
//! conn.connect()?;
//! let directory = SnapshotDirectory::load(&conn)?;
//! let rpm = directory.require("RPM")?.clone();
//!
//! let mut snapshot = Snapshot::new();
//! loop {
//!     if conn.wait_for_data(Duration::from_millis(16), Some(&mut snapshot))? == PollOutcome::NewData {
//!         println!("rpm {}", snapshot.value::<f32>(&rpm, 0)?);
//!     }
//! }
//! # }
//! # #[cfg(not(windows))]
//! # fn main() {}
//! ```

mod platform;

pub use platform::{DataSignal, Platform, RawRegion, SharedView, WaitResult};

use std::time::{Duration, Instant};

use tracing::{debug, info, trace, warn};

use crate::config::ConnectionConfig;
use crate::schema::header::Header;
use crate::session::SessionText;
use crate::types::{Snapshot, TickCursor, TickOrder};
use crate::{Result, TelemetryError};

/// Whether all connection resources are held
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connected,
}

/// Outcome of a poll or wait
#[must_use]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// A new row was accepted
    NewData,
    /// Nothing new, or the row could not be copied consistently
    NoNewData,
}

impl PollOutcome {
    pub fn is_new_data(self) -> bool {
        self == PollOutcome::NewData
    }
}

/// Result of one bounded verified copy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CopyOutcome {
    /// The scratch row holds a complete copy of this tick
    Consistent(i32),
    /// Every attempt overlapped a writer update
    Torn,
}

/// Reader end of the simulator's shared memory protocol.
pub struct TelemetryConnection<P: Platform> {
    platform: P,
    config: ConnectionConfig,
    mapping: Option<P::Mapping>,
    view: Option<P::View>,
    signal: Option<P::Signal>,
    cursor: TickCursor,
    last_valid: Option<Instant>,
    scratch: Vec<u8>,
    generation: u64,
}

impl<P: Platform> TelemetryConnection<P> {
    /// A disconnected connection using the default configuration.
    pub fn new(platform: P) -> Self {
        Self::with_config(platform, ConnectionConfig::default())
    }

    pub fn with_config(platform: P, config: ConnectionConfig) -> Self {
        Self {
            platform,
            config,
            mapping: None,
            view: None,
            signal: None,
            cursor: TickCursor::new(),
            last_valid: None,
            scratch: Vec::new(),
            generation: 0,
        }
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    pub fn platform(&self) -> &P {
        &self.platform
    }

    /// Acquire whatever resources are still missing.
    ///
    /// Resources acquired by an earlier, partially failed attempt are kept
    /// and never re-acquired. Fails with the first step that fails.
    pub fn connect(&mut self) -> Result<()> {
        if self.mapping.is_none() {
            let mapping = self.platform.open_mapping(&self.config.memory_map_name).inspect_err(|e| {
                debug!(error = %e, name = %self.config.memory_map_name, "Shared memory mapping unavailable")
            })?;
            debug!(name = %self.config.memory_map_name, "Opened shared memory mapping");
            self.mapping = Some(mapping);
            self.cursor.reset();
        }

        if self.view.is_none() {
            let mapping = self
                .mapping
                .as_ref()
                .ok_or_else(|| TelemetryError::connection_failed("Shared memory mapping not open"))?;
            let view = self
                .platform
                .map_view(mapping)
                .inspect_err(|e| debug!(error = %e, "Failed to map shared memory view"))?;
            debug!(len = view.len(), "Mapped shared memory view");
            self.view = Some(view);
            self.generation += 1;
            self.cursor.reset();
        }

        if self.signal.is_none() {
            let signal = self.platform.open_signal(&self.config.data_valid_event_name).inspect_err(|e| {
                debug!(error = %e, name = %self.config.data_valid_event_name, "Data valid event unavailable")
            })?;
            debug!(name = %self.config.data_valid_event_name, "Opened data valid event");
            self.signal = Some(signal);
            self.cursor.reset();
            info!(generation = self.generation, "Connected to simulator shared memory");
        }

        Ok(())
    }

    /// Release the signal, the view and the mapping, in that order.
    ///
    /// Safe to call any number of times.
    pub fn disconnect(&mut self) {
        let held = self.mapping.is_some() || self.view.is_some() || self.signal.is_some();

        drop(self.signal.take());
        drop(self.view.take());
        drop(self.mapping.take());

        self.cursor.reset();
        self.last_valid = None;

        if held {
            debug!(generation = self.generation, "Disconnected from simulator shared memory");
        }
    }

    pub fn state(&self) -> ConnectionState {
        if self.resources_held() { ConnectionState::Connected } else { ConnectionState::Disconnected }
    }

    fn resources_held(&self) -> bool {
        self.mapping.is_some() && self.view.is_some() && self.signal.is_some()
    }

    /// Whether the simulator is live.
    ///
    /// Requires every resource, the header's connected bit, and a row accepted
    /// within the configured liveness window.
    pub fn is_connected(&self) -> bool {
        if !self.resources_held() {
            return false;
        }
        let status_set = self
            .view
            .as_ref()
            .and_then(|view| Header::read_status(view))
            .is_some_and(|status| status & crate::types::irsdk_flags::status::CONNECTED != 0);

        status_set && self.last_valid.is_some_and(|at| at.elapsed() <= self.config.liveness_window)
    }

    /// Check for a new row without blocking.
    ///
    /// With `copy_into` the row is copied and verified before being accepted;
    /// without it the new tick is simply marked as observed. Attempts
    /// `connect()` first if resources are missing.
    pub fn poll_non_blocking(&mut self, copy_into: Option<&mut Snapshot>) -> Result<PollOutcome> {
        if !self.resources_held() {
            if let Err(e) = self.connect() {
                trace!(error = %e, "Poll while disconnected");
                return Ok(PollOutcome::NoNewData);
            }
        }

        let Some(view) = self.view.as_ref() else {
            return Ok(PollOutcome::NoNewData);
        };
        let header = Header::read(view)?;

        if !header.is_connected() {
            trace!(status = header.status, "Simulator not connected, resetting tick cursor");
            self.cursor.reset();
            return Ok(PollOutcome::NoNewData);
        }

        if header.row_len() == 0 {
            trace!(buf_len = header.buf_len, "Header reports no row length");
            return Ok(PollOutcome::NoNewData);
        }

        let Some(slot) = header.latest_slot() else {
            trace!(num_buf = header.num_buf, "Header reports no buffer slots");
            return Ok(PollOutcome::NoNewData);
        };
        let tick = header.var_buf[slot].tick_count;

        match self.cursor.classify(tick) {
            TickOrder::Same => {
                trace!(tick, "No new data (same tick count)");
                Ok(PollOutcome::NoNewData)
            }
            TickOrder::Older => {
                debug!(last = ?self.cursor.last(), tick, slot, "Tick discontinuity, resynchronizing");
                self.cursor.observe(tick);
                Ok(PollOutcome::NoNewData)
            }
            TickOrder::Newer => match copy_into {
                None => {
                    self.mark_accepted(tick);
                    Ok(PollOutcome::NewData)
                }
                Some(snapshot) => match self.verified_copy(&header, slot)? {
                    CopyOutcome::Consistent(copied) => {
                        snapshot.accept(&mut self.scratch, copied);
                        self.mark_accepted(copied);
                        trace!(tick = copied, slot, len = snapshot.len(), "Accepted new row");
                        Ok(PollOutcome::NewData)
                    }
                    CopyOutcome::Torn => {
                        warn!(
                            tick,
                            slot,
                            attempts = self.config.effective_copy_attempts(),
                            "Failed consistency checks, no data returned"
                        );
                        Ok(PollOutcome::NoNewData)
                    }
                },
            },
        }
    }

    fn mark_accepted(&mut self, tick: i32) {
        self.cursor.observe(tick);
        self.last_valid = Some(Instant::now());
    }

    /// Copy the row in `slot` into the scratch buffer until the slot's tick
    /// is unchanged across a copy, up to the configured attempt count.
    fn verified_copy(&mut self, header: &Header, slot: usize) -> Result<CopyOutcome> {
        let Some(view) = self.view.as_ref() else {
            return Ok(CopyOutcome::Torn);
        };
        let offset = usize::try_from(header.var_buf[slot].buf_offset)
            .map_err(|_| TelemetryError::memory_access_error(0))?;

        let row_len = header.row_len();
        if !offset.checked_add(row_len).is_some_and(|end| end <= view.len()) {
            warn!(offset, row_len, view_len = view.len(), "Row lies outside the mapped view");
            return Err(TelemetryError::memory_access_error(offset));
        }

        self.scratch.clear();
        self.scratch.resize(row_len, 0);

        for attempt in 1..=self.config.effective_copy_attempts() {
            let Some(before) = Header::read_slot_tick(view, slot) else {
                return Err(TelemetryError::memory_access_error(offset));
            };
            if !view.copy_out(offset, &mut self.scratch) {
                return Err(TelemetryError::memory_access_error(offset));
            }
            let after = Header::read_slot_tick(view, slot);

            if after == Some(before) && self.cursor.classify(before) == TickOrder::Newer {
                return Ok(CopyOutcome::Consistent(before));
            }
            debug!(attempt, before, ?after, "Data consistency check failed");
        }

        Ok(CopyOutcome::Torn)
    }

    /// Poll, and if nothing is new, wait on the data-valid signal for up to
    /// `timeout` and poll once more.
    ///
    /// When resources are missing and `connect()` fails, sleeps for `timeout`
    /// to bound the retry rate.
    pub fn wait_for_data(&mut self, timeout: Duration, mut copy_into: Option<&mut Snapshot>) -> Result<PollOutcome> {
        if !self.resources_held() {
            if let Err(e) = self.connect() {
                trace!(error = %e, timeout_ms = timeout.as_millis() as u64, "Not connected, sleeping");
                std::thread::sleep(timeout);
                return Ok(PollOutcome::NoNewData);
            }
        }

        if self.poll_non_blocking(copy_into.as_deref_mut())?.is_new_data() {
            return Ok(PollOutcome::NewData);
        }

        if let Some(signal) = self.signal.as_ref() {
            let result = signal.wait(timeout)?;
            trace!(?result, "Data valid wait finished");
        }

        self.poll_non_blocking(copy_into)
    }

    /// Decoded copy of the current header.
    pub fn header(&self) -> Result<Header> {
        let view = self
            .view
            .as_ref()
            .ok_or_else(|| TelemetryError::connection_failed("Shared memory is not mapped"))?;
        Header::read(view)
    }

    /// Row length in bytes, 0 when disconnected.
    pub fn row_len(&self) -> usize {
        self.header().map(|h| h.row_len()).unwrap_or(0)
    }

    /// Session text as currently published, cut at the first NUL.
    ///
    /// The text is borrowed from the mapped view, so it cannot outlive a
    /// `disconnect()`.
    pub fn session_text(&self) -> Option<SessionText<'_>> {
        let view = self.view.as_ref()?;
        let header = Header::read(view).ok()?;
        let offset = usize::try_from(header.session_info_offset).ok()?;
        let len = usize::try_from(header.session_info_len).ok()?;
        let raw = view.bytes(offset, len)?;
        let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
        Some(SessionText::new(&raw[..end], header.session_info_update))
    }

    /// Session info update counter, `None` when not mapped.
    pub fn session_info_update(&self) -> Option<i32> {
        self.header().ok().map(|h| h.session_info_update)
    }

    /// Tick of the last observed row, `None` after a reset.
    pub fn last_observed_tick(&self) -> Option<i32> {
        self.cursor.last()
    }

    /// Incremented each time a new view is mapped.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub(crate) fn view(&self) -> Option<&P::View> {
        self.view.as_ref()
    }
}

impl<P: Platform> Drop for TelemetryConnection<P> {
    fn drop(&mut self) {
        self.disconnect();
    }
}

impl<P: Platform> std::fmt::Debug for TelemetryConnection<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelemetryConnection")
            .field("state", &self.state())
            .field("last_observed_tick", &self.cursor.last())
            .field("generation", &self.generation)
            .finish()
    }
}
