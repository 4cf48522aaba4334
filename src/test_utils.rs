//! Test utilities: an in-process simulator writer and a recording transport
//!
//! [`SimulatedSim`] lays out a shared memory region exactly as the simulator
//! does (header, variable headers, session text, buffer slots) and drives it
//! from the test thread. It hands out a [`SimPlatform`] so a
//! [`TelemetryConnection`](crate::TelemetryConnection) can run the real
//! protocol against it on any OS.
//!
//! Writer behavior that is hard to reproduce with the real simulator is
//! scripted instead: withholding any of the three OS resources, republishing
//! a slot while the reader copies it, restarting the tick counter, or
//! publishing a row while the reader waits on the signal.

#![cfg(any(test, feature = "benchmark"))]

use std::cell::{Cell, RefCell};
use std::ptr::NonNull;
use std::rc::Rc;
use std::time::Duration;

use crate::command::{BroadcastTransport, EncodedCommand};
use crate::connection::{DataSignal, Platform, RawRegion, SharedView, WaitResult};
use crate::schema::header::{Header, IRSDK_VER, MAX_BUFS, VarBuf, layout};
use crate::schema::variables::{VAR_HEADER_SIZE, encode_descriptor};
use crate::types::irsdk_flags::status;
use crate::{Result, TelemetryError, VariableDescriptor, VariableType};

/// Maximum number of variable headers a simulated region holds
pub const SIM_VAR_CAPACITY: usize = 64;
/// Bytes reserved for the session text
pub const SIM_SESSION_CAPACITY: usize = 16 * 1024;

/// Install a test subscriber honoring `RUST_LOG`; safe to call repeatedly.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// The three resources a connection acquires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimResource {
    Mapping,
    View,
    Signal,
}

impl SimResource {
    fn index(self) -> usize {
        match self {
            SimResource::Mapping => 0,
            SimResource::View => 1,
            SimResource::Signal => 2,
        }
    }
}

/// Heap block addressed only through raw pointers, so the writer can mutate
/// it while reader views exist.
struct SimMemory {
    base: NonNull<u8>,
    len: usize,
}

impl SimMemory {
    fn new(len: usize) -> Self {
        let block: &'static mut [u8] = Box::leak(vec![0u8; len].into_boxed_slice());
        Self { base: NonNull::from(block).cast::<u8>(), len }
    }

    fn write(&self, offset: usize, bytes: &[u8]) {
        assert!(offset + bytes.len() <= self.len, "simulated write out of range");
        // SAFETY: range asserted above; the block lives as long as self.
        unsafe { std::ptr::copy_nonoverlapping(bytes.as_ptr(), self.base.as_ptr().add(offset), bytes.len()) };
    }

    fn region(&self) -> RawRegion {
        // SAFETY: the region is only handed to views that keep SimShared alive.
        unsafe { RawRegion::new(self.base, self.len) }
    }
}

impl Drop for SimMemory {
    fn drop(&mut self) {
        // SAFETY: base/len came from Box::leak of a boxed slice of this length.
        unsafe { drop(Box::from_raw(std::ptr::slice_from_raw_parts_mut(self.base.as_ptr(), self.len))) };
    }
}

struct SimShared {
    memory: SimMemory,
    header: Cell<Header>,
    available: [Cell<bool>; 3],
    acquired: [Cell<u32>; 3],
    live: [Cell<u32>; 3],
    tears_remaining: Cell<u32>,
    copies: Cell<u32>,
    pending_signal: Cell<bool>,
    waits: Cell<u32>,
    publish_on_wait: RefCell<Option<(i32, Vec<u8>)>>,
    next_slot: Cell<usize>,
    last_tick: Cell<i32>,
}

impl SimShared {
    fn flush_header(&self) {
        self.memory.write(0, &self.header.get().to_bytes());
    }

    fn write_slot_tick(&self, slot: usize, tick: i32) {
        let mut header = self.header.get();
        header.var_buf[slot].tick_count = tick;
        self.header.set(header);
        self.memory
            .write(layout::VAR_BUF + slot * layout::VAR_BUF_STRIDE + layout::SLOT_TICK, &tick.to_le_bytes());
    }

    fn publish_to_slot(&self, slot: usize, tick: i32, row: &[u8]) {
        let header = self.header.get();
        assert_eq!(row.len(), header.row_len(), "row length must match the header");
        // row first, tick strictly after
        self.memory.write(header.var_buf[slot].buf_offset as usize, row);
        self.write_slot_tick(slot, tick);
        self.last_tick.set(tick);
    }

    fn publish(&self, tick: i32, row: &[u8]) -> usize {
        let slot = self.next_slot.get();
        self.publish_to_slot(slot, tick, row);
        self.next_slot.set((slot + 1) % self.header.get().slot_count().max(1));
        slot
    }

    fn acquire(&self, resource: SimResource, name: &str) -> Result<()> {
        let index = resource.index();
        if !self.available[index].get() {
            return Err(TelemetryError::connection_failed(format!("{:?} '{}' not available", resource, name)));
        }
        self.acquired[index].set(self.acquired[index].get() + 1);
        self.live[index].set(self.live[index].get() + 1);
        Ok(())
    }

    fn release(&self, resource: SimResource) {
        let index = resource.index();
        self.live[index].set(self.live[index].get() - 1);
    }
}

/// In-process stand-in for the simulator's writer side.
pub struct SimulatedSim {
    shared: Rc<SimShared>,
}

impl SimulatedSim {
    /// A connected writer with the given variables, rows of `row_len` bytes
    /// and three buffer slots.
    pub fn new(descriptors: &[VariableDescriptor], row_len: usize) -> Self {
        let var_offset = layout::HEADER_SIZE;
        let session_offset = var_offset + SIM_VAR_CAPACITY * VAR_HEADER_SIZE;
        let rows_offset = session_offset + SIM_SESSION_CAPACITY;
        let total = rows_offset + MAX_BUFS * row_len;

        let mut var_buf = [VarBuf::default(); MAX_BUFS];
        for (slot, buf) in var_buf.iter_mut().enumerate() {
            buf.buf_offset = (rows_offset + slot * row_len) as i32;
        }

        let header = Header {
            ver: IRSDK_VER,
            status: status::CONNECTED,
            tick_rate: 60,
            session_info_update: 0,
            session_info_len: SIM_SESSION_CAPACITY as i32,
            session_info_offset: session_offset as i32,
            num_vars: 0,
            var_header_offset: var_offset as i32,
            num_buf: 3,
            buf_len: row_len as i32,
            var_buf,
        };

        let shared = Rc::new(SimShared {
            memory: SimMemory::new(total),
            header: Cell::new(header),
            available: [Cell::new(true), Cell::new(true), Cell::new(true)],
            acquired: Default::default(),
            live: Default::default(),
            tears_remaining: Cell::new(0),
            copies: Cell::new(0),
            pending_signal: Cell::new(false),
            waits: Cell::new(0),
            publish_on_wait: RefCell::new(None),
            next_slot: Cell::new(0),
            last_tick: Cell::new(0),
        });
        shared.flush_header();

        let sim = Self { shared };
        sim.set_descriptors(descriptors);
        sim
    }

    /// A writer with a small, typical set of variables; see [`standard_row`](Self::standard_row).
    pub fn standard() -> Self {
        Self::new(&standard_descriptors(), STANDARD_ROW_LEN)
    }

    /// Deterministic row contents for `tick` in the [`standard`](Self::standard) layout.
    pub fn standard_row(tick: i32) -> Vec<u8> {
        let mut row = vec![0u8; STANDARD_ROW_LEN];
        let speed = tick as f32 * 0.5;
        let rpm = 3000.0 + tick as f32;
        row[0..4].copy_from_slice(&speed.to_le_bytes());
        row[4..8].copy_from_slice(&rpm.to_le_bytes());
        row[8..12].copy_from_slice(&(tick % 7).to_le_bytes());
        row[12] = u8::from(tick % 2 == 0);
        row[16..24].copy_from_slice(&(tick as f64 / 60.0).to_le_bytes());
        for car in 0..4 {
            let pct = (tick + car) as f32 / 100.0;
            let at = 24 + car as usize * 4;
            row[at..at + 4].copy_from_slice(&pct.to_le_bytes());
        }
        row
    }

    pub fn platform(&self) -> SimPlatform {
        SimPlatform { shared: Rc::clone(&self.shared) }
    }

    pub fn header(&self) -> Header {
        self.shared.header.get()
    }

    /// Replace the variable directory, as a new simulator session would.
    pub fn set_descriptors(&self, descriptors: &[VariableDescriptor]) {
        assert!(descriptors.len() <= SIM_VAR_CAPACITY, "too many simulated variables");
        let mut header = self.shared.header.get();
        for (index, var) in descriptors.iter().enumerate() {
            let at = header.var_header_offset as usize + index * VAR_HEADER_SIZE;
            self.shared.memory.write(at, &encode_descriptor(var));
        }
        header.num_vars = descriptors.len() as i32;
        self.shared.header.set(header);
        self.shared.flush_header();
    }

    /// Write raw bytes over the variable header at `index`.
    pub fn corrupt_descriptor(&self, index: usize, raw: &[u8; VAR_HEADER_SIZE]) {
        let header = self.shared.header.get();
        self.shared.memory.write(header.var_header_offset as usize + index * VAR_HEADER_SIZE, raw);
    }

    /// Publish new session text and bump the update counter.
    pub fn set_session_text(&self, text: &str) {
        assert!(text.len() < SIM_SESSION_CAPACITY, "session text too long");
        let mut header = self.shared.header.get();
        let mut bytes = vec![0u8; SIM_SESSION_CAPACITY];
        bytes[..text.len()].copy_from_slice(text.as_bytes());
        self.shared.memory.write(header.session_info_offset as usize, &bytes);
        header.session_info_update += 1;
        self.shared.header.set(header);
        self.shared.flush_header();
    }

    /// Set or clear the header's connected bit.
    pub fn set_connected(&self, connected: bool) {
        let mut header = self.shared.header.get();
        header.status = if connected { status::CONNECTED } else { 0 };
        self.shared.header.set(header);
        self.shared.flush_header();
    }

    /// Overwrite the whole header, e.g. to test validation.
    pub fn set_header(&self, header: Header) {
        self.shared.header.set(header);
        self.shared.flush_header();
    }

    /// Publish `row` at `tick` into the next slot in rotation; returns the slot.
    pub fn publish(&self, tick: i32, row: &[u8]) -> usize {
        self.shared.publish(tick, row)
    }

    pub fn publish_to_slot(&self, slot: usize, tick: i32, row: &[u8]) {
        self.shared.publish_to_slot(slot, tick, row);
    }

    /// Publish the standard row for the tick after the last one published.
    pub fn publish_next(&self) -> i32 {
        let tick = self.shared.last_tick.get() + 1;
        self.publish(tick, &Self::standard_row(tick));
        tick
    }

    /// Writer restart: every slot's tick drops back to zero.
    pub fn restart(&self) {
        for slot in 0..MAX_BUFS {
            self.shared.write_slot_tick(slot, 0);
        }
        self.shared.next_slot.set(0);
        self.shared.last_tick.set(0);
    }

    /// The next `copies` reader copies overlap a writer update of the slot
    /// being copied.
    pub fn tear_next_copies(&self, copies: u32) {
        self.shared.tears_remaining.set(copies);
    }

    /// Row copies performed by readers so far.
    pub fn copies(&self) -> u32 {
        self.shared.copies.get()
    }

    /// Make `resource` fail to open from now on, or available again.
    pub fn set_available(&self, resource: SimResource, available: bool) {
        self.shared.available[resource.index()].set(available);
    }

    /// Times `resource` was successfully acquired.
    pub fn acquisitions(&self, resource: SimResource) -> u32 {
        self.shared.acquired[resource.index()].get()
    }

    /// Instances of `resource` currently held by readers.
    pub fn live(&self, resource: SimResource) -> u32 {
        self.shared.live[resource.index()].get()
    }

    /// Set the data-valid signal without publishing anything.
    pub fn signal(&self) {
        self.shared.pending_signal.set(true);
    }

    /// Publish `row` at `tick` as soon as a reader starts waiting.
    pub fn publish_on_wait(&self, tick: i32, row: Vec<u8>) {
        *self.shared.publish_on_wait.borrow_mut() = Some((tick, row));
    }

    /// Number of times a reader waited on the signal.
    pub fn waits(&self) -> u32 {
        self.shared.waits.get()
    }
}

/// Row length of [`SimulatedSim::standard`]
pub const STANDARD_ROW_LEN: usize = 40;

/// Variables of [`SimulatedSim::standard`]
pub fn standard_descriptors() -> Vec<VariableDescriptor> {
    let var = |name: &str, kind: VariableType, offset: usize, count: usize, unit: &str| VariableDescriptor {
        name: name.to_string(),
        kind,
        offset,
        count,
        count_as_time: false,
        description: format!("{} (simulated)", name),
        unit: unit.to_string(),
    };
    vec![
        var("Speed", VariableType::Float32, 0, 1, "m/s"),
        var("RPM", VariableType::Float32, 4, 1, "revs/min"),
        var("Gear", VariableType::Int32, 8, 1, ""),
        var("IsOnTrack", VariableType::Bool, 12, 1, ""),
        var("SessionTime", VariableType::Float64, 16, 1, "s"),
        var("CarIdxLapDistPct", VariableType::Float32, 24, 4, "%"),
    ]
}

/// [`Platform`] handing out resources backed by a [`SimulatedSim`].
pub struct SimPlatform {
    shared: Rc<SimShared>,
}

pub struct SimMapping {
    shared: Rc<SimShared>,
}

impl Drop for SimMapping {
    fn drop(&mut self) {
        self.shared.release(SimResource::Mapping);
    }
}

pub struct SimView {
    region: RawRegion,
    shared: Rc<SimShared>,
}

impl Drop for SimView {
    fn drop(&mut self) {
        self.shared.release(SimResource::View);
    }
}

impl SharedView for SimView {
    fn len(&self) -> usize {
        self.region.len()
    }

    fn read_i32(&self, offset: usize) -> Option<i32> {
        self.region.read_i32(offset)
    }

    fn copy_out(&self, offset: usize, dst: &mut [u8]) -> bool {
        let copied = self.region.copy_out(offset, dst);
        self.shared.copies.set(self.shared.copies.get() + 1);

        let tears = self.shared.tears_remaining.get();
        if copied && tears > 0 {
            self.shared.tears_remaining.set(tears - 1);
            let header = self.shared.header.get();
            if let Some(slot) = header.var_buf.iter().position(|buf| buf.buf_offset as usize == offset) {
                // writer republished this slot mid-copy
                let bumped = header.var_buf[slot].tick_count + 1;
                self.shared.write_slot_tick(slot, bumped);
                self.shared.last_tick.set(self.shared.last_tick.get().max(bumped));
            }
        }
        copied
    }

    fn bytes(&self, offset: usize, len: usize) -> Option<&[u8]> {
        self.region.bytes(offset, len)
    }
}

pub struct SimSignal {
    shared: Rc<SimShared>,
}

impl Drop for SimSignal {
    fn drop(&mut self) {
        self.shared.release(SimResource::Signal);
    }
}

impl DataSignal for SimSignal {
    fn wait(&self, timeout: Duration) -> Result<WaitResult> {
        self.shared.waits.set(self.shared.waits.get() + 1);

        if let Some((tick, row)) = self.shared.publish_on_wait.borrow_mut().take() {
            self.shared.publish(tick, &row);
            return Ok(WaitResult::Signaled);
        }
        if self.shared.pending_signal.replace(false) {
            return Ok(WaitResult::Signaled);
        }
        std::thread::sleep(timeout);
        Ok(WaitResult::Timeout)
    }
}

impl Platform for SimPlatform {
    type Mapping = SimMapping;
    type View = SimView;
    type Signal = SimSignal;

    fn open_mapping(&mut self, name: &str) -> Result<SimMapping> {
        self.shared.acquire(SimResource::Mapping, name)?;
        Ok(SimMapping { shared: Rc::clone(&self.shared) })
    }

    fn map_view(&mut self, mapping: &SimMapping) -> Result<SimView> {
        self.shared.acquire(SimResource::View, "view")?;
        Ok(SimView { region: mapping.shared.memory.region(), shared: Rc::clone(&mapping.shared) })
    }

    fn open_signal(&mut self, name: &str) -> Result<SimSignal> {
        self.shared.acquire(SimResource::Signal, name)?;
        Ok(SimSignal { shared: Rc::clone(&self.shared) })
    }
}

/// [`BroadcastTransport`] that records every command instead of sending it.
#[derive(Debug, Default)]
pub struct RecordingTransport {
    sent: RefCell<Vec<EncodedCommand>>,
}

impl RecordingTransport {
    pub fn sent(&self) -> Vec<EncodedCommand> {
        self.sent.borrow().clone()
    }
}

impl BroadcastTransport for RecordingTransport {
    fn post(&self, command: EncodedCommand) -> Result<()> {
        self.sent.borrow_mut().push(command);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simulated_layout_is_a_valid_header() {
        let sim = SimulatedSim::standard();
        let header = sim.header();
        assert!(header.validate().is_ok());
        assert_eq!(header.num_vars, 6);
        assert_eq!(header.row_len(), STANDARD_ROW_LEN);

        let region = sim.shared.memory.region();
        assert_eq!(Header::read(&region).unwrap(), header);
    }

    #[test]
    fn publish_rotates_slots_and_sets_ticks() {
        let sim = SimulatedSim::standard();
        assert_eq!(sim.publish(1, &SimulatedSim::standard_row(1)), 0);
        assert_eq!(sim.publish(2, &SimulatedSim::standard_row(2)), 1);
        assert_eq!(sim.publish(3, &SimulatedSim::standard_row(3)), 2);
        assert_eq!(sim.publish(4, &SimulatedSim::standard_row(4)), 0);
        assert_eq!(sim.header().latest_slot(), Some(0));
        assert_eq!(sim.header().var_buf[0].tick_count, 4);
    }
}
