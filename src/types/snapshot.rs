//! Snapshot rows and bounds-checked typed extraction

use super::{BitField, VarData, VariableDescriptor};
use crate::{Result, TelemetryError};

/// One self-consistent telemetry row.
///
/// A `Snapshot` is caller-owned and only ever filled by an accepted verified
/// copy, so its bytes always belong to a single published tick. An empty
/// snapshot (`tick() == None`) has never received a row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    data: Vec<u8>,
    tick: Option<i32>,
}

impl Snapshot {
    /// An empty snapshot ready to be passed to a poll.
    pub fn new() -> Self {
        Self::default()
    }

    /// Tick of the row held, `None` before the first accepted copy.
    pub fn tick(&self) -> Option<i32> {
        self.tick
    }

    /// Raw row bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Row length in bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the snapshot holds no row.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Take ownership of a consistent row copied into `row`.
    ///
    /// The previous contents are swapped back into `row` so the caller can
    /// reuse the allocation for the next copy.
    pub(crate) fn accept(&mut self, row: &mut Vec<u8>, tick: i32) {
        std::mem::swap(&mut self.data, row);
        self.tick = Some(tick);
    }

    #[cfg(test)]
    pub(crate) fn from_row(data: Vec<u8>, tick: i32) -> Self {
        Self { data, tick: Some(tick) }
    }

    /// Bytes of the `index`-th element of width `width` at `offset`.
    ///
    /// Requires `offset + width * (index + 1) <= len()`.
    fn element(&self, offset: usize, width: usize, index: usize) -> Result<&[u8]> {
        let start = index
            .checked_mul(width)
            .and_then(|rel| offset.checked_add(rel))
            .ok_or_else(|| TelemetryError::memory_access_error(offset))?;
        let end = start.checked_add(width).ok_or_else(|| TelemetryError::memory_access_error(start))?;
        self.data.get(start..end).ok_or_else(|| TelemetryError::memory_access_error(start))
    }

    /// Read element `index` at `offset` as `T` without checking the declared kind.
    pub fn read<T: VarData>(&self, offset: usize, index: usize) -> Result<T> {
        self.element(offset, T::WIDTH, index).map(T::decode)
    }

    /// Read a one-byte boolean.
    pub fn read_bool(&self, offset: usize, index: usize) -> Result<bool> {
        self.read(offset, index)
    }

    /// Read a 32-bit signed integer.
    pub fn read_int(&self, offset: usize, index: usize) -> Result<i32> {
        self.read(offset, index)
    }

    /// Read a 32-bit float.
    pub fn read_float(&self, offset: usize, index: usize) -> Result<f32> {
        self.read(offset, index)
    }

    /// Read a 64-bit float.
    pub fn read_double(&self, offset: usize, index: usize) -> Result<f64> {
        self.read(offset, index)
    }

    /// Read a 32-bit bitfield.
    pub fn read_bitfield(&self, offset: usize, index: usize) -> Result<BitField> {
        self.read(offset, index)
    }

    /// Read a raw character byte.
    pub fn read_char(&self, offset: usize, index: usize) -> Result<u8> {
        self.read(offset, index)
    }

    /// Read element `index` of `var`, checking its declared kind and count.
    pub fn value<T: VarData>(&self, var: &VariableDescriptor, index: usize) -> Result<T> {
        if !T::accepts(var.kind) {
            return Err(TelemetryError::TypeConversion {
                details: format!(
                    "'{}' is declared {:?}, cannot read as {}",
                    var.name,
                    var.kind,
                    std::any::type_name::<T>()
                ),
            });
        }
        if index >= var.count {
            return Err(TelemetryError::TypeConversion {
                details: format!("'{}' has {} elements, index {} requested", var.name, var.count, index),
            });
        }
        self.read(var.offset, index)
    }

    /// Read every element of `var`.
    pub fn values<T: VarData>(&self, var: &VariableDescriptor) -> Result<Vec<T>> {
        (0..var.count).map(|index| self.value(var, index)).collect()
    }
}
