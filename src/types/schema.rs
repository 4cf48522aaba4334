//! Variable descriptor type

use serde::{Deserialize, Serialize};

use super::VariableType;

/// Schema entry describing one named field of a snapshot row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariableDescriptor {
    /// Variable name as published by the simulator
    pub name: String,
    /// Declared scalar kind
    pub kind: VariableType,
    /// Byte offset within the row
    pub offset: usize,
    /// Number of elements (1 for scalars)
    pub count: usize,
    /// Whether the simulator treats the element count as elapsed time
    pub count_as_time: bool,
    /// Human-readable description (informational only)
    pub description: String,
    /// Units of measurement (informational only)
    pub unit: String,
}

impl VariableDescriptor {
    /// Total bytes occupied by every element of this variable.
    pub fn byte_len(&self) -> usize {
        self.kind.size().saturating_mul(self.count)
    }

    /// Whether the variable holds more than one element.
    pub fn is_array(&self) -> bool {
        self.count > 1
    }

    /// Ensure the variable fits a row of `row_len` bytes.
    pub fn check_fits(&self, row_len: usize) -> crate::Result<()> {
        match self.offset.checked_add(self.byte_len()) {
            Some(end) if end <= row_len => Ok(()),
            _ => Err(crate::TelemetryError::Memory { offset: self.offset, source: None }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(kind: VariableType, offset: usize, count: usize) -> VariableDescriptor {
        VariableDescriptor {
            name: "CarIdxLapDistPct".to_string(),
            kind,
            offset,
            count,
            count_as_time: false,
            description: "Percentage distance around lap by car index".to_string(),
            unit: "%".to_string(),
        }
    }

    #[test]
    fn byte_len_accounts_for_arrays() {
        assert_eq!(descriptor(VariableType::Float32, 0, 64).byte_len(), 256);
        assert_eq!(descriptor(VariableType::Float64, 0, 1).byte_len(), 8);
        assert!(descriptor(VariableType::Float32, 0, 64).is_array());
    }

    #[test]
    fn fit_check_rejects_overhang() {
        assert!(descriptor(VariableType::Float32, 4, 2).check_fits(12).is_ok());
        assert!(descriptor(VariableType::Float32, 8, 2).check_fits(12).is_err());
        assert!(descriptor(VariableType::Float32, usize::MAX, 2).check_fits(12).is_err());
    }
}
