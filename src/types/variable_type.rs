//! Scalar kinds carried in snapshot rows

use serde::{Deserialize, Serialize};

/// Scalar kinds a variable descriptor can declare.
/// Maps to the SDK's `irsdk_VarType` enum; the discriminants are the wire values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(i32)]
pub enum VariableType {
    /// 8-bit character (irsdk_char)
    Char = 0,
    /// Boolean stored in one byte (irsdk_bool)
    Bool = 1,
    /// 32-bit signed integer (irsdk_int)
    Int32 = 2,
    /// 32-bit bitfield (irsdk_bitField)
    BitField = 3,
    /// 32-bit floating point (irsdk_float)
    Float32 = 4,
    /// 64-bit floating point (irsdk_double)
    Float64 = 5,
}

/// Byte widths indexed by wire value, mirroring `irsdk_VarTypeBytes`.
pub const VAR_TYPE_BYTES: [usize; 6] = [1, 1, 4, 4, 4, 8];

impl VariableType {
    /// All kinds in wire order.
    pub const ALL: [VariableType; 6] = [
        VariableType::Char,
        VariableType::Bool,
        VariableType::Int32,
        VariableType::BitField,
        VariableType::Float32,
        VariableType::Float64,
    ];

    /// Returns the size in bytes of one element of this kind.
    pub const fn size(&self) -> usize {
        VAR_TYPE_BYTES[*self as usize]
    }

    /// Decode the wire value stored in a variable descriptor.
    pub fn from_wire(value: i32) -> Option<Self> {
        usize::try_from(value).ok().and_then(|idx| Self::ALL.get(idx).copied())
    }

    /// The wire value of this kind.
    pub const fn wire_value(&self) -> i32 {
        *self as i32
    }
}
