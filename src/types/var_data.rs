//! Variable data decoding trait and implementations

use super::{BitField, VariableType};

/// Trait for scalar types that can be decoded from one element of a row.
pub trait VarData: Sized + Copy {
    /// Width of one element in bytes.
    const WIDTH: usize;

    /// Whether a variable declared with `kind` may be read as this type.
    fn accepts(kind: VariableType) -> bool;

    /// Decode from exactly [`Self::WIDTH`] little-endian bytes.
    fn decode(bytes: &[u8]) -> Self;
}

fn array<const N: usize>(bytes: &[u8]) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(&bytes[..N]);
    out
}

impl VarData for bool {
    const WIDTH: usize = 1;

    fn accepts(kind: VariableType) -> bool {
        kind == VariableType::Bool
    }

    fn decode(bytes: &[u8]) -> Self {
        bytes[0] != 0
    }
}

impl VarData for u8 {
    const WIDTH: usize = 1;

    fn accepts(kind: VariableType) -> bool {
        matches!(kind, VariableType::Char | VariableType::Bool)
    }

    fn decode(bytes: &[u8]) -> Self {
        bytes[0]
    }
}

impl VarData for i32 {
    const WIDTH: usize = 4;

    fn accepts(kind: VariableType) -> bool {
        matches!(kind, VariableType::Int32 | VariableType::BitField)
    }

    fn decode(bytes: &[u8]) -> Self {
        i32::from_le_bytes(array(bytes))
    }
}

impl VarData for BitField {
    const WIDTH: usize = 4;

    fn accepts(kind: VariableType) -> bool {
        kind == VariableType::BitField
    }

    fn decode(bytes: &[u8]) -> Self {
        BitField(u32::from_le_bytes(array(bytes)))
    }
}

impl VarData for f32 {
    const WIDTH: usize = 4;

    fn accepts(kind: VariableType) -> bool {
        kind == VariableType::Float32
    }

    fn decode(bytes: &[u8]) -> Self {
        f32::from_le_bytes(array(bytes))
    }
}

impl VarData for f64 {
    const WIDTH: usize = 8;

    fn accepts(kind: VariableType) -> bool {
        kind == VariableType::Float64
    }

    fn decode(bytes: &[u8]) -> Self {
        f64::from_le_bytes(array(bytes))
    }
}
