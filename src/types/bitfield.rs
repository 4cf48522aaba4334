//! BitField type for bitfield-kind variables

use serde::{Deserialize, Serialize};

use super::irsdk_flags::{engine_warnings, session_flags};

/// Raw value of a bitfield-kind variable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BitField(pub u32);

impl BitField {
    /// Create a new BitField from a u32 value.
    pub fn new(value: u32) -> Self {
        Self(value)
    }

    /// Check if a specific bit is set.
    pub fn is_set(&self, bit: u32) -> bool {
        bit < 32 && (self.0 & (1 << bit)) != 0
    }

    /// Check if any bit of `flag` is set.
    pub fn has_flag(&self, flag: u32) -> bool {
        (self.0 & flag) != 0
    }

    /// Get the raw u32 value.
    pub fn value(&self) -> u32 {
        self.0
    }
}

impl From<i32> for BitField {
    fn from(raw: i32) -> Self {
        Self(raw as u32)
    }
}

/// True when `SessionFlags` shows the green flag.
pub fn session_green(flags: BitField) -> bool {
    flags.has_flag(session_flags::GREEN)
}

/// True when `SessionFlags` shows any caution or yellow.
pub fn session_caution(flags: BitField) -> bool {
    flags.has_flag(
        session_flags::YELLOW
            | session_flags::YELLOW_WAVING
            | session_flags::CAUTION
            | session_flags::CAUTION_WAVING,
    )
}

/// True when `SessionFlags` shows the checkered flag.
pub fn session_checkered(flags: BitField) -> bool {
    flags.has_flag(session_flags::CHECKERED)
}

/// True when `EngineWarnings` reports the pit speed limiter engaged.
pub fn pit_limiter_active(bits: BitField) -> bool {
    bits.has_flag(engine_warnings::PIT_SPEED_LIMITER)
}

/// True when `EngineWarnings` reports a mandatory repair.
pub fn engine_mandatory_repair_needed(bits: BitField) -> bool {
    bits.has_flag(engine_warnings::MAND_REP_NEEDED)
}
