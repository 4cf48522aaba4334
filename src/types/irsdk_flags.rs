//! Constants and enums for interpreting simulator telemetry values
//!
//! Bit constants for `SessionFlags`, `EngineWarnings`, `PitSvFlags` and the
//! header status word, plus the enumerated telemetry values (session state,
//! track location, spotter, pit service status, pace mode, track wetness).

use serde::{Deserialize, Serialize};

/// Header status word bits.
pub mod status {
    /// Simulator is actively connected and publishing rows.
    pub const CONNECTED: i32 = 0x1;
}

/// `EngineWarnings` bits.
pub mod engine_warnings {
    pub const WATER_TEMP_WARNING: u32 = 0x0001;
    pub const FUEL_PRESSURE_WARNING: u32 = 0x0002;
    pub const OIL_PRESSURE_WARNING: u32 = 0x0004;
    pub const ENGINE_STALLED: u32 = 0x0008;
    pub const PIT_SPEED_LIMITER: u32 = 0x0010;
    pub const REV_LIMITER_ACTIVE: u32 = 0x0020;
    pub const OIL_TEMP_WARNING: u32 = 0x0040;
    pub const MAND_REP_NEEDED: u32 = 0x0080;
    pub const OPT_REP_NEEDED: u32 = 0x0100;
}

/// `SessionFlags` bits.
pub mod session_flags {
    // global flags
    pub const CHECKERED: u32 = 0x0000_0001;
    pub const WHITE: u32 = 0x0000_0002;
    pub const GREEN: u32 = 0x0000_0004;
    pub const YELLOW: u32 = 0x0000_0008;
    pub const RED: u32 = 0x0000_0010;
    pub const BLUE: u32 = 0x0000_0020;
    pub const DEBRIS: u32 = 0x0000_0040;
    pub const CROSSED: u32 = 0x0000_0080;
    pub const YELLOW_WAVING: u32 = 0x0000_0100;
    pub const ONE_LAP_TO_GREEN: u32 = 0x0000_0200;
    pub const GREEN_HELD: u32 = 0x0000_0400;
    pub const TEN_TO_GO: u32 = 0x0000_0800;
    pub const FIVE_TO_GO: u32 = 0x0000_1000;
    pub const RANDOM_WAVING: u32 = 0x0000_2000;
    pub const CAUTION: u32 = 0x0000_4000;
    pub const CAUTION_WAVING: u32 = 0x0000_8000;

    // driver black flags
    pub const BLACK: u32 = 0x0001_0000;
    pub const DISQUALIFY: u32 = 0x0002_0000;
    pub const SERVICIBLE: u32 = 0x0004_0000;
    pub const FURLED: u32 = 0x0008_0000;
    pub const REPAIR: u32 = 0x0010_0000;
    pub const DQ_SCORING_INVALID: u32 = 0x0020_0000;

    // start lights
    pub const START_HIDDEN: u32 = 0x1000_0000;
    pub const START_READY: u32 = 0x2000_0000;
    pub const START_SET: u32 = 0x4000_0000;
    pub const START_GO: u32 = 0x8000_0000;
}

/// `PitSvFlags` bits.
pub mod pit_service_flags {
    pub const LF_TIRE_CHANGE: u32 = 0x0001;
    pub const RF_TIRE_CHANGE: u32 = 0x0002;
    pub const LR_TIRE_CHANGE: u32 = 0x0004;
    pub const RR_TIRE_CHANGE: u32 = 0x0008;
    pub const FUEL_FILL: u32 = 0x0010;
    pub const WINDSHIELD_TEAROFF: u32 = 0x0020;
    pub const FAST_REPAIR: u32 = 0x0040;
}

/// Declares a wire enum with a fallible conversion from its raw integer.
macro_rules! wire_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident { $($variant:ident = $value:expr),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[repr(i32)]
        pub enum $name {
            $($variant = $value),+
        }

        impl TryFrom<i32> for $name {
            type Error = crate::TelemetryError;

            fn try_from(raw: i32) -> crate::Result<Self> {
                match raw {
                    $(v if v == $value => Ok($name::$variant),)+
                    other => Err(crate::TelemetryError::TypeConversion {
                        details: format!("{} has no variant for {}", stringify!($name), other),
                    }),
                }
            }
        }
    };
}

wire_enum! {
    /// `SessionState` telemetry value.
    pub enum SessionState {
        Invalid = 0,
        GetInCar = 1,
        Warmup = 2,
        ParadeLaps = 3,
        Racing = 4,
        Checkered = 5,
        CoolDown = 6,
    }
}

wire_enum! {
    /// `CarIdxTrackSurface` / `PlayerTrackSurface` location value.
    pub enum TrackLocation {
        NotInWorld = -1,
        OffTrack = 0,
        InPitStall = 1,
        ApproachingPits = 2,
        OnTrack = 3,
    }
}

wire_enum! {
    /// `CarIdxTrackSurfaceMaterial` value.
    pub enum TrackSurface {
        NotInWorld = -1,
        Undefined = 0,
        Asphalt1 = 1,
        Asphalt2 = 2,
        Asphalt3 = 3,
        Asphalt4 = 4,
        Concrete1 = 5,
        Concrete2 = 6,
        RacingDirt1 = 7,
        RacingDirt2 = 8,
        Paint1 = 9,
        Paint2 = 10,
        Rumble1 = 11,
        Rumble2 = 12,
        Rumble3 = 13,
        Rumble4 = 14,
        Grass1 = 15,
        Grass2 = 16,
        Grass3 = 17,
        Grass4 = 18,
        Dirt1 = 19,
        Dirt2 = 20,
        Dirt3 = 21,
        Dirt4 = 22,
        Sand = 23,
        Gravel1 = 24,
        Gravel2 = 25,
        Grasscrete = 26,
        Astroturf = 27,
    }
}

wire_enum! {
    /// `CarLeftRight` spotter value.
    pub enum CarLeftRight {
        Off = 0,
        Clear = 1,
        CarLeft = 2,
        CarRight = 3,
        CarLeftRight = 4,
        TwoCarsLeft = 5,
        TwoCarsRight = 6,
    }
}

wire_enum! {
    /// `PlayerCarPitSvStatus` value.
    pub enum PitServiceStatus {
        None = 0,
        InProgress = 1,
        Complete = 2,
        TooFarLeft = 100,
        TooFarRight = 101,
        TooFarForward = 102,
        TooFarBack = 103,
        BadAngle = 104,
        CantFixThat = 105,
    }
}

wire_enum! {
    /// `PaceMode` value.
    pub enum PaceMode {
        SingleFileStart = 0,
        DoubleFileStart = 1,
        SingleFileRestart = 2,
        DoubleFileRestart = 3,
        NotPacing = 4,
    }
}

wire_enum! {
    /// `TrackWetness` value.
    pub enum TrackWetness {
        Unknown = 0,
        Dry = 1,
        MostlyDry = 2,
        VeryLightlyWet = 3,
        LightlyWet = 4,
        ModeratelyWet = 5,
        VeryWet = 6,
        ExtremelyWet = 7,
    }
}
