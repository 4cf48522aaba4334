//! Outbound broadcast message catalogue
//!
//! Message kinds and their mode parameters as understood by the simulator.
//! Discriminants are the values sent on the wire.

use serde::{Deserialize, Serialize};

/// Kind of a broadcast command (`irsdk_BroadcastMsg`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u16)]
pub enum BroadcastMsg {
    /// car position, group, camera
    CamSwitchPos = 0,
    /// padded car number, group, camera
    CamSwitchNum = 1,
    /// camera state bits
    CamSetState = 2,
    /// speed, slow motion
    ReplaySetPlaySpeed = 3,
    /// position mode, frame number (32 bit)
    ReplaySetPlayPosition = 4,
    /// search mode
    ReplaySearch = 5,
    /// state mode
    ReplaySetState = 6,
    /// reload mode, car index
    ReloadTextures = 7,
    /// chat mode, macro number
    ChatCommand = 8,
    /// pit mode, parameter
    PitCommand = 9,
    /// telemetry recording mode
    TelemCommand = 10,
    /// force feedback mode, value (Q16 float)
    FfbCommand = 11,
    /// session number, session time in ms (32 bit)
    ReplaySearchSessionTime = 12,
    /// capture mode
    VideoCapture = 13,
}

impl BroadcastMsg {
    /// Decode a wire value; anything past the catalogue is rejected.
    pub fn from_wire(value: u16) -> Option<Self> {
        use BroadcastMsg::*;
        const ALL: [BroadcastMsg; 14] = [
            CamSwitchPos,
            CamSwitchNum,
            CamSetState,
            ReplaySetPlaySpeed,
            ReplaySetPlayPosition,
            ReplaySearch,
            ReplaySetState,
            ReloadTextures,
            ChatCommand,
            PitCommand,
            TelemCommand,
            FfbCommand,
            ReplaySearchSessionTime,
            VideoCapture,
        ];
        ALL.get(usize::from(value)).copied()
    }
}

/// Special camera targets for [`BroadcastMsg::CamSwitchPos`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(i32)]
pub enum CamFocus {
    Incident = -3,
    Leader = -2,
    Exiting = -1,
    Driver = 0,
}

/// Camera state bits for [`BroadcastMsg::CamSetState`].
pub mod camera_state {
    pub const IS_SESSION_SCREEN: i32 = 0x0001;
    pub const IS_SCENIC_ACTIVE: i32 = 0x0002;
    pub const CAM_TOOL_ACTIVE: i32 = 0x0004;
    pub const UI_HIDDEN: i32 = 0x0008;
    pub const USE_AUTO_SHOT_SELECTION: i32 = 0x0010;
    pub const USE_TEMPORARY_EDITS: i32 = 0x0020;
    pub const USE_KEY_ACCELERATION: i32 = 0x0040;
    pub const USE_KEY_10X_ACCELERATION: i32 = 0x0080;
    pub const USE_MOUSE_AIM_MODE: i32 = 0x0100;
}

/// Position reference for [`BroadcastMsg::ReplaySetPlayPosition`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(i32)]
pub enum ReplayPosMode {
    Begin = 0,
    Current = 1,
    End = 2,
}

/// Search target for [`BroadcastMsg::ReplaySearch`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(i32)]
pub enum ReplaySearchMode {
    ToStart = 0,
    ToEnd = 1,
    PrevSession = 2,
    NextSession = 3,
    PrevLap = 4,
    NextLap = 5,
    PrevFrame = 6,
    NextFrame = 7,
    PrevIncident = 8,
    NextIncident = 9,
}

/// State change for [`BroadcastMsg::ReplaySetState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(i32)]
pub enum ReplayStateMode {
    /// Clear any data in the replay tape
    EraseTape = 0,
}

/// Scope for [`BroadcastMsg::ReloadTextures`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(i32)]
pub enum ReloadTexturesMode {
    All = 0,
    CarIdx = 1,
}

/// Chat action for [`BroadcastMsg::ChatCommand`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(i32)]
pub enum ChatCommandMode {
    /// Pass in a macro number from 1 to 15
    Macro = 0,
    BeginChat = 1,
    Reply = 2,
    Cancel = 3,
}

/// Pit action for [`BroadcastMsg::PitCommand`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(i32)]
pub enum PitCommandMode {
    /// Clear all pit checkboxes
    Clear = 0,
    /// Clean the windshield
    Windshield = 1,
    /// Add fuel, parameter is liters (0 keeps the current amount)
    Fuel = 2,
    /// Change tire, parameter is pressure in kPa (0 keeps the current pressure)
    LeftFront = 3,
    RightFront = 4,
    LeftRear = 5,
    RightRear = 6,
    ClearTires = 7,
    /// Request a fast repair
    FastRepair = 8,
    ClearWindshield = 9,
    ClearFastRepair = 10,
    ClearFuel = 11,
    /// Change all tire compounds, parameter is the compound index
    TireCompound = 12,
}

/// Recording action for [`BroadcastMsg::TelemCommand`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(i32)]
pub enum TelemCommandMode {
    Stop = 0,
    Start = 1,
    Restart = 2,
}

/// Force feedback setting for [`BroadcastMsg::FfbCommand`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(i32)]
pub enum FfbCommandMode {
    /// Max force in Nm when auto-scaling is off
    MaxForce = 0,
}

/// Action for [`BroadcastMsg::VideoCapture`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(i32)]
pub enum VideoCaptureMode {
    TriggerScreenShot = 0,
    StartVideoCapture = 1,
    EndVideoCapture = 2,
    ToggleVideoCapture = 3,
    ShowVideoTimer = 4,
    HideVideoTimer = 5,
}
