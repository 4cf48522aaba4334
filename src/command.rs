//! Outbound commands to the simulator
//!
//! Commands travel as a system-wide broadcast carrying two integers:
//!
//! - `wparam` packs the message kind (low 16 bits) and the first parameter
//!   (high 16 bits);
//! - `lparam` is two packed 16-bit parameters, a raw 32-bit integer, or a
//!   float in Q16 fixed point, depending on which send shape was used.
//!
//! Delivery is fire-and-forget: there is no acknowledgment and no retry.
//!
//! ```rust
//! use ira_telemetry::command::{Command, EncodedCommand};
//! use ira_telemetry::types::broadcast::{BroadcastMsg, PitCommandMode};
//!
//! let encoded = Command::pit(PitCommandMode::Fuel, 20).encode();
//! assert_eq!(encoded.kind(), Some(BroadcastMsg::PitCommand));
//! assert_eq!(encoded.first_param(), PitCommandMode::Fuel as i16);
//! assert_eq!(encoded.shorts(), (20, 0));
//! ```

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::Result;
use crate::types::broadcast::{
    BroadcastMsg, CamFocus, ChatCommandMode, FfbCommandMode, PitCommandMode, ReloadTexturesMode,
    ReplayPosMode, ReplaySearchMode, ReplayStateMode, TelemCommandMode, VideoCaptureMode,
};

/// Scale of the Q16 fixed point encoding
pub const Q16_ONE: f32 = 65536.0;

/// Parameters of a command, by wire shape.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum CommandArgs {
    /// First parameter plus two 16-bit parameters
    Shorts(i32, i32, i32),
    /// First parameter plus a 32-bit integer
    Int(i32, i32),
    /// First parameter plus a Q16 encoded float
    Float(i32, f32),
}

/// A command from the broadcast catalogue.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Command {
    pub kind: BroadcastMsg,
    pub args: CommandArgs,
}

/// The two wire fields of a broadcast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EncodedCommand {
    pub wparam: u32,
    pub lparam: i32,
}

fn make_long(low: i32, high: i32) -> u32 {
    (low as u32 & 0xFFFF) | ((high as u32 & 0xFFFF) << 16)
}

/// Encode `value` as Q16 fixed point, truncating toward zero.
pub fn to_q16(value: f32) -> i32 {
    (value * Q16_ONE) as i32
}

pub fn from_q16(raw: i32) -> f32 {
    raw as f32 / Q16_ONE
}

impl EncodedCommand {
    pub fn from_shorts(kind: BroadcastMsg, var1: i32, var2: i32, var3: i32) -> Self {
        Self::from_int(kind, var1, make_long(var2, var3) as i32)
    }

    pub fn from_int(kind: BroadcastMsg, var1: i32, var2: i32) -> Self {
        Self { wparam: make_long(kind as u16 as i32, var1), lparam: var2 }
    }

    pub fn from_float(kind: BroadcastMsg, var1: i32, var2: f32) -> Self {
        Self::from_int(kind, var1, to_q16(var2))
    }

    /// Message kind, `None` outside the catalogue.
    pub fn kind(&self) -> Option<BroadcastMsg> {
        BroadcastMsg::from_wire((self.wparam & 0xFFFF) as u16)
    }

    pub fn first_param(&self) -> i16 {
        (self.wparam >> 16) as u16 as i16
    }

    /// `lparam` read as two packed 16-bit parameters.
    pub fn shorts(&self) -> (i16, i16) {
        let raw = self.lparam as u32;
        ((raw & 0xFFFF) as u16 as i16, (raw >> 16) as u16 as i16)
    }

    /// `lparam` read as a Q16 float.
    pub fn float_param(&self) -> f32 {
        from_q16(self.lparam)
    }
}

impl Command {
    pub fn new(kind: BroadcastMsg, args: CommandArgs) -> Self {
        Self { kind, args }
    }

    pub fn encode(&self) -> EncodedCommand {
        match self.args {
            CommandArgs::Shorts(var1, var2, var3) => EncodedCommand::from_shorts(self.kind, var1, var2, var3),
            CommandArgs::Int(var1, var2) => EncodedCommand::from_int(self.kind, var1, var2),
            CommandArgs::Float(var1, var2) => EncodedCommand::from_float(self.kind, var1, var2),
        }
    }

    fn shorts(kind: BroadcastMsg, var1: i32, var2: i32, var3: i32) -> Self {
        Self::new(kind, CommandArgs::Shorts(var1, var2, var3))
    }

    /// Focus the camera on a race position, or a special target.
    pub fn cam_switch_pos(position: i32, group: i32, camera: i32) -> Self {
        Self::shorts(BroadcastMsg::CamSwitchPos, position, group, camera)
    }

    pub fn cam_focus(focus: CamFocus, group: i32, camera: i32) -> Self {
        Self::cam_switch_pos(focus as i32, group, camera)
    }

    /// Focus the camera on a car number; see [`pad_car_num`].
    pub fn cam_switch_num(car_num: i32, group: i32, camera: i32) -> Self {
        Self::shorts(BroadcastMsg::CamSwitchNum, car_num, group, camera)
    }

    /// Set camera state bits from [`camera_state`](crate::types::broadcast::camera_state).
    pub fn cam_set_state(state: i32) -> Self {
        Self::shorts(BroadcastMsg::CamSetState, state, 0, 0)
    }

    pub fn replay_set_play_speed(speed: i32, slow_motion: bool) -> Self {
        Self::shorts(BroadcastMsg::ReplaySetPlaySpeed, speed, i32::from(slow_motion), 0)
    }

    pub fn replay_set_play_position(mode: ReplayPosMode, frame: i32) -> Self {
        Self::new(BroadcastMsg::ReplaySetPlayPosition, CommandArgs::Int(mode as i32, frame))
    }

    pub fn replay_search(mode: ReplaySearchMode) -> Self {
        Self::shorts(BroadcastMsg::ReplaySearch, mode as i32, 0, 0)
    }

    pub fn replay_set_state(mode: ReplayStateMode) -> Self {
        Self::shorts(BroadcastMsg::ReplaySetState, mode as i32, 0, 0)
    }

    pub fn replay_search_session_time(session_num: i32, session_time_ms: i32) -> Self {
        Self::new(BroadcastMsg::ReplaySearchSessionTime, CommandArgs::Int(session_num, session_time_ms))
    }

    pub fn reload_textures(mode: ReloadTexturesMode, car_idx: i32) -> Self {
        Self::shorts(BroadcastMsg::ReloadTextures, mode as i32, car_idx, 0)
    }

    /// Chat action; `macro_num` is only used by [`ChatCommandMode::Macro`].
    pub fn chat(mode: ChatCommandMode, macro_num: i32) -> Self {
        Self::shorts(BroadcastMsg::ChatCommand, mode as i32, macro_num, 0)
    }

    /// Pit action; `param` is liters, kPa or a compound index depending on `mode`.
    pub fn pit(mode: PitCommandMode, param: i32) -> Self {
        Self::shorts(BroadcastMsg::PitCommand, mode as i32, param, 0)
    }

    pub fn telemetry(mode: TelemCommandMode) -> Self {
        Self::shorts(BroadcastMsg::TelemCommand, mode as i32, 0, 0)
    }

    /// Force feedback max force in Nm.
    pub fn ffb_max_force(newton_meters: f32) -> Self {
        Self::new(BroadcastMsg::FfbCommand, CommandArgs::Float(FfbCommandMode::MaxForce as i32, newton_meters))
    }

    pub fn video_capture(mode: VideoCaptureMode) -> Self {
        Self::shorts(BroadcastMsg::VideoCapture, mode as i32, 0, 0)
    }
}

/// Pad a car number with leading zeros for [`Command::cam_switch_num`].
///
/// The simulator distinguishes car "01" from car "1" by adding
/// `1000 * (digits + zeros)` to the number.
pub fn pad_car_num(num: i32, zeros: i32) -> i32 {
    if zeros == 0 {
        return num;
    }
    let digits = match num {
        n if n > 99 => 3,
        n if n > 9 => 2,
        _ => 1,
    };
    num + 1000 * (digits + zeros)
}

/// One-way delivery of encoded commands.
pub trait BroadcastTransport {
    fn post(&self, command: EncodedCommand) -> Result<()>;
}

/// Sends commands through a [`BroadcastTransport`].
#[derive(Debug)]
pub struct CommandChannel<T: BroadcastTransport> {
    transport: T,
}

impl<T: BroadcastTransport> CommandChannel<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn send(&self, command: &Command) -> Result<()> {
        self.post(command.encode())
    }

    pub fn send_shorts(&self, kind: BroadcastMsg, var1: i32, var2: i32, var3: i32) -> Result<()> {
        self.post(EncodedCommand::from_shorts(kind, var1, var2, var3))
    }

    pub fn send_int(&self, kind: BroadcastMsg, var1: i32, var2: i32) -> Result<()> {
        self.post(EncodedCommand::from_int(kind, var1, var2))
    }

    pub fn send_float(&self, kind: BroadcastMsg, var1: i32, var2: f32) -> Result<()> {
        self.post(EncodedCommand::from_float(kind, var1, var2))
    }

    fn post(&self, encoded: EncodedCommand) -> Result<()> {
        trace!(kind = ?encoded.kind(), wparam = encoded.wparam, lparam = encoded.lparam, "Broadcasting command");
        self.transport.post(encoded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::RecordingTransport;
    use proptest::prelude::*;

    #[test]
    fn wparam_packs_kind_and_first_param() {
        let encoded = Command::cam_switch_pos(3, 10, 2).encode();
        assert_eq!(encoded.wparam, 3 << 16);
        assert_eq!(encoded.lparam, 10 | (2 << 16));
        assert_eq!(encoded.kind(), Some(BroadcastMsg::CamSwitchPos));
        assert_eq!(encoded.first_param(), 3);
        assert_eq!(encoded.shorts(), (10, 2));
    }

    #[test]
    fn negative_shorts_survive_packing() {
        let encoded = Command::cam_focus(CamFocus::Leader, -1, 0).encode();
        assert_eq!(encoded.first_param(), -2);
        assert_eq!(encoded.shorts(), (-1, 0));
    }

    #[test]
    fn int_and_float_shapes() {
        let encoded = Command::replay_search_session_time(2, 1_234_567).encode();
        assert_eq!(encoded.kind(), Some(BroadcastMsg::ReplaySearchSessionTime));
        assert_eq!(encoded.first_param(), 2);
        assert_eq!(encoded.lparam, 1_234_567);

        let encoded = Command::ffb_max_force(12.5).encode();
        assert_eq!(encoded.kind(), Some(BroadcastMsg::FfbCommand));
        assert_eq!(encoded.lparam, 819_200);
        assert_eq!(encoded.float_param(), 12.5);
    }

    #[test]
    fn q16_truncates_toward_zero() {
        assert_eq!(to_q16(1.0), 65536);
        assert_eq!(to_q16(-0.5), -32768);
        assert_eq!(to_q16(1.0 / 131072.0), 0);
    }

    #[test]
    fn car_number_padding() {
        assert_eq!(pad_car_num(7, 0), 7);
        assert_eq!(pad_car_num(1, 1), 2001);
        assert_eq!(pad_car_num(12, 1), 3012);
        assert_eq!(pad_car_num(5, 2), 3005);
        assert_eq!(pad_car_num(123, 1), 4123);
    }

    #[test]
    fn channel_posts_every_shape() {
        let channel = CommandChannel::new(RecordingTransport::default());
        channel.send(&Command::pit(PitCommandMode::Fuel, 40)).unwrap();
        channel.send_int(BroadcastMsg::ReplaySetPlayPosition, ReplayPosMode::Begin as i32, 900).unwrap();
        channel.send_float(BroadcastMsg::FfbCommand, 0, 2.25).unwrap();
        channel.send_shorts(BroadcastMsg::VideoCapture, VideoCaptureMode::TriggerScreenShot as i32, 0, 0).unwrap();

        let sent = channel.transport().sent();
        assert_eq!(sent.len(), 4);
        assert_eq!(sent[0].kind(), Some(BroadcastMsg::PitCommand));
        assert_eq!(sent[0].shorts(), (40, 0));
        assert_eq!(sent[1].lparam, 900);
        assert_eq!(sent[2].float_param(), 2.25);
        assert_eq!(sent[3].kind(), Some(BroadcastMsg::VideoCapture));
    }

    proptest! {
        #[test]
        fn q16_round_trip_within_resolution(value in -30_000.0f32..30_000.0f32) {
            let decoded = from_q16(to_q16(value));
            // f32 carries 24 bits of mantissa, so large magnitudes lose more than 1/65536
            let tolerance = (1.0 / Q16_ONE).max(value.abs() * f32::EPSILON * 2.0);
            prop_assert!((decoded - value).abs() <= tolerance, "{} -> {}", value, decoded);
        }

        #[test]
        fn shorts_round_trip(var1 in any::<i16>(), var2 in any::<i16>(), var3 in any::<i16>()) {
            let encoded = EncodedCommand::from_shorts(BroadcastMsg::ReplaySearch, var1.into(), var2.into(), var3.into());
            prop_assert_eq!(encoded.first_param(), var1);
            prop_assert_eq!(encoded.shorts(), (var2, var3));
        }
    }
}
