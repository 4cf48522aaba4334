//! Wire encoding of broadcast commands through a caller-supplied transport

use std::cell::RefCell;

use ira_telemetry::types::broadcast::{
    BroadcastMsg, CamFocus, ChatCommandMode, PitCommandMode, ReplayPosMode, TelemCommandMode,
};
use ira_telemetry::{BroadcastTransport, Command, CommandChannel, EncodedCommand, Result, pad_car_num};

#[derive(Default)]
struct Captured(RefCell<Vec<EncodedCommand>>);

impl BroadcastTransport for Captured {
    fn post(&self, command: EncodedCommand) -> Result<()> {
        self.0.borrow_mut().push(command);
        Ok(())
    }
}

#[test]
fn catalogue_commands_reach_the_transport() {
    let channel = CommandChannel::new(Captured::default());

    channel.send(&Command::pit(PitCommandMode::Fuel, 20)).unwrap();
    channel.send(&Command::chat(ChatCommandMode::Macro, 3)).unwrap();
    channel.send(&Command::telemetry(TelemCommandMode::Restart)).unwrap();
    channel.send(&Command::replay_set_play_position(ReplayPosMode::Begin, 70_000)).unwrap();

    let sent = channel.transport().0.borrow().clone();
    assert_eq!(sent.len(), 4);

    assert_eq!(sent[0].wparam, (2 << 16) | BroadcastMsg::PitCommand as u32);
    assert_eq!(sent[0].lparam, 20);
    assert_eq!(sent[1].wparam, BroadcastMsg::ChatCommand as u32);
    assert_eq!(sent[1].shorts(), (3, 0));
    assert_eq!(sent[2].kind(), Some(BroadcastMsg::TelemCommand));
    assert_eq!(sent[2].first_param(), 2);
    assert_eq!(sent[3].lparam, 70_000);
}

#[test]
fn camera_targets_encode_negative_codes() {
    let encoded = Command::cam_focus(CamFocus::Leader, 4, 0).encode();
    assert_eq!(encoded.kind(), Some(BroadcastMsg::CamSwitchPos));
    assert_eq!(encoded.first_param(), CamFocus::Leader as i16);
    assert_eq!(encoded.wparam >> 16, 0xFFFF & (CamFocus::Leader as i32 as u32));
    assert_eq!(encoded.shorts(), (4, 0));
}

#[test]
fn padded_car_numbers() {
    assert_eq!(pad_car_num(7, 0), 7);
    assert_eq!(pad_car_num(7, 1), 2007);
    assert_eq!(pad_car_num(7, 2), 3007);
    assert_eq!(pad_car_num(42, 1), 3042);

    let encoded = Command::cam_switch_num(pad_car_num(7, 2), 1, 2).encode();
    assert_eq!(encoded.first_param(), 3007);
    assert_eq!(encoded.shorts(), (1, 2));
}

#[test]
fn raw_sends_use_the_same_encoding() {
    let channel = CommandChannel::new(Captured::default());
    channel.send_shorts(BroadcastMsg::ReplaySetPlaySpeed, 8, 1, 0).unwrap();
    channel.send_float(BroadcastMsg::FfbCommand, 0, 12.5).unwrap();
    channel.send_int(BroadcastMsg::ReplaySearchSessionTime, 2, 93_500).unwrap();

    let sent = channel.transport().0.borrow().clone();
    assert_eq!(sent[0], Command::replay_set_play_speed(8, true).encode());
    assert_eq!(sent[1], Command::ffb_max_force(12.5).encode());
    assert_eq!(sent[1].lparam, 819_200);
    assert_eq!(sent[2], Command::replay_search_session_time(2, 93_500).encode());
}
