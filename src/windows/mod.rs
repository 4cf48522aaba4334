//! Win32 implementations of the connection and broadcast seams
//!
//! [`Win32Platform`] opens the simulator's named file mapping, maps a
//! read-only view of it and opens the data-valid event. [`Win32Broadcast`]
//! posts encoded commands to every top-level window using the registered
//! broadcast message.
//!
//! ```rust,ignore
//! use std::time::Duration;
//! use ira_telemetry::windows::{Win32Broadcast, Win32Platform};
//! use ira_telemetry::{Command, CommandChannel, TelemetryConnection};
//!
//! let mut conn = TelemetryConnection::new(Win32Platform::new());
//! conn.connect()?;
//!
//! let commands = CommandChannel::new(Win32Broadcast::from_config(conn.config())?);
//! commands.send(&Command::replay_set_play_speed(2, false))?;
//! ```

mod broadcast;
mod platform;

pub use broadcast::Win32Broadcast;
pub use platform::{EventHandle, MappedView, MappingHandle, Win32Platform};

/// Null-terminated UTF-16 copy of `s` for `W` APIs.
fn wide_string(s: &str) -> Vec<u16> {
    use std::ffi::OsStr;
    use std::os::windows::ffi::OsStrExt;
    OsStr::new(s).encode_wide().chain(std::iter::once(0)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wide_strings_are_null_terminated() {
        let wide = wide_string("Local\\IRSDKMemMapFileName");
        assert_eq!(wide.len(), "Local\\IRSDKMemMapFileName".len() + 1);
        assert_eq!(wide.last(), Some(&0));
        assert_eq!(wide[0], u16::from(b'L'));
    }
}
