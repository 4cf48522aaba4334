//! Broadcast command transport

use tracing::debug;
use windows::Win32::Foundation::{LPARAM, WPARAM};
use windows::Win32::UI::WindowsAndMessaging::{HWND_BROADCAST, RegisterWindowMessageW, SendNotifyMessageW};
use windows::core::PCWSTR;

use super::wide_string;
use crate::command::{BroadcastTransport, EncodedCommand};
use crate::config::{ConnectionConfig, DEFAULT_BROADCAST_MESSAGE_NAME};
use crate::{Result, TelemetryError};

/// Posts commands to all top-level windows with the registered message id.
#[derive(Debug, Clone, Copy)]
pub struct Win32Broadcast {
    message: u32,
}

impl Win32Broadcast {
    /// Register the simulator's default broadcast message.
    pub fn new() -> Result<Self> {
        Self::with_message_name(DEFAULT_BROADCAST_MESSAGE_NAME)
    }

    /// Register the message named by `config.broadcast_message_name`.
    pub fn from_config(config: &ConnectionConfig) -> Result<Self> {
        Self::with_message_name(&config.broadcast_message_name)
    }

    pub fn with_message_name(name: &str) -> Result<Self> {
        let wide_name = wide_string(name);
        // SAFETY: wide_name is null-terminated and outlives the call.
        let message = unsafe { RegisterWindowMessageW(PCWSTR::from_raw(wide_name.as_ptr())) };
        if message == 0 {
            let win_err = windows::core::Error::from_thread();
            return Err(TelemetryError::windows_api_error("RegisterWindowMessageW", win_err));
        }
        debug!(name, message, "Registered broadcast message");
        Ok(Self { message })
    }

    /// Registered message id.
    pub fn message(&self) -> u32 {
        self.message
    }
}

impl BroadcastTransport for Win32Broadcast {
    fn post(&self, command: EncodedCommand) -> Result<()> {
        // SAFETY: plain message post; no pointers cross the call.
        unsafe {
            SendNotifyMessageW(
                HWND_BROADCAST,
                self.message,
                WPARAM(command.wparam as usize),
                LPARAM(command.lparam as isize),
            )
        }
        .map_err(|e| TelemetryError::windows_api_error("SendNotifyMessageW", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registering_the_same_name_is_stable() {
        let first = Win32Broadcast::new().unwrap();
        let second = Win32Broadcast::with_message_name(DEFAULT_BROADCAST_MESSAGE_NAME).unwrap();
        assert_eq!(first.message(), second.message());
        assert!(first.message() >= 0xC000);
    }

    #[test]
    fn config_selects_the_message_name() {
        let default = Win32Broadcast::from_config(&ConnectionConfig::default()).unwrap();
        assert_eq!(default.message(), Win32Broadcast::new().unwrap().message());

        let config = ConnectionConfig {
            broadcast_message_name: "IRA_TELEMETRY_TEST_BROADCAST".to_string(),
            ..ConnectionConfig::default()
        };
        let custom = Win32Broadcast::from_config(&config).unwrap();
        assert_ne!(custom.message(), default.message());
        assert_eq!(
            custom.message(),
            Win32Broadcast::with_message_name("IRA_TELEMETRY_TEST_BROADCAST").unwrap().message()
        );
    }
}
