//! Connection configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Name of the simulator's shared memory mapping
pub const DEFAULT_MEMORY_MAP_NAME: &str = "Local\\IRSDKMemMapFileName";
/// Name of the event signaled after each published row
pub const DEFAULT_DATA_VALID_EVENT_NAME: &str = "Local\\IRSDKDataValidEvent";
/// Registered window message used for broadcast commands
pub const DEFAULT_BROADCAST_MESSAGE_NAME: &str = "IRSDK_BROADCASTMSG";

/// Settings for a [`TelemetryConnection`](crate::TelemetryConnection) and
/// its command channel.
///
/// Every field has a default, so a partial document deserializes:
///
/// ```rust
/// use ira_telemetry::ConnectionConfig;
///
/// let config: ConnectionConfig = serde_yaml_ng::from_str("copy_attempts: 3").unwrap();
/// assert_eq!(config.copy_attempts, 3);
/// assert_eq!(config.memory_map_name, "Local\\IRSDKMemMapFileName");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    pub memory_map_name: String,
    pub data_valid_event_name: String,
    pub broadcast_message_name: String,
    /// How long after the last accepted row the connection still counts as live
    pub liveness_window: Duration,
    /// Verified-copy attempts per poll before reporting a torn read
    pub copy_attempts: u32,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            memory_map_name: DEFAULT_MEMORY_MAP_NAME.to_string(),
            data_valid_event_name: DEFAULT_DATA_VALID_EVENT_NAME.to_string(),
            broadcast_message_name: DEFAULT_BROADCAST_MESSAGE_NAME.to_string(),
            liveness_window: Duration::from_secs(30),
            copy_attempts: 2,
        }
    }
}

impl ConnectionConfig {
    /// Copy attempts with the lower bound of one applied.
    pub fn effective_copy_attempts(&self) -> u32 {
        self.copy_attempts.max(1)
    }

    pub fn with_liveness_window(mut self, window: Duration) -> Self {
        self.liveness_window = window;
        self
    }

    pub fn with_copy_attempts(mut self, attempts: u32) -> Self {
        self.copy_attempts = attempts;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_simulator_names() {
        let config = ConnectionConfig::default();
        assert_eq!(config.memory_map_name, "Local\\IRSDKMemMapFileName");
        assert_eq!(config.data_valid_event_name, "Local\\IRSDKDataValidEvent");
        assert_eq!(config.broadcast_message_name, "IRSDK_BROADCASTMSG");
        assert_eq!(config.liveness_window, Duration::from_secs(30));
        assert_eq!(config.copy_attempts, 2);
    }

    #[test]
    fn copy_attempts_never_drop_below_one() {
        let config = ConnectionConfig::default().with_copy_attempts(0);
        assert_eq!(config.effective_copy_attempts(), 1);
    }

    #[test]
    fn partial_yaml_keeps_defaults() {
        let config: ConnectionConfig =
            serde_yaml_ng::from_str("memory_map_name: Local\\TestMap\n").unwrap();
        assert_eq!(config.memory_map_name, "Local\\TestMap");
        assert_eq!(config.copy_attempts, 2);
        assert_eq!(config.liveness_window, Duration::from_secs(30));
    }
}
