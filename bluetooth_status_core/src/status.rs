// Copyright 2023 Google LLC
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     https://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::fmt;

/// Name under which the bridge is registered with the application framework.
pub const MODULE_NAME: &str = "RNBluetoothManager";
/// Event name carrying radio status changes.
pub const STATUS_EVENT: &str = "bluetoothStatus";
/// Payload key holding the status string.
pub const STATUS_PARAM: &str = "status";

/// Radio state codes carried by the platform's state-changed broadcast.
/// Values follow `android.bluetooth.BluetoothAdapter`.
pub mod state_code {
    pub const STATE_OFF: i32 = 10;
    pub const STATE_TURNING_ON: i32 = 11;
    pub const STATE_ON: i32 = 12;
    pub const STATE_TURNING_OFF: i32 = 13;
    /// Sentinel reported when the broadcast carries no state extra.
    pub const ERROR: i32 = i32::MIN;
}

/// Most recently observed radio status.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BluetoothStatus {
    On,
    Off,
}

impl BluetoothStatus {
    /// Maps a broadcast state code to a terminal status. Transitional states
    /// and unknown codes map to `None`.
    pub fn from_state_code(code: i32) -> Option<Self> {
        match code {
            state_code::STATE_ON => Some(BluetoothStatus::On),
            state_code::STATE_OFF => Some(BluetoothStatus::Off),
            _ => None,
        }
    }

    pub fn from_enabled(enabled: bool) -> Self {
        if enabled {
            BluetoothStatus::On
        } else {
            BluetoothStatus::Off
        }
    }

    pub fn is_on(self) -> bool {
        self == BluetoothStatus::On
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BluetoothStatus::On => "on",
            BluetoothStatus::Off => "off",
        }
    }
}

impl fmt::Display for BluetoothStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payload of a `bluetoothStatus` event: `{ status: "on" | "off" }`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StatusEvent {
    pub status: BluetoothStatus,
}

impl StatusEvent {
    pub fn new(status: BluetoothStatus) -> Self {
        Self { status }
    }

    /// Payload entries as the framework's key/value map expects them.
    pub fn params(&self) -> [(&'static str, &'static str); 1] {
        [(STATUS_PARAM, self.status.as_str())]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_codes_map_to_status() {
        assert_eq!(
            BluetoothStatus::from_state_code(state_code::STATE_ON),
            Some(BluetoothStatus::On)
        );
        assert_eq!(
            BluetoothStatus::from_state_code(state_code::STATE_OFF),
            Some(BluetoothStatus::Off)
        );
    }

    #[test]
    fn test_transitional_codes_are_dropped() {
        for code in [
            state_code::STATE_TURNING_ON,
            state_code::STATE_TURNING_OFF,
            state_code::ERROR,
            0,
            -1,
        ] {
            assert_eq!(BluetoothStatus::from_state_code(code), None, "code {}", code);
        }
    }

    #[test]
    fn test_event_params() {
        let event = StatusEvent::new(BluetoothStatus::Off);
        assert_eq!(event.params(), [("status", "off")]);
        assert_eq!(BluetoothStatus::On.to_string(), "on");
    }
}
