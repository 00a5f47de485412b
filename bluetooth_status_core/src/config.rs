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

use std::env;
use std::time::Duration;

use log::warn;

const DEFAULT_RECONCILE_DELAY: Duration = Duration::from_millis(10);
const PROVIDER_EVENT_CHANNEL_BUF_SIZE: usize = 100;

/// Environment variable overriding the resume re-check delay, in milliseconds.
pub const RECONCILE_DELAY_ENV: &str = "BLUETOOTH_STATUS_RECONCILE_DELAY_MS";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BridgeConfig {
    /// Time between a host resume and the state re-check it triggers.
    pub reconcile_delay: Duration,
    pub provider_channel_size: usize,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            reconcile_delay: DEFAULT_RECONCILE_DELAY,
            provider_channel_size: PROVIDER_EVENT_CHANNEL_BUF_SIZE,
        }
    }
}

impl BridgeConfig {
    /// Defaults, with the reconcile delay taken from the environment when set.
    pub fn from_env() -> Self {
        let config = Self::default();
        match env::var(RECONCILE_DELAY_ENV) {
            Ok(value) => match value.trim().parse::<u64>() {
                Ok(millis) => config.with_reconcile_delay(Duration::from_millis(millis)),
                Err(e) => {
                    warn!("Ignoring {}={:?}: {}", RECONCILE_DELAY_ENV, value, e);
                    config
                }
            },
            Err(_) => config,
        }
    }

    pub fn with_reconcile_delay(mut self, delay: Duration) -> Self {
        self.reconcile_delay = delay;
        self
    }

    pub fn with_provider_channel_size(mut self, size: usize) -> Self {
        // mpsc::channel panics on zero capacity.
        self.provider_channel_size = size.max(1);
        self
    }
}
