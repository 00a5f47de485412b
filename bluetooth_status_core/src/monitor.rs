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

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use log::{debug, info};
use tokio::time::sleep;

use crate::bridge_handle::BridgeHandle;
use crate::status::{BluetoothStatus, StatusEvent};

const STATE_POLL_INTERVAL: Duration = Duration::from_millis(100);
const STATE_POLL_ATTEMPTS: usize = 10;

pub type StatusListener = Arc<dyn Fn(bool) + Send + Sync>;

#[derive(Default)]
struct MonitorState {
    subscribed: bool,
    status: Option<BluetoothStatus>,
    // Latched by the first status; survives unsubscribing.
    resolved: bool,
    listener: Option<StatusListener>,
}

/// Application-side view of the `bluetoothStatus` event stream.
///
/// Caches the latest status while subscribed and fans it out to a single
/// listener. The subscription is taken lazily and dropped, together with the
/// cached status, once nothing is interested anymore.
#[derive(Clone, Default)]
pub struct StatusMonitor {
    state: Arc<Mutex<MonitorState>>,
    bridge: Option<BridgeHandle>,
}

impl StatusMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// A monitor that can also issue requests to the bridge.
    pub fn with_bridge(bridge: BridgeHandle) -> Self {
        Self {
            state: Arc::default(),
            bridge: Some(bridge),
        }
    }

    /// Replaces the current listener. It is called with `true` when the radio
    /// reports on and `false` otherwise.
    pub fn add_listener<F>(&self, listener: F)
    where
        F: Fn(bool) + Send + Sync + 'static,
    {
        let mut state = self.lock();
        state.subscribed = true;
        state.listener = Some(Arc::new(listener));
    }

    pub fn remove_listener(&self) {
        let mut state = self.lock();
        state.listener = None;
        Self::unsubscribe_if_idle(&mut state);
    }

    /// Feeds one event from the bridge.
    pub fn on_event(&self, event: &StatusEvent) {
        let listener = {
            let mut state = self.lock();
            if !state.subscribed {
                debug!("Monitor not subscribed, dropping {}.", event.status);
                return;
            }
            state.status = Some(event.status);
            state.resolved = true;
            state.listener.clone()
        };
        if let Some(listener) = listener {
            listener(event.status.is_on());
        }
    }

    /// Waits briefly for the first reported status and resolves whether it is
    /// on. Falls back to querying the bridge, or `false`, when none arrives.
    pub async fn state(&self) -> bool {
        let mut status = None;
        for _ in 0..STATE_POLL_ATTEMPTS {
            status = {
                let mut state = self.lock();
                state.subscribed = true;
                state.status
            };
            if status.is_some() {
                break;
            }
            sleep(STATE_POLL_INTERVAL).await;
        }
        let enabled = match (status, &self.bridge) {
            (Some(status), _) => status.is_on(),
            (None, Some(bridge)) => {
                info!("No status reported yet, querying the bridge.");
                bridge.bluetooth_state().await
            }
            (None, None) => false,
        };
        Self::unsubscribe_if_idle(&mut self.lock());
        enabled
    }

    pub fn status(&self) -> Option<BluetoothStatus> {
        self.lock().status
    }

    /// True until the first status has been observed. Stays false afterwards,
    /// even once unsubscribing clears the cached status.
    pub fn is_pending(&self) -> bool {
        !self.lock().resolved
    }

    pub fn is_subscribed(&self) -> bool {
        self.lock().subscribed
    }

    pub fn enable(&self, enabled: bool) {
        match &self.bridge {
            Some(bridge) => bridge.set_bluetooth_state(enabled),
            None => debug!("Monitor has no bridge, ignoring enable({}).", enabled),
        }
    }

    pub fn disable(&self) {
        self.enable(false);
    }

    fn unsubscribe_if_idle(state: &mut MonitorState) {
        if !state.subscribed || state.listener.is_some() {
            return;
        }
        state.subscribed = false;
        state.status = None;
    }

    fn lock(&self) -> MutexGuard<'_, MonitorState> {
        // The state stays consistent even if a listener panicked mid-update.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
