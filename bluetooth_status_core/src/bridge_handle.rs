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

use log::{debug, warn};
use tokio::runtime::Handle;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot};

use crate::{LifecycleEvent, ProviderEvent};

/// Creates the channel between host-side handles and the bridge.
pub fn provider_channel(buffer: usize) -> (BridgeHandle, mpsc::Receiver<ProviderEvent>) {
    let (provider_event_tx, provider_event_rx) = mpsc::channel::<ProviderEvent>(buffer.max(1));
    (BridgeHandle { provider_event_tx }, provider_event_rx)
}

/// Entry point for host threads: platform broadcasts, lifecycle callbacks and
/// the two application-facing operations.
///
/// Safe to call from any thread, including from a status listener running on
/// the bridge's own thread. Inside an async runtime events are queued without
/// waiting and state queries report `false`. Once the bridge is gone every call
/// degrades to its default.
#[derive(Clone, Debug)]
pub struct BridgeHandle {
    provider_event_tx: mpsc::Sender<ProviderEvent>,
}

impl BridgeHandle {
    pub fn on_state_changed(&self, state_code: i32) {
        self.send(ProviderEvent::StateChanged(state_code));
    }

    pub fn on_host_resume(&self) {
        self.send(ProviderEvent::Lifecycle(LifecycleEvent::HostResume));
    }

    pub fn on_host_pause(&self) {
        self.send(ProviderEvent::Lifecycle(LifecycleEvent::HostPause));
    }

    pub fn on_host_destroy(&self) {
        self.send(ProviderEvent::Lifecycle(LifecycleEvent::HostDestroy));
    }

    pub fn on_instance_destroy(&self) {
        self.send(ProviderEvent::Lifecycle(LifecycleEvent::InstanceDestroy));
    }

    /// Whether the radio is enabled, `false` when unknown. Use
    /// [`bluetooth_state`](Self::bluetooth_state) from async code.
    pub fn get_bluetooth_state(&self) -> bool {
        if Handle::try_current().is_ok() {
            warn!("get_bluetooth_state called inside a runtime, reporting off.");
            return false;
        }
        let (result_tx, result_rx) = oneshot::channel();
        self.send(ProviderEvent::GetState(result_tx));
        result_rx.blocking_recv().unwrap_or(false)
    }

    pub async fn bluetooth_state(&self) -> bool {
        let (result_tx, result_rx) = oneshot::channel();
        if let Err(e) = self
            .provider_event_tx
            .send(ProviderEvent::GetState(result_tx))
            .await
        {
            warn!("Bridge handle send error: {}", e);
            return false;
        }
        result_rx.await.unwrap_or(false)
    }

    /// Fire-and-forget; the resulting broadcast is the authoritative answer.
    pub fn set_bluetooth_state(&self, enabled: bool) {
        self.send(ProviderEvent::SetState(enabled));
    }

    pub fn stop(&self) {
        self.send(ProviderEvent::Stop);
    }

    pub fn is_closed(&self) -> bool {
        self.provider_event_tx.is_closed()
    }

    fn send(&self, event: ProviderEvent) {
        // Listeners run inside the bridge's runtime, where blocking would panic.
        if Handle::try_current().is_ok() {
            match self.provider_event_tx.try_send(event) {
                Ok(()) => debug!("Bridge handle queued an event."),
                Err(TrySendError::Full(event)) => {
                    warn!("Bridge channel full, dropping {:?}.", event)
                }
                Err(TrySendError::Closed(_)) => warn!("Bridge handle send error: channel closed"),
            }
            return;
        }
        // See https://docs.rs/tokio/1.36.0/tokio/sync/mpsc/index.html#communicating-between-sync-and-async-code
        if let Err(e) = self.provider_event_tx.blocking_send(event) {
            warn!("Bridge handle send error: {}", e);
        } else {
            debug!("Bridge handle sent an event.");
        }
    }
}
