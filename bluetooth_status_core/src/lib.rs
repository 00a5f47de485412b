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

pub mod bridge_handle;
pub mod config;
pub mod emulator;
mod error;
pub mod host_context;
pub mod monitor;
pub mod radio_adapter;
pub mod status;

use futures::future::BoxFuture;
use futures::stream::FuturesUnordered;
use futures::{FutureExt, StreamExt};
use log::{debug, error, info, warn};
use tokio::runtime::Builder;
use tokio::select;
use tokio::sync::{mpsc, oneshot};
use tokio::time::sleep;

pub use crate::bridge_handle::{provider_channel, BridgeHandle};
pub use crate::config::BridgeConfig;
pub use crate::error::BridgeError;
pub use crate::host_context::HostContext;
pub use crate::monitor::StatusMonitor;
pub use crate::radio_adapter::RadioAdapter;
pub use crate::status::{
    state_code, BluetoothStatus, StatusEvent, MODULE_NAME, STATUS_EVENT, STATUS_PARAM,
};

/// Lifecycle notifications delivered by the hosting framework.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LifecycleEvent {
    HostResume,
    HostPause,
    HostDestroy,
    /// The hosting runtime is shutting down for good.
    InstanceDestroy,
}

/// Events sent from the host side to the bridge.
#[derive(Debug)]
pub enum ProviderEvent {
    /// Radio-state-changed broadcast carrying a raw state code.
    StateChanged(i32),
    Lifecycle(LifecycleEvent),
    GetState(oneshot::Sender<bool>),
    SetState(bool),
    Stop,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BridgePhase {
    Uninitialized,
    Active,
    TornDown,
}

/// Surfaces the radio's enabled state and its transitions to application code
/// and forwards requests to change it.
///
/// Every entry point arrives as a [`ProviderEvent`] and is processed by a
/// single loop, so the bridge itself needs no locking. The broadcast receiver
/// and lifecycle listener acquired by [`initialize`](Self::initialize) are
/// released on every exit path: instance destroy, [`ProviderEvent::Stop`],
/// all handles dropped, or the bridge itself being dropped.
pub struct BluetoothStatusBridge {
    provider_rx: mpsc::Receiver<ProviderEvent>,
    adapter: Option<Box<dyn RadioAdapter>>,
    host: Box<dyn HostContext>,
    config: BridgeConfig,
    phase: BridgePhase,
    // Pending resume re-checks. Replaced wholesale on teardown to cancel them.
    reconcile_timers: FuturesUnordered<BoxFuture<'static, ()>>,
}

impl BluetoothStatusBridge {
    pub fn new(
        provider_rx: mpsc::Receiver<ProviderEvent>,
        adapter: Option<Box<dyn RadioAdapter>>,
        host: Box<dyn HostContext>,
        config: BridgeConfig,
    ) -> Self {
        info!("Create Bluetooth status bridge.");
        Self {
            provider_rx,
            adapter,
            host,
            config,
            phase: BridgePhase::Uninitialized,
            reconcile_timers: FuturesUnordered::new(),
        }
    }

    pub fn phase(&self) -> BridgePhase {
        self.phase
    }

    /// Whether a radio handle was available at construction. Callers of the
    /// bridge operations never see this; it is for the embedding code.
    pub fn has_adapter(&self) -> bool {
        self.adapter.is_some()
    }

    /// Registers the state receiver and lifecycle listener with the host.
    pub fn initialize(&mut self) -> Result<(), BridgeError> {
        match self.phase {
            BridgePhase::Uninitialized => {}
            BridgePhase::Active => {
                return Err(BridgeError::FailedPrecondition(String::from(
                    "bridge is already initialized",
                )))
            }
            BridgePhase::TornDown => {
                return Err(BridgeError::FailedPrecondition(String::from(
                    "bridge has been torn down",
                )))
            }
        }
        if self.adapter.is_none() {
            warn!("No Bluetooth adapter available, state queries will report off.");
        }
        self.host.register_state_receiver()?;
        self.host.add_lifecycle_listener();
        self.phase = BridgePhase::Active;
        info!("Bluetooth status bridge initialized.");
        Ok(())
    }

    /// Runs the bridge on a current-thread runtime until it is torn down.
    pub fn run(&mut self) {
        info!("Run Bluetooth status bridge.");
        match Builder::new_current_thread().enable_time().build() {
            Ok(runtime) => runtime.block_on(self.poll_providers()),
            Err(e) => error!("Failed to build the bridge runtime: {}", e),
        }
        self.teardown();
    }

    pub async fn poll_providers(&mut self) {
        if self.phase == BridgePhase::Uninitialized {
            if let Err(e) = self.initialize() {
                error!("Bluetooth status bridge failed to start: {}", e);
                return;
            }
        }
        while self.phase == BridgePhase::Active {
            select! {
                event = self.provider_rx.recv() => match event {
                    Some(ProviderEvent::Stop) => {
                        info!("Bluetooth status bridge stopped.");
                        break;
                    }
                    Some(event) => self.process_event(event),
                    None => {
                        info!("All bridge handles dropped.");
                        break;
                    }
                },
                Some(()) = self.reconcile_timers.next() => self.reconcile(),
            }
        }
        self.teardown();
    }

    fn process_event(&mut self, event: ProviderEvent) {
        debug!("received a provider event: {:?}.", event);
        match event {
            ProviderEvent::StateChanged(code) => self.process_state_changed(code),
            ProviderEvent::Lifecycle(lifecycle_event) => self.process_lifecycle(lifecycle_event),
            ProviderEvent::GetState(result_tx) => {
                if result_tx.send(self.is_enabled()).is_err() {
                    debug!("State query was abandoned by its caller.");
                }
            }
            ProviderEvent::SetState(enabled) => self.set_state(enabled),
            ProviderEvent::Stop => self.teardown(),
        }
    }

    fn process_state_changed(&self, code: i32) {
        match BluetoothStatus::from_state_code(code) {
            Some(status) => self.emit(status),
            None => debug!("Ignoring non-terminal adapter state {}.", code),
        }
    }

    fn process_lifecycle(&mut self, event: LifecycleEvent) {
        match event {
            LifecycleEvent::HostResume => {
                debug!("Host resumed, re-check in {:?}.", self.config.reconcile_delay);
                self.reconcile_timers
                    .push(sleep(self.config.reconcile_delay).boxed());
            }
            LifecycleEvent::HostPause | LifecycleEvent::HostDestroy => {}
            LifecycleEvent::InstanceDestroy => {
                info!("Host instance destroyed.");
                self.teardown();
            }
        }
    }

    // Fires after a resume; polls the radio now rather than at resume time.
    fn reconcile(&self) {
        self.emit(BluetoothStatus::from_enabled(self.is_enabled()));
    }

    fn is_enabled(&self) -> bool {
        self.adapter
            .as_ref()
            .map_or(false, |adapter| adapter.is_enabled())
    }

    fn set_state(&self, enabled: bool) {
        let Some(adapter) = self.adapter.as_ref() else {
            debug!("No Bluetooth adapter, ignoring set_state({}).", enabled);
            return;
        };
        let accepted = if enabled {
            adapter.enable()
        } else {
            adapter.disable()
        };
        debug!("set_state({}) accepted: {}.", enabled, accepted);
    }

    fn emit(&self, status: BluetoothStatus) {
        if self.phase != BridgePhase::Active {
            debug!("Bridge not active, dropping status {}.", status);
            return;
        }
        debug!("Emit {} {}.", STATUS_EVENT, status);
        self.host.emit(STATUS_EVENT, StatusEvent::new(status));
    }

    fn teardown(&mut self) {
        if self.phase == BridgePhase::TornDown {
            return;
        }
        if self.phase == BridgePhase::Active {
            self.host.unregister_state_receiver();
            self.host.remove_lifecycle_listener();
        }
        if !self.reconcile_timers.is_empty() {
            debug!("Cancelling {} pending re-checks.", self.reconcile_timers.len());
        }
        self.reconcile_timers = FuturesUnordered::new();
        self.phase = BridgePhase::TornDown;
        info!("Bluetooth status bridge torn down.");
    }
}

impl Drop for BluetoothStatusBridge {
    fn drop(&mut self) {
        self.teardown();
    }
}
