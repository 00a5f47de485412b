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

//! In-process stand-ins for the platform radio and the hosting framework.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{mpsc, Arc, Mutex, PoisonError};
use std::thread;
use std::time::Duration;

use log::info;

use crate::bridge_handle::BridgeHandle;
use crate::error::BridgeError;
use crate::host_context::HostContext;
use crate::monitor::StatusMonitor;
use crate::radio_adapter::RadioAdapter;
use crate::status::{state_code, StatusEvent};

const DEFAULT_TRANSITION_DELAY: Duration = Duration::from_millis(50);

/// Emulated radio. Clones share the same state, so a test can keep one clone
/// while the bridge owns another.
///
/// Like the platform, `enable`/`disable` only start a transition; the
/// resulting state is broadcast from a background thread.
#[derive(Clone)]
pub struct EmulatedRadio {
    enabled: Arc<AtomicBool>,
    broadcasts: Arc<Mutex<Option<BridgeHandle>>>,
    transition_delay: Duration,
}

impl EmulatedRadio {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled: Arc::new(AtomicBool::new(enabled)),
            broadcasts: Arc::default(),
            transition_delay: DEFAULT_TRANSITION_DELAY,
        }
    }

    pub fn with_transition_delay(mut self, delay: Duration) -> Self {
        self.transition_delay = delay;
        self
    }

    /// Deliver state broadcasts to this bridge.
    pub fn connect(&self, handle: BridgeHandle) {
        *self
            .broadcasts
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(handle);
    }

    /// Changes the state without broadcasting, as if the change was missed.
    pub fn set_enabled_silently(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
    }

    fn transition(&self, enabled: bool) -> bool {
        if self.enabled.load(Ordering::SeqCst) == enabled {
            return true;
        }
        let handle = self
            .broadcasts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        let state = self.enabled.clone();
        let delay = self.transition_delay;
        let (turning, terminal) = if enabled {
            (state_code::STATE_TURNING_ON, state_code::STATE_ON)
        } else {
            (state_code::STATE_TURNING_OFF, state_code::STATE_OFF)
        };
        info!("Emulated radio starts turning {}.", if enabled { "on" } else { "off" });
        thread::spawn(move || {
            if let Some(handle) = &handle {
                handle.on_state_changed(turning);
            }
            thread::sleep(delay);
            state.store(enabled, Ordering::SeqCst);
            info!("Emulated radio reached state {}.", terminal);
            if let Some(handle) = &handle {
                handle.on_state_changed(terminal);
            }
        });
        true
    }
}

impl RadioAdapter for EmulatedRadio {
    fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    fn enable(&self) -> bool {
        self.transition(true)
    }

    fn disable(&self) -> bool {
        self.transition(false)
    }
}

/// Registration bookkeeping shared between a `RecordingHostContext` and the
/// code observing it.
#[derive(Default)]
pub struct HostRegistrations {
    receiver_registered: AtomicBool,
    receiver_unregistrations: AtomicUsize,
    lifecycle_attached: AtomicBool,
}

impl HostRegistrations {
    pub fn receiver_registered(&self) -> bool {
        self.receiver_registered.load(Ordering::SeqCst)
    }

    pub fn receiver_unregistrations(&self) -> usize {
        self.receiver_unregistrations.load(Ordering::SeqCst)
    }

    pub fn lifecycle_attached(&self) -> bool {
        self.lifecycle_attached.load(Ordering::SeqCst)
    }
}

/// Host context that records what the bridge does and hands emitted events to
/// a channel and, optionally, a [`StatusMonitor`].
pub struct RecordingHostContext {
    event_tx: mpsc::Sender<StatusEvent>,
    monitor: Option<StatusMonitor>,
    registrations: Arc<HostRegistrations>,
}

impl RecordingHostContext {
    pub fn new(event_tx: mpsc::Sender<StatusEvent>) -> Self {
        Self {
            event_tx,
            monitor: None,
            registrations: Arc::default(),
        }
    }

    pub fn with_monitor(mut self, monitor: StatusMonitor) -> Self {
        self.monitor = Some(monitor);
        self
    }

    pub fn registrations(&self) -> Arc<HostRegistrations> {
        self.registrations.clone()
    }
}

impl HostContext for RecordingHostContext {
    fn register_state_receiver(&mut self) -> Result<(), BridgeError> {
        if self.registrations.receiver_registered.swap(true, Ordering::SeqCst) {
            return Err(BridgeError::ReceiverRegistration(String::from(
                "receiver already registered",
            )));
        }
        info!("Emulated host registered the state receiver.");
        Ok(())
    }

    fn unregister_state_receiver(&mut self) {
        self.registrations
            .receiver_registered
            .store(false, Ordering::SeqCst);
        self.registrations
            .receiver_unregistrations
            .fetch_add(1, Ordering::SeqCst);
        info!("Emulated host unregistered the state receiver.");
    }

    fn add_lifecycle_listener(&mut self) {
        self.registrations
            .lifecycle_attached
            .store(true, Ordering::SeqCst);
    }

    fn remove_lifecycle_listener(&mut self) {
        self.registrations
            .lifecycle_attached
            .store(false, Ordering::SeqCst);
    }

    fn emit(&self, event_name: &str, event: StatusEvent) {
        info!("Emulated host received {} {:?}.", event_name, event);
        if let Some(monitor) = &self.monitor {
            monitor.on_event(&event);
        }
        // The receiving side may have gone away; that is not the bridge's concern.
        let _ = self.event_tx.send(event);
    }
}
