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

use std::sync::{mpsc, Arc};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use bluetooth_status_core::emulator::{EmulatedRadio, HostRegistrations, RecordingHostContext};
use bluetooth_status_core::{
    provider_channel, state_code, BluetoothStatus, BluetoothStatusBridge, BridgeConfig,
    BridgeHandle, RadioAdapter, StatusEvent, StatusMonitor,
};

const EVENT_TIMEOUT: Duration = Duration::from_secs(2);
const QUIET_PERIOD: Duration = Duration::from_millis(200);

struct RunningBridge {
    handle: BridgeHandle,
    event_rx: mpsc::Receiver<StatusEvent>,
    registrations: Arc<HostRegistrations>,
    engine_thread: JoinHandle<()>,
}

impl RunningBridge {
    fn start(adapter: Option<EmulatedRadio>, config: BridgeConfig) -> Self {
        Self::start_with_monitor(adapter, config, None)
    }

    fn start_with_monitor(
        adapter: Option<EmulatedRadio>,
        config: BridgeConfig,
        monitor: Option<StatusMonitor>,
    ) -> Self {
        let (handle, provider_rx) = provider_channel(config.provider_channel_size);
        let (event_tx, event_rx) = mpsc::channel();
        let mut host = RecordingHostContext::new(event_tx);
        if let Some(monitor) = monitor {
            host = host.with_monitor(monitor);
        }
        let registrations = host.registrations();
        let adapter = adapter.map(|radio| {
            radio.connect(handle.clone());
            Box::new(radio) as Box<dyn RadioAdapter>
        });
        let mut bridge = BluetoothStatusBridge::new(provider_rx, adapter, Box::new(host), config);
        bridge.initialize().expect("bridge failed to initialize");
        let engine_thread = thread::spawn(move || bridge.run());
        Self {
            handle,
            event_rx,
            registrations,
            engine_thread,
        }
    }

    fn next_event(&self) -> StatusEvent {
        self.event_rx
            .recv_timeout(EVENT_TIMEOUT)
            .expect("no status event delivered")
    }

    fn assert_quiet(&self) {
        assert!(self.event_rx.recv_timeout(QUIET_PERIOD).is_err());
    }

    fn destroy(self) -> (mpsc::Receiver<StatusEvent>, Arc<HostRegistrations>, BridgeHandle) {
        self.handle.on_instance_destroy();
        self.engine_thread.join().expect("bridge thread crashed");
        (self.event_rx, self.registrations, self.handle)
    }
}

#[test]
fn test_broadcasts_emit_only_terminal_states() {
    let running = RunningBridge::start(Some(EmulatedRadio::new(false)), BridgeConfig::default());
    assert!(running.registrations.receiver_registered());
    assert!(running.registrations.lifecycle_attached());

    running.handle.on_state_changed(state_code::STATE_TURNING_ON);
    running.handle.on_state_changed(state_code::STATE_ON);
    running.handle.on_state_changed(state_code::STATE_TURNING_OFF);
    running.handle.on_state_changed(state_code::ERROR);
    running.handle.on_state_changed(state_code::STATE_OFF);

    assert_eq!(running.next_event().status, BluetoothStatus::On);
    assert_eq!(running.next_event().status, BluetoothStatus::Off);
    running.assert_quiet();
    running.destroy();
}

#[test]
fn test_resume_reports_state_at_fire_time() {
    let radio = EmulatedRadio::new(false);
    let running = RunningBridge::start(
        Some(radio.clone()),
        BridgeConfig::default().with_reconcile_delay(Duration::from_millis(100)),
    );

    running.handle.on_host_resume();
    radio.set_enabled_silently(true);

    assert_eq!(running.next_event(), StatusEvent::new(BluetoothStatus::On));
    running.assert_quiet();
    running.destroy();
}

#[test]
fn test_pause_and_host_destroy_are_ignored() {
    let running = RunningBridge::start(Some(EmulatedRadio::new(true)), BridgeConfig::default());
    running.handle.on_host_pause();
    running.handle.on_host_destroy();
    running.assert_quiet();
    assert!(running.registrations.receiver_registered());
    assert!(running.handle.get_bluetooth_state());
    running.destroy();
}

#[test]
fn test_teardown_cancels_pending_reconcile() {
    let running = RunningBridge::start(
        Some(EmulatedRadio::new(true)),
        BridgeConfig::default().with_reconcile_delay(Duration::from_millis(200)),
    );
    running.handle.on_host_resume();
    let (event_rx, registrations, _handle) = running.destroy();

    assert!(event_rx.recv_timeout(Duration::from_millis(400)).is_err());
    assert!(!registrations.receiver_registered());
    assert!(!registrations.lifecycle_attached());
    assert_eq!(registrations.receiver_unregistrations(), 1);
}

#[test]
fn test_no_events_after_teardown() {
    let running = RunningBridge::start(Some(EmulatedRadio::new(false)), BridgeConfig::default());
    let (event_rx, _registrations, handle) = running.destroy();

    handle.on_state_changed(state_code::STATE_ON);
    handle.on_host_resume();
    assert!(!handle.get_bluetooth_state());
    assert!(event_rx.recv_timeout(QUIET_PERIOD).is_err());
}

#[test]
fn test_missing_adapter_defaults() {
    let running = RunningBridge::start(None, BridgeConfig::default());

    assert!(!running.handle.get_bluetooth_state());
    running.handle.set_bluetooth_state(true);
    running.handle.set_bluetooth_state(false);
    running.handle.on_host_resume();

    assert_eq!(running.next_event().status, BluetoothStatus::Off);
    running.assert_quiet();
    running.destroy();
}

#[test]
fn test_enable_reports_on_exactly_once() {
    let radio = EmulatedRadio::new(false).with_transition_delay(Duration::from_millis(20));
    let running = RunningBridge::start(Some(radio.clone()), BridgeConfig::default());
    assert!(!running.handle.get_bluetooth_state());

    running.handle.set_bluetooth_state(true);

    assert_eq!(running.next_event(), StatusEvent::new(BluetoothStatus::On));
    running.assert_quiet();
    assert!(radio.is_enabled());
    assert!(running.handle.get_bluetooth_state());
    running.destroy();
}

#[test]
fn test_stop_releases_receiver() {
    let running = RunningBridge::start(Some(EmulatedRadio::new(false)), BridgeConfig::default());
    running.handle.stop();
    running.engine_thread.join().expect("bridge thread crashed");
    assert_eq!(running.registrations.receiver_unregistrations(), 1);
    assert!(running.handle.is_closed());
}

#[test]
fn test_monitor_follows_bridge() {
    let radio = EmulatedRadio::new(true).with_transition_delay(Duration::from_millis(20));
    let (listener_tx, listener_rx) = mpsc::channel();
    // The monitor needs the handle, which only exists once the bridge is built.
    let (handle, provider_rx) = provider_channel(16);
    let monitor = StatusMonitor::with_bridge(handle.clone());
    monitor.add_listener(move |enabled| {
        let _ = listener_tx.send(enabled);
    });
    let (event_tx, _event_rx) = mpsc::channel();
    let host = RecordingHostContext::new(event_tx).with_monitor(monitor.clone());
    radio.connect(handle.clone());
    let mut bridge = BluetoothStatusBridge::new(
        provider_rx,
        Some(Box::new(radio)),
        Box::new(host),
        BridgeConfig::default(),
    );
    bridge.initialize().unwrap();
    let engine_thread = thread::spawn(move || bridge.run());

    assert!(monitor.is_pending());
    monitor.disable();
    assert_eq!(listener_rx.recv_timeout(EVENT_TIMEOUT), Ok(false));
    assert_eq!(monitor.status(), Some(BluetoothStatus::Off));
    assert!(!monitor.is_pending());

    handle.on_instance_destroy();
    engine_thread.join().expect("bridge thread crashed");
}

#[test]
fn test_listener_can_call_back_into_bridge() {
    let radio = EmulatedRadio::new(false).with_transition_delay(Duration::from_millis(20));
    let (listener_tx, listener_rx) = mpsc::channel();
    let (handle, provider_rx) = provider_channel(16);
    let monitor = StatusMonitor::with_bridge(handle.clone());
    let reentrant = monitor.clone();
    let query_handle = handle.clone();
    monitor.add_listener(move |enabled| {
        // Runs on the bridge thread; must neither block nor panic.
        let reported = query_handle.get_bluetooth_state();
        let _ = listener_tx.send((enabled, reported));
        if !enabled {
            reentrant.enable(true);
        }
    });
    let (event_tx, _event_rx) = mpsc::channel();
    let host = RecordingHostContext::new(event_tx).with_monitor(monitor.clone());
    radio.connect(handle.clone());
    let mut bridge = BluetoothStatusBridge::new(
        provider_rx,
        Some(Box::new(radio.clone())),
        Box::new(host),
        BridgeConfig::default(),
    );
    bridge.initialize().unwrap();
    let engine_thread = thread::spawn(move || bridge.run());

    handle.on_state_changed(state_code::STATE_OFF);

    assert_eq!(listener_rx.recv_timeout(EVENT_TIMEOUT), Ok((false, false)));
    let (enabled, _) = listener_rx.recv_timeout(EVENT_TIMEOUT).unwrap();
    assert!(enabled);
    assert!(radio.is_enabled());
    assert!(handle.get_bluetooth_state());

    handle.on_instance_destroy();
    engine_thread.join().expect("bridge thread crashed");
}

#[test]
fn test_dropping_every_handle_tears_down() {
    let (handle, provider_rx) = provider_channel(4);
    let (event_tx, _event_rx) = mpsc::channel();
    let host = RecordingHostContext::new(event_tx);
    let registrations = host.registrations();
    let mut bridge =
        BluetoothStatusBridge::new(provider_rx, None, Box::new(host), BridgeConfig::default());
    bridge.initialize().unwrap();
    let engine_thread = thread::spawn(move || bridge.run());

    drop(handle);
    engine_thread.join().expect("bridge thread crashed");

    assert_eq!(registrations.receiver_unregistrations(), 1);
    assert!(!registrations.receiver_registered());
    assert!(!registrations.lifecycle_attached());
}
