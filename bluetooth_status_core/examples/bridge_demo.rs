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

use std::sync::mpsc;
use std::thread::{self, sleep};
use std::time::Duration;

use bluetooth_status_core::emulator::{EmulatedRadio, RecordingHostContext};
use bluetooth_status_core::{provider_channel, BluetoothStatusBridge, BridgeConfig, StatusMonitor};

fn main() {
    env_logger::init();

    let config = BridgeConfig::from_env();
    let (handle, provider_rx) = provider_channel(config.provider_channel_size);
    let monitor = StatusMonitor::with_bridge(handle.clone());
    monitor.add_listener(|enabled| println!("Bluetooth is {}", if enabled { "on" } else { "off" }));

    let radio = EmulatedRadio::new(false);
    radio.connect(handle.clone());
    let (event_tx, _event_rx) = mpsc::channel();
    let host = RecordingHostContext::new(event_tx).with_monitor(monitor.clone());
    let mut bridge =
        BluetoothStatusBridge::new(provider_rx, Some(Box::new(radio.clone())), Box::new(host), config);
    if let Err(e) = bridge.initialize() {
        eprintln!("Failed to initialize the bridge: {}", e);
        return;
    }
    let engine = thread::spawn(move || bridge.run());

    println!("Initial state: {}", handle.get_bluetooth_state());
    monitor.enable(true);
    sleep(Duration::new(1, 0));

    // Turned off while the app was in the background; resume picks it up.
    handle.on_host_pause();
    radio.set_enabled_silently(false);
    handle.on_host_resume();
    sleep(Duration::new(1, 0));

    handle.on_instance_destroy();
    engine.join().unwrap();
}
