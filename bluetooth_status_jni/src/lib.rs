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

use std::thread::{self, JoinHandle};

use bluetooth_status_core::{
    provider_channel, BluetoothStatusBridge, BridgeConfig, BridgeError, BridgeHandle,
    HostContext, RadioAdapter,
};
use log::{error, info};
use thiserror::Error;

cfg_if::cfg_if! {
    if #[cfg(target_os = "android")] {
        mod android;
        use self::android as platform;
    } else {
        mod unsupported;
        use unsupported as platform;
    }
}

const ENGINE_THREAD_NAME: &str = "bluetooth-status";

#[non_exhaustive]
#[derive(Error, Debug)]
pub enum NativeError {
    #[error(transparent)]
    Bridge(#[from] BridgeError),
    #[error("failed to spawn the bridge thread: {0}")]
    Thread(#[from] std::io::Error),
    #[cfg(target_os = "android")]
    #[error("jni error: {0}")]
    Jni(#[from] jni::errors::Error),
}

/// A bridge running on its own thread, as owned by the host module.
pub struct NativeBridge {
    handle: BridgeHandle,
    engine_thread: Option<JoinHandle<()>>,
}

impl NativeBridge {
    /// Initializes the bridge on the calling thread, so registration failures
    /// reach the caller, then hands it to a dedicated thread.
    pub fn start(
        adapter: Option<Box<dyn RadioAdapter>>,
        host: Box<dyn HostContext>,
        config: BridgeConfig,
    ) -> Result<Self, NativeError> {
        platform::init_logging();
        let (handle, provider_rx) = provider_channel(config.provider_channel_size);
        let mut bridge = BluetoothStatusBridge::new(provider_rx, adapter, host, config);
        bridge.initialize()?;
        let engine_thread = thread::Builder::new()
            .name(String::from(ENGINE_THREAD_NAME))
            .spawn(move || bridge.run())?;
        info!("Native Bluetooth status bridge started.");
        Ok(Self {
            handle,
            engine_thread: Some(engine_thread),
        })
    }

    /// Starts a bridge with whatever radio the current platform offers.
    pub fn with_platform_adapter(
        host: Box<dyn HostContext>,
        config: BridgeConfig,
    ) -> Result<Self, NativeError> {
        Self::start(platform::default_adapter(), host, config)
    }

    pub fn handle(&self) -> &BridgeHandle {
        &self.handle
    }

    /// Tears the bridge down and waits for its thread to finish.
    pub fn shutdown(mut self) {
        self.stop_engine();
    }

    fn stop_engine(&mut self) {
        let Some(engine_thread) = self.engine_thread.take() else {
            return;
        };
        self.handle.on_instance_destroy();
        if engine_thread.join().is_err() {
            error!("Bluetooth status bridge thread panicked.");
        }
        info!("Native Bluetooth status bridge stopped.");
    }
}

impl Drop for NativeBridge {
    fn drop(&mut self) {
        self.stop_engine();
    }
}
