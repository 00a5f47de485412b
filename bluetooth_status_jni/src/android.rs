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

//! JNI glue for `com.solinor.bluetoothstatus.RNBluetoothManagerModule`.
//!
//! The Java module owns the `BroadcastReceiver` and the lifecycle listener and
//! forwards their callbacks to the `native*` entry points below. The bridge
//! calls back into the module to (un)register them and to emit events, so the
//! module must provide these instance methods:
//!
//! ```java
//! void registerStateReceiver();
//! void unregisterStateReceiver();
//! void addLifecycleListener();
//! void removeLifecycleListener();
//! void emitStatus(String eventName, String key, String value);
//! ```

use std::os::raw::c_void;
use std::sync::{Arc, OnceLock};

use bluetooth_status_core::{
    BridgeConfig, BridgeError, HostContext, RadioAdapter, StatusEvent,
};
use jni::objects::{GlobalRef, JObject, JValue};
use jni::sys::{jboolean, jint, jlong, JNI_FALSE, JNI_TRUE, JNI_VERSION_1_6};
use jni::{JNIEnv, JavaVM};
use log::{debug, error, warn, LevelFilter};

use crate::{NativeBridge, NativeError};

const ADAPTER_CLASS: &str = "android/bluetooth/BluetoothAdapter";
const LOG_TAG: &str = "BluetoothStatus";

static JAVA_VM: OnceLock<Arc<JavaVM>> = OnceLock::new();

/// Routes `log` output to logcat; stderr is discarded on Android.
pub(crate) fn init_logging() {
    android_logger::init_once(
        android_logger::Config::default()
            .with_tag(LOG_TAG)
            .with_max_level(LevelFilter::Debug),
    );
}

fn platform_error(err: jni::errors::Error) -> BridgeError {
    BridgeError::Platform(err.to_string())
}

// A pending Java exception poisons every later JNI call on this thread.
fn clear_exception(env: &mut JNIEnv) {
    if env.exception_check().unwrap_or(false) {
        let _ = env.exception_describe();
        let _ = env.exception_clear();
    }
}

/// `android.bluetooth.BluetoothAdapter` behind a global reference.
struct AndroidRadioAdapter {
    vm: Arc<JavaVM>,
    adapter: GlobalRef,
}

impl AndroidRadioAdapter {
    fn call_bool(&self, method: &str) -> Result<bool, BridgeError> {
        let mut env = self.vm.attach_current_thread().map_err(platform_error)?;
        let result = env
            .call_method(self.adapter.as_obj(), method, "()Z", &[])
            .and_then(|value| value.z());
        if result.is_err() {
            clear_exception(&mut env);
        }
        result.map_err(platform_error)
    }
}

impl RadioAdapter for AndroidRadioAdapter {
    fn is_enabled(&self) -> bool {
        self.call_bool("isEnabled").unwrap_or_else(|e| {
            warn!("BluetoothAdapter.isEnabled failed: {}", e);
            false
        })
    }

    fn enable(&self) -> bool {
        self.call_bool("enable").unwrap_or_else(|e| {
            warn!("BluetoothAdapter.enable failed: {}", e);
            false
        })
    }

    fn disable(&self) -> bool {
        self.call_bool("disable").unwrap_or_else(|e| {
            warn!("BluetoothAdapter.disable failed: {}", e);
            false
        })
    }
}

/// The Java module object, which holds the React application context.
struct ReactHostContext {
    vm: Arc<JavaVM>,
    module: GlobalRef,
}

impl ReactHostContext {
    fn call_void(&self, method: &str) -> Result<(), BridgeError> {
        let mut env = self.vm.attach_current_thread().map_err(platform_error)?;
        let result = env.call_method(self.module.as_obj(), method, "()V", &[]);
        if result.is_err() {
            clear_exception(&mut env);
        }
        result.map(|_| ()).map_err(platform_error)
    }

    /// Hands each payload entry to the module, which builds the params map.
    fn emit_event(&self, event_name: &str, event: &StatusEvent) -> Result<(), BridgeError> {
        let mut env = self.vm.attach_current_thread().map_err(platform_error)?;
        let result = (|| -> Result<(), jni::errors::Error> {
            let name = env.new_string(event_name)?;
            for (key, value) in event.params() {
                let key = env.new_string(key)?;
                let value = env.new_string(value)?;
                env.call_method(
                    self.module.as_obj(),
                    "emitStatus",
                    "(Ljava/lang/String;Ljava/lang/String;Ljava/lang/String;)V",
                    &[
                        JValue::Object(&name),
                        JValue::Object(&key),
                        JValue::Object(&value),
                    ],
                )?;
            }
            Ok(())
        })();
        if result.is_err() {
            clear_exception(&mut env);
        }
        result.map_err(platform_error)
    }
}

impl HostContext for ReactHostContext {
    fn register_state_receiver(&mut self) -> Result<(), BridgeError> {
        self.call_void("registerStateReceiver")
            .map_err(|e| BridgeError::ReceiverRegistration(e.to_string()))
    }

    fn unregister_state_receiver(&mut self) {
        if let Err(e) = self.call_void("unregisterStateReceiver") {
            error!("Failed to unregister the state receiver: {}", e);
        }
    }

    fn add_lifecycle_listener(&mut self) {
        if let Err(e) = self.call_void("addLifecycleListener") {
            error!("Failed to add the lifecycle listener: {}", e);
        }
    }

    fn remove_lifecycle_listener(&mut self) {
        if let Err(e) = self.call_void("removeLifecycleListener") {
            error!("Failed to remove the lifecycle listener: {}", e);
        }
    }

    fn emit(&self, event_name: &str, event: StatusEvent) {
        if let Err(e) = self.emit_event(event_name, &event) {
            error!("Failed to emit {}: {}", event_name, e);
        }
    }
}

/// The default adapter, or `None` when the device has no Bluetooth or the
/// library was not loaded through `System.loadLibrary`.
pub(crate) fn default_adapter() -> Option<Box<dyn RadioAdapter>> {
    let vm = JAVA_VM.get()?.clone();
    match lookup_default_adapter(&vm) {
        Ok(Some(adapter)) => Some(Box::new(AndroidRadioAdapter { vm, adapter })),
        Ok(None) => {
            warn!("BluetoothAdapter.getDefaultAdapter returned null.");
            None
        }
        Err(e) => {
            warn!("Failed to look up the default BluetoothAdapter: {}", e);
            None
        }
    }
}

fn lookup_default_adapter(vm: &JavaVM) -> Result<Option<GlobalRef>, jni::errors::Error> {
    let mut env = vm.attach_current_thread()?;
    let result = (|| {
        let adapter = env
            .call_static_method(
                ADAPTER_CLASS,
                "getDefaultAdapter",
                "()Landroid/bluetooth/BluetoothAdapter;",
                &[],
            )?
            .l()?;
        if adapter.is_null() {
            return Ok(None);
        }
        env.new_global_ref(adapter).map(Some)
    })();
    if result.is_err() {
        clear_exception(&mut env);
    }
    result
}

fn init(env: &mut JNIEnv, module: &JObject) -> Result<NativeBridge, NativeError> {
    let vm = match JAVA_VM.get() {
        Some(vm) => vm.clone(),
        None => Arc::new(env.get_java_vm()?),
    };
    let host = ReactHostContext {
        vm,
        module: env.new_global_ref(module)?,
    };
    NativeBridge::with_platform_adapter(Box::new(host), BridgeConfig::from_env())
}

/// # Safety
///
/// `ptr` must be zero or a value returned by `nativeInit` that has not been
/// passed to `nativeDestroy` yet.
unsafe fn bridge_from<'a>(ptr: jlong) -> Option<&'a NativeBridge> {
    (ptr as *const NativeBridge).as_ref()
}

#[no_mangle]
pub extern "system" fn JNI_OnLoad(vm: JavaVM, _reserved: *mut c_void) -> jint {
    let _ = JAVA_VM.set(Arc::new(vm));
    JNI_VERSION_1_6
}

#[no_mangle]
pub extern "system" fn Java_com_solinor_bluetoothstatus_RNBluetoothManagerModule_nativeInit<
    'local,
>(
    mut env: JNIEnv<'local>,
    module: JObject<'local>,
) -> jlong {
    match init(&mut env, &module) {
        Ok(bridge) => Box::into_raw(Box::new(bridge)) as jlong,
        Err(e) => {
            error!("Failed to start the Bluetooth status bridge: {}", e);
            let _ = env.throw_new("java/lang/IllegalStateException", e.to_string());
            0
        }
    }
}

#[no_mangle]
pub extern "system" fn Java_com_solinor_bluetoothstatus_RNBluetoothManagerModule_nativeOnStateChanged(
    _env: JNIEnv,
    _module: JObject,
    ptr: jlong,
    state: jint,
) {
    if let Some(bridge) = unsafe { bridge_from(ptr) } {
        bridge.handle().on_state_changed(state);
    }
}

#[no_mangle]
pub extern "system" fn Java_com_solinor_bluetoothstatus_RNBluetoothManagerModule_nativeGetBluetoothState(
    _env: JNIEnv,
    _module: JObject,
    ptr: jlong,
) -> jboolean {
    let enabled = unsafe { bridge_from(ptr) }.map_or(false, |bridge| {
        bridge.handle().get_bluetooth_state()
    });
    if enabled {
        JNI_TRUE
    } else {
        JNI_FALSE
    }
}

#[no_mangle]
pub extern "system" fn Java_com_solinor_bluetoothstatus_RNBluetoothManagerModule_nativeSetBluetoothState(
    _env: JNIEnv,
    _module: JObject,
    ptr: jlong,
    enabled: jboolean,
) {
    if let Some(bridge) = unsafe { bridge_from(ptr) } {
        bridge.handle().set_bluetooth_state(enabled != JNI_FALSE);
    }
}

#[no_mangle]
pub extern "system" fn Java_com_solinor_bluetoothstatus_RNBluetoothManagerModule_nativeOnHostResume(
    _env: JNIEnv,
    _module: JObject,
    ptr: jlong,
) {
    if let Some(bridge) = unsafe { bridge_from(ptr) } {
        bridge.handle().on_host_resume();
    }
}

#[no_mangle]
pub extern "system" fn Java_com_solinor_bluetoothstatus_RNBluetoothManagerModule_nativeOnHostPause(
    _env: JNIEnv,
    _module: JObject,
    ptr: jlong,
) {
    if let Some(bridge) = unsafe { bridge_from(ptr) } {
        bridge.handle().on_host_pause();
    }
}

#[no_mangle]
pub extern "system" fn Java_com_solinor_bluetoothstatus_RNBluetoothManagerModule_nativeOnHostDestroy(
    _env: JNIEnv,
    _module: JObject,
    ptr: jlong,
) {
    if let Some(bridge) = unsafe { bridge_from(ptr) } {
        bridge.handle().on_host_destroy();
    }
}

#[no_mangle]
pub extern "system" fn Java_com_solinor_bluetoothstatus_RNBluetoothManagerModule_nativeDestroy(
    _env: JNIEnv,
    _module: JObject,
    ptr: jlong,
) {
    if ptr == 0 {
        return;
    }
    debug!("Destroying the Bluetooth status bridge.");
    let bridge = unsafe { Box::from_raw(ptr as *mut NativeBridge) };
    bridge.shutdown();
}
