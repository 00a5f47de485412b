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

use bluetooth_status_core::RadioAdapter;
use log::warn;

/// Logs to stderr, filtered by `RUST_LOG`.
pub(crate) fn init_logging() {
    let _ = env_logger::try_init();
}

/// Targets without a supported Bluetooth stack have no radio; the bridge then
/// reports off and ignores requests.
pub(crate) fn default_adapter() -> Option<Box<dyn RadioAdapter>> {
    warn!("Unsupported target platform, no Bluetooth adapter.");
    None
}
