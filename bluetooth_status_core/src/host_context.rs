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

use crate::error::BridgeError;
use crate::status::StatusEvent;

/// The application framework context hosting the bridge.
///
/// Signals registered here are delivered back to the bridge through its
/// [`BridgeHandle`](crate::BridgeHandle): broadcasts via `on_state_changed`
/// and lifecycle callbacks via `on_host_*`/`on_instance_destroy`.
pub trait HostContext: Send {
    /// Subscribe to the radio-state-changed broadcast.
    fn register_state_receiver(&mut self) -> Result<(), BridgeError>;

    fn unregister_state_receiver(&mut self);

    /// Start delivering resume/pause/destroy notifications.
    fn add_lifecycle_listener(&mut self);

    fn remove_lifecycle_listener(&mut self);

    /// Deliver an event to application code.
    fn emit(&self, event_name: &str, event: StatusEvent);
}
