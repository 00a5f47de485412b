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

/// Concrete types implementing this trait wrap the platform's Bluetooth radio
/// handle. A bridge built without one treats the radio as permanently off.
pub trait RadioAdapter: Send {
    /// Whether the radio is currently enabled.
    fn is_enabled(&self) -> bool;

    /// Ask the platform to turn the radio on. Returns whether the request was
    /// accepted; completion is reported later through the state broadcast.
    fn enable(&self) -> bool;

    /// Ask the platform to turn the radio off. Same contract as `enable`.
    fn disable(&self) -> bool;
}
