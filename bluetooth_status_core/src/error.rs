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

use thiserror::Error;

/// Library error type. Only surfaced to the code embedding the bridge; the
/// operations exposed to application code never fail.
#[non_exhaustive]
#[derive(Error, Debug, PartialEq)]
pub enum BridgeError {
    /// Reported when the host refuses the radio-state broadcast receiver.
    #[error("failed to register state receiver: {0}")]
    ReceiverRegistration(String),
    /// Indicates that the operation was rejected because the bridge is not in
    /// the phase required for it, e.g. initializing twice or after teardown.
    #[error("failed precondition: {0}")]
    FailedPrecondition(String),
    /// Wrapper around host-level errors, e.g. a JNI call that threw.
    #[error("platform error: {0}")]
    Platform(String),
}
