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

use crate::common::BluetoothError;

/// Error name BlueZ replies with when a property doesn't exist on an object.
pub const INVALID_ARGS: &str = "org.freedesktop.DBus.Error.InvalidArgs";

/// A D-Bus error reply.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("{name}: {message}")]
pub struct BusError {
    pub name: String,
    pub message: String,
}

impl BusError {
    pub fn new(name: &str, message: &str) -> Self {
        BusError {
            name: name.to_string(),
            message: message.to_string(),
        }
    }

    /// BlueZ reports a missing optional property (e.g. `UUIDs` on a device
    /// that advertised none) as `InvalidArgs`.
    pub fn is_optional_absent(&self) -> bool {
        self.name == INVALID_ARGS
    }
}

impl From<BusError> for BluetoothError {
    fn from(err: BusError) -> Self {
        BluetoothError::System(err.to_string())
    }
}
