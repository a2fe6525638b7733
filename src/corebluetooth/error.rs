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

/// An `NSError` reported by CoreBluetooth, either returned from a call or
/// passed to a delegate callback.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("CoreBluetooth error {code}: {message}")]
pub struct CentralError {
    pub code: i64,
    pub message: String,
}

impl CentralError {
    pub fn new(code: i64, message: &str) -> Self {
        CentralError {
            code,
            message: message.to_string(),
        }
    }
}

impl From<CentralError> for BluetoothError {
    fn from(err: CentralError) -> Self {
        BluetoothError::System(err.to_string())
    }
}
