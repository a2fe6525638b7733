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

use std::time::Duration;

use crate::common::BluetoothError;

/// Concrete types implementing this trait are host-side BLE radios. They
/// control power and scanning; devices found while scanning are retrieved
/// from the owning `Provider`.
pub trait Adapter: Send + Sync {
    /// Retrieve the name of this adapter.
    fn name(&self) -> Result<String, BluetoothError>;

    /// Begin scanning for nearby advertisements. Blocks until the backend
    /// confirms scanning started, or fails with `Timeout`.
    fn start_scan(&self, timeout: Duration) -> Result<(), BluetoothError>;

    /// Stop scanning for nearby advertisements. Blocks until the backend
    /// confirms scanning stopped, or fails with `Timeout`.
    fn stop_scan(&self, timeout: Duration) -> Result<(), BluetoothError>;

    fn is_scanning(&self) -> Result<bool, BluetoothError>;

    /// Power the radio on. Backends that toggle power asynchronously block
    /// until the power-state event arrives or `timeout` elapses.
    fn power_on(&self, timeout: Duration) -> Result<(), BluetoothError>;

    /// Power the radio off. See `power_on()`.
    fn power_off(&self, timeout: Duration) -> Result<(), BluetoothError>;

    fn is_powered(&self) -> Result<bool, BluetoothError>;
}
