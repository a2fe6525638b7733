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

use std::{fmt, sync::Arc, time::Duration};

use uuid::Uuid;

use super::GattService;
use crate::common::{BluetoothError, DeviceState};

/// Stable identity of a remote device. Native object references may be
/// reissued by the backend; this value is not.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DeviceId {
    /// MAC address, as reported by stacks that expose it.
    Address(String),
    /// Platform-assigned identifier for stacks that hide the MAC address.
    Identifier(Uuid),
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceId::Address(addr) => f.write_str(addr),
            DeviceId::Identifier(id) => write!(f, "{}", id),
        }
    }
}

/// Concrete types implementing this trait represent BLE Peripheral devices.
/// They provide methods for retrieving device info, connecting and waiting
/// for the peripheral's GATT tree to be discovered.
pub trait Device: Send + Sync {
    type Service: GattService;

    fn id(&self) -> DeviceId;

    /// Retrieve the name advertised by this device, if any.
    fn name(&self) -> Result<Option<String>, BluetoothError>;

    /// Connect to the device, blocking until the backend reports the link is
    /// up. Fails with `Timeout` otherwise, leaving the device disconnected.
    fn connect(&self, timeout: Duration) -> Result<(), BluetoothError>;

    /// Disconnect from the device, blocking until the backend reports the
    /// link is down.
    fn disconnect(&self, timeout: Duration) -> Result<(), BluetoothError>;

    fn state(&self) -> DeviceState;

    fn is_connected(&self) -> Result<bool, BluetoothError>;

    /// Service UUIDs this device has advertised so far.
    fn advertised(&self) -> Result<Vec<Uuid>, BluetoothError>;

    /// Signal strength in dBm, `None` if the backend has no reading.
    fn rssi(&self, timeout: Duration) -> Result<Option<i16>, BluetoothError>;

    /// Services discovered so far.
    fn list_services(&self) -> Result<Vec<Arc<Self::Service>>, BluetoothError>;

    /// Wait up to `timeout` for at least the given services and
    /// characteristics to be discovered. Returns `Ok(false)` if they weren't
    /// discovered in time.
    fn discover(
        &self,
        service_uuids: &[Uuid],
        characteristic_uuids: &[Uuid],
        timeout: Duration,
    ) -> Result<bool, BluetoothError>;

    /// Return the first discovered service with the given UUID.
    fn find_service(
        &self,
        uuid: Uuid,
    ) -> Result<Option<Arc<Self::Service>>, BluetoothError> {
        Ok(self
            .list_services()?
            .into_iter()
            .find(|service| service.uuid() == uuid))
    }
}
