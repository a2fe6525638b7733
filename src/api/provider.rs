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

use std::{
    sync::Arc,
    thread,
    time::{Duration, Instant},
};

use uuid::Uuid;

use super::{Adapter, Device};
use crate::common::{BluetoothError, Config};

/// Entry point to one native BLE stack. Concrete providers own the identity
/// registries and hand out shared adapter and device objects.
pub trait Provider: Send + Sync {
    type Adapter: Adapter;
    type Device: Device;

    fn config(&self) -> Config;

    /// Adapters known to the system.
    fn list_adapters(&self) -> Result<Vec<Arc<Self::Adapter>>, BluetoothError>;

    /// Devices known to the system.
    fn list_devices(&self) -> Result<Vec<Arc<Self::Device>>, BluetoothError>;

    /// Drop device data cached by the OS so stale names or services don't
    /// linger.
    fn clear_cached_data(&self) -> Result<(), BluetoothError>;

    /// Disconnect every connected device exposing the given services. An
    /// empty list matches every device.
    fn disconnect_devices(&self, service_uuids: &[Uuid]) -> Result<(), BluetoothError>;

    /// Return the first adapter, if there is any.
    fn get_default_adapter(&self) -> Result<Option<Arc<Self::Adapter>>, BluetoothError> {
        Ok(self.list_adapters()?.into_iter().next())
    }

    /// Devices that have the given name or, if `name` is `None`, that
    /// advertise at least the given service UUIDs. Never blocks.
    fn find_devices(
        &self,
        service_uuids: &[Uuid],
        name: Option<&str>,
    ) -> Result<Vec<Arc<Self::Device>>, BluetoothError> {
        let mut found = Vec::new();
        for device in self.list_devices()? {
            let matches = match name {
                Some(name) => device.name()?.as_deref() == Some(name),
                None => {
                    let advertised = device.advertised()?;
                    service_uuids.iter().all(|uuid| advertised.contains(uuid))
                }
            };
            if matches {
                found.push(device);
            }
        }
        Ok(found)
    }

    /// First device matching `find_devices()`, re-checking every
    /// `Config::find_poll_interval` until `timeout` elapses. A zero timeout
    /// checks once.
    fn find_device(
        &self,
        service_uuids: &[Uuid],
        name: Option<&str>,
        timeout: Duration,
    ) -> Result<Option<Arc<Self::Device>>, BluetoothError> {
        let start = Instant::now();
        let interval = self.config().find_poll_interval;
        loop {
            if let Some(device) = self.find_devices(service_uuids, name)?.into_iter().next() {
                return Ok(Some(device));
            }
            let elapsed = start.elapsed();
            if elapsed >= timeout {
                return Ok(None);
            }
            thread::sleep(interval.min(timeout - elapsed));
        }
    }
}
