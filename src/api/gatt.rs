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

use std::{sync::Arc, time::Duration};

use uuid::Uuid;

use crate::common::{BluetoothError, NotifyCallback};

/// A GATT service discovered on a connected device.
pub trait GattService: Send + Sync {
    type Characteristic: GattCharacteristic;

    fn uuid(&self) -> Uuid;

    /// Characteristics discovered so far for this service.
    fn list_characteristics(
        &self,
    ) -> Result<Vec<Arc<Self::Characteristic>>, BluetoothError>;

    /// Return the first discovered characteristic with the given UUID.
    fn find_characteristic(
        &self,
        uuid: Uuid,
    ) -> Result<Option<Arc<Self::Characteristic>>, BluetoothError> {
        Ok(self
            .list_characteristics()?
            .into_iter()
            .find(|characteristic| characteristic.uuid() == uuid))
    }
}

/// A GATT characteristic. Values are raw bytes.
pub trait GattCharacteristic: Send + Sync {
    type Descriptor: GattDescriptor;

    fn uuid(&self) -> Uuid;

    /// Read the value, blocking until the backend delivers it or `timeout`
    /// elapses.
    fn read_value(&self, timeout: Duration) -> Result<Vec<u8>, BluetoothError>;

    fn write_value(&self, value: &[u8]) -> Result<(), BluetoothError>;

    /// Enable notifications and deliver every new value to `on_change`. A
    /// later call replaces the earlier callback.
    fn start_notify(&self, on_change: NotifyCallback) -> Result<(), BluetoothError>;

    fn stop_notify(&self) -> Result<(), BluetoothError>;

    /// Descriptors discovered so far for this characteristic.
    fn list_descriptors(&self) -> Result<Vec<Arc<Self::Descriptor>>, BluetoothError>;

    /// Return the first discovered descriptor with the given UUID.
    fn find_descriptor(
        &self,
        uuid: Uuid,
    ) -> Result<Option<Arc<Self::Descriptor>>, BluetoothError> {
        Ok(self
            .list_descriptors()?
            .into_iter()
            .find(|descriptor| descriptor.uuid() == uuid))
    }
}

pub trait GattDescriptor: Send + Sync {
    fn uuid(&self) -> Uuid;

    fn read_value(&self, timeout: Duration) -> Result<Vec<u8>, BluetoothError>;
}
