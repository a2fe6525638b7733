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
    sync::{Arc, Weak},
    time::Duration,
};

use tracing::warn;
use uuid::Uuid;

use super::{
    bus::{
        BusObject, Value, GATT_CHARACTERISTIC_INTERFACE,
        GATT_DESCRIPTOR_INTERFACE,
    },
    provider::{upgrade, Inner},
};
use crate::{
    api,
    common::{BluetoothError, NotifyCallback, ValueRouter},
};

/// A BlueZ `org.bluez.GattService1` object.
pub struct BluezGattService {
    inner: Weak<Inner>,
    object: BusObject,
    uuid: Uuid,
}

impl BluezGattService {
    pub(crate) fn new(inner: Weak<Inner>, object: BusObject, uuid: Uuid) -> Self {
        BluezGattService {
            inner,
            object,
            uuid,
        }
    }

    pub fn path(&self) -> &str {
        self.object.path()
    }
}

impl api::GattService for BluezGattService {
    type Characteristic = BluezGattCharacteristic;

    fn uuid(&self) -> Uuid {
        self.uuid
    }

    fn list_characteristics(&self) -> Result<Vec<Arc<BluezGattCharacteristic>>, BluetoothError> {
        let inner = upgrade(&self.inner)?;
        inner
            .object_paths(GATT_CHARACTERISTIC_INTERFACE, self.path())?
            .iter()
            .map(|path| inner.characteristic(path))
            .collect()
    }
}

/// A BlueZ `org.bluez.GattCharacteristic1` object. Value changes arrive as
/// `PropertiesChanged` signals on the `Value` property.
pub struct BluezGattCharacteristic {
    inner: Weak<Inner>,
    object: BusObject,
    uuid: Uuid,
    router: ValueRouter,
}

impl BluezGattCharacteristic {
    pub(crate) fn new(inner: Weak<Inner>, object: BusObject, uuid: Uuid) -> Self {
        BluezGattCharacteristic {
            inner,
            object,
            uuid,
            router: ValueRouter::new(),
        }
    }

    pub(crate) fn watch(characteristic: &Arc<Self>) -> Result<(), BluetoothError> {
        let weak = Arc::downgrade(characteristic);
        characteristic
            .object
            .subscribe(Box::new(move |interface, changed| {
                if interface != GATT_CHARACTERISTIC_INTERFACE {
                    return;
                }
                let Some(characteristic) = weak.upgrade() else {
                    return;
                };
                match changed.get("Value") {
                    Some(Value::Bytes(value)) => characteristic.router.deliver(value.clone()),
                    Some(other) => warn!(
                        "Ignoring non-byte Value on {}: {:?}",
                        characteristic.path(),
                        other
                    ),
                    None => {}
                }
            }))
    }

    pub fn path(&self) -> &str {
        self.object.path()
    }
}

impl api::GattCharacteristic for BluezGattCharacteristic {
    type Descriptor = BluezGattDescriptor;

    fn uuid(&self) -> Uuid {
        self.uuid
    }

    /// `ReadValue` replies with the bytes directly. The reply is cached and
    /// also satisfies the wait, so a value-changed signal racing the reply
    /// can't be lost.
    fn read_value(&self, timeout: Duration) -> Result<Vec<u8>, BluetoothError> {
        self.router.read_with(timeout, || {
            let value = self.object.call("ReadValue", &[])?.into_bytes()?;
            self.router.store(value);
            Ok(())
        })
    }

    fn write_value(&self, value: &[u8]) -> Result<(), BluetoothError> {
        self.object
            .call("WriteValue", &[Value::Bytes(value.to_vec())])
            .map(|_| ())
    }

    fn start_notify(&self, on_change: NotifyCallback) -> Result<(), BluetoothError> {
        self.router.subscribe(on_change);
        if let Err(err) = self.object.call("StartNotify", &[]) {
            self.router.unsubscribe();
            return Err(err);
        }
        Ok(())
    }

    fn stop_notify(&self) -> Result<(), BluetoothError> {
        self.object.call("StopNotify", &[])?;
        self.router.unsubscribe();
        Ok(())
    }

    fn list_descriptors(&self) -> Result<Vec<Arc<BluezGattDescriptor>>, BluetoothError> {
        let inner = upgrade(&self.inner)?;
        inner
            .object_paths(GATT_DESCRIPTOR_INTERFACE, self.path())?
            .iter()
            .map(|path| inner.descriptor(path))
            .collect()
    }
}

/// A BlueZ `org.bluez.GattDescriptor1` object.
pub struct BluezGattDescriptor {
    object: BusObject,
    uuid: Uuid,
}

impl BluezGattDescriptor {
    pub(crate) fn new(object: BusObject, uuid: Uuid) -> Self {
        BluezGattDescriptor { object, uuid }
    }

    pub fn path(&self) -> &str {
        self.object.path()
    }
}

impl api::GattDescriptor for BluezGattDescriptor {
    fn uuid(&self) -> Uuid {
        self.uuid
    }

    /// BlueZ replies to `ReadValue` synchronously, so `timeout` is unused.
    fn read_value(&self, _timeout: Duration) -> Result<Vec<u8>, BluetoothError> {
        self.object.call("ReadValue", &[])?.into_bytes()
    }
}
