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

use uuid::Uuid;

use super::{
    central::{CharacteristicRef, DescriptorRef, PeripheralRef, ServiceRef, WriteType},
    provider::{upgrade, Inner},
};
use crate::{
    api,
    common::{BluetoothError, NotifyCallback, ValueRouter},
};

/// A `CBService`.
pub struct CoreBluetoothGattService {
    inner: Weak<Inner>,
    peripheral: PeripheralRef,
    service: ServiceRef,
    uuid: Uuid,
}

impl CoreBluetoothGattService {
    pub(crate) fn new(
        inner: Weak<Inner>,
        peripheral: PeripheralRef,
        service: ServiceRef,
        uuid: Uuid,
    ) -> Self {
        CoreBluetoothGattService {
            inner,
            peripheral,
            service,
            uuid,
        }
    }

    pub(crate) fn peripheral(&self) -> PeripheralRef {
        self.peripheral
    }
}

impl api::GattService for CoreBluetoothGattService {
    type Characteristic = CoreBluetoothGattCharacteristic;

    fn uuid(&self) -> Uuid {
        self.uuid
    }

    fn list_characteristics(
        &self,
    ) -> Result<Vec<Arc<CoreBluetoothGattCharacteristic>>, BluetoothError> {
        let inner = upgrade(&self.inner)?;
        inner
            .characteristics
            .get_all(&inner.central.characteristics(self.service))
    }
}

/// A `CBCharacteristic`. Reads and notifications both complete through
/// `peripheral:didUpdateValueForCharacteristic:error:`.
pub struct CoreBluetoothGattCharacteristic {
    inner: Weak<Inner>,
    peripheral: PeripheralRef,
    characteristic: CharacteristicRef,
    uuid: Uuid,
    router: ValueRouter,
}

impl CoreBluetoothGattCharacteristic {
    pub(crate) fn new(
        inner: Weak<Inner>,
        peripheral: PeripheralRef,
        characteristic: CharacteristicRef,
        uuid: Uuid,
    ) -> Self {
        CoreBluetoothGattCharacteristic {
            inner,
            peripheral,
            characteristic,
            uuid,
            router: ValueRouter::new(),
        }
    }

    pub(crate) fn peripheral(&self) -> PeripheralRef {
        self.peripheral
    }

    pub(crate) fn value_updated(&self, value: Vec<u8>) {
        self.router.deliver(value);
    }
}

impl api::GattCharacteristic for CoreBluetoothGattCharacteristic {
    type Descriptor = CoreBluetoothGattDescriptor;

    fn uuid(&self) -> Uuid {
        self.uuid
    }

    fn read_value(&self, timeout: Duration) -> Result<Vec<u8>, BluetoothError> {
        let inner = upgrade(&self.inner)?;
        self.router.read_with(timeout, || {
            Ok(inner
                .central
                .read_characteristic(self.peripheral, self.characteristic)?)
        })
    }

    fn write_value(&self, value: &[u8]) -> Result<(), BluetoothError> {
        Ok(upgrade(&self.inner)?.central.write_characteristic(
            self.peripheral,
            self.characteristic,
            value,
            WriteType::default(),
        )?)
    }

    fn start_notify(&self, on_change: NotifyCallback) -> Result<(), BluetoothError> {
        let inner = upgrade(&self.inner)?;
        self.router.subscribe(on_change);
        if let Err(err) = inner
            .central
            .set_notify(self.peripheral, self.characteristic, true)
        {
            self.router.unsubscribe();
            return Err(err.into());
        }
        Ok(())
    }

    fn stop_notify(&self) -> Result<(), BluetoothError> {
        upgrade(&self.inner)?
            .central
            .set_notify(self.peripheral, self.characteristic, false)?;
        self.router.unsubscribe();
        Ok(())
    }

    fn list_descriptors(&self) -> Result<Vec<Arc<CoreBluetoothGattDescriptor>>, BluetoothError> {
        let inner = upgrade(&self.inner)?;
        inner
            .descriptors
            .get_all(&inner.central.descriptors(self.characteristic))
    }
}

/// A `CBDescriptor`.
pub struct CoreBluetoothGattDescriptor {
    inner: Weak<Inner>,
    peripheral: PeripheralRef,
    descriptor: DescriptorRef,
    uuid: Uuid,
    router: ValueRouter,
}

impl CoreBluetoothGattDescriptor {
    pub(crate) fn new(
        inner: Weak<Inner>,
        peripheral: PeripheralRef,
        descriptor: DescriptorRef,
        uuid: Uuid,
    ) -> Self {
        CoreBluetoothGattDescriptor {
            inner,
            peripheral,
            descriptor,
            uuid,
            router: ValueRouter::new(),
        }
    }

    pub(crate) fn peripheral(&self) -> PeripheralRef {
        self.peripheral
    }

    /// Descriptor values only ever complete a pending read.
    pub(crate) fn value_updated(&self, value: Vec<u8>) {
        self.router.store(value);
    }
}

impl api::GattDescriptor for CoreBluetoothGattDescriptor {
    fn uuid(&self) -> Uuid {
        self.uuid
    }

    fn read_value(&self, timeout: Duration) -> Result<Vec<u8>, BluetoothError> {
        let inner = upgrade(&self.inner)?;
        self.router.read_with(timeout, || {
            Ok(inner.central.read_descriptor(self.peripheral, self.descriptor)?)
        })
    }
}
