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

use std::sync::{Arc, Weak};

use tracing::{debug, info};
use uuid::Uuid;

use super::{
    central::{CentralManager, CharacteristicRef, DescriptorRef, PeripheralRef, ServiceRef},
    CentralDelegate, CoreBluetoothAdapter, CoreBluetoothDevice,
    CoreBluetoothGattCharacteristic, CoreBluetoothGattDescriptor,
    CoreBluetoothGattService,
};
use crate::{
    api::{self, Adapter, Device},
    common::{uuid_from_bytes, BluetoothError, Config, Registry},
};

/// State shared by the provider, its delegate and every object handed out.
pub(crate) struct Inner {
    pub(crate) central: Arc<dyn CentralManager>,
    pub(crate) config: Config,
    pub(crate) adapter: Arc<CoreBluetoothAdapter>,
    pub(crate) devices: Registry<PeripheralRef, Arc<CoreBluetoothDevice>>,
    pub(crate) services: Registry<ServiceRef, Arc<CoreBluetoothGattService>>,
    pub(crate) characteristics: Registry<CharacteristicRef, Arc<CoreBluetoothGattCharacteristic>>,
    pub(crate) descriptors: Registry<DescriptorRef, Arc<CoreBluetoothGattDescriptor>>,
}

pub(crate) fn upgrade(inner: &Weak<Inner>) -> Result<Arc<Inner>, BluetoothError> {
    inner.upgrade().ok_or_else(|| {
        BluetoothError::FailedPrecondition(String::from(
            "the CoreBluetooth provider owning this object has been dropped",
        ))
    })
}

impl Inner {
    pub(crate) fn device(
        self: &Arc<Self>,
        peripheral: PeripheralRef,
    ) -> Result<Arc<CoreBluetoothDevice>, BluetoothError> {
        if let Some(device) = self.devices.get(&peripheral) {
            return Ok(device);
        }
        let identifier = self.central.peripheral_identifier(peripheral)?;
        Ok(self.devices.add_if_absent(peripheral, || {
            debug!("Registered peripheral {}", identifier);
            Arc::new(CoreBluetoothDevice::new(
                Arc::downgrade(self),
                peripheral,
                identifier,
            ))
        }))
    }

    pub(crate) fn service(
        self: &Arc<Self>,
        peripheral: PeripheralRef,
        service: ServiceRef,
    ) -> Result<Arc<CoreBluetoothGattService>, BluetoothError> {
        if let Some(registered) = self.services.get(&service) {
            return Ok(registered);
        }
        let uuid = uuid_from_bytes(&self.central.service_uuid(service)?)?;
        Ok(self.services.add_if_absent(service, || {
            Arc::new(CoreBluetoothGattService::new(
                Arc::downgrade(self),
                peripheral,
                service,
                uuid,
            ))
        }))
    }

    pub(crate) fn characteristic(
        self: &Arc<Self>,
        peripheral: PeripheralRef,
        characteristic: CharacteristicRef,
    ) -> Result<Arc<CoreBluetoothGattCharacteristic>, BluetoothError> {
        if let Some(registered) = self.characteristics.get(&characteristic) {
            return Ok(registered);
        }
        let uuid = uuid_from_bytes(&self.central.characteristic_uuid(characteristic)?)?;
        Ok(self.characteristics.add_if_absent(characteristic, || {
            Arc::new(CoreBluetoothGattCharacteristic::new(
                Arc::downgrade(self),
                peripheral,
                characteristic,
                uuid,
            ))
        }))
    }

    pub(crate) fn descriptor(
        self: &Arc<Self>,
        peripheral: PeripheralRef,
        descriptor: DescriptorRef,
    ) -> Result<Arc<CoreBluetoothGattDescriptor>, BluetoothError> {
        if let Some(registered) = self.descriptors.get(&descriptor) {
            return Ok(registered);
        }
        let uuid = uuid_from_bytes(&self.central.descriptor_uuid(descriptor)?)?;
        Ok(self.descriptors.add_if_absent(descriptor, || {
            Arc::new(CoreBluetoothGattDescriptor::new(
                Arc::downgrade(self),
                peripheral,
                descriptor,
                uuid,
            ))
        }))
    }

    /// Forget every service, characteristic and descriptor of `peripheral`.
    pub(crate) fn evict_children(&self, peripheral: PeripheralRef) {
        self.descriptors.retain(|_, d| d.peripheral() != peripheral);
        self.characteristics.retain(|_, c| c.peripheral() != peripheral);
        self.services.retain(|_, s| s.peripheral() != peripheral);
    }

    pub(crate) fn children_registered(&self, peripheral: PeripheralRef) -> usize {
        self.services.list().iter().filter(|s| s.peripheral() == peripheral).count()
            + self
                .characteristics
                .list()
                .iter()
                .filter(|c| c.peripheral() == peripheral)
                .count()
            + self
                .descriptors
                .list()
                .iter()
                .filter(|d| d.peripheral() == peripheral)
                .count()
    }
}

/// BLE provider backed by CoreBluetooth. The binding forwards
/// `CBCentralManagerDelegate` and `CBPeripheralDelegate` callbacks to the
/// [`CentralDelegate`] returned by `delegate()`.
pub struct CoreBluetoothProvider {
    inner: Arc<Inner>,
}

impl CoreBluetoothProvider {
    pub fn new(central: Arc<dyn CentralManager>, config: Config) -> Self {
        let powered = central.state() == super::ManagerState::PoweredOn;
        let adapter = Arc::new(CoreBluetoothAdapter::new(central.clone(), powered));
        CoreBluetoothProvider {
            inner: Arc::new(Inner {
                central,
                config,
                adapter,
                devices: Registry::new(),
                services: Registry::new(),
                characteristics: Registry::new(),
                descriptors: Registry::new(),
            }),
        }
    }

    /// Receiver for the native callbacks. Callbacks arriving after the
    /// provider is dropped are ignored.
    pub fn delegate(&self) -> CentralDelegate {
        CentralDelegate::new(Arc::downgrade(&self.inner))
    }

    /// Number of services, characteristics and descriptors currently
    /// registered for `peripheral`.
    pub fn registered_children(&self, peripheral: PeripheralRef) -> usize {
        self.inner.children_registered(peripheral)
    }
}

impl api::Provider for CoreBluetoothProvider {
    type Adapter = CoreBluetoothAdapter;
    type Device = CoreBluetoothDevice;

    fn config(&self) -> Config {
        self.inner.config
    }

    /// CoreBluetooth exposes a single, unnamed adapter.
    fn list_adapters(&self) -> Result<Vec<Arc<CoreBluetoothAdapter>>, BluetoothError> {
        Ok(vec![self.inner.adapter.clone()])
    }

    /// Peripherals seen by the delegate so far.
    fn list_devices(&self) -> Result<Vec<Arc<CoreBluetoothDevice>>, BluetoothError> {
        let mut devices = self.inner.devices.list();
        devices.sort_by_key(|device| device.peripheral());
        Ok(devices)
    }

    fn clear_cached_data(&self) -> Result<(), BluetoothError> {
        let adapter = &self.inner.adapter;
        if adapter.is_powered()? {
            adapter.power_off(self.inner.config.timeout)?;
        }
        info!("Clearing the CoreBluetooth device cache");
        self.inner.central.clear_cache()?;
        Ok(())
    }

    fn disconnect_devices(&self, service_uuids: &[Uuid]) -> Result<(), BluetoothError> {
        for peripheral in self.inner.central.connected_peripherals(service_uuids)? {
            match self.inner.devices.get(&peripheral) {
                Some(device) => device.disconnect(self.inner.config.timeout)?,
                None => self.inner.central.cancel_connection(peripheral)?,
            }
        }
        Ok(())
    }
}
