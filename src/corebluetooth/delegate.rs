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

use tracing::{debug, warn};
use uuid::Uuid;

use super::{
    central::{CharacteristicRef, DescriptorRef, ManagerState, PeripheralRef, ServiceRef},
    provider::Inner,
    CentralError,
};
use crate::common::{uuid_from_bytes, BluetoothError};

/// Receives the `CBCentralManagerDelegate` and `CBPeripheralDelegate`
/// callbacks on the native event thread. Drives the adapter and device
/// state machines and walks the GATT tree: services, then characteristics
/// per service, then descriptors per characteristic.
#[derive(Clone)]
pub struct CentralDelegate {
    inner: Weak<Inner>,
}

impl CentralDelegate {
    pub(crate) fn new(inner: Weak<Inner>) -> Self {
        CentralDelegate { inner }
    }

    fn inner(&self) -> Option<Arc<Inner>> {
        let inner = self.inner.upgrade();
        if inner.is_none() {
            debug!("Dropping callback for a released provider");
        }
        inner
    }

    /// `centralManagerDidUpdateState:`
    pub fn did_update_state(&self, state: ManagerState) {
        debug!("centralManagerDidUpdateState: {:?}", state);
        if let Some(inner) = self.inner() {
            inner.adapter.state_updated(state);
        }
    }

    /// `centralManager:didDiscoverPeripheral:advertisementData:RSSI:`.
    /// `service_uuids` is the raw `kCBAdvDataServiceUUIDs` entry.
    pub fn did_discover_peripheral(
        &self,
        peripheral: PeripheralRef,
        service_uuids: &[Vec<u8>],
        rssi: Option<i16>,
    ) {
        debug!("centralManager:didDiscoverPeripheral: {:?}", peripheral);
        let Some(inner) = self.inner() else {
            return;
        };
        let device = match inner.device(peripheral) {
            Ok(device) => device,
            Err(err) => {
                warn!("Ignoring peripheral {:?}: {}", peripheral, err);
                return;
            }
        };
        let uuids: Vec<Uuid> = service_uuids
            .iter()
            .filter_map(|raw| match uuid_from_bytes(raw) {
                Ok(uuid) => Some(uuid),
                Err(err) => {
                    warn!("Ignoring advertised service UUID {:02x?}: {}", raw, err);
                    None
                }
            })
            .collect();
        device.advertisement_received(uuids, rssi);
    }

    /// `centralManager:didConnectPeripheral:`. Kicks off service discovery.
    pub fn did_connect(&self, peripheral: PeripheralRef) {
        debug!("centralManager:didConnectPeripheral: {:?}", peripheral);
        let Some(inner) = self.inner() else {
            return;
        };
        let Some(device) = inner.devices.get(&peripheral) else {
            warn!("Connected to unknown peripheral {:?}", peripheral);
            return;
        };
        if let Err(err) = inner.central.discover_services(peripheral) {
            warn!("Failed to start service discovery on {:?}: {}", peripheral, err);
        }
        device.connected();
    }

    /// `centralManager:didFailToConnectPeripheral:error:`. The pending
    /// `connect()` runs into its timeout.
    pub fn did_fail_to_connect(&self, peripheral: PeripheralRef, error: CentralError) {
        warn!("Failed to connect to {:?}: {}", peripheral, error);
    }

    /// `centralManager:didDisconnectPeripheral:error:`. The peripheral is
    /// forgotten along with its GATT tree; the next advertisement registers
    /// it afresh.
    pub fn did_disconnect(&self, peripheral: PeripheralRef, error: Option<CentralError>) {
        debug!(
            "centralManager:didDisconnectPeripheral: {:?} {:?}",
            peripheral, error
        );
        let Some(inner) = self.inner() else {
            return;
        };
        inner.evict_children(peripheral);
        if let Some(device) = inner.devices.remove(&peripheral) {
            device.disconnected();
        }
    }

    /// `peripheral:didDiscoverServices:`
    pub fn did_discover_services(
        &self,
        peripheral: PeripheralRef,
        result: Result<(), CentralError>,
    ) {
        debug!("peripheral:didDiscoverServices: {:?}", peripheral);
        if let Err(err) = result {
            warn!("Service discovery failed on {:?}: {}", peripheral, err);
            return;
        }
        let Some(inner) = self.inner() else {
            return;
        };
        let services = inner.central.services(peripheral);
        if services.is_empty() {
            if let Some(device) = inner.devices.get(&peripheral) {
                device.no_services_found();
            }
            return;
        }
        for service in services {
            if let Err(err) = self.register_service(&inner, peripheral, service) {
                warn!("Skipping service {:?} of {:?}: {}", service, peripheral, err);
            }
        }
    }

    fn register_service(
        &self,
        inner: &Arc<Inner>,
        peripheral: PeripheralRef,
        service: ServiceRef,
    ) -> Result<(), BluetoothError> {
        inner.service(peripheral, service)?;
        Ok(inner.central.discover_characteristics(peripheral, service)?)
    }

    /// `peripheral:didDiscoverCharacteristicsForService:error:`
    pub fn did_discover_characteristics(
        &self,
        peripheral: PeripheralRef,
        service: ServiceRef,
        result: Result<(), CentralError>,
    ) {
        debug!("peripheral:didDiscoverCharacteristicsForService: {:?}", service);
        if let Err(err) = result {
            warn!("Characteristic discovery failed on {:?}: {}", service, err);
            return;
        }
        let Some(inner) = self.inner() else {
            return;
        };
        // The service was evicted by a disconnect while discovery was in flight.
        if inner.services.get(&service).is_none() {
            debug!("Ignoring characteristics of evicted service {:?}", service);
            return;
        }
        for characteristic in inner.central.characteristics(service) {
            if let Err(err) = self.register_characteristic(&inner, peripheral, characteristic) {
                warn!("Skipping characteristic {:?}: {}", characteristic, err);
            }
        }
        if let Some(device) = inner.devices.get(&peripheral) {
            device.characteristics_discovered(service, &inner.central.services(peripheral));
        }
    }

    fn register_characteristic(
        &self,
        inner: &Arc<Inner>,
        peripheral: PeripheralRef,
        characteristic: CharacteristicRef,
    ) -> Result<(), BluetoothError> {
        inner.characteristic(peripheral, characteristic)?;
        Ok(inner.central.discover_descriptors(peripheral, characteristic)?)
    }

    /// `peripheral:didDiscoverDescriptorsForCharacteristic:error:`
    pub fn did_discover_descriptors(
        &self,
        peripheral: PeripheralRef,
        characteristic: CharacteristicRef,
        result: Result<(), CentralError>,
    ) {
        debug!("peripheral:didDiscoverDescriptorsForCharacteristic: {:?}", characteristic);
        if let Err(err) = result {
            warn!("Descriptor discovery failed on {:?}: {}", characteristic, err);
            return;
        }
        let Some(inner) = self.inner() else {
            return;
        };
        if inner.characteristics.get(&characteristic).is_none() {
            debug!("Ignoring descriptors of evicted characteristic {:?}", characteristic);
            return;
        }
        for descriptor in inner.central.descriptors(characteristic) {
            if let Err(err) = inner.descriptor(peripheral, descriptor) {
                warn!("Skipping descriptor {:?}: {}", descriptor, err);
            }
        }
    }

    /// `peripheral:didWriteValueForCharacteristic:error:`
    pub fn did_write_value(
        &self,
        characteristic: CharacteristicRef,
        result: Result<(), CentralError>,
    ) {
        match result {
            Ok(()) => debug!("peripheral:didWriteValueForCharacteristic: {:?}", characteristic),
            Err(err) => warn!("Write to {:?} failed: {}", characteristic, err),
        }
    }

    /// `peripheral:didUpdateNotificationStateForCharacteristic:error:`
    pub fn did_update_notification_state(
        &self,
        characteristic: CharacteristicRef,
        result: Result<(), CentralError>,
    ) {
        match result {
            Ok(()) => debug!(
                "peripheral:didUpdateNotificationStateForCharacteristic: {:?}",
                characteristic
            ),
            Err(err) => warn!("Notification state change on {:?} failed: {}", characteristic, err),
        }
    }

    /// `peripheral:didUpdateValueForCharacteristic:error:`. Covers both read
    /// replies and notifications.
    pub fn did_update_characteristic_value(
        &self,
        characteristic: CharacteristicRef,
        result: Result<Vec<u8>, CentralError>,
    ) {
        debug!("peripheral:didUpdateValueForCharacteristic: {:?}", characteristic);
        let value = match result {
            Ok(value) => value,
            Err(err) => {
                warn!("Value update on {:?} failed: {}", characteristic, err);
                return;
            }
        };
        let Some(inner) = self.inner() else {
            return;
        };
        match inner.characteristics.get(&characteristic) {
            Some(registered) => registered.value_updated(value),
            None => debug!("Value for unregistered characteristic {:?}", characteristic),
        }
    }

    /// `peripheral:didUpdateValueForDescriptor:error:`
    pub fn did_update_descriptor_value(
        &self,
        descriptor: DescriptorRef,
        result: Result<Vec<u8>, CentralError>,
    ) {
        debug!("peripheral:didUpdateValueForDescriptor: {:?}", descriptor);
        let value = match result {
            Ok(value) => value,
            Err(err) => {
                warn!("Value update on {:?} failed: {}", descriptor, err);
                return;
            }
        };
        let Some(inner) = self.inner() else {
            return;
        };
        if let Some(registered) = inner.descriptors.get(&descriptor) {
            registered.value_updated(value);
        }
    }

    /// `peripheral:didReadRSSI:error:`
    pub fn did_read_rssi(&self, peripheral: PeripheralRef, result: Result<i16, CentralError>) {
        debug!("peripheral:didReadRSSI: {:?}", peripheral);
        let rssi = match result {
            Ok(rssi) => rssi,
            Err(err) => {
                warn!("RSSI read on {:?} failed: {}", peripheral, err);
                return;
            }
        };
        if let Some(device) = self.inner().and_then(|inner| inner.devices.get(&peripheral)) {
            device.rssi_updated(rssi);
        }
    }
}
