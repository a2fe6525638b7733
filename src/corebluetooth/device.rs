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
    collections::HashSet,
    sync::{Arc, Mutex, PoisonError, Weak},
    time::Duration,
};

use tracing::{debug, info};
use uuid::Uuid;

use super::{
    central::{PeripheralRef, ServiceRef},
    provider::{upgrade, Inner},
    CoreBluetoothGattService,
};
use crate::{
    api::{self, DeviceId, GattCharacteristic, GattService},
    common::{
        BluetoothError, DeviceState, DeviceStatus, DiscoverySnapshot,
        Operation, ServiceDiscoveryTracker, Signal,
    },
};

/// A `CBPeripheral`.
pub struct CoreBluetoothDevice {
    inner: Weak<Inner>,
    peripheral: PeripheralRef,
    identifier: Uuid,
    status: DeviceStatus,
    discovery: ServiceDiscoveryTracker<ServiceRef>,
    rssi: Mutex<Option<i16>>,
    rssi_read: Signal,
}

impl CoreBluetoothDevice {
    pub(crate) fn new(inner: Weak<Inner>, peripheral: PeripheralRef, identifier: Uuid) -> Self {
        CoreBluetoothDevice {
            inner,
            peripheral,
            identifier,
            status: DeviceStatus::new(DeviceState::Advertised),
            discovery: ServiceDiscoveryTracker::new(),
            rssi: Mutex::new(None),
            rssi_read: Signal::new(),
        }
    }

    pub fn peripheral(&self) -> PeripheralRef {
        self.peripheral
    }

    pub(crate) fn advertisement_received(&self, service_uuids: Vec<Uuid>, rssi: Option<i16>) {
        self.status.merge_advertised(service_uuids);
        if rssi.is_some() {
            *self.rssi.lock().unwrap_or_else(PoisonError::into_inner) = rssi;
        }
    }

    pub(crate) fn connected(&self) {
        self.status.on_connected();
        self.status.on_discovery_started();
    }

    pub(crate) fn disconnected(&self) {
        self.discovery.reset();
        self.status.on_disconnected();
    }

    /// A peripheral exposing no services has nothing left to discover.
    pub(crate) fn no_services_found(&self) {
        self.discovery.mark_complete();
        self.status.on_discovery_finished();
    }

    /// Characteristics of `service` were discovered. `known` is every
    /// service the peripheral currently exposes.
    pub(crate) fn characteristics_discovered(&self, service: ServiceRef, known: &[ServiceRef]) {
        if self.discovery.service_discovered(service, known) {
            debug!("Discovery complete for {}", self.identifier);
            self.status.on_discovery_finished();
        }
    }

    pub(crate) fn rssi_updated(&self, rssi: i16) {
        *self.rssi.lock().unwrap_or_else(PoisonError::into_inner) = Some(rssi);
        self.rssi_read.set();
    }

    fn snapshot(&self) -> Result<DiscoverySnapshot, BluetoothError> {
        let mut services: HashSet<Uuid> = self.status.advertised().into_iter().collect();
        let mut characteristics = HashSet::new();
        for service in api::Device::list_services(self)? {
            services.insert(service.uuid());
            for characteristic in service.list_characteristics()? {
                characteristics.insert(characteristic.uuid());
            }
        }
        Ok(DiscoverySnapshot {
            services,
            characteristics,
        })
    }
}

impl api::Device for CoreBluetoothDevice {
    type Service = CoreBluetoothGattService;

    /// CoreBluetooth hides the MAC address behind a per-host identifier.
    fn id(&self) -> DeviceId {
        DeviceId::Identifier(self.identifier)
    }

    fn name(&self) -> Result<Option<String>, BluetoothError> {
        Ok(upgrade(&self.inner)?.central.peripheral_name(self.peripheral))
    }

    /// Service discovery starts automatically once the link is up.
    fn connect(&self, timeout: Duration) -> Result<(), BluetoothError> {
        let inner = upgrade(&self.inner)?;
        info!("Connecting to {}", self.identifier);
        self.discovery.reset();
        let result = self
            .status
            .connect_with(timeout, || Ok(inner.central.connect(self.peripheral)?));
        if result.is_err() {
            inner.evict_children(self.peripheral);
        }
        result
    }

    /// Children are evicted before cancelling since CoreBluetooth
    /// invalidates them once the link is gone.
    fn disconnect(&self, timeout: Duration) -> Result<(), BluetoothError> {
        let inner = upgrade(&self.inner)?;
        info!("Disconnecting from {}", self.identifier);
        inner.evict_children(self.peripheral);
        self.status.disconnect_with(timeout, || {
            Ok(inner.central.cancel_connection(self.peripheral)?)
        })
    }

    fn state(&self) -> DeviceState {
        self.status.state()
    }

    fn is_connected(&self) -> Result<bool, BluetoothError> {
        Ok(self.status.is_connected())
    }

    fn advertised(&self) -> Result<Vec<Uuid>, BluetoothError> {
        Ok(self.status.advertised())
    }

    fn rssi(&self, timeout: Duration) -> Result<Option<i16>, BluetoothError> {
        let inner = upgrade(&self.inner)?;
        self.rssi_read.clear();
        inner.central.read_rssi(self.peripheral)?;
        self.rssi_read.wait_for(timeout, Operation::ReadRssi)?;
        Ok(*self.rssi.lock().unwrap_or_else(PoisonError::into_inner))
    }

    /// Fails with `LookupInconsistency` if CoreBluetooth reports a service
    /// the delegate never registered.
    fn list_services(&self) -> Result<Vec<Arc<CoreBluetoothGattService>>, BluetoothError> {
        let inner = upgrade(&self.inner)?;
        inner
            .services
            .get_all(&inner.central.services(self.peripheral))
    }

    /// CoreBluetooth reports when every service's characteristics are
    /// known, so this waits for that instead of polling.
    fn discover(
        &self,
        service_uuids: &[Uuid],
        characteristic_uuids: &[Uuid],
        timeout: Duration,
    ) -> Result<bool, BluetoothError> {
        if !self.discovery.wait(timeout) {
            debug!("Discovery on {} did not complete within {:?}", self.identifier, timeout);
            return Ok(false);
        }
        Ok(self.snapshot()?.satisfies(service_uuids, characteristic_uuids))
    }
}
