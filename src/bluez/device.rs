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
    sync::{Arc, Weak},
    time::Duration,
};

use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{
    bus::{
        BusObject, PropertyMap, Value, DEVICE_INTERFACE,
        GATT_CHARACTERISTIC_INTERFACE, GATT_SERVICE_INTERFACE,
    },
    provider::{upgrade, Inner},
    BluezGattService,
};
use crate::{
    api::{self, DeviceId, GattCharacteristic, GattService},
    common::{
        poll_until_discovered, BluetoothError, DeviceState, DeviceStatus,
        DiscoverySnapshot,
    },
};

/// A BlueZ `org.bluez.Device1` object.
pub struct BluezDevice {
    inner: Weak<Inner>,
    object: BusObject,
    address: String,
    status: DeviceStatus,
}

fn parse_uuids(value: &Value) -> Result<Vec<Uuid>, BluetoothError> {
    value
        .as_str_list()?
        .iter()
        .map(|uuid| Ok(Uuid::parse_str(uuid)?))
        .collect()
}

impl BluezDevice {
    pub(crate) fn new(
        inner: Weak<Inner>,
        object: BusObject,
        address: String,
        connected: bool,
    ) -> Self {
        let initial = if connected {
            DeviceState::Connected
        } else {
            DeviceState::Advertised
        };
        BluezDevice {
            inner,
            object,
            address,
            status: DeviceStatus::new(initial),
        }
    }

    pub(crate) fn watch(device: &Arc<Self>) -> Result<(), BluetoothError> {
        let weak = Arc::downgrade(device);
        device.object.subscribe(Box::new(move |interface, changed| {
            if interface != DEVICE_INTERFACE {
                return;
            }
            if let Some(device) = weak.upgrade() {
                device.properties_changed(changed);
            }
        }))
    }

    fn properties_changed(&self, changed: &PropertyMap) {
        if let Some(Value::Bool(connected)) = changed.get("Connected") {
            if *connected {
                debug!("Device {} connected", self.address);
                self.status.on_connected();
                self.status.on_discovery_started();
            } else {
                debug!("Device {} disconnected", self.address);
                self.evict_children();
                self.status.on_disconnected();
            }
        }
        if let Some(Value::Bool(true)) = changed.get("ServicesResolved") {
            self.status.on_discovery_finished();
        }
        if let Some(value) = changed.get("UUIDs") {
            match parse_uuids(value) {
                // Once services are resolved BlueZ reports the full list.
                Ok(uuids) if self.status.state() == DeviceState::Ready => {
                    self.status.replace_advertised(uuids)
                }
                Ok(uuids) => self.status.merge_advertised(uuids),
                Err(err) => warn!("Ignoring malformed UUIDs on {}: {}", self.address, err),
            }
        }
    }

    fn evict_children(&self) {
        if let Some(inner) = self.inner.upgrade() {
            inner.evict_children(self.path());
        }
    }

    /// Object path of the device, e.g. `/org/bluez/hci0/dev_AA_BB_CC_DD_EE_FF`.
    pub fn path(&self) -> &str {
        self.object.path()
    }

    /// Object path of the adapter this device was seen by.
    pub(crate) fn adapter_path(&self) -> Result<String, BluetoothError> {
        Ok(self.object.get("Adapter")?.as_str()?.to_string())
    }

    fn snapshot(&self, inner: &Arc<Inner>) -> Result<DiscoverySnapshot, BluetoothError> {
        let mut services: HashSet<Uuid> = api::Device::advertised(self)?.into_iter().collect();
        for path in inner.object_paths(GATT_SERVICE_INTERFACE, self.path())? {
            services.insert(inner.service(&path)?.uuid());
        }
        let mut characteristics = HashSet::new();
        for path in inner.object_paths(GATT_CHARACTERISTIC_INTERFACE, self.path())? {
            characteristics.insert(inner.characteristic(&path)?.uuid());
        }
        Ok(DiscoverySnapshot {
            services,
            characteristics,
        })
    }
}

impl api::Device for BluezDevice {
    type Service = BluezGattService;

    fn id(&self) -> DeviceId {
        DeviceId::Address(self.address.clone())
    }

    fn name(&self) -> Result<Option<String>, BluetoothError> {
        match self.object.get_optional("Name")? {
            Some(value) => Ok(Some(value.as_str()?.to_string())),
            None => Ok(None),
        }
    }

    fn connect(&self, timeout: Duration) -> Result<(), BluetoothError> {
        info!("Connecting to {}", self.address);
        let result = self
            .status
            .connect_with(timeout, || self.object.call("Connect", &[]).map(|_| ()));
        if result.is_err() {
            self.evict_children();
        }
        result
    }

    fn disconnect(&self, timeout: Duration) -> Result<(), BluetoothError> {
        info!("Disconnecting from {}", self.address);
        self.status
            .disconnect_with(timeout, || self.object.call("Disconnect", &[]).map(|_| ()))
    }

    fn state(&self) -> DeviceState {
        self.status.state()
    }

    fn is_connected(&self) -> Result<bool, BluetoothError> {
        self.object.get("Connected")?.as_bool()
    }

    /// Reads `UUIDs` from BlueZ, which already accumulates every service
    /// the device has advertised or exposed. Falls back to the events seen
    /// so far when the property is absent.
    fn advertised(&self) -> Result<Vec<Uuid>, BluetoothError> {
        match self.object.get_optional("UUIDs")? {
            Some(value) => {
                let uuids = parse_uuids(&value)?;
                self.status.merge_advertised(uuids.iter().copied());
                Ok(uuids)
            }
            None => Ok(self.status.advertised()),
        }
    }

    fn rssi(&self, _timeout: Duration) -> Result<Option<i16>, BluetoothError> {
        match self.object.get_optional("RSSI")? {
            Some(value) => Ok(Some(value.as_i16()?)),
            None => Ok(None),
        }
    }

    fn list_services(&self) -> Result<Vec<Arc<BluezGattService>>, BluetoothError> {
        let inner = upgrade(&self.inner)?;
        inner
            .object_paths(GATT_SERVICE_INTERFACE, self.path())?
            .iter()
            .map(|path| inner.service(path))
            .collect()
    }

    /// BlueZ resolves services on its own after connecting, so this polls
    /// the object tree until the expected UUIDs show up.
    fn discover(
        &self,
        service_uuids: &[Uuid],
        characteristic_uuids: &[Uuid],
        timeout: Duration,
    ) -> Result<bool, BluetoothError> {
        let inner = upgrade(&self.inner)?;
        let interval = inner.config.discovery_poll_interval;
        poll_until_discovered(service_uuids, characteristic_uuids, timeout, interval, || {
            self.snapshot(&inner)
        })
    }
}
