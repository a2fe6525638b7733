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
    bus::{
        BusConnection, BusObject, ManagedObject, Value, ADAPTER_INTERFACE,
        DEVICE_INTERFACE, GATT_CHARACTERISTIC_INTERFACE,
        GATT_DESCRIPTOR_INTERFACE, GATT_SERVICE_INTERFACE,
    },
    BluezAdapter, BluezDevice, BluezGattCharacteristic, BluezGattDescriptor,
    BluezGattService,
};
use crate::{
    api::{self, Device},
    common::{BluetoothError, Config, Registry},
};

/// State shared by the provider and every object it hands out. Objects hold
/// a `Weak` reference so the registries don't keep themselves alive.
pub(crate) struct Inner {
    pub(crate) bus: Arc<dyn BusConnection>,
    pub(crate) config: Config,
    adapters: Registry<String, Arc<BluezAdapter>>,
    devices: Registry<String, Arc<BluezDevice>>,
    services: Registry<String, Arc<BluezGattService>>,
    characteristics: Registry<String, Arc<BluezGattCharacteristic>>,
    descriptors: Registry<String, Arc<BluezGattDescriptor>>,
}

pub(crate) fn upgrade(inner: &Weak<Inner>) -> Result<Arc<Inner>, BluetoothError> {
    inner.upgrade().ok_or_else(|| {
        BluetoothError::FailedPrecondition(String::from(
            "the BlueZ provider owning this object has been dropped",
        ))
    })
}

fn parse_uuid(object: &BusObject) -> Result<Uuid, BluetoothError> {
    Ok(Uuid::parse_str(object.get("UUID")?.as_str()?)?)
}

impl Inner {
    /// Paths of all objects implementing `interface` below `parent`, sorted.
    pub(crate) fn object_paths(
        &self,
        interface: &str,
        parent: &str,
    ) -> Result<Vec<String>, BluetoothError> {
        let mut paths: Vec<String> = self
            .bus
            .managed_objects()?
            .into_iter()
            .filter(|object: &ManagedObject| {
                object.implements(interface) && object.is_below(parent)
            })
            .map(|object| object.path)
            .collect();
        paths.sort();
        Ok(paths)
    }

    pub(crate) fn adapter(
        self: &Arc<Self>,
        path: &str,
    ) -> Result<Arc<BluezAdapter>, BluetoothError> {
        if let Some(adapter) = self.adapters.get(&path.to_string()) {
            return Ok(adapter);
        }
        let object = BusObject::new(self.bus.clone(), path, ADAPTER_INTERFACE);
        let powered = object.get("Powered")?.as_bool()?;
        let mut created = false;
        let adapter = self.adapters.add_if_absent(path.to_string(), || {
            created = true;
            Arc::new(BluezAdapter::new(object, powered))
        });
        if created {
            debug!("Registered adapter {}", path);
            BluezAdapter::watch(&adapter)?;
        }
        Ok(adapter)
    }

    pub(crate) fn device(
        self: &Arc<Self>,
        path: &str,
    ) -> Result<Arc<BluezDevice>, BluetoothError> {
        if let Some(device) = self.devices.get(&path.to_string()) {
            return Ok(device);
        }
        let object = BusObject::new(self.bus.clone(), path, DEVICE_INTERFACE);
        let address = object.get("Address")?.as_str()?.to_string();
        let connected = match object.get_optional("Connected")? {
            Some(value) => value.as_bool()?,
            None => false,
        };
        let mut created = false;
        let device = self.devices.add_if_absent(path.to_string(), || {
            created = true;
            Arc::new(BluezDevice::new(Arc::downgrade(self), object, address, connected))
        });
        if created {
            debug!("Registered device {} at {}", device.id(), path);
            BluezDevice::watch(&device)?;
        }
        Ok(device)
    }

    pub(crate) fn service(
        self: &Arc<Self>,
        path: &str,
    ) -> Result<Arc<BluezGattService>, BluetoothError> {
        if let Some(service) = self.services.get(&path.to_string()) {
            return Ok(service);
        }
        let object = BusObject::new(self.bus.clone(), path, GATT_SERVICE_INTERFACE);
        let uuid = parse_uuid(&object)?;
        Ok(self.services.add_if_absent(path.to_string(), || {
            Arc::new(BluezGattService::new(Arc::downgrade(self), object, uuid))
        }))
    }

    pub(crate) fn characteristic(
        self: &Arc<Self>,
        path: &str,
    ) -> Result<Arc<BluezGattCharacteristic>, BluetoothError> {
        if let Some(characteristic) = self.characteristics.get(&path.to_string()) {
            return Ok(characteristic);
        }
        let object = BusObject::new(self.bus.clone(), path, GATT_CHARACTERISTIC_INTERFACE);
        let uuid = parse_uuid(&object)?;
        let mut created = false;
        let characteristic = self.characteristics.add_if_absent(path.to_string(), || {
            created = true;
            Arc::new(BluezGattCharacteristic::new(Arc::downgrade(self), object, uuid))
        });
        if created {
            BluezGattCharacteristic::watch(&characteristic)?;
        }
        Ok(characteristic)
    }

    pub(crate) fn descriptor(
        self: &Arc<Self>,
        path: &str,
    ) -> Result<Arc<BluezGattDescriptor>, BluetoothError> {
        if let Some(descriptor) = self.descriptors.get(&path.to_string()) {
            return Ok(descriptor);
        }
        let object = BusObject::new(self.bus.clone(), path, GATT_DESCRIPTOR_INTERFACE);
        let uuid = parse_uuid(&object)?;
        Ok(self.descriptors.add_if_absent(path.to_string(), || {
            Arc::new(BluezGattDescriptor::new(object, uuid))
        }))
    }

    /// Forget every GATT object below `device_path`. BlueZ removes them from
    /// the bus once the link drops.
    pub(crate) fn evict_children(&self, device_path: &str) {
        let prefix = format!("{}/", device_path.trim_end_matches('/'));
        self.descriptors.retain(|path, _| !path.starts_with(&prefix));
        self.characteristics.retain(|path, _| !path.starts_with(&prefix));
        self.services.retain(|path, _| !path.starts_with(&prefix));
    }

    pub(crate) fn children_registered(&self, device_path: &str) -> usize {
        let prefix = format!("{}/", device_path.trim_end_matches('/'));
        let below = |path: &str| path.starts_with(&prefix);
        self.services.list().iter().filter(|s| below(s.path())).count()
            + self.characteristics.list().iter().filter(|c| below(c.path())).count()
            + self.descriptors.list().iter().filter(|d| below(d.path())).count()
    }
}

/// BLE provider backed by the BlueZ D-Bus API.
pub struct BluezProvider {
    inner: Arc<Inner>,
}

impl BluezProvider {
    pub fn new(bus: Arc<dyn BusConnection>, config: Config) -> Self {
        BluezProvider {
            inner: Arc::new(Inner {
                bus,
                config,
                adapters: Registry::new(),
                devices: Registry::new(),
                services: Registry::new(),
                characteristics: Registry::new(),
                descriptors: Registry::new(),
            }),
        }
    }

    /// Number of services, characteristics and descriptors currently
    /// registered for the device at `device_path`.
    pub fn registered_children(&self, device_path: &str) -> usize {
        self.inner.children_registered(device_path)
    }
}

impl api::Provider for BluezProvider {
    type Adapter = BluezAdapter;
    type Device = BluezDevice;

    fn config(&self) -> Config {
        self.inner.config
    }

    fn list_adapters(&self) -> Result<Vec<Arc<BluezAdapter>>, BluetoothError> {
        self.inner
            .object_paths(ADAPTER_INTERFACE, "/org/bluez")?
            .iter()
            .map(|path| self.inner.adapter(path))
            .collect()
    }

    fn list_devices(&self) -> Result<Vec<Arc<BluezDevice>>, BluetoothError> {
        self.inner
            .object_paths(DEVICE_INTERFACE, "/org/bluez")?
            .iter()
            .map(|path| self.inner.device(path))
            .collect()
    }

    /// Removes every disconnected device from BlueZ through its adapter.
    fn clear_cached_data(&self) -> Result<(), BluetoothError> {
        for device in self.list_devices()? {
            if device.is_connected()? {
                continue;
            }
            let adapter_path = device.adapter_path()?;
            info!("Removing cached device {} from {}", device.id(), adapter_path);
            BusObject::new(self.inner.bus.clone(), &adapter_path, ADAPTER_INTERFACE).call(
                "RemoveDevice",
                &[Value::ObjectPath(device.path().to_string())],
            )?;
            self.inner.evict_children(device.path());
            self.inner.devices.remove(&device.path().to_string());
        }
        Ok(())
    }

    fn disconnect_devices(&self, service_uuids: &[Uuid]) -> Result<(), BluetoothError> {
        for device in self.list_devices()? {
            if !device.is_connected()? {
                continue;
            }
            let offered: Vec<Uuid> = device
                .list_services()?
                .iter()
                .map(|service| api::GattService::uuid(service.as_ref()))
                .collect();
            if service_uuids.iter().all(|uuid| offered.contains(uuid)) {
                device.disconnect(self.inner.config.timeout)?;
            }
        }
        Ok(())
    }
}
