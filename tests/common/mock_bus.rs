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
    collections::{BTreeMap, HashMap, HashSet},
    sync::{Arc, Mutex},
};

use bluefruit_le::{
    bluez::bus::{
        BusConnection, BusError, ManagedObject, PropertiesChangedHandler, Value,
        ADAPTER_INTERFACE, DEVICE_INTERFACE, GATT_CHARACTERISTIC_INTERFACE,
        GATT_DESCRIPTOR_INTERFACE, GATT_SERVICE_INTERFACE, INVALID_ARGS,
    },
    LoopHandle,
};
use uuid::Uuid;

struct MockObject {
    interface: &'static str,
    properties: HashMap<String, Value>,
}

/// An object the mock exports once its device connects.
pub struct GattObject {
    pub path: String,
    pub interface: &'static str,
    pub properties: Vec<(&'static str, Value)>,
}

pub fn service(path: &str, uuid: Uuid) -> GattObject {
    GattObject {
        path: path.to_string(),
        interface: GATT_SERVICE_INTERFACE,
        properties: vec![("UUID", Value::Str(uuid.to_string()))],
    }
}

pub fn characteristic(path: &str, uuid: Uuid, value: &[u8]) -> GattObject {
    GattObject {
        path: path.to_string(),
        interface: GATT_CHARACTERISTIC_INTERFACE,
        properties: vec![
            ("UUID", Value::Str(uuid.to_string())),
            ("Value", Value::Bytes(value.to_vec())),
        ],
    }
}

pub fn descriptor(path: &str, uuid: Uuid, value: &[u8]) -> GattObject {
    GattObject {
        path: path.to_string(),
        interface: GATT_DESCRIPTOR_INTERFACE,
        properties: vec![
            ("UUID", Value::Str(uuid.to_string())),
            ("Value", Value::Bytes(value.to_vec())),
        ],
    }
}

/// BlueZ object tree held in memory. `PropertiesChanged` signals are
/// posted to the event loop.
pub struct MockBus {
    events: LoopHandle,
    objects: Mutex<BTreeMap<String, MockObject>>,
    handlers: Mutex<HashMap<String, Vec<Arc<PropertiesChangedHandler>>>>,
    on_connect: Mutex<HashMap<String, Vec<GattObject>>>,
    silent: Mutex<HashSet<String>>,
    failing: Mutex<HashMap<(String, String), String>>,
    calls: Mutex<Vec<(String, String, Vec<Value>)>>,
}

impl MockBus {
    pub fn new(events: LoopHandle) -> Arc<Self> {
        Arc::new(MockBus {
            events,
            objects: Mutex::new(BTreeMap::new()),
            handlers: Mutex::new(HashMap::new()),
            on_connect: Mutex::new(HashMap::new()),
            silent: Mutex::new(HashSet::new()),
            failing: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn add_object(&self, path: &str, interface: &'static str, properties: Vec<(&str, Value)>) {
        self.objects.lock().unwrap().insert(
            path.to_string(),
            MockObject {
                interface,
                properties: properties
                    .into_iter()
                    .map(|(name, value)| (name.to_string(), value))
                    .collect(),
            },
        );
    }

    pub fn add_gatt(&self, object: GattObject) {
        self.add_object(&object.path, object.interface, object.properties);
    }

    pub fn add_adapter(&self, path: &str, powered: bool) {
        self.add_object(
            path,
            ADAPTER_INTERFACE,
            vec![
                ("Name", Value::Str(String::from("mock-hci"))),
                ("Powered", Value::Bool(powered)),
                ("Discovering", Value::Bool(false)),
            ],
        );
    }

    /// Adds a disconnected device. `UUIDs` is left out when `uuids` is
    /// empty, like BlueZ does for devices that advertised none.
    pub fn add_device(&self, path: &str, adapter: &str, name: Option<&str>, uuids: &[Uuid]) {
        let address = path
            .rsplit('/')
            .next()
            .unwrap()
            .trim_start_matches("dev_")
            .replace('_', ":");
        let mut properties = vec![
            ("Address", Value::Str(address)),
            ("Adapter", Value::ObjectPath(adapter.to_string())),
            ("Connected", Value::Bool(false)),
            ("RSSI", Value::Int16(-60)),
        ];
        if let Some(name) = name {
            properties.push(("Name", Value::Str(name.to_string())));
        }
        if !uuids.is_empty() {
            properties.push((
                "UUIDs",
                Value::StrList(uuids.iter().map(|uuid| uuid.to_string()).collect()),
            ));
        }
        self.add_object(path, DEVICE_INTERFACE, properties);
    }

    /// GATT objects exported when `device` connects.
    pub fn on_connect(&self, device: &str, objects: Vec<GattObject>) {
        self.on_connect.lock().unwrap().insert(device.to_string(), objects);
    }

    /// `Connect` on a device, or `StartDiscovery` on an adapter, is
    /// accepted but never completes.
    pub fn make_silent(&self, path: &str) {
        self.silent.lock().unwrap().insert(path.to_string());
    }

    /// Reads of property `name` on `path` fail with the D-Bus error `error`.
    pub fn fail_property(&self, path: &str, name: &str, error: &str) {
        self.failing
            .lock()
            .unwrap()
            .insert((path.to_string(), name.to_string()), error.to_string());
    }

    pub fn has_object(&self, path: &str) -> bool {
        self.objects.lock().unwrap().contains_key(path)
    }

    pub fn property(&self, path: &str, name: &str) -> Option<Value> {
        self.objects
            .lock()
            .unwrap()
            .get(path)
            .and_then(|object| object.properties.get(name).cloned())
    }

    /// Arguments of every `method` call made on `path`.
    pub fn calls(&self, path: &str, method: &str) -> Vec<Vec<Value>> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(p, m, _)| p == path && m == method)
            .map(|(_, _, args)| args.clone())
            .collect()
    }

    /// Updates the properties now and delivers the signal on the loop.
    pub fn emit(&self, path: &str, interface: &'static str, changes: Vec<(&str, Value)>) {
        if let Some(object) = self.objects.lock().unwrap().get_mut(path) {
            for (name, value) in &changes {
                object.properties.insert(name.to_string(), value.clone());
            }
        }
        self.signal(path, interface, changes);
    }

    /// Delivers a `PropertiesChanged` signal without touching the stored
    /// properties.
    pub fn signal(&self, path: &str, interface: &'static str, changes: Vec<(&str, Value)>) {
        let changed: HashMap<String, Value> = changes
            .into_iter()
            .map(|(name, value)| (name.to_string(), value))
            .collect();
        let handlers = self.handlers.lock().unwrap().get(path).cloned().unwrap_or_default();
        self.events.post(move || {
            for handler in handlers {
                (handler.as_ref())(interface, &changed);
            }
        });
    }

    fn remove_below(&self, parent: &str) {
        let prefix = format!("{}/", parent);
        self.objects.lock().unwrap().retain(|path, _| !path.starts_with(&prefix));
    }
}

impl BusConnection for MockBus {
    fn managed_objects(&self) -> Result<Vec<ManagedObject>, BusError> {
        Ok(self
            .objects
            .lock()
            .unwrap()
            .iter()
            .map(|(path, object)| ManagedObject {
                path: path.clone(),
                interfaces: vec![object.interface.to_string()],
            })
            .collect())
    }

    fn get_property(&self, path: &str, interface: &str, name: &str) -> Result<Value, BusError> {
        let failing = self.failing.lock().unwrap();
        if let Some(error) = failing.get(&(path.to_string(), name.to_string())) {
            return Err(BusError::new(error, name));
        }
        drop(failing);
        let objects = self.objects.lock().unwrap();
        let object = objects
            .get(path)
            .filter(|object| object.interface == interface)
            .ok_or_else(|| BusError::new("org.freedesktop.DBus.Error.UnknownObject", path))?;
        object
            .properties
            .get(name)
            .cloned()
            .ok_or_else(|| BusError::new(INVALID_ARGS, &format!("No such property '{}'", name)))
    }

    fn set_property(
        &self,
        path: &str,
        _interface: &str,
        name: &str,
        value: Value,
    ) -> Result<(), BusError> {
        let mut objects = self.objects.lock().unwrap();
        let object = objects
            .get_mut(path)
            .ok_or_else(|| BusError::new("org.freedesktop.DBus.Error.UnknownObject", path))?;
        object.properties.insert(name.to_string(), value);
        Ok(())
    }

    fn call_method(
        &self,
        path: &str,
        interface: &str,
        method: &str,
        args: &[Value],
    ) -> Result<Value, BusError> {
        self.calls
            .lock()
            .unwrap()
            .push((path.to_string(), method.to_string(), args.to_vec()));
        match (interface, method) {
            (ADAPTER_INTERFACE, "StartDiscovery") => {
                if self.silent.lock().unwrap().contains(path) {
                    return Ok(Value::Unit);
                }
                self.emit(path, ADAPTER_INTERFACE, vec![("Discovering", Value::Bool(true))]);
            }
            (ADAPTER_INTERFACE, "StopDiscovery") => {
                self.emit(path, ADAPTER_INTERFACE, vec![("Discovering", Value::Bool(false))]);
            }
            (ADAPTER_INTERFACE, "RemoveDevice") => {
                if let Some(Value::ObjectPath(device)) = args.first() {
                    self.remove_below(device);
                    self.objects.lock().unwrap().remove(device);
                }
            }
            (DEVICE_INTERFACE, "Connect") => {
                if self.silent.lock().unwrap().contains(path) {
                    return Ok(Value::Unit);
                }
                let exported = self.on_connect.lock().unwrap().remove(path).unwrap_or_default();
                for object in exported {
                    self.add_gatt(object);
                }
                self.emit(path, DEVICE_INTERFACE, vec![("Connected", Value::Bool(true))]);
                self.emit(path, DEVICE_INTERFACE, vec![("ServicesResolved", Value::Bool(true))]);
            }
            (DEVICE_INTERFACE, "Disconnect") => {
                self.remove_below(path);
                self.emit(
                    path,
                    DEVICE_INTERFACE,
                    vec![
                        ("Connected", Value::Bool(false)),
                        ("ServicesResolved", Value::Bool(false)),
                    ],
                );
            }
            (GATT_CHARACTERISTIC_INTERFACE | GATT_DESCRIPTOR_INTERFACE, "ReadValue") => {
                return self.get_property(path, interface, "Value");
            }
            (GATT_CHARACTERISTIC_INTERFACE, "WriteValue") => {}
            (GATT_CHARACTERISTIC_INTERFACE, "StartNotify") => {
                self.set_property(path, interface, "Notifying", Value::Bool(true))?;
            }
            (GATT_CHARACTERISTIC_INTERFACE, "StopNotify") => {
                self.set_property(path, interface, "Notifying", Value::Bool(false))?;
            }
            _ => return Err(BusError::new("org.bluez.Error.NotSupported", method)),
        }
        Ok(Value::Unit)
    }

    fn subscribe(&self, path: &str, handler: PropertiesChangedHandler) -> Result<(), BusError> {
        self.handlers
            .lock()
            .unwrap()
            .entry(path.to_string())
            .or_default()
            .push(Arc::new(handler));
        Ok(())
    }
}
