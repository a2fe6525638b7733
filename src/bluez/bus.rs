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

//! The slice of the system bus the BlueZ backend talks to. A binding crate
//! (or a test fake) implements `BusConnection` on top of a real D-Bus
//! connection to `org.bluez`.

use std::{collections::HashMap, sync::Arc};

pub use super::error::{BusError, INVALID_ARGS};
use crate::common::BluetoothError;

pub const ADAPTER_INTERFACE: &str = "org.bluez.Adapter1";
pub const DEVICE_INTERFACE: &str = "org.bluez.Device1";
pub const GATT_SERVICE_INTERFACE: &str = "org.bluez.GattService1";
pub const GATT_CHARACTERISTIC_INTERFACE: &str = "org.bluez.GattCharacteristic1";
pub const GATT_DESCRIPTOR_INTERFACE: &str = "org.bluez.GattDescriptor1";

/// The D-Bus value types BlueZ uses for the properties and arguments this
/// crate touches.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Bool(bool),
    Int16(i16),
    Str(String),
    ObjectPath(String),
    Bytes(Vec<u8>),
    StrList(Vec<String>),
    Unit,
}

/// Changed properties of one `PropertiesChanged` signal.
pub type PropertyMap = HashMap<String, Value>;

/// Receives `(interface, changed properties)` for one object path. Called on
/// the bus event thread.
pub type PropertiesChangedHandler = Box<dyn Fn(&str, &PropertyMap) + Send + Sync + 'static>;

/// One entry of `ObjectManager.GetManagedObjects`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ManagedObject {
    pub path: String,
    pub interfaces: Vec<String>,
}

impl ManagedObject {
    pub fn implements(&self, interface: &str) -> bool {
        self.interfaces.iter().any(|i| i == interface)
    }

    /// True if the object lives strictly below `parent`.
    pub fn is_below(&self, parent: &str) -> bool {
        let parent = parent.trim_end_matches('/').to_lowercase();
        let path = self.path.to_lowercase();
        path.len() > parent.len() + 1
            && path.starts_with(&parent)
            && path.as_bytes()[parent.len()] == b'/'
    }
}

/// Calls and signals of the BlueZ object tree the backend depends on.
pub trait BusConnection: Send + Sync + 'static {
    /// Every object BlueZ currently exports, with its interfaces.
    fn managed_objects(&self) -> Result<Vec<ManagedObject>, BusError>;

    fn get_property(&self, path: &str, interface: &str, name: &str) -> Result<Value, BusError>;

    fn set_property(
        &self,
        path: &str,
        interface: &str,
        name: &str,
        value: Value,
    ) -> Result<(), BusError>;

    fn call_method(
        &self,
        path: &str,
        interface: &str,
        method: &str,
        args: &[Value],
    ) -> Result<Value, BusError>;

    /// Deliver every future `PropertiesChanged` signal of `path` to
    /// `handler`.
    fn subscribe(&self, path: &str, handler: PropertiesChangedHandler) -> Result<(), BusError>;
}

/// One interface of one object on the bus.
#[derive(Clone)]
pub(crate) struct BusObject {
    bus: Arc<dyn BusConnection>,
    path: String,
    interface: &'static str,
}

impl BusObject {
    pub(crate) fn new(bus: Arc<dyn BusConnection>, path: &str, interface: &'static str) -> Self {
        BusObject {
            bus,
            path: path.to_string(),
            interface,
        }
    }

    pub(crate) fn path(&self) -> &str {
        &self.path
    }

    pub(crate) fn get(&self, name: &str) -> Result<Value, BluetoothError> {
        Ok(self.bus.get_property(&self.path, self.interface, name)?)
    }

    /// Reads a property that may legitimately be missing. Only the
    /// missing-property fault is mapped to `None`.
    pub(crate) fn get_optional(&self, name: &str) -> Result<Option<Value>, BluetoothError> {
        match self.bus.get_property(&self.path, self.interface, name) {
            Ok(value) => Ok(Some(value)),
            Err(err) if err.is_optional_absent() => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    pub(crate) fn set(&self, name: &str, value: Value) -> Result<(), BluetoothError> {
        Ok(self.bus.set_property(&self.path, self.interface, name, value)?)
    }

    pub(crate) fn call(&self, method: &str, args: &[Value]) -> Result<Value, BluetoothError> {
        Ok(self.bus.call_method(&self.path, self.interface, method, args)?)
    }

    pub(crate) fn subscribe(
        &self,
        handler: PropertiesChangedHandler,
    ) -> Result<(), BluetoothError> {
        Ok(self.bus.subscribe(&self.path, handler)?)
    }
}

impl Value {
    pub(crate) fn as_bool(&self) -> Result<bool, BluetoothError> {
        match self {
            Value::Bool(value) => Ok(*value),
            other => Err(unexpected("boolean", other)),
        }
    }

    pub(crate) fn as_str(&self) -> Result<&str, BluetoothError> {
        match self {
            Value::Str(value) | Value::ObjectPath(value) => Ok(value),
            other => Err(unexpected("string", other)),
        }
    }

    pub(crate) fn as_i16(&self) -> Result<i16, BluetoothError> {
        match self {
            Value::Int16(value) => Ok(*value),
            other => Err(unexpected("int16", other)),
        }
    }

    pub(crate) fn as_str_list(&self) -> Result<&[String], BluetoothError> {
        match self {
            Value::StrList(value) => Ok(value),
            other => Err(unexpected("string array", other)),
        }
    }

    pub(crate) fn into_bytes(self) -> Result<Vec<u8>, BluetoothError> {
        match self {
            Value::Bytes(value) => Ok(value),
            other => Err(unexpected("byte array", &other)),
        }
    }
}

fn unexpected(expected: &str, got: &Value) -> BluetoothError {
    BluetoothError::BadTypeConversion(format!("expected {}, got {:?}", expected, got))
}
