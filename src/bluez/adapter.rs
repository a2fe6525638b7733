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

use tracing::{info, warn};

use super::bus::{BusObject, PropertyMap, Value, ADAPTER_INTERFACE};
use crate::{
    api,
    common::{AdapterState, BluetoothError},
};

/// A BlueZ `org.bluez.Adapter1` object.
pub struct BluezAdapter {
    object: BusObject,
    state: AdapterState,
}

impl BluezAdapter {
    pub(crate) fn new(object: BusObject, powered: bool) -> Self {
        BluezAdapter {
            object,
            state: AdapterState::new(powered),
        }
    }

    pub(crate) fn watch(adapter: &Arc<Self>) -> Result<(), BluetoothError> {
        let weak = Arc::downgrade(adapter);
        adapter.object.subscribe(Box::new(move |interface, changed| {
            if interface != ADAPTER_INTERFACE {
                return;
            }
            if let Some(adapter) = weak.upgrade() {
                adapter.properties_changed(changed);
            }
        }))
    }

    fn properties_changed(&self, changed: &PropertyMap) {
        if let Some(value) = changed.get("Discovering") {
            match value.as_bool() {
                Ok(discovering) => self.state.discovering_changed(discovering),
                Err(err) => warn!("Ignoring malformed Discovering on {}: {}", self.path(), err),
            }
        }
        if let Some(value) = changed.get("Powered") {
            match value.as_bool() {
                Ok(powered) => self.state.power_changed(powered),
                Err(err) => warn!("Ignoring malformed Powered on {}: {}", self.path(), err),
            }
        }
    }

    /// Object path of the adapter, e.g. `/org/bluez/hci0`.
    pub fn path(&self) -> &str {
        self.object.path()
    }
}

impl api::Adapter for BluezAdapter {
    fn name(&self) -> Result<String, BluetoothError> {
        Ok(self.object.get("Name")?.as_str()?.to_string())
    }

    fn start_scan(&self, timeout: Duration) -> Result<(), BluetoothError> {
        info!("Starting discovery on {}", self.path());
        self.state.await_scan(true, timeout, || {
            self.object.call("StartDiscovery", &[]).map(|_| ())
        })
    }

    fn stop_scan(&self, timeout: Duration) -> Result<(), BluetoothError> {
        info!("Stopping discovery on {}", self.path());
        self.state.await_scan(false, timeout, || {
            self.object.call("StopDiscovery", &[]).map(|_| ())
        })
    }

    fn is_scanning(&self) -> Result<bool, BluetoothError> {
        self.object.get("Discovering")?.as_bool()
    }

    /// BlueZ applies `Powered` synchronously, so `timeout` is unused.
    fn power_on(&self, _timeout: Duration) -> Result<(), BluetoothError> {
        self.state
            .set_power(true, || self.object.set("Powered", Value::Bool(true)))
    }

    fn power_off(&self, _timeout: Duration) -> Result<(), BluetoothError> {
        self.state
            .set_power(false, || self.object.set("Powered", Value::Bool(false)))
    }

    fn is_powered(&self) -> Result<bool, BluetoothError> {
        self.object.get("Powered")?.as_bool()
    }
}
