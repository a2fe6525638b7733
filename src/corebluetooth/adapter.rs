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

use tracing::info;

use super::central::{CentralManager, ManagerState};
use crate::{
    api,
    common::{AdapterState, BluetoothError},
};

/// The one adapter CoreBluetooth exposes.
pub struct CoreBluetoothAdapter {
    central: Arc<dyn CentralManager>,
    state: AdapterState,
}

impl CoreBluetoothAdapter {
    pub(crate) fn new(central: Arc<dyn CentralManager>, powered: bool) -> Self {
        CoreBluetoothAdapter {
            central,
            state: AdapterState::new(powered),
        }
    }

    /// `centralManagerDidUpdateState:`. Transitional states are ignored.
    pub(crate) fn state_updated(&self, state: ManagerState) {
        match state {
            ManagerState::PoweredOn => self.state.power_changed(true),
            ManagerState::PoweredOff => self.state.power_changed(false),
            _ => {}
        }
    }
}

impl api::Adapter for CoreBluetoothAdapter {
    fn name(&self) -> Result<String, BluetoothError> {
        Ok(String::from("Default Adapter"))
    }

    /// Scanning starts as soon as the request is accepted; CoreBluetooth
    /// sends no confirmation.
    fn start_scan(&self, _timeout: Duration) -> Result<(), BluetoothError> {
        info!("Starting scan");
        self.state
            .set_scan(true, || Ok(self.central.scan()?))
    }

    fn stop_scan(&self, _timeout: Duration) -> Result<(), BluetoothError> {
        info!("Stopping scan");
        self.state
            .set_scan(false, || Ok(self.central.stop_scan()?))
    }

    fn is_scanning(&self) -> Result<bool, BluetoothError> {
        Ok(self.state.is_scanning())
    }

    /// No state update follows a request that changes nothing, so an
    /// already-powered controller returns immediately.
    fn power_on(&self, timeout: Duration) -> Result<(), BluetoothError> {
        if self.central.controller_power()? {
            self.state.power_changed(true);
            return Ok(());
        }
        self.state.await_power(true, timeout, || {
            Ok(self.central.set_controller_power(true)?)
        })
    }

    fn power_off(&self, timeout: Duration) -> Result<(), BluetoothError> {
        if !self.central.controller_power()? {
            self.state.power_changed(false);
            return Ok(());
        }
        self.state.await_power(false, timeout, || {
            Ok(self.central.set_controller_power(false)?)
        })
    }

    fn is_powered(&self) -> Result<bool, BluetoothError> {
        Ok(self.central.controller_power()?)
    }
}
