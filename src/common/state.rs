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

//! Adapter and device state machines shared by every backend. Backends feed
//! them native events; callers block on the transitions.

use std::{
    sync::{Mutex, PoisonError},
    time::Duration,
};

use tracing::debug;
use uuid::Uuid;

use super::{BluetoothError, Operation, Signal};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PowerState {
    PoweredOff,
    PoweringOn,
    PoweredOn,
    PoweringOff,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScanState {
    Idle,
    Starting,
    Scanning,
    Stopping,
}

/// Remote device lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeviceState {
    Advertised,
    Connecting,
    Connected,
    Discovering,
    Ready,
    Disconnecting,
    Disconnected,
}

impl DeviceState {
    pub fn is_connected(self) -> bool {
        matches!(
            self,
            DeviceState::Connected | DeviceState::Discovering | DeviceState::Ready
        )
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Moves `state` to `pending`, issues `request` and waits for `signal`. If
/// the request fails or the wait times out while still pending, the state
/// falls back to `fallback`.
fn drive<S, F>(
    state: &Mutex<S>,
    pending: S,
    fallback: S,
    signal: &Signal,
    timeout: Duration,
    operation: Operation,
    request: F,
) -> Result<(), BluetoothError>
where
    S: Copy + PartialEq,
    F: FnOnce() -> Result<(), BluetoothError>,
{
    *lock(state) = pending;
    signal.clear();
    let result = request().and_then(|()| signal.wait_for(timeout, operation));
    if result.is_err() {
        let mut current = lock(state);
        if *current == pending {
            *current = fallback;
        }
    }
    result
}

/// Power and scan state of one adapter.
#[derive(Debug)]
pub struct AdapterState {
    power: Mutex<PowerState>,
    scan: Mutex<ScanState>,
    powered_on: Signal,
    powered_off: Signal,
    scan_started: Signal,
    scan_stopped: Signal,
}

impl AdapterState {
    pub fn new(powered: bool) -> Self {
        Self {
            power: Mutex::new(if powered {
                PowerState::PoweredOn
            } else {
                PowerState::PoweredOff
            }),
            scan: Mutex::new(ScanState::Idle),
            powered_on: Signal::new(),
            powered_off: Signal::new(),
            scan_started: Signal::new(),
            scan_stopped: Signal::new(),
        }
    }

    pub fn power_state(&self) -> PowerState {
        *lock(&self.power)
    }

    pub fn scan_state(&self) -> ScanState {
        *lock(&self.scan)
    }

    pub fn is_powered(&self) -> bool {
        self.power_state() == PowerState::PoweredOn
    }

    pub fn is_scanning(&self) -> bool {
        self.scan_state() == ScanState::Scanning
    }

    /// Backend event: the radio's power state changed.
    pub fn power_changed(&self, powered: bool) {
        debug!("Adapter power changed: {}", powered);
        if powered {
            *lock(&self.power) = PowerState::PoweredOn;
            self.powered_off.clear();
            self.powered_on.set();
        } else {
            *lock(&self.power) = PowerState::PoweredOff;
            // A powered-off radio can't be scanning.
            *lock(&self.scan) = ScanState::Idle;
            self.powered_on.clear();
            self.powered_off.set();
        }
    }

    /// Backend event: discovery started or stopped.
    pub fn discovering_changed(&self, discovering: bool) {
        debug!("Adapter discovering changed: {}", discovering);
        if discovering {
            *lock(&self.scan) = ScanState::Scanning;
            self.scan_started.set();
        } else {
            *lock(&self.scan) = ScanState::Idle;
            self.scan_stopped.set();
        }
    }

    /// Power transition for backends that confirm it with a later event.
    pub fn await_power<F>(
        &self,
        on: bool,
        timeout: Duration,
        request: F,
    ) -> Result<(), BluetoothError>
    where
        F: FnOnce() -> Result<(), BluetoothError>,
    {
        let previous = self.power_state();
        if on {
            drive(
                &self.power,
                PowerState::PoweringOn,
                previous,
                &self.powered_on,
                timeout,
                Operation::PowerOn,
                request,
            )
        } else {
            drive(
                &self.power,
                PowerState::PoweringOff,
                previous,
                &self.powered_off,
                timeout,
                Operation::PowerOff,
                request,
            )
        }
    }

    /// Power transition for backends where power is a plain writable
    /// property: the write succeeding is the confirmation.
    pub fn set_power<F>(&self, on: bool, request: F) -> Result<(), BluetoothError>
    where
        F: FnOnce() -> Result<(), BluetoothError>,
    {
        request()?;
        self.power_changed(on);
        Ok(())
    }

    /// Scan transition confirmed by a later discovering-changed event.
    pub fn await_scan<F>(
        &self,
        start: bool,
        timeout: Duration,
        request: F,
    ) -> Result<(), BluetoothError>
    where
        F: FnOnce() -> Result<(), BluetoothError>,
    {
        let previous = self.scan_state();
        if start {
            drive(
                &self.scan,
                ScanState::Starting,
                previous,
                &self.scan_started,
                timeout,
                Operation::StartScan,
                request,
            )
        } else {
            drive(
                &self.scan,
                ScanState::Stopping,
                previous,
                &self.scan_stopped,
                timeout,
                Operation::StopScan,
                request,
            )
        }
    }

    /// Scan transition for backends whose start/stop calls take effect
    /// synchronously.
    pub fn set_scan<F>(&self, start: bool, request: F) -> Result<(), BluetoothError>
    where
        F: FnOnce() -> Result<(), BluetoothError>,
    {
        request()?;
        self.discovering_changed(start);
        Ok(())
    }
}

/// Union of the service UUIDs a device has advertised, in first-seen order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AdvertisedUuids(Vec<Uuid>);

impl AdvertisedUuids {
    /// Adds the UUIDs of one advertisement report. Never drops a UUID.
    pub fn merge<I: IntoIterator<Item = Uuid>>(&mut self, report: I) {
        for uuid in report {
            if !self.0.contains(&uuid) {
                self.0.push(uuid);
            }
        }
    }

    /// Replaces the set with an authoritative list from the backend.
    pub fn replace<I: IntoIterator<Item = Uuid>>(&mut self, uuids: I) {
        self.0.clear();
        self.merge(uuids);
    }

    pub fn to_vec(&self) -> Vec<Uuid> {
        self.0.clone()
    }
}

/// Connection state machine and advertisement accumulator of one device.
#[derive(Debug)]
pub struct DeviceStatus {
    state: Mutex<DeviceState>,
    connected: Signal,
    disconnected: Signal,
    advertised: Mutex<AdvertisedUuids>,
}

impl DeviceStatus {
    pub fn new(initial: DeviceState) -> Self {
        let status = Self {
            state: Mutex::new(initial),
            connected: Signal::new(),
            disconnected: Signal::new(),
            advertised: Mutex::new(AdvertisedUuids::default()),
        };
        if initial.is_connected() {
            status.connected.set();
        }
        status
    }

    pub fn state(&self) -> DeviceState {
        *lock(&self.state)
    }

    pub fn is_connected(&self) -> bool {
        self.state().is_connected()
    }

    /// Issues `request` and blocks until the connected event arrives. On
    /// failure the device is left `Disconnected`.
    pub fn connect_with<F>(&self, timeout: Duration, request: F) -> Result<(), BluetoothError>
    where
        F: FnOnce() -> Result<(), BluetoothError>,
    {
        drive(
            &self.state,
            DeviceState::Connecting,
            DeviceState::Disconnected,
            &self.connected,
            timeout,
            Operation::Connect,
            request,
        )
    }

    /// Issues `request` and blocks until the disconnected event arrives. On
    /// failure the device keeps the state it had before.
    pub fn disconnect_with<F>(&self, timeout: Duration, request: F) -> Result<(), BluetoothError>
    where
        F: FnOnce() -> Result<(), BluetoothError>,
    {
        let previous = self.state();
        drive(
            &self.state,
            DeviceState::Disconnecting,
            previous,
            &self.disconnected,
            timeout,
            Operation::Disconnect,
            request,
        )
    }

    /// Backend event: the link is up.
    pub fn on_connected(&self) {
        {
            let mut state = lock(&self.state);
            if !state.is_connected() {
                *state = DeviceState::Connected;
            }
        }
        self.disconnected.clear();
        self.connected.set();
    }

    /// Backend event: the link is down.
    pub fn on_disconnected(&self) {
        *lock(&self.state) = DeviceState::Disconnected;
        self.connected.clear();
        self.disconnected.set();
    }

    /// Backend event: GATT discovery began on a connected device.
    pub fn on_discovery_started(&self) {
        let mut state = lock(&self.state);
        if *state == DeviceState::Connected {
            *state = DeviceState::Discovering;
        }
    }

    /// Backend event: GATT discovery finished.
    pub fn on_discovery_finished(&self) {
        let mut state = lock(&self.state);
        if state.is_connected() {
            *state = DeviceState::Ready;
        }
    }

    pub fn merge_advertised<I: IntoIterator<Item = Uuid>>(&self, report: I) {
        lock(&self.advertised).merge(report);
    }

    pub fn replace_advertised<I: IntoIterator<Item = Uuid>>(&self, uuids: I) {
        lock(&self.advertised).replace(uuids);
    }

    pub fn advertised(&self) -> Vec<Uuid> {
        lock(&self.advertised).to_vec()
    }
}
