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

//! The slice of `CBCentralManager` / `CBPeripheral` the backend drives. A
//! binding crate (or a test fake) implements `CentralManager` and forwards
//! the delegate callbacks to [`super::CentralDelegate`].

use uuid::Uuid;

use super::CentralError;

/// Opaque handle of a `CBPeripheral`. Handles are only compared for
/// identity; the binding must hand back the same value for the same object.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PeripheralRef(pub u64);

/// Opaque handle of a `CBService`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ServiceRef(pub u64);

/// Opaque handle of a `CBCharacteristic`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CharacteristicRef(pub u64);

/// Opaque handle of a `CBDescriptor`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DescriptorRef(pub u64);

/// `CBManagerState`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ManagerState {
    Unknown,
    Resetting,
    Unsupported,
    Unauthorized,
    PoweredOff,
    PoweredOn,
}

impl ManagerState {
    pub fn from_raw(raw: i64) -> Self {
        match raw {
            1 => ManagerState::Resetting,
            2 => ManagerState::Unsupported,
            3 => ManagerState::Unauthorized,
            4 => ManagerState::PoweredOff,
            5 => ManagerState::PoweredOn,
            _ => ManagerState::Unknown,
        }
    }
}

/// `CBCharacteristicWriteType`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum WriteType {
    #[default]
    WithResponse,
    WithoutResponse,
}

/// Requests issued to CoreBluetooth. Everything except the accessors is
/// fire-and-forget; completion arrives later as a delegate callback.
pub trait CentralManager: Send + Sync + 'static {
    fn state(&self) -> ManagerState;

    fn scan(&self) -> Result<(), CentralError>;

    fn stop_scan(&self) -> Result<(), CentralError>;

    fn connect(&self, peripheral: PeripheralRef) -> Result<(), CentralError>;

    fn cancel_connection(&self, peripheral: PeripheralRef) -> Result<(), CentralError>;

    /// `retrieveConnectedPeripheralsWithServices:`.
    fn connected_peripherals(&self, services: &[Uuid]) -> Result<Vec<PeripheralRef>, CentralError>;

    /// Toggle the controller through IOBluetooth. Confirmed by a later
    /// state-update callback.
    fn set_controller_power(&self, on: bool) -> Result<(), CentralError>;

    fn controller_power(&self) -> Result<bool, CentralError>;

    /// Drop the system's cached device data. The controller is off when
    /// this is called.
    fn clear_cache(&self) -> Result<(), CentralError>;

    fn peripheral_identifier(&self, peripheral: PeripheralRef) -> Result<Uuid, CentralError>;

    fn peripheral_name(&self, peripheral: PeripheralRef) -> Option<String>;

    fn discover_services(&self, peripheral: PeripheralRef) -> Result<(), CentralError>;

    /// Services of the peripheral discovered so far.
    fn services(&self, peripheral: PeripheralRef) -> Vec<ServiceRef>;

    /// Raw `CBUUID` data: 2, 4 or 16 bytes.
    fn service_uuid(&self, service: ServiceRef) -> Result<Vec<u8>, CentralError>;

    fn discover_characteristics(
        &self,
        peripheral: PeripheralRef,
        service: ServiceRef,
    ) -> Result<(), CentralError>;

    fn characteristics(&self, service: ServiceRef) -> Vec<CharacteristicRef>;

    fn characteristic_uuid(
        &self,
        characteristic: CharacteristicRef,
    ) -> Result<Vec<u8>, CentralError>;

    fn read_characteristic(
        &self,
        peripheral: PeripheralRef,
        characteristic: CharacteristicRef,
    ) -> Result<(), CentralError>;

    fn write_characteristic(
        &self,
        peripheral: PeripheralRef,
        characteristic: CharacteristicRef,
        value: &[u8],
        write_type: WriteType,
    ) -> Result<(), CentralError>;

    fn set_notify(
        &self,
        peripheral: PeripheralRef,
        characteristic: CharacteristicRef,
        enabled: bool,
    ) -> Result<(), CentralError>;

    fn discover_descriptors(
        &self,
        peripheral: PeripheralRef,
        characteristic: CharacteristicRef,
    ) -> Result<(), CentralError>;

    fn descriptors(&self, characteristic: CharacteristicRef) -> Vec<DescriptorRef>;

    fn descriptor_uuid(&self, descriptor: DescriptorRef) -> Result<Vec<u8>, CentralError>;

    fn read_descriptor(
        &self,
        peripheral: PeripheralRef,
        descriptor: DescriptorRef,
    ) -> Result<(), CentralError>;

    fn read_rssi(&self, peripheral: PeripheralRef) -> Result<(), CentralError>;
}
