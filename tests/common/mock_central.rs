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

use std::sync::{Arc, Mutex};

use bluefruit_le::{
    corebluetooth::{
        CentralDelegate, CentralError, CentralManager, CharacteristicRef, DescriptorRef,
        ManagerState, PeripheralRef, ServiceRef, WriteType,
    },
    uuid_from_bytes, LoopHandle,
};
use uuid::Uuid;

pub struct MockDescriptor {
    pub handle: DescriptorRef,
    pub uuid: Vec<u8>,
    pub value: Vec<u8>,
}

pub struct MockCharacteristic {
    pub handle: CharacteristicRef,
    pub uuid: Vec<u8>,
    pub value: Vec<u8>,
    pub descriptors: Vec<MockDescriptor>,
}

pub struct MockService {
    pub handle: ServiceRef,
    pub uuid: Vec<u8>,
    pub characteristics: Vec<MockCharacteristic>,
}

pub struct MockPeripheral {
    pub identifier: Uuid,
    pub name: Option<String>,
    /// Raw `kCBAdvDataServiceUUIDs`.
    pub advertised: Vec<Vec<u8>>,
    pub services: Vec<MockService>,
    pub rssi: i16,
    /// `connect()` is accepted but never completes.
    pub silent: bool,
    connected: bool,
    services_discovered: bool,
}

impl MockPeripheral {
    pub fn new(identifier: Uuid, name: Option<&str>, advertised: Vec<Vec<u8>>) -> Self {
        MockPeripheral {
            identifier,
            name: name.map(str::to_string),
            advertised,
            services: Vec::new(),
            rssi: -55,
            silent: false,
            connected: false,
            services_discovered: false,
        }
    }
}

struct State {
    powered: bool,
    peripherals: Vec<(PeripheralRef, MockPeripheral)>,
    writes: Vec<(CharacteristicRef, Vec<u8>, WriteType)>,
    notifying: Vec<CharacteristicRef>,
    cache_cleared: bool,
}

impl State {
    fn peripheral(&mut self, handle: PeripheralRef) -> Result<&mut MockPeripheral, CentralError> {
        self.peripherals
            .iter_mut()
            .find(|(p, _)| *p == handle)
            .map(|(_, peripheral)| peripheral)
            .ok_or_else(|| CentralError::new(-1, "unknown peripheral"))
    }

    fn service(&self, handle: ServiceRef) -> Option<&MockService> {
        self.peripherals
            .iter()
            .flat_map(|(_, p)| p.services.iter())
            .find(|s| s.handle == handle)
    }

    fn characteristic(&self, handle: CharacteristicRef) -> Option<&MockCharacteristic> {
        self.peripherals
            .iter()
            .flat_map(|(_, p)| p.services.iter())
            .flat_map(|s| s.characteristics.iter())
            .find(|c| c.handle == handle)
    }

    fn descriptor(&self, handle: DescriptorRef) -> Option<&MockDescriptor> {
        self.peripherals
            .iter()
            .flat_map(|(_, p)| p.services.iter())
            .flat_map(|s| s.characteristics.iter())
            .flat_map(|c| c.descriptors.iter())
            .find(|d| d.handle == handle)
    }
}

/// CoreBluetooth central held in memory. Every completion is posted to the
/// event loop as a delegate callback.
pub struct MockCentral {
    events: LoopHandle,
    delegate: Mutex<Option<CentralDelegate>>,
    state: Mutex<State>,
}

fn missing(what: &str) -> CentralError {
    CentralError::new(-1, &format!("unknown {}", what))
}

impl MockCentral {
    pub fn new(events: LoopHandle, powered: bool) -> Arc<Self> {
        Arc::new(MockCentral {
            events,
            delegate: Mutex::new(None),
            state: Mutex::new(State {
                powered,
                peripherals: Vec::new(),
                writes: Vec::new(),
                notifying: Vec::new(),
                cache_cleared: false,
            }),
        })
    }

    pub fn attach(&self, delegate: CentralDelegate) {
        *self.delegate.lock().unwrap() = Some(delegate);
    }

    /// Stop delivering callbacks, as if the binding lost its delegate.
    pub fn detach(&self) {
        self.delegate.lock().unwrap().take();
    }

    pub fn add_peripheral(&self, handle: PeripheralRef, peripheral: MockPeripheral) {
        self.state.lock().unwrap().peripherals.push((handle, peripheral));
    }

    /// Adds a service CoreBluetooth reports without ever announcing it to
    /// the delegate.
    pub fn add_unannounced_service(&self, handle: PeripheralRef, service: MockService) {
        self.state
            .lock()
            .unwrap()
            .peripheral(handle)
            .unwrap()
            .services
            .push(service);
    }

    /// Delivers a notification for `characteristic`.
    pub fn notify(&self, characteristic: CharacteristicRef, value: Vec<u8>) {
        self.post(move |d| d.did_update_characteristic_value(characteristic, Ok(value)));
    }

    pub fn writes(&self) -> Vec<(CharacteristicRef, Vec<u8>, WriteType)> {
        self.state.lock().unwrap().writes.clone()
    }

    pub fn is_notifying(&self, characteristic: CharacteristicRef) -> bool {
        self.state.lock().unwrap().notifying.contains(&characteristic)
    }

    pub fn cache_cleared(&self) -> bool {
        self.state.lock().unwrap().cache_cleared
    }

    pub fn is_connected(&self, handle: PeripheralRef) -> bool {
        self.state.lock().unwrap().peripheral(handle).map(|p| p.connected).unwrap_or(false)
    }

    fn post<F>(&self, callback: F)
    where
        F: FnOnce(&CentralDelegate) + Send + 'static,
    {
        let delegate = self.delegate.lock().unwrap().clone();
        if let Some(delegate) = delegate {
            self.events.post(move || callback(&delegate));
        }
    }
}

impl CentralManager for MockCentral {
    fn state(&self) -> ManagerState {
        if self.state.lock().unwrap().powered {
            ManagerState::PoweredOn
        } else {
            ManagerState::PoweredOff
        }
    }

    /// Every known peripheral advertises once.
    fn scan(&self) -> Result<(), CentralError> {
        let adverts: Vec<(PeripheralRef, Vec<Vec<u8>>, i16)> = self
            .state
            .lock()
            .unwrap()
            .peripherals
            .iter()
            .map(|(handle, p)| (*handle, p.advertised.clone(), p.rssi))
            .collect();
        for (handle, advertised, rssi) in adverts {
            self.post(move |d| d.did_discover_peripheral(handle, &advertised, Some(rssi)));
        }
        Ok(())
    }

    fn stop_scan(&self) -> Result<(), CentralError> {
        Ok(())
    }

    fn connect(&self, peripheral: PeripheralRef) -> Result<(), CentralError> {
        let mut state = self.state.lock().unwrap();
        let mock = state.peripheral(peripheral)?;
        if mock.silent {
            return Ok(());
        }
        mock.connected = true;
        self.post(move |d| d.did_connect(peripheral));
        Ok(())
    }

    fn cancel_connection(&self, peripheral: PeripheralRef) -> Result<(), CentralError> {
        let mut state = self.state.lock().unwrap();
        let mock = state.peripheral(peripheral)?;
        mock.connected = false;
        mock.services_discovered = false;
        self.post(move |d| d.did_disconnect(peripheral, None));
        Ok(())
    }

    fn connected_peripherals(&self, services: &[Uuid]) -> Result<Vec<PeripheralRef>, CentralError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .peripherals
            .iter()
            .filter(|(_, p)| p.connected)
            .filter(|(_, p)| {
                services.is_empty()
                    || p.services.iter().any(|s| {
                        uuid_from_bytes(&s.uuid)
                            .map(|uuid| services.contains(&uuid))
                            .unwrap_or(false)
                    })
            })
            .map(|(handle, _)| *handle)
            .collect())
    }

    fn set_controller_power(&self, on: bool) -> Result<(), CentralError> {
        self.state.lock().unwrap().powered = on;
        let state = if on {
            ManagerState::PoweredOn
        } else {
            ManagerState::PoweredOff
        };
        self.post(move |d| d.did_update_state(state));
        Ok(())
    }

    fn controller_power(&self) -> Result<bool, CentralError> {
        Ok(self.state.lock().unwrap().powered)
    }

    fn clear_cache(&self) -> Result<(), CentralError> {
        self.state.lock().unwrap().cache_cleared = true;
        Ok(())
    }

    fn peripheral_identifier(&self, peripheral: PeripheralRef) -> Result<Uuid, CentralError> {
        Ok(self.state.lock().unwrap().peripheral(peripheral)?.identifier)
    }

    fn peripheral_name(&self, peripheral: PeripheralRef) -> Option<String> {
        self.state
            .lock()
            .unwrap()
            .peripheral(peripheral)
            .ok()
            .and_then(|p| p.name.clone())
    }

    fn discover_services(&self, peripheral: PeripheralRef) -> Result<(), CentralError> {
        self.state.lock().unwrap().peripheral(peripheral)?.services_discovered = true;
        self.post(move |d| d.did_discover_services(peripheral, Ok(())));
        Ok(())
    }

    fn services(&self, peripheral: PeripheralRef) -> Vec<ServiceRef> {
        match self.state.lock().unwrap().peripheral(peripheral) {
            Ok(p) if p.services_discovered => p.services.iter().map(|s| s.handle).collect(),
            _ => Vec::new(),
        }
    }

    fn service_uuid(&self, service: ServiceRef) -> Result<Vec<u8>, CentralError> {
        let state = self.state.lock().unwrap();
        Ok(state.service(service).ok_or_else(|| missing("service"))?.uuid.clone())
    }

    fn discover_characteristics(
        &self,
        peripheral: PeripheralRef,
        service: ServiceRef,
    ) -> Result<(), CentralError> {
        self.post(move |d| d.did_discover_characteristics(peripheral, service, Ok(())));
        Ok(())
    }

    fn characteristics(&self, service: ServiceRef) -> Vec<CharacteristicRef> {
        let state = self.state.lock().unwrap();
        state
            .service(service)
            .map(|s| s.characteristics.iter().map(|c| c.handle).collect())
            .unwrap_or_default()
    }

    fn characteristic_uuid(
        &self,
        characteristic: CharacteristicRef,
    ) -> Result<Vec<u8>, CentralError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .characteristic(characteristic)
            .ok_or_else(|| missing("characteristic"))?
            .uuid
            .clone())
    }

    fn read_characteristic(
        &self,
        _peripheral: PeripheralRef,
        characteristic: CharacteristicRef,
    ) -> Result<(), CentralError> {
        let value = self
            .state
            .lock()
            .unwrap()
            .characteristic(characteristic)
            .ok_or_else(|| missing("characteristic"))?
            .value
            .clone();
        self.post(move |d| d.did_update_characteristic_value(characteristic, Ok(value)));
        Ok(())
    }

    fn write_characteristic(
        &self,
        _peripheral: PeripheralRef,
        characteristic: CharacteristicRef,
        value: &[u8],
        write_type: WriteType,
    ) -> Result<(), CentralError> {
        self.state
            .lock()
            .unwrap()
            .writes
            .push((characteristic, value.to_vec(), write_type));
        self.post(move |d| d.did_write_value(characteristic, Ok(())));
        Ok(())
    }

    fn set_notify(
        &self,
        _peripheral: PeripheralRef,
        characteristic: CharacteristicRef,
        enabled: bool,
    ) -> Result<(), CentralError> {
        {
            let mut state = self.state.lock().unwrap();
            state.notifying.retain(|c| *c != characteristic);
            if enabled {
                state.notifying.push(characteristic);
            }
        }
        self.post(move |d| d.did_update_notification_state(characteristic, Ok(())));
        Ok(())
    }

    fn discover_descriptors(
        &self,
        peripheral: PeripheralRef,
        characteristic: CharacteristicRef,
    ) -> Result<(), CentralError> {
        self.post(move |d| d.did_discover_descriptors(peripheral, characteristic, Ok(())));
        Ok(())
    }

    fn descriptors(&self, characteristic: CharacteristicRef) -> Vec<DescriptorRef> {
        let state = self.state.lock().unwrap();
        state
            .characteristic(characteristic)
            .map(|c| c.descriptors.iter().map(|d| d.handle).collect())
            .unwrap_or_default()
    }

    fn descriptor_uuid(&self, descriptor: DescriptorRef) -> Result<Vec<u8>, CentralError> {
        let state = self.state.lock().unwrap();
        Ok(state.descriptor(descriptor).ok_or_else(|| missing("descriptor"))?.uuid.clone())
    }

    fn read_descriptor(
        &self,
        _peripheral: PeripheralRef,
        descriptor: DescriptorRef,
    ) -> Result<(), CentralError> {
        let value = self
            .state
            .lock()
            .unwrap()
            .descriptor(descriptor)
            .ok_or_else(|| missing("descriptor"))?
            .value
            .clone();
        self.post(move |d| d.did_update_descriptor_value(descriptor, Ok(value)));
        Ok(())
    }

    fn read_rssi(&self, peripheral: PeripheralRef) -> Result<(), CentralError> {
        let rssi = self.state.lock().unwrap().peripheral(peripheral)?.rssi;
        self.post(move |d| d.did_read_rssi(peripheral, Ok(rssi)));
        Ok(())
    }
}
