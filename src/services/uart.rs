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
    sync::{
        mpsc::{self, Receiver, RecvTimeoutError},
        Arc, Mutex, PoisonError,
    },
    time::Duration,
};

use tracing::debug;
use uuid::Uuid;

use super::ServiceProfile;
use crate::{
    api::{Device, GattCharacteristic, GattService},
    common::BluetoothError,
};

/// Nordic UART service.
pub const UART_SERVICE_UUID: Uuid = Uuid::from_u128(0x6e40_0001_b5a3_f393_e0a9_e50e_24dc_ca9e);
/// Written by the host.
pub const TX_CHAR_UUID: Uuid = Uuid::from_u128(0x6e40_0002_b5a3_f393_e0a9_e50e_24dc_ca9e);
/// Notified by the peripheral.
pub const RX_CHAR_UUID: Uuid = Uuid::from_u128(0x6e40_0003_b5a3_f393_e0a9_e50e_24dc_ca9e);

/// Byte stream over the Nordic UART service. Received notifications are
/// queued until `read()` picks them up.
pub struct Uart<C> {
    tx: Arc<C>,
    rx: Arc<C>,
    received: Mutex<Receiver<Vec<u8>>>,
}

impl<C: GattCharacteristic> Uart<C> {
    /// Binds to the UART service of a connected, discovered device and
    /// subscribes to RX.
    pub fn new<D>(device: &D) -> Result<Self, BluetoothError>
    where
        D: Device,
        D::Service: GattService<Characteristic = C>,
    {
        let service = device.find_service(UART_SERVICE_UUID)?.ok_or_else(|| {
            BluetoothError::FailedPrecondition(String::from("device has no UART service"))
        })?;
        let (tx, rx) = match (
            service.find_characteristic(TX_CHAR_UUID)?,
            service.find_characteristic(RX_CHAR_UUID)?,
        ) {
            (Some(tx), Some(rx)) => (tx, rx),
            _ => {
                return Err(BluetoothError::FailedPrecondition(String::from(
                    "UART service is missing its TX or RX characteristic",
                )))
            }
        };
        let (sender, received) = mpsc::channel();
        let sender = Mutex::new(sender);
        rx.start_notify(Box::new(move |data| {
            let sent = sender
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .send(data);
            if sent.is_err() {
                debug!("UART dropped; discarding RX data");
            }
        }))?;
        Ok(Uart {
            tx,
            rx,
            received: Mutex::new(received),
        })
    }

    pub fn write(&self, data: &[u8]) -> Result<(), BluetoothError> {
        self.tx.write_value(data)
    }

    /// Next chunk received on RX. Blocks forever if `timeout` is `None`;
    /// returns `None` if nothing arrived in time.
    pub fn read(&self, timeout: Option<Duration>) -> Option<Vec<u8>> {
        let received = self.received.lock().unwrap_or_else(PoisonError::into_inner);
        match timeout {
            None => received.recv().ok(),
            Some(timeout) => match received.recv_timeout(timeout) {
                Ok(data) => Some(data),
                Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => None,
            },
        }
    }

    /// Stops RX notifications. Data already queued can still be read.
    pub fn close(&self) -> Result<(), BluetoothError> {
        self.rx.stop_notify()
    }
}

/// UUIDs of the UART profile, for finding and discovering devices before a
/// [`Uart`] is bound.
pub struct UartProfile;

impl ServiceProfile for UartProfile {
    const ADVERTISED: &'static [Uuid] = &[UART_SERVICE_UUID];
    const SERVICES: &'static [Uuid] = &[UART_SERVICE_UUID];
    const CHARACTERISTICS: &'static [Uuid] = &[TX_CHAR_UUID, RX_CHAR_UUID];
}
