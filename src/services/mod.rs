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

//! Thin helpers for a few well-known GATT profiles, written against the
//! backend-independent traits in [`crate::api`].

use std::{sync::Arc, time::Duration};

use uuid::Uuid;

use crate::{
    api::{Device, Provider},
    common::BluetoothError,
};

mod colorific;
mod device_information;
mod uart;

pub use colorific::{
    color_command, Colorific, ColorificProfile, COLOR_CHAR_UUID, COLOR_SERVICE_UUID,
};
pub use device_information::{
    DeviceInformation, DeviceInformationProfile, DIS_SERVICE_UUID, FW_REVISION_CHAR_UUID,
    HW_REVISION_CHAR_UUID, MANUFACTURER_CHAR_UUID, MODEL_CHAR_UUID, PNP_ID_CHAR_UUID,
    REG_CERT_CHAR_UUID, SERIAL_CHAR_UUID, SW_REVISION_CHAR_UUID, SYS_ID_CHAR_UUID,
};
pub use uart::{Uart, UartProfile, RX_CHAR_UUID, TX_CHAR_UUID, UART_SERVICE_UUID};

/// The UUIDs that identify a profile at each stage of talking to a device.
pub trait ServiceProfile {
    /// Services a device of this kind advertises before connecting.
    const ADVERTISED: &'static [Uuid];
    /// Services that must be discovered once connected.
    const SERVICES: &'static [Uuid];
    /// Characteristics that must be discovered once connected.
    const CHARACTERISTICS: &'static [Uuid];

    /// First device advertising this profile, waiting up to `timeout` or
    /// the provider's configured timeout.
    fn find_device<P: Provider>(
        provider: &P,
        timeout: Option<Duration>,
    ) -> Result<Option<Arc<P::Device>>, BluetoothError> {
        let timeout = timeout.unwrap_or(provider.config().timeout);
        provider.find_device(Self::ADVERTISED, None, timeout)
    }

    /// Devices advertising this profile right now. Never blocks.
    fn find_devices<P: Provider>(provider: &P) -> Result<Vec<Arc<P::Device>>, BluetoothError> {
        provider.find_devices(Self::ADVERTISED, None)
    }

    fn disconnect_devices<P: Provider>(provider: &P) -> Result<(), BluetoothError> {
        provider.disconnect_devices(Self::ADVERTISED)
    }

    /// Wait until `device` has discovered everything this profile needs.
    /// Call once after connecting, before constructing the profile.
    fn discover<D: Device>(device: &D, timeout: Duration) -> Result<bool, BluetoothError> {
        device.discover(Self::SERVICES, Self::CHARACTERISTICS, timeout)
    }
}
