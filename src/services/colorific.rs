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

use std::sync::Arc;

use uuid::Uuid;

use super::ServiceProfile;
use crate::{
    api::{Device, GattCharacteristic, GattService},
    common::{uuid_from_u16, BluetoothError},
};

pub const COLOR_SERVICE_UUID: Uuid = uuid_from_u16(0x1802);
pub const COLOR_CHAR_UUID: Uuid = uuid_from_u16(0x2a06);

/// Command frame setting a Colorific bulb to the given color.
pub fn color_command(r: u8, g: u8, b: u8) -> [u8; 9] {
    [0x58, 0x01, 0x03, 0x01, 0xff, 0x00, r, g, b]
}

/// Colorific BLE light bulb.
pub struct Colorific<C> {
    color: Arc<C>,
}

impl<C: GattCharacteristic> Colorific<C> {
    pub fn new<D>(device: &D) -> Result<Self, BluetoothError>
    where
        D: Device,
        D::Service: GattService<Characteristic = C>,
    {
        let color = device
            .find_service(COLOR_SERVICE_UUID)?
            .map(|service| service.find_characteristic(COLOR_CHAR_UUID))
            .transpose()?
            .flatten()
            .ok_or_else(|| {
                BluetoothError::FailedPrecondition(String::from(
                    "device has no Colorific color characteristic",
                ))
            })?;
        Ok(Colorific { color })
    }

    pub fn set_color(&self, r: u8, g: u8, b: u8) -> Result<(), BluetoothError> {
        self.color.write_value(&color_command(r, g, b))
    }
}

pub struct ColorificProfile;

impl ServiceProfile for ColorificProfile {
    const ADVERTISED: &'static [Uuid] = &[COLOR_SERVICE_UUID];
    const SERVICES: &'static [Uuid] = &[COLOR_SERVICE_UUID];
    const CHARACTERISTICS: &'static [Uuid] = &[COLOR_CHAR_UUID];
}
