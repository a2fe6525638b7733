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

use uuid::Uuid;

use super::ServiceProfile;
use crate::{
    api::{Device, GattCharacteristic, GattService},
    common::{uuid_from_u16, BluetoothError},
};

pub const DIS_SERVICE_UUID: Uuid = uuid_from_u16(0x180a);
pub const MANUFACTURER_CHAR_UUID: Uuid = uuid_from_u16(0x2a29);
pub const MODEL_CHAR_UUID: Uuid = uuid_from_u16(0x2a24);
pub const SERIAL_CHAR_UUID: Uuid = uuid_from_u16(0x2a25);
pub const HW_REVISION_CHAR_UUID: Uuid = uuid_from_u16(0x2a27);
pub const FW_REVISION_CHAR_UUID: Uuid = uuid_from_u16(0x2a26);
pub const SW_REVISION_CHAR_UUID: Uuid = uuid_from_u16(0x2a28);
pub const SYS_ID_CHAR_UUID: Uuid = uuid_from_u16(0x2a23);
pub const REG_CERT_CHAR_UUID: Uuid = uuid_from_u16(0x2a2a);
pub const PNP_ID_CHAR_UUID: Uuid = uuid_from_u16(0x2a50);

/// Device Information Service. Every characteristic is optional; getters
/// return `None` for the ones the device doesn't expose.
pub struct DeviceInformation<C> {
    manufacturer: Option<Arc<C>>,
    model: Option<Arc<C>>,
    serial: Option<Arc<C>>,
    hw_revision: Option<Arc<C>>,
    sw_revision: Option<Arc<C>>,
    fw_revision: Option<Arc<C>>,
    system_id: Option<Arc<C>>,
    regulatory_cert: Option<Arc<C>>,
    pnp_id: Option<Arc<C>>,
}

fn read_bytes<C: GattCharacteristic>(
    characteristic: &Option<Arc<C>>,
    timeout: Duration,
) -> Result<Option<Vec<u8>>, BluetoothError> {
    characteristic
        .as_ref()
        .map(|characteristic| characteristic.read_value(timeout))
        .transpose()
}

fn read_string<C: GattCharacteristic>(
    characteristic: &Option<Arc<C>>,
    timeout: Duration,
) -> Result<Option<String>, BluetoothError> {
    Ok(read_bytes(characteristic, timeout)?
        .map(|bytes| String::from_utf8_lossy(&bytes).into_owned()))
}

impl<C: GattCharacteristic> DeviceInformation<C> {
    pub fn new<D>(device: &D) -> Result<Self, BluetoothError>
    where
        D: Device,
        D::Service: GattService<Characteristic = C>,
    {
        let service = device.find_service(DIS_SERVICE_UUID)?.ok_or_else(|| {
            BluetoothError::FailedPrecondition(String::from(
                "device has no device information service",
            ))
        })?;
        Ok(DeviceInformation {
            manufacturer: service.find_characteristic(MANUFACTURER_CHAR_UUID)?,
            model: service.find_characteristic(MODEL_CHAR_UUID)?,
            serial: service.find_characteristic(SERIAL_CHAR_UUID)?,
            hw_revision: service.find_characteristic(HW_REVISION_CHAR_UUID)?,
            sw_revision: service.find_characteristic(SW_REVISION_CHAR_UUID)?,
            fw_revision: service.find_characteristic(FW_REVISION_CHAR_UUID)?,
            system_id: service.find_characteristic(SYS_ID_CHAR_UUID)?,
            regulatory_cert: service.find_characteristic(REG_CERT_CHAR_UUID)?,
            pnp_id: service.find_characteristic(PNP_ID_CHAR_UUID)?,
        })
    }

    pub fn manufacturer(&self, timeout: Duration) -> Result<Option<String>, BluetoothError> {
        read_string(&self.manufacturer, timeout)
    }

    pub fn model(&self, timeout: Duration) -> Result<Option<String>, BluetoothError> {
        read_string(&self.model, timeout)
    }

    pub fn serial(&self, timeout: Duration) -> Result<Option<String>, BluetoothError> {
        read_string(&self.serial, timeout)
    }

    pub fn hw_revision(&self, timeout: Duration) -> Result<Option<String>, BluetoothError> {
        read_string(&self.hw_revision, timeout)
    }

    pub fn sw_revision(&self, timeout: Duration) -> Result<Option<String>, BluetoothError> {
        read_string(&self.sw_revision, timeout)
    }

    pub fn fw_revision(&self, timeout: Duration) -> Result<Option<String>, BluetoothError> {
        read_string(&self.fw_revision, timeout)
    }

    pub fn system_id(&self, timeout: Duration) -> Result<Option<Vec<u8>>, BluetoothError> {
        read_bytes(&self.system_id, timeout)
    }

    pub fn regulatory_cert(&self, timeout: Duration) -> Result<Option<Vec<u8>>, BluetoothError> {
        read_bytes(&self.regulatory_cert, timeout)
    }

    pub fn pnp_id(&self, timeout: Duration) -> Result<Option<Vec<u8>>, BluetoothError> {
        read_bytes(&self.pnp_id, timeout)
    }
}

/// DIS isn't advertised, so only discovery uses these UUIDs.
pub struct DeviceInformationProfile;

impl ServiceProfile for DeviceInformationProfile {
    const ADVERTISED: &'static [Uuid] = &[];
    const SERVICES: &'static [Uuid] = &[DIS_SERVICE_UUID];
    const CHARACTERISTICS: &'static [Uuid] = &[];
}
