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

use uuid::Uuid;

use super::BluetoothError;

/// Bluetooth Base UUID, 00000000-0000-1000-8000-00805F9B34FB.
/// Bluetooth Core Specification, Vol 3, Part B, Section 2.5.1.
pub const BASE_UUID: Uuid = Uuid::from_u128(0x0000_0000_0000_1000_8000_0080_5f9b_34fb);

/// Expands a 16-bit SIG assigned number into its full 128-bit UUID.
pub const fn uuid_from_u16(short: u16) -> Uuid {
    uuid_from_u32(short as u32)
}

/// Expands a 32-bit SIG assigned number into its full 128-bit UUID.
pub const fn uuid_from_u32(short: u32) -> Uuid {
    Uuid::from_u128(BASE_UUID.as_u128() | ((short as u128) << 96))
}

/// Converts the raw bytes of a platform UUID object (2, 4 or 16 bytes, big
/// endian) into a 128-bit UUID.
pub fn uuid_from_bytes(bytes: &[u8]) -> Result<Uuid, BluetoothError> {
    match bytes.len() {
        2 => Ok(uuid_from_u16(u16::from_be_bytes([bytes[0], bytes[1]]))),
        4 => Ok(uuid_from_u32(u32::from_be_bytes([
            bytes[0], bytes[1], bytes[2], bytes[3],
        ]))),
        16 => Ok(Uuid::from_slice(bytes)?),
        len => Err(BluetoothError::BadTypeConversion(format!(
            "UUID must be 2, 4 or 16 bytes long, got {}",
            len
        ))),
    }
}
