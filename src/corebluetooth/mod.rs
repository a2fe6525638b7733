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

//! macOS backend on top of CoreBluetooth. Everything is delegate-driven:
//! requests go out through `CentralManager` and complete when the binding
//! forwards the matching callback to `CentralDelegate`.

mod adapter;
pub mod central;
mod delegate;
mod device;
mod error;
mod gatt;
mod provider;

pub use adapter::CoreBluetoothAdapter;
pub use central::{
    CentralManager, CharacteristicRef, DescriptorRef, ManagerState, PeripheralRef, ServiceRef,
    WriteType,
};
pub use delegate::CentralDelegate;
pub use device::CoreBluetoothDevice;
pub use error::CentralError;
pub use gatt::{
    CoreBluetoothGattCharacteristic, CoreBluetoothGattDescriptor, CoreBluetoothGattService,
};
pub use provider::CoreBluetoothProvider;
