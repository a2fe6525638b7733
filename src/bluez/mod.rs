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

//! Linux backend on top of the BlueZ D-Bus object tree. Property changes
//! drive the state machines; GATT discovery is observed by polling.

mod adapter;
pub mod bus;
mod device;
mod error;
mod gatt;
mod provider;

pub use adapter::BluezAdapter;
pub use device::BluezDevice;
pub use gatt::{BluezGattCharacteristic, BluezGattDescriptor, BluezGattService};
pub use provider::BluezProvider;
