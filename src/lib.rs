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

//! Blocking BLE central API over the native stacks. Each backend turns the
//! stack's asynchronous events into blocking calls with explicit timeouts.
//!
//! Backends talk to the stack through a narrow trait
//! ([`bluez::bus::BusConnection`], [`corebluetooth::CentralManager`]) that
//! a binding crate implements. Applications pick the backend reported by
//! [`Platform::backend()`] and drive their logic from a worker thread with
//! [`run_with()`] while the native event loop owns the main thread.

pub mod api;
pub mod bluez;
mod common;
pub mod corebluetooth;
pub mod services;

pub use common::{
    poll_until_discovered, run_with, uuid_from_bytes, uuid_from_u16,
    uuid_from_u32, AdapterState, AdvertisedUuids, BluetoothError, Config,
    DeviceState, DeviceStatus, DiscoverySnapshot, DispatchLoop, EventLoop,
    LoopExit, LoopHandle, NotifyCallback, Operation, PowerState, Registry,
    ScanState, ServiceDiscoveryTracker, Signal, ValueRouter, BASE_UUID,
};

/// The native stacks this crate has a backend for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Backend {
    Bluez,
    CoreBluetooth,
}

cfg_if::cfg_if! {
    if #[cfg(target_os = "linux")] {
        const NATIVE_BACKEND: Option<Backend> = Some(Backend::Bluez);
    } else if #[cfg(target_os = "macos")] {
        const NATIVE_BACKEND: Option<Backend> = Some(Backend::CoreBluetooth);
    } else {
        const NATIVE_BACKEND: Option<Backend> = None;
    }
}

pub struct Platform;

impl Platform {
    /// The backend matching the host operating system.
    pub fn backend() -> Result<Backend, BluetoothError> {
        NATIVE_BACKEND.ok_or_else(|| {
            BluetoothError::UnsupportedPlatform(String::from(std::env::consts::OS))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_matches_host() {
        let backend = Platform::backend();
        if cfg!(target_os = "linux") {
            assert_eq!(backend, Ok(Backend::Bluez));
        } else if cfg!(target_os = "macos") {
            assert_eq!(backend, Ok(Backend::CoreBluetooth));
        } else {
            assert!(matches!(backend, Err(BluetoothError::UnsupportedPlatform(_))));
        }
    }
}
