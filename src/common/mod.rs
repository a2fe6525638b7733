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

mod config;
mod discovery;
mod error;
mod event_loop;
mod registry;
mod router;
mod short_uuid;
mod signal;
mod state;

pub use config::Config;
pub use discovery::{
    poll_until_discovered, DiscoverySnapshot, ServiceDiscoveryTracker,
};
pub use error::{BluetoothError, Operation};
pub use event_loop::{run_with, DispatchLoop, EventLoop, LoopExit, LoopHandle};
pub use registry::Registry;
pub use router::{NotifyCallback, ValueRouter};
pub use short_uuid::{uuid_from_bytes, uuid_from_u16, uuid_from_u32, BASE_UUID};
pub use signal::Signal;
pub use state::{
    AdapterState, AdvertisedUuids, DeviceState, DeviceStatus, PowerState,
    ScanState,
};
