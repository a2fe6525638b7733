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

use std::time::Duration;

/// Timing knobs shared by a provider and every object it hands out.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Config {
    /// Default deadline for blocking operations that don't take one.
    pub timeout: Duration,
    /// How often polling discovery re-checks the device's GATT tree.
    pub discovery_poll_interval: Duration,
    /// How often `find_device()` re-checks the known devices.
    pub find_poll_interval: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            timeout: Duration::from_secs(30),
            discovery_poll_interval: Duration::from_secs(1),
            find_poll_interval: Duration::from_secs(1),
        }
    }
}
