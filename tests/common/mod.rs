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

//! In-memory stand-ins for the native stacks. Events are delivered on a
//! `DispatchLoop` thread, like a real binding would deliver them on the
//! native event thread.

#![allow(dead_code)]

pub mod mock_bus;
pub mod mock_central;

use std::{sync::Arc, time::Duration};

use bluefruit_le::{run_with, BluetoothError, Config, DispatchLoop, LoopHandle};

pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Short intervals so polling tests finish quickly.
pub fn test_config() -> Config {
    Config {
        timeout: Duration::from_secs(2),
        discovery_poll_interval: Duration::from_millis(20),
        find_poll_interval: Duration::from_millis(20),
    }
}

/// Runs `body` as application logic against a live event loop. Assertion
/// failures inside `body` are re-raised on the test thread.
pub fn run_on_loop<F>(body: F)
where
    F: FnOnce(LoopHandle) -> Result<(), BluetoothError> + Send + 'static,
{
    init_logging();
    let event_loop = Arc::new(DispatchLoop::new());
    let events = event_loop.handle();
    let result = run_with(&event_loop, move || body(events).map(|()| None));
    assert_eq!(result, Ok(0));
}
