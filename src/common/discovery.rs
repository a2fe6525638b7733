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

use std::{
    collections::HashSet,
    hash::Hash,
    sync::{Mutex, PoisonError},
    thread,
    time::{Duration, Instant},
};

use tracing::debug;
use uuid::Uuid;

use super::{BluetoothError, Signal};

/// The service and characteristic UUIDs known for a device at one instant.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DiscoverySnapshot {
    pub services: HashSet<Uuid>,
    pub characteristics: HashSet<Uuid>,
}

impl DiscoverySnapshot {
    /// True if at least the expected UUIDs are present.
    pub fn satisfies(&self, services: &[Uuid], characteristics: &[Uuid]) -> bool {
        services.iter().all(|uuid| self.services.contains(uuid))
            && characteristics
                .iter()
                .all(|uuid| self.characteristics.contains(uuid))
    }
}

/// Polling discovery for backends that never announce "discovery complete".
///
/// Takes a snapshot every `interval` until it covers the expected UUIDs or
/// `timeout` has elapsed. A zero timeout checks exactly once. Timing out is
/// `Ok(false)`; only a failing snapshot is an error. The result can lag the
/// backend by up to one interval.
pub fn poll_until_discovered<F>(
    services: &[Uuid],
    characteristics: &[Uuid],
    timeout: Duration,
    interval: Duration,
    mut snapshot: F,
) -> Result<bool, BluetoothError>
where
    F: FnMut() -> Result<DiscoverySnapshot, BluetoothError>,
{
    let start = Instant::now();
    loop {
        if snapshot()?.satisfies(services, characteristics) {
            return Ok(true);
        }
        let elapsed = start.elapsed();
        if elapsed >= timeout {
            debug!("Discovery did not complete within {:?}", timeout);
            return Ok(false);
        }
        thread::sleep(interval.min(timeout - elapsed));
    }
}

/// Event-driven discovery for backends that report, per service, when its
/// characteristics have been discovered. Fires `complete` once every service
/// currently known for the device has reported.
#[derive(Debug)]
pub struct ServiceDiscoveryTracker<K> {
    discovered: Mutex<HashSet<K>>,
    complete: Signal,
}

impl<K: Eq + Hash + Clone> ServiceDiscoveryTracker<K> {
    pub fn new() -> Self {
        Self {
            discovered: Mutex::new(HashSet::new()),
            complete: Signal::new(),
        }
    }

    /// Forget all progress, e.g. when a new connection starts.
    pub fn reset(&self) {
        self.discovered
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        self.complete.clear();
    }

    /// Records that `service` finished characteristic discovery. `known` is
    /// the full list of services the device currently exposes. Returns true
    /// once every known service has reported.
    pub fn service_discovered(&self, service: K, known: &[K]) -> bool {
        let done = {
            let mut discovered = self
                .discovered
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            discovered.insert(service);
            known.iter().all(|key| discovered.contains(key))
        };
        if done {
            self.complete.set();
        }
        done
    }

    /// For devices that turn out to expose no services at all.
    pub fn mark_complete(&self) {
        self.complete.set();
    }

    pub fn is_complete(&self) -> bool {
        self.complete.is_set()
    }

    pub fn wait(&self, timeout: Duration) -> bool {
        self.complete.wait(timeout)
    }
}

impl<K: Eq + Hash + Clone> Default for ServiceDiscoveryTracker<K> {
    fn default() -> Self {
        Self::new()
    }
}
