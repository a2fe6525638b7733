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
    sync::{Condvar, Mutex, PoisonError},
    time::{Duration, Instant},
};

use super::{BluetoothError, Operation};

/// Completion flag shared between the thread delivering backend events and
/// a caller blocked on the outcome of a native request.
///
/// Callers always `clear()` the signal before issuing the native request and
/// `wait()` afterwards, so a `set()` that races ahead of the wait is never
/// lost.
#[derive(Debug, Default)]
pub struct Signal {
    flag: Mutex<bool>,
    cond: Condvar,
}

impl Signal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self) {
        let mut flag = self.flag.lock().unwrap_or_else(PoisonError::into_inner);
        *flag = true;
        self.cond.notify_all();
    }

    pub fn clear(&self) {
        *self.flag.lock().unwrap_or_else(PoisonError::into_inner) = false;
    }

    pub fn is_set(&self) -> bool {
        *self.flag.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Block until the signal is set or `timeout` elapses. Returns whether
    /// the signal was set.
    pub fn wait(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut flag = self.flag.lock().unwrap_or_else(PoisonError::into_inner);
        while !*flag {
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            flag = self
                .cond
                .wait_timeout(flag, deadline - now)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
        true
    }

    /// `wait()` that maps a missed deadline to `BluetoothError::Timeout`.
    pub(crate) fn wait_for(
        &self,
        timeout: Duration,
        operation: Operation,
    ) -> Result<(), BluetoothError> {
        if self.wait(timeout) {
            Ok(())
        } else {
            tracing::warn!("Timed out after {:?} waiting to {}", timeout, operation);
            Err(BluetoothError::Timeout(operation))
        }
    }
}
