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
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};

use super::{BluetoothError, Operation, Signal};

/// Callback invoked with the new value whenever a subscribed characteristic
/// changes. Runs on the backend's event thread.
pub type NotifyCallback = Box<dyn Fn(Vec<u8>) + Send + Sync + 'static>;

/// Per-attribute value cache that fans a value-changed event out to the
/// notification subscriber and to any `read_value()` blocked on it.
#[derive(Default)]
pub struct ValueRouter {
    value: Mutex<Option<Vec<u8>>>,
    callback: Mutex<Option<Arc<NotifyCallback>>>,
    updated: Signal,
}

impl ValueRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `callback`, replacing any earlier subscriber.
    pub fn subscribe(&self, callback: NotifyCallback) {
        *self
            .callback
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(Arc::new(callback));
    }

    pub fn unsubscribe(&self) {
        self.callback
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }

    pub fn is_subscribed(&self) -> bool {
        self.callback
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Handles a value-changed event from the backend.
    pub fn deliver(&self, value: Vec<u8>) {
        let callback = self
            .callback
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if let Some(callback) = callback {
            callback(value.clone());
        }
        self.store(value);
    }

    /// Caches a value returned directly by a synchronous native read. The
    /// subscriber isn't called since no change event happened.
    pub fn store(&self, value: Vec<u8>) {
        *self.value.lock().unwrap_or_else(PoisonError::into_inner) = Some(value);
        self.updated.set();
    }

    pub fn value(&self) -> Option<Vec<u8>> {
        self.value
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Performs one blocking read: clears the value-updated signal, runs
    /// `request` to issue the native read, then waits for the value.
    pub fn read_with<F>(
        &self,
        timeout: Duration,
        request: F,
    ) -> Result<Vec<u8>, BluetoothError>
    where
        F: FnOnce() -> Result<(), BluetoothError>,
    {
        self.updated.clear();
        request()?;
        self.updated.wait_for(timeout, Operation::ReadValue)?;
        self.value().ok_or_else(|| {
            BluetoothError::Internal(String::from(
                "value-updated signal fired without a cached value",
            ))
        })
    }
}
