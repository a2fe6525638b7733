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
    collections::HashMap,
    fmt::Debug,
    hash::Hash,
    sync::{Mutex, MutexGuard, PoisonError},
};

use tracing::error;

use super::BluetoothError;

/// Maps opaque native handles to the domain objects built for them, so the
/// same native object always resolves to the same domain object no matter
/// which thread asks. Values are expected to be cheap handles such as
/// `Arc<T>`.
pub struct Registry<K, V> {
    map: Mutex<HashMap<K, V>>,
}

impl<K, V> Registry<K, V>
where
    K: Eq + Hash + Clone + Debug,
    V: Clone,
{
    pub fn new() -> Self {
        Self {
            map: Mutex::new(HashMap::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<K, V>> {
        self.map.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns the value registered for `key`, building and inserting it with
    /// `factory` first if there is none. `factory` runs under the registry
    /// lock and must not call back into this registry.
    pub fn add_if_absent<F>(&self, key: K, factory: F) -> V
    where
        F: FnOnce() -> V,
    {
        self.lock().entry(key).or_insert_with(factory).clone()
    }

    pub fn get(&self, key: &K) -> Option<V> {
        self.lock().get(key).cloned()
    }

    /// Resolves every key or none of them. A missing key means the backend
    /// handed out a handle the library never saw, so this is reported as
    /// `LookupInconsistency` instead of a partial list.
    pub fn get_all(&self, keys: &[K]) -> Result<Vec<V>, BluetoothError> {
        let map = self.lock();
        keys.iter()
            .map(|key| {
                map.get(key).cloned().ok_or_else(|| {
                    error!("No registered entry for native handle {:?}", key);
                    BluetoothError::LookupInconsistency(format!(
                        "native handle {:?} is not registered",
                        key
                    ))
                })
            })
            .collect()
    }

    pub fn remove(&self, key: &K) -> Option<V> {
        self.lock().remove(key)
    }

    /// Keeps only the entries for which `keep` returns true.
    pub fn retain<F>(&self, mut keep: F)
    where
        F: FnMut(&K, &V) -> bool,
    {
        self.lock().retain(|key, value| keep(key, value));
    }

    pub fn list(&self) -> Vec<V> {
        self.lock().values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

impl<K, V> Default for Registry<K, V>
where
    K: Eq + Hash + Clone + Debug,
    V: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}
