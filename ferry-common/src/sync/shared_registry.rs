// Copyright 2025 OPPO.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use crate::FsResult;
use log::debug;
use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use std::ops::Deref;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

type Releaser<T> = Box<dyn Fn(&T) + Send + Sync>;

struct SharedEntry<T> {
    value: T,
    releaser: Releaser<T>,
}

struct Slot<T> {
    entry: Arc<SharedEntry<T>>,
    refs: usize,
}

type Slots<K, T> = Arc<Mutex<HashMap<K, Slot<T>>>>;

fn lock<K, T>(slots: &Slots<K, T>) -> MutexGuard<'_, HashMap<K, Slot<T>>> {
    match slots.lock() {
        Ok(v) => v,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Reference-counted objects shared by key, such as one coordination session used by
/// several consumers.
///
/// Acquire, release and removal happen under one registry lock; using the object does not.
/// The releaser runs once, when the last handle of an object is closed.
pub struct SharedRegistry<K, T> {
    slots: Slots<K, T>,
}

impl<K, T> SharedRegistry<K, T>
where
    K: Eq + Hash + Clone + Debug,
    T: Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            slots: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Returns a handle to the live object under `key`, creating it with `supplier` first
    /// when there is none.
    pub fn acquire<F, R>(&self, key: K, supplier: F, releaser: R) -> FsResult<SharedHandle<K, T>>
    where
        F: FnOnce() -> FsResult<T>,
        R: Fn(&T) + Send + Sync + 'static,
    {
        let mut slots = lock(&self.slots);
        let entry = match slots.get_mut(&key) {
            Some(slot) if slot.refs > 0 => {
                slot.refs += 1;
                slot.entry.clone()
            }

            _ => {
                let entry = Arc::new(SharedEntry {
                    value: supplier()?,
                    releaser: Box::new(releaser),
                });
                slots.insert(
                    key.clone(),
                    Slot {
                        entry: entry.clone(),
                        refs: 1,
                    },
                );
                debug!("create shared object {:?}", key);
                entry
            }
        };

        Ok(SharedHandle {
            key,
            entry,
            slots: self.slots.clone(),
            closed: AtomicBool::new(false),
        })
    }

    pub fn ref_count(&self, key: &K) -> usize {
        lock(&self.slots).get(key).map(|v| v.refs).unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        lock(&self.slots).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<K, T> Default for SharedRegistry<K, T>
where
    K: Eq + Hash + Clone + Debug,
    T: Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

/// One reference to a shared object. Closing is idempotent and also happens on drop.
pub struct SharedHandle<K: Eq + Hash + Debug, T> {
    key: K,
    entry: Arc<SharedEntry<T>>,
    slots: Slots<K, T>,
    closed: AtomicBool,
}

impl<K: Eq + Hash + Debug, T> SharedHandle<K, T> {
    pub fn key(&self) -> &K {
        &self.key
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }

        let released = {
            let mut slots = lock(&self.slots);
            match slots.get_mut(&self.key) {
                Some(slot) if Arc::ptr_eq(&slot.entry, &self.entry) => {
                    slot.refs -= 1;
                    if slot.refs == 0 {
                        slots.remove(&self.key);
                        true
                    } else {
                        false
                    }
                }
                _ => false,
            }
        };

        if released {
            debug!("release shared object {:?}", self.key);
            (self.entry.releaser)(&self.entry.value);
        }
    }
}

impl<K: Eq + Hash + Debug, T> Deref for SharedHandle<K, T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.entry.value
    }
}

impl<K: Eq + Hash + Debug, T> Drop for SharedHandle<K, T> {
    fn drop(&mut self) {
        self.close()
    }
}
