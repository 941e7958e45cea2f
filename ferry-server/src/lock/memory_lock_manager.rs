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

use crate::lock::{Lock, LockManager, LockRelease};
use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use ferry_common::FsResult;
use std::sync::Arc;

// Counter value of a key held by a writer.
const EXCLUSIVE: i64 = i64::MAX;

type LockTable = Arc<DashMap<String, i64>>;

/// In-process lock manager: one counter per key.
///
/// Readers increment the counter; a writer installs the exclusive sentinel, which it can
/// only do while no counter exists for the key.
#[derive(Debug, Default)]
pub struct MemoryLockManager {
    locks: LockTable,
}

impl MemoryLockManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Readers currently holding `key`, or -1 when a writer holds it.
    pub fn holders(&self, key: &str) -> i64 {
        match self.locks.get(key) {
            Some(v) if *v == EXCLUSIVE => -1,
            Some(v) => *v,
            None => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

struct MemoryRelease {
    locks: LockTable,
    key: String,
    write: bool,
}

impl MemoryRelease {
    fn release_now(&self) {
        if self.write {
            self.locks.remove(&self.key);
            return;
        }

        if let Entry::Occupied(mut e) = self.locks.entry(self.key.clone()) {
            *e.get_mut() -= 1;
            if *e.get() <= 0 {
                e.remove();
            }
        }
    }
}

#[async_trait]
impl LockRelease for MemoryRelease {
    async fn release(self: Box<Self>) -> FsResult<()> {
        self.release_now();
        Ok(())
    }

    fn release_on_drop(self: Box<Self>) {
        self.release_now()
    }
}

#[async_trait]
impl LockManager for MemoryLockManager {
    async fn try_read_lock(&self, key: &str) -> FsResult<Option<Lock>> {
        let granted = match self.locks.entry(key.to_string()) {
            Entry::Occupied(mut e) => {
                if *e.get() == EXCLUSIVE {
                    false
                } else {
                    *e.get_mut() += 1;
                    true
                }
            }
            Entry::Vacant(e) => {
                e.insert(1);
                true
            }
        };

        if !granted {
            return Ok(None);
        }
        let release = MemoryRelease {
            locks: self.locks.clone(),
            key: key.to_string(),
            write: false,
        };
        Ok(Some(Lock::new(key, Box::new(release))))
    }

    async fn try_write_lock(&self, key: &str) -> FsResult<Option<Lock>> {
        match self.locks.entry(key.to_string()) {
            Entry::Occupied(_) => Ok(None),
            Entry::Vacant(e) => {
                e.insert(EXCLUSIVE);
                let release = MemoryRelease {
                    locks: self.locks.clone(),
                    key: key.to_string(),
                    write: true,
                };
                Ok(Some(Lock::new(key, Box::new(release))))
            }
        }
    }
}
