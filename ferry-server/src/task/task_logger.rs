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

use async_trait::async_trait;
use ferry_common::conf::TaskConf;
use ferry_common::state::{AccessStatus, AccessStatusQuery};
use ferry_common::FsResult;
use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{Duration, Instant};

/// Sink of task status snapshots, keyed by task id; a later snapshot replaces an
/// earlier one. `add` is called from the copy loop and must return promptly.
#[async_trait]
pub trait TaskLogger: Send + Sync {
    async fn add(&self, status: AccessStatus) -> FsResult<()>;

    async fn find(&self, id: &str) -> FsResult<Option<AccessStatus>>;

    /// Matching snapshots ordered by id, which starts with the submit time.
    async fn list(&self, query: &AccessStatusQuery) -> FsResult<Vec<AccessStatus>>;

    async fn close(&self) -> FsResult<()> {
        Ok(())
    }
}

struct LogEntry {
    status: AccessStatus,
    added: Instant,
}

struct LogEntries {
    map: BTreeMap<String, LogEntry>,
    // None when snapshots never expire.
    next_sweep: Option<Instant>,
}

/// Task logger kept in process memory.
///
/// Snapshots expire `ttl` after their last update; expired entries are hidden at once and
/// swept at most once per `ttl`. At most `capacity` snapshots are kept, the ones of the
/// oldest task ids are evicted first. `add` costs `O(log n)` between sweeps.
pub struct MemoryTaskLogger {
    ttl: Option<Duration>,
    capacity: usize,
    entries: RwLock<LogEntries>,
}

impl MemoryTaskLogger {
    pub fn new(ttl: Option<Duration>, capacity: usize) -> Self {
        let entries = LogEntries {
            map: BTreeMap::new(),
            next_sweep: ttl.map(|_| Instant::now()),
        };
        Self {
            ttl,
            capacity: capacity.max(1),
            entries: RwLock::new(entries),
        }
    }

    pub fn with_conf(conf: &TaskConf) -> Self {
        Self::new(conf.log_ttl, conf.log_capacity)
    }

    fn read(&self) -> RwLockReadGuard<'_, LogEntries> {
        match self.entries.read() {
            Ok(v) => v,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn write(&self) -> RwLockWriteGuard<'_, LogEntries> {
        match self.entries.write() {
            Ok(v) => v,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn is_live(&self, entry: &LogEntry, now: Instant) -> bool {
        match self.ttl {
            Some(ttl) => now.duration_since(entry.added) <= ttl,
            None => true,
        }
    }

    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.read().map.values().filter(|v| self.is_live(v, now)).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl TaskLogger for MemoryTaskLogger {
    async fn add(&self, status: AccessStatus) -> FsResult<()> {
        let now = Instant::now();
        let mut entries = self.write();
        entries.map.insert(
            status.id.clone(),
            LogEntry {
                status,
                added: now,
            },
        );

        if let (Some(ttl), Some(next)) = (self.ttl, entries.next_sweep) {
            if now >= next {
                entries.map.retain(|_, v| self.is_live(v, now));
                entries.next_sweep = now.checked_add(ttl);
            }
        }
        while entries.map.len() > self.capacity {
            entries.map.pop_first();
        }
        Ok(())
    }

    async fn find(&self, id: &str) -> FsResult<Option<AccessStatus>> {
        let now = Instant::now();
        let status = self
            .read()
            .map
            .get(id)
            .filter(|v| self.is_live(v, now))
            .map(|v| v.status.clone());
        Ok(status)
    }

    async fn list(&self, query: &AccessStatusQuery) -> FsResult<Vec<AccessStatus>> {
        let now = Instant::now();
        let entries = self.read();
        let matched = entries
            .map
            .values()
            .filter(|v| self.is_live(v, now) && query.matches(&v.status))
            .skip(query.offset)
            .take(query.limit.unwrap_or(usize::MAX))
            .map(|v| v.status.clone())
            .collect();
        Ok(matched)
    }

    async fn close(&self) -> FsResult<()> {
        self.write().map.clear();
        Ok(())
    }
}
