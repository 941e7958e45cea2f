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

use crate::lock::Lock;
use async_trait::async_trait;
use ferry_common::error::FsError;
use ferry_common::FsResult;

/// Readers-writer exclusion keyed by resource string.
///
/// Every call tries once and never waits: contention is `Ok(None)` from the `try_*`
/// variants and a [`FsError::LockConflict`] from the others. Retrying is up to the caller.
#[async_trait]
pub trait LockManager: Send + Sync {
    async fn try_read_lock(&self, key: &str) -> FsResult<Option<Lock>>;

    async fn try_write_lock(&self, key: &str) -> FsResult<Option<Lock>>;

    async fn read_lock(&self, key: &str) -> FsResult<Lock> {
        match self.try_read_lock(key).await? {
            Some(v) => Ok(v),
            None => Err(FsError::lock_conflict(format!(
                "Write-Read Conflict on {}",
                key
            ))),
        }
    }

    async fn write_lock(&self, key: &str) -> FsResult<Lock> {
        match self.try_write_lock(key).await? {
            Some(v) => Ok(v),
            None => Err(FsError::lock_conflict(format!(
                "Write-Write Conflict on {}",
                key
            ))),
        }
    }
}
