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

use crate::lock::{Lock, LockManager};
use async_trait::async_trait;
use ferry_common::FsResult;

/// Grants every request with a lock that holds nothing.
#[derive(Debug, Default)]
pub struct EmptyLockManager;

#[async_trait]
impl LockManager for EmptyLockManager {
    async fn try_read_lock(&self, key: &str) -> FsResult<Option<Lock>> {
        Ok(Some(Lock::noop(key)))
    }

    async fn try_write_lock(&self, key: &str) -> FsResult<Option<Lock>> {
        Ok(Some(Lock::noop(key)))
    }
}
