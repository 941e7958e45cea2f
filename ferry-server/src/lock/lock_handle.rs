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
use ferry_common::FsResult;
use log::debug;
use std::fmt::{Debug, Formatter};

/// How a granted lock gives itself back.
#[async_trait]
pub trait LockRelease: Send {
    async fn release(self: Box<Self>) -> FsResult<()>;

    /// Called when the lock is dropped without an explicit release; must not block.
    fn release_on_drop(self: Box<Self>);
}

/// A granted lock. Released exactly once: explicitly through `release`, or on drop.
pub struct Lock {
    key: String,
    release: Option<Box<dyn LockRelease>>,
}

impl Lock {
    pub fn new(key: impl Into<String>, release: Box<dyn LockRelease>) -> Self {
        Self {
            key: key.into(),
            release: Some(release),
        }
    }

    /// A lock that holds nothing.
    pub fn noop(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            release: None,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub async fn release(mut self) -> FsResult<()> {
        match self.release.take() {
            Some(v) => v.release().await,
            None => Ok(()),
        }
    }
}

impl Drop for Lock {
    fn drop(&mut self) {
        if let Some(v) = self.release.take() {
            debug!("lock {} dropped without release", self.key);
            v.release_on_drop();
        }
    }
}

impl Debug for Lock {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Lock")
            .field("key", &self.key)
            .field("held", &self.release.is_some())
            .finish()
    }
}
