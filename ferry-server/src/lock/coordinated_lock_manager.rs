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

use crate::lock::{node_sequence, Coordinator, Lock, LockManager, LockRelease, SharedCoordinator};
use async_trait::async_trait;
use ferry_common::error::FsError;
use ferry_common::utils::CommonUtils;
use ferry_common::FsResult;
use log::{debug, warn};
use std::sync::Arc;

/// Lock manager on top of a coordination service.
///
/// Each attempt creates a sequential ephemeral node under the lock path:
/// `read-<hash>-<seq>` is granted when no `write-<hash>-*` sibling exists,
/// `write-<hash>-<seq>` when its sequence is the lowest among the `write-<hash>-*`
/// siblings. A refused attempt deletes its node. The write check does not look at
/// reader nodes, so a writer can be granted while readers hold the key.
pub struct CoordinatedLockManager {
    coordinator: SharedCoordinator,
    lock_path: String,
}

impl CoordinatedLockManager {
    pub async fn create(coordinator: SharedCoordinator, lock_path: &str) -> FsResult<Self> {
        let lock_path = lock_path.trim_end_matches('/').to_string();
        coordinator.create_path(&lock_path).await?;
        Ok(Self {
            coordinator,
            lock_path,
        })
    }

    pub fn lock_path(&self) -> &str {
        &self.lock_path
    }

    fn client(&self) -> Arc<dyn Coordinator> {
        (*self.coordinator).clone()
    }

    async fn create_node(&self, prefix: &str) -> FsResult<String> {
        let path = format!("{}/{}", self.lock_path, prefix);
        self.client().create_ephemeral_sequential(&path).await
    }

    async fn siblings(&self, node: &str) -> FsResult<Vec<String>> {
        match self.client().children(&self.lock_path).await {
            Ok(v) => Ok(v),
            Err(e) => {
                self.discard(node).await;
                Err(e)
            }
        }
    }

    async fn discard(&self, node: &str) {
        if let Err(e) = delete_node(self.client().as_ref(), node).await {
            warn!("failed to delete lock node {}: {}", node, e);
        }
    }

    fn granted(&self, key: &str, node: String) -> Lock {
        let release = NodeRelease {
            coordinator: self.client(),
            node,
        };
        Lock::new(key, Box::new(release))
    }
}

async fn delete_node(coordinator: &dyn Coordinator, node: &str) -> FsResult<()> {
    match coordinator.delete(node).await {
        Err(FsError::NotFound(_)) => Ok(()),
        res => res,
    }
}

struct NodeRelease {
    coordinator: Arc<dyn Coordinator>,
    node: String,
}

#[async_trait]
impl LockRelease for NodeRelease {
    async fn release(self: Box<Self>) -> FsResult<()> {
        delete_node(self.coordinator.as_ref(), &self.node).await?;
        debug!("release lock node {}", self.node);
        Ok(())
    }

    fn release_on_drop(self: Box<Self>) {
        match tokio::runtime::Handle::try_current() {
            Ok(rt) => {
                rt.spawn(async move {
                    if let Err(e) = delete_node(self.coordinator.as_ref(), &self.node).await {
                        warn!("failed to delete lock node {}: {}", self.node, e);
                    }
                });
            }
            Err(_) => warn!(
                "no runtime to delete lock node {}, left to session expiry",
                self.node
            ),
        }
    }
}

#[async_trait]
impl LockManager for CoordinatedLockManager {
    async fn try_read_lock(&self, key: &str) -> FsResult<Option<Lock>> {
        let hash = CommonUtils::key_hash(key)?;
        let node = self.create_node(&format!("read-{}-", hash)).await?;

        let writer = format!("write-{}-", hash);
        let siblings = self.siblings(&node).await?;
        if siblings.iter().any(|v| v.starts_with(&writer)) {
            self.discard(&node).await;
            return Ok(None);
        }

        Ok(Some(self.granted(key, node)))
    }

    async fn try_write_lock(&self, key: &str) -> FsResult<Option<Lock>> {
        let hash = CommonUtils::key_hash(key)?;
        let node = self.create_node(&format!("write-{}-", hash)).await?;
        let own = match node_sequence(&node) {
            Some(v) => v,
            None => {
                self.discard(&node).await;
                return Err(FsError::coordination(format!(
                    "lock node {} has no sequence",
                    node
                )));
            }
        };

        let writer = format!("write-{}-", hash);
        let siblings = self.siblings(&node).await?;
        let lowest = siblings
            .iter()
            .filter(|v| v.starts_with(&writer))
            .filter_map(|v| node_sequence(v))
            .min()
            .unwrap_or(own);

        if own > lowest {
            self.discard(&node).await;
            return Ok(None);
        }

        Ok(Some(self.granted(key, node)))
    }
}
