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

use crate::lock::Coordinator;
use async_trait::async_trait;
use ferry_common::error::FsError;
use ferry_common::FsResult;
use log::info;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

#[derive(Default)]
struct Tree {
    // path -> ephemeral
    nodes: BTreeMap<String, bool>,
    // parent path -> next sequence
    sequences: HashMap<String, u64>,
}

/// In-process coordination service holding a single session.
pub struct MemoryCoordinator {
    tree: Mutex<Tree>,
    available: AtomicBool,
}

impl Default for MemoryCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryCoordinator {
    pub fn new() -> Self {
        let mut tree = Tree::default();
        tree.nodes.insert("/".to_string(), false);
        Self {
            tree: Mutex::new(tree),
            available: AtomicBool::new(true),
        }
    }

    /// Simulates losing or regaining the connection to the service.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    pub fn exists(&self, path: &str) -> bool {
        self.tree().nodes.contains_key(path)
    }

    fn tree(&self) -> MutexGuard<'_, Tree> {
        match self.tree.lock() {
            Ok(v) => v,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn check(&self) -> FsResult<()> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(FsError::coordination("coordination service is unavailable"))
        }
    }

    fn parent(path: &str) -> &str {
        match path.rfind('/') {
            Some(0) | None => "/",
            Some(idx) => &path[..idx],
        }
    }
}

#[async_trait]
impl Coordinator for MemoryCoordinator {
    async fn create_path(&self, path: &str) -> FsResult<()> {
        self.check()?;
        let mut tree = self.tree();
        let mut current = String::new();
        for part in path.split('/').filter(|v| !v.is_empty()) {
            current.push('/');
            current.push_str(part);
            tree.nodes.entry(current.clone()).or_insert(false);
        }
        Ok(())
    }

    async fn create_ephemeral_sequential(&self, prefix: &str) -> FsResult<String> {
        self.check()?;
        let mut tree = self.tree();
        let parent = Self::parent(prefix).to_string();
        if !tree.nodes.contains_key(&parent) {
            return Err(FsError::not_found(format!("node {} does not exist", parent)));
        }

        let seq = tree.sequences.entry(parent).or_insert(0);
        let path = format!("{}{:010}", prefix, *seq);
        *seq += 1;
        tree.nodes.insert(path.clone(), true);
        Ok(path)
    }

    async fn children(&self, path: &str) -> FsResult<Vec<String>> {
        self.check()?;
        let tree = self.tree();
        if !tree.nodes.contains_key(path) {
            return Err(FsError::not_found(format!("node {} does not exist", path)));
        }

        let children = tree
            .nodes
            .keys()
            .filter(|k| k.as_str() != path && Self::parent(k) == path)
            .filter_map(|k| k.rsplit('/').next().map(|v| v.to_string()))
            .collect();
        Ok(children)
    }

    async fn delete(&self, path: &str) -> FsResult<()> {
        self.check()?;
        match self.tree().nodes.remove(path) {
            Some(_) => Ok(()),
            None => Err(FsError::not_found(format!("node {} does not exist", path))),
        }
    }

    fn close(&self) {
        let mut tree = self.tree();
        let before = tree.nodes.len();
        tree.nodes.retain(|_, ephemeral| !*ephemeral);
        info!(
            "coordinator session closed, removed {} ephemeral nodes",
            before - tree.nodes.len()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn sequential_nodes() {
        let coord = MemoryCoordinator::new();
        coord.create_path("/ferry/lock").await.unwrap();
        assert!(coord.exists("/ferry"));

        let a = coord
            .create_ephemeral_sequential("/ferry/lock/read-x-")
            .await
            .unwrap();
        let b = coord
            .create_ephemeral_sequential("/ferry/lock/write-x-")
            .await
            .unwrap();
        assert_eq!(a, "/ferry/lock/read-x-0000000000");
        assert_eq!(b, "/ferry/lock/write-x-0000000001");

        let mut children = coord.children("/ferry/lock").await.unwrap();
        children.sort();
        assert_eq!(children, vec!["read-x-0000000000", "write-x-0000000001"]);

        coord.delete(&a).await.unwrap();
        assert!(coord.delete(&a).await.is_err());

        coord.close();
        assert!(!coord.exists(&b));
        assert!(coord.exists("/ferry/lock"));
    }

    #[tokio::test]
    async fn unavailable() {
        let coord = MemoryCoordinator::new();
        coord.set_available(false);
        let err = coord.create_path("/a").await.unwrap_err();
        assert!(matches!(err, FsError::Coordination(_)));
        coord.set_available(true);
        coord.create_path("/a").await.unwrap();
    }
}
