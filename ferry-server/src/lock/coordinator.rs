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
use ferry_common::sync::{SharedHandle, SharedRegistry};
use ferry_common::FsResult;
use std::sync::Arc;

/// Hierarchical coordination service with sequential ephemeral nodes.
///
/// Paths are `/`-separated. Ephemeral nodes disappear when the session of the client
/// that created them ends.
#[async_trait]
pub trait Coordinator: Send + Sync {
    /// Creates a persistent node and its missing parents; existing nodes are kept.
    async fn create_path(&self, path: &str) -> FsResult<()>;

    /// Creates `<prefix><seq>` where `seq` is a 10-digit counter of the parent node,
    /// returning the full path of the new node.
    async fn create_ephemeral_sequential(&self, prefix: &str) -> FsResult<String>;

    /// Names, not paths, of the children of `path`.
    async fn children(&self, path: &str) -> FsResult<Vec<String>>;

    async fn delete(&self, path: &str) -> FsResult<()>;

    /// Ends the session, removing its ephemeral nodes.
    fn close(&self) {}
}

pub type CoordinatorRegistry = SharedRegistry<String, Arc<dyn Coordinator>>;

pub type SharedCoordinator = SharedHandle<String, Arc<dyn Coordinator>>;

/// Sequence suffix of a sequential node name or path.
pub fn node_sequence(node: &str) -> Option<u64> {
    node.rsplit('-').next().and_then(|v| v.parse::<u64>().ok())
}
