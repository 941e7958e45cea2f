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
use async_trait::async_trait;
use log::{debug, warn};
use std::path::{Path, PathBuf};
use tokio::io::{AsyncRead, AsyncWrite};

pub type BoxReader = Box<dyn AsyncRead + Unpin + Send>;

pub type BoxWriter = Box<dyn AsyncWrite + Unpin + Send>;

/// Unbounded backing store a spill buffer migrates to once its memory limit is crossed.
///
/// `create_writer` is called at most once; `open_reader` only after that writer was shut down.
#[async_trait]
pub trait SpillStore: Send + Sync {
    async fn create_writer(&self) -> FsResult<BoxWriter>;

    async fn open_reader(&self) -> FsResult<BoxReader>;
}

/// Spill store backed by a uniquely named local file, removed when the store is dropped.
#[derive(Debug)]
pub struct FileSpillStore {
    path: PathBuf,
}

impl FileSpillStore {
    pub fn new<T: AsRef<Path>>(dir: T) -> Self {
        let path = dir
            .as_ref()
            .join(format!("ferry-spill-{}", uuid::Uuid::new_v4().simple()));
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl SpillStore for FileSpillStore {
    async fn create_writer(&self) -> FsResult<BoxWriter> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let file = tokio::fs::File::create(&self.path).await?;
        debug!("create spill file {}", self.path.display());
        Ok(Box::new(file))
    }

    async fn open_reader(&self) -> FsResult<BoxReader> {
        let file = tokio::fs::File::open(&self.path).await?;
        Ok(Box::new(file))
    }
}

impl Drop for FileSpillStore {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(_) => debug!("delete spill file {}", self.path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => (),
            Err(e) => warn!("failed to delete spill file {}: {}", self.path.display(), e),
        }
    }
}
