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
use ferry_common::error::FsError;
use ferry_common::fs::{InputChannel, OutputChannel};
use ferry_common::state::{DataInfo, WriteDataRequest};
use ferry_common::FsResult;
use log::{debug, info};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::{Duration, UNIX_EPOCH};
use tokio::fs::File;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};

pub struct FileInputChannel {
    info: DataInfo,
    file: File,
}

impl FileInputChannel {
    pub fn new(info: DataInfo, file: File) -> Self {
        Self { info, file }
    }
}

#[async_trait]
impl InputChannel for FileInputChannel {
    fn info(&self) -> &DataInfo {
        &self.info
    }

    fn input(&mut self) -> &mut (dyn AsyncRead + Unpin + Send) {
        &mut self.file
    }

    async fn close(&mut self) -> FsResult<()> {
        Ok(())
    }
}

/// Writes to a sibling tmp file; `close` renames it over the destination.
pub struct FileOutputChannel {
    request: WriteDataRequest,
    path: PathBuf,
    tmp_path: PathBuf,
    file: File,
    closed: bool,
    moved: bool,
}

impl FileOutputChannel {
    pub fn new(request: WriteDataRequest, path: PathBuf, tmp_path: PathBuf, file: File) -> Self {
        Self {
            request,
            path,
            tmp_path,
            file,
            closed: false,
            moved: false,
        }
    }

    pub fn tmp_path(&self) -> &Path {
        &self.tmp_path
    }

    async fn commit(&mut self) -> FsResult<()> {
        self.file.flush().await?;
        self.file.sync_all().await?;

        if let Ok(meta) = tokio::fs::metadata(&self.path).await {
            if meta.is_dir() {
                return Err(FsError::invalid_argument(format!(
                    "{} is a directory",
                    self.path.display()
                )));
            }
        }
        tokio::fs::rename(&self.tmp_path, &self.path).await?;
        self.moved = true;

        if let Some(mills) = self.request.upload_time {
            set_modified(&self.path, mills).await?;
        }

        debug!(
            "commit {} from {}",
            self.path.display(),
            self.tmp_path.display()
        );
        Ok(())
    }
}

async fn set_modified(path: &Path, mills: i64) -> FsResult<()> {
    let path = path.to_path_buf();
    let time = UNIX_EPOCH + Duration::from_millis(mills.max(0) as u64);
    tokio::task::spawn_blocking(move || -> FsResult<()> {
        let file = std::fs::OpenOptions::new().write(true).open(&path)?;
        file.set_modified(time)?;
        Ok(())
    })
    .await?
}

async fn remove_if_exists(path: &Path) -> FsResult<()> {
    match tokio::fs::remove_file(path).await {
        Ok(_) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

#[async_trait]
impl OutputChannel for FileOutputChannel {
    fn request(&self) -> &WriteDataRequest {
        &self.request
    }

    fn output(&mut self) -> &mut (dyn AsyncWrite + Unpin + Send) {
        &mut self.file
    }

    async fn recover(&mut self) -> FsResult<()> {
        let target = if self.moved {
            &self.path
        } else {
            &self.tmp_path
        };
        remove_if_exists(target).await?;
        info!("rollback {}", target.display());
        Ok(())
    }

    async fn close(&mut self) -> FsResult<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.commit().await
    }
}
