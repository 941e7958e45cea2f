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

use crate::file::{FileInputChannel, FileOutputChannel};
use async_trait::async_trait;
use ferry_common::conf::FerryConf;
use ferry_common::error::FsError;
use ferry_common::fs::{Backend, BackendFactory, DataInfoStream, InputChannel, OutputChannel};
use ferry_common::state::{
    DataInfo, DataInfoQuery, DataType, Protocol, ReadDataRequest, ResourceLocator,
    WriteDataRequest,
};
use ferry_common::utils::CommonUtils;
use ferry_common::{err_ext, FsResult};
use futures::stream;
use futures::StreamExt;
use log::debug;
use std::fs::Metadata;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::UNIX_EPOCH;
use tokio::fs::{self, File};

/// Local disk adapter for `file://` locators.
#[derive(Debug, Default)]
pub struct FileBackend;

impl FileBackend {
    pub fn new() -> Self {
        Self
    }

    pub fn local_path(locator: &ResourceLocator) -> PathBuf {
        PathBuf::from(locator.path().full_path())
    }

    fn to_info(locator: ResourceLocator, meta: &Metadata) -> DataInfo {
        let data_type = if meta.is_file() {
            DataType::File
        } else if meta.is_dir() {
            DataType::Directory
        } else {
            DataType::Others
        };

        let upload_time = meta
            .modified()
            .ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map(|d| d.as_millis() as i64)
            .unwrap_or(0);

        let size = if data_type == DataType::Directory {
            0
        } else {
            meta.len() as i64
        };

        DataInfo::new(locator, data_type, size, upload_time)
    }

    pub async fn data_info(locator: &ResourceLocator) -> FsResult<DataInfo> {
        let path = Self::local_path(locator);
        let meta = fs::metadata(&path)
            .await
            .map_err(|e| FsError::from(e).with_context(&path))?;
        Ok(Self::to_info(locator.clone(), &meta))
    }
}

trait PathContext {
    fn with_context(self, path: &std::path::Path) -> FsError;
}

impl PathContext for FsError {
    fn with_context(self, path: &std::path::Path) -> FsError {
        match self {
            FsError::NotFound(_) => FsError::not_found(format!("{} not found", path.display())),
            e => FsError::io(format!("{}: {}", path.display(), e)),
        }
    }
}

#[async_trait]
impl Backend for FileBackend {
    fn protocol(&self) -> Protocol {
        Protocol::File
    }

    async fn internal_open(&self, req: &ReadDataRequest) -> FsResult<Box<dyn InputChannel>> {
        let info = Self::data_info(req.locator()).await?;
        if !info.is_file() {
            return Err(FsError::invalid_argument(format!(
                "{} is not a file",
                req.locator()
            )));
        }

        let file = File::open(Self::local_path(req.locator())).await?;
        Ok(Box::new(FileInputChannel::new(info, file)))
    }

    async fn internal_create(&self, req: &WriteDataRequest) -> FsResult<Box<dyn OutputChannel>> {
        let locator = req.locator();
        if locator.path().is_dir() {
            return Err(FsError::invalid_argument(format!(
                "{} has no file name",
                locator
            )));
        }

        let path = Self::local_path(locator);
        let tmp_locator = locator.with_path(
            locator
                .path()
                .with_name(&CommonUtils::tmp_name(locator.path().name())),
        );
        let tmp_path = Self::local_path(&tmp_locator);

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let file = File::create(&tmp_path).await?;
        debug!("create {} via {}", path.display(), tmp_path.display());

        Ok(Box::new(FileOutputChannel::new(
            req.clone(),
            path,
            tmp_path,
            file,
        )))
    }

    async fn internal_delete(&self, info: &DataInfo) -> FsResult<()> {
        let path = Self::local_path(&info.locator);
        let meta = fs::metadata(&path).await?;
        if meta.is_dir() {
            fs::remove_dir(&path).await?;
        } else {
            fs::remove_file(&path).await?;
        }
        debug!("delete {}", path.display());
        Ok(())
    }

    async fn internal_list(&self, query: &DataInfoQuery) -> FsResult<DataInfoStream> {
        let info = Self::data_info(&query.locator).await?;
        if !info.is_dir() {
            return Err(FsError::invalid_argument(format!(
                "{} is not a directory",
                query.locator
            )));
        }

        let dir = query.locator.with_path(query.locator.path().as_dir());
        let entries = fs::read_dir(Self::local_path(&dir)).await?;

        let items = stream::unfold(Some((entries, dir)), |state| async move {
            let (mut entries, dir) = state?;
            match entries.next_entry().await {
                Ok(Some(entry)) => {
                    let name = entry.file_name().to_string_lossy().to_string();
                    let locator = dir.append_name(&name);
                    let item = match entry.metadata().await {
                        Ok(meta) => Ok(Self::to_info(locator, &meta)),
                        Err(e) => err_ext!(e),
                    };
                    Some((item, Some((entries, dir))))
                }
                Ok(None) => None,
                Err(e) => Some((err_ext!(e), None)),
            }
        });

        Ok(items.boxed())
    }
}

pub struct FileBackendFactory;

impl BackendFactory for FileBackendFactory {
    fn protocol(&self) -> Protocol {
        Protocol::File
    }

    fn create(&self, _conf: &FerryConf) -> FsResult<Arc<dyn Backend>> {
        Ok(Arc::new(FileBackend::new()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::TryStreamExt;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    fn locator(dir: &std::path::Path, name: &str) -> ResourceLocator {
        ResourceLocator::parse(&format!("file://{}/{}", dir.display(), name)).unwrap()
    }

    #[tokio::test]
    async fn create_commit_open() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FileBackend::new();
        let target = locator(dir.path(), "out.bin");

        let req = WriteDataRequest::new(target.clone()).with_upload_time(1_600_000_000_000);
        let mut output = backend.internal_create(&req).await.unwrap();
        output.output().write_all(b"hello ferry").await.unwrap();
        assert!(!dir.path().join("out.bin").exists());
        output.close().await.unwrap();
        assert!(dir.path().join("out.bin").exists());

        let mut input = backend
            .internal_open(&ReadDataRequest::new(target))
            .await
            .unwrap();
        assert_eq!(input.info().size, 11);
        assert_eq!(input.info().upload_time, 1_600_000_000_000);
        let mut out = String::new();
        input.input().read_to_string(&mut out).await.unwrap();
        assert_eq!(out, "hello ferry");
        input.close().await.unwrap();
    }

    #[tokio::test]
    async fn recover_before_and_after_commit() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FileBackend::new();

        let req = WriteDataRequest::new(locator(dir.path(), "a.bin"));
        let mut output = backend.internal_create(&req).await.unwrap();
        output.output().write_all(b"partial").await.unwrap();
        output.recover().await.unwrap();
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);

        let mut output = backend.internal_create(&req).await.unwrap();
        output.output().write_all(b"full").await.unwrap();
        output.close().await.unwrap();
        output.recover().await.unwrap();
        assert!(!dir.path().join("a.bin").exists());
    }

    #[tokio::test]
    async fn open_rejects_missing_and_dir() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FileBackend::new();

        let missing = backend
            .internal_open(&ReadDataRequest::new(locator(dir.path(), "none")))
            .await;
        assert!(matches!(missing, Err(FsError::NotFound(_))));

        std::fs::create_dir(dir.path().join("sub")).unwrap();
        let sub = backend
            .internal_open(&ReadDataRequest::new(locator(dir.path(), "sub")))
            .await;
        assert!(matches!(sub, Err(FsError::InvalidArgument(_))));
    }

    #[tokio::test]
    async fn list_and_delete() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["a", "b", "c"] {
            std::fs::write(dir.path().join(name), name.repeat(3)).unwrap();
        }
        std::fs::create_dir(dir.path().join("d")).unwrap();

        let backend = FileBackend::new();
        let query = DataInfoQuery::new(locator(dir.path(), ""));
        let mut items: Vec<DataInfo> = backend
            .internal_list(&query)
            .await
            .unwrap()
            .try_collect()
            .await
            .unwrap();
        items.sort_by(|a, b| a.name().cmp(b.name()));

        let names: Vec<&str> = items.iter().map(|v| v.name()).collect();
        assert_eq!(names, vec!["a", "b", "c", "d"]);
        assert_eq!(items[0].size, 3);
        assert!(items[3].is_dir());

        for item in &items {
            backend.internal_delete(item).await.unwrap();
        }
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
