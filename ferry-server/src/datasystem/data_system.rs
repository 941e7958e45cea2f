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

use crate::datasystem::metered_channel::release_lock;
use crate::datasystem::{DataMetrics, MeteredInputChannel, MeteredOutputChannel, Operation};
use crate::lock::LockManager;
use ferry_common::conf::BufferConf;
use ferry_common::fs::{Backend, DataInfoStream, InputChannel, OutputChannel};
use ferry_common::io::{SpillBuffer, SpillInputChannel};
use ferry_common::state::{
    DataInfo, DataInfoQuery, Protocol, ReadDataRequest, ResourceLocator, WriteDataRequest,
};
use ferry_common::{err_box, FsResult};
use futures::{future, stream, StreamExt, TryStreamExt};
use log::{debug, error, warn};
use std::sync::Arc;

/// One protocol's backend, wrapped with locking, metering and list post-processing.
pub struct DataSystem {
    protocol: Protocol,
    backend: Arc<dyn Backend>,
    lock_manager: Arc<dyn LockManager>,
    metrics: Arc<DataMetrics>,
    buffer_conf: BufferConf,
}

impl DataSystem {
    pub fn new(
        backend: Arc<dyn Backend>,
        lock_manager: Arc<dyn LockManager>,
        metrics: Arc<DataMetrics>,
        buffer_conf: BufferConf,
    ) -> Self {
        Self {
            protocol: backend.protocol(),
            backend,
            lock_manager,
            metrics,
            buffer_conf,
        }
    }

    pub fn protocol(&self) -> Protocol {
        self.protocol
    }

    pub fn metrics(&self) -> &DataMetrics {
        &self.metrics
    }

    // A request reaching the wrong instance is a routing bug, not a user error.
    fn check_scheme(&self, locator: &ResourceLocator) -> FsResult<()> {
        if locator.protocol() == self.protocol {
            Ok(())
        } else {
            error!(
                "not supported scheme: {} by the {} data system",
                locator.protocol(),
                self.protocol
            );
            err_box!(
                "not supported scheme: {} by the {} data system",
                locator.protocol(),
                self.protocol
            )
        }
    }

    /// Opens a locked, metered input channel. A failed open releases the lock first.
    pub async fn open(&self, req: &ReadDataRequest) -> FsResult<Box<dyn InputChannel>> {
        self.check_scheme(req.locator())?;
        let lock = self.lock_manager.read_lock(&req.locator().canonical()).await?;

        match self.backend.internal_open(req).await {
            Ok(channel) => {
                let metrics = self.metrics.new_metrics(Operation::Read, channel.info().size);
                debug!("open {}, size {}", req.locator(), channel.info().size);
                Ok(Box::new(MeteredInputChannel::new(channel, lock, metrics)))
            }
            Err(e) => {
                release_lock(Some(lock)).await;
                Err(e)
            }
        }
    }

    /// Like [`DataSystem::open`], but a source without a declared size is first drained
    /// through a spill buffer so the returned channel reports its real size.
    pub async fn open_sized(&self, req: &ReadDataRequest) -> FsResult<Box<dyn InputChannel>> {
        let channel = self.open(req).await?;
        if channel.info().size >= 0 {
            return Ok(channel);
        }

        let buffer = match SpillBuffer::with_conf(&self.buffer_conf) {
            Ok(v) => v,
            Err(e) => {
                let mut channel = channel;
                if let Err(close) = channel.close().await {
                    warn!("close {} failed: {}", req.locator(), close);
                }
                return Err(e);
            }
        };
        let drained = SpillInputChannel::drain(channel, buffer).await?;
        Ok(Box::new(drained))
    }

    /// Creates a locked, metered output channel. A failed create releases the lock first.
    pub async fn create(&self, req: &WriteDataRequest) -> FsResult<Box<dyn OutputChannel>> {
        self.check_scheme(req.locator())?;
        let lock = self.lock_manager.read_lock(&req.locator().canonical()).await?;

        match self.backend.internal_create(req).await {
            Ok(channel) => {
                let expected = req.expected_size.unwrap_or(DataInfo::UNKNOWN_SIZE);
                let metrics = self.metrics.new_metrics(Operation::Write, expected);
                debug!("create {}", req.locator());
                Ok(Box::new(MeteredOutputChannel::new(channel, lock, metrics)))
            }
            Err(e) => {
                release_lock(Some(lock)).await;
                Err(e)
            }
        }
    }

    pub async fn delete(&self, info: &DataInfo) -> FsResult<()> {
        self.check_scheme(&info.locator)?;
        let _metrics = self.metrics.new_metrics(Operation::Delete, info.size);
        self.backend.internal_delete(info).await
    }

    /// Lists without locking.
    ///
    /// The returned stream is lazy: backend failures show up while iterating. Filtering
    /// and sorting run here only when the backend does not do them itself; offset and
    /// limit always apply. With `keep == false` each item is deleted as it is pulled and
    /// a failed deletion is yielded as an error in place of that item.
    pub fn list(&self, query: DataInfoQuery) -> FsResult<DataInfoStream> {
        self.check_scheme(&query.locator)?;
        let _metrics = self.metrics.new_metrics(Operation::List, DataInfo::UNKNOWN_SIZE);

        let filter = query.has_predicate() && !self.backend.supports_predicate(&query);
        let sort = query.has_order() && !self.backend.supports_sort(&query);
        let query = Arc::new(query);

        let backend = self.backend.clone();
        let source = query.clone();
        let mut items: DataInfoStream = stream::once(async move {
            match backend.internal_list(&source).await {
                Ok(v) => v,
                Err(e) => stream::once(future::ready(Err(e))).boxed(),
            }
        })
        .flatten()
        .boxed();

        if filter {
            let predicate = query.clone();
            items = items
                .filter(move |v| {
                    future::ready(match v {
                        Ok(info) => predicate.matches(info),
                        Err(_) => true,
                    })
                })
                .boxed();
        }

        if sort {
            let order = query.clone();
            let unsorted = items;
            items = stream::once(async move {
                match unsorted.try_collect::<Vec<DataInfo>>().await {
                    Ok(mut all) => {
                        all.sort_by(|a, b| order.compare(a, b));
                        stream::iter(all.into_iter().map(Ok)).boxed()
                    }
                    Err(e) => stream::once(future::ready(Err(e))).boxed(),
                }
            })
            .flatten()
            .boxed();
        }

        items = items.skip(query.offset).take(query.limit).boxed();

        if !query.keep {
            let backend = self.backend.clone();
            let metrics = self.metrics.clone();
            items = items
                .then(move |item| {
                    let backend = backend.clone();
                    let metrics = metrics.clone();
                    async move {
                        let info = item?;
                        let _metrics = metrics.new_metrics(Operation::Delete, info.size);
                        match backend.internal_delete(&info).await {
                            Ok(()) => Ok(info),
                            Err(e) => {
                                warn!("failed to delete listed {}: {}", info.locator, e);
                                Err(e)
                            }
                        }
                    }
                })
                .boxed();
        }

        Ok(items)
    }

    pub async fn close(&self) -> FsResult<()> {
        self.backend.close().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lock::MemoryLockManager;
    use async_trait::async_trait;
    use ferry_common::error::{ErrorKind, FsError};
    use ferry_common::state::{DataField, DataType, OrderKey};
    use ferry_ufs::file::FileBackend;
    use std::io::Cursor;
    use std::sync::Mutex;
    use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};

    fn file_system(locks: Arc<MemoryLockManager>) -> DataSystem {
        DataSystem::new(
            Arc::new(FileBackend::new()),
            locks,
            Arc::new(DataMetrics::new().unwrap()),
            BufferConf::default(),
        )
    }

    fn locator(path: &std::path::Path) -> ResourceLocator {
        ResourceLocator::parse(&format!("file://{}", path.display())).unwrap()
    }

    #[tokio::test]
    async fn write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let locks = Arc::new(MemoryLockManager::new());
        let ds = file_system(locks.clone());
        let target = locator(&dir.path().join("a.txt"));

        let mut out = ds
            .create(&WriteDataRequest::new(target.clone()).with_expected_size(5))
            .await
            .unwrap();
        assert_eq!(locks.holders(&target.canonical()), 1);
        out.output().write_all(b"hello").await.unwrap();
        out.close().await.unwrap();
        assert!(locks.is_empty());

        let mut input = ds.open(&ReadDataRequest::new(target)).await.unwrap();
        assert_eq!(input.info().size, 5);
        let mut buf = vec![];
        input.input().read_to_end(&mut buf).await.unwrap();
        input.close().await.unwrap();
        assert_eq!(buf, b"hello");
        assert_eq!(ds.metrics().bytes(Operation::Read), 5);
        assert_eq!(ds.metrics().bytes(Operation::Write), 5);
    }

    #[tokio::test]
    async fn failed_open_releases_lock() {
        let dir = tempfile::tempdir().unwrap();
        let locks = Arc::new(MemoryLockManager::new());
        let ds = file_system(locks.clone());

        let missing = locator(&dir.path().join("missing"));
        let err = ds.open(&ReadDataRequest::new(missing)).await.err().unwrap();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(locks.is_empty());
        assert_eq!(ds.metrics().inflight(Operation::Read), 0);
    }

    #[tokio::test]
    async fn write_lock_blocks_open() {
        let dir = tempfile::tempdir().unwrap();
        let locks = Arc::new(MemoryLockManager::new());
        let ds = file_system(locks.clone());
        let target = locator(&dir.path().join("b"));
        tokio::fs::write(dir.path().join("b"), b"x").await.unwrap();

        let held = locks.write_lock(&target.canonical()).await.unwrap();
        let err = ds.open(&ReadDataRequest::new(target.clone())).await.err().unwrap();
        assert_eq!(err.kind(), ErrorKind::LockConflict);

        held.release().await.unwrap();
        let mut input = ds.open(&ReadDataRequest::new(target)).await.unwrap();
        input.close().await.unwrap();
    }

    #[tokio::test]
    async fn scheme_mismatch() {
        let ds = file_system(Arc::new(MemoryLockManager::new()));
        let hdfs = ResourceLocator::parse("hdfs://nn:8020/a").unwrap();
        let err = ds.open(&ReadDataRequest::new(hdfs)).await.err().unwrap();
        assert_eq!(err.kind(), ErrorKind::Internal);
        assert_eq!(
            err,
            FsError::Common("not supported scheme: hdfs by the file data system".to_string())
        );
    }

    #[tokio::test]
    async fn list_filter_sort_page() {
        let dir = tempfile::tempdir().unwrap();
        for (name, size) in [("a.log", 3), ("b.log", 1), ("c.txt", 2), ("d.log", 4)] {
            tokio::fs::write(dir.path().join(name), vec![0u8; size])
                .await
                .unwrap();
        }
        tokio::fs::create_dir(dir.path().join("sub.log")).await.unwrap();

        let ds = file_system(Arc::new(MemoryLockManager::new()));
        let query = DataInfoQuery::new(locator(dir.path()))
            .with_name("*.log")
            .unwrap()
            .with_type(DataType::File)
            .with_order(OrderKey::desc(DataField::Size))
            .with_offset(1)
            .with_limit(2);

        let items: Vec<DataInfo> = ds.list(query).unwrap().try_collect().await.unwrap();
        let names: Vec<&str> = items.iter().map(|v| v.name()).collect();
        assert_eq!(names, vec!["a.log", "b.log"]);
    }

    #[tokio::test]
    async fn list_errors_are_lazy() {
        let dir = tempfile::tempdir().unwrap();
        let ds = file_system(Arc::new(MemoryLockManager::new()));
        let query = DataInfoQuery::new(locator(&dir.path().join("nothing")));

        let mut items = ds.list(query).unwrap();
        assert!(items.next().await.unwrap().is_err());
        assert!(items.next().await.is_none());
    }

    struct FixedBackend {
        items: Vec<DataInfo>,
        deleted: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Backend for FixedBackend {
        fn protocol(&self) -> Protocol {
            Protocol::Ftp
        }

        async fn internal_open(&self, _req: &ReadDataRequest) -> FsResult<Box<dyn InputChannel>> {
            Err(FsError::unsupported("open"))
        }

        async fn internal_create(
            &self,
            _req: &WriteDataRequest,
        ) -> FsResult<Box<dyn OutputChannel>> {
            Err(FsError::unsupported("create"))
        }

        async fn internal_delete(&self, info: &DataInfo) -> FsResult<()> {
            if info.name() == "locked" {
                return Err(FsError::io("permission denied"));
            }
            self.deleted.lock().unwrap().push(info.name().to_string());
            Ok(())
        }

        async fn internal_list(&self, _query: &DataInfoQuery) -> FsResult<DataInfoStream> {
            Ok(stream::iter(self.items.clone().into_iter().map(Ok)).boxed())
        }
    }

    #[tokio::test]
    async fn list_without_keep_deletes() {
        let items = ["x", "locked", "y"]
            .iter()
            .map(|name| {
                let locator = ResourceLocator::parse(&format!("ftp://host/in/{}", name)).unwrap();
                DataInfo::new(locator, DataType::File, 1, 0)
            })
            .collect();
        let backend = Arc::new(FixedBackend {
            items,
            deleted: Mutex::new(vec![]),
        });
        let ds = DataSystem::new(
            backend.clone(),
            Arc::new(MemoryLockManager::new()),
            Arc::new(DataMetrics::new().unwrap()),
            BufferConf::default(),
        );

        let query = DataInfoQuery::new(ResourceLocator::parse("ftp://host/in/").unwrap())
            .with_keep(false);
        let results: Vec<FsResult<DataInfo>> = ds.list(query).unwrap().collect().await;

        assert_eq!(results.len(), 3);
        assert_eq!(results[0].as_ref().unwrap().name(), "x");
        assert_eq!(results[1].as_ref().unwrap_err().kind(), ErrorKind::Io);
        assert_eq!(results[2].as_ref().unwrap().name(), "y");
        assert_eq!(*backend.deleted.lock().unwrap(), vec!["x", "y"]);
        assert_eq!(ds.metrics().operations(Operation::Delete), 3);
    }

    struct BodyInput {
        info: DataInfo,
        data: Cursor<Vec<u8>>,
    }

    #[async_trait]
    impl InputChannel for BodyInput {
        fn info(&self) -> &DataInfo {
            &self.info
        }

        fn input(&mut self) -> &mut (dyn AsyncRead + Unpin + Send) {
            &mut self.data
        }

        async fn close(&mut self) -> FsResult<()> {
            Ok(())
        }
    }

    // Serves request bodies whose length is not known up front.
    struct BodyBackend;

    #[async_trait]
    impl Backend for BodyBackend {
        fn protocol(&self) -> Protocol {
            Protocol::Http
        }

        async fn internal_open(&self, req: &ReadDataRequest) -> FsResult<Box<dyn InputChannel>> {
            let info =
                DataInfo::new(req.locator.clone(), DataType::File, DataInfo::UNKNOWN_SIZE, 0);
            Ok(Box::new(BodyInput {
                info,
                data: Cursor::new(b"abcdef".to_vec()),
            }))
        }

        async fn internal_create(
            &self,
            _req: &WriteDataRequest,
        ) -> FsResult<Box<dyn OutputChannel>> {
            Err(FsError::unsupported("create"))
        }

        async fn internal_delete(&self, _info: &DataInfo) -> FsResult<()> {
            Err(FsError::unsupported("delete"))
        }

        async fn internal_list(&self, _query: &DataInfoQuery) -> FsResult<DataInfoStream> {
            Err(FsError::unsupported("list"))
        }
    }

    #[tokio::test]
    async fn open_sized_keeps_lock_until_close() {
        let locks = Arc::new(MemoryLockManager::new());
        let ds = DataSystem::new(
            Arc::new(BodyBackend),
            locks.clone(),
            Arc::new(DataMetrics::new().unwrap()),
            BufferConf::default(),
        );
        let target = ResourceLocator::parse("http://upload/in/body").unwrap();

        let mut input = ds.open_sized(&ReadDataRequest::new(target.clone())).await.unwrap();
        assert_eq!(input.info().size, 6);
        assert_eq!(locks.holders(&target.canonical()), 1);
        assert_eq!(ds.metrics().inflight(Operation::Read), 1);

        let mut buf = vec![];
        input.input().read_to_end(&mut buf).await.unwrap();
        assert_eq!(buf, b"abcdef");
        assert_eq!(locks.holders(&target.canonical()), 1);

        input.close().await.unwrap();
        assert!(locks.is_empty());
        assert_eq!(ds.metrics().inflight(Operation::Read), 0);
    }
}
