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

use crate::datasystem::{DataMetrics, DataSystem};
use crate::lock::{LockManager, LockManagerFactory, SharedCoordinator};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use ferry_common::conf::FerryConf;
use ferry_common::error::FsError;
use ferry_common::fs::{BackendFactory, DataInfoStream, InputChannel, OutputChannel};
use ferry_common::state::{
    DataInfo, DataInfoQuery, Protocol, ReadDataRequest, ResourceLocator, WriteDataRequest,
};
use ferry_common::FsResult;
use ferry_ufs::file::FileBackendFactory;
use log::{info, warn};
use std::sync::Arc;

/// Per-protocol cache of data systems, created once at startup and shared by reference.
///
/// Instances are created lazily on first use; concurrent first callers get the same one.
pub struct DataSystemRegistry {
    conf: FerryConf,
    lock_manager: Arc<dyn LockManager>,
    metrics: Arc<DataMetrics>,
    factories: DashMap<Protocol, Arc<dyn BackendFactory>>,
    systems: DashMap<Protocol, Arc<DataSystem>>,
}

impl DataSystemRegistry {
    pub fn new(conf: FerryConf, lock_manager: Arc<dyn LockManager>) -> FsResult<Self> {
        let registry = Self {
            conf,
            lock_manager,
            metrics: Arc::new(DataMetrics::new()?),
            factories: DashMap::new(),
            systems: DashMap::new(),
        };
        registry.register(Arc::new(FileBackendFactory));
        Ok(registry)
    }

    /// Builds the lock manager from `conf` first, see [`LockManagerFactory::create`].
    pub async fn with_conf(
        conf: FerryConf,
        coordinator: Option<SharedCoordinator>,
    ) -> FsResult<Self> {
        let lock_manager = LockManagerFactory::create(&conf, coordinator).await?;
        Self::new(conf, lock_manager)
    }

    /// Adds or replaces the backend of a protocol. An instance already created for the
    /// protocol is kept.
    pub fn register(&self, factory: Arc<dyn BackendFactory>) {
        let protocol = factory.protocol();
        if self.factories.insert(protocol, factory).is_some() {
            warn!("backend factory of {} replaced", protocol);
        }
    }

    pub fn metrics(&self) -> &DataMetrics {
        &self.metrics
    }

    pub fn lock_manager(&self) -> &Arc<dyn LockManager> {
        &self.lock_manager
    }

    pub fn len(&self) -> usize {
        self.systems.len()
    }

    pub fn is_empty(&self) -> bool {
        self.systems.is_empty()
    }

    pub fn get_instance(&self, protocol: Protocol) -> FsResult<Arc<DataSystem>> {
        let cached = self.systems.get(&protocol).map(|v| v.value().clone());
        if let Some(ds) = cached {
            return Ok(ds);
        }

        let factory = match self.factories.get(&protocol) {
            Some(v) => v.value().clone(),
            None => {
                return Err(FsError::unsupported(format!(
                    "no backend registered for {}",
                    protocol
                )))
            }
        };

        match self.systems.entry(protocol) {
            Entry::Occupied(e) => Ok(e.get().clone()),
            Entry::Vacant(e) => {
                let backend = factory.create(&self.conf)?;
                let ds = Arc::new(DataSystem::new(
                    backend,
                    self.lock_manager.clone(),
                    self.metrics.clone(),
                    self.conf.buffer.clone(),
                ));
                e.insert(ds.clone());
                info!("data system of {} created", protocol);
                Ok(ds)
            }
        }
    }

    pub fn get(&self, locator: &ResourceLocator) -> FsResult<Arc<DataSystem>> {
        self.get_instance(locator.protocol())
    }

    pub async fn open(&self, req: &ReadDataRequest) -> FsResult<Box<dyn InputChannel>> {
        self.get(req.locator())?.open(req).await
    }

    pub async fn create(&self, req: &WriteDataRequest) -> FsResult<Box<dyn OutputChannel>> {
        self.get(req.locator())?.create(req).await
    }

    pub async fn delete(&self, info: &DataInfo) -> FsResult<()> {
        self.get(&info.locator)?.delete(info).await
    }

    pub fn list(&self, query: DataInfoQuery) -> FsResult<DataInfoStream> {
        self.get(&query.locator)?.list(query)
    }

    /// Closes and forgets every created instance; failures are logged.
    pub async fn close_all(&self) {
        let systems: Vec<Arc<DataSystem>> =
            self.systems.iter().map(|v| v.value().clone()).collect();
        self.systems.clear();

        for ds in systems {
            match ds.close().await {
                Ok(()) => info!("data system of {} closed", ds.protocol()),
                Err(e) => warn!("failed to close data system of {}: {}", ds.protocol(), e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lock::EmptyLockManager;
    use ferry_common::error::ErrorKind;
    use ferry_common::fs::Backend;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingFactory {
        created: AtomicUsize,
    }

    impl BackendFactory for CountingFactory {
        fn protocol(&self) -> Protocol {
            Protocol::File
        }

        fn create(&self, conf: &FerryConf) -> FsResult<Arc<dyn Backend>> {
            self.created.fetch_add(1, Ordering::SeqCst);
            FileBackendFactory.create(conf)
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_first_use_creates_once() {
        let registry = Arc::new(
            DataSystemRegistry::new(FerryConf::default(), Arc::new(EmptyLockManager)).unwrap(),
        );
        let factory = Arc::new(CountingFactory {
            created: AtomicUsize::new(0),
        });
        registry.register(factory.clone());

        let mut handles = vec![];
        for _ in 0..16 {
            let registry = registry.clone();
            handles.push(tokio::spawn(async move {
                registry.get_instance(Protocol::File).unwrap()
            }));
        }

        let mut all = vec![];
        for h in handles {
            all.push(h.await.unwrap());
        }
        assert!(all.iter().all(|v| Arc::ptr_eq(v, &all[0])));
        assert_eq!(factory.created.load(Ordering::SeqCst), 1);
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn unregistered_protocol() {
        let registry =
            DataSystemRegistry::new(FerryConf::default(), Arc::new(EmptyLockManager)).unwrap();
        let err = registry.get_instance(Protocol::Smb).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::Unsupported);
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn close_all_forgets_instances() {
        let registry =
            DataSystemRegistry::new(FerryConf::default(), Arc::new(EmptyLockManager)).unwrap();
        let first = registry.get_instance(Protocol::File).unwrap();
        registry.close_all().await;
        assert!(registry.is_empty());

        let second = registry.get_instance(Protocol::File).unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
    }

    #[tokio::test]
    async fn single_mode_conf() {
        let mut conf = FerryConf::default();
        conf.single_mode = true;
        let registry = DataSystemRegistry::with_conf(conf, None).await.unwrap();
        let _w = registry.lock_manager().write_lock("k").await.unwrap();
        assert!(registry.lock_manager().try_read_lock("k").await.unwrap().is_none());
    }
}
