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

use ferry_common::conf::FerryConf;
use ferry_common::error::ErrorKind;
use ferry_server::lock::{
    Coordinator, CoordinatorRegistry, LockManager, LockManagerFactory, MemoryCoordinator,
};
use std::sync::Arc;

async fn managers() -> (Vec<Arc<dyn LockManager>>, Arc<MemoryCoordinator>, CoordinatorRegistry) {
    let coord = Arc::new(MemoryCoordinator::new());
    let registry = CoordinatorRegistry::new();

    let mut single = FerryConf::default();
    single.single_mode = true;
    let mut list = vec![LockManagerFactory::create(&single, None).await.unwrap()];

    let client: Arc<dyn Coordinator> = coord.clone();
    let handle = registry
        .acquire("memory".to_string(), move || Ok(client), |c| c.close())
        .unwrap();
    list.push(
        LockManagerFactory::create(&FerryConf::default(), Some(handle))
            .await
            .unwrap(),
    );
    (list, coord, registry)
}

#[tokio::test]
async fn readers_share_and_exclude_writers() {
    let (list, _coord, _registry) = managers().await;
    let memory = &list[0];

    let r1 = memory.try_read_lock("file:///k").await.unwrap().unwrap();
    let r2 = memory.try_read_lock("file:///k").await.unwrap().unwrap();
    assert!(memory.try_write_lock("file:///k").await.unwrap().is_none());

    r1.release().await.unwrap();
    assert!(memory.try_write_lock("file:///k").await.unwrap().is_none());
    r2.release().await.unwrap();
    assert!(memory.try_write_lock("file:///k").await.unwrap().is_some());
}

#[tokio::test]
async fn one_writer_at_a_time() {
    let (list, _coord, _registry) = managers().await;
    for manager in &list {
        let w1 = manager.try_write_lock("file:///w").await.unwrap().unwrap();
        assert!(manager.try_write_lock("file:///w").await.unwrap().is_none());
        let err = manager.write_lock("file:///w").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::LockConflict);
        assert_eq!(err.to_string(), "Write-Write Conflict on file:///w");

        w1.release().await.unwrap();
        let w2 = manager.try_write_lock("file:///w").await.unwrap();
        assert!(w2.is_some());
    }
}

#[tokio::test]
async fn dropped_lock_is_released() {
    let (list, coord, _registry) = managers().await;
    for manager in &list {
        drop(manager.write_lock("file:///d").await.unwrap());
    }

    // The coordinated release runs on a spawned task.
    for _ in 0..100 {
        if coord.children("/ferry/lock").await.unwrap().is_empty() {
            break;
        }
        tokio::task::yield_now().await;
    }
    for manager in &list {
        assert!(manager.try_write_lock("file:///d").await.unwrap().is_some());
    }
}

#[tokio::test]
async fn coordination_outage_is_reported() {
    let (list, coord, _registry) = managers().await;
    coord.set_available(false);
    let err = list[1].try_read_lock("file:///o").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Coordination);
    assert_eq!(err.status_code(), 503);

    coord.set_available(true);
    assert!(list[1].try_read_lock("file:///o").await.unwrap().is_some());
}
