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

use ferry_common::error::ErrorKind;
use ferry_common::state::{
    DataField, DataInfo, DataInfoQuery, OrderKey, Protocol, ReadDataRequest, WriteDataRequest,
};
use ferry_server::datasystem::Operation;
use ferry_tests::Testing;
use futures::{StreamExt, TryStreamExt};
use std::sync::Arc;
use tokio::io::AsyncWriteExt;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn one_instance_per_protocol() {
    let testing = Testing::new();
    let registry = Arc::new(testing.registry().await);

    let mut handles = vec![];
    for _ in 0..32 {
        let registry = registry.clone();
        handles.push(tokio::spawn(async move {
            registry.get_instance(Protocol::File).unwrap()
        }));
    }
    let first = registry.get_instance(Protocol::File).unwrap();
    for h in handles {
        assert!(Arc::ptr_eq(&h.await.unwrap(), &first));
    }
    assert_eq!(registry.len(), 1);

    let err = registry.get_instance(Protocol::Hbase).err().unwrap();
    assert_eq!(err.kind(), ErrorKind::Unsupported);
}

#[tokio::test]
async fn failed_create_releases_lock() {
    let testing = Testing::new();
    testing.write_file("plain", 4);
    let registry = testing.registry().await;

    // The parent of the target is a regular file, so the tmp file cannot be created.
    let target = testing.locator("plain/child");
    let err = registry
        .create(&WriteDataRequest::new(target.clone()))
        .await
        .err()
        .unwrap();
    assert_ne!(err.kind(), ErrorKind::LockConflict);

    let lock = registry
        .lock_manager()
        .try_write_lock(&target.canonical())
        .await
        .unwrap();
    assert!(lock.is_some());
    assert_eq!(registry.metrics().inflight(Operation::Write), 0);
}

#[tokio::test]
async fn reader_blocks_writer() {
    let testing = Testing::new();
    testing.write_file("a", 8);
    let registry = testing.registry().await;
    let key = testing.locator("a").canonical();

    let mut input = registry
        .open(&ReadDataRequest::new(testing.locator("a")))
        .await
        .unwrap();
    let lock_manager = registry.lock_manager();
    assert!(lock_manager.try_write_lock(&key).await.unwrap().is_none());

    // Another reader and a writer through the registry share the key.
    let mut second = registry
        .open(&ReadDataRequest::new(testing.locator("a")))
        .await
        .unwrap();
    let mut output = registry
        .create(&WriteDataRequest::new(testing.locator("a")))
        .await
        .unwrap();
    output.output().write_all(b"new").await.unwrap();
    output.close().await.unwrap();
    second.close().await.unwrap();

    input.close().await.unwrap();
    input.close().await.unwrap();
    assert!(lock_manager.try_write_lock(&key).await.unwrap().is_some());
    assert_eq!(testing.read_file("a"), b"new");
}

#[tokio::test]
async fn list_pages_and_sorts() {
    let testing = Testing::new();
    for (name, size) in [("a.csv", 30), ("b.csv", 10), ("c.csv", 20), ("notes.md", 5)] {
        testing.write_file(name, size);
    }
    let registry = testing.registry().await;

    let query = DataInfoQuery::new(testing.dir_locator())
        .with_name("*.csv")
        .unwrap()
        .with_order(OrderKey::asc(DataField::Size));
    let items: Vec<DataInfo> = registry.list(query).unwrap().try_collect().await.unwrap();
    let names: Vec<&str> = items.iter().map(|v| v.name()).collect();
    assert_eq!(names, vec!["b.csv", "c.csv", "a.csv"]);

    let query = DataInfoQuery::new(testing.dir_locator())
        .with_order(OrderKey::desc(DataField::Name))
        .with_offset(1)
        .with_limit(2);
    let items: Vec<DataInfo> = registry.list(query).unwrap().try_collect().await.unwrap();
    let names: Vec<&str> = items.iter().map(|v| v.name()).collect();
    assert_eq!(names, vec!["c.csv", "b.csv"]);
}

#[tokio::test]
async fn list_without_keep_consumes_items() {
    let testing = Testing::new();
    for name in ["x1", "x2", "x3"] {
        testing.write_file(name, 3);
    }
    let registry = testing.registry().await;

    let query = DataInfoQuery::new(testing.dir_locator())
        .with_order(OrderKey::asc(DataField::Name))
        .with_limit(2)
        .with_keep(false);
    let mut items = registry.list(query).unwrap();

    // Nothing is deleted before the caller pulls.
    assert!(testing.path("x1").exists());

    let first = items.next().await.unwrap().unwrap();
    assert_eq!(first.name(), "x1");
    assert!(!testing.path("x1").exists());
    let second = items.next().await.unwrap().unwrap();
    assert_eq!(second.name(), "x2");
    assert!(items.next().await.is_none());

    assert!(!testing.path("x2").exists());
    assert!(testing.path("x3").exists());
}
