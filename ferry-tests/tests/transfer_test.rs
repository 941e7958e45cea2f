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

use ferry_common::error::{ErrorKind, FsError};
use ferry_common::state::{AccessStatusQuery, ReadDataRequest, TaskState, WriteDataRequest};
use ferry_server::task::{AccessTaskExecutor, AccessTaskRequest};
use ferry_tests::{
    locator, pattern, wait_transferred, wait_until, CaptureOutput, ChunkInput, RecordingLogger,
    Testing,
};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

const FIVE_MIB: usize = 5 * 1024 * 1024;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn copy_file_to_file() {
    let testing = Testing::new();
    let source = testing.write_file("source.bin", FIVE_MIB);
    let registry = testing.registry().await;
    let executor = testing.executor(10);

    let input = registry
        .open(&ReadDataRequest::new(testing.locator("source.bin")))
        .await
        .unwrap();
    let output = registry
        .create(&WriteDataRequest::new(testing.locator("target.bin")))
        .await
        .unwrap();

    let req = AccessTaskRequest::new(input, output)
        .with_server_name("s1")
        .with_client_name("c1");
    let task = executor.submit(req).await;
    task.wait_completion().await.unwrap();

    let status = task.status();
    assert_eq!(status.state, TaskState::Succeed);
    assert_eq!(status.progress, 1.0);
    assert_eq!(status.expected_size, 5242880);
    assert_eq!(status.transferred_size, 5242880);
    assert_eq!(status.redirect_from, "s1");
    assert_eq!(testing.read_file("target.bin"), source);

    // Both locks are gone once the task is finalized.
    let lock_manager = registry.lock_manager();
    for name in ["source.bin", "target.bin"] {
        let key = testing.locator(name).canonical();
        assert!(lock_manager.try_write_lock(&key).await.unwrap().is_some());
    }

    let logged = executor.logger().find(task.id()).await.unwrap().unwrap();
    assert_eq!(logged.state, TaskState::Succeed);
    assert!(executor.find(task.id()).is_none());
    assert_eq!(executor.available_permits(), 10);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn checkpoints_follow_transfer_order() {
    let testing = Testing::new();
    let mut task_conf = testing.conf().task.clone();
    task_conf.buffer_size = 1024;
    let logger = Arc::new(RecordingLogger::default());
    let executor = AccessTaskExecutor::new(&task_conf, logger.clone());

    // Chunks smaller than the buffer, so checkpoints come from accumulated bytes.
    let data = pattern(10 * 1024 + 100);
    let (input, feeder) = ChunkInput::new(locator("ftp://host/in/big"), data.len() as i64);
    for chunk in data.chunks(300) {
        feeder.feed(chunk);
    }
    drop(feeder);
    let (output, record) = CaptureOutput::new(locator("file:///out/big"));

    let req = AccessTaskRequest::new(Box::new(input), Box::new(output));
    let task = executor.submit(req).await;
    task.wait_completion().await.unwrap();
    assert_eq!(record.data(), data);

    let snapshots = logger.snapshots();
    let (last, checkpoints) = snapshots.split_last().unwrap();
    assert_eq!(last.state, TaskState::Succeed);
    assert_eq!(last.transferred_size, data.len() as i64);

    assert_eq!(checkpoints.len(), 10);
    for (i, status) in checkpoints.iter().enumerate() {
        assert_eq!(status.id, task.id());
        assert_eq!(status.state, TaskState::Running);
        assert!(status.transferred_size >= (i as i64 + 1) * 1024);
    }
    for pair in snapshots.windows(2) {
        assert!(pair[0].transferred_size <= pair[1].transferred_size);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn overflow_is_rejected_as_failed() {
    let testing = Testing::new();
    let executor = testing.executor(2);

    let mut feeders = vec![];
    let mut tasks = vec![];
    for i in 0..4 {
        let (input, feeder) = ChunkInput::new(locator(&format!("ftp://host/in/{}", i)), 3);
        let (output, _) = CaptureOutput::new(locator(&format!("file:///out/{}", i)));
        feeders.push(feeder);
        let req = AccessTaskRequest::new(Box::new(input), Box::new(output));
        tasks.push(executor.submit(req).await);
    }

    for task in &tasks[2..] {
        assert_eq!(task.state(), TaskState::Failed);
        assert!(executor.find(task.id()).is_none());
        let err = task.wait_completion().await.unwrap_err();
        assert_eq!(err, FsError::task(AccessTaskExecutor::NO_WORKER));
    }

    for task in &tasks[..2] {
        assert!(executor.find(task.id()).is_some());
    }
    for feeder in &feeders[..2] {
        feeder.feed(b"abc");
    }
    drop(feeders);

    for task in &tasks[..2] {
        task.wait_completion().await.unwrap();
        assert_eq!(task.state(), TaskState::Succeed);
        assert_eq!(task.status().progress, 1.0);
    }
    assert_eq!(executor.running(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn submit_waits_up_to_timeout() {
    let testing = Testing::new();
    let executor = testing.executor(1);

    let (input, feeder) = ChunkInput::new(locator("ftp://host/in/a"), 1);
    let (output, _) = CaptureOutput::new(locator("file:///out/a"));
    let first = executor
        .submit(AccessTaskRequest::new(Box::new(input), Box::new(output)))
        .await;

    let (input, _feeder) = ChunkInput::new(locator("ftp://host/in/b"), 1);
    let (output, record) = CaptureOutput::new(locator("file:///out/b"));
    let rejected = executor
        .submit_with_timeout(
            AccessTaskRequest::new(Box::new(input), Box::new(output)),
            Duration::from_millis(50),
        )
        .await;
    assert_eq!(rejected.state(), TaskState::Failed);
    assert_eq!(record.recovered(), 1);

    feeder.feed(b"x");
    drop(feeder);
    first.wait_completion().await.unwrap();

    let (input, feeder) = ChunkInput::new(locator("ftp://host/in/c"), 1);
    let (output, _) = CaptureOutput::new(locator("file:///out/c"));
    feeder.feed(b"y");
    drop(feeder);
    let admitted = executor
        .submit_with_timeout(
            AccessTaskRequest::new(Box::new(input), Box::new(output)),
            Duration::from_secs(5),
        )
        .await;
    admitted.wait_completion().await.unwrap();
    assert_eq!(admitted.state(), TaskState::Succeed);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn abort_running_task() {
    let testing = Testing::new();
    let executor = testing.executor(2);

    let (input, feeder) = ChunkInput::new(locator("ftp://host/in/big"), 1000);
    let (output, record) = CaptureOutput::new(locator("file:///out/big"));
    let task = executor
        .submit(AccessTaskRequest::new(Box::new(input), Box::new(output)))
        .await;

    feeder.feed(&pattern(100));
    wait_transferred(&task, 100).await;
    assert_eq!(task.state(), TaskState::Running);

    let aborting = task.clone();
    let handle = tokio::spawn(async move { aborting.abort().await });
    wait_until(|| task.is_abort()).await;

    // The copy loop notices the flag after the next chunk.
    feeder.feed(&pattern(100));
    handle.await.unwrap().unwrap();

    assert_eq!(task.state(), TaskState::Abort);
    assert_eq!(task.transferred(), 200);
    assert_eq!(record.closed(), 1);
    assert_eq!(record.recovered(), 1);
    assert!(task.wait_completion().await.is_ok());
    assert!(executor.find(task.id()).is_none());
}

#[tokio::test]
async fn close_failure_recovers_once() {
    let testing = Testing::new();
    let executor = testing.executor(2);

    let input = ChunkInput::with_data(locator("ftp://host/in/a"), &pattern(10));
    let closed = input.close_count();
    let (output, record) =
        CaptureOutput::failing_close(locator("file:///out/a"), FsError::io("disk quota exceeded"));
    let task = executor
        .submit(AccessTaskRequest::new(Box::new(input), Box::new(output)))
        .await;

    let err = task.wait_completion().await.unwrap_err();
    assert_eq!(err, FsError::io("disk quota exceeded"));
    assert_eq!(task.state(), TaskState::Failed);
    assert_eq!(record.recovered(), 1);
    assert_eq!(closed.load(Ordering::SeqCst), 1);

    // A second wait sees the same failure.
    assert_eq!(task.wait_completion().await.unwrap_err().kind(), ErrorKind::Io);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn read_failure_rolls_back() {
    let testing = Testing::new();
    let executor = testing.executor(2);

    let (input, feeder) = ChunkInput::new(locator("ftp://host/in/a"), 100);
    let (output, record) = CaptureOutput::new(locator("file:///out/a"));
    let task = executor
        .submit(AccessTaskRequest::new(Box::new(input), Box::new(output)))
        .await;

    feeder.feed(&pattern(10));
    feeder.fail("connection reset");

    let err = task.wait_completion().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Io);
    assert_eq!(task.state(), TaskState::Failed);
    assert_eq!(record.recovered(), 1);
    assert!(record.data().is_empty());

    let query = AccessStatusQuery {
        state: Some(TaskState::Failed),
        ..Default::default()
    };
    let failed = executor.logger().list(&query).await.unwrap();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].transferred_size, 10);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn close_stops_workers() {
    let testing = Testing::new();
    let executor = testing.executor(2);

    let (input, _feeder) = ChunkInput::new(locator("ftp://host/in/a"), 100);
    let (output, record) = CaptureOutput::new(locator("file:///out/a"));
    let task = executor
        .submit(AccessTaskRequest::new(Box::new(input), Box::new(output)))
        .await;
    wait_until(|| task.state() == TaskState::Running).await;

    executor.close().await;
    assert_eq!(task.state(), TaskState::Failed);
    assert_eq!(task.wait_completion().await.unwrap_err().kind(), ErrorKind::Task);
    assert_eq!(record.recovered(), 1);

    let (input, _feeder) = ChunkInput::new(locator("ftp://host/in/b"), 1);
    let (output, _) = CaptureOutput::new(locator("file:///out/b"));
    let late = executor
        .submit(AccessTaskRequest::new(Box::new(input), Box::new(output)))
        .await;
    assert_eq!(late.state(), TaskState::Failed);
}
