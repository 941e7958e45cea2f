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

//! Fixtures shared by the integration tests: a scratch directory with a single-mode
//! configuration, an input fed chunk by chunk, and an output that records what happens
//! to it.

use async_trait::async_trait;
use bytes::Bytes;
use ferry_common::conf::FerryConf;
use ferry_common::error::FsError;
use ferry_common::fs::{InputChannel, OutputChannel};
use ferry_common::state::{
    AccessStatus, AccessStatusQuery, DataInfo, DataType, ResourceLocator, WriteDataRequest,
};
use ferry_common::utils::{CommonUtils, Logger};
use ferry_common::FsResult;
use ferry_server::datasystem::DataSystemRegistry;
use ferry_server::task::{AccessTask, AccessTaskExecutor, MemoryTaskLogger, TaskLogger};
use futures::stream::{self, BoxStream, StreamExt};
use std::io;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio_util::io::StreamReader;

/// Scratch directory removed on drop, plus a configuration that needs no coordination
/// service.
pub struct Testing {
    dir: PathBuf,
    conf: FerryConf,
}

impl Default for Testing {
    fn default() -> Self {
        Self::new()
    }
}

impl Testing {
    pub fn new() -> Self {
        Logger::init_default();

        let dir = std::env::temp_dir().join(format!("ferry-test-{}", CommonUtils::uuid()));
        if let Err(e) = std::fs::create_dir_all(&dir) {
            panic!("create {}: {}", dir.display(), e);
        }

        let mut conf = FerryConf::default();
        conf.single_mode = true;
        conf.server_name = "ferry-test".to_string();
        conf.buffer.spill_dir = dir.join("spill").to_string_lossy().to_string();

        Self { dir, conf }
    }

    pub fn conf(&self) -> &FerryConf {
        &self.conf
    }

    pub fn conf_mut(&mut self) -> &mut FerryConf {
        &mut self.conf
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    pub fn locator(&self, name: &str) -> ResourceLocator {
        let uri = format!("file://{}", self.path(name).display());
        ResourceLocator::parse(&uri).unwrap()
    }

    pub fn dir_locator(&self) -> ResourceLocator {
        let uri = format!("file://{}/", self.dir.display());
        ResourceLocator::parse(&uri).unwrap()
    }

    /// Writes `len` bytes of a repeating pattern and returns them.
    pub fn write_file(&self, name: &str, len: usize) -> Vec<u8> {
        let data = pattern(len);
        std::fs::write(self.path(name), &data).unwrap();
        data
    }

    pub fn read_file(&self, name: &str) -> Vec<u8> {
        std::fs::read(self.path(name)).unwrap()
    }

    pub async fn registry(&self) -> DataSystemRegistry {
        DataSystemRegistry::with_conf(self.conf.clone(), None)
            .await
            .unwrap()
    }

    pub fn executor(&self, handler_number: usize) -> AccessTaskExecutor {
        let mut task_conf = self.conf.task.clone();
        task_conf.handler_number = handler_number;
        let logger = Arc::new(MemoryTaskLogger::with_conf(&task_conf));
        AccessTaskExecutor::new(&task_conf, logger)
    }
}

impl Drop for Testing {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.dir);
    }
}

pub fn pattern(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

pub fn locator(uri: &str) -> ResourceLocator {
    ResourceLocator::parse(uri).unwrap()
}

/// Polls `check` until it holds, failing the test after five seconds.
pub async fn wait_until<F: Fn() -> bool>(check: F) {
    for _ in 0..500 {
        if check() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached in time");
}

pub async fn wait_transferred(task: &AccessTask, bytes: i64) {
    wait_until(|| task.transferred() >= bytes).await
}

type ChunkStream = BoxStream<'static, io::Result<Bytes>>;

/// Input channel whose bytes are pushed by the test through a [`ChunkFeeder`].
/// Dropping the feeder ends the stream.
pub struct ChunkInput {
    info: DataInfo,
    reader: StreamReader<ChunkStream, Bytes>,
    closed: Arc<AtomicUsize>,
}

pub struct ChunkFeeder {
    tx: mpsc::UnboundedSender<io::Result<Bytes>>,
}

impl ChunkFeeder {
    pub fn feed(&self, data: &[u8]) {
        let _ = self.tx.send(Ok(Bytes::copy_from_slice(data)));
    }

    pub fn fail(&self, msg: &str) {
        let _ = self.tx.send(Err(io::Error::new(io::ErrorKind::Other, msg.to_string())));
    }
}

impl ChunkInput {
    pub fn new(locator: ResourceLocator, size: i64) -> (Self, ChunkFeeder) {
        let (tx, rx) = mpsc::unbounded_channel();
        let chunks = stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|v| (v, rx))
        })
        .boxed();

        let input = Self {
            info: DataInfo::new(locator, DataType::File, size, 0),
            reader: StreamReader::new(chunks),
            closed: Arc::new(AtomicUsize::new(0)),
        };
        (input, ChunkFeeder { tx })
    }

    /// An input holding `data`, already complete.
    pub fn with_data(locator: ResourceLocator, data: &[u8]) -> Self {
        let (input, feeder) = Self::new(locator, data.len() as i64);
        feeder.feed(data);
        input
    }

    pub fn close_count(&self) -> Arc<AtomicUsize> {
        self.closed.clone()
    }
}

#[async_trait]
impl InputChannel for ChunkInput {
    fn info(&self) -> &DataInfo {
        &self.info
    }

    fn input(&mut self) -> &mut (dyn AsyncRead + Unpin + Send) {
        &mut self.reader
    }

    async fn close(&mut self) -> FsResult<()> {
        self.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// What happened to a [`CaptureOutput`].
#[derive(Default)]
pub struct OutputRecord {
    pub data: Mutex<Vec<u8>>,
    pub closed: AtomicUsize,
    pub recovered: AtomicUsize,
}

impl OutputRecord {
    pub fn data(&self) -> Vec<u8> {
        self.data.lock().unwrap().clone()
    }

    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn recovered(&self) -> usize {
        self.recovered.load(Ordering::SeqCst)
    }
}

/// In-memory output channel; `close` fails when built with [`CaptureOutput::failing_close`].
pub struct CaptureOutput {
    request: WriteDataRequest,
    record: Arc<OutputRecord>,
    close_error: Option<FsError>,
}

impl CaptureOutput {
    pub fn new(locator: ResourceLocator) -> (Self, Arc<OutputRecord>) {
        let record = Arc::new(OutputRecord::default());
        let output = Self {
            request: WriteDataRequest::new(locator),
            record: record.clone(),
            close_error: None,
        };
        (output, record)
    }

    pub fn failing_close(locator: ResourceLocator, error: FsError) -> (Self, Arc<OutputRecord>) {
        let (mut output, record) = Self::new(locator);
        output.close_error = Some(error);
        (output, record)
    }
}

impl AsyncWrite for CaptureOutput {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        self.record.data.lock().unwrap().extend_from_slice(buf);
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

#[async_trait]
impl OutputChannel for CaptureOutput {
    fn request(&self) -> &WriteDataRequest {
        &self.request
    }

    fn output(&mut self) -> &mut (dyn AsyncWrite + Unpin + Send) {
        self
    }

    async fn recover(&mut self) -> FsResult<()> {
        self.record.recovered.fetch_add(1, Ordering::SeqCst);
        self.record.data.lock().unwrap().clear();
        Ok(())
    }

    async fn close(&mut self) -> FsResult<()> {
        self.record.closed.fetch_add(1, Ordering::SeqCst);
        match &self.close_error {
            Some(e) => Err(e.clone()),
            None => Ok(()),
        }
    }
}

/// Task logger keeping every snapshot in arrival order.
#[derive(Default)]
pub struct RecordingLogger {
    snapshots: Mutex<Vec<AccessStatus>>,
}

impl RecordingLogger {
    pub fn snapshots(&self) -> Vec<AccessStatus> {
        self.snapshots.lock().unwrap().clone()
    }
}

#[async_trait]
impl TaskLogger for RecordingLogger {
    async fn add(&self, status: AccessStatus) -> FsResult<()> {
        self.snapshots.lock().unwrap().push(status);
        Ok(())
    }

    async fn find(&self, id: &str) -> FsResult<Option<AccessStatus>> {
        let snapshots = self.snapshots.lock().unwrap();
        Ok(snapshots.iter().rev().find(|v| v.id == id).cloned())
    }

    async fn list(&self, query: &AccessStatusQuery) -> FsResult<Vec<AccessStatus>> {
        let snapshots = self.snapshots.lock().unwrap();
        Ok(snapshots.iter().filter(|v| query.matches(v)).cloned().collect())
    }
}
