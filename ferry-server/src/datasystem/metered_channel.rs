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

use crate::datasystem::OperationMetrics;
use crate::lock::Lock;
use async_trait::async_trait;
use ferry_common::fs::{InputChannel, OutputChannel};
use ferry_common::state::{DataInfo, WriteDataRequest};
use ferry_common::FsResult;
use log::warn;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

pub(crate) async fn release_lock(lock: Option<Lock>) {
    if let Some(lock) = lock {
        let key = lock.key().to_string();
        if let Err(e) = lock.release().await {
            warn!("failed to release lock {}: {}", key, e);
        }
    }
}

/// Input channel holding a lock and counting every byte read.
///
/// The first `close` closes the inner channel, then the metrics, then releases the lock;
/// later calls do nothing.
pub struct MeteredInputChannel {
    inner: Box<dyn InputChannel>,
    lock: Option<Lock>,
    metrics: OperationMetrics,
    closed: bool,
}

impl MeteredInputChannel {
    pub fn new(inner: Box<dyn InputChannel>, lock: Lock, metrics: OperationMetrics) -> Self {
        Self {
            inner,
            lock: Some(lock),
            metrics,
            closed: false,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl AsyncRead for MeteredInputChannel {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        let before = buf.filled().len();
        let res = Pin::new(this.inner.input()).poll_read(cx, buf);
        if let Poll::Ready(Ok(())) = res {
            this.metrics.add_bytes(buf.filled().len() - before);
        }
        res
    }
}

#[async_trait]
impl InputChannel for MeteredInputChannel {
    fn info(&self) -> &DataInfo {
        self.inner.info()
    }

    fn input(&mut self) -> &mut (dyn AsyncRead + Unpin + Send) {
        self
    }

    async fn close(&mut self) -> FsResult<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        let res = self.inner.close().await;
        self.metrics.close();
        release_lock(self.lock.take()).await;
        res
    }
}

/// Output channel holding a lock and counting every byte written.
pub struct MeteredOutputChannel {
    inner: Box<dyn OutputChannel>,
    lock: Option<Lock>,
    metrics: OperationMetrics,
    closed: bool,
}

impl MeteredOutputChannel {
    pub fn new(inner: Box<dyn OutputChannel>, lock: Lock, metrics: OperationMetrics) -> Self {
        Self {
            inner,
            lock: Some(lock),
            metrics,
            closed: false,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl AsyncWrite for MeteredOutputChannel {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let this = self.get_mut();
        let res = Pin::new(this.inner.output()).poll_write(cx, buf);
        if let Poll::Ready(Ok(n)) = res {
            this.metrics.add_bytes(n);
        }
        res
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(self.get_mut().inner.output()).poll_flush(cx)
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(self.get_mut().inner.output()).poll_shutdown(cx)
    }
}

#[async_trait]
impl OutputChannel for MeteredOutputChannel {
    fn request(&self) -> &WriteDataRequest {
        self.inner.request()
    }

    fn output(&mut self) -> &mut (dyn AsyncWrite + Unpin + Send) {
        self
    }

    async fn recover(&mut self) -> FsResult<()> {
        self.inner.recover().await
    }

    async fn close(&mut self) -> FsResult<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        let res = self.inner.close().await;
        self.metrics.close();
        release_lock(self.lock.take()).await;
        res
    }
}
