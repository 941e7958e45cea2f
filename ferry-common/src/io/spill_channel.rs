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

use crate::fs::InputChannel;
use crate::io::{SpillBuffer, SpillReader};
use crate::state::DataInfo;
use crate::FsResult;
use async_trait::async_trait;
use log::{debug, warn};
use tokio::io::{AsyncRead, AsyncReadExt};

/// Input channel replaying a source whose size was unknown, after draining it through a
/// [`SpillBuffer`]. `info().size` is the real byte count.
///
/// The drained source stays open, together with any lock it holds, until this channel
/// is closed.
pub struct SpillInputChannel {
    info: DataInfo,
    reader: SpillReader,
    source: Box<dyn InputChannel>,
}

impl SpillInputChannel {
    const CHUNK_SIZE: usize = 64 * 1024;

    /// Reads `source` to the end into `buffer`. On failure the source is closed before
    /// the error is returned.
    pub async fn drain(
        mut source: Box<dyn InputChannel>,
        mut buffer: SpillBuffer,
    ) -> FsResult<Self> {
        if let Err(e) = Self::copy(source.as_mut(), &mut buffer).await {
            Self::discard(source.as_mut()).await;
            return Err(e);
        }

        let mut info = source.info().clone();
        info.size = buffer.size() as i64;
        debug!(
            "drained {} bytes of {}, in memory: {}",
            info.size,
            info.locator,
            buffer.is_in_memory()
        );

        let reader = match buffer.into_reader().await {
            Ok(v) => v,
            Err(e) => {
                Self::discard(source.as_mut()).await;
                return Err(e);
            }
        };

        Ok(Self {
            info,
            reader,
            source,
        })
    }

    async fn discard(source: &mut dyn InputChannel) {
        if let Err(e) = source.close().await {
            warn!("close source {} after failed drain: {}", source.info().locator, e);
        }
    }

    async fn copy(source: &mut dyn InputChannel, buffer: &mut SpillBuffer) -> FsResult<()> {
        let mut chunk = vec![0u8; Self::CHUNK_SIZE];
        let writer = buffer.writer()?;
        loop {
            let n = source.input().read(&mut chunk).await?;
            if n == 0 {
                break;
            }
            writer.write(&chunk[..n]).await?;
        }
        writer.close().await
    }
}

#[async_trait]
impl InputChannel for SpillInputChannel {
    fn info(&self) -> &DataInfo {
        &self.info
    }

    fn input(&mut self) -> &mut (dyn AsyncRead + Unpin + Send) {
        &mut self.reader
    }

    async fn close(&mut self) -> FsResult<()> {
        self.source.close().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::FileSpillStore;
    use crate::state::{DataType, ResourceLocator};
    use std::io::Cursor;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct UnsizedInput {
        info: DataInfo,
        data: Cursor<Vec<u8>>,
        closed: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl InputChannel for UnsizedInput {
        fn info(&self) -> &DataInfo {
            &self.info
        }

        fn input(&mut self) -> &mut (dyn AsyncRead + Unpin + Send) {
            &mut self.data
        }

        async fn close(&mut self) -> FsResult<()> {
            self.closed.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn drain_unknown_size() {
        let locator = ResourceLocator::parse("http://upload/in/body").unwrap();
        let data: Vec<u8> = (0..300_000u32).map(|v| v as u8).collect();
        let closed = Arc::new(AtomicUsize::new(0));
        let source = UnsizedInput {
            info: DataInfo::new(locator, DataType::File, DataInfo::UNKNOWN_SIZE, 0),
            data: Cursor::new(data.clone()),
            closed: closed.clone(),
        };

        let store = Arc::new(FileSpillStore::new(std::env::temp_dir()));
        let buffer = SpillBuffer::new(100_000, 4096, store).unwrap();
        let mut channel = SpillInputChannel::drain(Box::new(source), buffer)
            .await
            .unwrap();
        assert_eq!(channel.info().size, 300_000);

        let mut out = vec![];
        channel.input().read_to_end(&mut out).await.unwrap();
        assert_eq!(out, data);
        assert_eq!(closed.load(Ordering::SeqCst), 0);

        channel.close().await.unwrap();
        assert_eq!(closed.load(Ordering::SeqCst), 1);
    }
}
