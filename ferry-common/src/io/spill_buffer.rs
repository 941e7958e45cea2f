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

use crate::conf::BufferConf;
use crate::error::FsError;
use crate::io::{BoxReader, BoxWriter, FileSpillStore, SpillStore};
use crate::{err_box, FsResult};
use bytes::{Bytes, BytesMut};
use log::debug;
use std::io::Cursor;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, AsyncWriteExt, ReadBuf};

enum WriteState {
    // Accepting writes in memory.
    Memory(BytesMut),
    // Output closed while still in memory.
    Sealed(Bytes),
    Spilled(BoxWriter),
    SpilledClosed,
    // Moving to or finalizing the backing store failed; nothing more can be read or written.
    Failed,
}

/// Write side of a [`SpillBuffer`].
pub struct SpillWriter {
    limit: usize,
    store: Option<Arc<dyn SpillStore>>,
    state: WriteState,
    size: u64,
}

impl SpillWriter {
    pub async fn write(&mut self, buf: &[u8]) -> FsResult<()> {
        if buf.is_empty() {
            return Ok(());
        }

        match &mut self.state {
            WriteState::Memory(mem) => {
                if self.size + buf.len() as u64 <= self.limit as u64 {
                    mem.extend_from_slice(buf);
                    self.size += buf.len() as u64;
                    return Ok(());
                }
                self.spill().await?;
            }
            WriteState::Sealed(_) | WriteState::SpilledClosed => {
                return Err(FsError::io("spill buffer output is closed"))
            }
            WriteState::Failed => return Err(Self::failed()),
            WriteState::Spilled(_) => (),
        }

        if let WriteState::Spilled(writer) = &mut self.state {
            writer.write_all(buf).await?;
            self.size += buf.len() as u64;
        }
        Ok(())
    }

    fn failed() -> FsError {
        FsError::io("spill buffer failed to move its data to the backing store")
    }

    // Moves the buffered bytes to a fresh backing writer. Runs at most once: a failed
    // attempt leaves the buffer in the failed state.
    async fn spill(&mut self) -> FsResult<()> {
        let store = match &self.store {
            Some(v) => v.clone(),
            None => {
                return err_box!(
                    "spill buffer limit {} exceeded and no backing store is set",
                    self.limit
                )
            }
        };

        let mem = match std::mem::replace(&mut self.state, WriteState::Failed) {
            WriteState::Memory(mem) => mem,
            state => {
                self.state = state;
                return Ok(());
            }
        };
        let mut writer = store.create_writer().await?;
        writer.write_all(&mem).await?;
        debug!(
            "spill buffer crossed limit {}, moved {} bytes to backing store",
            self.limit, self.size
        );
        self.state = WriteState::Spilled(writer);
        Ok(())
    }

    pub async fn flush(&mut self) -> FsResult<()> {
        if let WriteState::Spilled(writer) = &mut self.state {
            writer.flush().await?;
        }
        Ok(())
    }

    /// Seals the memory or finalizes the backing writer. The output only counts as closed
    /// once finalization succeeded.
    pub async fn close(&mut self) -> FsResult<()> {
        match std::mem::replace(&mut self.state, WriteState::Failed) {
            WriteState::Memory(mem) => self.state = WriteState::Sealed(mem.freeze()),
            WriteState::Spilled(mut writer) => {
                writer.flush().await?;
                writer.shutdown().await?;
                self.state = WriteState::SpilledClosed;
            }
            WriteState::Failed => return Err(Self::failed()),
            closed => self.state = closed,
        }
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        matches!(self.state, WriteState::Sealed(_) | WriteState::SpilledClosed)
    }
}

/// Read side of a [`SpillBuffer`], either over the retained memory or the backing store.
pub enum SpillReader {
    Memory(Cursor<Bytes>),
    Store {
        reader: BoxReader,
        // Keeps the backing data alive while it is being read.
        _store: Arc<dyn SpillStore>,
    },
}

impl AsyncRead for SpillReader {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        match self.get_mut() {
            SpillReader::Memory(cursor) => Pin::new(cursor).poll_read(cx, buf),
            SpillReader::Store { reader, .. } => Pin::new(reader).poll_read(cx, buf),
        }
    }
}

enum ReaderSource {
    Memory(Bytes),
    Store(Arc<dyn SpillStore>),
}

impl ReaderSource {
    async fn open(self) -> FsResult<SpillReader> {
        match self {
            ReaderSource::Memory(bytes) => Ok(SpillReader::Memory(Cursor::new(bytes))),
            ReaderSource::Store(store) => Ok(SpillReader::Store {
                reader: store.open_reader().await?,
                _store: store,
            }),
        }
    }
}

/// Write-once, read-once byte buffer of unknown final size.
///
/// Bytes stay in memory while the total written is at most `limit`. The first write that
/// would cross it moves everything to a backing store created from the injected
/// [`SpillStore`]; the move happens at most once and is never undone. Reading is only
/// possible after the output is closed.
pub struct SpillBuffer {
    writer: SpillWriter,
    writer_opened: bool,
    reader: Option<SpillReader>,
}

impl SpillBuffer {
    /// Fails when `capacity == 0` or `limit < capacity`.
    pub fn new(limit: usize, capacity: usize, store: Arc<dyn SpillStore>) -> FsResult<Self> {
        if limit == 0 || capacity == 0 || limit < capacity {
            return Err(FsError::invalid_argument(format!(
                "invalid spill buffer setting, limit: {}, capacity: {}",
                limit, capacity
            )));
        }
        Ok(Self::build(limit, capacity, Some(store)))
    }

    pub fn with_conf(conf: &BufferConf) -> FsResult<Self> {
        let store = Arc::new(FileSpillStore::new(conf.spill_dir()));
        Self::new(conf.limit, conf.capacity, store)
    }

    /// A buffer that never spills; writes past `usize::MAX` bytes fail.
    pub fn memory(capacity: usize) -> Self {
        Self::build(usize::MAX, capacity, None)
    }

    /// A buffer that goes to the store with its first byte.
    pub fn direct(store: Arc<dyn SpillStore>) -> Self {
        Self::build(0, 0, Some(store))
    }

    fn build(limit: usize, capacity: usize, store: Option<Arc<dyn SpillStore>>) -> Self {
        let writer = SpillWriter {
            limit,
            store,
            state: WriteState::Memory(BytesMut::with_capacity(capacity)),
            size: 0,
        };
        Self {
            writer,
            writer_opened: false,
            reader: None,
        }
    }

    /// The write side; repeated calls return the same writer until it is closed.
    pub fn writer(&mut self) -> FsResult<&mut SpillWriter> {
        if self.writer.is_closed() {
            return Err(FsError::io("spill buffer output is closed"));
        }
        self.writer_opened = true;
        Ok(&mut self.writer)
    }

    /// The read side; requires the writer to be closed. Cached after the first call.
    pub async fn reader(&mut self) -> FsResult<&mut SpillReader> {
        if self.reader.is_none() {
            let source = self.reader_source()?;
            self.reader = Some(source.open().await?);
        }

        match self.reader.as_mut() {
            Some(v) => Ok(v),
            None => err_box!("spill buffer reader is not set"),
        }
    }

    pub async fn into_reader(mut self) -> FsResult<SpillReader> {
        match self.reader.take() {
            Some(v) => Ok(v),
            None => self.reader_source()?.open().await,
        }
    }

    fn reader_source(&self) -> FsResult<ReaderSource> {
        match (&self.writer.state, &self.writer.store) {
            (WriteState::Sealed(bytes), _) => Ok(ReaderSource::Memory(bytes.clone())),
            (WriteState::SpilledClosed, Some(store)) => Ok(ReaderSource::Store(store.clone())),
            (WriteState::Failed, _) => Err(SpillWriter::failed()),
            _ => Err(FsError::io(
                "spill buffer input is not available before the output is closed",
            )),
        }
    }

    /// Total bytes written so far.
    pub fn size(&self) -> u64 {
        self.writer.size
    }

    pub fn is_in_memory(&self) -> bool {
        matches!(
            self.writer.state,
            WriteState::Memory(_) | WriteState::Sealed(_)
        )
    }

    pub fn is_output_opened(&self) -> bool {
        self.writer_opened
    }

    pub fn is_output_closed(&self) -> bool {
        self.writer.is_closed()
    }

    /// The in-memory bytes; fails once the buffer has spilled.
    pub fn buffer(&self) -> FsResult<&[u8]> {
        match &self.writer.state {
            WriteState::Memory(mem) => Ok(&mem[..]),
            WriteState::Sealed(bytes) => Ok(&bytes[..]),
            _ => Err(FsError::unsupported("spill buffer has moved to the backing store")),
        }
    }

    pub fn buffer_offset(&self) -> FsResult<usize> {
        self.buffer().map(|_| 0)
    }

    pub fn buffer_len(&self) -> FsResult<usize> {
        self.buffer().map(|v| v.len())
    }
}
