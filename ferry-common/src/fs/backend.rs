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

use crate::conf::FerryConf;
use crate::fs::{InputChannel, OutputChannel};
use crate::state::{DataInfo, DataInfoQuery, Protocol, ReadDataRequest, WriteDataRequest};
use crate::FsResult;
use async_trait::async_trait;
use futures::stream::BoxStream;
use std::sync::Arc;

/// Lazy, possibly paged, sequence of listed items.
pub type DataInfoStream = BoxStream<'static, FsResult<DataInfo>>;

/// Protocol adapter behind a data system.
///
/// Adapters only move bytes and metadata; locking, metering, filtering and rollback
/// bookkeeping are layered on top by the data system.
#[async_trait]
pub trait Backend: Send + Sync {
    fn protocol(&self) -> Protocol;

    /// Whether `internal_list` already applies the query predicate.
    fn supports_predicate(&self, _query: &DataInfoQuery) -> bool {
        false
    }

    /// Whether `internal_list` already yields items in query order.
    fn supports_sort(&self, _query: &DataInfoQuery) -> bool {
        false
    }

    async fn internal_open(&self, req: &ReadDataRequest) -> FsResult<Box<dyn InputChannel>>;

    async fn internal_create(&self, req: &WriteDataRequest) -> FsResult<Box<dyn OutputChannel>>;

    async fn internal_delete(&self, info: &DataInfo) -> FsResult<()>;

    async fn internal_list(&self, query: &DataInfoQuery) -> FsResult<DataInfoStream>;

    async fn close(&self) -> FsResult<()> {
        Ok(())
    }
}

pub trait BackendFactory: Send + Sync {
    fn protocol(&self) -> Protocol;

    fn create(&self, conf: &FerryConf) -> FsResult<Arc<dyn Backend>>;
}
