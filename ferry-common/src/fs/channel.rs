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

use crate::state::{DataInfo, WriteDataRequest};
use crate::FsResult;
use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite};

/// Single-use read handle bound to one resource.
#[async_trait]
pub trait InputChannel: Send {
    fn info(&self) -> &DataInfo;

    fn input(&mut self) -> &mut (dyn AsyncRead + Unpin + Send);

    async fn close(&mut self) -> FsResult<()>;
}

/// Single-use write handle bound to one resource.
///
/// `close` commits the written bytes. `recover` rolls the destination back and must be
/// safe whether or not `close` was reached.
#[async_trait]
pub trait OutputChannel: Send {
    fn request(&self) -> &WriteDataRequest;

    fn output(&mut self) -> &mut (dyn AsyncWrite + Unpin + Send);

    async fn recover(&mut self) -> FsResult<()>;

    async fn close(&mut self) -> FsResult<()>;
}
