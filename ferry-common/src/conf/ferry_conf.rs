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

use crate::conf::{BufferConf, LockConf, LogConf, TaskConf};
use crate::FsResult;
use log::info;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Gateway configuration, loaded from toml.
///
/// ```toml
/// server_name = "gw-01"
/// single_mode = true
///
/// [task]
/// handler_number = 10
/// submit_timeout = "100ms"
///
/// [buffer]
/// limit = "10MB"
/// capacity = "1MB"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FerryConf {
    pub server_name: String,

    // Run without a coordination service: in-process locks, in-memory task log.
    pub single_mode: bool,

    pub task: TaskConf,
    pub lock: LockConf,
    pub buffer: BufferConf,
    pub log: LogConf,
}

impl FerryConf {
    pub fn from_file<T: AsRef<Path>>(path: T) -> FsResult<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        let conf = Self::from_str(&content)?;
        info!("load conf from {}", path.as_ref().display());
        Ok(conf)
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> FsResult<Self> {
        let mut conf: FerryConf = toml::from_str(content)?;
        conf.init()?;
        Ok(conf)
    }

    pub fn init(&mut self) -> FsResult<()> {
        if self.server_name.is_empty() {
            self.server_name = Self::default_server_name();
        }
        self.task.init()?;
        self.buffer.init()?;
        Ok(())
    }

    fn default_server_name() -> String {
        std::env::var("HOSTNAME").unwrap_or_else(|_| "localhost".to_string())
    }
}

impl Default for FerryConf {
    fn default() -> Self {
        Self {
            server_name: Self::default_server_name(),
            single_mode: false,
            task: Default::default(),
            lock: Default::default(),
            buffer: Default::default(),
            log: Default::default(),
        }
    }
}
