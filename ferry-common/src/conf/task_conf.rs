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

use crate::utils::DurationUnit;
use crate::FsResult;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Copy scheduler configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskConf {
    // Number of transfers allowed to run at the same time.
    pub handler_number: usize,

    // Chunk size of the copy loop, also the checkpoint interval in bytes.
    pub buffer_size: usize,

    // How long submit waits for a free worker, 0 fails immediately.
    #[serde(skip)]
    pub submit_timeout: Duration,
    #[serde(alias = "submit_timeout")]
    pub submit_timeout_str: String,

    // Retention of finished task snapshots, negative keeps them forever.
    #[serde(skip)]
    pub log_ttl: Option<Duration>,
    #[serde(alias = "log_ttl")]
    pub log_ttl_str: String,

    // Most snapshots kept by the in-memory task logger, the oldest tasks go first.
    pub log_capacity: usize,
}

impl TaskConf {
    pub const DEFAULT_HANDLER_NUMBER: usize = 10;
    pub const DEFAULT_BUFFER_SIZE: usize = 4096;
    pub const DEFAULT_LOG_CAPACITY: usize = 10000;

    pub fn init(&mut self) -> FsResult<()> {
        self.submit_timeout = DurationUnit::from_str(&self.submit_timeout_str)?.as_duration();
        self.log_ttl = DurationUnit::from_str(&self.log_ttl_str)?.as_option();
        Ok(())
    }
}

impl Default for TaskConf {
    fn default() -> Self {
        Self {
            handler_number: Self::DEFAULT_HANDLER_NUMBER,
            buffer_size: Self::DEFAULT_BUFFER_SIZE,

            submit_timeout: Default::default(),
            submit_timeout_str: "0ms".to_string(),

            log_ttl: None,
            log_ttl_str: "-1".to_string(),

            log_capacity: Self::DEFAULT_LOG_CAPACITY,
        }
    }
}
