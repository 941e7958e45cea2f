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

use crate::error::FsError;
use crate::utils::ByteUnit;
use crate::FsResult;
use serde::{Deserialize, Serialize};

/// Memory budget of a spill buffer before it migrates to disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BufferConf {
    #[serde(skip)]
    pub limit: usize,
    #[serde(alias = "limit")]
    pub limit_str: String,

    #[serde(skip)]
    pub capacity: usize,
    #[serde(alias = "capacity")]
    pub capacity_str: String,

    // Directory of spill files, empty means the system temp dir.
    pub spill_dir: String,
}

impl BufferConf {
    pub fn init(&mut self) -> FsResult<()> {
        self.limit = ByteUnit::from_str(&self.limit_str)?.as_byte() as usize;
        self.capacity = ByteUnit::from_str(&self.capacity_str)?.as_byte() as usize;
        if self.capacity == 0 || self.limit < self.capacity {
            return Err(FsError::conf(format!(
                "buffer limit {} must not be less than capacity {}, and capacity must be positive",
                self.limit, self.capacity
            )));
        }
        Ok(())
    }

    pub fn spill_dir(&self) -> std::path::PathBuf {
        if self.spill_dir.is_empty() {
            std::env::temp_dir()
        } else {
            std::path::PathBuf::from(&self.spill_dir)
        }
    }
}

impl Default for BufferConf {
    fn default() -> Self {
        Self {
            limit: 10 * ByteUnit::MB as usize,
            limit_str: "10MB".to_string(),

            capacity: ByteUnit::MB as usize,
            capacity_str: "1MB".to_string(),

            spill_dir: "".to_string(),
        }
    }
}
