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

use crate::state::ResourceLocator;
use serde::{Deserialize, Serialize};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    File,
    Directory,
    Others,
}

/// A host holding part of the data, `ratio` is the share in `[0, 1]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataOwner {
    pub host: String,
    pub ratio: f32,
}

impl DataOwner {
    pub fn new(host: impl Into<String>, ratio: f32) -> Self {
        Self {
            host: host.into(),
            ratio,
        }
    }
}

/// Descriptor of one item on a backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataInfo {
    pub locator: ResourceLocator,
    // Bytes, -1 when unknown.
    pub size: i64,
    // Epoch millis.
    pub upload_time: i64,
    pub data_type: DataType,
    pub owners: Vec<DataOwner>,
}

impl DataInfo {
    pub const UNKNOWN_SIZE: i64 = -1;

    pub fn new(locator: ResourceLocator, data_type: DataType, size: i64, upload_time: i64) -> Self {
        Self {
            locator,
            size,
            upload_time,
            data_type,
            owners: vec![],
        }
    }

    pub fn with_owners(mut self, owners: Vec<DataOwner>) -> Self {
        self.owners = owners;
        self
    }

    pub fn name(&self) -> &str {
        self.locator.path().name()
    }

    pub fn is_file(&self) -> bool {
        self.data_type == DataType::File
    }

    pub fn is_dir(&self) -> bool {
        self.data_type == DataType::Directory
    }
}
