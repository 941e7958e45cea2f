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

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadDataRequest {
    pub locator: ResourceLocator,
}

impl ReadDataRequest {
    pub fn new(locator: ResourceLocator) -> Self {
        Self { locator }
    }

    pub fn locator(&self) -> &ResourceLocator {
        &self.locator
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteDataRequest {
    pub locator: ResourceLocator,
    // Modification time to stamp on the committed item, epoch millis.
    pub upload_time: Option<i64>,
    pub expected_size: Option<i64>,
}

impl WriteDataRequest {
    pub fn new(locator: ResourceLocator) -> Self {
        Self {
            locator,
            upload_time: None,
            expected_size: None,
        }
    }

    pub fn with_upload_time(mut self, upload_time: i64) -> Self {
        self.upload_time = Some(upload_time);
        self
    }

    pub fn with_expected_size(mut self, size: i64) -> Self {
        self.expected_size = Some(size);
        self
    }

    pub fn locator(&self) -> &ResourceLocator {
        &self.locator
    }
}
