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
use crate::FsResult;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Hierarchical path split into catalog and name.
///
/// The catalog always starts and ends with `/`; the name is empty for a directory path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DataPath {
    catalog: String,
    name: String,
}

impl DataPath {
    pub fn new(path: &str) -> FsResult<Self> {
        let idx = match path.rfind('/') {
            Some(v) => v,
            None => return Err(FsError::uri_parse(format!("Invalid format of path: {}", path))),
        };

        let mut catalog = path[..=idx].to_string();
        if !catalog.starts_with('/') {
            catalog.insert(0, '/');
        }

        Ok(Self {
            catalog,
            name: path[idx + 1..].to_string(),
        })
    }

    pub fn catalog(&self) -> &str {
        &self.catalog
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_dir(&self) -> bool {
        self.name.is_empty()
    }

    pub fn full_path(&self) -> String {
        format!("{}{}", self.catalog, self.name)
    }

    /// A child of this path when it is a directory, otherwise the name is extended.
    pub fn append(&self, name: &str) -> Self {
        Self {
            catalog: self.catalog.clone(),
            name: format!("{}{}", self.name, name),
        }
    }

    pub fn with_name(&self, name: &str) -> Self {
        Self {
            catalog: self.catalog.clone(),
            name: name.to_string(),
        }
    }

    /// The path as a directory, so that `append` creates children.
    pub fn as_dir(&self) -> Self {
        if self.is_dir() {
            return self.clone();
        }
        Self {
            catalog: format!("{}{}/", self.catalog, self.name),
            name: String::new(),
        }
    }
}

impl Display for DataPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", self.catalog, self.name)
    }
}
