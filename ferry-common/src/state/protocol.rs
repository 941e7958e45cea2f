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
use num_enum::{IntoPrimitive, TryFromPrimitive};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Backend protocols addressable by a resource locator.
#[repr(i8)]
#[derive(
    Debug,
    Copy,
    Clone,
    PartialEq,
    Eq,
    Hash,
    IntoPrimitive,
    TryFromPrimitive,
    Serialize,
    Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Hbase = 0,
    Hdfs = 1,
    Local = 2,
    Ftp = 3,
    Smb = 4,
    File = 5,
    Http = 6,
}

impl Protocol {
    pub const ALL: [Protocol; 7] = [
        Protocol::Hbase,
        Protocol::Hdfs,
        Protocol::Local,
        Protocol::Ftp,
        Protocol::Smb,
        Protocol::File,
        Protocol::Http,
    ];

    pub fn scheme(&self) -> &'static str {
        match self {
            Protocol::Hbase => "hbase",
            Protocol::Hdfs => "hdfs",
            Protocol::Local => "local",
            Protocol::Ftp => "ftp",
            Protocol::Smb => "smb",
            Protocol::File => "file",
            Protocol::Http => "http",
        }
    }
}

impl FromStr for Protocol {
    type Err = FsError;

    fn from_str(s: &str) -> FsResult<Self> {
        Self::ALL
            .iter()
            .find(|p| p.scheme().eq_ignore_ascii_case(s))
            .copied()
            .ok_or_else(|| FsError::uri_parse(format!("No found supported scheme: {}", s)))
    }
}

impl Display for Protocol {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.scheme())
    }
}
