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
use crate::state::{AccountInfo, AccountMapping, DataPath, Protocol};
use crate::FsResult;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Addresses one item on one backend: `scheme://[account]/catalog/name[?query]`.
///
/// The query part is accepted and ignored. Locators are immutable, derived locators
/// are built with `with_path` and friends.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceLocator {
    protocol: Protocol,
    account: AccountInfo,
    path: DataPath,
}

impl ResourceLocator {
    const SCHEME_END: &'static str = "://";

    pub fn new(protocol: Protocol, account: AccountInfo, path: DataPath) -> Self {
        Self {
            protocol,
            account,
            path,
        }
    }

    pub fn parse(uri: &str) -> FsResult<Self> {
        Self::parse_with(uri, None, None)
    }

    /// Parses `uri`, resolving `$alias` accounts through `mapping` and appending
    /// `alternative_name` when the path names a directory.
    pub fn parse_with(
        uri: &str,
        mapping: Option<&dyn AccountMapping>,
        alternative_name: Option<&str>,
    ) -> FsResult<Self> {
        let scheme_end = match uri.find(Self::SCHEME_END) {
            Some(0) | None => {
                return Err(FsError::uri_parse(format!(
                    "Invalid format of scheme on {}",
                    uri
                )))
            }
            Some(v) => v,
        };
        let protocol = Protocol::from_str(&uri[..scheme_end])?;

        let account_start = scheme_end + Self::SCHEME_END.len();
        let account_end = match uri[account_start..].find('/') {
            Some(v) => account_start + v,
            None => {
                return Err(FsError::uri_parse(format!(
                    "No found of path prefix on {}",
                    uri
                )))
            }
        };

        let account_str = &uri[account_start..account_end];
        let account = match account_str.strip_prefix('$') {
            _ if account_str.is_empty() => AccountInfo::default(),
            Some(id) if !id.is_empty() => match mapping {
                Some(mapping) => mapping.find(id).ok_or_else(|| {
                    FsError::uri_parse(format!("No corresponding account for alias on {}", uri))
                })?,
                None => AccountInfo::alias(id),
            },
            _ => AccountInfo::parse(account_str)
                .map_err(|e| FsError::uri_parse(format!("{} on {}", e, uri)))?,
        };

        let path_str = match uri[account_end..].find('?') {
            Some(v) => &uri[account_end..account_end + v],
            None => &uri[account_end..],
        };

        let mut path = DataPath::new(path_str)?;
        if let (true, Some(name)) = (path.is_dir(), alternative_name) {
            path = path.append(name);
        }

        Ok(Self::new(protocol, account, path))
    }

    pub fn protocol(&self) -> Protocol {
        self.protocol
    }

    pub fn account(&self) -> &AccountInfo {
        &self.account
    }

    pub fn path(&self) -> &DataPath {
        &self.path
    }

    pub fn with_path(&self, path: DataPath) -> Self {
        Self::new(self.protocol, self.account.clone(), path)
    }

    pub fn append_name(&self, name: &str) -> Self {
        self.with_path(self.path.append(name))
    }

    pub fn render(&self, use_id: bool) -> String {
        format!(
            "{}{}{}{}",
            self.protocol,
            Self::SCHEME_END,
            self.account.render(use_id),
            self.path
        )
    }

    /// Credential-complete form, used as the lock key of the resource.
    pub fn canonical(&self) -> String {
        self.render(false)
    }
}

impl Display for ResourceLocator {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.render(true))
    }
}

impl FromStr for ResourceLocator {
    type Err = FsError;

    fn from_str(s: &str) -> FsResult<Self> {
        Self::parse(s)
    }
}
