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
use std::collections::HashMap;
use std::fmt::{Display, Formatter};

/// Credentials and endpoint of a backend account.
///
/// Text form is `[domain;][user:password@]host[:port]`, or `$id` when the account is an alias.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccountInfo {
    pub id: Option<String>,
    pub domain: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
}

fn non_empty(s: &str) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}

impl AccountInfo {
    pub fn alias(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    pub fn parse(s: &str) -> FsResult<Self> {
        let (credential, host_port) = match s.rfind('@') {
            Some(idx) => (Some(&s[..idx]), &s[idx + 1..]),
            None => (None, s),
        };

        let (host, port) = match host_port.split_once(':') {
            Some((host, port)) => {
                let port = port
                    .parse::<u16>()
                    .map_err(|_| FsError::uri_parse(format!("Invalid port number: {}", port)))?;
                (host, Some(port))
            }
            None => (host_port, None),
        };

        let mut account = AccountInfo {
            host: non_empty(host),
            port,
            ..Default::default()
        };

        if let Some(credential) = credential {
            let (domain, user_pwd) = match credential.split_once(';') {
                Some((domain, rest)) => (non_empty(domain), rest),
                None => (None, credential),
            };
            let (user, password) = match user_pwd.split_once(':') {
                Some((user, pwd)) => (non_empty(user), non_empty(pwd)),
                None => (non_empty(user_pwd), None),
            };
            account.domain = domain;
            account.user = user;
            account.password = password;
        }

        Ok(account)
    }

    /// Renders the account; `use_id` prefers the alias over the credentials.
    pub fn render(&self, use_id: bool) -> String {
        let mut str = String::new();
        if let (true, Some(id)) = (use_id, &self.id) {
            str.push('$');
            str.push_str(id);
            return str;
        }

        if let Some(domain) = &self.domain {
            str.push_str(domain);
            str.push(';');
        }
        if let (Some(user), Some(pwd)) = (&self.user, &self.password) {
            str.push_str(user);
            str.push(':');
            str.push_str(pwd);
            str.push('@');
        }
        if let Some(host) = &self.host {
            str.push_str(host);
        }
        if let Some(port) = self.port {
            str.push(':');
            str.push_str(&port.to_string());
        }
        str
    }
}

impl Display for AccountInfo {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.render(true))
    }
}

/// Resolves `$id` aliases to stored accounts.
pub trait AccountMapping: Send + Sync {
    fn find(&self, id: &str) -> Option<AccountInfo>;
}

impl AccountMapping for HashMap<String, AccountInfo> {
    fn find(&self, id: &str) -> Option<AccountInfo> {
        self.get(id).map(|account| AccountInfo {
            id: Some(id.to_string()),
            ..account.clone()
        })
    }
}
