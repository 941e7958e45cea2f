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

use ferry_common::fs::{InputChannel, OutputChannel};

/// One copy job: bytes of `input` go to `output`.
pub struct AccessTaskRequest {
    pub input: Box<dyn InputChannel>,
    pub output: Box<dyn OutputChannel>,
    pub server_name: String,
    pub client_name: String,
    pub redirect_from: Option<String>,
}

impl AccessTaskRequest {
    pub fn new(input: Box<dyn InputChannel>, output: Box<dyn OutputChannel>) -> Self {
        Self {
            input,
            output,
            server_name: String::new(),
            client_name: String::new(),
            redirect_from: None,
        }
    }

    pub fn with_server_name(mut self, name: impl Into<String>) -> Self {
        self.server_name = name.into();
        self
    }

    pub fn with_client_name(mut self, name: impl Into<String>) -> Self {
        self.client_name = name.into();
        self
    }

    pub fn with_redirect_from(mut self, name: impl Into<String>) -> Self {
        self.redirect_from = Some(name.into());
        self
    }

    /// The server that first received the request, this server when not redirected.
    pub fn redirect_from(&self) -> &str {
        self.redirect_from.as_deref().unwrap_or(&self.server_name)
    }
}
