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

use serde::{Deserialize, Serialize};

/// Lock manager selection and the coordination root used by distributed locks.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LockConf {
    // Every lock request succeeds with a no-op lock.
    pub disable: bool,

    // Parent path of lock nodes is `<root>/lock`.
    pub root: String,
}

impl LockConf {
    pub fn lock_path(&self) -> String {
        format!("{}/lock", self.root.trim_end_matches('/'))
    }
}

impl Default for LockConf {
    fn default() -> Self {
        Self {
            disable: false,
            root: "/ferry".to_string(),
        }
    }
}
