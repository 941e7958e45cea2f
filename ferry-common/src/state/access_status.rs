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

use crate::state::TaskState;
use crate::utils::LocalTime;
use serde::{Serialize, Serializer};

fn serialize_time<S: Serializer>(mills: &i64, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&LocalTime::format_mills(*mills))
}

/// Point-in-time summary of a copy task.
///
/// Snapshots are complete summaries rather than deltas, a logger can keep the
/// latest one per id.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccessStatus {
    pub id: String,
    pub redirect_from: String,
    pub server_name: String,
    pub client_name: String,
    pub from: String,
    pub to: String,
    pub state: TaskState,
    // transferred / expected, NaN or infinite when the expected size is 0 or unknown.
    pub progress: f64,
    #[serde(serialize_with = "serialize_time")]
    pub start_time: i64,
    // Millis.
    pub elapsed: i64,
    pub expected_size: i64,
    pub transferred_size: i64,
}

/// Filter for stored snapshots.
#[derive(Debug, Clone, Default)]
pub struct AccessStatusQuery {
    pub id: Option<String>,
    pub state: Option<TaskState>,
    pub server_name: Option<String>,
    pub client_name: Option<String>,
    pub offset: usize,
    pub limit: Option<usize>,
}

impl AccessStatusQuery {
    pub fn matches(&self, status: &AccessStatus) -> bool {
        fn eq(want: &Option<String>, v: &str) -> bool {
            want.as_deref().map(|w| w == v).unwrap_or(true)
        }

        eq(&self.id, &status.id)
            && eq(&self.server_name, &status.server_name)
            && eq(&self.client_name, &status.client_name)
            && self.state.map(|s| s == status.state).unwrap_or(true)
    }
}
