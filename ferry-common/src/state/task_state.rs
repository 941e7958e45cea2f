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

use num_enum::{IntoPrimitive, TryFromPrimitive};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Copy task lifecycle: `Pending -> Running -> {Succeed, Failed, Abort}`.
#[repr(u8)]
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
pub enum TaskState {
    Pending = 0,
    Running = 1,
    Failed = 2,
    Succeed = 3,
    #[serde(rename = "aborted")]
    Abort = 4,
}

impl TaskState {
    pub fn description(&self) -> &'static str {
        match self {
            TaskState::Pending => "pending",
            TaskState::Running => "running",
            TaskState::Failed => "failed",
            TaskState::Succeed => "succeed",
            TaskState::Abort => "aborted",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskState::Failed | TaskState::Succeed | TaskState::Abort
        )
    }

    /// Whether moving from `self` to `next` keeps the lifecycle monotonic.
    pub fn can_transition(&self, next: TaskState) -> bool {
        match self {
            // A rejected submission fails without ever running.
            TaskState::Pending => matches!(next, TaskState::Running | TaskState::Failed),
            TaskState::Running => next.is_terminal(),
            _ => false,
        }
    }
}

impl Display for TaskState {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.description())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transitions() {
        assert!(TaskState::Pending.can_transition(TaskState::Running));
        assert!(TaskState::Pending.can_transition(TaskState::Failed));
        assert!(!TaskState::Pending.can_transition(TaskState::Succeed));
        assert!(!TaskState::Pending.can_transition(TaskState::Abort));
        assert!(TaskState::Running.can_transition(TaskState::Abort));
        assert!(!TaskState::Running.can_transition(TaskState::Pending));
        assert!(!TaskState::Succeed.can_transition(TaskState::Failed));
        assert!(!TaskState::Abort.can_transition(TaskState::Running));
    }

    #[test]
    fn codes() {
        assert_eq!(u8::from(TaskState::Abort), 4);
        assert_eq!(TaskState::try_from(3u8).unwrap(), TaskState::Succeed);
        assert_eq!(TaskState::Abort.to_string(), "aborted");
        assert_eq!(
            serde_json::to_string(&TaskState::Abort).unwrap(),
            "\"aborted\""
        );
    }
}
