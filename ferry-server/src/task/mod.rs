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

mod access_task_request;
pub use self::access_task_request::AccessTaskRequest;

mod access_task;
pub use self::access_task::AccessTask;

mod task_logger;
pub use self::task_logger::*;

mod task_executor;
pub use self::task_executor::AccessTaskExecutor;
