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

mod protocol;
pub use self::protocol::Protocol;

mod account_info;
pub use self::account_info::*;

mod data_path;
pub use self::data_path::DataPath;

mod resource_locator;
pub use self::resource_locator::ResourceLocator;

mod data_info;
pub use self::data_info::*;

mod data_request;
pub use self::data_request::*;

mod data_info_query;
pub use self::data_info_query::*;

mod task_state;
pub use self::task_state::TaskState;

mod access_status;
pub use self::access_status::*;
