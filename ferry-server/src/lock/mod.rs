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

mod lock_handle;
pub use self::lock_handle::*;

mod lock_manager;
pub use self::lock_manager::LockManager;

mod empty_lock_manager;
pub use self::empty_lock_manager::EmptyLockManager;

mod memory_lock_manager;
pub use self::memory_lock_manager::MemoryLockManager;

mod coordinator;
pub use self::coordinator::*;

mod memory_coordinator;
pub use self::memory_coordinator::MemoryCoordinator;

mod coordinated_lock_manager;
pub use self::coordinated_lock_manager::CoordinatedLockManager;

mod lock_manager_factory;
pub use self::lock_manager_factory::LockManagerFactory;
