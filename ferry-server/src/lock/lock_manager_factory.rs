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

use crate::lock::{
    CoordinatedLockManager, EmptyLockManager, LockManager, MemoryLockManager, SharedCoordinator,
};
use ferry_common::conf::FerryConf;
use ferry_common::error::FsError;
use ferry_common::FsResult;
use log::info;
use std::sync::Arc;

pub struct LockManagerFactory;

impl LockManagerFactory {
    /// Disabled when `lock.disable`, in-process in single mode, otherwise backed by the
    /// coordination service, which must then be given.
    pub async fn create(
        conf: &FerryConf,
        coordinator: Option<SharedCoordinator>,
    ) -> FsResult<Arc<dyn LockManager>> {
        if conf.lock.disable {
            info!("lock manager: disabled");
            return Ok(Arc::new(EmptyLockManager));
        }

        if conf.single_mode {
            info!("lock manager: in-process");
            return Ok(Arc::new(MemoryLockManager::new()));
        }

        let coordinator = match coordinator {
            Some(v) => v,
            None => {
                return Err(FsError::conf(
                    "a coordination service is required unless single_mode or lock.disable is set",
                ))
            }
        };
        let manager = CoordinatedLockManager::create(coordinator, &conf.lock.lock_path()).await?;
        info!("lock manager: coordinated at {}", manager.lock_path());
        Ok(Arc::new(manager))
    }
}
