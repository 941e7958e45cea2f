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

use crate::task::{AccessTask, AccessTaskRequest, TaskLogger};
use ferry_common::conf::TaskConf;
use ferry_common::error::FsError;
use ferry_common::state::{AccessStatus, TaskState};
use ferry_common::FsResult;
use log::{error, info, warn};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::sync::{OwnedSemaphorePermit, Semaphore, TryAcquireError};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

struct Shared {
    tasks: Mutex<HashMap<String, Arc<AccessTask>>>,
    logger: Arc<dyn TaskLogger>,
    buffer_size: usize,
}

impl Shared {
    fn tasks(&self) -> MutexGuard<'_, HashMap<String, Arc<AccessTask>>> {
        match self.tasks.lock() {
            Ok(v) => v,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    async fn log(&self, status: AccessStatus) {
        if let Err(e) = self.logger.add(status).await {
            warn!("failed to log task status: {}", e);
        }
    }
}

/// Runs copy jobs with at most `handler_number` of them in flight.
///
/// Admission is gated by a semaphore: a submit that cannot get a permit within its
/// timeout is finalized as failed and returned like any other task.
pub struct AccessTaskExecutor {
    permits: Arc<Semaphore>,
    shared: Arc<Shared>,
    tracker: TaskTracker,
    shutdown: CancellationToken,
    submit_timeout: Duration,
}

impl AccessTaskExecutor {
    pub const NO_WORKER: &'static str = "No available worker";

    pub fn new(conf: &TaskConf, logger: Arc<dyn TaskLogger>) -> Self {
        let handler_number = conf.handler_number.max(1);
        info!(
            "task executor: handler_number {}, buffer_size {}",
            handler_number, conf.buffer_size
        );

        Self {
            permits: Arc::new(Semaphore::new(handler_number)),
            shared: Arc::new(Shared {
                tasks: Mutex::new(HashMap::new()),
                logger,
                buffer_size: conf.buffer_size.max(1),
            }),
            tracker: TaskTracker::new(),
            shutdown: CancellationToken::new(),
            submit_timeout: conf.submit_timeout,
        }
    }

    pub fn logger(&self) -> &Arc<dyn TaskLogger> {
        &self.shared.logger
    }

    pub fn available_permits(&self) -> usize {
        self.permits.available_permits()
    }

    /// Number of admitted tasks not finalized yet.
    pub fn running(&self) -> usize {
        self.shared.tasks().len()
    }

    pub fn find(&self, id: &str) -> Option<Arc<AccessTask>> {
        self.shared.tasks().get(id).cloned()
    }

    /// Submits with the configured timeout.
    pub async fn submit(&self, req: AccessTaskRequest) -> Arc<AccessTask> {
        self.submit_with_timeout(req, self.submit_timeout).await
    }

    /// Never fails: a rejected submission comes back as a task finalized as failed.
    pub async fn submit_with_timeout(
        &self,
        mut req: AccessTaskRequest,
        timeout: Duration,
    ) -> Arc<AccessTask> {
        let task = Arc::new(AccessTask::new(&req));

        let permit = match self.acquire(timeout).await {
            Ok(v) => v,
            Err(e) => {
                warn!("reject task {} from {}: {}", task.id(), task.status().from, e);
                Self::finalize(&self.shared, &task, &mut req, TaskState::Failed, Some(e), None)
                    .await;
                return task;
            }
        };

        self.shared
            .tasks()
            .insert(task.id().to_string(), task.clone());

        let shared = self.shared.clone();
        let shutdown = self.shutdown.clone();
        let handle = task.clone();
        self.tracker.spawn(async move {
            let (state, err) = Self::copy(&shared, &handle, &mut req, &shutdown).await;
            Self::finalize(&shared, &handle, &mut req, state, err, Some(permit)).await;
        });

        task
    }

    async fn acquire(&self, timeout: Duration) -> FsResult<OwnedSemaphorePermit> {
        let permits = self.permits.clone();
        if timeout.is_zero() {
            return match permits.try_acquire_owned() {
                Ok(v) => Ok(v),
                Err(TryAcquireError::NoPermits) => Err(FsError::task(Self::NO_WORKER)),
                Err(TryAcquireError::Closed) => Err(FsError::task("task executor is closed")),
            };
        }

        match tokio::time::timeout(timeout, permits.acquire_owned()).await {
            Ok(Ok(v)) => Ok(v),
            Ok(Err(_)) => Err(FsError::task("task executor is closed")),
            Err(_) => Err(FsError::task(Self::NO_WORKER)),
        }
    }

    // Abort is checked after each chunk; only executor shutdown interrupts a pending
    // read or write.
    async fn copy(
        shared: &Shared,
        task: &AccessTask,
        req: &mut AccessTaskRequest,
        shutdown: &CancellationToken,
    ) -> (TaskState, Option<FsError>) {
        let stopped = || (TaskState::Failed, Some(FsError::task("task executor is closed")));

        task.set_state(TaskState::Running);
        let mut buf = vec![0u8; shared.buffer_size];
        let mut unlogged = 0;

        loop {
            let n = tokio::select! {
                _ = shutdown.cancelled() => return stopped(),
                res = req.input.input().read(&mut buf) => match res {
                    Ok(n) => n,
                    Err(e) => return (TaskState::Failed, Some(e.into())),
                },
            };
            if n == 0 {
                break;
            }

            tokio::select! {
                _ = shutdown.cancelled() => return stopped(),
                res = req.output.output().write_all(&buf[..n]) => {
                    if let Err(e) = res {
                        return (TaskState::Failed, Some(e.into()));
                    }
                }
            }
            task.add_bytes(n);

            if task.is_abort() {
                return (TaskState::Abort, None);
            }

            unlogged += n;
            if unlogged >= buf.len() {
                shared.log(task.status()).await;
                unlogged -= buf.len();
            }
        }

        tokio::select! {
            _ = shutdown.cancelled() => stopped(),
            res = req.output.output().flush() => match res {
                Ok(()) => (TaskState::Succeed, None),
                Err(e) => (TaskState::Failed, Some(e.into())),
            },
        }
    }

    async fn finalize(
        shared: &Shared,
        task: &AccessTask,
        req: &mut AccessTaskRequest,
        state: TaskState,
        mut err: Option<FsError>,
        permit: Option<OwnedSemaphorePermit>,
    ) {
        if let Err(e) = req.output.close().await {
            error!("task {} failed to close {}: {}", task.id(), req.output.request().locator, e);
            err.get_or_insert(e);
        }
        if let Err(e) = req.input.close().await {
            error!("task {} failed to close {}: {}", task.id(), req.input.info().locator, e);
            err.get_or_insert(e);
        }

        if err.is_some() || state == TaskState::Abort {
            match req.output.recover().await {
                Ok(()) => info!("task {} rolled back {}", task.id(), req.output.request().locator),
                Err(e) => warn!(
                    "task {} failed to roll back {}: {}",
                    task.id(),
                    req.output.request().locator,
                    e
                ),
            }
        }

        let state = match (&err, state) {
            (Some(_), TaskState::Succeed) => TaskState::Failed,
            (_, v) => v,
        };
        task.finish(state, err);

        drop(permit);
        shared.tasks().remove(task.id());
        let status = task.status();
        info!(
            "task {} {}, {} of {} bytes in {} ms",
            status.id, status.state, status.transferred_size, status.expected_size, status.elapsed
        );
        shared.log(status).await;
        task.signal();
    }

    /// Stops every worker without draining and waits for them to finalize.
    pub async fn close(&self) {
        self.shutdown.cancel();
        self.permits.close();
        self.tracker.close();
        self.tracker.wait().await;
        info!("task executor closed");
    }
}

impl Drop for AccessTaskExecutor {
    fn drop(&mut self) {
        self.shutdown.cancel();
        self.permits.close();
    }
}
