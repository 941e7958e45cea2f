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

use crate::task::AccessTaskRequest;
use ferry_common::error::FsError;
use ferry_common::state::{AccessStatus, TaskState};
use ferry_common::utils::{CommonUtils, LocalTime};
use ferry_common::FsResult;
use log::{debug, warn};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Mutex, MutexGuard};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

/// Handle of a submitted copy job.
///
/// The state only moves forward, `Pending -> Running -> {Succeed, Failed, Abort}`.
/// Completion is signalled once, after the channels are closed and the final snapshot
/// is logged.
pub struct AccessTask {
    id: String,
    server_name: String,
    client_name: String,
    redirect_from: String,
    from: String,
    to: String,
    expected_size: i64,
    start_time: i64,
    end_time: AtomicI64,
    transferred: AtomicI64,
    state: Mutex<TaskState>,
    error: Mutex<Option<FsError>>,
    abort: CancellationToken,
    done: watch::Sender<bool>,
}

fn guard<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(v) => v,
        Err(poisoned) => poisoned.into_inner(),
    }
}

impl AccessTask {
    pub(crate) fn new(req: &AccessTaskRequest) -> Self {
        let (done, _) = watch::channel(false);
        Self {
            id: CommonUtils::create_task_id(),
            server_name: req.server_name.clone(),
            client_name: req.client_name.clone(),
            redirect_from: req.redirect_from().to_string(),
            from: req.input.info().locator.to_string(),
            to: req.output.request().locator.to_string(),
            expected_size: req.input.info().size,
            start_time: LocalTime::mills() as i64,
            end_time: AtomicI64::new(0),
            transferred: AtomicI64::new(0),
            state: Mutex::new(TaskState::Pending),
            error: Mutex::new(None),
            abort: CancellationToken::new(),
            done,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn state(&self) -> TaskState {
        *guard(&self.state)
    }

    pub fn error(&self) -> Option<FsError> {
        guard(&self.error).clone()
    }

    pub fn transferred(&self) -> i64 {
        self.transferred.load(Ordering::SeqCst)
    }

    pub fn expected_size(&self) -> i64 {
        self.expected_size
    }

    pub fn is_abort(&self) -> bool {
        self.abort.is_cancelled()
    }

    pub fn is_done(&self) -> bool {
        *self.done.borrow()
    }

    pub fn status(&self) -> AccessStatus {
        let transferred = self.transferred();
        let end_time = self.end_time.load(Ordering::SeqCst);
        let elapsed = if end_time == 0 {
            LocalTime::mills() as i64 - self.start_time
        } else {
            end_time - self.start_time
        };

        AccessStatus {
            id: self.id.clone(),
            redirect_from: self.redirect_from.clone(),
            server_name: self.server_name.clone(),
            client_name: self.client_name.clone(),
            from: self.from.clone(),
            to: self.to.clone(),
            state: self.state(),
            progress: transferred as f64 / self.expected_size as f64,
            start_time: self.start_time,
            elapsed,
            expected_size: self.expected_size,
            transferred_size: transferred,
        }
    }

    /// Waits until the task is finalized, then returns the error it failed with.
    pub async fn wait_completion(&self) -> FsResult<()> {
        let mut rx = self.done.subscribe();
        if rx.wait_for(|v| *v).await.is_err() {
            warn!("completion gate of task {} is gone", self.id);
        }

        match self.error() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Asks the copy loop to stop at the next chunk boundary and waits for the cleanup.
    pub async fn abort(&self) -> FsResult<()> {
        self.abort.cancel();
        self.wait_completion().await
    }

    pub(crate) fn set_state(&self, next: TaskState) -> bool {
        let mut state = guard(&self.state);
        if state.can_transition(next) {
            debug!("task {} {} -> {}", self.id, *state, next);
            *state = next;
            true
        } else {
            warn!("task {} ignores transition {} -> {}", self.id, *state, next);
            false
        }
    }

    pub(crate) fn add_bytes(&self, n: usize) {
        self.transferred.fetch_add(n as i64, Ordering::SeqCst);
    }

    pub(crate) fn finish(&self, state: TaskState, error: Option<FsError>) {
        self.end_time
            .store(LocalTime::mills() as i64, Ordering::SeqCst);
        *guard(&self.error) = error;
        self.set_state(state);
    }

    pub(crate) fn signal(&self) {
        self.done.send_replace(true);
    }
}
