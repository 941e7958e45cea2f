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

use ferry_common::FsResult;
use prometheus::{Encoder, IntCounter, IntCounterVec, IntGauge, IntGaugeVec, Opts, Registry};
use std::fmt::{Display, Formatter};
use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Operation {
    Read,
    Write,
    Delete,
    List,
}

impl Operation {
    pub const fn as_str(self) -> &'static str {
        match self {
            Operation::Read => "read",
            Operation::Write => "write",
            Operation::Delete => "delete",
            Operation::List => "list",
        }
    }
}

impl Display for Operation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Transfer metrics of the data systems, kept in their own registry.
pub struct DataMetrics {
    registry: Registry,
    operations: IntCounterVec,
    bytes: IntCounterVec,
    expected_bytes: IntCounterVec,
    inflight: IntGaugeVec,
}

impl DataMetrics {
    pub fn new() -> FsResult<Self> {
        let registry = Registry::new();
        let operations = IntCounterVec::new(
            Opts::new("ferry_operations_total", "data operations started"),
            &["op"],
        )?;
        let bytes = IntCounterVec::new(
            Opts::new("ferry_bytes_total", "bytes moved through channels"),
            &["op"],
        )?;
        let expected_bytes = IntCounterVec::new(
            Opts::new("ferry_expected_bytes_total", "declared size of opened items"),
            &["op"],
        )?;
        let inflight = IntGaugeVec::new(
            Opts::new("ferry_inflight_operations", "operations not closed yet"),
            &["op"],
        )?;

        registry.register(Box::new(operations.clone()))?;
        registry.register(Box::new(bytes.clone()))?;
        registry.register(Box::new(expected_bytes.clone()))?;
        registry.register(Box::new(inflight.clone()))?;

        Ok(Self {
            registry,
            operations,
            bytes,
            expected_bytes,
            inflight,
        })
    }

    /// Starts metering one operation; `expected_size` is ignored when negative.
    pub fn new_metrics(&self, op: Operation, expected_size: i64) -> OperationMetrics {
        let label = [op.as_str()];
        self.operations.with_label_values(&label).inc();
        if expected_size > 0 {
            self.expected_bytes
                .with_label_values(&label)
                .inc_by(expected_size as u64);
        }

        let inflight = self.inflight.with_label_values(&label);
        inflight.inc();
        OperationMetrics {
            op,
            bytes: self.bytes.with_label_values(&label),
            inflight,
            closed: AtomicBool::new(false),
        }
    }

    pub fn bytes(&self, op: Operation) -> u64 {
        self.bytes.with_label_values(&[op.as_str()]).get()
    }

    pub fn operations(&self, op: Operation) -> u64 {
        self.operations.with_label_values(&[op.as_str()]).get()
    }

    pub fn inflight(&self, op: Operation) -> i64 {
        self.inflight.with_label_values(&[op.as_str()]).get()
    }

    /// Prometheus text exposition of every data metric.
    pub fn text(&self) -> FsResult<String> {
        let mut buf = vec![];
        prometheus::TextEncoder::new().encode(&self.registry.gather(), &mut buf)?;
        Ok(String::from_utf8_lossy(&buf).to_string())
    }
}

/// Meter of one operation. `close` is idempotent and also runs on drop.
pub struct OperationMetrics {
    op: Operation,
    bytes: IntCounter,
    inflight: IntGauge,
    closed: AtomicBool,
}

impl OperationMetrics {
    pub fn op(&self) -> Operation {
        self.op
    }

    pub fn add_bytes(&self, n: usize) {
        self.bytes.inc_by(n as u64);
    }

    pub fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            self.inflight.dec();
        }
    }
}

impl Drop for OperationMetrics {
    fn drop(&mut self) {
        self.close()
    }
}
