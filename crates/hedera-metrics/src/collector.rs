// Copyright 2025 Hedera Execution Engine Authors
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

use crate::registry::MetricsRegistry;
use crate::snapshot::MetricsSnapshot;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Sink for the telemetry an execution produces.
///
/// The execution engine calls these hooks as it goes; implementations must
/// be cheap and must not block, since they run between attempts.
///
/// # Example
///
/// ```rust
/// use hedera_metrics::{ClientMetricsCollector, MetricsCollector};
/// use std::time::{Duration, Instant};
///
/// let collector = ClientMetricsCollector::new();
/// let start = Instant::now();
///
/// collector.record_attempt("0.0.3", "/proto.CryptoService/cryptoTransfer");
/// collector.record_retry("0.0.3", "BUSY", Duration::from_millis(250));
/// collector.record_attempt("0.0.4", "/proto.CryptoService/cryptoTransfer");
/// collector.record_call("/proto.CryptoService/cryptoTransfer", start, true);
///
/// let snapshot = collector.snapshot();
/// assert_eq!(snapshot.total_attempts, 2);
/// assert_eq!(snapshot.total_retries, 1);
/// ```
pub trait MetricsCollector: Send + Sync {
    /// Records that an attempt of `method` was dispatched to `node`.
    ///
    /// # Arguments
    /// * `node` - Account id of the node, as text
    /// * `method` - Full gRPC method path
    fn record_attempt(&self, node: &str, method: &str);

    /// Records that the attempt on `node` will be retried.
    ///
    /// # Arguments
    /// * `node` - Account id of the node that was tried
    /// * `reason` - Short reason, a gRPC code or precheck status name
    /// * `backoff` - Delay before the next attempt
    fn record_retry(&self, node: &str, reason: &str, backoff: Duration);

    /// Records that `node` was skipped because its channel failed to connect.
    fn record_skip(&self, node: &str);

    /// Records a finished execution, whatever its outcome.
    ///
    /// # Arguments
    /// * `method` - Full gRPC method path
    /// * `start_time` - When the execution began
    /// * `success` - Whether it produced a successful response
    fn record_call(&self, method: &str, start_time: Instant, success: bool);

    /// Takes a snapshot of the current metrics state.
    fn snapshot(&self) -> MetricsSnapshot;
}

/// Registry-backed collector used by the client.
#[derive(Debug, Clone, Default)]
pub struct ClientMetricsCollector {
    registry: Arc<MetricsRegistry>,
}

impl ClientMetricsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a collector over an existing registry, so several clients can
    /// report into one place.
    ///
    /// # Arguments
    /// * `registry` - The metrics registry to use
    pub fn with_registry(registry: Arc<MetricsRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<MetricsRegistry> {
        &self.registry
    }
}

impl MetricsCollector for ClientMetricsCollector {
    fn record_attempt(&self, node: &str, method: &str) {
        self.registry.record_attempt(node, method);
    }

    fn record_retry(&self, node: &str, reason: &str, backoff: Duration) {
        self.registry.record_retry(node, reason, backoff);
    }

    fn record_skip(&self, node: &str) {
        self.registry.record_skip(node);
    }

    fn record_call(&self, method: &str, start_time: Instant, success: bool) {
        let latency_us = start_time.elapsed().as_micros() as u64;
        self.registry.record_method_call(method, latency_us, success);
    }

    fn snapshot(&self) -> MetricsSnapshot {
        self.registry.snapshot()
    }
}
