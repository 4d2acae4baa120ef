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

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Metrics for one gRPC method, counted per execution.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodMetrics {
    pub call_count: u64,
    pub success_count: u64,
    pub failure_count: u64,
    /// Attempts spent across all executions of this method.
    pub attempt_count: u64,
    pub avg_latency_us: u64,
    pub p50_latency_us: u64,
    pub p95_latency_us: u64,
    pub p99_latency_us: u64,
}

/// Metrics for one node account.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeMetrics {
    /// Attempts dispatched to this node.
    pub request_count: u64,
    /// Attempts on this node that ended in a retry.
    pub retry_count: u64,
    /// Times this node was passed over because its channel was down.
    pub skip_count: u64,
}

/// Complete metrics snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    pub total_attempts: u64,
    pub total_retries: u64,
    /// Time spent sleeping between attempts, over all executions.
    pub total_backoff_ms: u64,
    pub uptime_ms: u64,
    pub methods: HashMap<String, MethodMetrics>,
    pub nodes: HashMap<String, NodeMetrics>,
    /// Retry counts keyed by reason.
    pub retry_reasons: HashMap<String, u64>,
}
