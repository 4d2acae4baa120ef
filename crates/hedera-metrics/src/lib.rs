//! Hedera Execution Telemetry
//!
//! Retry, backoff and latency metrics for the execution engine.
//!
//! # Architecture
//!
//! - [`MetricsRegistry`]: thread-safe storage with lock-free counters and a
//!   log-bucketed latency histogram per gRPC method
//! - [`MetricsCollector`]: the hooks the execution engine calls per attempt,
//!   per retry and per finished execution
//! - [`MetricsSnapshot`]: serializable point-in-time copy of everything
//!
//! # Usage Example
//!
//! ```rust
//! use hedera_metrics::{ClientMetricsCollector, MetricsCollector};
//! use std::time::Instant;
//!
//! let collector = ClientMetricsCollector::new();
//! let start = Instant::now();
//! collector.record_attempt("0.0.3", "/proto.CryptoService/getAccountInfo");
//! collector.record_call("/proto.CryptoService/getAccountInfo", start, true);
//!
//! let snapshot = collector.snapshot();
//! println!("p99: {}us", snapshot.methods["/proto.CryptoService/getAccountInfo"].p99_latency_us);
//! ```

mod collector;
mod registry;
mod snapshot;

pub use collector::{ClientMetricsCollector, MetricsCollector};
pub use registry::MetricsRegistry;
pub use snapshot::{MethodMetrics, MetricsSnapshot, NodeMetrics};
