use crate::snapshot::{MethodMetrics, MetricsSnapshot, NodeMetrics};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::{Duration, Instant};

/// Decades of microseconds covered by the histogram: 1us up to ~16 minutes.
const DECADES: usize = 9;
const BINS_PER_DECADE: usize = 9;
const NUM_HISTOGRAM_BINS: usize = DECADES * BINS_PER_DECADE;

/// Logarithmic latency histogram for percentile estimation.
///
/// Each decade of microseconds is split into nine bins by leading digit,
/// so bin `d * 9 + (k - 1)` holds samples in `[k * 10^d, (k + 1) * 10^d)`.
/// Anything past the last decade lands in the last bin.
///
/// Recording is a handful of relaxed atomic adds; percentiles are a linear
/// scan over the bins with interpolation inside the bin that holds the rank.
#[derive(Debug)]
struct LatencyHistogram {
    bins: [AtomicU64; NUM_HISTOGRAM_BINS],
    total_latency: AtomicU64,
    sample_count: AtomicU64,
}

impl LatencyHistogram {
    fn new() -> Self {
        Self {
            bins: std::array::from_fn(|_| AtomicU64::new(0)),
            total_latency: AtomicU64::new(0),
            sample_count: AtomicU64::new(0),
        }
    }

    fn record(&self, latency_us: u64) {
        self.bins[Self::latency_to_bin(latency_us)].fetch_add(1, Ordering::Relaxed);
        self.total_latency.fetch_add(latency_us, Ordering::Relaxed);
        self.sample_count.fetch_add(1, Ordering::Relaxed);
    }

    fn latency_to_bin(latency_us: u64) -> usize {
        if latency_us == 0 {
            return 0;
        }

        let decade = latency_us.ilog10() as usize;
        if decade >= DECADES {
            return NUM_HISTOGRAM_BINS - 1;
        }

        let leading_digit = (latency_us / 10u64.pow(decade as u32)) as usize;
        decade * BINS_PER_DECADE + leading_digit - 1
    }

    /// Inclusive lower and exclusive upper bound of a bin, in microseconds.
    fn bin_bounds(bin: usize) -> (u64, u64) {
        let decade = (bin / BINS_PER_DECADE) as u32;
        let leading_digit = (bin % BINS_PER_DECADE + 1) as u64;
        let step = 10u64.pow(decade);
        (leading_digit * step, (leading_digit + 1) * step)
    }

    /// Latency at `percentile` (0-100), 0 when empty.
    fn estimate_percentile(&self, percentile: u64) -> u64 {
        let total = self.sample_count.load(Ordering::Relaxed);
        if total == 0 {
            return 0;
        }

        let target = (total * percentile).div_ceil(100).max(1);
        let mut cumulative = 0;

        for (bin, count) in self.bins.iter().enumerate() {
            let count = count.load(Ordering::Relaxed);
            if count > 0 && cumulative + count >= target {
                let (start, end) = Self::bin_bounds(bin);
                let fraction = (target - cumulative) as f64 / count as f64;
                return start + ((end - start) as f64 * fraction) as u64;
            }
            cumulative += count;
        }

        Self::bin_bounds(NUM_HISTOGRAM_BINS - 1).1
    }

    /// `(avg, p50, p95, p99)` in microseconds.
    fn calculate_percentiles(&self) -> (u64, u64, u64, u64) {
        let total = self.sample_count.load(Ordering::Relaxed);
        if total == 0 {
            return (0, 0, 0, 0);
        }

        let avg = self.total_latency.load(Ordering::Relaxed) / total;
        (
            avg,
            self.estimate_percentile(50),
            self.estimate_percentile(95),
            self.estimate_percentile(99),
        )
    }
}

#[derive(Debug)]
struct MethodStats {
    call_count: AtomicU64,
    success_count: AtomicU64,
    failure_count: AtomicU64,
    attempt_count: AtomicU64,
    latencies: LatencyHistogram,
}

impl MethodStats {
    fn new() -> Self {
        Self {
            call_count: AtomicU64::new(0),
            success_count: AtomicU64::new(0),
            failure_count: AtomicU64::new(0),
            attempt_count: AtomicU64::new(0),
            latencies: LatencyHistogram::new(),
        }
    }

    fn snapshot(&self) -> MethodMetrics {
        let (avg_latency_us, p50_latency_us, p95_latency_us, p99_latency_us) =
            self.latencies.calculate_percentiles();

        MethodMetrics {
            call_count: self.call_count.load(Ordering::Relaxed),
            success_count: self.success_count.load(Ordering::Relaxed),
            failure_count: self.failure_count.load(Ordering::Relaxed),
            attempt_count: self.attempt_count.load(Ordering::Relaxed),
            avg_latency_us,
            p50_latency_us,
            p95_latency_us,
            p99_latency_us,
        }
    }
}

#[derive(Debug, Default)]
struct NodeStats {
    request_count: AtomicU64,
    retry_count: AtomicU64,
    skip_count: AtomicU64,
}

impl NodeStats {
    fn snapshot(&self) -> NodeMetrics {
        NodeMetrics {
            request_count: self.request_count.load(Ordering::Relaxed),
            retry_count: self.retry_count.load(Ordering::Relaxed),
            skip_count: self.skip_count.load(Ordering::Relaxed),
        }
    }
}

/// Thread-safe store for execution telemetry.
///
/// Counters are relaxed atomics; the per-method and per-node maps sit
/// behind `RwLock`s that are only written when a new key first shows up.
/// Keys are bounded by the configured network and the methods in use, so
/// nothing is ever evicted.
#[derive(Debug)]
pub struct MetricsRegistry {
    start_time: Instant,
    total_requests: AtomicU64,
    successful_requests: AtomicU64,
    failed_requests: AtomicU64,
    total_attempts: AtomicU64,
    total_retries: AtomicU64,
    total_backoff_ms: AtomicU64,
    methods: RwLock<HashMap<String, Arc<MethodStats>>>,
    nodes: RwLock<HashMap<String, Arc<NodeStats>>>,
    retry_reasons: RwLock<HashMap<String, Arc<AtomicU64>>>,
}

/// Returns the entry for `key`, creating it under the write lock if needed.
fn entry<T>(map: &RwLock<HashMap<String, Arc<T>>>, key: &str, make: impl FnOnce() -> T) -> Arc<T> {
    if let Some(existing) = map.read().unwrap_or_else(PoisonError::into_inner).get(key) {
        return existing.clone();
    }

    map.write()
        .unwrap_or_else(PoisonError::into_inner)
        .entry(key.to_string())
        .or_insert_with(|| Arc::new(make()))
        .clone()
}

fn snapshot_map<T, U>(map: &RwLock<HashMap<String, Arc<T>>>, f: impl Fn(&T) -> U) -> HashMap<String, U> {
    map.read()
        .unwrap_or_else(PoisonError::into_inner)
        .iter()
        .map(|(key, value)| (key.clone(), f(value)))
        .collect()
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            total_requests: AtomicU64::new(0),
            successful_requests: AtomicU64::new(0),
            failed_requests: AtomicU64::new(0),
            total_attempts: AtomicU64::new(0),
            total_retries: AtomicU64::new(0),
            total_backoff_ms: AtomicU64::new(0),
            methods: RwLock::new(HashMap::new()),
            nodes: RwLock::new(HashMap::new()),
            retry_reasons: RwLock::new(HashMap::new()),
        }
    }

    pub fn uptime_ms(&self) -> u64 {
        self.start_time.elapsed().as_millis() as u64
    }

    /// Records one dispatch of `method` to `node`.
    pub fn record_attempt(&self, node: &str, method: &str) {
        self.total_attempts.fetch_add(1, Ordering::Relaxed);
        entry(&self.nodes, node, NodeStats::default)
            .request_count
            .fetch_add(1, Ordering::Relaxed);
        entry(&self.methods, method, MethodStats::new)
            .attempt_count
            .fetch_add(1, Ordering::Relaxed);
    }

    /// Records a retry decision and the backoff slept before the next attempt.
    pub fn record_retry(&self, node: &str, reason: &str, backoff: Duration) {
        self.total_retries.fetch_add(1, Ordering::Relaxed);
        self.total_backoff_ms
            .fetch_add(backoff.as_millis() as u64, Ordering::Relaxed);
        entry(&self.nodes, node, NodeStats::default)
            .retry_count
            .fetch_add(1, Ordering::Relaxed);
        entry(&self.retry_reasons, reason, || AtomicU64::new(0)).fetch_add(1, Ordering::Relaxed);
    }

    /// Records a node passed over because its channel failed to connect.
    pub fn record_skip(&self, node: &str) {
        entry(&self.nodes, node, NodeStats::default)
            .skip_count
            .fetch_add(1, Ordering::Relaxed);
    }

    /// Records a finished execution.
    pub fn record_method_call(&self, method: &str, latency_us: u64, success: bool) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        let stats = entry(&self.methods, method, MethodStats::new);
        stats.call_count.fetch_add(1, Ordering::Relaxed);
        stats.latencies.record(latency_us);

        if success {
            self.successful_requests.fetch_add(1, Ordering::Relaxed);
            stats.success_count.fetch_add(1, Ordering::Relaxed);
        } else {
            self.failed_requests.fetch_add(1, Ordering::Relaxed);
            stats.failure_count.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            total_requests: self.total_requests.load(Ordering::Relaxed),
            successful_requests: self.successful_requests.load(Ordering::Relaxed),
            failed_requests: self.failed_requests.load(Ordering::Relaxed),
            total_attempts: self.total_attempts.load(Ordering::Relaxed),
            total_retries: self.total_retries.load(Ordering::Relaxed),
            total_backoff_ms: self.total_backoff_ms.load(Ordering::Relaxed),
            uptime_ms: self.uptime_ms(),
            methods: snapshot_map(&self.methods, MethodStats::snapshot),
            nodes: snapshot_map(&self.nodes, NodeStats::snapshot),
            retry_reasons: snapshot_map(&self.retry_reasons, |count| count.load(Ordering::Relaxed)),
        }
    }
}

impl Default for MetricsRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    // ============================================================================
    // Histogram
    // ============================================================================

    #[test]
    fn test_bins_cover_leading_digits() {
        assert_eq!(LatencyHistogram::latency_to_bin(0), 0);
        assert_eq!(LatencyHistogram::latency_to_bin(1), 0);
        assert_eq!(LatencyHistogram::latency_to_bin(9), 8);
        assert_eq!(LatencyHistogram::latency_to_bin(10), 9);
        assert_eq!(LatencyHistogram::latency_to_bin(1_500), 27);
        assert_eq!(LatencyHistogram::latency_to_bin(u64::MAX), NUM_HISTOGRAM_BINS - 1);

        for latency in [1, 7, 42, 999, 1_000, 65_432, 8_000_000] {
            let (start, end) = LatencyHistogram::bin_bounds(LatencyHistogram::latency_to_bin(latency));
            assert!(start <= latency && latency < end, "{} not in [{}, {})", latency, start, end);
        }
    }

    #[test]
    fn test_empty_histogram() {
        let histogram = LatencyHistogram::new();
        assert_eq!(histogram.calculate_percentiles(), (0, 0, 0, 0));
    }

    #[test]
    fn test_percentiles_follow_distribution() {
        let histogram = LatencyHistogram::new();
        // 90 fast attempts at ~1ms, 10 slow ones at ~250ms after retries
        for _ in 0..90 {
            histogram.record(1_000);
        }
        for _ in 0..10 {
            histogram.record(250_000);
        }

        let (avg, p50, p95, p99) = histogram.calculate_percentiles();
        assert_eq!(avg, (90 * 1_000 + 10 * 250_000) / 100);
        assert!((1_000..2_000).contains(&p50), "p50 = {}", p50);
        assert!((200_000..300_000).contains(&p95), "p95 = {}", p95);
        assert!((200_000..300_000).contains(&p99), "p99 = {}", p99);
    }

    // ============================================================================
    // Registry
    // ============================================================================

    #[test]
    fn test_attempts_and_retries() {
        let registry = MetricsRegistry::new();
        let method = "/proto.CryptoService/cryptoTransfer";

        registry.record_attempt("0.0.3", method);
        registry.record_retry("0.0.3", "UNAVAILABLE", Duration::from_millis(250));
        registry.record_attempt("0.0.4", method);
        registry.record_retry("0.0.4", "BUSY", Duration::from_millis(500));
        registry.record_skip("0.0.5");
        registry.record_attempt("0.0.6", method);
        registry.record_method_call(method, 800_000, true);

        let snapshot = registry.snapshot();
        assert_eq!(snapshot.total_requests, 1);
        assert_eq!(snapshot.successful_requests, 1);
        assert_eq!(snapshot.total_attempts, 3);
        assert_eq!(snapshot.total_retries, 2);
        assert_eq!(snapshot.total_backoff_ms, 750);
        assert_eq!(snapshot.retry_reasons["UNAVAILABLE"], 1);
        assert_eq!(snapshot.retry_reasons["BUSY"], 1);

        assert_eq!(snapshot.nodes["0.0.3"].request_count, 1);
        assert_eq!(snapshot.nodes["0.0.3"].retry_count, 1);
        assert_eq!(snapshot.nodes["0.0.5"].skip_count, 1);
        assert_eq!(snapshot.nodes["0.0.5"].request_count, 0);

        let methods = &snapshot.methods[method];
        assert_eq!(methods.call_count, 1);
        assert_eq!(methods.attempt_count, 3);
        assert_eq!(methods.success_count, 1);
    }

    #[test]
    fn test_failed_call_counted() {
        let registry = MetricsRegistry::new();
        registry.record_method_call("/proto.Q/get", 10, false);
        let snapshot = registry.snapshot();
        assert_eq!(snapshot.failed_requests, 1);
        assert_eq!(snapshot.methods["/proto.Q/get"].failure_count, 1);
    }

    #[test]
    fn test_concurrent_recording() {
        let registry = Arc::new(MetricsRegistry::new());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let registry = registry.clone();
                thread::spawn(move || {
                    let node = format!("0.0.{}", 3 + i % 2);
                    for _ in 0..1000 {
                        registry.record_attempt(&node, "/proto.Q/get");
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        let snapshot = registry.snapshot();
        assert_eq!(snapshot.total_attempts, 8000);
        assert_eq!(snapshot.nodes["0.0.3"].request_count, 4000);
        assert_eq!(snapshot.nodes["0.0.4"].request_count, 4000);
    }
}
