use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use hedera_common::AccountId;
use hedera_common::transport::NodeAddress;
use serde::{Serialize, Serializer};

/// Bounds of the per-node backoff window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeBackoffConfig {
    /// Backoff a node starts with, and never drops below.
    pub min_backoff: Duration,
    /// Ceiling for repeated failures.
    pub max_backoff: Duration,
}

impl Default for NodeBackoffConfig {
    fn default() -> Self {
        Self {
            min_backoff: Duration::from_secs(8),
            max_backoff: Duration::from_secs(60 * 60),
        }
    }
}

/// Health state of one endpoint.
///
/// Every method takes the current instant explicitly so that selection and
/// backoff behaviour can be driven deterministically.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeHealth {
    pub healthy: bool,
    pub current_backoff: Duration,
    pub last_used_at: Option<Instant>,
    /// The last attempt could not even open a channel.
    pub channel_failed: bool,
}

impl NodeHealth {
    pub fn new(config: &NodeBackoffConfig) -> Self {
        Self {
            healthy: true,
            current_backoff: config.min_backoff,
            last_used_at: None,
            channel_failed: false,
        }
    }

    pub fn mark_used_at(&mut self, now: Instant) {
        self.last_used_at = Some(now);
    }

    /// Healthy again, and the backoff shrinks by one step.
    pub fn record_success(&mut self, config: &NodeBackoffConfig) {
        self.healthy = true;
        self.current_backoff = (self.current_backoff / 2).max(config.min_backoff);
        self.channel_failed = false;
    }

    /// Unhealthy, the backoff grows by one step and its window opens at `now`.
    pub fn record_failure_at(&mut self, config: &NodeBackoffConfig, now: Instant) {
        self.healthy = false;
        self.current_backoff = self
            .current_backoff
            .checked_mul(2)
            .unwrap_or(config.max_backoff)
            .clamp(config.min_backoff, config.max_backoff);
        self.last_used_at = Some(now);
        // The node answered, so its channel works
        self.channel_failed = false;
    }

    /// Flags a connect failure. The backoff itself is left alone.
    pub fn mark_channel_failed_at(&mut self, now: Instant) {
        self.channel_failed = true;
        self.last_used_at = Some(now);
    }

    fn elapsed_at(&self, now: Instant) -> Option<Duration> {
        self.last_used_at
            .map(|used| now.saturating_duration_since(used))
    }

    /// Healthy, or the backoff window has run out and the node may be tried again.
    pub fn is_healthy_at(&self, now: Instant) -> bool {
        self.remaining_backoff_at(now).is_zero()
    }

    /// Time left until the node becomes eligible. Zero when it already is.
    pub fn remaining_backoff_at(&self, now: Instant) -> Duration {
        if self.healthy {
            return Duration::ZERO;
        }
        match self.elapsed_at(now) {
            Some(elapsed) => self.current_backoff.saturating_sub(elapsed),
            None => Duration::ZERO,
        }
    }

    /// The connect-failure flag only counts while the backoff window is open.
    pub fn channel_failed_at(&self, now: Instant) -> bool {
        self.channel_failed
            && self
                .elapsed_at(now)
                .is_some_and(|elapsed| elapsed < self.current_backoff)
    }
}

/// One physical endpoint of a consensus node.
///
/// Identity is fixed for the node's lifetime; only the health state behind
/// the mutex changes, one attempt at a time.
#[derive(Debug)]
pub struct Node {
    account_id: AccountId,
    address: NodeAddress,
    backoff: NodeBackoffConfig,
    health: Mutex<NodeHealth>,
}

impl Node {
    pub fn new(account_id: AccountId, address: NodeAddress, backoff: NodeBackoffConfig) -> Self {
        Self {
            account_id,
            address,
            backoff,
            health: Mutex::new(NodeHealth::new(&backoff)),
        }
    }

    pub fn account_id(&self) -> AccountId {
        self.account_id
    }

    pub fn address(&self) -> &NodeAddress {
        &self.address
    }

    pub fn backoff_config(&self) -> NodeBackoffConfig {
        self.backoff
    }

    fn lock(&self) -> MutexGuard<'_, NodeHealth> {
        // Health is a coarse signal, a panic mid-update leaves it usable
        self.health.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Copy of the current health state.
    pub fn health(&self) -> NodeHealth {
        self.lock().clone()
    }

    pub fn mark_used(&self) {
        self.mark_used_at(Instant::now());
    }

    pub fn mark_used_at(&self, now: Instant) {
        self.lock().mark_used_at(now);
    }

    pub fn record_success(&self) {
        self.lock().record_success(&self.backoff);
    }

    pub fn record_failure(&self) {
        self.record_failure_at(Instant::now());
    }

    pub fn record_failure_at(&self, now: Instant) {
        self.lock().record_failure_at(&self.backoff, now);
    }

    pub fn mark_channel_failed(&self) {
        self.mark_channel_failed_at(Instant::now());
    }

    pub fn mark_channel_failed_at(&self, now: Instant) {
        self.lock().mark_channel_failed_at(now);
    }

    pub fn is_healthy(&self) -> bool {
        self.is_healthy_at(Instant::now())
    }

    pub fn is_healthy_at(&self, now: Instant) -> bool {
        self.lock().is_healthy_at(now)
    }

    pub fn remaining_backoff(&self) -> Duration {
        self.remaining_backoff_at(Instant::now())
    }

    pub fn remaining_backoff_at(&self, now: Instant) -> Duration {
        self.lock().remaining_backoff_at(now)
    }

    pub fn channel_failed(&self) -> bool {
        self.channel_failed_at(Instant::now())
    }

    pub fn channel_failed_at(&self, now: Instant) -> bool {
        self.lock().channel_failed_at(now)
    }

    pub fn snapshot_at(&self, now: Instant) -> NodeHealthSnapshot {
        let health = self.lock();
        NodeHealthSnapshot {
            account_id: self.account_id,
            address: self.address.clone(),
            healthy: health.is_healthy_at(now),
            current_backoff: health.current_backoff,
            remaining_backoff: health.remaining_backoff_at(now),
            channel_failed: health.channel_failed_at(now),
        }
    }
}

/// Point-in-time view of one endpoint's health, for reporting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeHealthSnapshot {
    pub account_id: AccountId,
    pub address: NodeAddress,
    pub healthy: bool,
    #[serde(rename = "current_backoff_ms", serialize_with = "as_millis")]
    pub current_backoff: Duration,
    #[serde(rename = "remaining_backoff_ms", serialize_with = "as_millis")]
    pub remaining_backoff: Duration,
    pub channel_failed: bool,
}

fn as_millis<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(duration.as_millis() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> NodeBackoffConfig {
        NodeBackoffConfig {
            min_backoff: Duration::from_millis(250),
            max_backoff: Duration::from_secs(8),
        }
    }

    fn node() -> Node {
        Node::new(
            AccountId::from_num(3),
            NodeAddress::in_process("node-3"),
            config(),
        )
    }

    #[test]
    fn test_new_node_is_healthy() {
        let node = node();
        let health = node.health();
        assert!(health.healthy);
        assert_eq!(health.current_backoff, config().min_backoff);
        assert!(health.last_used_at.is_none());
        assert!(!health.channel_failed);
        assert!(node.is_healthy());
        assert_eq!(node.remaining_backoff(), Duration::ZERO);
    }

    #[test]
    fn test_failure_opens_backoff_window() {
        let node = node();
        let now = Instant::now();
        node.record_failure_at(now);

        let health = node.health();
        assert!(!health.healthy);
        assert_eq!(health.current_backoff, Duration::from_millis(500));
        assert_eq!(health.last_used_at, Some(now));

        assert!(!node.is_healthy_at(now));
        assert_eq!(node.remaining_backoff_at(now), Duration::from_millis(500));
        assert_eq!(
            node.remaining_backoff_at(now + Duration::from_millis(200)),
            Duration::from_millis(300)
        );
        // Window elapsed: eligible for a recheck even though still flagged unhealthy
        assert!(node.is_healthy_at(now + Duration::from_millis(500)));
        assert!(!node.health().healthy);
    }

    #[test]
    fn test_failures_double_up_to_max() {
        let node = node();
        let now = Instant::now();
        let mut previous = node.health().current_backoff;

        for _ in 0..20 {
            node.record_failure_at(now);
            let current = node.health().current_backoff;
            assert!(current >= previous);
            assert!(current <= config().max_backoff);
            previous = current;
        }

        assert_eq!(previous, config().max_backoff);
    }

    #[test]
    fn test_successes_halve_down_to_min() {
        let node = node();
        let now = Instant::now();
        for _ in 0..10 {
            node.record_failure_at(now);
        }

        let mut previous = node.health().current_backoff;
        let expected = [4000, 2000, 1000, 500, 250, 250];
        for millis in expected {
            node.record_success();
            let current = node.health().current_backoff;
            assert!(current <= previous);
            assert_eq!(current, Duration::from_millis(millis));
            previous = current;
        }
        assert!(node.health().healthy);
    }

    #[test]
    fn test_mark_used_does_not_change_health() {
        let node = node();
        let now = Instant::now();
        node.mark_used_at(now);

        let health = node.health();
        assert!(health.healthy);
        assert_eq!(health.last_used_at, Some(now));
        assert_eq!(health.current_backoff, config().min_backoff);
    }

    #[test]
    fn test_channel_failed_flag_lasts_for_backoff_window() {
        let node = node();
        let now = Instant::now();
        node.mark_channel_failed_at(now);

        assert!(node.channel_failed_at(now));
        assert!(node.channel_failed_at(now + Duration::from_millis(249)));
        assert!(!node.channel_failed_at(now + Duration::from_millis(250)));
        // Connect failures do not touch the backoff
        assert_eq!(node.health().current_backoff, config().min_backoff);
        assert!(node.health().healthy);
    }

    #[test]
    fn test_success_clears_channel_failed() {
        let node = node();
        let now = Instant::now();
        node.mark_channel_failed_at(now);
        node.record_success();
        assert!(!node.channel_failed_at(now));
    }

    #[test]
    fn test_snapshot_serializes_millis() {
        let node = node();
        let now = Instant::now();
        node.record_failure_at(now);

        let snapshot = node.snapshot_at(now + Duration::from_millis(100));
        assert!(!snapshot.healthy);
        assert_eq!(snapshot.remaining_backoff, Duration::from_millis(400));

        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["account_id"], "0.0.3");
        assert_eq!(json["address"], "in-process:node-3");
        assert_eq!(json["current_backoff_ms"], 500);
        assert_eq!(json["remaining_backoff_ms"], 400);
    }
}
