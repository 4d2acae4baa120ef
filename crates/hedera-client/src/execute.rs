//! The execution state machine shared by every request kind and surface.
//!
//! One call to [`Executor::execute`] runs one request to completion:
//!
//! ```text
//! Init -> SelectNode -> Dispatch -> Classify -+-> Success
//!            ^                                |-> RequestError (fatal)
//!            |                                |-> AttemptsExhausted (fatal)
//!            +------------- Retry <-----------+
//! ```
//!
//! A node's health, last-used stamp included, only changes once an
//! attempt's transport call has returned. An execution dropped, aborted or
//! timed out mid-attempt leaves the node it was talking to untouched.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use hedera_common::transport::{Transport, TransportError};
use hedera_common::{AccountId, GrpcMethod, HederaError, RequestOptions, Result, Status};
use hedera_metrics::MetricsCollector;
use hedera_network::{Network, Node, select_node};
use tracing::{debug, error, warn};

use crate::classifier::{ExecutionOutcome, ResponseClassifier, RetryReason, TransportResult};
use crate::config::ExecutionSettings;

/// A request the engine can execute.
///
/// The engine never looks inside payloads. A request kind supplies its bytes
/// once, tells the engine how to read the precheck status out of a response,
/// and turns the final response into its output.
pub trait Execute: Send + Sync {
    type Output: Send;

    /// gRPC method the request is sent to.
    fn method(&self) -> &GrpcMethod;

    /// Routing and budget overrides for this request.
    fn options(&self) -> &RequestOptions;

    /// Serialized request. Built once per execution and resent unchanged on
    /// every attempt.
    fn make_request(&self) -> Bytes;

    /// Precheck status carried by a response body.
    fn response_status(&self, response: &[u8]) -> Result<Status>;

    /// Output for a response the engine accepted.
    fn make_response(&self, response: Bytes, node: AccountId, status: Status) -> Result<Self::Output>;
}

/// Ephemeral per-execution state.
struct AttemptContext {
    /// Attempts that reached a node and were classified.
    attempts: u32,
    max_attempts: u32,
    /// Delay before the next retry.
    backoff: Duration,
    max_backoff: Duration,
    /// Candidates passed over since the last real dispatch.
    skipped: HashSet<usize>,
    last_error: Option<HederaError>,
}

impl AttemptContext {
    fn new(settings: &ExecutionSettings) -> Self {
        Self {
            attempts: 0,
            max_attempts: settings.max_attempts,
            backoff: settings.min_backoff,
            max_backoff: settings.max_backoff,
            skipped: HashSet::new(),
            last_error: None,
        }
    }

    /// Current delay; the one after it is doubled up to the cap.
    fn next_backoff(&mut self) -> Duration {
        let delay = self.backoff;
        self.backoff = self
            .backoff
            .checked_mul(2)
            .unwrap_or(self.max_backoff)
            .min(self.max_backoff);
        delay
    }

    fn exhausted(&mut self) -> HederaError {
        HederaError::MaxAttemptsExceeded {
            attempts: self.attempts,
            last_error: self.last_error.take().map(Box::new),
        }
    }
}

/// Everything an execution needs, shared by all executions of one client.
pub struct Executor {
    network: Arc<Network>,
    transport: Arc<dyn Transport>,
    classifier: ResponseClassifier,
    metrics: Arc<dyn MetricsCollector>,
    settings: ExecutionSettings,
    default_nodes: Option<Vec<AccountId>>,
}

impl Executor {
    pub fn new(
        network: Arc<Network>,
        transport: Arc<dyn Transport>,
        classifier: ResponseClassifier,
        metrics: Arc<dyn MetricsCollector>,
        settings: ExecutionSettings,
        default_nodes: Option<Vec<AccountId>>,
    ) -> Self {
        Self {
            network,
            transport,
            classifier,
            metrics,
            settings,
            default_nodes,
        }
    }

    pub fn network(&self) -> &Arc<Network> {
        &self.network
    }

    pub fn metrics(&self) -> &Arc<dyn MetricsCollector> {
        &self.metrics
    }

    pub fn settings(&self) -> &ExecutionSettings {
        &self.settings
    }

    /// Runs `request` until it succeeds, fails fatally, runs out of attempts
    /// or runs out of time.
    ///
    /// Configuration problems (bad overrides, no candidate nodes) are
    /// reported before anything is sent.
    pub async fn execute<E: Execute + ?Sized>(&self, request: &E) -> Result<E::Output> {
        let options = request.options();
        let settings = self.settings.with_overrides(options)?;
        let pinned = options
            .node_account_ids
            .as_deref()
            .or(self.default_nodes.as_deref());

        // Hold this view for the whole execution so a refresh cannot swap
        // nodes out from under it
        let view = self.network.view();
        let candidates = view.candidates(pinned)?;

        let method = request.method();
        let payload = request.make_request();
        let start = Instant::now();
        let mut ctx = AttemptContext::new(&settings);

        let result = match settings.request_timeout {
            Some(timeout) => {
                let run = tokio::time::timeout(
                    timeout,
                    self.run_attempts(request, &candidates, &payload, &settings, &mut ctx),
                )
                .await;

                match run {
                    Ok(result) => result,
                    Err(_) => Err(HederaError::TimedOut {
                        timeout,
                        last_error: ctx.last_error.take().map(Box::new),
                    }),
                }
            }
            None => {
                self.run_attempts(request, &candidates, &payload, &settings, &mut ctx)
                    .await
            }
        };

        if let Err(e) = &result {
            error!(method = %method, attempts = ctx.attempts, error = %e, "Request failed");
        }
        self.metrics.record_call(method.as_str(), start, result.is_ok());
        result
    }

    async fn run_attempts<E: Execute + ?Sized>(
        &self,
        request: &E,
        candidates: &[Arc<Node>],
        payload: &Bytes,
        settings: &ExecutionSettings,
        ctx: &mut AttemptContext,
    ) -> Result<E::Output> {
        let method = request.method();

        loop {
            let now = Instant::now();
            let Some(index) = select_node(candidates, &ctx.skipped, self.network.rotation(), now)
            else {
                // A full pass found nothing but dead channels
                return Err(ctx.exhausted());
            };
            let node = &candidates[index];
            let node_id = node.account_id();

            if node.channel_failed_at(now) {
                debug!(node = %node_id, address = %node.address(), "Skipping node whose channel failed to connect");
                ctx.skipped.insert(index);
                self.metrics.record_skip(&node_id.to_string());
                self.network.advance_rotation();
                continue;
            }

            let attempt = ctx.attempts + 1;
            debug!(
                method = %method,
                node = %node_id,
                attempt,
                max_attempts = ctx.max_attempts,
                "Dispatching request"
            );

            self.metrics.record_attempt(&node_id.to_string(), method.as_str());
            let response = self
                .transport
                .unary(node.address(), method, payload.clone(), settings.grpc_deadline)
                .await;
            node.mark_used();
            self.network.advance_rotation();

            let (body, result) = match response {
                Ok(body) => match request.response_status(&body) {
                    Ok(status) => (Some(body), TransportResult::Response(status)),
                    Err(e) => {
                        node.record_failure();
                        return Err(e);
                    }
                },
                Err(TransportError::Connect { address, reason }) => {
                    debug!(node = %node_id, address = %address, reason = %reason, "Channel failed to connect");
                    node.mark_channel_failed();
                    ctx.skipped.insert(index);
                    ctx.last_error = Some(HederaError::Connection { address, reason });
                    continue;
                }
                Err(TransportError::Status { code, message }) => (
                    None,
                    TransportResult::Failed {
                        code,
                        description: message,
                    },
                ),
            };

            ctx.attempts = attempt;
            ctx.skipped.clear();

            match self.classifier.classify(&result) {
                ExecutionOutcome::Success(status) => {
                    node.record_success();
                    debug!(node = %node_id, attempt, status = %status, "Request accepted");
                    return request.make_response(body.unwrap_or_default(), node_id, status);
                }
                ExecutionOutcome::Retry(reason) => {
                    node.record_failure();
                    ctx.last_error = Some(retry_error(reason, result, node_id));

                    if ctx.attempts >= ctx.max_attempts {
                        return Err(ctx.exhausted());
                    }

                    let delay = ctx.next_backoff();
                    warn!(
                        node = %node_id,
                        attempt,
                        reason = %reason,
                        backoff_ms = delay.as_millis() as u64,
                        "Retrying request"
                    );
                    self.metrics
                        .record_retry(&node_id.to_string(), &reason.to_string(), delay);
                    tokio::time::sleep(delay).await;
                }
                ExecutionOutcome::RequestError(status) => {
                    node.record_failure();
                    return Err(HederaError::PrecheckStatus {
                        status,
                        node: node_id,
                    });
                }
                ExecutionOutcome::TransportError { code, description } => {
                    node.record_failure();
                    return Err(HederaError::GrpcStatus {
                        code,
                        message: description,
                        node: node_id,
                    });
                }
            }
        }
    }
}

/// The error a retried attempt leaves behind, reported if it was the last one.
fn retry_error(reason: RetryReason, result: TransportResult, node: AccountId) -> HederaError {
    match (reason, result) {
        (_, TransportResult::Failed { code, description }) => HederaError::GrpcStatus {
            code,
            message: description,
            node,
        },
        (RetryReason::Status(status), _) | (_, TransportResult::Response(status)) => {
            HederaError::PrecheckStatus { status, node }
        }
    }
}
