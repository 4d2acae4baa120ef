use std::fmt;
use std::time::Duration;

use super::AccountId;
use super::error::{HederaError, Result};

/// Fully qualified gRPC method path, e.g. `/proto.CryptoService/cryptoTransfer`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GrpcMethod(String);

impl GrpcMethod {
    /// Validates that the path looks like `/package.Service/method`.
    pub fn new(path: impl Into<String>) -> Result<Self> {
        let path = path.into();
        let valid = path.starts_with('/')
            && path[1..].split('/').count() == 2
            && path[1..].split('/').all(|segment| !segment.is_empty());

        if !valid {
            return Err(HederaError::InvalidConfig(format!(
                "gRPC method must look like /package.Service/method, got '{}'",
                path
            )));
        }

        Ok(Self(path))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GrpcMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Routing and budget overrides attached to a single request.
///
/// Unset fields fall back to the client's configuration at execution time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestOptions {
    /// Nodes this request may be sent to, in preference order.
    pub node_account_ids: Option<Vec<AccountId>>,
    pub max_attempts: Option<u32>,
    pub min_backoff: Option<Duration>,
    pub max_backoff: Option<Duration>,
    /// Deadline for each individual gRPC call.
    pub grpc_deadline: Option<Duration>,
    /// Deadline for the whole execution, retries and backoff included.
    pub request_timeout: Option<Duration>,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_node_account_ids(mut self, ids: impl IntoIterator<Item = AccountId>) -> Self {
        self.node_account_ids = Some(ids.into_iter().collect());
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }

    pub fn with_min_backoff(mut self, backoff: Duration) -> Self {
        self.min_backoff = Some(backoff);
        self
    }

    pub fn with_max_backoff(mut self, backoff: Duration) -> Self {
        self.max_backoff = Some(backoff);
        self
    }

    pub fn with_grpc_deadline(mut self, deadline: Duration) -> Self {
        self.grpc_deadline = Some(deadline);
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }
}
