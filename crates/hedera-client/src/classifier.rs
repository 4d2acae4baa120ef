use std::fmt;

use hedera_common::Status;
use hedera_common::transport::Code;

/// What one dispatch produced, reduced to what classification needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportResult {
    /// The node answered; this is the precheck status in its response.
    Response(Status),
    /// The call failed with a gRPC status.
    Failed { code: Code, description: String },
}

/// Why an attempt is being retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryReason {
    Transport(Code),
    Status(Status),
}

impl fmt::Display for RetryReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RetryReason::Transport(code) => write!(f, "{:?}", code),
            RetryReason::Status(status) => write!(f, "{}", status),
        }
    }
}

/// Decision for one attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionOutcome {
    /// The node accepted the request with this status.
    Success(Status),
    /// Worth another attempt, probably on another node.
    Retry(RetryReason),
    /// The node rejected the request itself. Retrying will not help.
    RequestError(Status),
    /// The call failed in a way that is not transient.
    TransportError { code: Code, description: String },
}

/// Maps transport results to execution outcomes.
///
/// gRPC failures retry broadly: `UNAVAILABLE` and `RESOURCE_EXHAUSTED`
/// always, `INTERNAL` when its message contains one of the configured
/// patterns. Precheck statuses retry narrowly: only the "try again shortly"
/// set reported by [`Status::is_transient`].
///
/// Any other gRPC failure, `INTERNAL` without a matching pattern included,
/// comes back as [`ExecutionOutcome::TransportError`]. It is fatal in the same
/// way as [`ExecutionOutcome::RequestError`] but keeps the gRPC code, which a
/// precheck status cannot carry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseClassifier {
    transient_internal_patterns: Vec<String>,
}

impl ResponseClassifier {
    pub fn new<I, S>(transient_internal_patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            transient_internal_patterns: transient_internal_patterns
                .into_iter()
                .map(|pattern| pattern.as_ref().trim().to_lowercase())
                .filter(|pattern| !pattern.is_empty())
                .collect(),
        }
    }

    pub fn transient_internal_patterns(&self) -> &[String] {
        &self.transient_internal_patterns
    }

    pub fn classify(&self, result: &TransportResult) -> ExecutionOutcome {
        match result {
            TransportResult::Response(status) if status.is_success() => {
                ExecutionOutcome::Success(*status)
            }
            TransportResult::Response(status) if status.is_transient() => {
                ExecutionOutcome::Retry(RetryReason::Status(*status))
            }
            TransportResult::Response(status) => ExecutionOutcome::RequestError(*status),

            TransportResult::Failed { code, .. }
                if matches!(code, Code::Unavailable | Code::ResourceExhausted) =>
            {
                ExecutionOutcome::Retry(RetryReason::Transport(*code))
            }
            TransportResult::Failed {
                code: Code::Internal,
                description,
            } if self.is_transient_internal(description) => {
                ExecutionOutcome::Retry(RetryReason::Transport(Code::Internal))
            }
            TransportResult::Failed { code, description } => ExecutionOutcome::TransportError {
                code: *code,
                description: description.clone(),
            },
        }
    }

    fn is_transient_internal(&self, description: &str) -> bool {
        let description = description.to_lowercase();
        self.transient_internal_patterns
            .iter()
            .any(|pattern| description.contains(pattern.as_str()))
    }
}

impl Default for ResponseClassifier {
    fn default() -> Self {
        Self::new(["rst_stream", "rst stream"])
    }
}
