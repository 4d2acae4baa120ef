use std::time::Duration;

use thiserror::Error;
use tonic::Code;

use super::{AccountId, Status};

#[derive(Error, Debug)]
pub enum HederaError {
    /// The receiving node rejected the request at precheck with a
    /// non-transient status.
    #[error("Precheck failed on node {node}: {status}")]
    PrecheckStatus { status: Status, node: AccountId },

    /// gRPC status that is not worth retrying.
    #[error("gRPC error from node {node}: {code:?}: {message}")]
    GrpcStatus {
        code: Code,
        message: String,
        node: AccountId,
    },

    /// Every attempt came back retriable and the budget ran out.
    #[error("Max attempts ({attempts}) exceeded{}", describe_last(.last_error))]
    MaxAttemptsExceeded {
        attempts: u32,
        last_error: Option<Box<HederaError>>,
    },

    #[error("Request timed out after {}ms{}", .timeout.as_millis(), describe_last(.last_error))]
    TimedOut {
        timeout: Duration,
        last_error: Option<Box<HederaError>>,
    },

    #[error("No healthy nodes available for this request")]
    NoHealthyNodes,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The transport could not open a channel to the node.
    #[error("Connection error to {address}: {reason}")]
    Connection { address: String, reason: String },

    #[error("Invalid account id: {0}")]
    InvalidAccountId(String),

    #[error("Invalid node address: {0}")]
    InvalidAddress(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Failed to decode response: {0}")]
    Decode(#[from] prost::DecodeError),

    #[error("Blocking execution was called from inside an async runtime")]
    BlockingInAsyncContext,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl HederaError {
    /// Whether an execution that ended with this error could succeed if the
    /// caller simply tried again later.
    pub fn is_retriable(&self) -> bool {
        matches!(self, HederaError::Connection { .. })
    }

    /// The precheck status carried by this error, looking through the last
    /// cause of exhausted or timed-out executions.
    pub fn status(&self) -> Option<Status> {
        match self {
            HederaError::PrecheckStatus { status, .. } => Some(*status),
            HederaError::MaxAttemptsExceeded { last_error, .. }
            | HederaError::TimedOut { last_error, .. } => {
                last_error.as_ref().and_then(|e| e.status())
            }
            _ => None,
        }
    }
}

fn describe_last(last_error: &Option<Box<HederaError>>) -> String {
    match last_error {
        Some(err) => format!("; last error: {}", err),
        None => String::new(),
    }
}

pub type Result<T> = std::result::Result<T, HederaError>;
