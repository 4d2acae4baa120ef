//! Transport boundary of the execution engine.
//!
//! The engine hands a transport an opaque payload, a node address, a method
//! path and an optional deadline, and gets back opaque response bytes or a
//! [`TransportError`]. It never looks inside either.
//!
//! # Components
//!
//! - **[`GrpcTransport`]**: tonic channels to real nodes, one per address
//! - **[`InProcessTransport`]**: named in-process channels backed by handlers,
//!   used by tests and local tooling
//! - **[`RawBytesCodec`]**: pass-through tonic codec so payloads go on the
//!   wire exactly as they were built

pub mod address;
pub mod codec;
pub mod grpc;
pub mod in_process;

#[cfg(test)]
mod tests;

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;

use crate::protocol::GrpcMethod;

pub use address::NodeAddress;
pub use codec::RawBytesCodec;
pub use grpc::{GrpcTransport, GrpcTransportConfig};
pub use in_process::{InProcessHandler, InProcessTransport};
pub use tonic::Code;

/// Outcome of a single unary call that did not produce a response.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// No channel could be established. The node never saw the request.
    #[error("failed to connect to {address}: {reason}")]
    Connect { address: String, reason: String },

    /// The call reached the transport layer and came back with a gRPC status.
    #[error("gRPC status {code:?}: {message}")]
    Status { code: Code, message: String },
}

impl TransportError {
    pub fn status(code: Code, message: impl Into<String>) -> Self {
        TransportError::Status {
            code,
            message: message.into(),
        }
    }
}

impl From<tonic::Status> for TransportError {
    fn from(status: tonic::Status) -> Self {
        TransportError::Status {
            code: status.code(),
            message: status.message().to_string(),
        }
    }
}

/// A way of delivering one serialized request to one node.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Sends `payload` to `method` on the node at `address`.
    ///
    /// When `deadline` is set, the call must give up with
    /// [`Code::DeadlineExceeded`] once it elapses.
    async fn unary(
        &self,
        address: &NodeAddress,
        method: &GrpcMethod,
        payload: Bytes,
        deadline: Option<Duration>,
    ) -> Result<Bytes, TransportError>;
}
