use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tonic::Code;

use super::{NodeAddress, Transport, TransportError};
use crate::protocol::GrpcMethod;

/// Answers every call made to one in-process channel.
pub type InProcessHandler =
    Arc<dyn Fn(&GrpcMethod, Bytes) -> Result<Bytes, TransportError> + Send + Sync>;

/// Transport for `in-process:<name>` addresses.
///
/// Each name is bound to a handler. Calling a name with nothing bound looks
/// exactly like a node that refuses connections.
#[derive(Clone, Default)]
pub struct InProcessTransport {
    handlers: Arc<RwLock<HashMap<String, InProcessHandler>>>,
}

impl InProcessTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `handler` to the channel `name`, replacing any earlier one.
    pub fn register<F>(&self, name: impl Into<String>, handler: F)
    where
        F: Fn(&GrpcMethod, Bytes) -> Result<Bytes, TransportError> + Send + Sync + 'static,
    {
        let name = name.into();
        tracing::trace!(channel = %name, "Registered in-process handler");
        self.handlers
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(name, Arc::new(handler));
    }

    /// Unbinds `name`. Later calls fail to connect.
    pub fn unregister(&self, name: &str) -> bool {
        self.handlers
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(name)
            .is_some()
    }

    fn handler(&self, address: &NodeAddress) -> Result<InProcessHandler, TransportError> {
        let name = match address {
            NodeAddress::InProcess(name) => name,
            NodeAddress::Grpc { .. } => {
                return Err(TransportError::Connect {
                    address: address.to_string(),
                    reason: "not an in-process address".to_string(),
                });
            }
        };

        self.handlers
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(name)
            .cloned()
            .ok_or_else(|| TransportError::Connect {
                address: address.to_string(),
                reason: "no handler bound to this channel".to_string(),
            })
    }
}

#[async_trait]
impl Transport for InProcessTransport {
    async fn unary(
        &self,
        address: &NodeAddress,
        method: &GrpcMethod,
        payload: Bytes,
        deadline: Option<Duration>,
    ) -> Result<Bytes, TransportError> {
        let handler = self.handler(address)?;

        // Yield so concurrent requests interleave the way network calls would
        let call = async move {
            tokio::task::yield_now().await;
            handler(method, payload)
        };

        match deadline {
            Some(deadline) => tokio::time::timeout(deadline, call)
                .await
                .unwrap_or_else(|_| {
                    Err(TransportError::status(
                        Code::DeadlineExceeded,
                        format!("no response within {}ms", deadline.as_millis()),
                    ))
                }),
            None => call.await,
        }
    }
}
