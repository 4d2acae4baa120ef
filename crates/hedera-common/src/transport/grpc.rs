use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::Mutex;
use tokio::time::{Instant, timeout_at};
use tonic::Code;
use tonic::codegen::http::uri::PathAndQuery;
use tonic::transport::{Channel, Endpoint};

use super::{NodeAddress, RawBytesCodec, Transport, TransportError};
use crate::protocol::GrpcMethod;

/// Connection settings for [`GrpcTransport`].
#[derive(Debug, Clone)]
pub struct GrpcTransportConfig {
    /// How long establishing a channel may take before the node counts as
    /// failed-to-connect. A shorter per-call deadline takes precedence.
    pub connect_timeout: Duration,
    /// TCP keep-alive for established channels.
    pub tcp_keepalive: Option<Duration>,
}

impl Default for GrpcTransportConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            tcp_keepalive: Some(Duration::from_secs(30)),
        }
    }
}

/// Transport that talks to real nodes over tonic channels.
///
/// One channel is kept per address and shared by every request to that
/// address. A tonic channel multiplexes concurrent calls and reconnects on
/// its own, so the cache only ever grows by new addresses; a channel is
/// evicted when it stops becoming ready.
#[derive(Clone)]
pub struct GrpcTransport {
    config: GrpcTransportConfig,
    channels: Arc<Mutex<HashMap<NodeAddress, Channel>>>,
}

impl GrpcTransport {
    pub fn new() -> Self {
        Self::with_config(GrpcTransportConfig::default())
    }

    pub fn with_config(config: GrpcTransportConfig) -> Self {
        Self {
            config,
            channels: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Returns the cached channel for `address`, connecting if there is none.
    async fn channel(&self, address: &NodeAddress) -> Result<Channel, TransportError> {
        if let Some(channel) = self.channels.lock().await.get(address) {
            return Ok(channel.clone());
        }

        let connect_error = |reason: String| TransportError::Connect {
            address: address.to_string(),
            reason,
        };

        let uri = address
            .to_uri()
            .ok_or_else(|| connect_error("in-process channels need an in-process transport".to_string()))?;

        let endpoint = Endpoint::from_shared(uri)
            .map_err(|e| connect_error(e.to_string()))?
            .connect_timeout(self.config.connect_timeout)
            .tcp_keepalive(self.config.tcp_keepalive);

        // Connect without holding the lock
        let channel = endpoint
            .connect()
            .await
            .map_err(|e| connect_error(e.to_string()))?;

        tracing::debug!(address = %address, "Opened gRPC channel");

        let mut channels = self.channels.lock().await;
        Ok(channels.entry(address.clone()).or_insert(channel).clone())
    }

    async fn evict(&self, address: &NodeAddress) {
        if self.channels.lock().await.remove(address).is_some() {
            tracing::debug!(address = %address, "Evicted gRPC channel");
        }
    }
}

impl Default for GrpcTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for GrpcTransport {
    async fn unary(
        &self,
        address: &NodeAddress,
        method: &GrpcMethod,
        payload: Bytes,
        deadline: Option<Duration>,
    ) -> Result<Bytes, TransportError> {
        let path = PathAndQuery::try_from(method.as_str())
            .map_err(|e| TransportError::status(Code::InvalidArgument, e.to_string()))?;

        // One deadline covers connecting, waiting for readiness and the call
        let expires = deadline.map(|deadline| Instant::now() + deadline);

        let connect = async {
            let channel = self.channel(address).await?;
            let mut grpc = tonic::client::Grpc::new(channel);
            if let Err(e) = grpc.ready().await {
                self.evict(address).await;
                return Err(TransportError::Connect {
                    address: address.to_string(),
                    reason: e.to_string(),
                });
            }
            Ok::<_, TransportError>(grpc)
        };
        let mut grpc = match (expires, deadline) {
            (Some(expires), Some(deadline)) => timeout_at(expires, connect).await.map_err(|_| {
                TransportError::Connect {
                    address: address.to_string(),
                    reason: format!("not connected within {}ms", deadline.as_millis()),
                }
            })??,
            _ => connect.await?,
        };

        let mut request = tonic::Request::new(payload);
        if let Some(expires) = expires {
            request.set_timeout(expires.saturating_duration_since(Instant::now()));
        }

        let call = grpc.unary(request, path, RawBytesCodec);
        let response = match (expires, deadline) {
            (Some(expires), Some(deadline)) => timeout_at(expires, call).await.map_err(|_| {
                TransportError::status(
                    Code::DeadlineExceeded,
                    format!("no response within {}ms", deadline.as_millis()),
                )
            })?,
            _ => call.await,
        };

        response
            .map(tonic::Response::into_inner)
            .map_err(TransportError::from)
    }
}
