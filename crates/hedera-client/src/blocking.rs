//! Blocking surface over the async client.
//!
//! [`BlockingClient`] owns a Tokio runtime and blocks the calling thread on
//! the same execution future [`Client::execute`] returns, so both surfaces
//! send the same bytes and make the same retry decisions.

use std::sync::Arc;

use hedera_common::{HederaError, Result};
use hedera_metrics::MetricsSnapshot;
use hedera_network::{Network, NetworkName, NodeHealthSnapshot};
use tokio::runtime::{Builder, Handle, Runtime};

use crate::client::{Client, ClientBuilder};
use crate::config::ClientConfig;
use crate::execute::Execute;

pub struct BlockingClient {
    // Dropped before the runtime so the refresh task is aborted while the
    // runtime still exists
    client: Client,
    runtime: Runtime,
}

impl BlockingClient {
    pub fn new(config: ClientConfig) -> Result<Self> {
        Self::from_builder(ClientBuilder::new(config))
    }

    pub fn for_network(name: NetworkName) -> Result<Self> {
        Self::new(ClientConfig::for_network(name))
    }

    /// Builds the client inside a new multi-thread runtime.
    pub fn from_builder(builder: ClientBuilder) -> Result<Self> {
        ensure_not_async()?;

        let runtime = Builder::new_multi_thread()
            .enable_all()
            .thread_name("hedera-blocking")
            .build()?;

        let client = {
            let _guard = runtime.enter();
            builder.build()?
        };

        Ok(Self { client, runtime })
    }

    /// Executes a request, blocking the calling thread through every attempt
    /// and backoff sleep.
    ///
    /// Fails with [`HederaError::BlockingInAsyncContext`] on a thread that is
    /// already driving a Tokio runtime.
    pub fn execute<E: Execute + ?Sized>(&self, request: &E) -> Result<E::Output> {
        ensure_not_async()?;
        self.runtime.block_on(self.client.execute(request))
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.client.metrics()
    }

    pub fn node_health(&self) -> Vec<NodeHealthSnapshot> {
        self.client.node_health()
    }

    pub fn network(&self) -> &Arc<Network> {
        self.client.network()
    }

    /// The async client underneath, sharing this client's node health.
    pub fn client(&self) -> &Client {
        &self.client
    }
}

fn ensure_not_async() -> Result<()> {
    if Handle::try_current().is_ok() {
        return Err(HederaError::BlockingInAsyncContext);
    }
    Ok(())
}
