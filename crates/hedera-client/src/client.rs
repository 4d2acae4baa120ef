use std::sync::Arc;

use hedera_common::transport::{GrpcTransport, Transport};
use hedera_common::{HederaError, Result};
use hedera_metrics::{ClientMetricsCollector, MetricsCollector, MetricsSnapshot};
use hedera_network::{
    AddressBookRefresher, AddressBookSource, FileAddressBook, Network, NetworkName,
    NodeHealthSnapshot,
};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::info;

use crate::classifier::ResponseClassifier;
use crate::config::{ClientConfig, ExecutionSettings};
use crate::execute::{Execute, Executor};

/// Hedera client
///
/// Executes requests against one network. Cloning is cheap and every clone
/// shares the same node health state; separate `Client`s built from the
/// same config do not.
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    executor: Executor,
    refresher: Option<JoinHandle<()>>,
}

impl Drop for ClientInner {
    fn drop(&mut self) {
        if let Some(refresher) = self.refresher.take() {
            refresher.abort();
        }
    }
}

impl Client {
    pub fn builder(config: ClientConfig) -> ClientBuilder {
        ClientBuilder::new(config)
    }

    /// Client for a preset network with default settings and the gRPC
    /// transport.
    pub fn for_network(name: NetworkName) -> Result<Self> {
        ClientBuilder::new(ClientConfig::for_network(name)).build()
    }

    /// Executes a request, retrying across nodes as needed.
    pub async fn execute<E: Execute + ?Sized>(&self, request: &E) -> Result<E::Output> {
        self.inner.executor.execute(request).await
    }

    /// Executes a request in the background and hands the outcome to
    /// `callback`.
    ///
    /// Aborting the returned handle cancels the request; the callback is
    /// not called in that case.
    ///
    /// # Panics
    ///
    /// Panics when called outside a Tokio runtime.
    pub fn execute_with_callback<E, F>(&self, request: E, callback: F) -> JoinHandle<()>
    where
        E: Execute + 'static,
        E::Output: 'static,
        F: FnOnce(Result<E::Output>) + Send + 'static,
    {
        let client = self.clone();
        tokio::spawn(async move {
            let result = client.execute(&request).await;
            callback(result);
        })
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.inner.executor.metrics().snapshot()
    }

    pub fn node_health(&self) -> Vec<NodeHealthSnapshot> {
        self.inner.executor.network().node_health()
    }

    pub fn network(&self) -> &Arc<Network> {
        self.inner.executor.network()
    }

    pub fn settings(&self) -> &ExecutionSettings {
        self.inner.executor.settings()
    }
}

/// Assembles a [`Client`] from a config plus optional replacements for its
/// transport, metrics sink and address book source.
pub struct ClientBuilder {
    config: ClientConfig,
    transport: Option<Arc<dyn Transport>>,
    metrics: Option<Arc<dyn MetricsCollector>>,
    address_book_source: Option<Arc<dyn AddressBookSource>>,
}

impl ClientBuilder {
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            transport: None,
            metrics: None,
            address_book_source: None,
        }
    }

    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn metrics(mut self, metrics: Arc<dyn MetricsCollector>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Where periodic refreshes read the address book from. Takes
    /// precedence over `address_book_path`.
    pub fn address_book_source(mut self, source: Arc<dyn AddressBookSource>) -> Self {
        self.address_book_source = Some(source);
        self
    }

    /// Validates the config and builds the client.
    ///
    /// With `address_book_refresh_secs` set this spawns the refresh task, so
    /// it must then run inside a Tokio runtime.
    pub fn build(self) -> Result<Client> {
        let config = self.config;
        config.validate()?;

        let book = config.address_book()?;
        let network = Arc::new(Network::new(&book, config.node_backoff()));
        info!(nodes = book.len(), "Client network initialized");

        let refresher = match config.address_book_refresh() {
            Some(interval) => {
                let source: Arc<dyn AddressBookSource> =
                    match (self.address_book_source, &config.address_book_path) {
                        (Some(source), _) => source,
                        (None, Some(path)) => Arc::new(FileAddressBook::new(path.clone())),
                        (None, None) => {
                            return Err(HederaError::InvalidConfig(
                                "address_book_refresh_secs needs address_book_path or an address book source"
                                    .to_string(),
                            ));
                        }
                    };
                if Handle::try_current().is_err() {
                    return Err(HederaError::InvalidConfig(
                        "address book refresh needs a Tokio runtime".to_string(),
                    ));
                }
                Some(AddressBookRefresher::new(network.clone(), source, interval).spawn())
            }
            None => None,
        };

        let transport: Arc<dyn Transport> = match self.transport {
            Some(transport) => transport,
            None => Arc::new(GrpcTransport::new()),
        };
        let metrics: Arc<dyn MetricsCollector> = match self.metrics {
            Some(metrics) => metrics,
            None => Arc::new(ClientMetricsCollector::new()),
        };
        let classifier = ResponseClassifier::new(&config.transient_internal_patterns);

        let executor = Executor::new(
            network,
            transport,
            classifier,
            metrics,
            ExecutionSettings::from(&config.execution),
            config.node_account_ids.clone(),
        );

        Ok(Client {
            inner: Arc::new(ClientInner {
                executor,
                refresher,
            }),
        })
    }
}
