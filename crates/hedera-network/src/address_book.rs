//! Address book sources and the timed refresh task.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use hedera_common::transport::NodeAddress;
use hedera_common::{AccountId, HederaError, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::network::{Network, ReconfigureSummary};

/// Mapping from node account to the addresses it can be reached at.
///
/// Serializes as a JSON object: `{ "0.0.3": ["host:50211", ...] }`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AddressBook {
    entries: BTreeMap<AccountId, Vec<NodeAddress>>,
}

impl AddressBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an address for `account_id`. Duplicate addresses are ignored.
    pub fn insert(&mut self, account_id: AccountId, address: NodeAddress) {
        let addresses = self.entries.entry(account_id).or_default();
        if !addresses.contains(&address) {
            addresses.push(address);
        }
    }

    pub fn with_node(mut self, account_id: AccountId, address: NodeAddress) -> Self {
        self.insert(account_id, address);
        self
    }

    /// Parses `(account, address)` string pairs.
    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Result<Self> {
        let mut book = Self::new();
        for (account, address) in pairs {
            book.insert(account.parse()?, address.parse()?);
        }
        Ok(book)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| HederaError::InvalidConfig(format!("invalid address book: {}", e)))
    }

    /// Every `(account, address)` pair, ordered by account and then by the
    /// order addresses were added.
    pub fn endpoints(&self) -> impl Iterator<Item = (AccountId, &NodeAddress)> + '_ {
        self.entries
            .iter()
            .flat_map(|(account, addresses)| addresses.iter().map(move |address| (*account, address)))
    }

    pub fn account_ids(&self) -> impl Iterator<Item = AccountId> + '_ {
        self.entries.keys().copied()
    }

    pub fn addresses(&self, account_id: &AccountId) -> &[NodeAddress] {
        self.entries
            .get(account_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Number of endpoints, not accounts.
    pub fn len(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl FromIterator<(AccountId, NodeAddress)> for AddressBook {
    fn from_iter<T: IntoIterator<Item = (AccountId, NodeAddress)>>(iter: T) -> Self {
        let mut book = Self::new();
        for (account, address) in iter {
            book.insert(account, address);
        }
        book
    }
}

/// Somewhere a current address book can be fetched from.
#[async_trait]
pub trait AddressBookSource: Send + Sync {
    async fn fetch(&self) -> Result<AddressBook>;
}

/// A fixed address book. Refreshing from it never changes anything.
#[derive(Debug, Clone)]
pub struct StaticAddressBook(pub AddressBook);

#[async_trait]
impl AddressBookSource for StaticAddressBook {
    async fn fetch(&self) -> Result<AddressBook> {
        Ok(self.0.clone())
    }
}

/// Address book read from a JSON file on every fetch.
#[derive(Debug, Clone)]
pub struct FileAddressBook {
    path: PathBuf,
}

impl FileAddressBook {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}

#[async_trait]
impl AddressBookSource for FileAddressBook {
    async fn fetch(&self) -> Result<AddressBook> {
        let json = tokio::fs::read_to_string(&self.path).await?;
        AddressBook::from_json(&json)
    }
}

/// Periodically re-reads an address book and reconfigures the network.
pub struct AddressBookRefresher {
    network: Arc<Network>,
    source: Arc<dyn AddressBookSource>,
    interval: Duration,
}

impl AddressBookRefresher {
    /// Creates a new refresher.
    ///
    /// # Arguments
    /// * `network` - The network to reconfigure
    /// * `source` - Where to fetch the address book from
    /// * `interval` - Time between fetches
    pub fn new(
        network: Arc<Network>,
        source: Arc<dyn AddressBookSource>,
        interval: Duration,
    ) -> Self {
        Self {
            network,
            source,
            interval,
        }
    }

    /// Starts the refresh task. The first fetch happens one interval from now.
    pub fn spawn(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            self.run().await;
        })
    }

    async fn run(self) {
        let start = tokio::time::Instant::now() + self.interval;
        let mut interval = tokio::time::interval_at(start, self.interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            interval.tick().await;
            if let Err(e) = self.refresh_once().await {
                warn!(error = %e, "Address book refresh failed, keeping current network");
            }
        }
    }

    /// Fetches the book once and applies it.
    pub async fn refresh_once(&self) -> Result<ReconfigureSummary> {
        let book = self.source.fetch().await?;
        if book.is_empty() {
            return Err(HederaError::InvalidConfig(
                "fetched address book has no endpoints".to_string(),
            ));
        }

        let summary = self.network.reconfigure(&book);
        if summary.is_changed() {
            info!(
                added = summary.added,
                removed = summary.removed,
                kept = summary.kept,
                "Address book changed"
            );
        }
        Ok(summary)
    }
}
