use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::{Duration, Instant};

use hedera_common::transport::NodeAddress;
use hedera_common::{AccountId, HederaError, Result};

use crate::address_book::AddressBook;
use crate::node::{Node, NodeBackoffConfig, NodeHealthSnapshot};

/// Immutable arena of endpoints for one address book generation.
///
/// Reconfiguration builds a new view; the nodes themselves are shared with
/// the previous view wherever their identity did not change.
#[derive(Debug, Default)]
pub struct NetworkView {
    nodes: Vec<Arc<Node>>,
    by_account: HashMap<AccountId, Vec<usize>>,
}

impl NetworkView {
    pub fn new(book: &AddressBook, backoff: NodeBackoffConfig) -> Self {
        Self::from_nodes(
            book.endpoints()
                .map(|(account, address)| Arc::new(Node::new(account, address.clone(), backoff)))
                .collect(),
        )
    }

    fn from_nodes(nodes: Vec<Arc<Node>>) -> Self {
        let mut by_account: HashMap<AccountId, Vec<usize>> = HashMap::new();
        for (index, node) in nodes.iter().enumerate() {
            by_account.entry(node.account_id()).or_default().push(index);
        }
        Self { nodes, by_account }
    }

    pub fn nodes(&self) -> &[Arc<Node>] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains_account(&self, account_id: &AccountId) -> bool {
        self.by_account.contains_key(account_id)
    }

    /// Endpoints a request may go to, in rotation order.
    ///
    /// With a pinned list, the endpoints of those accounts in the order given;
    /// accounts unknown to this view are left out. Without one, every
    /// endpoint. An empty result is a configuration error.
    pub fn candidates(&self, pinned: Option<&[AccountId]>) -> Result<Vec<Arc<Node>>> {
        let candidates: Vec<Arc<Node>> = match pinned {
            Some(accounts) => {
                let mut seen = HashSet::new();
                accounts
                    .iter()
                    .filter(|account| seen.insert(**account))
                    .flat_map(|account| {
                        if !self.by_account.contains_key(account) {
                            tracing::debug!(account = %account, "Pinned node is not in the network");
                        }
                        self.by_account.get(account).into_iter().flatten()
                    })
                    .map(|&index| self.nodes[index].clone())
                    .collect()
            }
            None => self.nodes.clone(),
        };

        if candidates.is_empty() {
            return Err(HederaError::NoHealthyNodes);
        }
        Ok(candidates)
    }

    /// Builds the next generation from `book`, carrying over every node whose
    /// `(account, address)` pair is still present.
    fn rebuild(&self, book: &AddressBook, backoff: NodeBackoffConfig) -> (Self, ReconfigureSummary) {
        let mut existing: HashMap<(AccountId, &NodeAddress), &Arc<Node>> = self
            .nodes
            .iter()
            .map(|node| ((node.account_id(), node.address()), node))
            .collect();

        let mut summary = ReconfigureSummary::default();
        let nodes = book
            .endpoints()
            .map(|(account, address)| match existing.remove(&(account, address)) {
                Some(node) => {
                    summary.kept += 1;
                    node.clone()
                }
                None => {
                    summary.added += 1;
                    Arc::new(Node::new(account, address.clone(), backoff))
                }
            })
            .collect();
        summary.removed = existing.len();

        (Self::from_nodes(nodes), summary)
    }
}

/// Picks the endpoint for the next attempt.
///
/// Walks `candidates` from `rotation` (mod the candidate count), skipping
/// indices in `excluded`. The first node that is healthy at `now` wins;
/// failing that, the node with the least backoff left, ties going to the
/// one met first. `None` only when every candidate is excluded.
pub fn select_node(
    candidates: &[Arc<Node>],
    excluded: &HashSet<usize>,
    rotation: usize,
    now: Instant,
) -> Option<usize> {
    let count = candidates.len();
    if count == 0 {
        return None;
    }

    let mut soonest: Option<(usize, Duration)> = None;
    for index in (0..count).map(|offset| (rotation % count + offset) % count) {
        if excluded.contains(&index) {
            continue;
        }

        let remaining = candidates[index].remaining_backoff_at(now);
        if remaining.is_zero() {
            return Some(index);
        }
        if soonest.map_or(true, |(_, best)| remaining < best) {
            soonest = Some((index, remaining));
        }
    }

    soonest.map(|(index, _)| index)
}

/// What a reconfiguration did to the set of endpoints.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconfigureSummary {
    pub added: usize,
    pub removed: usize,
    pub kept: usize,
}

impl ReconfigureSummary {
    pub fn is_changed(&self) -> bool {
        self.added > 0 || self.removed > 0
    }
}

/// The client's live network: the current view plus the shared rotation
/// pointer.
///
/// Executions take an `Arc` of the current view when they start and keep it
/// until they finish, so a refresh never pulls a node out from under an
/// in-flight request.
#[derive(Debug)]
pub struct Network {
    view: RwLock<Arc<NetworkView>>,
    rotation: AtomicUsize,
    backoff: NodeBackoffConfig,
}

impl Network {
    pub fn new(book: &AddressBook, backoff: NodeBackoffConfig) -> Self {
        Self {
            view: RwLock::new(Arc::new(NetworkView::new(book, backoff))),
            rotation: AtomicUsize::new(0),
            backoff,
        }
    }

    /// The current view.
    pub fn view(&self) -> Arc<NetworkView> {
        self.view
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn backoff_config(&self) -> NodeBackoffConfig {
        self.backoff
    }

    pub fn rotation(&self) -> usize {
        self.rotation.load(Ordering::Relaxed)
    }

    /// Moves the rotation pointer one position on.
    pub fn advance_rotation(&self) {
        self.rotation.fetch_add(1, Ordering::Relaxed);
    }

    /// Replaces the view with one built from `book`.
    pub fn reconfigure(&self, book: &AddressBook) -> ReconfigureSummary {
        let mut view = self.view.write().unwrap_or_else(PoisonError::into_inner);
        let (next, summary) = view.rebuild(book, self.backoff);
        *view = Arc::new(next);
        summary
    }

    /// Health of every endpoint in the current view.
    pub fn node_health(&self) -> Vec<NodeHealthSnapshot> {
        let now = Instant::now();
        self.view()
            .nodes()
            .iter()
            .map(|node| node.snapshot_at(now))
            .collect()
    }
}
