//! Node health tracking and node selection.
//!
//! A [`Network`] owns the current [`NetworkView`], an arena of [`Node`]
//! endpoints built from an [`AddressBook`]. Each node carries its own
//! exponential backoff state; [`select_node`] turns those states into a
//! deterministic choice for the next attempt.

pub mod address_book;
pub mod network;
pub mod node;
pub mod presets;

pub use address_book::{
    AddressBook, AddressBookRefresher, AddressBookSource, FileAddressBook, StaticAddressBook,
};
pub use network::{Network, NetworkView, ReconfigureSummary, select_node};
pub use node::{Node, NodeBackoffConfig, NodeHealth, NodeHealthSnapshot};
pub use presets::NetworkName;
