//! Hedera Common Types and Transport
//!
//! Shared protocol definitions and the transport boundary used by every
//! other crate of the execution engine.
//!
//! # Overview
//!
//! The engine sends already-serialized requests to Hedera consensus nodes
//! and retries them across nodes until one gives a definitive answer. This
//! crate holds the pieces that both sides of that loop agree on:
//!
//! - **Protocol Layer**: account ids, precheck status codes, request options,
//!   the minimal response decoding needed to read a status, and
//!   [`HederaError`]
//! - **Transport Layer**: the [`transport::Transport`] trait with gRPC and
//!   in-process implementations
//!
//! # Example
//!
//! ```no_run
//! use hedera_common::{AccountId, GrpcMethod, Status};
//!
//! let node: AccountId = "0.0.3".parse().unwrap();
//! let method = GrpcMethod::new("/proto.CryptoService/cryptoTransfer").unwrap();
//! assert!(Status::Busy.is_transient());
//! # let _ = (node, method);
//! ```

pub mod protocol;
pub mod transport;

pub use protocol::*;
