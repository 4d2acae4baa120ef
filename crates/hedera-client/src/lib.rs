//! Hedera Execution Engine
//!
//! Sends pre-built transactions and queries to Hedera consensus nodes,
//! choosing a node per attempt from live health state and retrying until a
//! node gives a definitive answer.
//!
//! # Architecture
//!
//! - [`Executor`]: the state machine every request runs through (select a
//!   node, dispatch, classify, retry or finish)
//! - [`ResponseClassifier`]: decides success, retry or fatal for each attempt
//! - [`Client`]: async and callback surfaces; [`BlockingClient`] blocks on
//!   the same execution
//! - [`ClientConfig`]: figment-loaded settings
//!
//! # Example
//!
//! ```no_run
//! use hedera_client::{Client, TransactionRequest};
//! use hedera_common::GrpcMethod;
//! use hedera_network::NetworkName;
//!
//! # async fn run(signed: Vec<u8>) -> hedera_common::Result<()> {
//! let client = Client::for_network(NetworkName::Testnet)?;
//! let method = GrpcMethod::new("/proto.CryptoService/cryptoTransfer")?;
//! let submission = client.execute(&TransactionRequest::new(method, signed)).await?;
//! println!("{} answered {}", submission.node, submission.status);
//! # Ok(())
//! # }
//! ```

pub mod blocking;
pub mod classifier;
pub mod client;
pub mod config;
pub mod execute;
pub mod requests;

pub use blocking::BlockingClient;
pub use classifier::{ExecutionOutcome, ResponseClassifier, RetryReason, TransportResult};
pub use client::{Client, ClientBuilder};
pub use config::{
    ClientConfig, ExecutionConfig, ExecutionSettings, NetworkConfig, NodeBackoffSettings,
};
pub use execute::{Execute, Executor};
pub use requests::{QueryRequest, QueryResponse, TransactionRequest, TransactionSubmission};
