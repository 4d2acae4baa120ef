//! Scripted in-process nodes for execution tests.
//!
//! Each node is an in-process channel that answers from a script, then
//! repeats a fallback reply forever. Every call is recorded in order.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use hedera_client::{Client, ClientConfig, NetworkConfig};
use hedera_common::transport::{Code, InProcessTransport, NodeAddress, TransportError};
use hedera_common::{AccountId, Status, TransactionResponse};
use hedera_network::AddressBook;
use prost::Message;

pub const TRANSFER: &str = "/proto.CryptoService/cryptoTransfer";

/// One scripted answer.
#[derive(Debug, Clone)]
pub enum Reply {
    /// A `TransactionResponse` carrying this precheck status.
    Precheck(Status),
    /// A gRPC failure.
    Grpc(Code, &'static str),
    /// Raw response bytes.
    Body(Bytes),
}

impl Reply {
    fn into_result(self) -> Result<Bytes, TransportError> {
        match self {
            Reply::Precheck(status) => Ok(Bytes::from(
                TransactionResponse {
                    node_transaction_precheck_code: status.code(),
                    cost: 0,
                }
                .encode_to_vec(),
            )),
            Reply::Grpc(code, message) => Err(TransportError::status(code, message)),
            Reply::Body(bytes) => Ok(bytes),
        }
    }
}

/// A call a scripted node received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub channel: String,
    pub method: String,
    pub payload: Bytes,
}

#[derive(Clone, Default)]
pub struct Harness {
    pub transport: InProcessTransport,
    calls: Arc<Mutex<Vec<Call>>>,
}

impl Harness {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `channel` to a node that plays `script` and then answers
    /// `fallback` forever.
    pub fn node(&self, channel: &str, script: Vec<Reply>, fallback: Reply) {
        let name = channel.to_string();
        let calls = self.calls.clone();
        let script = Mutex::new(VecDeque::from(script));

        self.transport.register(channel, move |method, payload| {
            calls.lock().unwrap().push(Call {
                channel: name.clone(),
                method: method.as_str().to_string(),
                payload,
            });
            let reply = script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| fallback.clone());
            reply.into_result()
        });
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    /// Channel names in the order they were called.
    pub fn channels(&self) -> Vec<String> {
        self.calls().into_iter().map(|call| call.channel).collect()
    }

    pub fn client(&self, config: ClientConfig) -> Client {
        Client::builder(config)
            .transport(Arc::new(self.transport.clone()))
            .build()
            .unwrap()
    }
}

/// `0.0.<num>` served by `in-process:<channel>`, for each pair.
pub fn book(nodes: &[(u64, &str)]) -> AddressBook {
    nodes
        .iter()
        .map(|(num, channel)| (AccountId::from_num(*num), NodeAddress::in_process(*channel)))
        .collect()
}

/// Config over `nodes` with millisecond-scale retry backoff and no deadlines.
pub fn config(nodes: &[(u64, &str)]) -> ClientConfig {
    let mut config = ClientConfig {
        network: NetworkConfig::Custom(book(nodes)),
        ..ClientConfig::default()
    };
    config.execution.min_backoff_ms = 1;
    config.execution.max_backoff_ms = 4;
    config.execution.grpc_deadline_ms = None;
    config.execution.request_timeout_ms = None;
    config
}

pub fn node(num: u64) -> AccountId {
    AccountId::from_num(num)
}
