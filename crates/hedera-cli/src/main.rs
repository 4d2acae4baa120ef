//! # Hedera CLI Entry Point
//!
//! Submits pre-built, already-signed payloads through the execution engine
//! and prints what the network said.
//!
//! ## Usage
//!
//! ```bash
//! # Submit a signed transaction to testnet
//! hedera call /proto.CryptoService/cryptoTransfer --payload 0a2c1a...
//!
//! # Send a query to two specific nodes only
//! hedera call /proto.CryptoService/cryptoGetBalance --kind query \
//!   --payload 3a0c... --node 0.0.3 --node 0.0.4
//!
//! # List the endpoints a config resolves to
//! hedera nodes --config hedera.toml
//! ```
//!
//! Logs go to stderr; stdout carries only the JSON result. `RUST_LOG`
//! controls verbosity and defaults to `info`.

use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, Result};
use argh::FromArgs;
use hedera_client::{Client, ClientConfig, NetworkConfig, QueryRequest, TransactionRequest};
use hedera_common::{AccountId, GrpcMethod, RequestOptions};
use hedera_network::NetworkName;
use serde_json::json;

#[derive(FromArgs)]
/// Hedera execution engine command-line client
struct Cli {
    #[argh(subcommand)]
    command: Commands,
}

#[derive(FromArgs)]
#[argh(subcommand)]
enum Commands {
    Call(CallArgs),
    Nodes(NodesArgs),
}

/// How the response to a payload is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RequestKind {
    Transaction,
    Query,
}

impl FromStr for RequestKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "transaction" | "tx" => Ok(RequestKind::Transaction),
            "query" => Ok(RequestKind::Query),
            other => Err(format!("unknown request kind '{}', use transaction or query", other)),
        }
    }
}

/// Arguments for submitting one payload.
///
/// The payload is sent as-is, on every attempt. The engine only reads the
/// precheck status out of the response.
#[derive(FromArgs)]
#[argh(subcommand, name = "call")]
/// submit a pre-built payload and print the outcome as JSON
struct CallArgs {
    /// full gRPC method path, e.g. /proto.CryptoService/cryptoTransfer
    #[argh(positional)]
    method: String,

    /// hex-encoded serialized Transaction or Query
    #[argh(option, short = 'p')]
    payload: String,

    /// transaction or query (default: transaction)
    #[argh(option, short = 'k', default = "RequestKind::Transaction")]
    kind: RequestKind,

    /// mainnet, testnet or previewnet, overriding the config file
    #[argh(option, short = 'n')]
    network: Option<NetworkName>,

    /// path to a TOML config file
    #[argh(option, short = 'c')]
    config: Option<PathBuf>,

    /// node account id to send to; may be repeated
    #[argh(option, long = "node")]
    nodes: Vec<AccountId>,

    /// attempt budget for this request
    #[argh(option, long = "max-attempts")]
    max_attempts: Option<u32>,
}

#[derive(FromArgs)]
#[argh(subcommand, name = "nodes")]
/// print the endpoints of the configured network as JSON
struct NodesArgs {
    /// mainnet, testnet or previewnet, overriding the config file
    #[argh(option, short = 'n')]
    network: Option<NetworkName>,

    /// path to a TOML config file
    #[argh(option, short = 'c')]
    config: Option<PathBuf>,
}

fn load_config(path: Option<&PathBuf>, network: Option<NetworkName>) -> Result<ClientConfig> {
    let mut config = ClientConfig::load(path.map(PathBuf::as_path))
        .context("Failed to load client configuration")?;
    if let Some(name) = network {
        config.network = NetworkConfig::Named(name);
        config.address_book_path = None;
    }
    Ok(config)
}

fn request_options(args: &CallArgs) -> RequestOptions {
    let mut options = RequestOptions::new();
    if !args.nodes.is_empty() {
        options = options.with_node_account_ids(args.nodes.iter().copied());
    }
    if let Some(max_attempts) = args.max_attempts {
        options = options.with_max_attempts(max_attempts);
    }
    options
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli: Cli = argh::from_env();

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Call(args) => run_call(args).await,
        Commands::Nodes(args) => run_nodes(args),
    }
}

/// Executes the `call` subcommand.
///
/// # Errors
///
/// Returns an error if:
/// - The payload is not valid hex or the method path is malformed
/// - The configuration is invalid
/// - The execution ends in a fatal error
async fn run_call(args: CallArgs) -> Result<()> {
    let payload = hex::decode(args.payload.trim_start_matches("0x"))
        .context("Payload must be hex-encoded")?;
    let method = GrpcMethod::new(&args.method)?;
    let options = request_options(&args);

    let config = load_config(args.config.as_ref(), args.network)?;
    let client = Client::builder(config).build()?;
    tracing::info!(method = %method, bytes = payload.len(), "Submitting payload");

    let output = match args.kind {
        RequestKind::Transaction => {
            let request = TransactionRequest::new(method, payload).with_options(options);
            let submission = client.execute(&request).await?;
            json!({
                "node": submission.node,
                "status": submission.status,
                "cost": submission.cost,
            })
        }
        RequestKind::Query => {
            let request = QueryRequest::new(method, payload).with_options(options);
            let answer = client.execute(&request).await?;
            json!({
                "node": answer.node,
                "status": answer.status,
                "cost": answer.cost,
                "response": hex::encode(&answer.bytes),
            })
        }
    };

    println!("{}", output);
    tracing::debug!(metrics = ?client.metrics(), "Execution metrics");
    Ok(())
}

fn run_nodes(args: NodesArgs) -> Result<()> {
    let config = load_config(args.config.as_ref(), args.network)?;
    let book = config.address_book()?;

    let nodes: Vec<_> = book
        .endpoints()
        .map(|(account_id, address)| json!({ "account_id": account_id, "address": address }))
        .collect();
    println!("{}", serde_json::to_string_pretty(&nodes)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::from_args(&["hedera"], args).unwrap()
    }

    #[test]
    fn test_parse_call_defaults() {
        let cli = parse(&["call", "/proto.CryptoService/cryptoTransfer", "--payload", "0a00"]);
        match cli.command {
            Commands::Call(args) => {
                assert_eq!(args.method, "/proto.CryptoService/cryptoTransfer");
                assert_eq!(args.kind, RequestKind::Transaction);
                assert!(args.nodes.is_empty());
                assert!(args.network.is_none());
                assert_eq!(request_options(&args), RequestOptions::new());
            }
            _ => panic!("Expected Call command"),
        }
    }

    #[test]
    fn test_parse_call_overrides() {
        let cli = parse(&[
            "call",
            "/proto.CryptoService/cryptoGetBalance",
            "-p",
            "3a00",
            "--kind",
            "query",
            "--network",
            "mainnet",
            "--node",
            "0.0.3",
            "--node",
            "0.0.7",
            "--max-attempts",
            "4",
        ]);
        match cli.command {
            Commands::Call(args) => {
                assert_eq!(args.kind, RequestKind::Query);
                assert_eq!(args.network, Some(NetworkName::Mainnet));

                let options = request_options(&args);
                assert_eq!(
                    options.node_account_ids,
                    Some(vec![AccountId::from_num(3), AccountId::from_num(7)])
                );
                assert_eq!(options.max_attempts, Some(4));
            }
            _ => panic!("Expected Call command"),
        }
    }

    #[test]
    fn test_parse_rejects_bad_values() {
        assert!(Cli::from_args(&["hedera"], &["call", "/a/b", "-p", "00", "--kind", "stream"]).is_err());
        assert!(Cli::from_args(&["hedera"], &["call", "/a/b", "-p", "00", "--node", "3"]).is_err());
        assert!(Cli::from_args(&["hedera"], &["nodes", "--network", "devnet"]).is_err());
    }

    #[test]
    fn test_parse_nodes() {
        let cli = parse(&["nodes", "-c", "hedera.toml"]);
        match cli.command {
            Commands::Nodes(args) => {
                assert_eq!(args.config, Some(PathBuf::from("hedera.toml")));
            }
            _ => panic!("Expected Nodes command"),
        }
    }

    #[test]
    fn test_network_flag_replaces_config_network() {
        let config = load_config(None, Some(NetworkName::Previewnet)).unwrap();
        assert_eq!(config.network, NetworkConfig::Named(NetworkName::Previewnet));
    }
}
