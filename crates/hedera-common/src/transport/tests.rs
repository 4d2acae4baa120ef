//! Tests for node addresses, the pass-through codec and in-process channels.

#[cfg(test)]
mod tests {
    use super::super::*;
    use crate::protocol::{GrpcMethod, HederaError};
    use bytes::{Bytes, BytesMut};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn method() -> GrpcMethod {
        GrpcMethod::new("/proto.CryptoService/cryptoTransfer").unwrap()
    }

    // ============================================================================
    // NodeAddress
    // ============================================================================

    #[test]
    fn test_parse_grpc_address() {
        let address: NodeAddress = "0.testnet.hedera.com:50211".parse().unwrap();
        assert_eq!(address, NodeAddress::grpc("0.testnet.hedera.com", 50211));
        assert_eq!(
            address.to_uri().as_deref(),
            Some("http://0.testnet.hedera.com:50211")
        );
    }

    #[test]
    fn test_parse_strips_scheme() {
        let address: NodeAddress = "http://127.0.0.1:50211/".parse().unwrap();
        assert_eq!(address, NodeAddress::grpc("127.0.0.1", 50211));
        assert_eq!(address.to_string(), "127.0.0.1:50211");
    }

    #[test]
    fn test_parse_in_process_address() {
        let address: NodeAddress = "in-process:node-a".parse().unwrap();
        assert_eq!(address, NodeAddress::in_process("node-a"));
        assert_eq!(address.to_string(), "in-process:node-a");
        assert!(address.to_uri().is_none());
    }

    #[test]
    fn test_parse_rejects_bad_addresses() {
        for bad in ["", "localhost", ":50211", "localhost:port", "localhost:70000", "in-process:"] {
            assert!(
                matches!(bad.parse::<NodeAddress>(), Err(HederaError::InvalidAddress(_))),
                "'{}' should not parse",
                bad
            );
        }
    }

    #[test]
    fn test_address_serde_as_string() {
        let address = NodeAddress::grpc("35.237.200.180", 50211);
        let json = serde_json::to_string(&address).unwrap();
        assert_eq!(json, "\"35.237.200.180:50211\"");
        let back: NodeAddress = serde_json::from_str(&json).unwrap();
        assert_eq!(back, address);
    }

    // ============================================================================
    // RawBytesCodec
    // ============================================================================

    #[test]
    fn test_codec_passes_bytes_through() {
        let payload = Bytes::from_static(&[0x0a, 0x03, 0x01, 0x02, 0x03, 0x00, 0xff]);

        let mut wire = BytesMut::new();
        RawBytesCodec::write_payload(&payload, &mut wire);
        assert_eq!(&wire[..], &payload[..]);

        let decoded = RawBytesCodec::read_payload(&mut wire.freeze());
        assert_eq!(decoded, payload);
    }

    #[test]
    fn test_codec_empty_payload() {
        let mut wire = BytesMut::new();
        RawBytesCodec::write_payload(&Bytes::new(), &mut wire);
        assert!(RawBytesCodec::read_payload(&mut wire.freeze()).is_empty());
    }

    // ============================================================================
    // TransportError
    // ============================================================================

    #[test]
    fn test_transport_error_from_tonic_status() {
        let status = tonic::Status::unavailable("node is down");
        assert_eq!(
            TransportError::from(status),
            TransportError::status(Code::Unavailable, "node is down")
        );
    }

    // ============================================================================
    // InProcessTransport
    // ============================================================================

    #[tokio::test]
    async fn test_in_process_routes_by_name() {
        let transport = InProcessTransport::new();
        transport.register("a", |_, payload| Ok(payload));
        transport.register("b", |_, _| Ok(Bytes::from_static(b"from b")));

        let echoed = transport
            .unary(&NodeAddress::in_process("a"), &method(), Bytes::from_static(b"hi"), None)
            .await
            .unwrap();
        assert_eq!(echoed, Bytes::from_static(b"hi"));

        let from_b = transport
            .unary(&NodeAddress::in_process("b"), &method(), Bytes::new(), None)
            .await
            .unwrap();
        assert_eq!(from_b, Bytes::from_static(b"from b"));
    }

    #[tokio::test]
    async fn test_in_process_passes_method() {
        let transport = InProcessTransport::new();
        transport.register("a", |method, _| {
            Ok(Bytes::copy_from_slice(method.as_str().as_bytes()))
        });

        let response = transport
            .unary(&NodeAddress::in_process("a"), &method(), Bytes::new(), None)
            .await
            .unwrap();
        assert_eq!(&response[..], b"/proto.CryptoService/cryptoTransfer");
    }

    #[tokio::test]
    async fn test_in_process_unknown_channel_fails_to_connect() {
        let transport = InProcessTransport::new();

        let result = transport
            .unary(&NodeAddress::in_process("missing"), &method(), Bytes::new(), None)
            .await;
        assert!(matches!(result, Err(TransportError::Connect { .. })));

        let result = transport
            .unary(&NodeAddress::grpc("127.0.0.1", 1), &method(), Bytes::new(), None)
            .await;
        assert!(matches!(result, Err(TransportError::Connect { .. })));
    }

    #[tokio::test]
    async fn test_in_process_unregister() {
        let transport = InProcessTransport::new();
        transport.register("a", |_, payload| Ok(payload));
        assert!(transport.unregister("a"));
        assert!(!transport.unregister("a"));

        let result = transport
            .unary(&NodeAddress::in_process("a"), &method(), Bytes::new(), None)
            .await;
        assert!(matches!(result, Err(TransportError::Connect { .. })));
    }

    #[tokio::test]
    async fn test_in_process_returns_handler_status() {
        let transport = InProcessTransport::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        transport.register("a", move |_, _| {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(TransportError::status(Code::Internal, "RST_STREAM closed"))
        });

        let result = transport
            .unary(
                &NodeAddress::in_process("a"),
                &method(),
                Bytes::new(),
                Some(Duration::from_secs(1)),
            )
            .await;

        assert_eq!(
            result,
            Err(TransportError::status(Code::Internal, "RST_STREAM closed"))
        );
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    // ============================================================================
    // GrpcTransport
    // ============================================================================

    #[tokio::test]
    async fn test_grpc_deadline_bounds_silent_handshake() {
        // Accepts TCP connections and never says a word
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        let transport = GrpcTransport::with_config(GrpcTransportConfig {
            connect_timeout: Duration::from_secs(30),
            tcp_keepalive: None,
        });
        let started = std::time::Instant::now();
        let result = transport
            .unary(
                &NodeAddress::grpc("127.0.0.1", port),
                &method(),
                Bytes::from_static(b"tx"),
                Some(Duration::from_millis(200)),
            )
            .await;

        assert!(started.elapsed() < Duration::from_secs(5));
        assert!(
            matches!(
                result,
                Err(TransportError::Connect { .. })
                    | Err(TransportError::Status {
                        code: Code::DeadlineExceeded,
                        ..
                    })
            ),
            "unexpected result {:?}",
            result
        );
    }

    #[tokio::test]
    async fn test_grpc_refuses_in_process_address() {
        let result = GrpcTransport::new()
            .unary(
                &NodeAddress::in_process("a"),
                &method(),
                Bytes::new(),
                Some(Duration::from_millis(200)),
            )
            .await;
        assert!(matches!(result, Err(TransportError::Connect { .. })));
    }
}
