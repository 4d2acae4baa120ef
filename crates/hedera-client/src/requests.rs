//! Concrete request kinds: pre-built transactions and queries.

use bytes::Bytes;
use hedera_common::responses::{decode_query_header, decode_transaction_response};
use hedera_common::{AccountId, GrpcMethod, RequestOptions, Result, Status};
use serde::Serialize;

use crate::execute::Execute;

/// A signed transaction, ready to submit as-is.
#[derive(Debug, Clone)]
pub struct TransactionRequest {
    method: GrpcMethod,
    payload: Bytes,
    options: RequestOptions,
}

impl TransactionRequest {
    pub fn new(method: GrpcMethod, payload: impl Into<Bytes>) -> Self {
        Self {
            method,
            payload: payload.into(),
            options: RequestOptions::default(),
        }
    }

    pub fn with_options(mut self, options: RequestOptions) -> Self {
        self.options = options;
        self
    }

    pub fn payload(&self) -> &Bytes {
        &self.payload
    }
}

/// What a node said when it accepted a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransactionSubmission {
    pub node: AccountId,
    pub status: Status,
    pub cost: u64,
}

impl Execute for TransactionRequest {
    type Output = TransactionSubmission;

    fn method(&self) -> &GrpcMethod {
        &self.method
    }

    fn options(&self) -> &RequestOptions {
        &self.options
    }

    fn make_request(&self) -> Bytes {
        self.payload.clone()
    }

    fn response_status(&self, response: &[u8]) -> Result<Status> {
        Ok(decode_transaction_response(response)?.status())
    }

    fn make_response(&self, response: Bytes, node: AccountId, status: Status) -> Result<Self::Output> {
        let decoded = decode_transaction_response(&response)?;
        Ok(TransactionSubmission {
            node,
            status,
            cost: decoded.cost,
        })
    }
}

/// A serialized `Query`, answered by a single node.
#[derive(Debug, Clone)]
pub struct QueryRequest {
    method: GrpcMethod,
    payload: Bytes,
    options: RequestOptions,
}

impl QueryRequest {
    pub fn new(method: GrpcMethod, payload: impl Into<Bytes>) -> Self {
        Self {
            method,
            payload: payload.into(),
            options: RequestOptions::default(),
        }
    }

    pub fn with_options(mut self, options: RequestOptions) -> Self {
        self.options = options;
        self
    }

    pub fn payload(&self) -> &Bytes {
        &self.payload
    }
}

/// A query answer. `bytes` is the full `Response` message for the caller to
/// decode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryResponse {
    pub node: AccountId,
    pub status: Status,
    pub cost: u64,
    pub bytes: Bytes,
}

impl Execute for QueryRequest {
    type Output = QueryResponse;

    fn method(&self) -> &GrpcMethod {
        &self.method
    }

    fn options(&self) -> &RequestOptions {
        &self.options
    }

    fn make_request(&self) -> Bytes {
        self.payload.clone()
    }

    fn response_status(&self, response: &[u8]) -> Result<Status> {
        Ok(decode_query_header(response)?.status())
    }

    fn make_response(&self, response: Bytes, node: AccountId, status: Status) -> Result<Self::Output> {
        let header = decode_query_header(&response)?;
        Ok(QueryResponse {
            node,
            status,
            cost: header.cost,
            bytes: response,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hedera_common::{ResponseHeader, TransactionResponse};
    use prost::Message;

    fn method() -> GrpcMethod {
        GrpcMethod::new("/proto.CryptoService/cryptoTransfer").unwrap()
    }

    #[test]
    fn test_transaction_payload_is_reused() {
        let request = TransactionRequest::new(method(), vec![1u8, 2, 3]);
        let first = request.make_request();
        let second = request.make_request();

        assert_eq!(first, second);
        // Same backing buffer, not a re-encoding
        assert_eq!(first.as_ptr(), second.as_ptr());
    }

    #[test]
    fn test_transaction_response_mapping() {
        let request = TransactionRequest::new(method(), vec![1u8]);
        let body = TransactionResponse {
            node_transaction_precheck_code: Status::Ok.code(),
            cost: 84_000,
        }
        .encode_to_vec();

        assert_eq!(request.response_status(&body).unwrap(), Status::Ok);

        let submission = request
            .make_response(Bytes::from(body), AccountId::from_num(5), Status::Ok)
            .unwrap();
        assert_eq!(
            submission,
            TransactionSubmission {
                node: AccountId::from_num(5),
                status: Status::Ok,
                cost: 84_000,
            }
        );
    }

    #[test]
    fn test_query_response_keeps_bytes() {
        let header = ResponseHeader {
            node_transaction_precheck_code: Status::Ok.code(),
            response_type: 0,
            cost: 17,
            state_proof: vec![],
        };
        // Response { cryptogetAccountBalance(field 7) { header(field 1) } }
        let body = header.encode_length_delimited_to_vec();
        let mut response = vec![0x0a];
        response.extend_from_slice(&body);
        let mut wrapped = vec![0x3a];
        prost::encoding::encode_varint(response.len() as u64, &mut wrapped);
        wrapped.extend_from_slice(&response);

        let request = QueryRequest::new(
            GrpcMethod::new("/proto.CryptoService/cryptoGetBalance").unwrap(),
            vec![9u8],
        );
        assert_eq!(request.response_status(&wrapped).unwrap(), Status::Ok);

        let answer = request
            .make_response(Bytes::from(wrapped.clone()), AccountId::from_num(3), Status::Ok)
            .unwrap();
        assert_eq!(answer.cost, 17);
        assert_eq!(answer.bytes, Bytes::from(wrapped));
    }

    #[test]
    fn test_query_garbage_is_rejected() {
        let request = QueryRequest::new(
            GrpcMethod::new("/proto.CryptoService/cryptoGetBalance").unwrap(),
            vec![],
        );
        assert!(request.response_status(&[0xff, 0xff, 0xff]).is_err());
    }
}
