//! Just enough of the response protobufs to read a precheck status.
//!
//! The engine never interprets payloads beyond this: the status decides
//! success, retry or failure, everything else goes back to the caller as
//! raw bytes.

use bytes::Buf;
use prost::Message;
use prost::encoding::{WireType, decode_key, decode_varint};

use super::Status;
use super::error::{HederaError, Result};

/// Response to any transaction submission.
#[derive(Clone, PartialEq, prost::Message)]
pub struct TransactionResponse {
    #[prost(int32, tag = "1")]
    pub node_transaction_precheck_code: i32,
    /// Fee the node would charge, filled in for cost-only submissions.
    #[prost(uint64, tag = "2")]
    pub cost: u64,
}

impl TransactionResponse {
    pub fn status(&self) -> Status {
        Status::from_code(self.node_transaction_precheck_code)
    }
}

/// Header that leads every query response body.
#[derive(Clone, PartialEq, prost::Message)]
pub struct ResponseHeader {
    #[prost(int32, tag = "1")]
    pub node_transaction_precheck_code: i32,
    #[prost(int32, tag = "2")]
    pub response_type: i32,
    #[prost(uint64, tag = "3")]
    pub cost: u64,
    #[prost(bytes = "vec", tag = "4")]
    pub state_proof: Vec<u8>,
}

impl ResponseHeader {
    pub fn status(&self) -> Status {
        Status::from_code(self.node_transaction_precheck_code)
    }
}

/// Any query response body: whatever the query, field 1 is the header.
#[derive(Clone, PartialEq, prost::Message)]
struct QueryResponseBody {
    #[prost(message, optional, tag = "1")]
    header: Option<ResponseHeader>,
}

pub fn decode_transaction_response(bytes: &[u8]) -> Result<TransactionResponse> {
    Ok(TransactionResponse::decode(bytes)?)
}

/// Reads the header out of a query `Response`.
///
/// `Response` is a single oneof whose arms are all messages, so the first
/// length-delimited field is the body that was answered, whatever its tag.
pub fn decode_query_header(bytes: &[u8]) -> Result<ResponseHeader> {
    let mut buf = bytes;

    while buf.has_remaining() {
        let (tag, wire_type) = decode_key(&mut buf)?;
        match wire_type {
            WireType::LengthDelimited => {
                let len = decode_varint(&mut buf)? as usize;
                if len > buf.remaining() {
                    return Err(HederaError::InvalidResponse(format!(
                        "field {} claims {} bytes but only {} remain",
                        tag,
                        len,
                        buf.remaining()
                    )));
                }
                let body = QueryResponseBody::decode(&buf[..len])?;
                return body.header.ok_or_else(|| {
                    HederaError::InvalidResponse(format!("query response {} has no header", tag))
                });
            }
            WireType::Varint => {
                decode_varint(&mut buf)?;
            }
            WireType::SixtyFourBit => skip(&mut buf, 8, tag)?,
            WireType::ThirtyTwoBit => skip(&mut buf, 4, tag)?,
            WireType::StartGroup | WireType::EndGroup => {
                return Err(HederaError::InvalidResponse(format!(
                    "unexpected group at field {}",
                    tag
                )));
            }
        }
    }

    Err(HederaError::InvalidResponse("query response is empty".to_string()))
}

fn skip(buf: &mut &[u8], len: usize, tag: u32) -> Result<()> {
    if buf.remaining() < len {
        return Err(HederaError::InvalidResponse(format!(
            "field {} truncated",
            tag
        )));
    }
    buf.advance(len);
    Ok(())
}
