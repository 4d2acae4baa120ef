use bytes::{Buf, BufMut, Bytes};
use tonic::Status;
use tonic::codec::{Codec, DecodeBuf, Decoder, EncodeBuf, Encoder};

/// Pass-through tonic codec for pre-serialized protobuf payloads.
///
/// Requests are built once, before the first attempt, and every retry puts
/// exactly those bytes on the wire. Responses come back as the raw message
/// body for the request kind to decode.
#[derive(Debug, Clone, Copy, Default)]
pub struct RawBytesCodec;

impl RawBytesCodec {
    /// Writes a payload into an outgoing message buffer.
    pub fn write_payload(payload: &Bytes, dst: &mut impl BufMut) {
        dst.put_slice(payload);
    }

    /// Takes everything left in an incoming message buffer.
    pub fn read_payload(src: &mut impl Buf) -> Bytes {
        src.copy_to_bytes(src.remaining())
    }
}

impl Codec for RawBytesCodec {
    type Encode = Bytes;
    type Decode = Bytes;
    type Encoder = RawBytesEncoder;
    type Decoder = RawBytesDecoder;

    fn encoder(&mut self) -> Self::Encoder {
        RawBytesEncoder
    }

    fn decoder(&mut self) -> Self::Decoder {
        RawBytesDecoder
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RawBytesEncoder;

impl Encoder for RawBytesEncoder {
    type Item = Bytes;
    type Error = Status;

    fn encode(&mut self, item: Self::Item, dst: &mut EncodeBuf<'_>) -> Result<(), Self::Error> {
        RawBytesCodec::write_payload(&item, dst);
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RawBytesDecoder;

impl Decoder for RawBytesDecoder {
    type Item = Bytes;
    type Error = Status;

    fn decode(&mut self, src: &mut DecodeBuf<'_>) -> Result<Option<Self::Item>, Self::Error> {
        Ok(Some(RawBytesCodec::read_payload(src)))
    }
}
