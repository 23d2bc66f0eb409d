//! `tokio_util` codec for the length-prefixed application-server framing.
//!
//! Partial frames stay in the read buffer until the rest arrives, so a
//! frame split across two TCP reads is reassembled rather than mis-parsed.

use bytes::{Buf, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::error::GatewayError;
use crate::frame::Frame;
use crate::header::{FrameHeader, HEADER_LENGTH};

#[derive(Debug, Default)]
pub struct FrameCodec {}

impl Decoder for FrameCodec {
    type Item = Frame;
    type Error = GatewayError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.len() < HEADER_LENGTH {
            return Ok(None);
        }

        let header = FrameHeader::from_bytes([src[0], src[1], src[2], src[3]]);
        let frame_length = header.frame_length();
        if src.len() < frame_length {
            src.reserve(frame_length - src.len());
            return Ok(None);
        }

        let mut bytes = src.split_to(frame_length);
        bytes.advance(HEADER_LENGTH);
        Ok(Some(Frame::from_parts(header, bytes.to_vec())))
    }
}

impl Encoder<Frame> for FrameCodec {
    type Error = GatewayError;

    fn encode(&mut self, item: Frame, dst: &mut BytesMut) -> Result<(), Self::Error> {
        dst.reserve(item.header().frame_length());
        dst.extend_from_slice(&item.header().to_bytes());
        dst.extend_from_slice(item.payload());
        Ok(())
    }
}
