//! A complete wire frame (header + payload) and the builders for every
//! request this client sends.

use std::fmt::Debug;

use bytes::{BufMut, BytesMut};
use tokio_util::codec::Decoder;

use crate::codec::FrameCodec;
use crate::error::GatewayError;
use crate::header::{FrameHeader, HEADER_LENGTH};
use crate::message::{Command, SUBSYSTEM_RPC, SensorCommand};

/// Largest payload the 16-bit length field can describe.
pub const MAX_PAYLOAD_SIZE: usize = u16::MAX as usize;

/// Largest frame on the wire.
pub const MAX_FRAME_SIZE: usize = HEADER_LENGTH + MAX_PAYLOAD_SIZE;

#[derive(Clone, PartialEq, Eq)]
pub struct Frame {
    header: FrameHeader,
    payload: Vec<u8>,
}

impl Frame {
    /// Frame on the RPC subsystem.
    pub fn new(command: Command, payload: Vec<u8>) -> Result<Self, GatewayError> {
        Self::with_subsystem(SUBSYSTEM_RPC, command as u8, payload)
    }

    /// Frame with an explicit subsystem and raw command id.
    pub fn with_subsystem(
        subsystem_id: u8,
        command_id: u8,
        payload: Vec<u8>,
    ) -> Result<Self, GatewayError> {
        if payload.len() > MAX_PAYLOAD_SIZE {
            return Err(GatewayError::FrameTooLarge {
                size: payload.len(),
                max: MAX_PAYLOAD_SIZE,
            });
        }
        let header = FrameHeader::new(payload.len() as u16, subsystem_id, command_id);
        Ok(Self { header, payload })
    }

    pub(crate) fn from_parts(header: FrameHeader, payload: Vec<u8>) -> Self {
        Self { header, payload }
    }

    // ── Request builders ─────────────────────────────────────────

    pub fn get_network_info_req() -> Self {
        Self::empty(Command::GetNwkInfoReq)
    }

    pub fn get_device_array_req() -> Self {
        Self::empty(Command::GetDeviceArrayReq)
    }

    /// `duration` is [`PERMIT_JOIN_FOREVER`](crate::message::PERMIT_JOIN_FOREVER)
    /// or [`PERMIT_JOIN_CLOSED`](crate::message::PERMIT_JOIN_CLOSED) in practice.
    pub fn set_join_permit_req(duration: u32) -> Self {
        let mut payload = Vec::with_capacity(4);
        payload.put_u32_le(duration);
        Self::fixed(Command::SetJoinPermitReq, payload)
    }

    /// Data request carrying a sensor config request for `short_address`.
    pub fn config_req(
        short_address: u16,
        polling_interval: u16,
        reporting_interval: u16,
        frame_control: u16,
    ) -> Self {
        let mut payload = Vec::with_capacity(9);
        payload.put_u8(SensorCommand::ConfigReq as u8);
        payload.put_u16_le(short_address);
        payload.put_u16_le(polling_interval);
        payload.put_u16_le(reporting_interval);
        payload.put_u16_le(frame_control);
        Self::fixed(Command::TxDataReq, payload)
    }

    /// Data request carrying an LED toggle for `short_address`.
    pub fn toggle_req(short_address: u16) -> Self {
        let mut payload = Vec::with_capacity(3);
        payload.put_u8(SensorCommand::ToggleReq as u8);
        payload.put_u16_le(short_address);
        Self::fixed(Command::TxDataReq, payload)
    }

    fn empty(command: Command) -> Self {
        Self::fixed(command, Vec::new())
    }

    // Payloads built here are a few bytes long, far below the length limit.
    fn fixed(command: Command, payload: Vec<u8>) -> Self {
        let header = FrameHeader::new(payload.len() as u16, SUBSYSTEM_RPC, command as u8);
        Self { header, payload }
    }

    // ── Accessors ────────────────────────────────────────────────

    pub fn header(&self) -> &FrameHeader {
        &self.header
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn command_id(&self) -> u8 {
        self.header.command_id()
    }

    pub fn command(&self) -> Result<Command, GatewayError> {
        Command::try_from(self.header.command_id())
    }

    pub fn subsystem_id(&self) -> u8 {
        self.header.subsystem_id()
    }

    // ── Wire ─────────────────────────────────────────────────────

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.header.frame_length());
        bytes.extend_from_slice(&self.header.to_bytes());
        bytes.extend_from_slice(&self.payload);
        bytes
    }

    /// Parse exactly one frame; `bytes` must hold the header and the full
    /// payload and nothing more.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, GatewayError> {
        if bytes.len() < HEADER_LENGTH {
            return Err(GatewayError::truncated("frame header", HEADER_LENGTH, bytes.len()));
        }
        let header = FrameHeader::from_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        if bytes.len() < header.frame_length() {
            return Err(GatewayError::truncated(
                "frame payload",
                header.frame_length(),
                bytes.len(),
            ));
        }
        if bytes.len() > header.frame_length() {
            return Err(GatewayError::InvalidFrameLength {
                expected: header.frame_length(),
                actual: bytes.len(),
            });
        }
        Ok(Self {
            header,
            payload: bytes[HEADER_LENGTH..].to_vec(),
        })
    }
}

/// Split one transport delivery into frames without keeping state.
///
/// Returns the complete frames in order and the number of trailing bytes
/// that did not form a complete frame. The streaming client uses
/// [`FrameCodec`] directly so those bytes are carried into the next read
/// instead.
pub fn decode_all(buffer: &[u8]) -> (Vec<Frame>, usize) {
    let mut codec = FrameCodec::default();
    let mut src = BytesMut::from(buffer);
    let mut frames = Vec::new();
    // The codec never fails on a well-sized header.
    while let Ok(Some(frame)) = codec.decode(&mut src) {
        frames.push(frame);
    }
    (frames, src.len())
}

impl Debug for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Frame")
            .field("header", &self.header)
            .field("payload", &self.payload)
            .finish()
    }
}
