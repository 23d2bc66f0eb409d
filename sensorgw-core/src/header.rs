//! The 4-byte frame header.
//!
//! ```text
//! payload_length: u16 LE  (excludes the header itself)
//! subsystem_id:   u8
//! command_id:     u8
//! ```

pub const HEADER_LENGTH: usize = 4;

pub type FrameHeaderBytes = [u8; HEADER_LENGTH];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    payload_length: u16,
    subsystem_id: u8,
    command_id: u8,
}

impl FrameHeader {
    pub fn new(payload_length: u16, subsystem_id: u8, command_id: u8) -> Self {
        Self {
            payload_length,
            subsystem_id,
            command_id,
        }
    }

    pub fn to_bytes(&self) -> FrameHeaderBytes {
        let mut header: FrameHeaderBytes = [0; HEADER_LENGTH];
        header[0..2].copy_from_slice(&self.payload_length.to_le_bytes());
        header[2] = self.subsystem_id;
        header[3] = self.command_id;
        header
    }

    pub fn from_bytes(bytes: FrameHeaderBytes) -> Self {
        Self {
            payload_length: u16::from_le_bytes([bytes[0], bytes[1]]),
            subsystem_id: bytes[2],
            command_id: bytes[3],
        }
    }

    pub fn payload_length(&self) -> u16 {
        self.payload_length
    }

    pub fn subsystem_id(&self) -> u8 {
        self.subsystem_id
    }

    pub fn command_id(&self) -> u8 {
        self.command_id
    }

    /// Header plus payload.
    pub fn frame_length(&self) -> usize {
        HEADER_LENGTH + self.payload_length as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_is_little_endian() {
        let header = FrameHeader::new(0x0102, 10, 7);
        assert_eq!(header.to_bytes(), [0x02, 0x01, 10, 7]);
    }

    #[test]
    fn parse_header() {
        let header = FrameHeader::from_bytes([9, 0, 10, 13]);
        assert_eq!(header.payload_length(), 9);
        assert_eq!(header.subsystem_id(), 10);
        assert_eq!(header.command_id(), 13);
        assert_eq!(header.frame_length(), 13);
    }
}
