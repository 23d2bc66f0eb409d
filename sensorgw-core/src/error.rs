//! Domain-specific error types for the application-server client.
//!
//! All fallible operations return `Result<T, GatewayError>`.
//! Nothing in the message path is fatal: the dispatcher logs an error and
//! drops the affected frame, the transport turns I/O errors into a
//! reconnect.

use thiserror::Error;

use crate::device::DeviceAddress;

/// The canonical error type for the gateway core.
#[derive(Debug, Error)]
pub enum GatewayError {
    // ── Protocol Errors ──────────────────────────────────────────
    /// A numeric value did not map to any known enum variant.
    #[error("unknown {type_name} discriminant: {value:#x}")]
    UnknownVariant { type_name: &'static str, value: u64 },

    /// A payload ended before all of its fields could be read.
    #[error("truncated {context}: needed {needed} bytes, {remaining} remaining")]
    Truncated {
        context: &'static str,
        needed: usize,
        remaining: usize,
    },

    /// The payload does not fit the 16-bit length field.
    #[error("frame too large: {size} bytes (max {max})")]
    FrameTooLarge { size: usize, max: usize },

    /// The received frame is longer than its header describes.
    #[error("invalid frame length: expected {expected}, got {actual}")]
    InvalidFrameLength { expected: usize, actual: usize },

    /// A data indication carried an address mode other than short/extended.
    #[error("unknown address mode: {0}")]
    UnknownAddressMode(u8),

    // ── Lookup Errors ────────────────────────────────────────────
    /// A message referenced a device that is not in the registry.
    #[error("device not found: {0}")]
    DeviceNotFound(DeviceAddress),

    /// A state change arrived before any network information.
    #[error("network information not yet known")]
    NetworkInfoMissing,

    // ── Validation Errors ────────────────────────────────────────
    /// An outbound request was rejected before any bytes were sent.
    #[error("invalid request: {0}")]
    InvalidRequest(&'static str),

    // ── Connection Errors ────────────────────────────────────────
    /// The TCP/IO layer reported an error.
    #[error("connection error: {0}")]
    Connection(#[from] std::io::Error),

    /// The link is not connected, so nothing can be written.
    #[error("not connected")]
    NotConnected,

    /// A link state transition was attempted from the wrong phase.
    #[error("invalid link transition: {0}")]
    InvalidTransition(&'static str),

    /// An mpsc channel was closed unexpectedly.
    #[error("channel closed")]
    ChannelClosed,
}

impl GatewayError {
    /// Shorthand used by payload readers.
    pub(crate) fn truncated(context: &'static str, needed: usize, remaining: usize) -> Self {
        GatewayError::Truncated {
            context,
            needed,
            remaining,
        }
    }
}

impl<T> From<tokio::sync::mpsc::error::SendError<T>> for GatewayError {
    fn from(_: tokio::sync::mpsc::error::SendError<T>) -> Self {
        GatewayError::ChannelClosed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_messages() {
        let e = GatewayError::truncated("sensor data", 4, 1);
        let msg = e.to_string();
        assert!(msg.contains("sensor data"));
        assert!(msg.contains('4'));

        let e = GatewayError::FrameTooLarge {
            size: 70_000,
            max: 65_535,
        };
        assert!(e.to_string().contains("70000"));
    }

    #[test]
    fn device_not_found_shows_address() {
        let e = GatewayError::DeviceNotFound(DeviceAddress::Short(0x1234));
        assert!(e.to_string().contains("0x1234"));
    }

    #[test]
    fn from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe broke");
        let e: GatewayError = io_err.into();
        assert!(matches!(e, GatewayError::Connection(_)));
    }

    #[tokio::test]
    async fn from_send_error() {
        let (tx, rx) = tokio::sync::mpsc::channel::<u8>(1);
        drop(rx);
        let e: GatewayError = tx.send(1).await.unwrap_err().into();
        assert!(matches!(e, GatewayError::ChannelClosed));
    }
}
