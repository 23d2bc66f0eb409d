//! Lifecycle of the link to the application server.
//!
//! Transitions are validated and return `Result` instead of panicking.

use std::time::Instant;

use crate::error::GatewayError;
use crate::events::LinkStatus;

/// The current phase of the server link.
///
/// ```text
///  Disconnected ──► Connecting ──► Connected
///       ▲   │            │             │
///       │   ▼            ▼             ▼
///       │ ReconnectPending ◄── Disconnected
///       └──────────┘
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LinkPhase {
    #[default]
    Disconnected,

    Connecting,

    Connected {
        since: Instant,
    },

    /// A single reconnect timer is armed.
    ReconnectPending {
        since: Instant,
    },
}

impl std::fmt::Display for LinkPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Disconnected => write!(f, "Disconnected"),
            Self::Connecting => write!(f, "Connecting"),
            Self::Connected { .. } => write!(f, "Connected"),
            Self::ReconnectPending { .. } => write!(f, "ReconnectPending"),
        }
    }
}

impl LinkPhase {
    pub fn is_reconnect_pending(&self) -> bool {
        matches!(self, Self::ReconnectPending { .. })
    }

    /// How long the link has been up. `None` unless connected.
    pub fn connected_duration(&self) -> Option<std::time::Duration> {
        match self {
            Self::Connected { since } => Some(since.elapsed()),
            _ => None,
        }
    }

    pub fn to_status(&self) -> LinkStatus {
        match self {
            Self::Disconnected => LinkStatus::Disconnected,
            Self::Connecting => LinkStatus::Connecting,
            Self::Connected { .. } => LinkStatus::Connected,
            Self::ReconnectPending { .. } => LinkStatus::ReconnectPending,
        }
    }

    // ── Transitions ──────────────────────────────────────────────

    /// Valid from: `Disconnected`, `ReconnectPending`.
    pub fn begin_connect(&mut self) -> Result<(), GatewayError> {
        match self {
            Self::Disconnected | Self::ReconnectPending { .. } => {
                *self = Self::Connecting;
                Ok(())
            }
            _ => Err(GatewayError::InvalidTransition(
                "cannot connect: link is connecting or connected",
            )),
        }
    }

    /// Valid from: `Connecting`.
    pub fn complete_connect(&mut self) -> Result<(), GatewayError> {
        match self {
            Self::Connecting => {
                *self = Self::Connected {
                    since: Instant::now(),
                };
                Ok(())
            }
            _ => Err(GatewayError::InvalidTransition(
                "cannot complete connect: not in Connecting state",
            )),
        }
    }

    /// Connect failure, read error or end of stream.
    ///
    /// Valid from: `Connecting`, `Connected`.
    pub fn lose(&mut self) -> Result<(), GatewayError> {
        match self {
            Self::Connecting | Self::Connected { .. } => {
                *self = Self::Disconnected;
                Ok(())
            }
            _ => Err(GatewayError::InvalidTransition(
                "cannot lose link: not connecting or connected",
            )),
        }
    }

    /// Arm the reconnect timer. Returns `false` if one is already pending.
    pub fn schedule_reconnect(&mut self) -> bool {
        if self.is_reconnect_pending() {
            return false;
        }
        *self = Self::ReconnectPending {
            since: Instant::now(),
        };
        true
    }

    /// Force-reset to `Disconnected` regardless of current state.
    pub fn force_disconnect(&mut self) {
        *self = Self::Disconnected;
    }
}

// ── Tests ────────────────────────────────────────────────────────
