//! Network (PAN) descriptor reported by the collector.
//!
//! Raw state and mode codes are mapped to labels here. An unmapped state is
//! a protocol violation but not an error: the label becomes `unknown` and
//! the code is logged.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::GatewayError;
use crate::reader::PayloadReader;

// ── NetworkState ─────────────────────────────────────────────────

/// Collector state as shown to consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkState {
    Waiting,
    Starting,
    Restoring,
    Started,
    Open,
    Close,
    Unknown,
}

impl NetworkState {
    /// Map a raw collector state code. `started` and `restored` both mean
    /// the network is running.
    pub fn from_raw(raw: u8) -> Self {
        match raw {
            0 => NetworkState::Waiting,
            1 => NetworkState::Starting,
            2 => NetworkState::Restoring,
            3 | 4 => NetworkState::Started,
            5 => NetworkState::Open,
            6 => NetworkState::Close,
            _ => {
                warn!(raw, "illegal collector state");
                NetworkState::Unknown
            }
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            NetworkState::Waiting => "waiting",
            NetworkState::Starting => "starting",
            NetworkState::Restoring => "restoring",
            NetworkState::Started => "started",
            NetworkState::Open => "open",
            NetworkState::Close => "close",
            NetworkState::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for NetworkState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

// ── NetworkMode ──────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NetworkMode {
    #[serde(rename = "Beacon Enabled")]
    BeaconEnabled,
    #[serde(rename = "Non Beacon")]
    NonBeacon,
    #[serde(rename = "Freq Hopping")]
    FreqHopping,
    #[serde(rename = "Unknown Mode")]
    Unknown,
}

impl NetworkMode {
    pub fn from_raw(raw: u8) -> Self {
        match raw {
            1 => NetworkMode::BeaconEnabled,
            2 => NetworkMode::NonBeacon,
            3 => NetworkMode::FreqHopping,
            _ => NetworkMode::Unknown,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            NetworkMode::BeaconEnabled => "Beacon Enabled",
            NetworkMode::NonBeacon => "Non Beacon",
            NetworkMode::FreqHopping => "Freq Hopping",
            NetworkMode::Unknown => "Unknown Mode",
        }
    }
}

impl std::fmt::Display for NetworkMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

// ── Wire form ────────────────────────────────────────────────────

/// Network fields as they appear in `NWK_INFO_IND` and, after the status
/// byte, in `GET_NWK_INFO_CNF`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawNetworkInfo {
    pub pan_id: u16,
    pub short_address: u16,
    pub ext_address: u64,
    pub channel: u8,
    pub fh: bool,
    pub security_enabled: bool,
    pub network_mode: u8,
    pub state: u8,
}

impl RawNetworkInfo {
    pub const WIRE_SIZE: usize = 17;

    pub fn read(r: &mut PayloadReader<'_>) -> Result<Self, GatewayError> {
        Ok(Self {
            pan_id: r.u16()?,
            short_address: r.u16()?,
            ext_address: r.u64()?,
            channel: r.u8()?,
            fh: r.bool()?,
            security_enabled: r.bool()?,
            network_mode: r.u8()?,
            state: r.u8()?,
        })
    }
}

// ── NetworkInfo ──────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PanCoordinator {
    pub pan_id: u16,
    pub short_address: u16,
    pub ext_address: u64,
}

/// The one network the collector runs. Created once per session and then
/// updated in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkInfo {
    pub fh: bool,
    pub channel: u8,
    pub pan_coord: PanCoordinator,
    pub security_enabled: bool,
    pub network_mode: NetworkMode,
    pub state: NetworkState,
}

impl NetworkInfo {
    pub fn create(raw: &RawNetworkInfo) -> Self {
        Self {
            fh: raw.fh,
            channel: raw.channel,
            pan_coord: PanCoordinator {
                pan_id: raw.pan_id,
                short_address: raw.short_address,
                ext_address: raw.ext_address,
            },
            security_enabled: raw.security_enabled,
            network_mode: NetworkMode::from_raw(raw.network_mode),
            state: NetworkState::from_raw(raw.state),
        }
    }

    pub fn update(&mut self, raw: &RawNetworkInfo) {
        *self = Self::create(raw);
    }

    /// Change only the state, e.g. on a collector state-change indication.
    pub fn update_state(&mut self, raw_state: u8) {
        self.state = NetworkState::from_raw(raw_state);
    }
}

/// Create the descriptor on first sight, otherwise update it in place.
pub fn create_or_update<'a>(
    slot: &'a mut Option<NetworkInfo>,
    raw: &RawNetworkInfo,
) -> &'a NetworkInfo {
    if let Some(info) = slot.as_mut() {
        info.update(raw);
    }
    slot.get_or_insert_with(|| NetworkInfo::create(raw))
}
