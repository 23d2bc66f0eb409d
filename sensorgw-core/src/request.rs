//! Requests accepted from the presentation layer.

use serde::{Deserialize, Serialize};

use crate::device::DeviceAddress;
use crate::message::{PERMIT_JOIN_CLOSED, PERMIT_JOIN_FOREVER};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermitJoinAction {
    Open,
    Close,
}

impl PermitJoinAction {
    /// Join-permit duration sent on the wire.
    pub fn duration(&self) -> u32 {
        match self {
            PermitJoinAction::Open => PERMIT_JOIN_FOREVER,
            PermitJoinAction::Close => PERMIT_JOIN_CLOSED,
        }
    }
}

/// One call from the presentation layer.
///
/// `GetNetworkInfo` and `GetDeviceArray` are answered from local state;
/// the others turn into frames for the application server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    tag = "request",
    content = "data",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum GatewayRequest {
    GetNetworkInfo,
    GetDeviceArray,
    SetPermitJoin {
        action: PermitJoinAction,
    },
    SendToggle {
        target_address: Option<DeviceAddress>,
    },
    SendConfig {
        target_address: Option<DeviceAddress>,
        polling_interval: u16,
        reporting_interval: u16,
        frame_control: u16,
    },
}
