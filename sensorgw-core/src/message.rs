//! Command identifiers carried in the frame header, and the inner
//! sensor-message identifiers tunnelled through data requests/indications.
//!
//! Uses proper enums with `TryFrom`; unknown values are errors, not panics.

use crate::error::GatewayError;
use std::fmt;

/// Subsystem id of the application-server RPC channel.
pub const SUBSYSTEM_RPC: u8 = 10;

/// `GET_NWK_INFO_CNF` status meaning the network is up and the rest of
/// the payload is valid.
pub const NETWORK_STARTED: u8 = 1;

/// Inner-message status meaning success.
pub const STATUS_SUCCESS: u16 = 0;

/// `SET_JOIN_PERMIT_REQ` duration that keeps the network open.
pub const PERMIT_JOIN_FOREVER: u32 = 0xFFFF_FFFF;

/// `SET_JOIN_PERMIT_REQ` duration that closes the network.
pub const PERMIT_JOIN_CLOSED: u32 = 0x0;

// ── Command ──────────────────────────────────────────────────────

/// All command ids understood by the application server.
///
/// `*_REQ` go gateway → server, `*_CNF`/`*_RSP`/`*_IND` go the other way.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    DeviceJoinedInd = 0,
    DeviceLeftInd = 1,
    NwkInfoInd = 2,
    GetNwkInfoReq = 3,
    GetNwkInfoRsp = 4,
    GetNwkInfoCnf = 5,
    GetDeviceArrayReq = 6,
    GetDeviceArrayCnf = 7,
    DeviceNotActiveUpdateInd = 8,
    DeviceDataRxInd = 9,
    CollectorStateCngInd = 10,
    SetJoinPermitReq = 11,
    SetJoinPermitCnf = 12,
    TxDataReq = 13,
    TxDataCnf = 14,
    RmvDeviceReq = 15,
    RmvDeviceRsp = 16,
    DevMovedInd = 17,
}

impl TryFrom<u8> for Command {
    type Error = GatewayError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Command::DeviceJoinedInd),
            1 => Ok(Command::DeviceLeftInd),
            2 => Ok(Command::NwkInfoInd),
            3 => Ok(Command::GetNwkInfoReq),
            4 => Ok(Command::GetNwkInfoRsp),
            5 => Ok(Command::GetNwkInfoCnf),
            6 => Ok(Command::GetDeviceArrayReq),
            7 => Ok(Command::GetDeviceArrayCnf),
            8 => Ok(Command::DeviceNotActiveUpdateInd),
            9 => Ok(Command::DeviceDataRxInd),
            10 => Ok(Command::CollectorStateCngInd),
            11 => Ok(Command::SetJoinPermitReq),
            12 => Ok(Command::SetJoinPermitCnf),
            13 => Ok(Command::TxDataReq),
            14 => Ok(Command::TxDataCnf),
            15 => Ok(Command::RmvDeviceReq),
            16 => Ok(Command::RmvDeviceRsp),
            17 => Ok(Command::DevMovedInd),
            _ => Err(GatewayError::UnknownVariant {
                type_name: "Command",
                value: value as u64,
            }),
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl Command {
    /// Returns `true` for ids this client sends rather than receives.
    pub fn is_request(&self) -> bool {
        matches!(
            self,
            Command::GetNwkInfoReq
                | Command::GetDeviceArrayReq
                | Command::SetJoinPermitReq
                | Command::TxDataReq
                | Command::RmvDeviceReq
        )
    }
}

// ── SensorCommand ────────────────────────────────────────────────

/// Sensor application message ids, the first payload byte of a
/// `TxDataReq` and the `innerCmdId` of a `DeviceDataRxInd`.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SensorCommand {
    ConfigReq = 1,
    ConfigRsp = 2,
    TrackingReq = 3,
    TrackingRsp = 4,
    SensorData = 5,
    ToggleReq = 6,
    ToggleRsp = 7,
}

impl TryFrom<u8> for SensorCommand {
    type Error = GatewayError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(SensorCommand::ConfigReq),
            2 => Ok(SensorCommand::ConfigRsp),
            3 => Ok(SensorCommand::TrackingReq),
            4 => Ok(SensorCommand::TrackingRsp),
            5 => Ok(SensorCommand::SensorData),
            6 => Ok(SensorCommand::ToggleReq),
            7 => Ok(SensorCommand::ToggleRsp),
            _ => Err(GatewayError::UnknownVariant {
                type_name: "SensorCommand",
                value: value as u64,
            }),
        }
    }
}

impl fmt::Display for SensorCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}
