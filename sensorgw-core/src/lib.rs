//! # sensorgw-core
//!
//! Client library for a sensor-network collector's application server.
//!
//! This crate contains:
//! - **Wire types**: `FrameHeader`, `Frame`, `Command`, `SensorCommand`
//! - **Codec**: `FrameCodec` for framed TCP I/O via `tokio_util`
//! - **Model**: `Device`, `DeviceRegistry`, `NetworkInfo`, `SensorReport`
//! - **Dispatch**: `Dispatcher` routing inbound frames and outbound requests
//! - **Client**: `GatewayClient` owning the link, with automatic reconnect
//! - **Events**: `EventBus` broadcasting `GatewayEvent`s to consumers
//! - **Error**: `GatewayError`, a typed `thiserror` hierarchy

pub mod client;
pub mod codec;
pub mod device;
pub mod dispatch;
pub mod error;
pub mod events;
pub mod frame;
pub mod header;
pub mod message;
pub mod network;
pub mod reader;
pub mod request;
pub mod sensor;
pub mod state;
pub mod telemetry;

// ── Re-exports for ergonomic usage ───────────────────────────────

pub use client::{ClientOptions, ConnectionInfo, GatewayClient, GatewayHandle, ServerConnection};
pub use codec::FrameCodec;
pub use device::{CapabilityInfo, Device, DeviceAddress, DeviceRegistry, DeviceStatus, PollingInterval};
pub use dispatch::Dispatcher;
pub use error::GatewayError;
pub use events::{EventBus, GatewayEvent, LinkStatus};
pub use frame::{Frame, MAX_FRAME_SIZE, MAX_PAYLOAD_SIZE, decode_all};
pub use header::{FrameHeader, HEADER_LENGTH};
pub use message::{Command, SensorCommand};
pub use network::{NetworkInfo, NetworkMode, NetworkState};
pub use request::{GatewayRequest, PermitJoinAction};
pub use sensor::{DataFields, SensorKind, SensorReport};
pub use state::LinkPhase;
pub use telemetry::{NullSink, TelemetrySink};
