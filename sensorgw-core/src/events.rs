//! Outward notifications for the presentation layer.
//!
//! The client publishes on a `tokio::sync::broadcast` channel; every
//! subscriber sees every event in publish order. A subscriber that falls
//! more than `capacity` events behind loses the oldest ones.

use serde::Serialize;
use tokio::sync::broadcast;
use tracing::trace;

use crate::device::Device;
use crate::network::NetworkInfo;

/// Transport phase as reported to consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkStatus {
    Disconnected,
    Connecting,
    Connected,
    ReconnectPending,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum GatewayEvent {
    /// Current network descriptor; `None` until the collector reports one.
    NetworkInfo(Option<NetworkInfo>),
    DeviceUpdate(Device),
    DeviceArray(Vec<Device>),
    PermitJoinConfirmation { status: u32 },
    LinkState(LinkStatus),
}

impl GatewayEvent {
    pub fn name(&self) -> &'static str {
        match self {
            GatewayEvent::NetworkInfo(_) => "networkInfo",
            GatewayEvent::DeviceUpdate(_) => "deviceUpdate",
            GatewayEvent::DeviceArray(_) => "deviceArray",
            GatewayEvent::PermitJoinConfirmation { .. } => "permitJoinConfirmation",
            GatewayEvent::LinkState(_) => "linkState",
        }
    }
}

pub const DEFAULT_EVENT_CAPACITY: usize = 256;

#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<GatewayEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<GatewayEvent> {
        self.tx.subscribe()
    }

    /// Publish to every current subscriber. Having none is not an error.
    pub fn publish(&self, event: GatewayEvent) {
        let name = event.name();
        match self.tx.send(event) {
            Ok(receivers) => trace!(event = name, receivers, "event published"),
            Err(_) => trace!(event = name, "event published with no subscribers"),
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CAPACITY)
    }
}
