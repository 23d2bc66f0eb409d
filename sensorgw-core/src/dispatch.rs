//! Routes inbound frames to their handlers and turns presentation requests
//! into outbound frames.
//!
//! The dispatcher owns the device roster and the network descriptor; they
//! change only inside [`Dispatcher::dispatch`] and
//! [`Dispatcher::handle_request`], which run to completion on the client
//! task. Handler failures are logged and the frame is dropped: nothing
//! here stops the client.

use std::sync::Arc;

use tracing::{debug, trace, warn};

use crate::device::{CapabilityInfo, DeviceAddress, DeviceRegistry, JoinOutcome, RosterEntry};
use crate::error::GatewayError;
use crate::events::{EventBus, GatewayEvent};
use crate::frame::Frame;
use crate::message::{Command, NETWORK_STARTED, SUBSYSTEM_RPC, SensorCommand};
use crate::network::{self, NetworkInfo, RawNetworkInfo};
use crate::reader::PayloadReader;
use crate::request::GatewayRequest;
use crate::sensor::{DataFields, SensorReport};
use crate::telemetry::TelemetrySink;

const ADDR_MODE_SHORT: u8 = 2;
const ADDR_MODE_EXTENDED: u8 = 3;

pub struct Dispatcher {
    registry: DeviceRegistry,
    network: Option<NetworkInfo>,
    events: EventBus,
    sink: Arc<dyn TelemetrySink>,
}

impl Dispatcher {
    pub fn new(events: EventBus, sink: Arc<dyn TelemetrySink>) -> Self {
        Self {
            registry: DeviceRegistry::new(),
            network: None,
            events,
            sink,
        }
    }

    pub fn registry(&self) -> &DeviceRegistry {
        &self.registry
    }

    pub fn network_info(&self) -> Option<&NetworkInfo> {
        self.network.as_ref()
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    // ── Inbound ──────────────────────────────────────────────────

    /// Handle one frame from the application server. Returns a frame to
    /// send back when the handler asks for one.
    pub fn dispatch(&mut self, frame: &Frame) -> Option<Frame> {
        if frame.subsystem_id() != SUBSYSTEM_RPC {
            trace!(subsystem = frame.subsystem_id(), "frame from foreign subsystem");
        }

        let command = match frame.command() {
            Ok(command) => command,
            Err(_) => {
                warn!(command_id = frame.command_id(), "unknown command id; frame dropped");
                return None;
            }
        };
        debug!(%command, len = frame.payload().len(), "rx frame");

        let payload = frame.payload();
        let result = match command {
            Command::GetNwkInfoCnf => self.on_network_info_cnf(payload),
            Command::NwkInfoInd => self.on_network_info_ind(payload).map(|_| None),
            Command::GetDeviceArrayCnf => self.on_device_array_cnf(payload).map(|_| None),
            Command::DeviceJoinedInd => self.on_device_joined(payload).map(|_| None),
            Command::DeviceNotActiveUpdateInd => self.on_device_not_active(payload).map(|_| None),
            Command::DeviceDataRxInd => self.on_device_data(payload).map(|_| None),
            Command::CollectorStateCngInd => self.on_state_change(payload).map(|_| None),
            Command::SetJoinPermitCnf => self.on_join_permit_cnf(payload).map(|_| None),
            Command::TxDataCnf => Ok(None),
            other => {
                debug!(command = %other, "no handler; frame ignored");
                Ok(None)
            }
        };

        match result {
            Ok(reply) => reply,
            Err(e) => {
                warn!(%command, error = %e, "frame dropped");
                None
            }
        }
    }

    fn on_network_info_cnf(&mut self, payload: &[u8]) -> Result<Option<Frame>, GatewayError> {
        let mut r = PayloadReader::new(payload, "GET_NWK_INFO_CNF");
        let status = r.u8()?;
        let raw = RawNetworkInfo::read(&mut r)?;

        if status != NETWORK_STARTED {
            // The collector sends NWK_INFO_IND once the network is up.
            debug!(status, "network not started yet");
            return Ok(None);
        }

        self.apply_network_info(&raw);
        Ok(Some(Frame::get_device_array_req()))
    }

    fn on_network_info_ind(&mut self, payload: &[u8]) -> Result<(), GatewayError> {
        let mut r = PayloadReader::new(payload, "NWK_INFO_IND");
        let raw = RawNetworkInfo::read(&mut r)?;
        self.apply_network_info(&raw);
        Ok(())
    }

    fn apply_network_info(&mut self, raw: &RawNetworkInfo) {
        let info = network::create_or_update(&mut self.network, raw).clone();
        debug!(
            channel = info.channel,
            state = %info.state,
            mode = %info.network_mode,
            "network info"
        );
        self.events.publish(GatewayEvent::NetworkInfo(Some(info)));
    }

    fn on_device_array_cnf(&mut self, payload: &[u8]) -> Result<(), GatewayError> {
        let mut r = PayloadReader::new(payload, "GET_DEVICE_ARRAY_CNF");
        let status = r.u8()?;
        let count = r.u16()?;

        // Parse everything before touching the roster so a short payload
        // leaves it as it was.
        let mut entries = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let _pan_id = r.u16()?;
            entries.push(RosterEntry {
                short_address: r.u16()?,
                ext_address: r.u64()?,
                capability_info: CapabilityInfo::read(&mut r)?,
            });
        }
        debug!(status, count, "device array");

        self.registry.replace_snapshot(entries);
        self.events
            .publish(GatewayEvent::DeviceArray(self.registry.devices().to_vec()));
        Ok(())
    }

    fn on_device_joined(&mut self, payload: &[u8]) -> Result<(), GatewayError> {
        let mut r = PayloadReader::new(payload, "DEVICE_JOINED_IND");
        let _pan_id = r.u16()?;
        let short_address = r.u16()?;
        let ext_address = r.u64()?;
        let capability_info = CapabilityInfo::read(&mut r)?;

        let (index, outcome) =
            self.registry
                .upsert_on_join(short_address, ext_address, capability_info);
        if outcome == JoinOutcome::Created {
            debug!(index, "device added to roster");
        }
        self.publish_device(index);
        Ok(())
    }

    fn on_device_not_active(&mut self, payload: &[u8]) -> Result<(), GatewayError> {
        let mut r = PayloadReader::new(payload, "DEVICE_NOTACTIVE_UPDATE_IND");
        let _pan_id = r.u16()?;
        let short_address = r.u16()?;
        let _ext_address = r.u64()?;
        let timeout = r.u8()?;

        let index = self.registry.mark_inactive(short_address, timeout)?;
        self.publish_device(index);
        Ok(())
    }

    fn on_device_data(&mut self, payload: &[u8]) -> Result<(), GatewayError> {
        let mut r = PayloadReader::new(payload, "DEVICE_DATA_RX_IND");
        let address = match r.u8()? {
            ADDR_MODE_SHORT => DeviceAddress::Short(r.u16()?),
            ADDR_MODE_EXTENDED => DeviceAddress::Extended(r.u64()?),
            mode => return Err(GatewayError::UnknownAddressMode(mode)),
        };
        let rssi = r.i8()?;
        let inner = r.u8()?;
        let index = self.registry.find_by_address(&address);

        match SensorCommand::try_from(inner) {
            Ok(SensorCommand::SensorData) => {
                let _ext_address = r.u64()?;
                let frame_control = r.u16()?;
                let report = SensorReport::decode(frame_control, &mut r)?;
                if r.remaining() > 0 {
                    trace!(extra = r.remaining(), "trailing bytes after sensor data");
                }

                for (kind, value) in report.telemetry() {
                    self.sink.record(kind, value);
                }

                let index = index.ok_or(GatewayError::DeviceNotFound(address))?;
                if let Some(device) = self.registry.get_mut(index) {
                    device.apply_sensor_report(rssi, &report);
                }
                self.publish_device(index);
            }
            Ok(SensorCommand::ConfigRsp) => {
                let status = r.u16()?;
                let frame_control = DataFields::from_bits_retain(r.u16()?);
                let reporting_interval = r.u32()?;
                let polling_interval = r.u32()?;

                let index = index.ok_or(GatewayError::DeviceNotFound(address))?;
                if let Some(device) = self.registry.get_mut(index) {
                    if !device.apply_config_response(
                        status,
                        frame_control,
                        reporting_interval,
                        polling_interval,
                    ) {
                        debug!(%address, status, "device rejected config");
                    }
                }
                self.publish_device(index);
            }
            Ok(other) => debug!(%address, inner = %other, "sensor message ignored"),
            Err(_) => debug!(%address, inner, "unknown sensor message ignored"),
        }
        Ok(())
    }

    fn on_state_change(&mut self, payload: &[u8]) -> Result<(), GatewayError> {
        let mut r = PayloadReader::new(payload, "COLLECTOR_STATE_CNG_IND");
        let raw_state = r.u8()?;
        let info = self
            .network
            .as_mut()
            .ok_or(GatewayError::NetworkInfoMissing)?;
        info.update_state(raw_state);
        debug!(state = %info.state, "collector state changed");
        let snapshot = info.clone();
        self.events.publish(GatewayEvent::NetworkInfo(Some(snapshot)));
        Ok(())
    }

    fn on_join_permit_cnf(&mut self, payload: &[u8]) -> Result<(), GatewayError> {
        let mut r = PayloadReader::new(payload, "SET_JOIN_PERMIT_CNF");
        let status = r.u32()?;
        self.events
            .publish(GatewayEvent::PermitJoinConfirmation { status });
        Ok(())
    }

    fn publish_device(&self, index: usize) {
        if let Some(device) = self.registry.get(index) {
            self.events
                .publish(GatewayEvent::DeviceUpdate(device.clone()));
        }
    }

    // ── Outbound ─────────────────────────────────────────────────

    /// Answer a presentation request. Returns the frame to send, if any.
    /// Requests whose target cannot be resolved fail before anything is
    /// built.
    pub fn handle_request(&mut self, request: GatewayRequest) -> Result<Option<Frame>, GatewayError> {
        match request {
            GatewayRequest::GetNetworkInfo => {
                self.events
                    .publish(GatewayEvent::NetworkInfo(self.network.clone()));
                Ok(None)
            }
            GatewayRequest::GetDeviceArray => {
                self.events
                    .publish(GatewayEvent::DeviceArray(self.registry.devices().to_vec()));
                Ok(None)
            }
            GatewayRequest::SetPermitJoin { action } => {
                Ok(Some(Frame::set_join_permit_req(action.duration())))
            }
            GatewayRequest::SendToggle { target_address } => {
                let short_address = self.resolve_target(target_address)?;
                Ok(Some(Frame::toggle_req(short_address)))
            }
            GatewayRequest::SendConfig {
                target_address,
                polling_interval,
                reporting_interval,
                frame_control,
            } => {
                let short_address = self.resolve_target(target_address)?;
                Ok(Some(Frame::config_req(
                    short_address,
                    polling_interval,
                    reporting_interval,
                    frame_control,
                )))
            }
        }
    }

    /// Short address of the device a request targets.
    fn resolve_target(&self, target: Option<DeviceAddress>) -> Result<u16, GatewayError> {
        let address = target.ok_or(GatewayError::InvalidRequest("missing target address"))?;
        self.registry
            .find_by_address(&address)
            .and_then(|index| self.registry.get(index))
            .map(|device| device.short_address)
            .ok_or(GatewayError::DeviceNotFound(address))
    }
}
