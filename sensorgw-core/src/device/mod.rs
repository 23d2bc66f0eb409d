//! Device model and the in-memory roster of known devices.

pub mod registry;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::GatewayError;
use crate::message::STATUS_SUCCESS;
use crate::reader::PayloadReader;
use crate::sensor::{
    AccelReading, ConfigSettings, DataFields, HallEffectReading, HumidityReading, LightReading,
    MessageStats, SensorReport, TemperatureReading,
};

pub use registry::{DeviceRegistry, JoinOutcome, RosterEntry};

// ── DeviceAddress ────────────────────────────────────────────────

/// Either of the two addresses a device is known by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceAddress {
    /// 16-bit PAN address; may be reassigned on rejoin.
    Short(u16),
    /// 64-bit IEEE address; the device's identity.
    Extended(u64),
}

impl fmt::Display for DeviceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceAddress::Short(a) => write!(f, "{a:#06x}"),
            DeviceAddress::Extended(a) => write!(f, "{a:#018x}"),
        }
    }
}

// ── CapabilityInfo ───────────────────────────────────────────────

/// The six capability flags a device reports when it joins. Each is one
/// byte on the wire.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilityInfo {
    pub pan_coord: bool,
    pub ffd: bool,
    pub mains_power: bool,
    pub rx_on_when_idle: bool,
    pub security: bool,
    pub alloc_addr: bool,
}

impl CapabilityInfo {
    pub const WIRE_SIZE: usize = 6;

    pub fn read(r: &mut PayloadReader<'_>) -> Result<Self, GatewayError> {
        Ok(Self {
            pan_coord: r.bool()?,
            ffd: r.bool()?,
            mains_power: r.bool()?,
            rx_on_when_idle: r.bool()?,
            security: r.bool()?,
            alloc_addr: r.bool()?,
        })
    }
}

// ── Device ───────────────────────────────────────────────────────

/// Whether the coordinator still considers the device reachable.
///
/// Devices are never removed from the roster; an inactive device keeps its
/// slot so indices held by consumers stay valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceStatus {
    Active,
    Inactive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PollingInterval {
    Millis(u32),
    /// The device does not sleep, so it is never polled.
    AlwaysOn,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Device {
    pub short_address: u16,
    pub ext_address: u64,
    pub capability_info: CapabilityInfo,
    pub status: DeviceStatus,
    /// Signal strength of the last message heard from the device.
    pub rssi: Option<i8>,
    pub temperature: Option<TemperatureReading>,
    pub light: Option<LightReading>,
    pub humidity: Option<HumidityReading>,
    pub hall_effect: Option<HallEffectReading>,
    pub accel: Option<AccelReading>,
    pub msg_stats: Option<MessageStats>,
    pub config_settings: Option<ConfigSettings>,
    pub reporting_interval: Option<u32>,
    pub polling_interval: Option<PollingInterval>,
}

impl Device {
    pub fn new(short_address: u16, ext_address: u64, capability_info: CapabilityInfo) -> Self {
        Self {
            short_address,
            ext_address,
            capability_info,
            status: DeviceStatus::Active,
            rssi: None,
            temperature: None,
            light: None,
            humidity: None,
            hall_effect: None,
            accel: None,
            msg_stats: None,
            config_settings: None,
            reporting_interval: None,
            polling_interval: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == DeviceStatus::Active
    }

    pub fn matches(&self, address: &DeviceAddress) -> bool {
        match *address {
            DeviceAddress::Short(a) => self.short_address == a,
            DeviceAddress::Extended(a) => self.ext_address == a,
        }
    }

    /// Rejoin: the coordinator may hand out a new short address.
    pub fn update_join(&mut self, short_address: u16, capability_info: CapabilityInfo) {
        self.short_address = short_address;
        self.capability_info = capability_info;
        self.status = DeviceStatus::Active;
    }

    pub fn mark_inactive(&mut self) {
        self.status = DeviceStatus::Inactive;
    }

    /// Store the readings of a sensor data message.
    pub fn apply_sensor_report(&mut self, rssi: i8, report: &SensorReport) {
        self.status = DeviceStatus::Active;
        self.rssi = Some(rssi);
        if report.temperature.is_some() {
            self.temperature = report.temperature;
        }
        if report.light.is_some() {
            self.light = report.light;
        }
        if report.humidity.is_some() {
            self.humidity = report.humidity;
        }
        if report.hall_effect.is_some() {
            self.hall_effect = report.hall_effect;
        }
        if report.accel.is_some() {
            self.accel = report.accel;
        }
        if report.msg_stats.is_some() {
            self.msg_stats = report.msg_stats;
        }
        if report.config_settings.is_some() {
            self.config_settings = report.config_settings;
        }
    }

    /// Apply a config response. Returns `false` and changes nothing when
    /// the device rejected the configuration.
    pub fn apply_config_response(
        &mut self,
        status: u16,
        frame_control: DataFields,
        reporting_interval: u32,
        polling_interval: u32,
    ) -> bool {
        if status != STATUS_SUCCESS {
            return false;
        }
        self.status = DeviceStatus::Active;
        if frame_control.contains(DataFields::TEMPERATURE) {
            self.temperature = Some(TemperatureReading::default());
        }
        if frame_control.contains(DataFields::LIGHT) {
            self.light = Some(LightReading::default());
        }
        if frame_control.contains(DataFields::HUMIDITY) {
            self.humidity = Some(HumidityReading::default());
        }
        if frame_control.contains(DataFields::HALL_EFFECT) {
            self.hall_effect = Some(HallEffectReading::default());
        }
        self.reporting_interval = Some(reporting_interval);
        self.polling_interval = Some(if self.capability_info.rx_on_when_idle {
            PollingInterval::Millis(polling_interval)
        } else {
            PollingInterval::AlwaysOn
        });
        true
    }
}
