//! Sensor data carried in `DEVICE_DATA_RX_IND`.
//!
//! A 16-bit frame-control mask says which optional blocks follow. Blocks
//! have fixed sizes and appear in ascending bit order, so the decoder walks
//! [`FIELD_DECODERS`] in that order and consumes a block only when its bit
//! is set. Reordering that table breaks wire compatibility.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::error::GatewayError;
use crate::reader::PayloadReader;

bitflags! {
    /// Frame-control bits selecting the sensor blocks in a data message.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct DataFields: u16 {
        const TEMPERATURE    = 0x0001;
        const LIGHT          = 0x0002;
        const HUMIDITY       = 0x0004;
        const MSG_STATS      = 0x0008;
        const CONFIG_SETTINGS = 0x0010;
        const HALL_EFFECT    = 0x0020;
        const ACCEL          = 0x0040;
    }
}

// ── Readings ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TemperatureReading {
    pub ambience_temp: u16,
    pub object_temp: u16,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LightReading {
    pub raw_data: u16,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct HumidityReading {
    pub temp: u16,
    pub humidity: u16,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct HallEffectReading {
    pub flux: f32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AccelReading {
    pub x_axis: i16,
    pub y_axis: i16,
    pub z_axis: i16,
    pub x_tilt: u8,
    pub y_tilt: u8,
}

/// Reporting/polling intervals as reported by the device itself.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigSettings {
    pub reporting_interval: u32,
    pub polling_interval: u32,
}

/// Link statistics counters kept by the sensor firmware.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MessageStats {
    pub join_attempts: u16,
    pub join_fails: u16,
    pub msgs_attempted: u16,
    pub msgs_sent: u16,
    pub tracking_requests: u16,
    pub tracking_response_attempts: u16,
    pub tracking_response_sent: u16,
    pub config_requests: u16,
    pub config_response_attempts: u16,
    pub config_response_sent: u16,
    pub channel_access_failures: u16,
    pub mac_ack_failures: u16,
    pub other_data_request_failures: u16,
    pub sync_loss_indications: u16,
    pub rx_decrypt_failures: u16,
    pub tx_encrypt_failures: u16,
    pub reset_count: u16,
    pub last_reset_reason: u16,
    pub join_time: u16,
    pub interim_delay: u16,
}

impl MessageStats {
    fn read(r: &mut PayloadReader<'_>) -> Result<Self, GatewayError> {
        Ok(Self {
            join_attempts: r.u16()?,
            join_fails: r.u16()?,
            msgs_attempted: r.u16()?,
            msgs_sent: r.u16()?,
            tracking_requests: r.u16()?,
            tracking_response_attempts: r.u16()?,
            tracking_response_sent: r.u16()?,
            config_requests: r.u16()?,
            config_response_attempts: r.u16()?,
            config_response_sent: r.u16()?,
            channel_access_failures: r.u16()?,
            mac_ack_failures: r.u16()?,
            other_data_request_failures: r.u16()?,
            sync_loss_indications: r.u16()?,
            rx_decrypt_failures: r.u16()?,
            tx_encrypt_failures: r.u16()?,
            reset_count: r.u16()?,
            last_reset_reason: r.u16()?,
            join_time: r.u16()?,
            interim_delay: r.u16()?,
        })
    }
}

// ── SensorReport ─────────────────────────────────────────────────

/// Everything decoded from one sensor data message.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SensorReport {
    pub frame_control: DataFields,
    pub temperature: Option<TemperatureReading>,
    pub light: Option<LightReading>,
    pub humidity: Option<HumidityReading>,
    pub msg_stats: Option<MessageStats>,
    pub config_settings: Option<ConfigSettings>,
    pub hall_effect: Option<HallEffectReading>,
    pub accel: Option<AccelReading>,
}

impl Default for DataFields {
    fn default() -> Self {
        DataFields::empty()
    }
}

type FieldDecoder = fn(&mut PayloadReader<'_>, &mut SensorReport) -> Result<(), GatewayError>;

/// Sensor blocks in wire order.
pub const FIELD_DECODERS: [(DataFields, FieldDecoder); 7] = [
    (DataFields::TEMPERATURE, read_temperature),
    (DataFields::LIGHT, read_light),
    (DataFields::HUMIDITY, read_humidity),
    (DataFields::MSG_STATS, read_msg_stats),
    (DataFields::CONFIG_SETTINGS, read_config_settings),
    (DataFields::HALL_EFFECT, read_hall_effect),
    (DataFields::ACCEL, read_accel),
];

fn read_temperature(r: &mut PayloadReader<'_>, report: &mut SensorReport) -> Result<(), GatewayError> {
    report.temperature = Some(TemperatureReading {
        ambience_temp: r.u16()?,
        object_temp: r.u16()?,
    });
    Ok(())
}

fn read_light(r: &mut PayloadReader<'_>, report: &mut SensorReport) -> Result<(), GatewayError> {
    report.light = Some(LightReading { raw_data: r.u16()? });
    Ok(())
}

fn read_humidity(r: &mut PayloadReader<'_>, report: &mut SensorReport) -> Result<(), GatewayError> {
    report.humidity = Some(HumidityReading {
        temp: r.u16()?,
        humidity: r.u16()?,
    });
    Ok(())
}

fn read_msg_stats(r: &mut PayloadReader<'_>, report: &mut SensorReport) -> Result<(), GatewayError> {
    report.msg_stats = Some(MessageStats::read(r)?);
    Ok(())
}

fn read_config_settings(
    r: &mut PayloadReader<'_>,
    report: &mut SensorReport,
) -> Result<(), GatewayError> {
    report.config_settings = Some(ConfigSettings {
        reporting_interval: r.u32()?,
        polling_interval: r.u32()?,
    });
    Ok(())
}

fn read_hall_effect(r: &mut PayloadReader<'_>, report: &mut SensorReport) -> Result<(), GatewayError> {
    report.hall_effect = Some(HallEffectReading { flux: r.f32()? });
    Ok(())
}

fn read_accel(r: &mut PayloadReader<'_>, report: &mut SensorReport) -> Result<(), GatewayError> {
    report.accel = Some(AccelReading {
        x_axis: r.i16()?,
        y_axis: r.i16()?,
        z_axis: r.i16()?,
        x_tilt: r.u8()?,
        y_tilt: r.u8()?,
    });
    Ok(())
}

impl SensorReport {
    /// Decode the blocks selected by `frame_control` from `r`, leaving the
    /// cursor just past the last selected block. Undefined bits are kept
    /// in `frame_control` but consume nothing.
    pub fn decode(frame_control: u16, r: &mut PayloadReader<'_>) -> Result<Self, GatewayError> {
        let mut report = SensorReport {
            frame_control: DataFields::from_bits_retain(frame_control),
            ..Default::default()
        };
        for (bit, decode) in FIELD_DECODERS {
            if report.frame_control.contains(bit) {
                decode(r, &mut report)?;
            }
        }
        Ok(report)
    }

    /// The scalar readings forwarded to the telemetry sink.
    pub fn telemetry(&self) -> Vec<(SensorKind, f64)> {
        let mut readings = Vec::new();
        if let Some(t) = self.temperature {
            readings.push((SensorKind::Temperature, f64::from(t.ambience_temp)));
        }
        if let Some(l) = self.light {
            readings.push((SensorKind::Light, f64::from(l.raw_data)));
        }
        if let Some(h) = self.humidity {
            readings.push((SensorKind::Humidity, f64::from(h.humidity)));
        }
        if let Some(h) = self.hall_effect {
            readings.push((SensorKind::HallEffect, f64::from(h.flux)));
        }
        readings
    }
}

/// Sensor types that produce telemetry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorKind {
    Temperature,
    Light,
    Humidity,
    HallEffect,
}

impl std::fmt::Display for SensorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SensorKind::Temperature => write!(f, "temperature"),
            SensorKind::Light => write!(f, "light"),
            SensorKind::Humidity => write!(f, "humidity"),
            SensorKind::HallEffect => write!(f, "hall_effect"),
        }
    }
}
