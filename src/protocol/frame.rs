//! Wire frame types (spec §6.1). JSON frames are tagged variants of a
//! closed enumeration (spec §9 "Dynamic dispatch on a `type` string ...
//! modeled as a tagged variant"); plain ASCII command tokens are parsed
//! separately since they carry no `type` field.

use serde::{Deserialize, Serialize};

/// Plain-text tokens a client may send to the device (spec §6.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlainCommand {
    GetStatus,
    GetVersion,
    Restart,
    StopData,
    StartData,
    GetSpectrum,
    GetSpectrumStream,
    StopSpectrumStream,
    GetSensorData,
    StopSensorStream,
}

impl PlainCommand {
    pub fn parse(token: &str) -> Option<Self> {
        match token.trim() {
            "GET_STATUS" => Some(Self::GetStatus),
            "GET_VERSION" => Some(Self::GetVersion),
            "RESTART" => Some(Self::Restart),
            "STOP_DATA" => Some(Self::StopData),
            "START_DATA" => Some(Self::StartData),
            "GET_SPECTRUM" => Some(Self::GetSpectrum),
            "GET_SPECTRUM_STREAM" => Some(Self::GetSpectrumStream),
            "STOP_SPECTRUM_STREAM" => Some(Self::StopSpectrumStream),
            "GET_SENSOR_DATA" => Some(Self::GetSensorData),
            "STOP_SENSOR_STREAM" => Some(Self::StopSensorStream),
            _ => None,
        }
    }

    /// The literal wire token for this command (inverse of `parse`); the
    /// host supervisor sends these directly (spec §4.4).
    pub fn as_token(self) -> &'static str {
        match self {
            Self::GetStatus => "GET_STATUS",
            Self::GetVersion => "GET_VERSION",
            Self::Restart => "RESTART",
            Self::StopData => "STOP_DATA",
            Self::StartData => "START_DATA",
            Self::GetSpectrum => "GET_SPECTRUM",
            Self::GetSpectrumStream => "GET_SPECTRUM_STREAM",
            Self::StopSpectrumStream => "STOP_SPECTRUM_STREAM",
            Self::GetSensorData => "GET_SENSOR_DATA",
            Self::StopSensorStream => "STOP_SENSOR_STREAM",
        }
    }
}

/// JSON commands a client may send to the device (spec §6.1). Also
/// `Serialize` since the host supervisor constructs and sends these
/// itself (e.g. `START_DEVICE_STATUS_STREAM` on connect, spec §4.4).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum DeviceCommand {
    #[serde(rename = "SET_ACQ")]
    SetAcq { integration_ms: i64, average: i64 },
    #[serde(rename = "REQ_DARK")]
    ReqDark,
    #[serde(rename = "REQ_WHITE")]
    ReqWhite,
    #[serde(rename = "GET_DEVICE_STATUS")]
    GetDeviceStatus,
    #[serde(rename = "START_DEVICE_STATUS_STREAM")]
    StartDeviceStatusStream,
    #[serde(rename = "STOP_DEVICE_STATUS_STREAM")]
    StopDeviceStatusStream,
}

/// Frames the device sends back to a client (spec §6.1 table). Also
/// `Deserialize` since the host side parses exactly these frames off the
/// wire (spec §4.1 "JSON dispatcher demultiplexing by `type` field").
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum DeviceEvent {
    #[serde(rename = "spectrum_data")]
    SpectrumData {
        timestamp: String,
        wavelengths: Vec<f32>,
        spectrum_values: Vec<f32>,
        file_name: String,
        data_points: usize,
        #[serde(skip_serializing_if = "Option::is_none")]
        row_index: Option<usize>,
        #[serde(skip_serializing_if = "Option::is_none")]
        total_rows: Option<usize>,
    },
    #[serde(rename = "sensor_data")]
    SensorData {
        timestamp: String,
        temperature: f32,
        humidity: f32,
        pressure: f32,
        status: String,
    },
    #[serde(rename = "device_status")]
    DeviceStatus {
        timestamp: String,
        device_temp: f32,
        lamp_temp: f32,
        detector: String,
        optics: String,
        uptime_sec: u64,
    },
    #[serde(rename = "heartbeat")]
    Heartbeat {
        timestamp: String,
        server_uptime: u64,
        client_count: usize,
    },
    #[serde(rename = "DARK_DATA")]
    DarkData {
        timestamp: String,
        wavelengths: Vec<f32>,
        spectrum_values: Vec<f32>,
    },
    #[serde(rename = "WHITE_DATA")]
    WhiteData {
        timestamp: String,
        wavelengths: Vec<f32>,
        spectrum_values: Vec<f32>,
    },
    #[serde(rename = "SET_ACQ_ACK")]
    SetAcqAck {
        timestamp: String,
        integration_ms: u32,
        average: u32,
    },
    #[serde(rename = "error")]
    Error { message: String },
}

/// Minimal envelope used only to read the `type` discriminant before
/// deciding which concrete struct to deserialize into (device->host
/// frames carry extra fields DeviceEvent's tagged enum can still parse
/// directly, but the host dispatcher also needs a cheap type peek for
/// logging unknown types).
#[derive(Debug, Deserialize)]
pub struct TypeTag {
    #[serde(rename = "type")]
    pub kind: String,
}
