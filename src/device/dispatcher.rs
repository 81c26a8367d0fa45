//! Command routing for a single parsed frame (spec §4.1, §6.1). Plain
//! ASCII tokens and tagged JSON commands share one entry point; unknown
//! input produces an `error` frame rather than closing the connection.

use crate::config::AcquisitionConfig;
use crate::device::calibration_responder::CalibrationKind;
use crate::device::client_table::{ClientSession, StreamKind};
use crate::device::server::DeviceState;
use crate::protocol::frame::{DeviceCommand, DeviceEvent, PlainCommand};
use crate::protocol::now_timestamp;

pub fn dispatch(state: &mut DeviceState, client: &mut ClientSession, text: &str) {
    client.last_activity = std::time::Instant::now();

    if let Some(plain) = PlainCommand::parse(text) {
        dispatch_plain(state, client, plain);
        return;
    }

    match serde_json::from_str::<DeviceCommand>(text) {
        Ok(cmd) => dispatch_json(state, client, cmd),
        Err(_) => {
            log::warn!("client {} sent unrecognized frame: {text}", client.id);
            client.send(&DeviceEvent::Error {
                message: format!("未知命令: {text}"),
            });
        }
    }
}

fn dispatch_plain(state: &mut DeviceState, client: &mut ClientSession, cmd: PlainCommand) {
    match cmd {
        PlainCommand::GetStatus => client.send_text("STATUS_OK"),
        PlainCommand::GetVersion => client.send_text("VERSION 1.0"),
        PlainCommand::Restart => client.send_text("RESTART_ACK"),
        PlainCommand::StopData => client.send_text("STOP_DATA_ACK"),
        PlainCommand::StartData => client.send_text("START_DATA_ACK"),
        PlainCommand::GetSpectrum => {
            let idx = state.matrix.cursor();
            let row = state.matrix.next_row().to_vec();
            client.send(&DeviceEvent::SpectrumData {
                timestamp: now_timestamp(),
                wavelengths: state.matrix.wavelengths.clone(),
                spectrum_values: row,
                file_name: state.file_name.clone(),
                data_points: state.matrix.n(),
                row_index: Some(idx),
                total_rows: Some(state.matrix.m()),
            });
        }
        PlainCommand::GetSpectrumStream => {
            client.spectrum_cursor = state.matrix.cursor();
            client.subscribe(StreamKind::Spectrum);
        }
        PlainCommand::StopSpectrumStream => client.unsubscribe(StreamKind::Spectrum),
        PlainCommand::GetSensorData => client.subscribe(StreamKind::Sensor),
        PlainCommand::StopSensorStream => client.unsubscribe(StreamKind::Sensor),
    }
}

fn dispatch_json(state: &mut DeviceState, client: &mut ClientSession, cmd: DeviceCommand) {
    match cmd {
        DeviceCommand::SetAcq {
            integration_ms,
            average,
        } => {
            state.acquisition = AcquisitionConfig::clamped(integration_ms, average);
            client.send(&DeviceEvent::SetAcqAck {
                timestamp: now_timestamp(),
                integration_ms: state.acquisition.integration_ms,
                average: state.acquisition.average,
            });
        }
        DeviceCommand::ReqDark => {
            let row = state.matrix.row(state.matrix.cursor()).to_vec();
            state.calibration.schedule(client.id, CalibrationKind::Dark, row);
        }
        DeviceCommand::ReqWhite => {
            let row = state.matrix.row(state.matrix.cursor()).to_vec();
            state.calibration.schedule(client.id, CalibrationKind::White, row);
        }
        DeviceCommand::GetDeviceStatus => {
            client.send(&DeviceEvent::DeviceStatus {
                timestamp: now_timestamp(),
                device_temp: 35.0,
                lamp_temp: 60.0,
                detector: "ok".to_string(),
                optics: "ok".to_string(),
                uptime_sec: state.start_time.elapsed().as_secs(),
            });
        }
        DeviceCommand::StartDeviceStatusStream => client.subscribe(StreamKind::DeviceStatus),
        DeviceCommand::StopDeviceStatusStream => client.unsubscribe(StreamKind::DeviceStatus),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::calibration_responder::CalibrationResponder;
    use std::net::{TcpListener, TcpStream};

    fn connected_pair() -> (TcpStream, TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let client = TcpStream::connect(addr).unwrap();
        let (server, _) = listener.accept().unwrap();
        (client, server)
    }

    #[test]
    fn set_acq_clamps_and_acks() {
        let (_client_sock, server_sock) = connected_pair();
        let mut session = ClientSession::new(0, server_sock, None);
        let mut state = DeviceState {
            matrix: crate::device::spectrum_source::SpectrumMatrix::load(
                write_minimal_csv().path(),
            )
            .unwrap(),
            acquisition: AcquisitionConfig::default(),
            calibration: CalibrationResponder::new(),
            file_name: "seed.csv".into(),
            start_time: std::time::Instant::now(),
        };

        dispatch_json(
            &mut state,
            &mut session,
            DeviceCommand::SetAcq {
                integration_ms: -5,
                average: 50_000,
            },
        );
        assert_eq!(state.acquisition.integration_ms, 1);
        assert_eq!(state.acquisition.average, 1000);
    }

    #[test]
    fn unknown_token_yields_error_frame_not_panic() {
        let (_client_sock, server_sock) = connected_pair();
        let mut session = ClientSession::new(0, server_sock, None);
        let mut state = DeviceState {
            matrix: crate::device::spectrum_source::SpectrumMatrix::load(
                write_minimal_csv().path(),
            )
            .unwrap(),
            acquisition: AcquisitionConfig::default(),
            calibration: CalibrationResponder::new(),
            file_name: "seed.csv".into(),
            start_time: std::time::Instant::now(),
        };
        dispatch(&mut state, &mut session, "BOGUS_TOKEN");
        assert!(session.is_alive());
    }

    fn write_minimal_csv() -> tempfile::NamedTempFile {
        use std::io::Write as _;
        let mut file = tempfile::NamedTempFile::new().unwrap();
        for i in 0..9 {
            writeln!(file, "junk{i}").unwrap();
        }
        writeln!(file, "label,x,500,510").unwrap();
        writeln!(file, "row0,l,1.0,2.0").unwrap();
        file
    }
}
