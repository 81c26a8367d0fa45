//! Host-side JSON dispatcher: demultiplexes device->host frames by
//! `type` and drives calibration, preprocessing, quality, and inference
//! (spec §4.1 "JSON dispatcher demultiplexing by `type` field").

use crate::protocol::frame::{DeviceEvent, PlainCommand};
use crate::host::quality;
use crate::host::server::HostState;

/// A command the dispatcher wants sent back to the device (e.g. to stop
/// a breached stream). The caller owns the actual socket write.
pub enum Outgoing {
    Plain(PlainCommand),
}

pub fn dispatch(state: &mut HostState, text: &str) -> Vec<Outgoing> {
    let event: DeviceEvent = match serde_json::from_str(text) {
        Ok(event) => event,
        Err(e) => {
            log::warn!("host: unparseable frame, logging as plain text: {text} ({e})");
            return Vec::new();
        }
    };

    match event {
        DeviceEvent::SpectrumData {
            spectrum_values,
            wavelengths,
            timestamp,
            ..
        } => on_spectrum(state, wavelengths, spectrum_values, timestamp),
        DeviceEvent::DarkData { spectrum_values, .. } => {
            state.calibration.set_dark(spectrum_values);
            Vec::new()
        }
        DeviceEvent::WhiteData { spectrum_values, .. } => {
            state.calibration.set_white(spectrum_values);
            Vec::new()
        }
        DeviceEvent::Heartbeat { .. } => {
            state.supervisor.note_heartbeat(std::time::Instant::now());
            Vec::new()
        }
        DeviceEvent::SensorData { .. } | DeviceEvent::DeviceStatus { .. } => Vec::new(),
        DeviceEvent::SetAcqAck { .. } => {
            log::info!("device acknowledged acquisition settings");
            Vec::new()
        }
        DeviceEvent::Error { message } => {
            log::warn!("device reported error: {message}");
            Vec::new()
        }
    }
}

fn on_spectrum(
    state: &mut HostState,
    wavelengths: Vec<f32>,
    raw: Vec<f32>,
    timestamp: String,
) -> Vec<Outgoing> {
    let calibrated = state.calibration.apply(&raw);
    let processed = state.pipeline.run(&calibrated);

    let metrics = quality::evaluate(&processed, &state.config.quality);
    let mut outgoing = Vec::new();
    if let Some(breach) = state
        .breach_tracker
        .record(metrics.ok, state.config.quality.anomaly_limit)
    {
        log::warn!("{breach}");
        outgoing.push(Outgoing::Plain(PlainCommand::StopSpectrumStream));
    }

    state.pending_spectrum = Some((wavelengths, raw));
    state.inference_worker.submit(processed, timestamp);

    outgoing
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::server::HostState;

    #[test]
    fn dark_data_populates_calibration_store() {
        let mut state = HostState::for_tests();
        dispatch(
            &mut state,
            r#"{"type":"DARK_DATA","timestamp":"t","wavelengths":[1.0],"spectrum_values":[0.05]}"#,
        );
        assert!(state.calibration.has_dark());
    }

    #[test]
    fn malformed_json_does_not_panic() {
        let mut state = HostState::for_tests();
        let outgoing = dispatch(&mut state, "not json");
        assert!(outgoing.is_empty());
    }
}
