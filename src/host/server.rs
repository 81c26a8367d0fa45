//! The host ("upper computer") process: connects to the device,
//! demultiplexes its frames, and drives the prediction pipeline (spec
//! §4.4, §5). Single cooperative event loop, as on the device side, plus
//! the dedicated inference thread (spec §5).

use std::io::{Read, Write};
use std::net::TcpStream;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::AppConfig;
use crate::error::PredictError;
use crate::host::calibration::CalibrationPair;
use crate::host::dispatcher::{self, Outgoing};
use crate::host::history::History;
use crate::host::inference_worker::{InferenceOutcome, InferenceWorker};
use crate::host::persistence::Store;
use crate::host::predictor::PredictionResult;
use crate::host::preprocessing::PreprocessingPipeline;
use crate::host::quality::BreachTracker;
use crate::host::supervisor::{ConnectionState, Supervisor};
use crate::host::threshold::{AlarmEvent, ThresholdEngine};
use crate::protocol::codec::{encode_frame, FrameReader};
use crate::protocol::envelope::Envelope;
use crate::protocol::frame::{DeviceCommand, PlainCommand};

const TICK: Duration = Duration::from_millis(20);
const HEARTBEAT_TICK: Duration = Duration::from_secs(1);

pub struct HostState {
    pub config: AppConfig,
    pub calibration: CalibrationPair,
    pub pipeline: PreprocessingPipeline,
    pub breach_tracker: BreachTracker,
    pub threshold: ThresholdEngine,
    pub history: History,
    pub supervisor: Supervisor,
    pub inference_worker: InferenceWorker,
    pub pending_spectrum: Option<(Vec<f32>, Vec<f32>)>,
    pub notified_not_ready: bool,
}

impl HostState {
    #[cfg(test)]
    pub fn for_tests() -> Self {
        let predict: Arc<
            dyn Fn(&[f32], String) -> Result<PredictionResult, PredictError> + Send + Sync,
        > = Arc::new(|_features, timestamp| {
            Ok(PredictionResult {
                timestamp,
                values: Default::default(),
            })
        });
        let (inference_worker, _rx) = InferenceWorker::spawn(predict);
        Self {
            config: AppConfig::default(),
            calibration: CalibrationPair::new(),
            pipeline: PreprocessingPipeline::new(),
            breach_tracker: BreachTracker::new(),
            threshold: ThresholdEngine::new(),
            history: History::new(),
            supervisor: Supervisor::new(),
            inference_worker,
            pending_spectrum: None,
            notified_not_ready: false,
        }
    }
}

pub struct HostServer {
    addr: String,
    envelope: Option<Envelope>,
    socket: Option<TcpStream>,
    reader: FrameReader,
    inference_rx: flume::Receiver<InferenceOutcome>,
    store: Store,
    state: HostState,
    last_heartbeat_tick: Instant,
}

impl HostServer {
    pub fn new(
        addr: String,
        config: AppConfig,
        envelope: Option<Envelope>,
        store: Store,
        predict: Arc<dyn Fn(&[f32], String) -> Result<PredictionResult, PredictError> + Send + Sync>,
    ) -> Self {
        let (inference_worker, inference_rx) = InferenceWorker::spawn(predict);
        Self {
            addr,
            envelope: envelope.clone(),
            socket: None,
            reader: FrameReader::new(envelope),
            inference_rx,
            store,
            state: HostState {
                config,
                calibration: CalibrationPair::new(),
                pipeline: PreprocessingPipeline::new(),
                breach_tracker: BreachTracker::new(),
                threshold: ThresholdEngine::new(),
                history: History::new(),
                supervisor: Supervisor::new(),
                inference_worker,
                pending_spectrum: None,
                notified_not_ready: false,
            },
            last_heartbeat_tick: Instant::now(),
        }
    }

    pub fn run(mut self) -> ! {
        self.state.supervisor.request_connect(true);
        loop {
            self.drive_connection();
            self.pump_socket();
            self.pump_heartbeat_watchdog();
            self.pump_inference_results();
            std::thread::sleep(TICK);
        }
    }

    fn drive_connection(&mut self) {
        let now = Instant::now();
        if self.state.supervisor.state() == ConnectionState::Connecting
            && self.state.supervisor.should_attempt_now(now)
        {
            match TcpStream::connect(&self.addr) {
                Ok(stream) => {
                    stream.set_nonblocking(true).ok();
                    self.socket = Some(stream);
                    self.reader = FrameReader::new(self.envelope.clone());
                    self.state.supervisor.on_connect_success(now);
                    log::info!("connected to device at {}", self.addr);
                    self.send_json(&DeviceCommand::StartDeviceStatusStream);
                    self.send_plain(PlainCommand::GetSensorData);
                }
                Err(e) => {
                    log::warn!("connect to {} failed: {e}", self.addr);
                    self.state.supervisor.on_connect_failure(now);
                }
            }
        }

        if self.state.supervisor.should_force_disconnect() {
            log::warn!("heartbeat timeout limit reached, forcing reconnect");
            self.socket = None;
            self.state.supervisor.force_disconnect(now);
        }
    }

    fn pump_socket(&mut self) {
        let Some(socket) = &mut self.socket else { return };
        let mut buf = [0u8; 4096];
        loop {
            match socket.read(&mut buf) {
                Ok(0) => {
                    log::warn!("device closed connection");
                    self.socket = None;
                    self.state.supervisor.force_disconnect(Instant::now());
                    return;
                }
                Ok(n) => self.reader.feed(&buf[..n]),
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => break,
                Err(_) => {
                    self.socket = None;
                    self.state.supervisor.force_disconnect(Instant::now());
                    return;
                }
            }
        }
        while let Some(text) = self.reader.next_frame() {
            for outgoing in dispatcher::dispatch(&mut self.state, &text) {
                match outgoing {
                    Outgoing::Plain(cmd) => self.send_plain(cmd),
                }
            }
        }
    }

    fn pump_heartbeat_watchdog(&mut self) {
        let now = Instant::now();
        if now.duration_since(self.last_heartbeat_tick) < HEARTBEAT_TICK {
            return;
        }
        self.last_heartbeat_tick = now;
        if self.state.supervisor.state() == ConnectionState::Connected {
            self.state.supervisor.tick_heartbeat(now);
        }
    }

    fn pump_inference_results(&mut self) {
        while let Ok(outcome) = self.inference_rx.try_recv() {
            match outcome {
                InferenceOutcome::Completed(result) => {
                    self.state.notified_not_ready = false;
                    self.commit_prediction(result);
                }
                InferenceOutcome::Failed(PredictError::Shape(e)) => {
                    log::warn!("inference shape mismatch, skipping frame: {e}");
                }
                InferenceOutcome::Failed(PredictError::NotReady(e)) => {
                    if !self.state.notified_not_ready {
                        log::warn!("{e}");
                        self.state.notified_not_ready = true;
                    }
                }
            }
        }
    }

    fn commit_prediction(&mut self, result: PredictionResult) {
        let Some((wavelengths, raw)) = self.state.pending_spectrum.take() else {
            return;
        };

        let mut statuses = Vec::with_capacity(result.values.len());
        for (property, value) in &result.values {
            let (band, event) = self.state.threshold.record(property, *value, &self.state.config);
            if let Some(AlarmEvent::Raised) = event {
                log::warn!("alarm raised for {property}: {value} outside [{}, {}]", band.min, band.max);
            } else if let Some(AlarmEvent::Cleared) = event {
                log::info!("alarm cleared for {property}");
            }
            statuses.push((property.clone(), *value, band.min, band.max, event));
        }

        if let Err(e) = self
            .store
            .commit_prediction(&result.timestamp, &wavelengths, &raw, &result, &statuses)
        {
            log::error!("failed to persist prediction: {e}");
        }

        self.state.history.push(result);
    }

    fn send_plain(&mut self, cmd: PlainCommand) {
        self.write_frame(cmd.as_token());
    }

    fn send_json(&mut self, cmd: &DeviceCommand) {
        match serde_json::to_string(cmd) {
            Ok(body) => self.write_frame(&body),
            Err(e) => log::error!("failed to serialize device command: {e}"),
        }
    }

    fn write_frame(&mut self, body: &str) {
        let Some(socket) = &mut self.socket else { return };
        let bytes = encode_frame(body, self.envelope.as_ref());
        if socket.write_all(&bytes).is_err() {
            log::warn!("write to device failed");
            self.socket = None;
            self.state.supervisor.force_disconnect(Instant::now());
        }
    }
}
