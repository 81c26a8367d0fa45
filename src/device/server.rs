//! The device-side listener and single cooperative event loop (spec
//! §4.2 overview, §5). Grounded on the teacher's
//! `SpectrumFeedServer::run`: one thread accepts connections and hands
//! them to the main loop over a channel; the main loop owns the client
//! table and is the only thing that mutates it (spec §5 "safe-erase
//! pattern").

use std::io::Read;
use std::net::{TcpListener, TcpStream};
use std::time::{Duration, Instant};

use flume::Receiver;

use crate::config::AcquisitionConfig;
use crate::device::calibration_responder::{self, CalibrationResponder};
use crate::device::client_table::{ClientId, ClientSession, StreamKind};
use crate::device::dispatcher;
use crate::device::scheduler::Scheduler;
use crate::device::spectrum_source::SpectrumMatrix;
use crate::protocol::envelope::Envelope;
use crate::protocol::frame::DeviceEvent;
use crate::protocol::now_timestamp;

const TICK: Duration = Duration::from_millis(5);

pub struct DeviceState {
    pub matrix: SpectrumMatrix,
    pub acquisition: AcquisitionConfig,
    pub calibration: CalibrationResponder,
    pub file_name: String,
    pub start_time: Instant,
}

pub struct DeviceServer {
    listener: TcpListener,
    new_conn_rx: Receiver<TcpStream>,
    envelope: Option<Envelope>,
    clients: Vec<ClientSession>,
    next_id: ClientId,
    scheduler: Scheduler,
    state: DeviceState,
}

impl DeviceServer {
    pub fn bind(
        addr: impl std::net::ToSocketAddrs,
        matrix: SpectrumMatrix,
        file_name: String,
        envelope: Option<Envelope>,
    ) -> std::io::Result<Self> {
        let listener = TcpListener::bind(addr)?;
        listener.set_nonblocking(true)?;
        log::info!("device listening on {}", listener.local_addr()?);

        let (new_conn_tx, new_conn_rx) = flume::unbounded();
        let accept_listener = listener.try_clone()?;
        std::thread::spawn(move || {
            for stream in accept_listener.incoming() {
                match stream {
                    Ok(stream) => {
                        stream.set_nonblocking(true).ok();
                        if new_conn_tx.send(stream).is_err() {
                            break;
                        }
                    }
                    Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                        std::thread::sleep(Duration::from_millis(1));
                    }
                    Err(e) => {
                        log::error!("accept failed: {e}");
                    }
                }
            }
        });

        Ok(Self {
            listener,
            new_conn_rx,
            envelope,
            clients: Vec::new(),
            next_id: 0,
            scheduler: Scheduler::new(),
            state: DeviceState {
                matrix,
                acquisition: AcquisitionConfig::default(),
                calibration: CalibrationResponder::new(),
                file_name,
                start_time: Instant::now(),
            },
        })
    }

    pub fn run(mut self) -> ! {
        loop {
            self.accept_pending();
            self.read_clients();
            self.fire_streams();
            self.deliver_calibration();
            self.prune_dead();
            std::thread::sleep(TICK);
        }
    }

    fn accept_pending(&mut self) {
        while let Ok(stream) = self.new_conn_rx.try_recv() {
            let id = self.next_id;
            self.next_id += 1;
            log::info!(
                "client {id} connected from {:?}",
                stream.peer_addr().ok()
            );
            self.clients
                .push(ClientSession::new(id, stream, self.envelope.clone()));
        }
    }

    fn read_clients(&mut self) {
        let mut buf = [0u8; 4096];
        for client in &mut self.clients {
            loop {
                match client.socket.read(&mut buf) {
                    Ok(0) => {
                        break;
                    }
                    Ok(n) => client.reader.feed(&buf[..n]),
                    Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => break,
                    Err(_) => break,
                }
            }
            while let Some(text) = client.reader.next_frame() {
                dispatcher::dispatch(&mut self.state, client, &text);
            }
        }
    }

    fn fire_streams(&mut self) {
        let now = Instant::now();

        let has_spectrum = self
            .clients
            .iter()
            .any(|c| c.is_subscribed(StreamKind::Spectrum));
        if self.scheduler.spectrum_due(has_spectrum, now) {
            for client in &mut self.clients {
                if !client.is_subscribed(StreamKind::Spectrum) {
                    continue;
                }
                let idx = client.spectrum_cursor;
                let row = self.state.matrix.row(idx).to_vec();
                client.spectrum_cursor = (idx + 1) % self.state.matrix.m();
                client.send(&DeviceEvent::SpectrumData {
                    timestamp: now_timestamp(),
                    wavelengths: self.state.matrix.wavelengths.clone(),
                    spectrum_values: row,
                    file_name: self.state.file_name.clone(),
                    data_points: self.state.matrix.n(),
                    row_index: Some(idx),
                    total_rows: Some(self.state.matrix.m()),
                });
            }
        }

        let has_sensor = self
            .clients
            .iter()
            .any(|c| c.is_subscribed(StreamKind::Sensor));
        if self.scheduler.sensor_due(has_sensor, now) {
            let reading = synthetic_sensor_reading();
            for client in &mut self.clients {
                if client.is_subscribed(StreamKind::Sensor) {
                    client.send(&reading);
                }
            }
        }

        let has_status = self
            .clients
            .iter()
            .any(|c| c.is_subscribed(StreamKind::DeviceStatus));
        if self.scheduler.device_status_due(has_status, now) {
            let status = synthetic_device_status(self.state.start_time.elapsed().as_secs());
            for client in &mut self.clients {
                if client.is_subscribed(StreamKind::DeviceStatus) {
                    client.send(&status);
                }
            }
        }

        // Heartbeat goes to every live client (spec §4.2 table: implicit
        // subscription).
        if self.scheduler.heartbeat_due(!self.clients.is_empty(), now) {
            let event = DeviceEvent::Heartbeat {
                timestamp: now_timestamp(),
                server_uptime: self.state.start_time.elapsed().as_secs(),
                client_count: self.clients.len(),
            };
            for client in &mut self.clients {
                client.send(&event);
            }
        }
    }

    fn deliver_calibration(&mut self) {
        let due = self.state.calibration.due(Instant::now());
        for task in due {
            let Some(client) = self.clients.iter_mut().find(|c| c.id == task.client_id) else {
                continue; // requester disconnected meanwhile: drop silently
            };
            if !client.is_alive() {
                continue;
            }
            let event = match task.kind {
                calibration_responder::CalibrationKind::Dark => DeviceEvent::DarkData {
                    timestamp: now_timestamp(),
                    wavelengths: self.state.matrix.wavelengths.clone(),
                    spectrum_values: calibration_responder::dark_values(&task.row),
                },
                calibration_responder::CalibrationKind::White => DeviceEvent::WhiteData {
                    timestamp: now_timestamp(),
                    wavelengths: self.state.matrix.wavelengths.clone(),
                    spectrum_values: calibration_responder::white_values(&task.row),
                },
            };
            client.send(&event);
        }
    }

    fn prune_dead(&mut self) {
        let before = self.clients.len();
        self.clients.retain(|c| c.is_alive());
        if self.clients.len() != before {
            log::info!("pruned {} dead client(s)", before - self.clients.len());
        }
    }
}

fn synthetic_sensor_reading() -> DeviceEvent {
    DeviceEvent::SensorData {
        timestamp: now_timestamp(),
        temperature: 23.5,
        humidity: 45.0,
        pressure: 1013.0,
        status: "ok".to_string(),
    }
}

fn synthetic_device_status(uptime_sec: u64) -> DeviceEvent {
    DeviceEvent::DeviceStatus {
        timestamp: now_timestamp(),
        device_temp: 35.0,
        lamp_temp: 60.0,
        detector: "ok".to_string(),
        optics: "ok".to_string(),
        uptime_sec,
    }
}
