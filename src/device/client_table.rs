//! Per-connection session state on the device side (spec §3
//! `ClientSession`). Subscriptions are a set, not a multiset: double
//! subscribing to the same stream is idempotent (spec §4.2).

use std::collections::HashSet;
use std::io::Write;
use std::net::TcpStream;
use std::time::Instant;

use crate::protocol::codec::{encode_frame, FrameReader};
use crate::protocol::envelope::Envelope;
use crate::protocol::frame::DeviceEvent;

pub type ClientId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamKind {
    Spectrum,
    Sensor,
    DeviceStatus,
}

pub struct ClientSession {
    pub id: ClientId,
    pub socket: TcpStream,
    pub reader: FrameReader,
    pub subscriptions: HashSet<StreamKind>,
    pub spectrum_cursor: usize,
    pub last_activity: Instant,
    envelope: Option<Envelope>,
    alive: bool,
}

impl ClientSession {
    pub fn new(id: ClientId, socket: TcpStream, envelope: Option<Envelope>) -> Self {
        socket.set_nonblocking(true).ok();
        ClientSession {
            id,
            socket,
            reader: FrameReader::new(envelope.clone()),
            subscriptions: HashSet::new(),
            spectrum_cursor: 0,
            last_activity: Instant::now(),
            envelope,
            alive: true,
        }
    }

    pub fn is_alive(&self) -> bool {
        self.alive
    }

    pub fn subscribe(&mut self, kind: StreamKind) {
        self.subscriptions.insert(kind);
    }

    pub fn unsubscribe(&mut self, kind: StreamKind) {
        self.subscriptions.remove(&kind);
    }

    pub fn is_subscribed(&self, kind: StreamKind) -> bool {
        self.subscriptions.contains(&kind)
    }

    /// Sends a single event frame; marks the session dead on any write
    /// failure so it is pruned from every subscription set on the next
    /// sweep (spec §4.1 "write to a closed peer").
    pub fn send(&mut self, event: &DeviceEvent) {
        let body = match serde_json::to_string(event) {
            Ok(body) => body,
            Err(e) => {
                log::error!("failed to serialize frame: {e}");
                return;
            }
        };
        let bytes = encode_frame(&body, self.envelope.as_ref());
        if self.socket.write_all(&bytes).is_err() {
            self.alive = false;
        }
    }

    /// Sends a raw plain-text response (used for plain-token commands).
    pub fn send_text(&mut self, text: &str) {
        let bytes = encode_frame(text, self.envelope.as_ref());
        if self.socket.write_all(&bytes).is_err() {
            self.alive = false;
        }
    }
}
