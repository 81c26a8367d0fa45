//! Line-framed reader/writer with an optional envelope (spec §4.1).
//!
//! Each logical frame ends with a single LF byte. When encryption is
//! enabled, the envelope's `iv ‖ tag ‖ ciphertext` bytes are base64-encoded
//! before the LF is appended, so an opaque ciphertext byte can never be
//! mistaken for the line delimiter — the envelope's own byte layout (spec
//! §4.1) is unchanged, only the wire encoding around it is made line-safe.

use base64::Engine;
use log::warn;

use super::envelope::Envelope;
use crate::error::AuthError;

/// Accumulates bytes read from a socket and yields complete, decoded
/// frames. Residual (non-LF-terminated) bytes persist across calls.
pub struct FrameReader {
    buffer: Vec<u8>,
    envelope: Option<Envelope>,
}

impl FrameReader {
    pub fn new(envelope: Option<Envelope>) -> Self {
        Self {
            buffer: Vec::new(),
            envelope,
        }
    }

    /// Appends freshly-read bytes to the internal buffer.
    pub fn feed(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    /// Pops and decodes the next complete frame, if any. Empty frames are
    /// skipped. A decrypt failure drops that one frame and logs, without
    /// disturbing the rest of the buffer (spec §4.1, §7 `AuthError`).
    pub fn next_frame(&mut self) -> Option<String> {
        loop {
            let newline_pos = self.buffer.iter().position(|&b| b == b'\n')?;
            let line: Vec<u8> = self.buffer.drain(..=newline_pos).collect();
            let line = &line[..line.len() - 1]; // drop the LF
            if line.is_empty() {
                continue;
            }
            match self.decode_line(line) {
                Ok(text) => return Some(text),
                Err(_) => {
                    warn!("dropping frame: envelope authentication failed");
                    continue;
                }
            }
        }
    }

    fn decode_line(&self, line: &[u8]) -> Result<String, AuthError> {
        match &self.envelope {
            None => Ok(String::from_utf8_lossy(line).into_owned()),
            Some(envelope) => {
                let raw = base64::engine::general_purpose::STANDARD
                    .decode(line)
                    .map_err(|_| AuthError)?;
                let plaintext = envelope.decrypt(&raw)?;
                Ok(String::from_utf8_lossy(&plaintext).into_owned())
            }
        }
    }
}

/// Encodes one logical frame body (plain-text command or JSON text) into
/// the bytes to write to the wire, including the trailing LF.
pub fn encode_frame(body: &str, envelope: Option<&Envelope>) -> Vec<u8> {
    match envelope {
        None => {
            let mut out = body.as_bytes().to_vec();
            out.push(b'\n');
            out
        }
        Some(envelope) => {
            let ciphertext = envelope.encrypt(body.as_bytes());
            let encoded = base64::engine::general_purpose::STANDARD.encode(ciphertext);
            let mut out = encoded.into_bytes();
            out.push(b'\n');
            out
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_round_trip() {
        let mut reader = FrameReader::new(None);
        let encoded = encode_frame("GET_STATUS", None);
        reader.feed(&encoded);
        assert_eq!(reader.next_frame().as_deref(), Some("GET_STATUS"));
        assert_eq!(reader.next_frame(), None);
    }

    #[test]
    fn encrypted_round_trip() {
        let envelope = Envelope::from_password("secret");
        let mut reader = FrameReader::new(Some(envelope.clone()));
        let encoded = encode_frame("{\"type\":\"GET_STATUS\"}", Some(&envelope));
        reader.feed(&encoded);
        assert_eq!(
            reader.next_frame().as_deref(),
            Some("{\"type\":\"GET_STATUS\"}")
        );
    }

    #[test]
    fn partial_reads_persist() {
        let mut reader = FrameReader::new(None);
        reader.feed(b"GET_ST");
        assert_eq!(reader.next_frame(), None);
        reader.feed(b"ATUS\nGET_VERSION\n");
        assert_eq!(reader.next_frame().as_deref(), Some("GET_STATUS"));
        assert_eq!(reader.next_frame().as_deref(), Some("GET_VERSION"));
    }

    #[test]
    fn empty_frames_skipped() {
        let mut reader = FrameReader::new(None);
        reader.feed(b"\n\nGET_STATUS\n");
        assert_eq!(reader.next_frame().as_deref(), Some("GET_STATUS"));
    }

    #[test]
    fn tampered_frame_is_dropped_not_fatal() {
        let envelope = Envelope::from_password("secret");
        let mut reader = FrameReader::new(Some(envelope.clone()));
        let mut encoded = encode_frame("bad", Some(&envelope));
        encoded[0] = encoded[0].wrapping_add(1).max(1); // corrupt base64 content
        reader.feed(&encoded);
        reader.feed(&encode_frame("good", Some(&envelope)));
        assert_eq!(reader.next_frame().as_deref(), Some("good"));
    }
}
