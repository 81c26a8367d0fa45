//! Error taxonomy (spec §7). One small enum per component area, each with
//! a manual `Display`/`std::error::Error` impl in the style of
//! `spectrum_feed_server.rs::Error` from the teacher repo, rather than a
//! single blanket error type.

use std::fmt;

/// TCP read/write/connect failures. Triggers the reconnect supervisor on
/// the host side; never treated as fatal.
#[derive(Debug)]
pub enum TransportError {
    Connect(std::io::Error),
    Read(std::io::Error),
    Write(std::io::Error),
    PeerClosed,
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TransportError::Connect(e) => write!(f, "connect failed: {e}"),
            TransportError::Read(e) => write!(f, "read failed: {e}"),
            TransportError::Write(e) => write!(f, "write failed: {e}"),
            TransportError::PeerClosed => write!(f, "peer closed the connection"),
        }
    }
}

impl std::error::Error for TransportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TransportError::Connect(e) | TransportError::Read(e) | TransportError::Write(e) => {
                Some(e)
            }
            TransportError::PeerClosed => None,
        }
    }
}

/// Frame envelope authentication tag mismatch (spec §4.1).
#[derive(Debug)]
pub struct AuthError;

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "envelope authentication tag mismatch")
    }
}

impl std::error::Error for AuthError {}

/// Malformed JSON or an unknown frame `type`/token (spec §4.1).
#[derive(Debug)]
pub enum ProtocolError {
    MalformedJson(String),
    UnknownCommand(String),
    MissingField(&'static str),
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ProtocolError::MalformedJson(s) => write!(f, "malformed JSON frame: {s}"),
            ProtocolError::UnknownCommand(s) => write!(f, "未知命令: {s}"),
            ProtocolError::MissingField(name) => write!(f, "missing required field: {name}"),
        }
    }
}

impl std::error::Error for ProtocolError {}

/// Feature/inference dimension mismatch (spec §4.8).
#[derive(Debug)]
pub struct ShapeError {
    pub expected: usize,
    pub got: usize,
}

impl fmt::Display for ShapeError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "shape mismatch: expected length {}, got {}",
            self.expected, self.got
        )
    }
}

impl std::error::Error for ShapeError {}

/// Model or calibration not loaded yet (spec §4.8/§4.5).
#[derive(Debug)]
pub struct NotReady(pub &'static str);

impl fmt::Display for NotReady {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "not ready: {}", self.0)
    }
}

impl std::error::Error for NotReady {}

/// Unifies the predictor façade's two distinct failure policies (spec
/// §4.8/§7): a `Shape` mismatch means skip this frame and log it, while
/// `NotReady` means return empty/no-op and warn once per state
/// transition. Keeping them as one enum (rather than collapsing one into
/// the other) lets callers apply the two policies correctly.
#[derive(Debug)]
pub enum PredictError {
    Shape(ShapeError),
    NotReady(NotReady),
}

impl fmt::Display for PredictError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            PredictError::Shape(e) => write!(f, "{e}"),
            PredictError::NotReady(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for PredictError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PredictError::Shape(e) => Some(e),
            PredictError::NotReady(e) => Some(e),
        }
    }
}

impl From<ShapeError> for PredictError {
    fn from(e: ShapeError) -> Self {
        PredictError::Shape(e)
    }
}

impl From<NotReady> for PredictError {
    fn from(e: NotReady) -> Self {
        PredictError::NotReady(e)
    }
}

/// Consecutive quality failures over the configured limit (spec §4.7).
#[derive(Debug)]
pub struct QualityBreach {
    pub consecutive_failures: u32,
}

impl fmt::Display for QualityBreach {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "quality breach: {} consecutive failing frames",
            self.consecutive_failures
        )
    }
}

impl std::error::Error for QualityBreach {}

/// Missing/unreadable config or model asset at startup. Causes the
/// process to abort with exit code 1 (spec §6.6/§7).
#[derive(Debug)]
pub struct FatalInit(pub String);

impl fmt::Display for FatalInit {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "fatal init error: {}", self.0)
    }
}

impl std::error::Error for FatalInit {}
