//! The device ("lower computer") process: a seeded spectrum source
//! served to any number of TCP clients over the shared line protocol
//! (spec §4.2-§4.3).

pub mod calibration_responder;
pub mod client_table;
pub mod dispatcher;
pub mod scheduler;
pub mod server;
pub mod spectrum_source;

pub use server::DeviceServer;
