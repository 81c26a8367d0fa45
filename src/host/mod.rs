//! The host ("upper computer") process: connects to a device, applies
//! calibration/preprocessing/quality scoring, runs the predictor façade
//! on a dedicated inference thread, tracks threshold alarms, and
//! persists results (spec §2 "Host side").

pub mod calibration;
pub mod dispatcher;
pub mod history;
pub mod inference_worker;
pub mod persistence;
pub mod predictor;
pub mod preprocessing;
pub mod quality;
pub mod server;
pub mod supervisor;
pub mod threshold;

pub use server::HostServer;
