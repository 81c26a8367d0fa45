pub mod config;
pub mod device;
pub mod error;
pub mod host;
pub mod protocol;

use log::{set_max_level, LevelFilter};
use simple_logger::SimpleLogger;

/// Installs the process-wide logger (spec §6.7). `debug` raises the
/// level from the default `Info` to `Debug`; neither binary needs
/// anything finer-grained than that one knob.
pub fn init_logging(debug: bool) {
    SimpleLogger::new().init().unwrap();
    set_max_level(if debug { LevelFilter::Debug } else { LevelFilter::Info });
}
