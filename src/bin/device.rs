//! Device ("lower computer") process entry point (spec §6.6).

use nir_telemetry::config::AppConfig;
use nir_telemetry::device::server::DeviceServer;
use nir_telemetry::device::spectrum_source::SpectrumMatrix;
use nir_telemetry::init_logging;
use nir_telemetry::protocol::envelope::Envelope;

fn parse_args() -> (Option<String>, u16, String, bool) {
    let args: Vec<String> = std::env::args().collect();
    let mut config_path = None;
    let mut port: u16 = 8888;
    let mut data_name = "spectrum_seed.csv".to_string();
    let mut debug = false;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--config" if i + 1 < args.len() => {
                config_path = Some(args[i + 1].clone());
                i += 2;
            }
            "--listen" if i + 1 < args.len() => {
                port = args[i + 1].parse().unwrap_or(port);
                i += 2;
            }
            "--data" if i + 1 < args.len() => {
                data_name = args[i + 1].clone();
                i += 2;
            }
            "-v" | "--debug" => {
                debug = true;
                i += 1;
            }
            _ => i += 1,
        }
    }
    (config_path, port, data_name, debug)
}

fn main() {
    let (config_path, port, data_name, debug) = parse_args();
    init_logging(debug);

    let config = match AppConfig::load(config_path.as_deref().map(std::path::Path::new)) {
        Ok(config) => config,
        Err(e) => {
            log::error!("{e}");
            std::process::exit(1);
        }
    };

    let exe_dir = std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(|p| p.to_path_buf()))
        .unwrap_or_else(|| std::path::PathBuf::from("."));
    let data_path = SpectrumMatrix::probe_path(&exe_dir, &data_name);

    let matrix = match SpectrumMatrix::load(&data_path) {
        Ok(matrix) => matrix,
        Err(e) => {
            log::error!("{e}");
            std::process::exit(1);
        }
    };

    let envelope = config
        .encryption
        .enabled
        .then(|| Envelope::from_password(&config.encryption.password));

    let server = match DeviceServer::bind(("0.0.0.0", port), matrix, data_name, envelope) {
        Ok(server) => server,
        Err(e) => {
            log::error!("failed to bind on port {port}: {e}");
            std::process::exit(2);
        }
    };

    server.run();
}
