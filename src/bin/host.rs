//! Host ("upper computer") process entry point (spec §6.6).

use std::path::PathBuf;
use std::sync::Arc;

use nir_telemetry::config::AppConfig;
use nir_telemetry::error::PredictError;
use nir_telemetry::host::persistence::Store;
use nir_telemetry::host::predictor::neural::NeuralBackend;
use nir_telemetry::host::predictor::support_vector::SupportVectorBackend;
use nir_telemetry::host::predictor::{PredictionResult, Predictor, PredictorBackend, PredictorConfig};
use nir_telemetry::host::HostServer;
use nir_telemetry::init_logging;
use nir_telemetry::protocol::envelope::Envelope;

struct Args {
    config_path: Option<String>,
    device_addr: String,
    model_info: Option<PathBuf>,
    preprocessing_params: Option<PathBuf>,
    weights: Option<PathBuf>,
    db_path: Option<PathBuf>,
    debug: bool,
}

fn parse_args() -> Args {
    let raw: Vec<String> = std::env::args().collect();
    let mut args = Args {
        config_path: None,
        device_addr: "127.0.0.1:8888".to_string(),
        model_info: None,
        preprocessing_params: None,
        weights: None,
        db_path: None,
        debug: false,
    };

    let mut i = 1;
    while i < raw.len() {
        match raw[i].as_str() {
            "--config" if i + 1 < raw.len() => {
                args.config_path = Some(raw[i + 1].clone());
                i += 2;
            }
            "--host" if i + 1 < raw.len() => {
                args.device_addr = raw[i + 1].clone();
                i += 2;
            }
            "--model-info" if i + 1 < raw.len() => {
                args.model_info = Some(PathBuf::from(&raw[i + 1]));
                i += 2;
            }
            "--preprocessing-params" if i + 1 < raw.len() => {
                args.preprocessing_params = Some(PathBuf::from(&raw[i + 1]));
                i += 2;
            }
            "--weights" if i + 1 < raw.len() => {
                args.weights = Some(PathBuf::from(&raw[i + 1]));
                i += 2;
            }
            "--db" if i + 1 < raw.len() => {
                args.db_path = Some(PathBuf::from(&raw[i + 1]));
                i += 2;
            }
            "-v" | "--debug" => {
                args.debug = true;
                i += 1;
            }
            _ => i += 1,
        }
    }
    args
}

/// A bootstrap config used when no model asset bundle is supplied: one
/// pass-through property, the identity feature selection, no scaler/PCA.
fn bootstrap_predictor_config() -> PredictorConfig {
    PredictorConfig {
        input_size: 1,
        output_size: 1,
        property_labels: vec!["value".to_string()],
        selected_feature_indices: vec![0],
        pca: None,
        property_scaler: None,
    }
}

fn main() {
    let args = parse_args();
    init_logging(args.debug);

    let config = match AppConfig::load(args.config_path.as_deref().map(std::path::Path::new)) {
        Ok(config) => config,
        Err(e) => {
            log::error!("{e}");
            std::process::exit(1);
        }
    };

    let exe_dir = std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(|p| p.to_path_buf()))
        .unwrap_or_else(|| PathBuf::from("."));
    let db_path = args
        .db_path
        .unwrap_or_else(|| exe_dir.join("..").join("data").join("runtime.sqlite"));

    let store = match Store::open(&db_path) {
        Ok(store) => store,
        Err(e) => {
            log::error!("{e}");
            std::process::exit(1);
        }
    };

    let predictor_config = match (&args.model_info, &args.preprocessing_params) {
        (Some(model_info), Some(params)) => match PredictorConfig::load(model_info, params) {
            Ok(config) => config,
            Err(e) => {
                log::error!("{e}");
                std::process::exit(1);
            }
        },
        _ => {
            log::warn!("no model asset bundle supplied, running with a bootstrap pass-through predictor");
            bootstrap_predictor_config()
        }
    };

    let backend: Box<dyn PredictorBackend + Send + Sync> = match &args.weights {
        Some(weights) => match NeuralBackend::load(weights, predictor_config.input_size, predictor_config.output_size) {
            Ok(backend) => Box::new(backend),
            Err(e) => {
                log::error!("{e}");
                std::process::exit(1);
            }
        },
        None => Box::new(SupportVectorBackend::with_defaults(
            predictor_config.input_size,
            predictor_config.output_size,
        )),
    };

    let predictor = Predictor::new(predictor_config, backend);
    let predict: Arc<dyn Fn(&[f32], String) -> Result<PredictionResult, PredictError> + Send + Sync> =
        Arc::new(move |spectrum, timestamp| predictor.predict(spectrum, timestamp));

    let envelope = config
        .encryption
        .enabled
        .then(|| Envelope::from_password(&config.encryption.password));

    let server = HostServer::new(args.device_addr, config, envelope, store, predict);
    server.run();
}
