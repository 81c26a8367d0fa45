//! Shared configuration (spec §6.5). Unlike the teacher's `confy`-backed
//! YAML config, the spec requires a JSON file whose path is injected at
//! startup, so this loads plain `serde_json` instead of using `confy`.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use crate::error::FatalInit;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct ThresholdBand {
    pub min: f32,
    pub max: f32,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct QualityLimits {
    pub snr_min: f32,
    pub baseline_max: f32,
    pub integrity_min: f32,
    pub anomaly_limit: u32,
}

impl Default for QualityLimits {
    fn default() -> Self {
        Self {
            snr_min: 5.0,
            baseline_max: 0.1,
            integrity_min: 0.95,
            anomaly_limit: 5,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct EncryptionConfig {
    pub enabled: bool,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub thresholds: HashMap<String, ThresholdBand>,
    #[serde(default)]
    pub quality: QualityLimits,
    #[serde(default)]
    pub encryption: EncryptionConfig,
}

impl AppConfig {
    /// Loads config from `path`. A missing path is not an error — callers
    /// that pass `None` get `AppConfig::default()`. A *named* path that
    /// cannot be read or parsed is `FatalInit` (spec §7).
    pub fn load(path: Option<&Path>) -> Result<Self, FatalInit> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = std::fs::read_to_string(path)
            .map_err(|e| FatalInit(format!("cannot read config {}: {e}", path.display())))?;
        serde_json::from_str(&text)
            .map_err(|e| FatalInit(format!("cannot parse config {}: {e}", path.display())))
    }

    /// Looks up a threshold band by property key, case-insensitively.
    /// Missing keys are an open band (spec §4.10/§3).
    pub fn threshold_for(&self, property: &str) -> ThresholdBand {
        let key = property.to_lowercase();
        self.thresholds
            .iter()
            .find(|(k, _)| k.to_lowercase() == key)
            .map(|(_, v)| *v)
            .unwrap_or(ThresholdBand {
                min: f32::NEG_INFINITY,
                max: f32::INFINITY,
            })
    }
}

/// Device-side acquisition configuration (spec §3, `AcquisitionConfig`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AcquisitionConfig {
    pub integration_ms: u32,
    pub average: u32,
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self {
            integration_ms: 100,
            average: 10,
        }
    }
}

impl AcquisitionConfig {
    /// Bounds clamped on ingest (spec §3/§8): integration_ms in
    /// [1, 60000], average in [1, 1000].
    pub fn clamped(integration_ms: i64, average: i64) -> Self {
        Self {
            integration_ms: integration_ms.clamp(1, 60_000) as u32,
            average: average.clamp(1, 1000) as u32,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp_low() {
        let acq = AcquisitionConfig::clamped(0, 0);
        assert_eq!(acq.integration_ms, 1);
        assert_eq!(acq.average, 1);
    }

    #[test]
    fn clamp_high() {
        let acq = AcquisitionConfig::clamped(99_999, 99_999);
        assert_eq!(acq.integration_ms, 60_000);
        assert_eq!(acq.average, 1000);
    }

    #[test]
    fn threshold_lookup_case_insensitive() {
        let mut cfg = AppConfig::default();
        cfg.thresholds
            .insert("Moisture".to_string(), ThresholdBand { min: 0.0, max: 1.0 });
        let band = cfg.threshold_for("moisture");
        assert_eq!(band, ThresholdBand { min: 0.0, max: 1.0 });
    }

    #[test]
    fn missing_threshold_is_open_band() {
        let cfg = AppConfig::default();
        let band = cfg.threshold_for("unknown");
        assert_eq!(band.min, f32::NEG_INFINITY);
        assert_eq!(band.max, f32::INFINITY);
    }
}
