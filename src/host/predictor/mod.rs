//! Predictor façade: SNV -> VIP feature selection -> optional PCA ->
//! back-end inference -> inverse target scaling (spec §4.8). Grounded on
//! `original_source/upper_computer/predictor/basic/{pre_processing,
//! feature_selection,feature_reduction}.cpp` for the per-stage formulas
//! and on `original_source/upper_computer/PredictionWorker.cpp` for the
//! ordering of the stages.

pub mod neural;
pub mod support_vector;

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

use crate::error::{FatalInit, NotReady, PredictError, ShapeError};

/// A fixed linear PCA projection: `(x - mean) . componentsᵀ` (spec
/// GLOSSARY "PCA").
#[derive(Debug, Clone)]
pub struct PcaProjection {
    pub mean: Vec<f32>,
    /// Row-major `K_pca x V`.
    pub components: Vec<Vec<f32>>,
}

#[derive(Debug, Clone)]
pub struct PropertyScaler {
    pub mean: Vec<f32>,
    pub scale: Vec<f32>,
}

#[derive(Debug, Clone)]
pub struct PredictorConfig {
    pub input_size: usize,
    pub output_size: usize,
    pub property_labels: Vec<String>,
    pub selected_feature_indices: Vec<usize>,
    pub pca: Option<PcaProjection>,
    pub property_scaler: Option<PropertyScaler>,
}

#[derive(Debug, Deserialize)]
struct ModelInfoJson {
    input_size: usize,
    output_size: usize,
    property_labels: Vec<String>,
    #[serde(default)]
    #[allow(dead_code)]
    wavelength_labels: Vec<String>,
    #[serde(default)]
    selected_feature_indices: Vec<usize>,
}

#[derive(Debug, Deserialize)]
struct PropertyScalerJson {
    mean: Vec<f32>,
    scale: Vec<f32>,
}

#[derive(Debug, Deserialize)]
struct PcaJson {
    #[serde(default)]
    #[allow(dead_code)]
    n_components: usize,
    mean: Vec<f32>,
    components: Vec<Vec<f32>>,
}

#[derive(Debug, Deserialize)]
struct PreprocessingParamsJson {
    property_scaler: PropertyScalerJson,
    #[serde(default)]
    pca: Option<PcaJson>,
}

impl PredictorConfig {
    /// Loads `model_info.json` and `preprocessing_params.json` (spec
    /// §6.3 "Model Asset Bundle").
    pub fn load(model_info_path: &Path, preprocessing_params_path: &Path) -> Result<Self, FatalInit> {
        let model_info_text = std::fs::read_to_string(model_info_path).map_err(|e| {
            FatalInit(format!("cannot read {}: {e}", model_info_path.display()))
        })?;
        let model_info: ModelInfoJson = serde_json::from_str(&model_info_text)
            .map_err(|e| FatalInit(format!("cannot parse {}: {e}", model_info_path.display())))?;

        let params_text = std::fs::read_to_string(preprocessing_params_path).map_err(|e| {
            FatalInit(format!(
                "cannot read {}: {e}",
                preprocessing_params_path.display()
            ))
        })?;
        let params: PreprocessingParamsJson = serde_json::from_str(&params_text).map_err(|e| {
            FatalInit(format!(
                "cannot parse {}: {e}",
                preprocessing_params_path.display()
            ))
        })?;

        let selected_feature_indices = if model_info.selected_feature_indices.is_empty() {
            (0..model_info.input_size).collect()
        } else {
            model_info.selected_feature_indices
        };

        Ok(Self {
            input_size: model_info.input_size,
            output_size: model_info.output_size,
            property_labels: model_info.property_labels,
            selected_feature_indices,
            pca: params.pca.map(|p| PcaProjection {
                mean: p.mean,
                components: p.components,
            }),
            property_scaler: Some(PropertyScaler {
                mean: params.property_scaler.mean,
                scale: params.property_scaler.scale,
            }),
        })
    }
}

/// A loaded back-end's capability: map a feature vector of its declared
/// input size to an output vector of its declared output size (spec
/// §4.8 "two interchangeable back-ends implementing one interface").
pub trait PredictorBackend {
    fn input_size(&self) -> usize;
    fn output_size(&self) -> usize;
    fn forward(&self, features: &[f32]) -> Result<Vec<f32>, NotReady>;
}

/// Lets the host pick a back-end at runtime and still hand `Predictor` a
/// single concrete type.
impl PredictorBackend for Box<dyn PredictorBackend + Send + Sync> {
    fn input_size(&self) -> usize {
        (**self).input_size()
    }
    fn output_size(&self) -> usize {
        (**self).output_size()
    }
    fn forward(&self, features: &[f32]) -> Result<Vec<f32>, NotReady> {
        (**self).forward(features)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PredictionResult {
    pub timestamp: String,
    pub values: HashMap<String, f32>,
}

pub struct Predictor<B: PredictorBackend> {
    config: PredictorConfig,
    backend: B,
}

impl<B: PredictorBackend> Predictor<B> {
    pub fn new(config: PredictorConfig, backend: B) -> Self {
        Self { config, backend }
    }

    /// Runs the full façade pipeline on a raw spectrum of length `L`
    /// (spec §4.8). `timestamp` is stamped onto the result by the caller.
    /// A dimension mismatch and a not-ready back-end are distinct
    /// failures (spec §7) and are never conflated here.
    pub fn predict(&self, spectrum: &[f32], timestamp: String) -> Result<PredictionResult, PredictError> {
        let snv = snv_normalize(spectrum);
        let selected = select_features(&snv, &self.config.selected_feature_indices)?;

        let projected = match &self.config.pca {
            Some(pca) => project_pca(&selected, pca)?,
            None => selected,
        };

        if projected.len() != self.backend.input_size() {
            return Err(ShapeError {
                expected: self.backend.input_size(),
                got: projected.len(),
            }
            .into());
        }

        let raw_output = self.backend.forward(&projected)?;

        if raw_output.len() != self.config.output_size {
            return Err(ShapeError {
                expected: self.config.output_size,
                got: raw_output.len(),
            }
            .into());
        }

        let scaled = match &self.config.property_scaler {
            Some(scaler) => inverse_scale(&raw_output, scaler),
            None => raw_output,
        };

        let values = self
            .config
            .property_labels
            .iter()
            .cloned()
            .zip(scaled)
            .collect();

        Ok(PredictionResult { timestamp, values })
    }
}

/// `(v - mean(v)) / std(v)`, falling back to mean-subtraction only when
/// `std == 0` (spec §4.8 step 1).
pub fn snv_normalize(v: &[f32]) -> Vec<f32> {
    if v.is_empty() {
        return Vec::new();
    }
    let mean = v.iter().sum::<f32>() / v.len() as f32;
    let variance = v.iter().map(|x| (x - mean).powi(2)).sum::<f32>() / v.len() as f32;
    let std = variance.sqrt();
    if std == 0.0 {
        v.iter().map(|x| x - mean).collect()
    } else {
        v.iter().map(|x| (x - mean) / std).collect()
    }
}

/// Gathers `spectrum[i]` for each configured index; errors if any index
/// is out of bounds (spec §4.8 step 2).
fn select_features(spectrum: &[f32], indices: &[usize]) -> Result<Vec<f32>, ShapeError> {
    let max_index = indices.iter().copied().max().unwrap_or(0);
    if !indices.is_empty() && max_index >= spectrum.len() {
        return Err(ShapeError {
            expected: max_index + 1,
            got: spectrum.len(),
        });
    }
    Ok(indices.iter().map(|&i| spectrum[i]).collect())
}

/// Projects `v` through a fixed PCA transform. `v` is truncated to the
/// projection's expected length `V` when strictly longer; a shorter `v`
/// aborts the projection with a `ShapeError` (spec §4.8 step 3).
fn project_pca(v: &[f32], pca: &PcaProjection) -> Result<Vec<f32>, ShapeError> {
    let expected = pca.mean.len();
    if v.len() < expected {
        return Err(ShapeError {
            expected,
            got: v.len(),
        });
    }
    let v = &v[..expected];
    let centered: Vec<f32> = v.iter().zip(&pca.mean).map(|(x, m)| x - m).collect();
    Ok(pca
        .components
        .iter()
        .map(|row| row.iter().zip(&centered).map(|(c, x)| c * x).sum())
        .collect())
}

/// `y_orig[i] = y_scaled[i] * scale[i] + mean[i]` (spec §4.8 step 5).
fn inverse_scale(v: &[f32], scaler: &PropertyScaler) -> Vec<f32> {
    v.iter()
        .enumerate()
        .map(|(i, y)| {
            let scale = scaler.scale.get(i).copied().unwrap_or(1.0);
            let mean = scaler.mean.get(i).copied().unwrap_or(0.0);
            y * scale + mean
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    struct MeanBackend {
        input_size: usize,
        output_size: usize,
    }

    impl PredictorBackend for MeanBackend {
        fn input_size(&self) -> usize {
            self.input_size
        }
        fn output_size(&self) -> usize {
            self.output_size
        }
        fn forward(&self, features: &[f32]) -> Result<Vec<f32>, NotReady> {
            let mean = features.iter().sum::<f32>() / features.len() as f32;
            Ok(vec![mean; self.output_size])
        }
    }

    #[test]
    fn snv_of_constant_vector_is_zero() {
        let v = vec![1.0; 10];
        let out = snv_normalize(&v);
        assert!(out.iter().all(|x| *x == 0.0));
    }

    #[test]
    fn snv_idempotent_within_tolerance() {
        let v = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        let once = snv_normalize(&v);
        let twice = snv_normalize(&once);
        for (a, b) in once.iter().zip(twice.iter()) {
            assert!((a - b).abs() < 1e-4);
        }
    }

    #[test]
    fn scenario_five_constant_spectrum_yields_zero_predictions() {
        let config = PredictorConfig {
            input_size: 10,
            output_size: 2,
            property_labels: vec!["A".into(), "B".into()],
            selected_feature_indices: (0..10).collect(),
            pca: None,
            property_scaler: None,
        };
        let predictor = Predictor::new(
            config,
            MeanBackend {
                input_size: 10,
                output_size: 2,
            },
        );
        let spectrum = vec![1.0; 10];
        let result = predictor.predict(&spectrum, "t".into()).unwrap();
        assert_eq!(result.values["A"], 0.0);
        assert_eq!(result.values["B"], 0.0);
    }

    #[test]
    fn feature_selection_out_of_bounds_is_shape_error() {
        let config = PredictorConfig {
            input_size: 1,
            output_size: 1,
            property_labels: vec!["A".into()],
            selected_feature_indices: vec![5],
            pca: None,
            property_scaler: None,
        };
        let predictor = Predictor::new(
            config,
            MeanBackend {
                input_size: 1,
                output_size: 1,
            },
        );
        assert!(predictor.predict(&[1.0, 2.0], "t".into()).is_err());
    }
}
