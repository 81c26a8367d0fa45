//! Support-vector back-end: a linear stub, not a real SVR solver (spec
//! §4.8, §9 "Placeholder support-vector back-end"). Grounded on
//! `original_source/.../svr/SVRSpectrumPredictor.cpp::executeSVRPrediction`,
//! which is itself already a simplified linear placeholder awaiting a
//! real libsvm/RBF implementation — `bias + sum(features[j] * weight)`
//! per property.

use crate::error::NotReady;
use crate::host::predictor::PredictorBackend;

#[derive(Debug, Clone)]
pub struct LinearRegressor {
    pub weight: f32,
    pub bias: f32,
}

impl Default for LinearRegressor {
    fn default() -> Self {
        Self {
            weight: 0.1,
            bias: 0.0,
        }
    }
}

pub struct SupportVectorBackend {
    input_size: usize,
    regressors: Vec<LinearRegressor>,
}

impl SupportVectorBackend {
    pub fn new(input_size: usize, regressors: Vec<LinearRegressor>) -> Self {
        Self {
            input_size,
            regressors,
        }
    }

    /// One independent regressor per property, all sharing the same
    /// default weight/bias (spec §9's "the supplied implementation is a
    /// placeholder").
    pub fn with_defaults(input_size: usize, output_size: usize) -> Self {
        Self::new(input_size, vec![LinearRegressor::default(); output_size])
    }
}

impl PredictorBackend for SupportVectorBackend {
    fn input_size(&self) -> usize {
        self.input_size
    }

    fn output_size(&self) -> usize {
        self.regressors.len()
    }

    fn forward(&self, features: &[f32]) -> Result<Vec<f32>, NotReady> {
        if self.regressors.is_empty() {
            return Err(NotReady("support-vector backend: no regressors loaded"));
        }
        Ok(self
            .regressors
            .iter()
            .map(|r| r.bias + features.iter().map(|f| f * r.weight).sum::<f32>())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linear_combination_matches_formula() {
        let backend = SupportVectorBackend::with_defaults(3, 2);
        let out = backend.forward(&[1.0, 2.0, 3.0]).unwrap();
        let expected = 0.1 * (1.0 + 2.0 + 3.0);
        assert_eq!(out, vec![expected, expected]);
    }

    #[test]
    fn empty_regressor_set_is_not_ready() {
        let backend = SupportVectorBackend::new(3, Vec::new());
        assert!(backend.forward(&[1.0, 2.0, 3.0]).is_err());
    }
}
