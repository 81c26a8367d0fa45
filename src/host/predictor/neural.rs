//! Neural back-end: a single dense layer loaded from a safetensors
//! weight file via `candle_nn::VarBuilder`, the loading idiom this
//! workspace already uses for its other candle-backed models (grounded
//! on `CambrianTech-continuum`'s `inference-grpc/src/model.rs`). Spec
//! §4.8 calls this "a serialized TorchScript-like graph" — candle's
//! safetensors loader is the idiomatic Rust stand-in.

use candle_core::{DType, Device, Tensor};
use candle_nn::{Linear, Module, VarBuilder};

use crate::error::{FatalInit, NotReady};
use crate::host::predictor::PredictorBackend;

pub struct NeuralBackend {
    layer: Linear,
    device: Device,
    input_size: usize,
    output_size: usize,
}

impl NeuralBackend {
    /// Loads `weight` (shape `[output_size, input_size]`) and `bias`
    /// (shape `[output_size]`) tensors named `weight`/`bias` from a
    /// safetensors file (spec §6.3 "graph file").
    pub fn load(
        weights_path: &std::path::Path,
        input_size: usize,
        output_size: usize,
    ) -> Result<Self, FatalInit> {
        let device = Device::Cpu;
        let vb = unsafe {
            VarBuilder::from_mmaped_safetensors(&[weights_path], DType::F32, &device)
                .map_err(|e| FatalInit(format!("cannot load model weights: {e}")))?
        };
        let layer = candle_nn::linear(input_size, output_size, vb)
            .map_err(|e| FatalInit(format!("model weight shape mismatch: {e}")))?;
        Ok(Self {
            layer,
            device,
            input_size,
            output_size,
        })
    }
}

impl PredictorBackend for NeuralBackend {
    fn input_size(&self) -> usize {
        self.input_size
    }

    fn output_size(&self) -> usize {
        self.output_size
    }

    fn forward(&self, features: &[f32]) -> Result<Vec<f32>, NotReady> {
        let input = Tensor::from_slice(features, (1, features.len()), &self.device)
            .map_err(|_| NotReady("neural backend: bad input tensor"))?;
        let output = self
            .layer
            .forward(&input)
            .map_err(|_| NotReady("neural backend: forward pass failed"))?;
        output
            .squeeze(0)
            .and_then(|t| t.to_vec1::<f32>())
            .map_err(|_| NotReady("neural backend: could not read output tensor"))
    }
}
