//! Benchmarks for the hot per-frame paths on the host side: the
//! preprocessing pipeline, the quality evaluator, and the predictor
//! façade (spec §4.6, §4.7, §4.8). Grounded on the teacher's own
//! `benches/benchmark.rs` (criterion, `harness = false`).

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};

use nir_telemetry::config::QualityLimits;
use nir_telemetry::host::predictor::support_vector::SupportVectorBackend;
use nir_telemetry::host::predictor::{Predictor, PredictorConfig};
use nir_telemetry::host::preprocessing::{PreprocessingPipeline, Stage};
use nir_telemetry::host::quality;

fn synthetic_spectrum(n: usize) -> Vec<f32> {
    (0..n)
        .map(|i| 1.0 + (i as f32 * 0.37).sin() * 0.1)
        .collect()
}

fn bench_preprocessing_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("preprocessing_pipeline");
    for &n in &[64usize, 512, 2048] {
        let spectrum = synthetic_spectrum(n);
        let mut pipeline = PreprocessingPipeline::new();
        pipeline.push(Stage::Smooth { window: 7 });
        pipeline.push(Stage::Baseline { edge_percent: 5 });
        pipeline.push(Stage::Derivative { order: 1 });
        pipeline.push(Stage::Normalize);

        group.bench_with_input(BenchmarkId::from_parameter(n), &spectrum, |b, spectrum| {
            b.iter(|| pipeline.run(spectrum));
        });
    }
    group.finish();
}

fn bench_quality_evaluator(c: &mut Criterion) {
    let mut group = c.benchmark_group("quality_evaluate");
    let limits = QualityLimits::default();
    for &n in &[64usize, 512, 2048] {
        let spectrum = synthetic_spectrum(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &spectrum, |b, spectrum| {
            b.iter(|| quality::evaluate(spectrum, &limits));
        });
    }
    group.finish();
}

fn bench_predictor_facade(c: &mut Criterion) {
    let mut group = c.benchmark_group("predictor_facade");
    for &n in &[16usize, 128, 512] {
        let spectrum = synthetic_spectrum(n);
        let config = PredictorConfig {
            input_size: n,
            output_size: 3,
            property_labels: vec!["A".into(), "B".into(), "C".into()],
            selected_feature_indices: (0..n).collect(),
            pca: None,
            property_scaler: None,
        };
        let predictor = Predictor::new(config, SupportVectorBackend::with_defaults(n, 3));

        group.bench_with_input(BenchmarkId::from_parameter(n), &spectrum, |b, spectrum| {
            b.iter(|| predictor.predict(spectrum, "2026-01-01 00:00:00".to_string()));
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_preprocessing_pipeline,
    bench_quality_evaluator,
    bench_predictor_facade
);
criterion_main!(benches);
