use std::time::Instant;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use tryangle_engine::{CompositionEngine, EngineConfig, GateEngine, LiveFrameInputs, PoseConfig};
use tryangle_models::{BoundingBox, ImageSize, Keypoint, ReferenceSnapshot};

fn figure(shift: f64) -> Vec<Keypoint> {
    [
        (0.50, 0.24),
        (0.48, 0.22),
        (0.52, 0.22),
        (0.46, 0.23),
        (0.54, 0.23),
        (0.60, 0.32),
        (0.40, 0.32),
        (0.62, 0.42),
        (0.38, 0.42),
        (0.63, 0.52),
        (0.37, 0.52),
        (0.56, 0.54),
        (0.44, 0.54),
        (0.57, 0.66),
        (0.43, 0.66),
        (0.57, 0.78),
        (0.43, 0.78),
    ]
    .iter()
    .map(|&(x, y)| Keypoint::new(x + shift, y, 0.9))
    .collect()
}

fn inputs(bbox: BoundingBox, shift: f64) -> LiveFrameInputs {
    LiveFrameInputs::new(ImageSize::new(1080, 1440))
        .with_bbox(bbox)
        .with_keypoints(figure(shift))
}

fn bench_gates(c: &mut Criterion) {
    let config = PoseConfig::default();
    let reference = inputs(BoundingBox::new(0.3, 0.2, 0.4, 0.6), 0.0).to_snapshot(None, &config);
    let live = inputs(BoundingBox::new(0.35, 0.3, 0.3, 0.5), 0.05).to_snapshot(None, &config);
    let gates = GateEngine::new(EngineConfig::default());

    c.bench_function("gate_evaluate_snapshots", |b| {
        b.iter(|| {
            let report = gates.evaluate_snapshots(black_box(&reference), black_box(&live));
            let _ = gates.feedback_items(&report);
        })
    });
}

fn bench_engine_frame(c: &mut Criterion) {
    let reference = ReferenceSnapshot::new(
        inputs(BoundingBox::new(0.3, 0.2, 0.4, 0.6), 0.0).to_snapshot(None, &PoseConfig::default()),
    );
    let live = inputs(BoundingBox::new(0.35, 0.3, 0.3, 0.5), 0.05);
    let Ok(mut engine) = CompositionEngine::new(EngineConfig::default()) else {
        return;
    };
    engine.set_reference(reference);

    c.bench_function("engine_evaluate_frame", |b| {
        b.iter(|| {
            let _ = engine.evaluate(black_box(&live), Instant::now());
        })
    });
}

criterion_group!(benches, bench_gates, bench_engine_frame);
criterion_main!(benches);
