//! Benchmarks for detection to track association

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use image::RgbImage;
use linetrack::affinities::{ColorHistogramExtractor, FeatureAffinity, PositionAffinity};
use linetrack::{AssociationEngine, Detection, EngineConfig, Line, Rect, WorldConfig};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::hint::black_box;

/// People walking right at slightly different speeds, with jitter
fn create_test_detections(n_people: usize, n_frames: usize) -> Vec<Vec<Detection>> {
    let mut rng = StdRng::seed_from_u64(7);
    let starts: Vec<(f32, f32, f32)> = (0..n_people)
        .map(|_| {
            (
                rng.gen_range(0.0..0.3),
                rng.gen_range(0.1..0.7),
                rng.gen_range(0.005..0.015),
            )
        })
        .collect();

    (0..n_frames)
        .map(|frame| {
            starts
                .iter()
                .map(|&(x, y, speed)| {
                    let jitter: f32 = rng.gen_range(-0.002..0.002);
                    let x = x + speed * frame as f32 + jitter;
                    Detection::new(Rect::new(x, y, 0.06, 0.2), rng.gen_range(0.5..1.0))
                })
                .collect()
        })
        .collect()
}

fn world() -> WorldConfig {
    WorldConfig::new(Line::from_coords(0.5, 0.0, 0.5, 1.0), vec![])
}

fn bench_position_only(c: &mut Criterion) {
    let frame = RgbImage::new(64, 64);
    let world = world();
    let mut group = c.benchmark_group("position_association");

    for n_people in [5, 20, 50] {
        let detections = create_test_detections(n_people, 30);
        group.bench_with_input(BenchmarkId::from_parameter(n_people), &detections, |b, dets| {
            b.iter_batched(
                || {
                    AssociationEngine::new(EngineConfig::default())
                        .with_affinity(1.0, PositionAffinity::new(0.7))
                },
                |mut engine| {
                    for (frame_no, frame_dets) in dets.iter().enumerate() {
                        let _events = engine
                            .process(&world, black_box(frame_dets), &frame, frame_no as u64)
                            .unwrap();
                    }
                },
                criterion::BatchSize::SmallInput,
            )
        });
    }
    group.finish();
}

fn bench_position_and_feature(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(11);
    let frame = RgbImage::from_fn(320, 240, |_, _| {
        image::Rgb([rng.gen(), rng.gen(), rng.gen()])
    });
    let world = world();
    let detections = create_test_detections(20, 10);

    c.bench_function("position_feature_association_20_people", |b| {
        b.iter_batched(
            || {
                AssociationEngine::new(EngineConfig::default())
                    .with_affinity(0.4, PositionAffinity::new(0.7))
                    .with_affinity(0.6, FeatureAffinity::new(ColorHistogramExtractor::default()))
            },
            |mut engine| {
                for (frame_no, frame_dets) in detections.iter().enumerate() {
                    let _events = engine
                        .process(&world, black_box(frame_dets), &frame, frame_no as u64)
                        .unwrap();
                }
            },
            criterion::BatchSize::SmallInput,
        )
    });
}

criterion_group!(benches, bench_position_only, bench_position_and_feature);
criterion_main!(benches);
