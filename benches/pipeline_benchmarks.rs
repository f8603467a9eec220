//! Performance benchmarks for the gaze pipeline stages

use chrono::{Duration as ChronoDuration, TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use gaze_proctor::{
    attention::{AttentionMonitor, AttentionStatus},
    face_normalization::FaceNormalizer,
    gaze_processor::GazePoint,
    overlay::draw_gaze,
};
use opencv::core::{Mat, Rect, Scalar, CV_8UC3};
use std::time::Duration;

fn test_frame(height: i32, width: i32) -> Mat {
    Mat::new_rows_cols_with_default(height, width, CV_8UC3, Scalar::new(90.0, 120.0, 150.0, 0.0)).unwrap()
}

/// Benchmark face crop normalization for different face sizes
fn bench_normalization(c: &mut Criterion) {
    let mut group = c.benchmark_group("face_normalization");
    group.measurement_time(Duration::from_secs(10));

    let frame = test_frame(480, 640);
    let normalizer = FaceNormalizer::new(30, 224);

    for side in [60, 150, 300] {
        let bbox = Rect::new(320 - side / 2, 240 - side / 2, side, side);
        group.bench_with_input(BenchmarkId::new("normalize", side), &bbox, |b, &bbox| {
            b.iter(|| black_box(normalizer.normalize(&frame, bbox).unwrap()));
        });
    }

    group.finish();
}

/// Benchmark overlay rendering
fn bench_overlay(c: &mut Criterion) {
    let mut group = c.benchmark_group("overlay");
    let frame = test_frame(480, 640);

    group.bench_function("no_gaze", |b| {
        b.iter(|| black_box(draw_gaze(&frame, None).unwrap()));
    });
    group.bench_function("with_gaze", |b| {
        b.iter(|| black_box(draw_gaze(&frame, Some(GazePoint::new(320, 240))).unwrap()));
    });

    group.finish();
}

/// Benchmark the attention state machine over a long deviation
fn bench_attention(c: &mut Criterion) {
    let start = Utc.timestamp_millis_opt(1_700_000_000_000).unwrap();

    c.bench_function("attention_observe_1000_polls", |b| {
        b.iter(|| {
            let mut monitor = AttentionMonitor::default();
            for step in 0..1000 {
                let status = if step % 200 < 150 {
                    AttentionStatus::Cheating
                } else {
                    AttentionStatus::Ok
                };
                black_box(monitor.observe(status, start + ChronoDuration::milliseconds(step * 100)));
            }
            monitor.history_len()
        });
    });
}

criterion_group!(benches, bench_normalization, bench_overlay, bench_attention);
criterion_main!(benches);
