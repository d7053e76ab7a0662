//! Benchmarks for the loop-point zero-crossing search.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use source_sampler::dsp::zero_crossing::find_positive_zero_crossing;

pub fn bench_zero_crossing(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/zero_crossing");

    // Low tone: crossings are far apart, so searches run long
    let signal: Vec<f32> = (0..96_000)
        .map(|i| (i as f32 * std::f32::consts::TAU * 30.0 / 48_000.0).sin())
        .collect();

    for window in [200isize, 2000, -2000] {
        group.bench_with_input(BenchmarkId::new("sine_30hz", window), &window, |b, &window| {
            b.iter(|| find_positive_zero_crossing(black_box(48_123), black_box(&signal), window))
        });
    }

    // No crossing anywhere: the full window is scanned
    let flat = vec![0.5f32; 96_000];
    group.bench_function("no_crossing", |b| {
        b.iter(|| find_positive_zero_crossing(black_box(48_000), black_box(&flat), 2000))
    });

    group.finish();
}
