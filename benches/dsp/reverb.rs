//! Benchmarks for the master reverb.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use source_sampler::dsp::reverb::{ReverbParams, StereoReverb};

use crate::BLOCK_SIZES;

pub fn bench_reverb(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/reverb");

    let sample_rate = 48_000.0;

    for &size in BLOCK_SIZES {
        // Generate a test signal (impulse-like with some content)
        let input: Vec<f32> = (0..size)
            .map(|i| {
                if i < 10 {
                    1.0 - (i as f32 / 10.0) // Initial impulse
                } else {
                    (i as f32 * 0.05).sin() * 0.1 // Quiet tail
                }
            })
            .collect();

        for (name, room_size, damping) in [
            ("small_room", 0.3, 0.5),
            ("large_room", 0.9, 0.3),
            ("high_damping", 0.5, 0.9),
        ] {
            let mut reverb = StereoReverb::new(sample_rate);
            reverb.set_params(ReverbParams {
                room_size,
                damping,
                wet_level: 0.3,
                ..ReverbParams::default()
            });
            let mut left = input.clone();
            let mut right = input.clone();
            group.bench_with_input(BenchmarkId::new(name, size), &size, |b, _| {
                b.iter(|| {
                    left.copy_from_slice(&input);
                    right.copy_from_slice(&input);
                    reverb.process(black_box(&mut left), black_box(&mut right));
                })
            });
        }

        // Dry default: should cost next to nothing
        let mut reverb = StereoReverb::new(sample_rate);
        let mut left = input.clone();
        let mut right = input.clone();
        group.bench_with_input(BenchmarkId::new("bypassed", size), &size, |b, _| {
            b.iter(|| reverb.process(black_box(&mut left), black_box(&mut right)))
        });
    }

    group.finish();
}
