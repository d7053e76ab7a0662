//! Benchmarks for the per-voice low-pass filter.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use source_sampler::dsp::{filter::SVFilter, RenderCtx};

use crate::BLOCK_SIZES;

pub fn bench_filter(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/filter");
    let ctx = RenderCtx::new(48_000.0);

    for &size in BLOCK_SIZES {
        // Generate a test signal (sawtooth-like ramp)
        let input: Vec<f32> = (0..size)
            .map(|i| (i as f32 / size as f32) * 2.0 - 1.0)
            .collect();

        let mut filter = SVFilter::lowpass(1000.0);
        filter.set_resonance(0.5);
        let mut buffer = input.clone();
        group.bench_with_input(BenchmarkId::new("lowpass", size), &size, |b, _| {
            b.iter(|| {
                buffer.copy_from_slice(&input);
                filter.render(black_box(&mut buffer), black_box(&ctx));
            })
        });

        // Cutoff moving every block, as under pressure or envelope modulation
        let mut filter = SVFilter::lowpass(1000.0);
        let mut cutoff = 200.0f32;
        let mut buffer = input.clone();
        group.bench_with_input(BenchmarkId::new("modulated", size), &size, |b, _| {
            b.iter(|| {
                cutoff = if cutoff > 8000.0 { 200.0 } else { cutoff * 1.1 };
                filter.set_cutoff(cutoff);
                filter.update(&ctx);
                buffer.copy_from_slice(&input);
                for sample in buffer.iter_mut() {
                    *sample = filter.next_sample(black_box(*sample));
                }
            })
        });
    }

    group.finish();
}
