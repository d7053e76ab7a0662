//! Benchmarks for DSP primitives and whole-sampler scenarios.
//!
//! Run with: cargo bench
//!
//! Reference timing at 48kHz sample rate:
//!   - 64 samples  = 1.33ms deadline
//!   - 128 samples = 2.67ms deadline
//!   - 256 samples = 5.33ms deadline
//!   - 512 samples = 10.67ms deadline
//!
//! Benchmark groups:
//!   - dsp/*        Per-voice primitives (filter, envelope, zero-crossing search) and the master reverb
//!   - scenarios/*  Full sampler blocks with N sounding voices

use criterion::{criterion_group, criterion_main};

mod dsp;
mod scenarios;

/// Common buffer sizes used in audio applications.
pub const BLOCK_SIZES: &[usize] = &[64, 128, 256, 512];

criterion_group!(
    benches,
    // Low-level DSP primitives
    dsp::bench_filter,
    dsp::bench_envelope,
    dsp::bench_reverb,
    dsp::bench_zero_crossing,
    // Whole-sampler scenarios
    scenarios::bench_voices,
);
criterion_main!(benches);
