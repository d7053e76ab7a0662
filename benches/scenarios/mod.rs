//! Whole-sampler benchmarks.
//!
//! A full `render_block` call: event intake, per-block parameter resolution,
//! every sounding voice and the master bus.

mod voices;

pub use voices::bench_voices;
