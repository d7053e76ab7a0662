//! Benchmarks for low-level DSP primitives.

mod envelope;
mod filter;
mod reverb;
mod zero_crossing;

pub use envelope::bench_envelope;
pub use filter::bench_filter;
pub use reverb::bench_reverb;
pub use zero_crossing::bench_zero_crossing;
