//! Low-level DSP primitives used by the sampler voices.
//!
//! These components are allocation-free and realtime-safe, making them safe to
//! embed directly inside voice structs. They stay focused on the signal math;
//! parameter resolution and event handling live in [`crate::synth`].

/// Attack/decay/sustain/release envelope generator.
pub mod envelope;
/// State-variable low-pass filter.
pub mod filter;
/// Block-ramped decibel gain and equal-sum panning.
pub mod gain;
/// Fractional-position sample reads.
pub mod interpolate;
/// Stereo Schroeder reverb for the master bus.
pub mod reverb;
/// Positive-going zero-crossing search for click-free loop points.
pub mod zero_crossing;

pub use envelope::{AdsrParams, Envelope, EnvelopeState};

/// Per-render information shared by every DSP primitive.
#[derive(Debug, Clone, Copy)]
pub struct RenderCtx {
    pub sample_rate: f32,
}

impl RenderCtx {
    pub fn new(sample_rate: f32) -> Self {
        Self { sample_rate }
    }
}
