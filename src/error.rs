//! Error types for the control-thread side of the sampler.
//!
//! Nothing here crosses into the render path: out-of-range parameters are
//! clamped, exhausted voice pools steal, and slice configurations without
//! onsets fall back to the whole region.

use std::path::PathBuf;

use thiserror::Error;

use crate::sound::SoundHandle;

/// Reasons a decoded buffer cannot become a [`Sound`](crate::sound::Sound).
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("decoded audio contains no samples")]
    Empty,

    #[error("decoded audio has no channels")]
    NoChannels,

    #[error("invalid source sample rate: {0}")]
    InvalidSampleRate(f32),

    #[error("channel {channel} has {len} samples, expected {expected}")]
    ChannelLengthMismatch {
        channel: usize,
        len: usize,
        expected: usize,
    },

    #[error("unsupported sample format: {bits}-bit {format}")]
    UnsupportedFormat { bits: u16, format: &'static str },

    #[error("failed to read wav data: {0}")]
    Wav(#[from] hound::Error),
}

#[derive(Debug, Error)]
pub enum SamplerError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error("no sound loaded for {0:?}")]
    SoundNotFound(SoundHandle),

    #[error("unknown parameter: {0}")]
    UnknownParameter(String),

    #[error("sound store is full ({capacity} sounds)")]
    StoreFull { capacity: usize },

    #[error("event queue is full, dropped {0:?}")]
    QueueFull(crate::synth::message::SamplerMessage),

    #[error("preprocess worker has stopped")]
    WorkerStopped,

    #[error("failed to spawn preprocess thread: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("failed to read config '{path}': {source}")]
    ReadConfig {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[cfg(feature = "serde")]
    #[error("failed to parse config: {0}")]
    ConfigParse(#[from] toml::de::Error),
}

pub type Result<T, E = SamplerError> = std::result::Result<T, E>;
