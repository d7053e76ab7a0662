pub mod config; // Engine settings, TOML loading
pub mod dsp;
pub mod engine; // Deferred maintenance, background preprocessing
pub mod error;
pub mod io;
pub mod sound; // Sound store and per-sound parameters
pub mod synth; // Voices, polyphony and event intake

pub use config::EngineConfig;
pub use engine::EngineComponents;
pub use error::{DecodeError, Result, SamplerError};

pub const MAX_BLOCK_SIZE: usize = 2048;
pub(crate) const MIN_TIME: f32 = 1.0 / 48_000.0;
