//! Engine-wide configuration.
//!
//! One [`EngineConfig`] is handed to the sound store and the sampler at
//! construction. Every field has a default, so a TOML file only needs to name
//! what it changes:
//!
//! ```toml
//! sample_rate = 44100.0
//! max_voices = 16
//!
//! [sound_defaults.params]
//! launch_mode = "Loop"
//! gain_db = -6.0
//! ```

#[cfg(feature = "serde")]
use std::path::Path;
use std::time::Duration;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::sound::params::SoundParams;

/// Upper bound on the voice pool.
pub const MAX_VOICES: usize = 32;

/// Initial values for newly loaded sounds.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SoundDefaults {
    pub params: SoundParams,
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Output sample rate in Hz.
    pub sample_rate: f32,
    /// Samples between per-voice parameter resolution passes.
    pub block_size: usize,
    pub max_voices: usize,
    pub max_sounds: usize,
    /// 0 or 1 disables layering, N splits velocity into N equal buckets.
    pub velocity_layers: u8,
    pub zero_crossing_window: usize,
    /// First controller of the per-sound freeze playhead range.
    pub freeze_cc_first: u8,
    pub freeze_cc_count: u8,
    pub mod_wheel_cc: u8,
    pub safe_deletion_delay_ms: u64,
    pub message_queue_capacity: usize,
    pub sound_defaults: SoundDefaults,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48_000.0,
            block_size: 64,
            max_voices: 8,
            max_sounds: 64,
            velocity_layers: 0,
            zero_crossing_window: crate::dsp::zero_crossing::DEFAULT_SEARCH_WINDOW,
            freeze_cc_first: 10,
            freeze_cc_count: 20,
            mod_wheel_cc: 1,
            safe_deletion_delay_ms: 200,
            message_queue_capacity: 1024,
            sound_defaults: SoundDefaults::default(),
        }
    }
}

impl EngineConfig {
    pub fn with_sample_rate(sample_rate: f32) -> Self {
        Self {
            sample_rate,
            ..Self::default()
        }
    }

    /// Clamp every field into a usable range.
    pub fn sanitized(mut self) -> Self {
        if !self.sample_rate.is_finite() || self.sample_rate <= 0.0 {
            self.sample_rate = 48_000.0;
        }
        self.block_size = self.block_size.clamp(1, crate::MAX_BLOCK_SIZE);
        self.max_voices = self.max_voices.clamp(1, MAX_VOICES);
        self.max_sounds = self.max_sounds.max(1);
        self.freeze_cc_first = self.freeze_cc_first.min(127);
        self.freeze_cc_count = self.freeze_cc_count.min(128 - self.freeze_cc_first);
        self.mod_wheel_cc = self.mod_wheel_cc.min(127);
        self.message_queue_capacity = self.message_queue_capacity.max(16);
        self.sound_defaults.params = self.sound_defaults.params.sanitized();
        self
    }

    pub fn safe_deletion_delay(&self) -> Duration {
        Duration::from_millis(self.safe_deletion_delay_ms)
    }

    /// Sound index addressed by a freeze-range controller, if `controller` is
    /// inside the range.
    pub fn freeze_sound_index(&self, controller: u8) -> Option<usize> {
        controller
            .checked_sub(self.freeze_cc_first)
            .filter(|&offset| offset < self.freeze_cc_count)
            .map(usize::from)
    }

    /// Velocity bucket for `velocity`, or `None` when layering is off.
    pub fn velocity_layer(&self, velocity: u8) -> Option<u8> {
        if self.velocity_layers <= 1 {
            return None;
        }
        let layers = u16::from(self.velocity_layers);
        Some((u16::from(velocity.min(127)) * layers / 128) as u8)
    }
}

#[cfg(feature = "serde")]
impl EngineConfig {
    pub fn from_toml_str(source: &str) -> crate::Result<Self> {
        let config: EngineConfig = toml::from_str(source)?;
        Ok(config.sanitized())
    }

    pub fn load(path: impl AsRef<Path>) -> crate::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| {
            crate::SamplerError::ReadConfig {
                path: path.to_path_buf(),
                source,
            }
        })?;
        let config = Self::from_toml_str(&content)?;
        tracing::info!(path = %path.display(), "loaded engine config");
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitized_clamps_pool_and_ranges() {
        let config = EngineConfig {
            max_voices: 100,
            block_size: 0,
            freeze_cc_first: 120,
            freeze_cc_count: 20,
            sample_rate: f32::NAN,
            ..EngineConfig::default()
        }
        .sanitized();

        assert_eq!(config.max_voices, MAX_VOICES);
        assert_eq!(config.block_size, 1);
        assert_eq!(config.freeze_cc_count, 8);
        assert_eq!(config.sample_rate, 48_000.0);
    }

    #[test]
    fn freeze_range_maps_controllers() {
        let config = EngineConfig::default();
        assert_eq!(config.freeze_sound_index(9), None);
        assert_eq!(config.freeze_sound_index(10), Some(0));
        assert_eq!(config.freeze_sound_index(29), Some(19));
        assert_eq!(config.freeze_sound_index(30), None);
    }

    #[test]
    fn velocity_buckets() {
        let mut config = EngineConfig::default();
        assert_eq!(config.velocity_layer(100), None);

        config.velocity_layers = 4;
        assert_eq!(config.velocity_layer(0), Some(0));
        assert_eq!(config.velocity_layer(31), Some(0));
        assert_eq!(config.velocity_layer(32), Some(1));
        assert_eq!(config.velocity_layer(127), Some(3));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn partial_toml_keeps_defaults() {
        let config = EngineConfig::from_toml_str(
            r#"
            sample_rate = 44100.0
            max_voices = 16

            [sound_defaults.params]
            launch_mode = "Loop"
            gain_db = -6.0
            "#,
        )
        .unwrap();

        assert_eq!(config.sample_rate, 44_100.0);
        assert_eq!(config.max_voices, 16);
        assert_eq!(config.block_size, 64);
        let params = &config.sound_defaults.params;
        assert_eq!(params.launch_mode, crate::sound::params::LaunchMode::Loop);
        assert_eq!(params.gain_db, -6.0);
        assert_eq!(params.filter_cutoff, 20_000.0);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn malformed_toml_is_an_error() {
        let result = EngineConfig::from_toml_str("max_voices = \"lots\"");
        assert!(matches!(result, Err(crate::SamplerError::ConfigParse(_))));
    }
}
