#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{dsp::RenderCtx, MIN_TIME};

/*
Voice Envelopes
===============

Every sampler voice owns two linear ADSR generators. The amplitude envelope is
stepped once per output sample; the filter envelope is stepped a block at a
time through `advance` and its level feeds the cutoff for the whole block.

    level
    1.0 ┐   /\
        │  /  \__________
    S   │ /              \
    0.0 └/────────────────\──→ samples
         A   D     S      R

Stage lengths come straight from the sound's parameters, in seconds. The
per-sample step is recomputed from the current times on every call, so a
parameter snapshot pushed between blocks reshapes a note that is already
sounding.

  attack   0 → 1 over attack_time
  decay    1 → S over decay_time
  sustain  holds S until note_off
  release  current level → 0 over release_time, from any stage

Release snapshots its start level and length at note_off and interpolates
towards exactly 0.0, so a release during the attack never jumps.

A time of 0 means "immediately": times are floored to MIN_TIME and a floored
stage finishes within one sample.
*/

/// Stage times in seconds plus the sustain level.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdsrParams {
    pub attack: f32,
    pub decay: f32,
    pub sustain: f32,
    pub release: f32,
}

impl Default for AdsrParams {
    fn default() -> Self {
        Self {
            attack: 0.01,
            decay: 0.0,
            sustain: 1.0,
            release: 0.01,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvelopeState {
    Idle,
    Attack,
    Decay,
    Sustain,
    Release,
}

pub struct Envelope {
    // Shape, in seconds except sustain. Floored to MIN_TIME.
    attack_time: f32,
    decay_time: f32,
    sustain_level: f32,
    release_time: f32,

    stage: EnvelopeState,
    level: f32,

    decay_start_level: f32,

    // Fixed at note_off.
    release_start_level: f32,
    release_total_samples: u32,
    release_elapsed_samples: u32,
}

impl Default for Envelope {
    fn default() -> Self {
        Self::new(&AdsrParams::default())
    }
}

impl Envelope {
    pub fn new(params: &AdsrParams) -> Self {
        let mut env = Self {
            attack_time: MIN_TIME,
            decay_time: MIN_TIME,
            sustain_level: 1.0,
            release_time: MIN_TIME,

            stage: EnvelopeState::Idle,
            level: 0.0,
            decay_start_level: 0.0,
            release_start_level: 0.0,
            release_total_samples: 1,
            release_elapsed_samples: 0,
        };
        env.set_parameters(params);
        env
    }

    pub fn adsr(attack: f32, decay: f32, sustain: f32, release: f32) -> Self {
        Self::new(&AdsrParams {
            attack,
            decay,
            sustain,
            release,
        })
    }

    /// Update the envelope shape without touching the running stage.
    ///
    /// A release already in flight keeps the length it was started with.
    pub fn set_parameters(&mut self, params: &AdsrParams) {
        self.attack_time = params.attack.max(MIN_TIME);
        self.decay_time = params.decay.max(MIN_TIME);
        self.sustain_level = params.sustain.clamp(0.0, 1.0);
        self.release_time = params.release.max(MIN_TIME);
    }

    /// Start the attack from zero. Voices are always started fresh, never
    /// legato.
    pub fn note_on(&mut self, _ctx: &RenderCtx) {
        self.level = 0.0;
        self.stage = EnvelopeState::Attack;
        self.release_elapsed_samples = 0;
    }

    /// Enter release from whatever level the envelope is at.
    pub fn note_off(&mut self, ctx: &RenderCtx) {
        if matches!(self.stage, EnvelopeState::Idle) {
            return;
        }

        self.release_start_level = self.level;
        if self.release_time <= MIN_TIME {
            self.release_total_samples = 1;
        } else {
            self.release_total_samples =
                (self.release_time * ctx.sample_rate).round().max(1.0) as u32;
        }

        self.release_elapsed_samples = 0;
        self.stage = EnvelopeState::Release;
    }

    /// Step one sample.
    pub fn next_sample(&mut self, ctx: &RenderCtx) {
        match self.stage {
            EnvelopeState::Idle => {
                self.level = 0.0;
            }

            EnvelopeState::Attack => {
                if self.attack_time <= MIN_TIME {
                    self.level = 1.0;
                } else {
                    self.level += 1.0 / (self.attack_time * ctx.sample_rate);
                }

                if self.level >= 1.0 {
                    self.level = 1.0;
                    self.decay_start_level = 1.0;
                    self.stage = EnvelopeState::Decay;
                }
            }

            EnvelopeState::Decay => {
                let target = self.sustain_level;
                let step = (self.decay_start_level - target) / (self.decay_time * ctx.sample_rate);
                self.level -= step;

                if self.level <= target {
                    self.level = target;
                    self.stage = EnvelopeState::Sustain;
                }
            }

            EnvelopeState::Sustain => {
                // Follows sustain edits while held.
                self.level = self.sustain_level;
            }

            EnvelopeState::Release => {
                let progress = self.release_elapsed_samples as f32
                    / self.release_total_samples as f32;
                self.level = (self.release_start_level * (1.0 - progress)).max(0.0);

                self.release_elapsed_samples = self.release_elapsed_samples.saturating_add(1);

                if self.release_elapsed_samples >= self.release_total_samples {
                    self.level = 0.0;
                    self.stage = EnvelopeState::Idle;
                }
            }
        }

        debug_assert!((0.0..=1.0).contains(&self.level));
    }

    /// Advance `samples` steps at once and return the resulting level.
    ///
    /// Used for block-rate modulation sources such as the filter envelope.
    pub fn advance(&mut self, samples: usize, ctx: &RenderCtx) -> f32 {
        for _ in 0..samples {
            self.next_sample(ctx);
        }
        self.level
    }

    /// Write one level per sample into `buffer`.
    pub fn render(&mut self, buffer: &mut [f32], ctx: &RenderCtx) {
        for sample in buffer.iter_mut() {
            self.next_sample(ctx);
            *sample = self.level;
        }
    }

    pub fn is_active(&self) -> bool {
        !matches!(self.stage, EnvelopeState::Idle)
    }

    /// Back to idle with no tail.
    pub fn reset(&mut self) {
        self.stage = EnvelopeState::Idle;
        self.level = 0.0;
        self.decay_start_level = 0.0;
        self.release_elapsed_samples = 0;
        self.release_start_level = 0.0;
    }

    pub fn level(&self) -> f32 {
        self.level
    }

    pub fn state(&self) -> EnvelopeState {
        self.stage
    }
}
