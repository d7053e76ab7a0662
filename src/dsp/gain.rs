//! Decibel gain with a linear per-block ramp, plus pan law.
//!
//! Gain targets are only set once per block, so a hard jump would step the
//! waveform at every block boundary. [`SmoothedGain`] spreads each change over
//! the next `ramp_samples` samples instead.

#[inline]
pub fn db_to_gain(db: f32) -> f32 {
    10.0_f32.powf(db / 20.0)
}

/// Left/right gains for `pan` in `-1.0..=1.0` (-1 = hard left).
///
/// The centre keeps both sides at unity; panning only attenuates the opposite
/// side, linearly down to silence.
#[inline]
pub fn pan_gains(pan: f32) -> (f32, f32) {
    let pan = pan.clamp(-1.0, 1.0);
    ((1.0 - pan).min(1.0), (1.0 + pan).min(1.0))
}

#[derive(Debug, Clone, Copy)]
pub struct SmoothedGain {
    current: f32,
    target: f32,
    step: f32,
    remaining: usize,
}

impl Default for SmoothedGain {
    fn default() -> Self {
        Self::new(0.0)
    }
}

impl SmoothedGain {
    pub fn new(db: f32) -> Self {
        let gain = db_to_gain(db);
        Self {
            current: gain,
            target: gain,
            step: 0.0,
            remaining: 0,
        }
    }

    /// Jump straight to `db`, dropping any ramp in progress.
    pub fn reset(&mut self, db: f32) {
        *self = Self::new(db);
    }

    pub fn set_target_db(&mut self, db: f32, ramp_samples: usize) {
        let target = db_to_gain(db);
        if target == self.target {
            return;
        }
        self.target = target;
        if ramp_samples == 0 {
            self.current = target;
            self.remaining = 0;
        } else {
            self.step = (target - self.current) / ramp_samples as f32;
            self.remaining = ramp_samples;
        }
    }

    #[inline]
    pub fn next_gain(&mut self) -> f32 {
        if self.remaining > 0 {
            self.current += self.step;
            self.remaining -= 1;
            if self.remaining == 0 {
                self.current = self.target;
            }
        }
        self.current
    }

    pub fn current(&self) -> f32 {
        self.current
    }
}
