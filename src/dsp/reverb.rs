//! Master-bus reverb.
//!
//! Two Schroeder networks, one per channel. The right channel's delay lines
//! are a few samples longer so the tails decorrelate.
//!
//! ```text
//! in ──┬─→ [comb 29.7ms] ─┐
//!      ├─→ [comb 37.1ms] ─┤
//!      ├─→ [comb 41.1ms] ─┼─→ avg ─→ [allpass 5ms] ─→ [allpass 1.7ms] ─→ out
//!      └─→ [comb 43.7ms] ─┘
//! ```
//!
//! Each comb is `y[n] = x[n] + g * lowpass(y[n - d])`; the one-pole lowpass in
//! the loop is the damping. The allpasses only diffuse.
//!
//! `room_size` maps to comb feedback (0.7..=0.98), `width` cross-mixes the two
//! tails, and `freeze` mutes the input while pinning feedback at its ceiling
//! so the current tail rings on.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Longest comb line: 50ms at 192kHz.
const MAX_COMB_DELAY: usize = 9600;
/// Longest allpass line: 10ms at 192kHz.
const MAX_ALLPASS_DELAY: usize = 1920;

fn delay_line(delay_samples: usize, max: usize) -> Box<[f32]> {
    vec![0.0; delay_samples.clamp(1, max)].into_boxed_slice()
}

/// Feedback comb with a damping lowpass in the loop. The delay line is
/// allocated once in `new`.
pub struct CombFilter {
    buffer: Box<[f32]>,
    write_pos: usize,
    feedback: f32,
    damp: f32,
    filter_state: f32,
}

impl CombFilter {
    pub fn new(delay_samples: usize) -> Self {
        Self {
            buffer: delay_line(delay_samples, MAX_COMB_DELAY),
            write_pos: 0,
            feedback: 0.5,
            damp: 0.5,
            filter_state: 0.0,
        }
    }

    pub fn set_feedback(&mut self, feedback: f32) {
        self.feedback = feedback.clamp(0.0, 0.99);
    }

    pub fn set_damp(&mut self, damp: f32) {
        self.damp = damp.clamp(0.0, 1.0);
    }

    pub fn process(&mut self, input: f32) -> f32 {
        let output = self.buffer[self.write_pos];

        self.filter_state = output * (1.0 - self.damp) + self.filter_state * self.damp;
        self.buffer[self.write_pos] = input + self.filter_state * self.feedback;
        self.write_pos = (self.write_pos + 1) % self.buffer.len();

        output
    }

    pub fn reset(&mut self) {
        self.buffer.fill(0.0);
        self.filter_state = 0.0;
        self.write_pos = 0;
    }
}

/// Schroeder allpass used for diffusion.
pub struct AllpassFilter {
    buffer: Box<[f32]>,
    write_pos: usize,
    feedback: f32,
}

impl AllpassFilter {
    pub fn new(delay_samples: usize) -> Self {
        Self {
            buffer: delay_line(delay_samples, MAX_ALLPASS_DELAY),
            write_pos: 0,
            feedback: 0.5,
        }
    }

    pub fn set_feedback(&mut self, feedback: f32) {
        self.feedback = feedback.clamp(0.0, 0.9);
    }

    pub fn process(&mut self, input: f32) -> f32 {
        let delayed = self.buffer[self.write_pos];

        let output = -self.feedback * input + delayed;
        self.buffer[self.write_pos] = input + self.feedback * output;
        self.write_pos = (self.write_pos + 1) % self.buffer.len();

        output
    }

    pub fn reset(&mut self) {
        self.buffer.fill(0.0);
        self.write_pos = 0;
    }
}

/// One channel: four parallel combs into two series allpasses.
pub struct SchroederReverb {
    combs: [CombFilter; 4],
    allpasses: [AllpassFilter; 2],
}

const COMB_DELAYS_MS: [f32; 4] = [29.7, 37.1, 41.1, 43.7];
const ALLPASS_DELAYS_MS: [f32; 2] = [5.0, 1.7];
/// Extra delay on the right channel's lines, in samples at 44.1kHz.
const STEREO_SPREAD: f32 = 23.0;

fn delay_samples(delay_ms: f32, sample_rate: f32, spread: f32) -> usize {
    (delay_ms * sample_rate / 1000.0 + spread * sample_rate / 44_100.0) as usize
}

impl SchroederReverb {
    /// Create a new Schroeder reverb at the given sample rate.
    ///
    /// `spread` lengthens every delay line by that many samples (scaled to
    /// the sample rate), used to detune one channel against the other.
    pub fn new(sample_rate: f32, spread: f32) -> Self {
        let combs = COMB_DELAYS_MS.map(|ms| CombFilter::new(delay_samples(ms, sample_rate, spread)));
        let allpasses =
            ALLPASS_DELAYS_MS.map(|ms| AllpassFilter::new(delay_samples(ms, sample_rate, spread)));

        Self { combs, allpasses }
    }

    /// Map `size` in `0..=1` onto comb feedback.
    pub fn set_room_size(&mut self, size: f32) {
        let feedback = 0.7 + size.clamp(0.0, 1.0) * 0.28;
        self.set_feedback(feedback);
    }

    fn set_feedback(&mut self, feedback: f32) {
        for comb in &mut self.combs {
            comb.set_feedback(feedback);
        }
    }

    pub fn set_damping(&mut self, damp: f32) {
        for comb in &mut self.combs {
            comb.set_damp(damp.clamp(0.0, 1.0));
        }
    }

    pub fn process(&mut self, input: f32) -> f32 {
        let mut output = 0.0;
        for comb in &mut self.combs {
            output += comb.process(input);
        }
        output *= 0.25;

        for allpass in &mut self.allpasses {
            output = allpass.process(output);
        }

        output
    }

    pub fn reset(&mut self) {
        for comb in &mut self.combs {
            comb.reset();
        }
        for allpass in &mut self.allpasses {
            allpass.reset();
        }
    }
}

/// User-facing reverb settings, all in `0.0..=1.0`.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReverbParams {
    pub room_size: f32,
    pub damping: f32,
    pub wet_level: f32,
    pub dry_level: f32,
    pub width: f32,
    pub freeze: bool,
}

impl Default for ReverbParams {
    /// Fully dry: the reverb is transparent until someone turns it up.
    fn default() -> Self {
        Self {
            room_size: 0.5,
            damping: 0.5,
            wet_level: 0.0,
            dry_level: 1.0,
            width: 1.0,
            freeze: false,
        }
    }
}

/// Two detuned Schroeder networks with wet/dry/width mixing.
pub struct StereoReverb {
    left: SchroederReverb,
    right: SchroederReverb,
    params: ReverbParams,
    wet1: f32,
    wet2: f32,
    input_gain: f32,
}

impl StereoReverb {
    pub fn new(sample_rate: f32) -> Self {
        let mut reverb = Self {
            left: SchroederReverb::new(sample_rate, 0.0),
            right: SchroederReverb::new(sample_rate, STEREO_SPREAD),
            params: ReverbParams::default(),
            wet1: 0.0,
            wet2: 0.0,
            input_gain: 1.0,
        };
        reverb.set_params(ReverbParams::default());
        reverb
    }

    pub fn params(&self) -> ReverbParams {
        self.params
    }

    pub fn set_params(&mut self, params: ReverbParams) {
        self.params = params;

        let width = params.width.clamp(0.0, 1.0);
        let wet = params.wet_level.clamp(0.0, 1.0);
        self.wet1 = wet * (width / 2.0 + 0.5);
        self.wet2 = wet * ((1.0 - width) / 2.0);

        if params.freeze {
            self.input_gain = 0.0;
            for side in [&mut self.left, &mut self.right] {
                side.set_feedback(1.0);
                side.set_damping(0.0);
            }
        } else {
            self.input_gain = 1.0;
            for side in [&mut self.left, &mut self.right] {
                side.set_room_size(params.room_size);
                side.set_damping(params.damping);
            }
        }
    }

    /// Skip all processing while nothing wet is audible.
    pub fn is_bypassed(&self) -> bool {
        self.params.wet_level <= 0.0 && !self.params.freeze
    }

    /// Process a stereo block in place.
    pub fn process(&mut self, left: &mut [f32], right: &mut [f32]) {
        let dry = self.params.dry_level.clamp(0.0, 1.0);
        if self.is_bypassed() {
            if dry < 1.0 {
                left.iter_mut().chain(right.iter_mut()).for_each(|s| *s *= dry);
            }
            return;
        }

        for (l, r) in left.iter_mut().zip(right.iter_mut()) {
            let input = (*l + *r) * 0.5 * self.input_gain;
            let out_l = self.left.process(input);
            let out_r = self.right.process(input);

            *l = out_l * self.wet1 + out_r * self.wet2 + *l * dry;
            *r = out_r * self.wet1 + out_l * self.wet2 + *r * dry;
        }
    }

    pub fn reset(&mut self) {
        self.left.reset();
        self.right.reset();
    }
}
