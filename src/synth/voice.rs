//! One playing note of one sound.
//!
//! ```text
//!   Idle ──start──► Attacking ──release──► Releasing ──env done──► Idle
//!                       │                                          ▲
//!                       └──── region end / kill / sound gone ──────┘
//! ```
//!
//! Every block the voice re-reads the sound's parameters, resolves its
//! region, then renders sample by sample:
//!
//! ```text
//!   buffer ─► linear read ─► loop crossfade ─► pan · env · gain ─► SVF ─► out
//!                 ▲
//!   playhead += ratio · 2^(mod/12) · 2^(bend/12)    (interpolated per sample)
//! ```

use crate::dsp::filter::SVFilter;
use crate::dsp::gain::{pan_gains, SmoothedGain};
use crate::dsp::interpolate::read_linear;
use crate::dsp::zero_crossing::find_positive_zero_crossing;
use crate::dsp::{Envelope, RenderCtx};
use crate::sound::params::{LaunchMode, SoundParams};
use crate::sound::{SampleBuffer, SoundHandle};
use crate::synth::mapper::NoteTarget;
use crate::synth::modulation;
use crate::synth::region::{resolve_region, Region};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceState {
    Idle,       // Available for allocation
    Attacking,  // Note held, envelope in attack/decay/sustain
    Releasing,  // Note released, envelope in release phase
}

/// Everything a voice reads from its sound for one block.
pub struct VoiceInput<'a> {
    /// Parameters with any controller overrides already applied.
    pub params: &'a SoundParams,
    pub mapped_notes: usize,
    /// Onset offsets, in samples of the source buffer.
    pub onsets: &'a [usize],
    pub buffer: &'a SampleBuffer,
    /// Length of the source buffer. Differs from `buffer.len()` once a
    /// processed buffer is playing.
    pub source_len: usize,
    pub wheel: u8,
    pub bend: u16,
    pub zero_crossing_window: usize,
}

pub struct SamplerVoice {
    state: VoiceState,
    handle: Option<SoundHandle>,
    note: u8,
    note_index: usize,
    age: u64,
    ctx: RenderCtx,

    launch_mode: LaunchMode,
    buffer_id: u64,
    buffer_len: usize,
    playhead: f64,
    freeze_target: f64,
    forward: bool,

    // Region as requested by the parameters, and the loop bounds after
    // zero-crossing snapping. `bounds_fresh` forces a re-snap.
    requested: Region,
    fixed_loop_start: usize,
    fixed_loop_end: usize,
    start: usize,
    end: usize,
    bounds_fresh: bool,

    pitch_ratio: f64,
    pitch_mod: f32,
    bend: f32,
    pan: f32,

    pressure: u8,
    velocity_cutoff: f32,
    velocity_gain: f32,

    amp_env: Envelope,
    filter_env: Envelope,
    filters: [SVFilter; 2],
    gain: SmoothedGain,
}

impl SamplerVoice {
    pub fn new(sample_rate: f32) -> Self {
        Self {
            state: VoiceState::Idle,
            handle: None,
            note: 0,
            note_index: 0,
            age: 0,
            ctx: RenderCtx::new(sample_rate),
            launch_mode: LaunchMode::Gate,
            buffer_id: 0,
            buffer_len: 0,
            playhead: 0.0,
            freeze_target: 0.0,
            forward: true,
            requested: Region::default(),
            fixed_loop_start: 0,
            fixed_loop_end: 0,
            start: 0,
            end: 0,
            bounds_fresh: false,
            pitch_ratio: 1.0,
            pitch_mod: 0.0,
            bend: 0.0,
            pan: 0.0,
            pressure: 0,
            velocity_cutoff: 0.0,
            velocity_gain: 1.0,
            amp_env: Envelope::default(),
            filter_env: Envelope::default(),
            filters: [SVFilter::default(), SVFilter::default()],
            gain: SmoothedGain::default(),
        }
    }

    pub fn start(&mut self, target: NoteTarget, note: u8, velocity: u8, age: u64, input: &VoiceInput) {
        let params = input.params;
        let velocity = f32::from(velocity.min(127)) / 127.0;

        self.state = VoiceState::Attacking;
        self.handle = Some(target.handle);
        self.note = note;
        self.note_index = target.note_index;
        self.age = age;
        self.pressure = 0;
        self.velocity_cutoff = modulation::velocity_cutoff(params, velocity);
        self.velocity_gain = modulation::velocity_gain(params, velocity);
        self.buffer_id = input.buffer.id();
        self.buffer_len = input.buffer.len();
        self.bounds_fresh = false;

        for filter in &mut self.filters {
            filter.reset();
        }
        self.amp_env.set_parameters(&params.amp_env);
        self.filter_env.set_parameters(&params.filter_env);
        self.amp_env.note_on(&self.ctx);
        self.filter_env.note_on(&self.ctx);

        self.resolve_bounds(input);
        let offsets = self.resolve_block(input, 0);
        self.gain.reset(params.gain_db + offsets.gain_db);

        if self.launch_mode == LaunchMode::Freeze {
            self.playhead = self.freeze_target;
            self.forward = true;
        } else if params.reverse {
            self.playhead = self.end.saturating_sub(1).max(self.start) as f64;
            self.forward = false;
        } else {
            self.playhead = self.start as f64;
            self.forward = true;
        }
    }

    /// Note-off: enter the release phase unless the launch mode ignores it.
    pub fn release(&mut self) {
        if self.state == VoiceState::Attacking && self.launch_mode.responds_to_note_off() {
            self.state = VoiceState::Releasing;
            self.amp_env.note_off(&self.ctx);
            self.filter_env.note_off(&self.ctx);
        }
    }

    /// Stop immediately, no tail.
    pub fn kill(&mut self) {
        self.state = VoiceState::Idle;
        self.handle = None;
        self.amp_env.reset();
        self.filter_env.reset();
    }

    pub fn set_pressure(&mut self, pressure: u8) {
        self.pressure = pressure.min(127);
    }

    /// Render one block into `out_l` / `out_r`, overwriting them.
    ///
    /// Parameters are resolved once at the top; everything that changed since
    /// the last block is ramped across this one.
    pub fn render(&mut self, out_l: &mut [f32], out_r: &mut [f32], input: &VoiceInput) {
        out_l.fill(0.0);
        out_r.fill(0.0);
        if self.state == VoiceState::Idle {
            return;
        }

        let buffer = input.buffer;
        if buffer.id() != self.buffer_id {
            // Alternate buffer published: keep the same relative position.
            if self.buffer_len > 0 {
                self.playhead *= buffer.len() as f64 / self.buffer_len as f64;
            }
            self.buffer_id = buffer.id();
            self.buffer_len = buffer.len();
            self.bounds_fresh = false;
        }

        let previous_ratio = self.pitch_ratio;
        let previous_mod = self.pitch_mod;
        let previous_bend = self.bend;
        let previous_pan = self.pan;

        let block_len = out_l.len().min(out_r.len());
        self.resolve_bounds(input);
        self.resolve_block(input, block_len);

        let freeze = self.launch_mode == LaunchMode::Freeze;
        if buffer.is_empty() || (!freeze && self.start >= self.end) {
            self.kill();
            return;
        }

        let params = input.params;
        let left = buffer.left();
        let right = buffer.right();
        let length = buffer.len();
        let last_index = (length - 1) as f64;
        let crossfade = params.launch_mode == LaunchMode::Loop && params.loop_xfade_samples > 0;
        let xfade_len = params.loop_xfade_samples as f64;
        let mut stopped = false;
        let mut rendered = block_len;

        for i in 0..block_len {
            let t = (i + 1) as f32 / block_len as f32;

            let mut l = read_linear(left, self.playhead);
            let mut r = read_linear(right, self.playhead);

            if crossfade {
                if let Some((position, weight)) = self.crossfade_source(xfade_len, length) {
                    let weight = weight as f32;
                    l = l * weight + read_linear(left, position) * (1.0 - weight);
                    r = r * weight + read_linear(right, position) * (1.0 - weight);
                }
            }

            let (pan_l, pan_r) = pan_gains(previous_pan + (self.pan - previous_pan) * t);
            self.amp_env.next_sample(&self.ctx);
            let amp = self.gain.next_gain() * self.velocity_gain * self.amp_env.level();

            out_l[i] = l * pan_l * amp;
            out_r[i] = r * pan_r * amp;

            if freeze {
                self.step_towards_freeze_target(length, params.freeze_playhead_speed);
                self.playhead = self.playhead.clamp(0.0, last_index);
            } else {
                let t = f64::from(t);
                let ratio = previous_ratio + (self.pitch_ratio - previous_ratio) * t;
                let semitones = previous_mod + (self.pitch_mod - previous_mod) * t as f32
                    + previous_bend
                    + (self.bend - previous_bend) * t as f32;
                let step = ratio * 2f64.powf(f64::from(semitones) / 12.0);
                if self.forward {
                    self.playhead += step;
                } else {
                    self.playhead -= step;
                }

                if self.launch_mode.loops() {
                    self.wrap_loop();
                } else if self.reached_end() {
                    stopped = true;
                    rendered = i + 1;
                    break;
                }
            }

            if !self.amp_env.is_active() {
                stopped = true;
                rendered = i + 1;
                break;
            }
        }

        for (filter, channel) in self.filters.iter_mut().zip([out_l, out_r]) {
            for sample in channel[..rendered].iter_mut() {
                *sample = filter.next_sample(*sample);
            }
        }

        if stopped {
            self.kill();
        }
    }

    /// Mirror position and weight of the current sample when inside the
    /// crossfade zone before the loop seam.
    fn crossfade_source(&self, xfade_len: f64, length: usize) -> Option<(f64, f64)> {
        if self.forward {
            let to_end = self.fixed_loop_end as f64 - self.playhead;
            if to_end <= 0.0 || to_end >= xfade_len {
                return None;
            }
            let position = self.fixed_loop_start as f64 - to_end;
            (position > 0.0).then_some((position, to_end / xfade_len))
        } else {
            let to_start = self.playhead - self.fixed_loop_start as f64;
            if to_start <= 0.0 || to_start >= xfade_len {
                return None;
            }
            let position = self.fixed_loop_end as f64 + to_start;
            (position < length as f64).then_some((position, to_start / xfade_len))
        }
    }

    fn step_towards_freeze_target(&mut self, length: usize, speed: f32) {
        let distance = self.freeze_target - self.playhead;
        let normalized = (distance / length as f64).abs();
        let max_speed = (normalized * normalized * f64::from(speed)).max(1.0);
        let step = max_speed.min(distance.abs());
        self.playhead += step.copysign(distance);
    }

    fn wrap_loop(&mut self) {
        let loop_start = self.fixed_loop_start as f64;
        let loop_end = self.fixed_loop_end as f64;
        let ping_pong = self.launch_mode == LaunchMode::PingPong;

        if self.forward && self.playhead >= loop_end {
            if ping_pong {
                self.forward = false;
            } else {
                self.playhead = loop_start;
            }
        } else if !self.forward && self.playhead < loop_start {
            if ping_pong {
                self.forward = true;
            } else {
                self.playhead = loop_end;
            }
        }
    }

    fn reached_end(&self) -> bool {
        if self.forward {
            self.playhead >= self.end as f64
        } else {
            self.playhead < self.start as f64
        }
    }

    /// Pitch ratio, region and snapped loop bounds. Freeze skips all of it.
    fn resolve_bounds(&mut self, input: &VoiceInput) {
        let params = input.params;
        self.launch_mode = params.launch_mode;
        if self.launch_mode == LaunchMode::Freeze {
            return;
        }

        let buffer = input.buffer;
        self.pitch_ratio =
            modulation::pitch_ratio(params, self.note, buffer.sample_rate(), self.ctx.sample_rate);

        // Onsets are stored against the source, so resolve there first.
        let requested = resolve_region(
            params,
            input.source_len,
            input.mapped_notes,
            self.note_index,
            input.onsets,
        );
        let requested = if buffer.len() == input.source_len {
            requested
        } else {
            requested.rescaled(input.source_len, buffer.len())
        };
        self.fix_loop_bounds(requested, buffer.left(), input.zero_crossing_window);

        if params.note_mapping_mode.maps_slice() {
            self.start = self.fixed_loop_start;
            self.end = self.fixed_loop_end;
        } else {
            self.start = requested.start;
            self.end = requested.end;
        }
    }

    /// Snap loop bounds that moved since the last block to positive-going
    /// zero crossings: start searches forward, end searches backward.
    fn fix_loop_bounds(&mut self, requested: Region, signal: &[f32], window: usize) {
        let window = window.min(isize::MAX as usize) as isize;
        let start_moved = !self.bounds_fresh || requested.loop_start != self.requested.loop_start;
        let end_moved = !self.bounds_fresh || requested.loop_end != self.requested.loop_end;

        if start_moved {
            self.fixed_loop_start = find_positive_zero_crossing(requested.loop_start, signal, window);
        }
        if end_moved {
            self.fixed_loop_end = find_positive_zero_crossing(requested.loop_end, signal, -window);
        }
        if (start_moved || end_moved) && self.fixed_loop_start >= self.fixed_loop_end {
            self.fixed_loop_start = requested.loop_start;
            self.fixed_loop_end = requested.loop_end;
        }

        self.requested = requested;
        self.bounds_fresh = true;
    }

    /// Modulation, envelopes, filter and gain targets for a block of
    /// `block_len` samples.
    fn resolve_block(&mut self, input: &VoiceInput, block_len: usize) -> modulation::ModOffsets {
        let params = input.params;
        let offsets = modulation::route(params, self.pressure, input.wheel);

        if self.launch_mode == LaunchMode::Freeze {
            let fraction = (params.playhead_position + offsets.playhead).clamp(0.0, 1.0);
            let last_index = input.buffer.len().saturating_sub(1) as f64;
            self.freeze_target = (f64::from(fraction) * input.buffer.len() as f64).min(last_index);
        }

        self.pitch_mod = offsets.pitch_semitones;
        self.bend = modulation::pitch_bend_semitones(
            input.bend,
            params.pitch_bend_range_up,
            params.pitch_bend_range_down,
        );
        self.pan = params.pan;

        self.amp_env.set_parameters(&params.amp_env);
        self.filter_env.set_parameters(&params.filter_env);
        let filter_env_level = self.filter_env.advance(block_len, &self.ctx);

        let cutoff = modulation::filter_cutoff(
            params,
            self.note,
            self.velocity_cutoff,
            &offsets,
            filter_env_level,
        );
        for filter in &mut self.filters {
            filter.set_cutoff(cutoff);
            filter.set_resonance(params.filter_resonance);
            filter.update(&self.ctx);
        }

        self.gain.set_target_db(params.gain_db + offsets.gain_db, block_len);
        offsets
    }

    pub fn is_free(&self) -> bool {
        self.state == VoiceState::Idle
    }

    pub fn is_active(&self) -> bool {
        matches!(self.state, VoiceState::Attacking | VoiceState::Releasing)
    }

    /// Whether this voice is sounding `note` of `handle` and not yet released.
    pub fn is_holding(&self, handle: SoundHandle, note: u8) -> bool {
        self.state == VoiceState::Attacking && self.handle == Some(handle) && self.note == note
    }

    pub fn handle(&self) -> Option<SoundHandle> {
        self.handle
    }

    pub fn note(&self) -> u8 {
        self.note
    }

    pub fn age(&self) -> u64 {
        self.age
    }

    pub fn state(&self) -> VoiceState {
        self.state
    }

    /// Playhead as a fraction of the buffer.
    pub fn position_fraction(&self) -> f32 {
        if self.buffer_len == 0 {
            return 0.0;
        }
        (self.playhead / self.buffer_len as f64) as f32
    }

    pub fn playhead(&self) -> f64 {
        self.playhead
    }

    pub fn pitch_ratio(&self) -> f64 {
        self.pitch_ratio
    }

    /// Current play bounds, after slice snapping. `end` is exclusive.
    pub fn bounds(&self) -> (usize, usize) {
        (self.start, self.end)
    }

    /// Loop bounds after zero-crossing snapping.
    pub fn loop_bounds(&self) -> (usize, usize) {
        (self.fixed_loop_start, self.fixed_loop_end)
    }
}
