//! Modulation routing: performance controls to parameter offsets.
//!
//! All functions here are pure. Voices keep only the raw controller values
//! (pressure, wheel, bend) and re-route them against the current parameter
//! snapshot every block, so edits to modulation amounts apply to notes that
//! are already sounding.

use crate::dsp::filter::MIN_CUTOFF_HZ;
use crate::sound::params::SoundParams;

const BEND_CENTRE: f32 = 8192.0;

/// Offsets from pressure and mod wheel, ready to add to the base values.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ModOffsets {
    pub pitch_semitones: f32,
    pub cutoff_hz: f32,
    pub gain_db: f32,
    /// Added to the freeze playhead, as a fraction of the sound.
    pub playhead: f32,
}

/// Pitch bend in semitones. The two halves scale independently.
pub fn pitch_bend_semitones(value: u16, range_up: f32, range_down: f32) -> f32 {
    let value = f32::from(value.min(16_383));
    if value >= BEND_CENTRE {
        (value - BEND_CENTRE) / BEND_CENTRE * range_up
    } else {
        -(BEND_CENTRE - value) / BEND_CENTRE * range_down
    }
}

/// Clamp `value` so it never overshoots `amount` in the direction of its sign.
fn saturate(value: f32, amount: f32) -> f32 {
    if amount >= 0.0 {
        value.min(amount)
    } else {
        value.max(amount)
    }
}

/// Route pressure (aftertouch or channel pressure) and the mod wheel, both
/// raw 0..=127, through the sound's modulation amounts.
pub fn route(params: &SoundParams, pressure: u8, wheel: u8) -> ModOffsets {
    let pressure = f32::from(pressure.min(127)) / 127.0;
    let wheel = f32::from(wheel.min(127)) / 127.0;
    let combined = pressure + wheel;

    ModOffsets {
        pitch_semitones: saturate(params.mod_to_pitch * combined, params.mod_to_pitch),
        cutoff_hz: combined * params.filter_cutoff * params.mod_to_cutoff,
        gain_db: saturate(params.mod_to_gain * combined, params.mod_to_gain),
        playhead: params.mod_to_playhead * combined,
    }
}

/// Playback-rate multiplier before modulation.
///
/// Sounds that don't map pitch play every note as if it were the root.
pub fn pitch_ratio(params: &SoundParams, note: u8, source_rate: f32, output_rate: f32) -> f64 {
    let playing = if params.note_mapping_mode.maps_pitch() {
        note
    } else {
        params.root_note
    };
    let semitones = f64::from(params.pitch) + f64::from(playing) - f64::from(params.root_note);
    2f64.powf(semitones / 12.0) * f64::from(source_rate) / f64::from(output_rate)
}

/// Cutoff with keyboard tracking, before any modulation.
pub fn tracked_cutoff(params: &SoundParams, note: u8) -> f32 {
    let tracking = params.filter_keyboard_tracking;
    let octaves = (f32::from(note) - f32::from(params.root_note)) / 12.0;
    (1.0 - tracking) * params.filter_cutoff + tracking * params.filter_cutoff * 2f32.powf(octaves)
}

/// Cutoff offset fixed at note-on from velocity in `0.0..=1.0`.
pub fn velocity_cutoff(params: &SoundParams, velocity: f32) -> f32 {
    velocity * params.filter_cutoff * params.velocity_to_cutoff
}

/// Linear gain fixed at note-on from velocity in `0.0..=1.0`.
///
/// With `vel2GainAmt = 0` velocity is ignored; at 1 it scales fully.
pub fn velocity_gain(params: &SoundParams, velocity: f32) -> f32 {
    let amount = params.velocity_to_gain;
    amount * velocity + (1.0 - amount)
}

/// Final cutoff for one block.
pub fn filter_cutoff(
    params: &SoundParams,
    note: u8,
    velocity_offset: f32,
    offsets: &ModOffsets,
    filter_env_level: f32,
) -> f32 {
    let envelope = filter_env_level * params.filter_cutoff * params.filter_env_to_cutoff;
    let cutoff = tracked_cutoff(params, note) + velocity_offset + offsets.cutoff_hz + envelope;
    if cutoff.is_finite() {
        cutoff.max(MIN_CUTOFF_HZ)
    } else {
        MIN_CUTOFF_HZ
    }
}
