//! Which part of a sound a voice plays.
//!
//! ```text
//!   0                                                        length
//!   |----[start ======= loopStart ~~~~~~~~ loopEnd ===== end]--|
//!
//!   slice modes: [globalStart .. globalEnd] cut into slices,
//!                note index picks one, loop bounds = slice bounds
//! ```
//!
//! Resolution is a pure function of the parameter snapshot, the buffer length
//! and the voice's note index, re-run by every voice once per block.

use crate::sound::params::{SliceMode, SoundParams};

/// Resolved sample bounds. `end` and `loop_end` are exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Region {
    pub start: usize,
    pub end: usize,
    pub loop_start: usize,
    pub loop_end: usize,
}

impl Region {
    /// Zero-length regions render as silence.
    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    /// Carry bounds resolved against a buffer of `from` samples over to one
    /// of `to` samples, keeping their relative positions.
    pub fn rescaled(self, from: usize, to: usize) -> Region {
        let scale = |x: usize| {
            let scaled = x as u128 * to as u128 / from.max(1) as u128;
            (scaled as usize).min(to)
        };
        Region {
            start: scale(self.start),
            end: scale(self.end),
            loop_start: scale(self.loop_start),
            loop_end: scale(self.loop_end),
        }
    }
}

fn to_sample(fraction: f32, length: usize) -> usize {
    ((fraction.clamp(0.0, 1.0) as f64 * length as f64) as usize).min(length)
}

/// Resolve the playback region for the note at `note_index`.
///
/// `mapped_notes` is the number of notes the sound answers to, used when the
/// slice count follows the mapping. `onsets` must be ascending.
pub fn resolve_region(
    params: &SoundParams,
    length: usize,
    mapped_notes: usize,
    note_index: usize,
    onsets: &[usize],
) -> Region {
    let global_start = to_sample(params.start_position, length);
    let global_end = to_sample(params.end_position, length).max(global_start);

    if !params.note_mapping_mode.maps_slice() {
        let loop_start = to_sample(params.loop_start_position, length).clamp(global_start, global_end);
        let loop_end = to_sample(params.loop_end_position, length).clamp(loop_start, global_end);
        return Region {
            start: global_start,
            end: global_end,
            loop_start,
            loop_end,
        };
    }

    let (start, end) = match params.slice_mode() {
        SliceMode::Equal(count) => equal_slice(global_start, global_end, count as usize, note_index),
        SliceMode::PerMappedNote => equal_slice(global_start, global_end, mapped_notes, note_index),
        SliceMode::Onsets => onset_slice(global_start, global_end, onsets, note_index),
    };

    Region {
        start,
        end,
        loop_start: start,
        loop_end: end,
    }
}

fn equal_slice(global_start: usize, global_end: usize, count: usize, note_index: usize) -> (usize, usize) {
    if count == 0 {
        return (global_start, global_end);
    }
    let span = global_end - global_start;
    let slice = note_index % count;
    (
        global_start + slice * span / count,
        global_start + (slice + 1) * span / count,
    )
}

fn onset_slice(global_start: usize, global_end: usize, onsets: &[usize], note_index: usize) -> (usize, usize) {
    let first = onsets.partition_point(|&onset| onset < global_start);
    let last = onsets.partition_point(|&onset| onset <= global_end);
    let in_range = &onsets[first..last.max(first)];

    if in_range.is_empty() {
        return (global_start, global_end);
    }
    let slice = note_index % in_range.len();
    let end = in_range.get(slice + 1).copied().unwrap_or(global_end);
    (in_range[slice], end)
}
