//! Spreading a bank of sounds across the keyboard.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::sound::NoteSet;

/// First root note of the interleaved layout (C2).
const INTERLEAVED_ROOT: u8 = 36;

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NoteLayout {
    /// Each sound gets one contiguous block of `128 / n` keys.
    #[default]
    Contiguous,
    /// Consecutive keys cycle through the sounds, starting at C2.
    ///
    /// Pitch still follows the key's distance from the root, so with `n`
    /// sounds the next key of the same sound plays `n` semitones higher.
    /// Use a slice mapping mode to play each key untransposed.
    Interleaved,
    /// Every sound answers every key.
    All,
}

/// Notes and root note for sound `index` out of `count` under `layout`.
pub fn assign(layout: NoteLayout, index: usize, count: usize) -> (NoteSet, u8) {
    let count = count.max(1);
    let index = index.min(count - 1);

    match layout {
        NoteLayout::Contiguous => {
            let width = (128 / count).max(1);
            let first = (index * width).min(127);
            let last = (first + width).min(128);
            let notes = NoteSet::range(first as u8..last as u8);
            let root = (first + width / 2).min(127) as u8;
            (notes, root)
        }
        NoteLayout::Interleaved => {
            let root = (INTERLEAVED_ROOT as usize + index).min(127);
            let notes = (root..128)
                .step_by(count)
                .chain((0..=root).rev().step_by(count))
                .map(|note| note as u8)
                .collect();
            (notes, root as u8)
        }
        NoteLayout::All => (NoteSet::all(), 64),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contiguous_splits_keyboard() {
        let (notes, root) = assign(NoteLayout::Contiguous, 1, 4);
        assert_eq!(notes.len(), 32);
        assert!(notes.contains(32) && notes.contains(63));
        assert!(!notes.contains(31) && !notes.contains(64));
        assert_eq!(root, 48);
    }

    #[test]
    fn interleaved_cycles_sounds() {
        let (first, root0) = assign(NoteLayout::Interleaved, 0, 3);
        let (second, root1) = assign(NoteLayout::Interleaved, 1, 3);
        assert_eq!(root0, 36);
        assert_eq!(root1, 37);
        assert!(first.contains(36) && first.contains(39) && first.contains(33));
        assert!(second.contains(37) && second.contains(40) && second.contains(34));
        assert_eq!(first.bits() & second.bits(), 0);
    }

    #[test]
    fn layouts_cover_keyboard_without_overlap() {
        for layout in [NoteLayout::Interleaved, NoteLayout::Contiguous] {
            let count = 8;
            let mut union = 0u128;
            for index in 0..count {
                let (notes, root) = assign(layout, index, count);
                assert!(notes.contains(root), "{layout:?} root must be mapped");
                assert_eq!(union & notes.bits(), 0);
                union |= notes.bits();
            }
            assert_eq!(union, u128::MAX, "{layout:?} should use every key");
        }
    }

    #[test]
    fn all_maps_everything() {
        let (notes, _) = assign(NoteLayout::All, 3, 5);
        assert_eq!(notes.len(), 128);
    }

    #[test]
    fn interleaved_neighbours_transpose_by_sound_count() {
        use crate::sound::params::{NoteMappingMode, ParamId, SoundParams};
        use crate::synth::modulation::pitch_ratio;

        let (notes, root) = assign(NoteLayout::Interleaved, 0, 3);
        assert!(notes.contains(root + 3) && !notes.contains(root + 1));

        let mut params = SoundParams::default();
        params.set(ParamId::RootNote, f32::from(root));
        let ratio = pitch_ratio(&params, root + 3, 48_000.0, 48_000.0);
        assert!((ratio - 2f64.powf(3.0 / 12.0)).abs() < 1e-9);

        params.set(ParamId::NoteMappingMode, NoteMappingMode::Slice.index() as f32);
        assert_eq!(pitch_ratio(&params, root + 3, 48_000.0, 48_000.0), 1.0);
    }
}
