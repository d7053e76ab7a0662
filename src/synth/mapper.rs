//! Note-on to sound matching.

use crate::sound::store::SoundBank;
use crate::sound::{SoundHandle, SoundSnapshot};

/// One voice to start for an incoming note.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoteTarget {
    pub handle: SoundHandle,
    /// Rank of the note among the sound's mapped notes.
    pub note_index: usize,
}

/// Whether a sound answers `note` in velocity bucket `layer`.
///
/// Sounds without a layer answer every bucket, and with layering off
/// (`layer == None`) every sound's layer is ignored.
pub fn answers(snapshot: &SoundSnapshot, note: u8, layer: Option<u8>) -> bool {
    let layer_matches = match (layer, snapshot.velocity_layer) {
        (Some(bucket), Some(own)) => bucket == own,
        _ => true,
    };
    layer_matches && snapshot.notes.contains(note)
}

/// Push every matching sound onto `targets`, in load order.
///
/// `targets` is cleared first and must have capacity for every loaded sound;
/// the audio thread calls this with a preallocated scratch vector.
pub fn collect_targets(bank: &SoundBank, note: u8, layer: Option<u8>, targets: &mut Vec<NoteTarget>) {
    targets.clear();
    for sound in bank.iter() {
        let snapshot = sound.snapshot();
        if answers(&snapshot, note, layer) && targets.len() < targets.capacity() {
            targets.push(NoteTarget {
                handle: sound.handle(),
                note_index: snapshot.notes.index_of(note),
            });
        }
    }
}
