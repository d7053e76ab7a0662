//! The sound store: a fixed-capacity arena of sounds owned by the control
//! thread, published to the audio thread as an immutable [`SoundBank`].
//!
//! ```text
//!   control thread                          audio thread
//!   ──────────────                          ────────────
//!   SoundStore ── publish ──► ArcSwap<SoundBank> ◄── BankReader::load()
//!       │                                    │
//!       │ edit params                        └─► Sound::snapshot() once per block
//!       └──► Sound::replace_snapshot ──► old snapshot retired to TaskQueue
//! ```
//!
//! Nothing the audio thread can still see is dropped in place: replaced
//! snapshots, replaced banks and removed sounds all go through the
//! maintenance queue and are released after the safe-deletion delay, on
//! whichever thread calls [`SoundStore::run_maintenance`].

use std::sync::Arc;
use std::time::Instant;

use arc_swap::{ArcSwap, Guard};
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::engine::maintenance::TaskQueue;
use crate::error::{Result, SamplerError};
use crate::io::DecodedAudio;
use crate::sound::cc::CcMapping;
use crate::sound::layout::{self, NoteLayout};
use crate::sound::params::{ParamId, ParamValue, SoundParams};
use crate::sound::{NoteSet, OnsetTimes, SampleBuffer, Sound, SoundHandle, SoundSnapshot};

/// Read-only view of every loaded sound, as published at one instant.
#[derive(Debug, Default, Clone)]
pub struct SoundBank {
    slots: Vec<Option<Arc<Sound>>>,
    order: Vec<SoundHandle>,
}

impl SoundBank {
    pub fn get(&self, handle: SoundHandle) -> Option<&Arc<Sound>> {
        self.slots
            .get(handle.index())?
            .as_ref()
            .filter(|sound| sound.handle() == handle)
    }

    /// Sound at `position` in load order.
    pub fn sound_at(&self, position: usize) -> Option<&Arc<Sound>> {
        self.order.get(position).and_then(|&handle| self.get(handle))
    }

    pub fn position_of(&self, handle: SoundHandle) -> Option<usize> {
        self.order.iter().position(|&h| h == handle)
    }

    /// Sounds in load order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<Sound>> + '_ {
        self.order.iter().filter_map(|&handle| self.get(handle))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }
}

/// Cloneable, lock-free access to the currently published bank.
#[derive(Clone)]
pub struct BankReader(Arc<ArcSwap<SoundBank>>);

impl BankReader {
    pub fn load(&self) -> Guard<Arc<SoundBank>> {
        self.0.load()
    }
}

pub struct SoundStore {
    config: EngineConfig,
    slots: Vec<Option<Arc<Sound>>>,
    generations: Vec<u32>,
    order: Vec<SoundHandle>,
    published: Arc<ArcSwap<SoundBank>>,
    maintenance: TaskQueue,
    next_mapping_id: u32,
}

impl SoundStore {
    pub fn new(config: EngineConfig) -> Self {
        let config = config.sanitized();
        let capacity = config.max_sounds;
        let slots = vec![None; capacity];
        let bank = SoundBank {
            slots: slots.clone(),
            order: Vec::with_capacity(capacity),
        };

        Self {
            slots,
            generations: vec![0; capacity],
            order: Vec::with_capacity(capacity),
            published: Arc::new(ArcSwap::from_pointee(bank)),
            maintenance: TaskQueue::new(),
            next_mapping_id: 0,
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn reader(&self) -> BankReader {
        BankReader(Arc::clone(&self.published))
    }

    /// Validate `audio` and add it as a new sound mapped to every note.
    pub fn load_sound(&mut self, audio: DecodedAudio, params: SoundParams) -> Result<SoundHandle> {
        let declared = audio.declared_length;
        let buffer = SampleBuffer::new(audio).map_err(|err| {
            warn!(error = %err, "rejected sound");
            err
        })?;
        if declared.is_some_and(|frames| frames != buffer.len()) {
            warn!(
                declared = ?declared,
                decoded = buffer.len(),
                "decoded length differs from declared length"
            );
        }

        let index = self
            .slots
            .iter()
            .position(Option::is_none)
            .ok_or(SamplerError::StoreFull {
                capacity: self.slots.len(),
            })?;
        let handle = SoundHandle {
            index: index as u32,
            generation: self.generations[index],
        };

        info!(
            sound = ?handle,
            frames = buffer.len(),
            channels = if buffer.is_stereo() { 2 } else { 1 },
            sample_rate = buffer.sample_rate(),
            "loaded sound"
        );

        let snapshot = SoundSnapshot::new(params.sanitized(), NoteSet::all());
        self.slots[index] = Some(Arc::new(Sound::new(handle, buffer, snapshot)));
        self.order.push(handle);
        self.publish();
        Ok(handle)
    }

    /// Load with the configured default parameters.
    pub fn load_sound_with_defaults(&mut self, audio: DecodedAudio) -> Result<SoundHandle> {
        let params = self.config.sound_defaults.params;
        self.load_sound(audio, params)
    }

    /// Unpublish a sound. Voices playing it go silent at their next block;
    /// the audio data itself is released by a later maintenance pass.
    pub fn remove_sound(&mut self, handle: SoundHandle) -> Result<()> {
        let sound = self
            .slots
            .get_mut(handle.index())
            .filter(|slot| slot.as_ref().is_some_and(|s| s.handle() == handle))
            .and_then(Option::take)
            .ok_or(SamplerError::SoundNotFound(handle))?;

        let generation = &mut self.generations[handle.index()];
        *generation = generation.wrapping_add(1);
        self.order.retain(|&h| h != handle);
        self.publish();

        info!(sound = ?handle, "removed sound");
        self.maintenance
            .retire(self.config.safe_deletion_delay(), "drop removed sound", sound);
        Ok(())
    }

    pub fn clear(&mut self) {
        for handle in self.order.clone() {
            // Every handle in `order` is live.
            let _ = self.remove_sound(handle);
        }
    }

    pub fn contains(&self, handle: SoundHandle) -> bool {
        self.sound(handle).is_ok()
    }

    /// Handles in load order.
    pub fn handles(&self) -> &[SoundHandle] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn sound(&self, handle: SoundHandle) -> Result<&Arc<Sound>> {
        self.slots
            .get(handle.index())
            .and_then(Option::as_ref)
            .filter(|sound| sound.handle() == handle)
            .ok_or(SamplerError::SoundNotFound(handle))
    }

    /// Set a parameter by its external name.
    ///
    /// Out-of-range values are clamped, never rejected; the stored value is
    /// returned. Only unknown names and dead handles fail.
    pub fn update_parameter(
        &mut self,
        handle: SoundHandle,
        name: &str,
        value: impl Into<ParamValue>,
    ) -> Result<ParamValue> {
        let id =
            ParamId::from_name(name).ok_or_else(|| SamplerError::UnknownParameter(name.to_owned()))?;
        self.set_parameter(handle, id, value.into().as_f32())?;
        self.parameter(handle, id)
    }

    pub fn set_parameter(&mut self, handle: SoundHandle, id: ParamId, value: f32) -> Result<f32> {
        let stored = self.modify(handle, |snapshot| {
            let stored = snapshot.params.set(id, value);
            let revision = &mut snapshot.param_revisions[id.index()];
            *revision = revision.wrapping_add(1);
            stored
        })?;
        if stored != value {
            debug!(sound = ?handle, param = id.name(), requested = value, stored, "clamped parameter");
        }
        Ok(stored)
    }

    pub fn get_parameter(&self, handle: SoundHandle, name: &str) -> Result<ParamValue> {
        let id =
            ParamId::from_name(name).ok_or_else(|| SamplerError::UnknownParameter(name.to_owned()))?;
        self.parameter(handle, id)
    }

    pub fn parameter(&self, handle: SoundHandle, id: ParamId) -> Result<ParamValue> {
        Ok(self.sound(handle)?.snapshot().params.value(id))
    }

    pub fn params(&self, handle: SoundHandle) -> Result<SoundParams> {
        Ok(self.sound(handle)?.snapshot().params)
    }

    pub fn set_mapped_notes(&mut self, handle: SoundHandle, notes: NoteSet) -> Result<()> {
        self.modify(handle, |snapshot| snapshot.notes = notes)
    }

    pub fn mapped_notes(&self, handle: SoundHandle) -> Result<NoteSet> {
        Ok(self.sound(handle)?.snapshot().notes)
    }

    /// Restrict a sound to one velocity bucket (`None` = any velocity).
    pub fn set_velocity_layer(&mut self, handle: SoundHandle, layer: Option<u8>) -> Result<()> {
        self.modify(handle, |snapshot| snapshot.velocity_layer = layer)
    }

    /// Replace the onset list. Offsets past the end of the sound are dropped,
    /// the rest sorted and de-duplicated. Returns how many were kept.
    pub fn set_onsets(
        &mut self,
        handle: SoundHandle,
        onsets: impl IntoIterator<Item = usize>,
    ) -> Result<usize> {
        let length = self.sound(handle)?.source().len();
        let mut onsets: Vec<usize> = onsets.into_iter().filter(|&o| o < length).collect();
        onsets.sort_unstable();
        onsets.dedup();
        let kept = onsets.len();
        let onsets: Arc<[usize]> = onsets.into();
        self.modify(handle, |snapshot| snapshot.onsets = onsets)?;
        debug!(sound = ?handle, onsets = kept, "updated onsets");
        Ok(kept)
    }

    /// Same as [`set_onsets`](Self::set_onsets) with onsets given in seconds.
    pub fn set_onset_times(&mut self, handle: SoundHandle, seconds: &[f32]) -> Result<usize> {
        let sample_rate = self.sound(handle)?.source().sample_rate();
        let samples = seconds
            .iter()
            .filter(|s| s.is_finite() && **s >= 0.0)
            .map(|s| (s * sample_rate) as usize)
            .collect::<Vec<_>>();
        self.set_onsets(handle, samples)
    }

    pub fn onset_times(&self, handle: SoundHandle) -> Result<OnsetTimes> {
        let snapshot = self.sound(handle)?.snapshot();
        Ok(OnsetTimes::new(Arc::clone(&snapshot.onsets)))
    }

    /// Map `controller` onto the parameter named `param`. Returns the mapping id.
    pub fn add_cc_mapping(
        &mut self,
        handle: SoundHandle,
        controller: u8,
        param: &str,
        min: f32,
        max: f32,
    ) -> Result<u32> {
        let param =
            ParamId::from_name(param).ok_or_else(|| SamplerError::UnknownParameter(param.to_owned()))?;
        let id = self.next_mapping_id;
        let mapping = CcMapping {
            id,
            controller: controller.min(127),
            param,
            min,
            max,
        };
        self.modify(handle, |snapshot| {
            let mut mappings = snapshot.cc_mappings.to_vec();
            mappings.push(mapping);
            snapshot.cc_mappings = mappings.into();
        })?;
        self.next_mapping_id = self.next_mapping_id.wrapping_add(1);
        Ok(id)
    }

    /// Returns whether a mapping with that id existed.
    pub fn remove_cc_mapping(&mut self, handle: SoundHandle, id: u32) -> Result<bool> {
        self.modify(handle, |snapshot| {
            let before = snapshot.cc_mappings.len();
            let mappings: Vec<CcMapping> = snapshot
                .cc_mappings
                .iter()
                .filter(|mapping| mapping.id != id)
                .copied()
                .collect();
            let removed = mappings.len() != before;
            snapshot.cc_mappings = mappings.into();
            removed
        })
    }

    pub fn cc_mappings(&self, handle: SoundHandle) -> Result<Vec<CcMapping>> {
        Ok(self.sound(handle)?.snapshot().cc_mappings.to_vec())
    }

    /// Re-map every loaded sound's notes and root note.
    pub fn apply_note_layout(&mut self, layout: NoteLayout) {
        let count = self.order.len();
        for (position, handle) in self.order.clone().into_iter().enumerate() {
            let (notes, root) = layout::assign(layout, position, count);
            let result = self.modify(handle, |snapshot| {
                snapshot.notes = notes;
                snapshot.params.set(ParamId::RootNote, f32::from(root));
                let revision = &mut snapshot.param_revisions[ParamId::RootNote.index()];
                *revision = revision.wrapping_add(1);
            });
            debug_assert!(result.is_ok(), "ordered handles are always live");
        }
        info!(?layout, sounds = count, "applied note layout");
    }

    /// Drop the alternate buffer so voices go back to the source audio.
    pub fn clear_processed(&mut self, handle: SoundHandle) -> Result<()> {
        let sound = self.sound(handle)?;
        sound.next_request();
        if let Some(old) = sound.replace_processed(None) {
            let delay = self.config.safe_deletion_delay();
            self.maintenance.retire(delay, "drop processed buffer", old);
        }
        Ok(())
    }

    /// Run deferred work whose delay has elapsed.
    pub fn run_maintenance(&mut self, now: Instant) -> usize {
        self.maintenance.run_due(now)
    }

    pub fn pending_maintenance(&self) -> usize {
        self.maintenance.len()
    }

    fn modify<R>(&mut self, handle: SoundHandle, f: impl FnOnce(&mut SoundSnapshot) -> R) -> Result<R> {
        let sound = self.sound(handle)?;
        let mut next = SoundSnapshot::clone(&sound.snapshot());
        let result = f(&mut next);
        let old = sound.replace_snapshot(next);
        let delay = self.config.safe_deletion_delay();
        self.maintenance.retire(delay, "drop sound snapshot", old);
        Ok(result)
    }

    fn publish(&mut self) {
        let bank = SoundBank {
            slots: self.slots.clone(),
            order: self.order.clone(),
        };
        let old = self.published.swap(Arc::new(bank));
        let delay = self.config.safe_deletion_delay();
        self.maintenance.retire(delay, "drop sound bank", old);
    }
}

impl Drop for SoundStore {
    fn drop(&mut self) {
        self.maintenance.flush();
    }
}
