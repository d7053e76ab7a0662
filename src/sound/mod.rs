//! Sounds: decoded audio plus everything that shapes how it is played.
//!
//! A [`Sound`] is shared between the control thread (which edits it through
//! the [`SoundStore`](store::SoundStore)), the audio thread (which reads it once
//! per block) and the pre-processing worker (which may publish an alternate
//! buffer). Every mutable part sits behind an `ArcSwap`, so readers always see
//! a complete snapshot and never wait on a writer.

pub mod cc;
pub mod layout;
pub mod params;
pub mod store;

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use arc_swap::{ArcSwap, ArcSwapOption, Guard};

use crate::error::DecodeError;
use crate::io::DecodedAudio;

use self::cc::CcMapping;
use self::params::{SoundParams, PARAM_COUNT};

/// Stable reference to a slot in the sound store.
///
/// The generation changes every time a slot is reused, so a handle kept past
/// `remove_sound` simply stops resolving instead of aliasing a newer sound.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct SoundHandle {
    pub(crate) index: u32,
    pub(crate) generation: u32,
}

impl SoundHandle {
    pub fn index(&self) -> usize {
        self.index as usize
    }
}

impl fmt::Debug for SoundHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Sound#{}v{}", self.index, self.generation)
    }
}

static NEXT_BUFFER_ID: AtomicU64 = AtomicU64::new(1);

/// Immutable audio data. At most two channels are kept.
#[derive(Debug)]
pub struct SampleBuffer {
    id: u64,
    channels: Vec<Vec<f32>>,
    sample_rate: f32,
}

impl SampleBuffer {
    pub fn new(decoded: DecodedAudio) -> Result<Self, DecodeError> {
        let DecodedAudio {
            mut channels,
            sample_rate,
            ..
        } = decoded;

        if channels.is_empty() {
            return Err(DecodeError::NoChannels);
        }
        if !sample_rate.is_finite() || sample_rate <= 0.0 {
            return Err(DecodeError::InvalidSampleRate(sample_rate));
        }
        channels.truncate(2);
        let expected = channels[0].len();
        if expected == 0 {
            return Err(DecodeError::Empty);
        }
        if let Some((channel, data)) = channels
            .iter()
            .enumerate()
            .find(|(_, data)| data.len() != expected)
        {
            return Err(DecodeError::ChannelLengthMismatch {
                channel,
                len: data.len(),
                expected,
            });
        }

        Ok(Self {
            id: NEXT_BUFFER_ID.fetch_add(1, Ordering::Relaxed),
            channels,
            sample_rate,
        })
    }

    /// Process-unique id, changes whenever a buffer is replaced.
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn len(&self) -> usize {
        self.channels[0].len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    pub fn is_stereo(&self) -> bool {
        self.channels.len() > 1
    }

    pub fn left(&self) -> &[f32] {
        &self.channels[0]
    }

    /// Second channel, or the first one again for mono sources.
    pub fn right(&self) -> &[f32] {
        self.channels.get(1).unwrap_or(&self.channels[0])
    }
}

/// Set of MIDI notes, one bit per note.
#[derive(Clone, Copy, PartialEq, Eq, Default)]
pub struct NoteSet(u128);

impl NoteSet {
    pub const fn empty() -> Self {
        Self(0)
    }

    pub const fn all() -> Self {
        Self(u128::MAX)
    }

    pub fn range(notes: std::ops::Range<u8>) -> Self {
        notes.collect()
    }

    pub fn contains(&self, note: u8) -> bool {
        note < 128 && self.0 & (1u128 << note) != 0
    }

    pub fn insert(&mut self, note: u8) {
        if note < 128 {
            self.0 |= 1u128 << note;
        }
    }

    pub fn remove(&mut self, note: u8) {
        if note < 128 {
            self.0 &= !(1u128 << note);
        }
    }

    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Zero-based rank of `note` among the mapped notes.
    ///
    /// Counts mapped notes strictly below `note`, so gaps in the mapping are
    /// skipped. An empty set gives 0.
    pub fn index_of(&self, note: u8) -> usize {
        let below = if note >= 128 {
            self.0
        } else {
            self.0 & ((1u128 << note) - 1)
        };
        below.count_ones() as usize
    }

    pub fn iter(&self) -> impl Iterator<Item = u8> + '_ {
        (0..128u8).filter(move |&note| self.contains(note))
    }

    pub fn bits(&self) -> u128 {
        self.0
    }

    pub fn from_bits(bits: u128) -> Self {
        Self(bits)
    }
}

impl FromIterator<u8> for NoteSet {
    fn from_iter<I: IntoIterator<Item = u8>>(iter: I) -> Self {
        let mut set = NoteSet::empty();
        for note in iter {
            set.insert(note);
        }
        set
    }
}

impl fmt::Debug for NoteSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

/// Ascending onset positions in samples.
///
/// Cloning is cheap (shared slice), and [`restart`](Self::restart) rewinds to
/// the first onset, so the same value can be walked any number of times.
#[derive(Clone)]
pub struct OnsetTimes {
    onsets: Arc<[usize]>,
    position: usize,
}

impl OnsetTimes {
    pub(crate) fn new(onsets: Arc<[usize]>) -> Self {
        Self {
            onsets,
            position: 0,
        }
    }

    pub fn restart(&mut self) {
        self.position = 0;
    }

    pub fn as_slice(&self) -> &[usize] {
        &self.onsets
    }
}

impl Iterator for OnsetTimes {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        let onset = self.onsets.get(self.position).copied()?;
        self.position += 1;
        Some(onset)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.onsets.len().saturating_sub(self.position);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for OnsetTimes {}

impl fmt::Debug for OnsetTimes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(&self.onsets[self.position..])
            .finish()
    }
}

/// Everything about a sound the control thread may change, published as one
/// immutable value.
#[derive(Debug, Clone)]
pub struct SoundSnapshot {
    pub params: SoundParams,
    pub notes: NoteSet,
    pub velocity_layer: Option<u8>,
    pub onsets: Arc<[usize]>,
    pub cc_mappings: Arc<[CcMapping]>,
    /// Bumped on every control-thread write to the matching parameter.
    pub param_revisions: [u32; PARAM_COUNT],
}

impl SoundSnapshot {
    pub fn new(params: SoundParams, notes: NoteSet) -> Self {
        Self {
            params,
            notes,
            velocity_layer: None,
            onsets: Arc::from(Vec::new()),
            cc_mappings: Arc::from(Vec::new()),
            param_revisions: [0; PARAM_COUNT],
        }
    }
}

pub struct Sound {
    handle: SoundHandle,
    source: Arc<SampleBuffer>,
    processed: ArcSwapOption<SampleBuffer>,
    snapshot: ArcSwap<SoundSnapshot>,
    latest_request: AtomicU64,
}

impl Sound {
    pub(crate) fn new(handle: SoundHandle, source: SampleBuffer, snapshot: SoundSnapshot) -> Self {
        Self {
            handle,
            source: Arc::new(source),
            processed: ArcSwapOption::empty(),
            snapshot: ArcSwap::from_pointee(snapshot),
            latest_request: AtomicU64::new(0),
        }
    }

    pub fn handle(&self) -> SoundHandle {
        self.handle
    }

    /// The buffer as originally loaded.
    pub fn source(&self) -> &Arc<SampleBuffer> {
        &self.source
    }

    /// Current parameter snapshot. Lock-free; hold it for one block at most.
    pub fn snapshot(&self) -> Guard<Arc<SoundSnapshot>> {
        self.snapshot.load()
    }

    /// Alternate pre-processed buffer, if one has been published.
    pub fn processed(&self) -> Guard<Option<Arc<SampleBuffer>>> {
        self.processed.load()
    }

    /// Run `f` with the buffer voices should play right now.
    pub fn with_active_buffer<R>(&self, f: impl FnOnce(&SampleBuffer) -> R) -> R {
        let processed = self.processed.load();
        match processed.as_deref() {
            Some(buffer) => f(buffer),
            None => f(&self.source),
        }
    }

    pub(crate) fn replace_snapshot(&self, next: SoundSnapshot) -> Arc<SoundSnapshot> {
        self.snapshot.swap(Arc::new(next))
    }

    pub(crate) fn replace_processed(
        &self,
        next: Option<Arc<SampleBuffer>>,
    ) -> Option<Arc<SampleBuffer>> {
        self.processed.swap(next)
    }

    /// Claim a new pre-processing request id; older ids become stale.
    pub(crate) fn next_request(&self) -> u64 {
        self.latest_request.fetch_add(1, Ordering::AcqRel) + 1
    }

    pub(crate) fn is_latest_request(&self, id: u64) -> bool {
        self.latest_request.load(Ordering::Acquire) == id
    }
}

impl fmt::Debug for Sound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sound")
            .field("handle", &self.handle)
            .field("length", &self.source.len())
            .field("sample_rate", &self.source.sample_rate())
            .finish_non_exhaustive()
    }
}
