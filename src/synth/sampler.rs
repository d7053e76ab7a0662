use rtrb::Consumer;

use crate::config::EngineConfig;
use crate::dsp::reverb::StereoReverb;
use crate::sound::params::{ParamId, SoundParams, PARAM_COUNT};
use crate::sound::store::BankReader;
use crate::sound::{Sound, SoundHandle, SoundSnapshot};
use crate::synth::mapper::{collect_targets, NoteTarget};
use crate::synth::message::SamplerMessage;
use crate::synth::voice::{SamplerVoice, VoiceInput, VoiceState};
use crate::MAX_BLOCK_SIZE;

const BEND_CENTRE: u16 = 8192;

#[derive(Debug, Clone, Copy)]
struct Override {
    generation: u32,
    revision: u32,
    value: f32,
}

/// Parameter values set from the audio thread by MIDI controllers.
///
/// One row per store slot. An entry stays valid while the slot holds the same
/// sound and the control thread hasn't written that parameter since.
struct OverrideTable {
    rows: Vec<[Option<Override>; PARAM_COUNT]>,
}

impl OverrideTable {
    fn new(slots: usize) -> Self {
        Self {
            rows: vec![[None; PARAM_COUNT]; slots],
        }
    }

    fn set(&mut self, handle: SoundHandle, snapshot: &SoundSnapshot, param: ParamId, value: f32) {
        if let Some(row) = self.rows.get_mut(handle.index()) {
            row[param.index()] = Some(Override {
                generation: handle.generation,
                revision: snapshot.param_revisions[param.index()],
                value,
            });
        }
    }

    /// The snapshot's parameters with every still-valid override applied.
    fn apply(&mut self, handle: SoundHandle, snapshot: &SoundSnapshot) -> SoundParams {
        let mut params = snapshot.params;
        let Some(row) = self.rows.get_mut(handle.index()) else {
            return params;
        };
        for id in ParamId::all() {
            let slot = &mut row[id.index()];
            match *slot {
                Some(o)
                    if o.generation == handle.generation
                        && o.revision == snapshot.param_revisions[id.index()] =>
                {
                    params.set(id, o.value);
                }
                Some(_) => *slot = None,
                None => {}
            }
        }
        params
    }

    fn clear(&mut self) {
        for row in &mut self.rows {
            *row = [None; PARAM_COUNT];
        }
    }
}

/// The polyphonic sampler: voice pool, event intake and master bus.
///
/// Owned by the audio thread. Everything it needs is allocated in
/// [`Sampler::new`]; `render_block` never allocates, locks or logs.
pub struct Sampler {
    config: EngineConfig,
    bank: BankReader,
    rx: Consumer<SamplerMessage>,
    voices: Vec<SamplerVoice>,
    targets: Vec<NoteTarget>,
    overrides: OverrideTable,
    reverb: StereoReverb,
    voice_l: Vec<f32>,
    voice_r: Vec<f32>,
    wheel: u8,
    bend: u16,
    notes_started: u64,
    frame_counter: u64,
}

impl Sampler {
    pub fn new(config: EngineConfig, bank: BankReader, rx: Consumer<SamplerMessage>) -> Self {
        let config = config.sanitized();
        let voices = (0..config.max_voices)
            .map(|_| SamplerVoice::new(config.sample_rate))
            .collect();

        Self {
            bank,
            rx,
            voices,
            targets: Vec::with_capacity(config.max_sounds),
            overrides: OverrideTable::new(config.max_sounds),
            reverb: StereoReverb::new(config.sample_rate),
            voice_l: vec![0.0; MAX_BLOCK_SIZE],
            voice_r: vec![0.0; MAX_BLOCK_SIZE],
            wheel: 0,
            bend: BEND_CENTRE,
            notes_started: 0,
            frame_counter: 0,
            config,
        }
    }

    /// Apply queued events, then render `left.len()` frames of stereo output.
    pub fn render_block(&mut self, left: &mut [f32], right: &mut [f32]) {
        while let Ok(message) = self.rx.pop() {
            self.handle_message(message);
        }

        let frames = left.len().min(right.len());
        left.fill(0.0);
        right.fill(0.0);

        let mut offset = 0;
        while offset < frames {
            let len = (frames - offset).min(self.config.block_size);
            self.render_voices(
                &mut left[offset..offset + len],
                &mut right[offset..offset + len],
            );
            offset += len;
        }

        self.reverb.process(&mut left[..frames], &mut right[..frames]);
        self.frame_counter += frames as u64;
    }

    fn render_voices(&mut self, left: &mut [f32], right: &mut [f32]) {
        let len = left.len();
        let bank = self.bank.load();

        for voice in self.voices.iter_mut().filter(|v| v.is_active()) {
            let Some(sound) = voice.handle().and_then(|handle| bank.get(handle)) else {
                // Removed while playing.
                voice.kill();
                continue;
            };
            let snapshot = sound.snapshot();
            let params = self.overrides.apply(sound.handle(), &snapshot);
            let voice_l = &mut self.voice_l[..len];
            let voice_r = &mut self.voice_r[..len];

            sound.with_active_buffer(|buffer| {
                let input = VoiceInput {
                    params: &params,
                    mapped_notes: snapshot.notes.len(),
                    onsets: &snapshot.onsets,
                    buffer,
                    source_len: sound.source().len(),
                    wheel: self.wheel,
                    bend: self.bend,
                    zero_crossing_window: self.config.zero_crossing_window,
                };
                voice.render(voice_l, voice_r, &input);

                for (out, v) in left.iter_mut().zip(voice_l.iter()) {
                    *out += v;
                }
                for (out, v) in right.iter_mut().zip(voice_r.iter()) {
                    *out += v;
                }
            });
        }
    }

    fn handle_message(&mut self, message: SamplerMessage) {
        match message {
            SamplerMessage::NoteOn { note, velocity: 0 } => self.note_off(note),
            SamplerMessage::NoteOn { note, velocity } => self.note_on(note, velocity),
            SamplerMessage::NoteOff { note, .. } => self.note_off(note),
            SamplerMessage::ControlChange { controller, value } => {
                self.control_change(controller, value)
            }
            SamplerMessage::PitchBend { value } => self.bend = value.min(16_383),
            SamplerMessage::Aftertouch { note, pressure } => {
                for voice in self.voices.iter_mut().filter(|v| v.is_active() && v.note() == note) {
                    voice.set_pressure(pressure);
                }
            }
            SamplerMessage::ChannelPressure { pressure } => {
                for voice in self.voices.iter_mut().filter(|v| v.is_active()) {
                    voice.set_pressure(pressure);
                }
            }
            SamplerMessage::AllNotesOff => {
                for voice in &mut self.voices {
                    voice.release();
                }
            }
            SamplerMessage::AllSoundOff => {
                for voice in &mut self.voices {
                    voice.kill();
                }
            }
            SamplerMessage::StopSound { handle } => {
                for voice in self.voices.iter_mut().filter(|v| v.handle() == Some(handle)) {
                    voice.release();
                }
            }
            SamplerMessage::SetReverb(params) => self.reverb.set_params(params),
        }
    }

    fn note_on(&mut self, note: u8, velocity: u8) {
        let bank = self.bank.load();
        let layer = self.config.velocity_layer(velocity);
        collect_targets(&bank, note, layer, &mut self.targets);

        for i in 0..self.targets.len() {
            let target = self.targets[i];
            let Some(sound) = bank.get(target.handle) else {
                continue;
            };

            // Retrigger: the previous voice for this key tails off.
            for voice in self.voices.iter_mut().filter(|v| v.is_holding(target.handle, note)) {
                voice.release();
            }

            let age = self.notes_started;
            self.notes_started += 1;
            let index = self.allocate_voice();
            self.start_voice(index, sound, target, note, velocity, age);
        }
    }

    fn start_voice(
        &mut self,
        index: usize,
        sound: &Sound,
        target: NoteTarget,
        note: u8,
        velocity: u8,
        age: u64,
    ) {
        let snapshot = sound.snapshot();
        let params = self.overrides.apply(sound.handle(), &snapshot);
        let voice = &mut self.voices[index];

        sound.with_active_buffer(|buffer| {
            let input = VoiceInput {
                params: &params,
                mapped_notes: snapshot.notes.len(),
                onsets: &snapshot.onsets,
                buffer,
                source_len: sound.source().len(),
                wheel: self.wheel,
                bend: self.bend,
                zero_crossing_window: self.config.zero_crossing_window,
            };
            voice.start(target, note, velocity, age, &input);
        });
    }

    /// A free voice if there is one, otherwise the oldest-started voice.
    fn allocate_voice(&mut self) -> usize {
        if let Some(index) = self.voices.iter().position(|v| v.is_free()) {
            return index;
        }
        let index = self
            .voices
            .iter()
            .enumerate()
            .min_by_key(|(_, v)| v.age())
            .map_or(0, |(index, _)| index);
        self.voices[index].kill();
        index
    }

    fn note_off(&mut self, note: u8) {
        for voice in self
            .voices
            .iter_mut()
            .filter(|v| v.state() == VoiceState::Attacking && v.note() == note)
        {
            voice.release();
        }
    }

    fn control_change(&mut self, controller: u8, value: u8) {
        if controller == self.config.mod_wheel_cc {
            self.wheel = value.min(127);
        }

        let bank = self.bank.load();
        if let Some(sound) = self
            .config
            .freeze_sound_index(controller)
            .and_then(|position| bank.sound_at(position))
        {
            let snapshot = sound.snapshot();
            let position = f32::from(value.min(127)) / 127.0;
            self.overrides
                .set(sound.handle(), &snapshot, ParamId::PlayheadPosition, position);
        }

        for sound in bank.iter() {
            let snapshot = sound.snapshot();
            for mapping in snapshot.cc_mappings.iter().filter(|m| m.controller == controller) {
                self.overrides
                    .set(sound.handle(), &snapshot, mapping.param, mapping.value_for(value));
            }
        }
    }

    /// Drop every controller override, falling back to the stored parameters.
    pub fn reset_controllers(&mut self) {
        self.overrides.clear();
        self.wheel = 0;
        self.bend = BEND_CENTRE;
        for voice in &mut self.voices {
            voice.set_pressure(0);
        }
    }

    /// `(sound, playhead fraction)` for every sounding voice.
    pub fn voice_positions(&self) -> impl Iterator<Item = (SoundHandle, f32)> + '_ {
        self.voices
            .iter()
            .filter(|v| v.is_active())
            .filter_map(|v| Some((v.handle()?, v.position_fraction())))
    }

    pub fn voices(&self) -> &[SamplerVoice] {
        &self.voices
    }

    pub fn active_voices(&self) -> usize {
        self.voices.iter().filter(|v| v.is_active()).count()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Frames rendered since construction.
    pub fn frames_rendered(&self) -> u64 {
        self.frame_counter
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::DecodedAudio;
    use crate::sound::params::LaunchMode;
    use crate::sound::store::SoundStore;
    use crate::synth::message::SamplerHandle;

    fn setup(max_voices: usize) -> (SoundStore, Sampler, SamplerHandle) {
        let config = EngineConfig {
            max_voices,
            ..EngineConfig::default()
        };
        let store = SoundStore::new(config.clone());
        let (handle, rx) = SamplerHandle::new(64);
        let sampler = Sampler::new(config, store.reader(), rx);
        (store, sampler, handle)
    }

    fn steady(params: &mut SoundParams) {
        params.set(ParamId::Attack, 0.0);
        params.set(ParamId::Release, 0.0);
        params.set(ParamId::Gain, 0.0);
    }

    fn load(store: &mut SoundStore) -> SoundHandle {
        let mut params = SoundParams::default();
        steady(&mut params);
        store
            .load_sound(DecodedAudio::mono(vec![0.25; 48_000], 48_000.0), params)
            .unwrap()
    }

    fn render(sampler: &mut Sampler, frames: usize) -> (Vec<f32>, Vec<f32>) {
        let mut l = vec![0.0; frames];
        let mut r = vec![0.0; frames];
        sampler.render_block(&mut l, &mut r);
        (l, r)
    }

    #[test]
    fn note_on_and_off() {
        let (mut store, mut sampler, mut tx) = setup(4);
        load(&mut store);

        tx.note_on(60, 127).unwrap();
        let (l, _) = render(&mut sampler, 128);
        assert_eq!(sampler.active_voices(), 1);
        assert!(l[100] > 0.0);

        tx.note_off(60, 0).unwrap();
        render(&mut sampler, 128);
        assert_eq!(sampler.active_voices(), 0);
    }

    #[test]
    fn velocity_zero_is_note_off() {
        let (mut store, mut sampler, mut tx) = setup(4);
        load(&mut store);

        tx.note_on(60, 127).unwrap();
        render(&mut sampler, 64);
        tx.send(SamplerMessage::NoteOn {
            note: 60,
            velocity: 0,
        })
        .unwrap();
        render(&mut sampler, 64);
        assert_eq!(sampler.active_voices(), 0);
    }

    #[test]
    fn layered_sounds_each_get_a_voice() {
        let (mut store, mut sampler, mut tx) = setup(4);
        load(&mut store);
        load(&mut store);

        tx.note_on(60, 127).unwrap();
        render(&mut sampler, 64);
        assert_eq!(sampler.active_voices(), 2);
    }

    #[test]
    fn retrigger_releases_previous_voice() {
        let (mut store, mut sampler, mut tx) = setup(4);
        load(&mut store);

        tx.note_on(60, 127).unwrap();
        tx.note_on(60, 127).unwrap();
        render(&mut sampler, 64);
        assert_eq!(sampler.active_voices(), 1);
    }

    #[test]
    fn all_sound_off_silences_immediately() {
        let (mut store, mut sampler, mut tx) = setup(4);
        load(&mut store);

        tx.note_on(60, 127).unwrap();
        tx.note_on(64, 127).unwrap();
        render(&mut sampler, 64);
        tx.all_sound_off().unwrap();
        let (l, r) = render(&mut sampler, 64);

        assert_eq!(sampler.active_voices(), 0);
        assert!(l.iter().chain(&r).all(|&s| s == 0.0));
    }

    #[test]
    fn freeze_cc_overrides_playhead_until_control_write() {
        let (mut store, mut sampler, mut tx) = setup(4);
        let handle = load(&mut store);
        store
            .update_parameter(handle, "launchMode", LaunchMode::Freeze.index())
            .unwrap();
        store
            .update_parameter(handle, "freezePlayheadSpeed", 5000.0)
            .unwrap();

        tx.control_change(10, 127).unwrap();
        tx.note_on(60, 127).unwrap();
        render(&mut sampler, 64);
        let (_, position) = sampler.voice_positions().next().unwrap();
        assert!(position > 0.99);

        store.update_parameter(handle, "playheadPosition", 0.0).unwrap();
        render(&mut sampler, 64 * 40);
        let (_, position) = sampler.voice_positions().next().unwrap();
        assert!(position < 0.01, "override should be gone, got {position}");
    }

    #[test]
    fn cc_mapping_drives_parameter() {
        let (mut store, mut sampler, mut tx) = setup(4);
        let handle = load(&mut store);
        store.add_cc_mapping(handle, 84, "pan", -1.0, 1.0).unwrap();

        tx.control_change(84, 0).unwrap();
        tx.note_on(60, 127).unwrap();
        let (l, r) = render(&mut sampler, 256);
        assert!(l[200] > 0.1);
        assert!(r[200].abs() < 1e-6);
    }

    #[test]
    fn stop_sound_releases_only_that_sound() {
        let (mut store, mut sampler, mut tx) = setup(4);
        let a = load(&mut store);
        let b = load(&mut store);
        store.set_mapped_notes(a, crate::sound::NoteSet::range(0..64)).unwrap();
        store.set_mapped_notes(b, crate::sound::NoteSet::range(64..128)).unwrap();

        tx.note_on(60, 127).unwrap();
        tx.note_on(70, 127).unwrap();
        render(&mut sampler, 64);
        tx.stop_sound(a).unwrap();
        render(&mut sampler, 64);

        let playing: Vec<_> = sampler.voice_positions().map(|(h, _)| h).collect();
        assert_eq!(playing, vec![b]);
    }
}
