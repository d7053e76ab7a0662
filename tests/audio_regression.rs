use std::time::{Duration, Instant};

use source_sampler::{
    dsp::reverb::ReverbParams,
    engine::preprocess::{PreprocessWorker, StretchRequest},
    io::DecodedAudio,
    sound::{
        params::{LaunchMode, NoteMappingMode, ParamId, SoundParams},
        store::SoundStore,
        NoteSet, SampleBuffer, SoundHandle,
    },
    synth::{message::SamplerHandle, sampler::Sampler},
    EngineComponents, EngineConfig,
};

const SR: f32 = 48_000.0;

fn engine(max_voices: usize) -> (SoundStore, Sampler, SamplerHandle) {
    let EngineComponents {
        store,
        sampler,
        handle,
    } = EngineComponents::new(EngineConfig {
        max_voices,
        ..EngineConfig::default()
    });
    (store, sampler, handle)
}

/// One second of a constant level, no envelope, unity gain.
fn load_flat(store: &mut SoundStore, level: f32) -> SoundHandle {
    let mut params = SoundParams::default();
    params.set(ParamId::Attack, 0.0);
    params.set(ParamId::Release, 0.0);
    params.set(ParamId::Gain, 0.0);
    params.set(ParamId::VelocityToGain, 0.0);
    store
        .load_sound(DecodedAudio::mono(vec![level; SR as usize], SR), params)
        .unwrap()
}

fn render(sampler: &mut Sampler, frames: usize) -> (Vec<f32>, Vec<f32>) {
    let mut left = vec![0.0; frames];
    let mut right = vec![0.0; frames];
    sampler.render_block(&mut left, &mut right);
    (left, right)
}

fn sounding_bounds(sampler: &Sampler) -> Vec<(usize, usize)> {
    sampler
        .voices()
        .iter()
        .filter(|v| v.is_active())
        .map(|v| v.bounds())
        .collect()
}

#[test]
fn renders_silence_with_no_sounds() {
    let (_store, mut sampler, mut tx) = engine(8);
    tx.note_on(60, 100).unwrap();
    let (left, right) = render(&mut sampler, 256);

    assert_eq!(sampler.active_voices(), 0);
    assert!(left.iter().chain(right.iter()).all(|&s| s == 0.0));
    assert_eq!(sampler.frames_rendered(), 256);
}

#[test]
fn equal_slices_follow_note_index() {
    let (mut store, mut sampler, mut tx) = engine(8);
    let sound = load_flat(&mut store, 0.25);
    store.set_mapped_notes(sound, NoteSet::range(60..64)).unwrap();
    store
        .set_parameter(sound, ParamId::NoteMappingMode, NoteMappingMode::Slice.index() as f32)
        .unwrap();
    store.set_parameter(sound, ParamId::NumSlices, 4.0).unwrap();

    tx.note_on(62, 100).unwrap();
    render(&mut sampler, 64);
    assert_eq!(sounding_bounds(&sampler), vec![(24_000, 36_000)]);

    let voice = sampler.voices().iter().find(|v| v.is_active()).unwrap();
    assert_eq!(voice.loop_bounds(), (24_000, 36_000));
    assert!(voice.playhead() >= 24_000.0);
}

#[test]
fn onset_slices_use_detected_onsets() {
    let (mut store, mut sampler, mut tx) = engine(8);
    let sound = load_flat(&mut store, 0.25);
    store.set_mapped_notes(sound, NoteSet::range(60..64)).unwrap();
    store
        .set_parameter(sound, ParamId::NoteMappingMode, NoteMappingMode::Slice.index() as f32)
        .unwrap();
    store.set_parameter(sound, ParamId::NumSlices, 0.0).unwrap();
    store.set_onsets(sound, [20_000, 1_000, 5_000, 90_000]).unwrap();

    tx.note_on(61, 100).unwrap();
    render(&mut sampler, 64);
    assert_eq!(sounding_bounds(&sampler), vec![(5_000, 20_000)]);

    tx.all_sound_off().unwrap();
    tx.note_on(62, 100).unwrap();
    render(&mut sampler, 64);
    assert_eq!(sounding_bounds(&sampler), vec![(20_000, 48_000)]);
}

#[test]
fn octave_above_root_plays_twice_as_fast() {
    let (mut store, mut sampler, mut tx) = engine(8);
    let sound = load_flat(&mut store, 0.25);
    store.set_parameter(sound, ParamId::RootNote, 60.0).unwrap();

    tx.note_on(72, 100).unwrap();
    render(&mut sampler, 64);

    let voice = sampler.voices().iter().find(|v| v.is_active()).unwrap();
    assert!((voice.pitch_ratio() - 2.0).abs() < 1e-9);
    assert!((voice.playhead() - 128.0).abs() < 1e-6);
}

#[test]
fn freeze_follows_playhead_parameter() {
    let (mut store, mut sampler, mut tx) = engine(8);
    let sound = load_flat(&mut store, 0.25);
    store
        .set_parameter(sound, ParamId::LaunchMode, LaunchMode::Freeze.index() as f32)
        .unwrap();
    store.set_parameter(sound, ParamId::FreezePlayheadSpeed, 5000.0).unwrap();
    store.set_parameter(sound, ParamId::PlayheadPosition, 0.5).unwrap();

    tx.note_on(64, 100).unwrap();
    render(&mut sampler, 64);
    let (_, position) = sampler.voice_positions().next().unwrap();
    assert!((position - 0.5).abs() < 0.001);

    store.set_parameter(sound, ParamId::PlayheadPosition, 0.25).unwrap();
    render(&mut sampler, 9_600);
    let (handle, position) = sampler.voice_positions().next().unwrap();
    assert_eq!(handle, sound);
    assert!((position - 0.25).abs() < 0.005, "position {position}");
}

#[test]
fn oldest_voice_is_stolen() {
    let (mut store, mut sampler, mut tx) = engine(2);
    load_flat(&mut store, 0.25);

    for note in [60, 61, 62] {
        tx.note_on(note, 100).unwrap();
        render(&mut sampler, 64);
    }

    let mut notes: Vec<u8> = sampler
        .voices()
        .iter()
        .filter(|v| v.is_active())
        .map(|v| v.note())
        .collect();
    notes.sort_unstable();
    assert_eq!(notes, vec![61, 62]);
}

#[test]
fn removed_sound_goes_silent_and_is_freed_later() {
    let (mut store, mut sampler, mut tx) = engine(8);
    let sound = load_flat(&mut store, 0.25);

    tx.note_on(60, 100).unwrap();
    let (left, _) = render(&mut sampler, 64);
    assert!(left[32] > 0.0);

    store.remove_sound(sound).unwrap();
    let (left, right) = render(&mut sampler, 64);
    assert_eq!(sampler.active_voices(), 0);
    assert!(left.iter().chain(right.iter()).all(|&s| s == 0.0));

    assert!(store.pending_maintenance() > 0);
    store.run_maintenance(Instant::now() + Duration::from_secs(1));
    assert_eq!(store.pending_maintenance(), 0);
}

#[test]
fn parameter_edits_reach_sounding_voices() {
    let (mut store, mut sampler, mut tx) = engine(8);
    let sound = load_flat(&mut store, 0.25);

    tx.note_on(60, 127).unwrap();
    let (_, right) = render(&mut sampler, 256);
    assert!(right[200] > 0.1);

    store.set_parameter(sound, ParamId::Pan, -1.0).unwrap();
    render(&mut sampler, 256);
    let (left, right) = render(&mut sampler, 256);
    assert!(left[128] > 0.1);
    assert!(right[128].abs() < 1e-3);
}

#[test]
fn processed_buffer_switch_keeps_relative_position() {
    let (mut store, mut sampler, mut tx) = engine(8);
    let sound = load_flat(&mut store, 0.25);
    store.set_parameter(sound, ParamId::RootNote, 60.0).unwrap();

    tx.note_on(60, 100).unwrap();
    render(&mut sampler, 1_000);

    let doubled = |source: &SampleBuffer, _: &StretchRequest| {
        let samples = source.left().iter().flat_map(|&s| [s, s]).collect();
        Some(DecodedAudio::mono(samples, source.sample_rate()))
    };
    let worker = PreprocessWorker::spawn(store.reader(), doubled, Duration::ZERO).unwrap();
    worker
        .submit(
            sound,
            StretchRequest {
                time_stretch: 2.0,
                ..StretchRequest::default()
            },
        )
        .unwrap();
    worker.shutdown();

    render(&mut sampler, 64);
    let voice = sampler.voices().iter().find(|v| v.is_active()).unwrap();
    assert!((voice.playhead() - 2_064.0).abs() < 1.0, "playhead {}", voice.playhead());
    assert_eq!(voice.bounds(), (0, 96_000));
}

#[test]
fn onset_slices_scale_with_processed_buffer() {
    let (mut store, mut sampler, mut tx) = engine(8);
    let sound = load_flat(&mut store, 0.25);
    store.set_mapped_notes(sound, NoteSet::range(60..64)).unwrap();
    store
        .set_parameter(sound, ParamId::NoteMappingMode, NoteMappingMode::Slice.index() as f32)
        .unwrap();
    store.set_parameter(sound, ParamId::NumSlices, 0.0).unwrap();
    store.set_onsets(sound, [1_000, 5_000, 20_000]).unwrap();

    tx.note_on(61, 100).unwrap();
    render(&mut sampler, 64);
    assert_eq!(sounding_bounds(&sampler), vec![(5_000, 20_000)]);

    let doubled = |source: &SampleBuffer, _: &StretchRequest| {
        let samples = source.left().iter().flat_map(|&s| [s, s]).collect();
        Some(DecodedAudio::mono(samples, source.sample_rate()))
    };
    let worker = PreprocessWorker::spawn(store.reader(), doubled, Duration::ZERO).unwrap();
    worker
        .submit(
            sound,
            StretchRequest {
                time_stretch: 2.0,
                ..StretchRequest::default()
            },
        )
        .unwrap();
    worker.shutdown();

    render(&mut sampler, 64);
    assert_eq!(sounding_bounds(&sampler), vec![(10_000, 40_000)]);
}

#[test]
fn engine_builds_on_a_small_thread_stack() {
    let worker = std::thread::Builder::new()
        .stack_size(256 * 1024)
        .spawn(|| {
            let (mut store, mut sampler, mut tx) = engine(32);
            load_flat(&mut store, 0.25);
            tx.set_reverb(ReverbParams {
                wet_level: 0.3,
                ..ReverbParams::default()
            })
            .unwrap();
            tx.note_on(60, 100).unwrap();
            let (left, _) = render(&mut sampler, 256);
            left.iter().all(|s| s.is_finite())
        })
        .unwrap();

    assert!(worker.join().unwrap());
}

#[test]
fn dense_mix_with_reverb_stays_finite() {
    let (mut store, mut sampler, mut tx) = engine(8);
    for _ in 0..4 {
        load_flat(&mut store, 0.25);
    }
    tx.set_reverb(ReverbParams {
        wet_level: 0.5,
        room_size: 0.9,
        ..ReverbParams::default()
    })
    .unwrap();
    for note in [48, 55, 60, 64] {
        tx.note_on(note, 127).unwrap();
    }

    let mut wet = false;
    for _ in 0..20 {
        let (left, right) = render(&mut sampler, 512);
        assert!(left.iter().chain(right.iter()).all(|s| s.is_finite()));
        wet |= (left[511] - right[511]).abs() > 1e-4;
    }
    assert_eq!(sampler.active_voices(), 8);
    assert!(wet, "detuned reverb tails should differ between channels");
}
