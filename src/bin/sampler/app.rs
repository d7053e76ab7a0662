//! Player - opens the default output and drives a short note sequence

use std::f32::consts::TAU;
use std::thread;
use std::time::{Duration, Instant};

use color_eyre::eyre::{eyre, Result as EyreResult, WrapErr};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use tracing::{error, info};

use source_sampler::{
    io::DecodedAudio,
    sound::{layout::NoteLayout, params::ParamId},
    EngineComponents, EngineConfig, MAX_BLOCK_SIZE,
};

pub struct Player {
    config: EngineConfig,
    sounds: Vec<DecodedAudio>,
    layout: NoteLayout,
    note_length: Duration,
}

impl Player {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            sounds: Vec::new(),
            layout: NoteLayout::default(),
            note_length: Duration::from_millis(600),
        }
    }

    pub fn sounds(mut self, sounds: Vec<DecodedAudio>) -> Self {
        self.sounds = sounds;
        self
    }

    pub fn layout(mut self, layout: NoteLayout) -> Self {
        self.layout = layout;
        self
    }

    pub fn note_length(mut self, length: Duration) -> Self {
        self.note_length = length;
        self
    }

    /// Play every loaded sound at its root note, then all of them together.
    pub fn run(self) -> EyreResult<()> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| eyre!("no default output device available"))?;
        let stream_config = device
            .default_output_config()
            .wrap_err("failed to fetch default output config")?;

        let sample_rate = stream_config.sample_rate().0 as f32;
        let channels = stream_config.channels() as usize;
        info!(sample_rate, channels, "audio output");

        let config = EngineConfig {
            sample_rate,
            ..self.config
        };
        let EngineComponents {
            mut store,
            mut sampler,
            mut handle,
        } = EngineComponents::new(config);

        let sounds = if self.sounds.is_empty() {
            vec![test_tone(sample_rate)]
        } else {
            self.sounds
        };
        for audio in sounds {
            let sound = store.load_sound_with_defaults(audio)?;
            store.set_parameter(sound, ParamId::Release, 0.3)?;
        }
        store.apply_note_layout(self.layout);

        let mut roots = Vec::with_capacity(store.len());
        for &sound in store.handles() {
            roots.push(store.params(sound)?.root_note);
        }

        let mut left = vec![0.0f32; MAX_BLOCK_SIZE];
        let mut right = vec![0.0f32; MAX_BLOCK_SIZE];

        let stream = device.build_output_stream(
            &stream_config.into(),
            move |data: &mut [f32], _| {
                let total_frames = data.len() / channels;
                let mut frames_written = 0;

                while frames_written < total_frames {
                    let frames = (total_frames - frames_written).min(MAX_BLOCK_SIZE);
                    let (block_l, block_r) = (&mut left[..frames], &mut right[..frames]);
                    sampler.render_block(block_l, block_r);

                    let out = &mut data[frames_written * channels..(frames_written + frames) * channels];
                    let stereo = block_l.iter().zip(block_r.iter());
                    for (frame, (&l, &r)) in out.chunks_mut(channels).zip(stereo) {
                        match frame {
                            [mono] => *mono = 0.5 * (l + r),
                            [first, second, rest @ ..] => {
                                *first = l;
                                *second = r;
                                rest.fill(0.0);
                            }
                            [] => {}
                        }
                    }

                    frames_written += frames;
                }
            },
            |err| error!(%err, "audio stream error"),
            None,
        )?;

        stream.play()?;
        info!(sounds = roots.len(), "playing");

        for &note in &roots {
            handle.note_on(note, 100)?;
            hold(&mut store, self.note_length);
            handle.note_off(note, 0)?;
            hold(&mut store, self.note_length / 2);
        }

        for &note in &roots {
            handle.note_on(note, 90)?;
        }
        hold(&mut store, self.note_length * 2);
        handle.all_notes_off()?;
        hold(&mut store, Duration::from_millis(500));

        Ok(())
    }
}

/// Sleep for `length`, running store maintenance along the way.
fn hold(store: &mut source_sampler::sound::store::SoundStore, length: Duration) {
    let until = Instant::now() + length;
    while Instant::now() < until {
        store.run_maintenance(Instant::now());
        thread::sleep(Duration::from_millis(20));
    }
}

/// Two seconds of a decaying A3 with a little second harmonic.
fn test_tone(sample_rate: f32) -> DecodedAudio {
    let frames = (sample_rate * 2.0) as usize;
    let samples = (0..frames)
        .map(|i| {
            let t = i as f32 / sample_rate;
            let decay = (-1.5 * t).exp();
            decay * (0.6 * (TAU * 220.0 * t).sin() + 0.2 * (TAU * 440.0 * t).sin())
        })
        .collect();
    DecodedAudio::mono(samples, sample_rate)
}
