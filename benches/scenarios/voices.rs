//! Benchmarks for full sampler blocks.
//!
//! Each case holds N voices sounding and times one `render_block`, which
//! includes parameter resolution for every voice.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use source_sampler::{
    io::DecodedAudio,
    sound::params::{LaunchMode, NoteMappingMode, ParamId, SoundParams},
    EngineComponents, EngineConfig,
};

use crate::BLOCK_SIZES;

const SR: f32 = 48_000.0;

/// Two seconds of a detuned saw pair, rich enough to keep the filter busy.
fn source() -> DecodedAudio {
    let frames = (SR * 2.0) as usize;
    let left = (0..frames)
        .map(|i| ((i as f32 * 110.0 / SR).fract() * 2.0 - 1.0) * 0.3)
        .collect();
    let right = (0..frames)
        .map(|i| ((i as f32 * 110.5 / SR).fract() * 2.0 - 1.0) * 0.3)
        .collect();
    DecodedAudio::stereo(left, right, SR)
}

fn looping(mapping: NoteMappingMode) -> SoundParams {
    let mut params = SoundParams::default();
    params.set(ParamId::LaunchMode, LaunchMode::Loop.index() as f32);
    params.set(ParamId::NoteMappingMode, mapping.index() as f32);
    params.set(ParamId::NumSlices, 8.0);
    params.set(ParamId::LoopStartPosition, 0.25);
    params.set(ParamId::LoopEndPosition, 0.75);
    params.set(ParamId::FilterCutoff, 3000.0);
    params.set(ParamId::FilterResonance, 0.4);
    params
}

pub fn bench_voices(c: &mut Criterion) {
    let mut group = c.benchmark_group("scenarios/voices");

    for &size in BLOCK_SIZES {
        let mut left = vec![0.0f32; size];
        let mut right = vec![0.0f32; size];

        for (name, mapping) in [
            ("pitched", NoteMappingMode::Pitch),
            ("sliced", NoteMappingMode::Slice),
        ] {
            for voices in [1usize, 8, 32] {
                let EngineComponents {
                    mut store,
                    mut sampler,
                    mut handle,
                } = EngineComponents::new(EngineConfig {
                    sample_rate: SR,
                    max_voices: voices,
                    ..EngineConfig::default()
                });
                if store.load_sound(source(), looping(mapping)).is_err() {
                    continue;
                }
                for note in 0..voices {
                    let _ = handle.note_on(40 + note as u8, 100);
                }
                // Wheel and pressure on, so the router does real work
                let _ = handle.control_change(1, 64);
                let _ = handle.channel_pressure(40);

                let id = format!("{name}_{voices}");
                group.bench_with_input(BenchmarkId::new(id, size), &size, |b, _| {
                    b.iter(|| sampler.render_block(black_box(&mut left), black_box(&mut right)))
                });
            }
        }
    }

    group.finish();
}
