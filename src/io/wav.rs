//! WAV decoding into [`DecodedAudio`].
//!
//! File parsing is delegated to `hound`; this module only normalises sample
//! formats and de-interleaves channels. Channel layouts beyond stereo are
//! kept as-is, voices only ever read the first two.

use std::io::Read;
use std::path::Path;

use hound::{SampleFormat, WavReader};
use tracing::debug;

use crate::error::DecodeError;
use crate::io::DecodedAudio;

/// Decode a WAV file from disk.
pub fn read_wav<P: AsRef<Path>>(path: P) -> Result<DecodedAudio, DecodeError> {
    let path = path.as_ref();
    let reader = WavReader::open(path)?;
    debug!(path = %path.display(), "decoding wav file");
    decode(reader)
}

/// Decode WAV data from any reader, e.g. an in-memory `Cursor`.
pub fn read_wav_from<R: Read>(source: R) -> Result<DecodedAudio, DecodeError> {
    decode(WavReader::new(source)?)
}

fn decode<R: Read>(reader: WavReader<R>) -> Result<DecodedAudio, DecodeError> {
    let spec = reader.spec();
    let num_channels = spec.channels as usize;
    if num_channels == 0 {
        return Err(DecodeError::NoChannels);
    }
    let declared_frames = reader.duration() as usize;

    let interleaved: Vec<f32> = match (spec.sample_format, spec.bits_per_sample) {
        (SampleFormat::Float, 32) => reader
            .into_samples::<f32>()
            .collect::<Result<Vec<_>, _>>()?,
        (SampleFormat::Int, bits @ 8..=32) => {
            let max_val = (1i64 << (bits - 1)) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f32 / max_val))
                .collect::<Result<Vec<_>, _>>()?
        }
        (SampleFormat::Float, bits) => {
            return Err(DecodeError::UnsupportedFormat {
                bits,
                format: "float",
            })
        }
        (SampleFormat::Int, bits) => {
            return Err(DecodeError::UnsupportedFormat { bits, format: "pcm" })
        }
    };

    let frames = interleaved.len() / num_channels;
    let mut channels = vec![Vec::with_capacity(frames); num_channels];
    for frame in interleaved.chunks_exact(num_channels) {
        for (channel, &sample) in channels.iter_mut().zip(frame) {
            channel.push(sample);
        }
    }

    Ok(DecodedAudio {
        channels,
        sample_rate: spec.sample_rate as f32,
        declared_length: Some(declared_frames),
    })
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use hound::{WavSpec, WavWriter};

    use super::*;

    fn encode(spec: WavSpec, write: impl FnOnce(&mut WavWriter<&mut Cursor<Vec<u8>>>)) -> Vec<u8> {
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = WavWriter::new(&mut cursor, spec).unwrap();
            write(&mut writer);
            writer.finalize().unwrap();
        }
        cursor.into_inner()
    }

    #[test]
    fn decodes_stereo_pcm() {
        let spec = WavSpec {
            channels: 2,
            sample_rate: 44_100,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let bytes = encode(spec, |w| {
            for i in 0..100i16 {
                w.write_sample(i * 100).unwrap();
                w.write_sample(-i * 100).unwrap();
            }
        });

        let audio = read_wav_from(Cursor::new(bytes)).unwrap();
        assert_eq!(audio.channels.len(), 2);
        assert_eq!(audio.num_frames(), 100);
        assert_eq!(audio.sample_rate, 44_100.0);
        assert_eq!(audio.declared_length, Some(100));
        assert!((audio.channels[0][10] - 1000.0 / 32768.0).abs() < 1e-6);
        assert!((audio.channels[1][10] + 1000.0 / 32768.0).abs() < 1e-6);
    }

    #[test]
    fn decodes_float_mono() {
        let spec = WavSpec {
            channels: 1,
            sample_rate: 48_000,
            bits_per_sample: 32,
            sample_format: SampleFormat::Float,
        };
        let bytes = encode(spec, |w| {
            for s in [0.0f32, 0.5, -0.5, 1.0] {
                w.write_sample(s).unwrap();
            }
        });

        let audio = read_wav_from(Cursor::new(bytes)).unwrap();
        assert_eq!(audio.channels, vec![vec![0.0, 0.5, -0.5, 1.0]]);
    }

    #[test]
    fn garbage_is_a_decode_error() {
        let result = read_wav_from(Cursor::new(b"definitely not a wav".to_vec()));
        assert!(matches!(result, Err(DecodeError::Wav(_))));
    }
}
