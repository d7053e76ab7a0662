// Purpose - external interfaces, format conversions

pub mod converter;
pub mod midi;
pub mod wav;

/// Audio handed over by whatever decoded the source file.
///
/// One `Vec` per channel, all the same length. `declared_length` is the frame
/// count the file header promised, if known; some decoders stop early on
/// truncated files and callers may want to notice.
#[derive(Debug, Clone, Default)]
pub struct DecodedAudio {
    pub channels: Vec<Vec<f32>>,
    pub sample_rate: f32,
    pub declared_length: Option<usize>,
}

impl DecodedAudio {
    pub fn mono(samples: Vec<f32>, sample_rate: f32) -> Self {
        Self {
            declared_length: Some(samples.len()),
            channels: vec![samples],
            sample_rate,
        }
    }

    pub fn stereo(left: Vec<f32>, right: Vec<f32>, sample_rate: f32) -> Self {
        Self {
            declared_length: Some(left.len()),
            channels: vec![left, right],
            sample_rate,
        }
    }

    pub fn num_frames(&self) -> usize {
        self.channels.first().map_or(0, Vec::len)
    }
}
