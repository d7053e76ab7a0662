use crate::{io::midi::MidiEvent, synth::message::SamplerMessage};

/// Channel filter value that accepts every channel.
pub const OMNI: u8 = 0;

/// Translate a parsed MIDI event into a sampler message.
///
/// `channel_filter` is `OMNI` or a one-based channel number (1..=16). Events on
/// other channels, and program changes, yield `None`.
pub fn midi_to_message(midi: MidiEvent, channel_filter: u8) -> Option<SamplerMessage> {
    if channel_filter != OMNI && midi.channel() + 1 != channel_filter {
        return None;
    }

    match midi {
        MidiEvent::NoteOn { key, velocity, .. } => Some(SamplerMessage::NoteOn {
            note: key,
            velocity,
        }),
        MidiEvent::NoteOff { key, velocity, .. } => Some(SamplerMessage::NoteOff {
            note: key,
            velocity,
        }),
        MidiEvent::ControlChange {
            controller, value, ..
        } => Some(SamplerMessage::ControlChange { controller, value }),
        MidiEvent::PitchBend { value, .. } => Some(SamplerMessage::PitchBend { value }),
        MidiEvent::Aftertouch { key, pressure, .. } => Some(SamplerMessage::Aftertouch {
            note: key,
            pressure,
        }),
        MidiEvent::ChannelPressure { pressure, .. } => {
            Some(SamplerMessage::ChannelPressure { pressure })
        }
        _ => None,
    }
}
