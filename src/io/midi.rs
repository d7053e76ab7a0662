/// Channel-voice MIDI messages the sampler reacts to.
///
/// Channels are zero-based on the wire and in this enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MidiEvent {
    NoteOn { channel: u8, key: u8, velocity: u8 },
    NoteOff { channel: u8, key: u8, velocity: u8 },
    Aftertouch { channel: u8, key: u8, pressure: u8 },
    ControlChange { channel: u8, controller: u8, value: u8 },
    ProgramChange { channel: u8, program: u8 },
    ChannelPressure { channel: u8, pressure: u8 },
    /// 14-bit value, 8192 is centre.
    PitchBend { channel: u8, value: u16 },
}

impl MidiEvent {
    /// Parse one complete channel-voice message.
    ///
    /// Running status, system messages and truncated input return `None`.
    /// A note-on with velocity zero is reported as a note-off.
    pub fn from_bytes(bytes: &[u8]) -> Option<MidiEvent> {
        let (&status, data) = bytes.split_first()?;
        let channel = status & 0x0F;
        let data1 = || data.first().map(|b| b & 0x7F);
        let data2 = || data.get(1).map(|b| b & 0x7F);

        let event = match status & 0xF0 {
            0x80 => MidiEvent::NoteOff {
                channel,
                key: data1()?,
                velocity: data2()?,
            },
            0x90 => match (data1()?, data2()?) {
                (key, 0) => MidiEvent::NoteOff {
                    channel,
                    key,
                    velocity: 0,
                },
                (key, velocity) => MidiEvent::NoteOn {
                    channel,
                    key,
                    velocity,
                },
            },
            0xA0 => MidiEvent::Aftertouch {
                channel,
                key: data1()?,
                pressure: data2()?,
            },
            0xB0 => MidiEvent::ControlChange {
                channel,
                controller: data1()?,
                value: data2()?,
            },
            0xC0 => MidiEvent::ProgramChange {
                channel,
                program: data1()?,
            },
            0xD0 => MidiEvent::ChannelPressure {
                channel,
                pressure: data1()?,
            },
            0xE0 => MidiEvent::PitchBend {
                channel,
                value: u16::from(data1()?) | (u16::from(data2()?) << 7),
            },
            _ => return None,
        };
        Some(event)
    }

    pub fn channel(&self) -> u8 {
        match *self {
            MidiEvent::NoteOn { channel, .. }
            | MidiEvent::NoteOff { channel, .. }
            | MidiEvent::Aftertouch { channel, .. }
            | MidiEvent::ControlChange { channel, .. }
            | MidiEvent::ProgramChange { channel, .. }
            | MidiEvent::ChannelPressure { channel, .. }
            | MidiEvent::PitchBend { channel, .. } => channel,
        }
    }
}
