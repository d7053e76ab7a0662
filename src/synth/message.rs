use rtrb::{Consumer, Producer, RingBuffer};
use tracing::debug;

use crate::dsp::reverb::ReverbParams;
use crate::error::{Result, SamplerError};
use crate::sound::SoundHandle;

/// Events delivered to the audio thread, applied in arrival order before the
/// block they affect.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum SamplerMessage {
    NoteOn { note: u8, velocity: u8 },
    NoteOff { note: u8, velocity: u8 },
    ControlChange { controller: u8, value: u8 },
    /// 14-bit, 8192 is centre.
    PitchBend { value: u16 },
    Aftertouch { note: u8, pressure: u8 },
    ChannelPressure { pressure: u8 },
    /// Release every voice with its normal tail.
    AllNotesOff,
    /// Silence every voice immediately.
    AllSoundOff,
    StopSound { handle: SoundHandle },
    SetReverb(ReverbParams),
}

/// Producer side of the event queue, one intake function per event kind.
///
/// Lives on whichever thread owns the transport (MIDI input, network, UI).
/// The matching [`Consumer`] goes to [`Sampler::new`](super::sampler::Sampler::new).
pub struct SamplerHandle {
    tx: Producer<SamplerMessage>,
}

impl SamplerHandle {
    pub fn new(capacity: usize) -> (Self, Consumer<SamplerMessage>) {
        let (tx, rx) = RingBuffer::new(capacity);
        (Self { tx }, rx)
    }

    pub fn send(&mut self, message: SamplerMessage) -> Result<()> {
        self.tx
            .push(message)
            .map_err(|rtrb::PushError::Full(message)| SamplerError::QueueFull(message))
    }

    /// Notes above 127 are dropped; velocities saturate.
    pub fn note_on(&mut self, note: u8, velocity: u8) -> Result<()> {
        if !in_range("note", note) {
            return Ok(());
        }
        self.send(SamplerMessage::NoteOn {
            note,
            velocity: velocity.min(127),
        })
    }

    pub fn note_off(&mut self, note: u8, velocity: u8) -> Result<()> {
        if !in_range("note", note) {
            return Ok(());
        }
        self.send(SamplerMessage::NoteOff {
            note,
            velocity: velocity.min(127),
        })
    }

    pub fn control_change(&mut self, controller: u8, value: u8) -> Result<()> {
        if !in_range("controller", controller) {
            return Ok(());
        }
        self.send(SamplerMessage::ControlChange {
            controller,
            value: value.min(127),
        })
    }

    pub fn pitch_bend(&mut self, value: u16) -> Result<()> {
        self.send(SamplerMessage::PitchBend {
            value: value.min(16_383),
        })
    }

    pub fn aftertouch(&mut self, note: u8, pressure: u8) -> Result<()> {
        if !in_range("note", note) {
            return Ok(());
        }
        self.send(SamplerMessage::Aftertouch {
            note,
            pressure: pressure.min(127),
        })
    }

    pub fn channel_pressure(&mut self, pressure: u8) -> Result<()> {
        self.send(SamplerMessage::ChannelPressure {
            pressure: pressure.min(127),
        })
    }

    pub fn all_notes_off(&mut self) -> Result<()> {
        self.send(SamplerMessage::AllNotesOff)
    }

    pub fn all_sound_off(&mut self) -> Result<()> {
        self.send(SamplerMessage::AllSoundOff)
    }

    pub fn stop_sound(&mut self, handle: SoundHandle) -> Result<()> {
        self.send(SamplerMessage::StopSound { handle })
    }

    pub fn set_reverb(&mut self, params: ReverbParams) -> Result<()> {
        self.send(SamplerMessage::SetReverb(params))
    }

    /// Free slots left in the queue.
    pub fn slots(&self) -> usize {
        self.tx.slots()
    }
}

fn in_range(what: &'static str, value: u8) -> bool {
    if value > 127 {
        debug!(what, value, "out-of-range MIDI number dropped");
        return false;
    }
    true
}
