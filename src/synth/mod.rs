// Purpose: voice management, polyphony, event intake
// Everything here except `message::SamplerHandle` lives on the audio thread.

pub mod mapper;
pub mod message;
pub mod modulation;
pub mod region;
pub mod sampler;
pub mod voice;
