pub mod maintenance;
pub mod preprocess;

use crate::config::EngineConfig;
use crate::sound::store::SoundStore;
use crate::synth::message::SamplerHandle;
use crate::synth::sampler::Sampler;

/// The three halves of a running engine, wired to each other.
///
/// `store` and `handle` stay on the control side; `sampler` moves into the
/// audio callback.
pub struct EngineComponents {
    pub store: SoundStore,
    pub sampler: Sampler,
    pub handle: SamplerHandle,
}

impl EngineComponents {
    pub fn new(config: EngineConfig) -> Self {
        let config = config.sanitized();
        let store = SoundStore::new(config.clone());
        let (handle, rx) = SamplerHandle::new(config.message_queue_capacity);
        let sampler = Sampler::new(config, store.reader(), rx);
        Self {
            store,
            sampler,
            handle,
        }
    }
}
