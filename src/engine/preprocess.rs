//! Background rendering of alternate buffers.
//!
//! ```text
//!   control thread            worker thread                 audio thread
//!   --------------            -------------                 ------------
//!   submit(handle, req) --->  Job { id, req }
//!     (claims request id)     processor.process(source)
//!                             still loaded? newest id? ---> voices pick the
//!                             swap into Sound::processed     buffer up at their
//!                             retire the old buffer          next block
//! ```
//!
//! A request supersedes every earlier one for the same sound. Jobs are never
//! cancelled; stale results are dropped when they finish.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use tracing::{debug, info, warn};

use crate::engine::maintenance::TaskQueue;
use crate::io::DecodedAudio;
use crate::sound::params::SoundParams;
use crate::sound::store::BankReader;
use crate::sound::{SampleBuffer, SoundHandle};
use crate::{Result, SamplerError};

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// What to render: a pitch shift in semitones and a duration factor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StretchRequest {
    pub pitch_shift: f32,
    pub time_stretch: f32,
}

impl Default for StretchRequest {
    fn default() -> Self {
        Self {
            pitch_shift: 0.0,
            time_stretch: 1.0,
        }
    }
}

impl StretchRequest {
    /// Identity requests switch the sound back to its source buffer.
    pub fn is_identity(&self) -> bool {
        self.pitch_shift == 0.0 && self.time_stretch == 1.0
    }
}

/// Read from the sound's `pitchShift` and `timeStretch` parameters.
impl From<&SoundParams> for StretchRequest {
    fn from(params: &SoundParams) -> Self {
        Self {
            pitch_shift: params.pitch_shift,
            time_stretch: params.time_stretch,
        }
    }
}

/// The offline algorithm. Returns `None` if it could not render.
pub trait BufferProcessor: Send + 'static {
    fn process(&mut self, source: &SampleBuffer, request: &StretchRequest) -> Option<DecodedAudio>;
}

impl<F> BufferProcessor for F
where
    F: FnMut(&SampleBuffer, &StretchRequest) -> Option<DecodedAudio> + Send + 'static,
{
    fn process(&mut self, source: &SampleBuffer, request: &StretchRequest) -> Option<DecodedAudio> {
        (self)(source, request)
    }
}

enum Job {
    Render {
        handle: SoundHandle,
        id: u64,
        request: StretchRequest,
    },
    Shutdown,
}

pub struct PreprocessWorker {
    bank: BankReader,
    tx: Sender<Job>,
    thread: Option<JoinHandle<()>>,
}

impl PreprocessWorker {
    /// Start the worker thread. Buffers it replaces are kept alive for
    /// `retire_delay` before being dropped.
    pub fn spawn(
        bank: BankReader,
        processor: impl BufferProcessor,
        retire_delay: Duration,
    ) -> Result<Self> {
        let (tx, rx) = unbounded();
        let worker = Worker {
            bank: bank.clone(),
            rx,
            processor,
            retire_delay,
            maintenance: TaskQueue::new(),
        };

        let thread = thread::Builder::new()
            .name("sampler-preprocess".into())
            .spawn(move || worker.run())
            .map_err(SamplerError::Spawn)?;

        Ok(Self {
            bank,
            tx,
            thread: Some(thread),
        })
    }

    /// Queue a render for `handle`. Returns the request id; any earlier
    /// request for the same sound is now stale.
    pub fn submit(&self, handle: SoundHandle, request: StretchRequest) -> Result<u64> {
        let bank = self.bank.load();
        let sound = bank.get(handle).ok_or(SamplerError::SoundNotFound(handle))?;
        let id = sound.next_request();

        self.tx
            .send(Job::Render { handle, id, request })
            .map_err(|_| SamplerError::WorkerStopped)?;
        debug!(sound = ?handle, id, ?request, "preprocess request queued");
        Ok(id)
    }

    /// Queue a render from the sound's current `pitchShift` / `timeStretch`
    /// values. Call after editing either parameter.
    pub fn submit_current(&self, handle: SoundHandle) -> Result<u64> {
        let request = {
            let bank = self.bank.load();
            let sound = bank.get(handle).ok_or(SamplerError::SoundNotFound(handle))?;
            StretchRequest::from(&sound.snapshot().params)
        };
        self.submit(handle, request)
    }

    /// Finish queued jobs, drop retired buffers and join the thread.
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        let _ = self.tx.send(Job::Shutdown);
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                warn!("preprocess thread panicked");
            }
        }
    }
}

impl Drop for PreprocessWorker {
    fn drop(&mut self) {
        self.stop();
    }
}

struct Worker<P> {
    bank: BankReader,
    rx: Receiver<Job>,
    processor: P,
    retire_delay: Duration,
    maintenance: TaskQueue,
}

impl<P: BufferProcessor> Worker<P> {
    fn run(mut self) {
        loop {
            match self.rx.recv_timeout(POLL_INTERVAL) {
                Ok(Job::Render { handle, id, request }) => self.render(handle, id, request),
                Ok(Job::Shutdown) | Err(RecvTimeoutError::Disconnected) => break,
                Err(RecvTimeoutError::Timeout) => {}
            }
            self.maintenance.run_due(Instant::now());
        }
        self.maintenance.flush();
    }

    fn render(&mut self, handle: SoundHandle, id: u64, request: StretchRequest) {
        let Some(source) = self.bank.load().get(handle).map(|sound| Arc::clone(sound.source())) else {
            debug!(sound = ?handle, id, "sound removed before preprocessing started");
            return;
        };

        let next = if request.is_identity() {
            None
        } else {
            info!(sound = ?handle, id, ?request, "preprocessing started");
            let Some(decoded) = self.processor.process(&source, &request) else {
                warn!(sound = ?handle, id, "preprocessing produced no audio");
                return;
            };
            match SampleBuffer::new(decoded) {
                Ok(buffer) => Some(Arc::new(buffer)),
                Err(err) => {
                    warn!(sound = ?handle, id, %err, "preprocessed audio rejected");
                    return;
                }
            }
        };

        let bank = self.bank.load();
        let Some(sound) = bank.get(handle) else {
            debug!(sound = ?handle, id, "sound removed, discarding preprocessed buffer");
            return;
        };
        if !sound.is_latest_request(id) {
            debug!(sound = ?handle, id, "superseded, discarding preprocessed buffer");
            return;
        }

        let length = next.as_ref().map_or(source.len(), |buffer| buffer.len());
        if let Some(old) = sound.replace_processed(next) {
            self.maintenance.retire(self.retire_delay, "drop processed buffer", old);
        }
        info!(sound = ?handle, id, length, "preprocessed buffer published");
    }
}
