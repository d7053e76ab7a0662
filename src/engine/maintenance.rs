//! Deferred work for the non-realtime side.
//!
//! Anything the audio thread might still be looking at (a removed sound, a
//! replaced parameter snapshot, an old bank) is parked here instead of being
//! dropped on the spot. A maintenance loop on a control thread calls
//! [`TaskQueue::run_due`] periodically; by the time a task is due, the audio
//! thread has long moved past any block that could have referenced it.

use std::collections::VecDeque;
use std::fmt;
use std::time::{Duration, Instant};

use tracing::trace;

type Task = Box<dyn FnOnce() + Send>;

struct Scheduled {
    due: Instant,
    label: &'static str,
    task: Task,
}

#[derive(Default)]
pub struct TaskQueue {
    // Kept sorted by `due`; tasks are pushed with monotonically increasing
    // deadlines in practice, so insertion is almost always at the back.
    tasks: VecDeque<Scheduled>,
}

impl TaskQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, due: Instant, label: &'static str, task: impl FnOnce() + Send + 'static) {
        let at = self
            .tasks
            .iter()
            .rposition(|scheduled| scheduled.due <= due)
            .map_or(0, |i| i + 1);
        self.tasks.insert(
            at,
            Scheduled {
                due,
                label,
                task: Box::new(task),
            },
        );
    }

    /// Keep `value` alive until `delay` has passed, then drop it.
    pub fn retire<T: Send + 'static>(&mut self, delay: Duration, label: &'static str, value: T) {
        self.schedule(Instant::now() + delay, label, move || drop(value));
    }

    /// Run every task whose deadline is at or before `now`. Returns how many ran.
    pub fn run_due(&mut self, now: Instant) -> usize {
        let mut ran = 0;
        while self.tasks.front().is_some_and(|scheduled| scheduled.due <= now) {
            if let Some(scheduled) = self.tasks.pop_front() {
                trace!(task = scheduled.label, "running maintenance task");
                (scheduled.task)();
                ran += 1;
            }
        }
        ran
    }

    /// Run everything regardless of deadline.
    pub fn flush(&mut self) -> usize {
        let ran = self.tasks.len();
        for scheduled in self.tasks.drain(..) {
            (scheduled.task)();
        }
        ran
    }

    pub fn next_due(&self) -> Option<Instant> {
        self.tasks.front().map(|scheduled| scheduled.due)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

impl fmt::Debug for TaskQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskQueue")
            .field("pending", &self.tasks.len())
            .field("next_due", &self.next_due())
            .finish()
    }
}
