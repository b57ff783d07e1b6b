//! Fire-and-forget async calls. The computation runs on its own thread and its
//! outcome lands in a fresh [`Channel`] that the caller gets back immediately.
//!
//! The channel receives exactly one payload, always: the value, the error the
//! computation returned, an [`Error::Panicked`] if it panicked, or an
//! [`Error::Spawn`] if no thread could be started. A runtime that accepts the job and
//! then drops it unrun, as Tokio does while shutting down, yields [`Error::Abandoned`].
//! A receiver never waits on a computation that silently died.
//!
//! ```
//! use handoff::call_async;
//!
//! let answer = call_async(|| Ok(6 * 7));
//! assert_eq!(answer.receive().unwrap(), 42);
//! ```
//!
//! The channel is an ordinary single-slot channel, so it can take part in a
//! [`Select`](crate::select::Select). Once drained it stays empty: a second
//! `receive` blocks forever.

use std::{
    panic::{self, AssertUnwindSafe},
    sync::Arc,
};

use parking_lot::Mutex;
use tracing::warn;

use crate::{
    channel::Channel,
    error::{Error, Result},
    runtimes::{thread::Threads, Job, Runtime},
};

pub fn call_async<T, F>(f: F) -> Channel<Result<T>>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    call_async_on(&Threads::default(), f)
}

pub fn call_async_on<T, F>(runtime: &dyn Runtime, f: F) -> Channel<Result<T>>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    deliver_async(runtime, f, |outcome| outcome)
}

/// Spawns `f` on `runtime` and sends `into_payload(outcome)` to the returned channel
/// exactly once. The outcome is an error when `f` fails or panics, when the runtime
/// refuses the job, and when the runtime drops the job without running it.
pub(crate) fn deliver_async<T, P, F>(
    runtime: &dyn Runtime,
    f: F,
    into_payload: impl FnOnce(Result<T>) -> P + Send + 'static,
) -> Channel<P>
where
    T: Send + 'static,
    P: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    let completion = Channel::new();
    let tx = completion.clone();
    let delivery = Arc::new(Delivery::new(Box::new(move |outcome: Result<T>| {
        tx.send(into_payload(outcome))
    })));
    let ticket = Ticket(Arc::clone(&delivery));
    let job: Job = Box::new(move || ticket.finish(catch(f)));
    match runtime.spawn(job) {
        Ok(()) => delivery.spawned(),
        Err(err) => {
            warn!(error = %err, "async call could not start");
            delivery.finish(Err(err));
        }
    }
    completion
}

type Deliver<T> = Box<dyn FnOnce(Result<T>) + Send>;

enum Stage {
    Spawning,
    Spawned,
    /// The runtime dropped the job before `spawn` returned.
    Dropped,
}

struct Pending<T> {
    deliver: Option<Deliver<T>>,
    stage: Stage,
}

/// The single delivery of a job's outcome, shared between the spawning side and the
/// job's [`Ticket`].
struct Delivery<T>(Mutex<Pending<T>>);

impl<T> Delivery<T> {
    fn new(deliver: Deliver<T>) -> Self {
        Self(Mutex::new(Pending {
            deliver: Some(deliver),
            stage: Stage::Spawning,
        }))
    }

    fn finish(&self, outcome: Result<T>) {
        let deliver = self.0.lock().deliver.take();
        if let Some(deliver) = deliver {
            deliver(outcome);
        }
    }

    fn spawned(&self) {
        let mut pending = self.0.lock();
        if matches!(pending.stage, Stage::Dropped) {
            drop(pending);
            self.abandon();
        } else {
            pending.stage = Stage::Spawned;
        }
    }

    fn abandon(&self) {
        warn!("async call dropped by its runtime before running");
        self.finish(Err(Error::Abandoned));
    }
}

/// Travels inside the job. Dropping it unfinished means the runtime discarded the job.
struct Ticket<T>(Arc<Delivery<T>>);

impl<T> Ticket<T> {
    fn finish(self, outcome: Result<T>) {
        self.0.finish(outcome);
    }
}

impl<T> Drop for Ticket<T> {
    fn drop(&mut self) {
        let mut pending = self.0 .0.lock();
        if pending.deliver.is_none() {
            return;
        }
        if matches!(pending.stage, Stage::Spawned) {
            drop(pending);
            self.0.abandon();
        } else {
            pending.stage = Stage::Dropped;
        }
    }
}

/// Runs `f`, turning a panic into an [`Error::Panicked`].
pub(crate) fn catch<T>(f: impl FnOnce() -> Result<T>) -> Result<T> {
    panic::catch_unwind(AssertUnwindSafe(f)).unwrap_or_else(|payload| {
        let err = Error::from_panic(payload);
        warn!(error = %err, "async call panicked");
        Err(err)
    })
}

/// [`call_async`] for computations with nothing to return.
pub fn run_async<F>(f: F) -> Channel<Result<()>>
where
    F: FnOnce() + Send + 'static,
{
    run_async_on(&Threads::default(), f)
}

pub fn run_async_on<F>(runtime: &dyn Runtime, f: F) -> Channel<Result<()>>
where
    F: FnOnce() + Send + 'static,
{
    call_async_on(runtime, move || {
        f();
        Ok(())
    })
}
