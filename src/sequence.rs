//! Drive a stateful [`Cursor`] from a dedicated background thread while consuming its
//! values from another one.
//!
//! An [`AsyncSequence`] owns a cursor until the first [`advance`](AsyncSequence::advance),
//! at which point the cursor moves onto a producer thread and never comes back. From
//! then on the consumer only talks to it through channels, so a cursor that is not
//! thread-safe can still feed a consumer living elsewhere.
//!
//! ```
//! use handoff::sequence::{AsyncSequence, Replay};
//!
//! let mut seq = AsyncSequence::new(Replay::new(vec![1, 2, 3]));
//!
//! assert!(seq.advance().unwrap());
//! assert_eq!(seq.current(), Some(&1));
//! assert!(seq.advance().unwrap());
//! assert_eq!(seq.current(), Some(&2));
//!
//! seq.reset().unwrap();
//! let rest: Vec<i32> = seq.by_ref().collect::<Result<_, _>>().unwrap();
//! assert_eq!(rest, vec![1, 2, 3]);
//!
//! seq.dispose();
//! ```
//!
//! # Protocol
//!
//! The producer is demand-driven. Each advance sends a request and waits for a `peek`
//! answer: `Ok(true)` followed by the value on `data`, `Ok(false)` when the cursor is
//! exhausted, or the cursor's error. Between requests the producer waits on its three
//! request channels at once, with dispose taking priority over reset, and reset over
//! advance. Exhaustion does not end the producer, so a sequence can be reset and
//! walked again after it ran out.
//!
//! [`dispose`](AsyncSequence::dispose) only posts a request and returns; the producer
//! disposes the cursor on its own thread. Dropping an `AsyncSequence` disposes it.
//!
//! If the producer dies (the cursor panicked, or no thread could be started) the next
//! operation reports why, and every later one returns [`Error::Stopped`].

pub mod cursor;
mod producer;

use std::sync::Arc;

use tracing::debug;

pub use cursor::{Blocking, Cursor, Fallible, Once, Replay};

use self::producer::{Disposing, Link, Producer};
use crate::{
    call::run_async_on,
    channel::Channel,
    error::{Error, Result},
    runtimes::{thread::Threads, Runtime},
    select::Select,
};

pub struct AsyncSequence<C: Cursor> {
    link: Link<C::Item>,
    runtime: Arc<dyn Runtime>,
    pending: Option<C>,
    producer: Option<Channel<Result<()>>>,
    current: Option<C::Item>,
    stopped: bool,
    disposed: bool,
}

enum Reply<T> {
    Answer(T),
    Stopped(Result<()>),
}

fn wait_for<T>(answer: &Channel<T>, producer: &Channel<Result<()>>) -> Result<Reply<T>> {
    Ok(Select::new()
        .recv(answer, Reply::Answer)
        .recv(producer, Reply::Stopped)
        .wait()?
        .output)
}

impl<C: Cursor> AsyncSequence<C> {
    pub fn new(cursor: C) -> Self {
        Self::with_runtime(cursor, Arc::new(Threads::default()))
    }

    pub fn with_runtime(cursor: C, runtime: Arc<dyn Runtime>) -> Self {
        Self {
            link: Link::new(),
            runtime,
            pending: Some(cursor),
            producer: None,
            current: None,
            stopped: false,
            disposed: false,
        }
    }

    pub fn is_started(&self) -> bool {
        self.producer.is_some()
    }

    /// Moves to the next value. Returns `false` once the cursor is exhausted.
    /// The first call starts the producer thread.
    pub fn advance(&mut self) -> Result<bool> {
        self.check_usable()?;
        self.current = None;
        let producer = self.start()?;
        self.link.advance.send(());
        match wait_for(&self.link.peek, &producer)? {
            Reply::Answer(Ok(true)) => {
                self.current = Some(self.link.data.receive());
                Ok(true)
            }
            Reply::Answer(Ok(false)) => Ok(false),
            Reply::Answer(Err(err)) => Err(err),
            Reply::Stopped(outcome) => Err(self.stop(outcome)),
        }
    }

    /// The value produced by the last successful [`advance`](Self::advance).
    pub fn current(&self) -> Option<&C::Item> {
        self.current.as_ref()
    }

    /// Rewinds the cursor and waits until the producer confirms it. Starts the
    /// producer if it is not running yet.
    pub fn reset(&mut self) -> Result<()> {
        self.check_usable()?;
        self.current = None;
        let producer = self.start()?;
        self.link.reset.send(());
        match wait_for(&self.link.reset_ack, &producer)? {
            Reply::Answer(outcome) => outcome,
            Reply::Stopped(outcome) => Err(self.stop(outcome)),
        }
    }

    /// Asks the producer to dispose the cursor and stop. Does not wait for it.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        self.current = None;
        if let Some(cursor) = self.pending.take() {
            let cursor = Disposing::new(cursor);
            drop(run_async_on(self.runtime.as_ref(), move || drop(cursor)));
            debug!("disposing sequence that never started");
            return;
        }
        if !self.stopped {
            self.link.dispose.send(());
        }
    }

    fn check_usable(&self) -> Result<()> {
        if self.disposed {
            Err(Error::Disposed)
        } else if self.stopped {
            Err(Error::Stopped)
        } else {
            Ok(())
        }
    }

    fn start(&mut self) -> Result<Channel<Result<()>>> {
        if let Some(cursor) = self.pending.take() {
            let producer = Producer::new(cursor, self.link.clone());
            self.producer = Some(run_async_on(self.runtime.as_ref(), move || producer.run()));
            debug!(peek = %self.link.peek.id(), "started sequence producer");
        }
        self.producer.clone().ok_or(Error::Stopped)
    }

    fn stop(&mut self, outcome: Result<()>) -> Error {
        self.stopped = true;
        let err = outcome.err().unwrap_or(Error::Stopped);
        debug!(error = %err, "sequence producer stopped");
        err
    }
}

impl<C: Cursor> Iterator for AsyncSequence<C> {
    type Item = Result<C::Item>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.advance() {
            Ok(true) => self.current.take().map(Ok),
            Ok(false) => None,
            Err(err) => Some(Err(err)),
        }
    }
}

impl<C: Cursor> Drop for AsyncSequence<C> {
    fn drop(&mut self) {
        self.dispose();
    }
}
