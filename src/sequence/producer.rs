use std::ops::{Deref, DerefMut};

use tracing::{debug, instrument, trace};

use super::cursor::Cursor;
use crate::{
    channel::Channel,
    error::{Error, Result},
    select::Select,
};

/// The channels connecting a sequence to its producer thread. Requests flow to the
/// producer on `advance`, `reset` and `dispose`; answers flow back on `peek` + `data`
/// and `reset_ack`.
pub(super) struct Link<T> {
    pub(super) advance: Channel<()>,
    pub(super) peek: Channel<Result<bool>>,
    pub(super) data: Channel<T>,
    pub(super) reset: Channel<()>,
    pub(super) reset_ack: Channel<Result<()>>,
    pub(super) dispose: Channel<()>,
}

impl<T> Link<T> {
    pub(super) fn new() -> Self {
        Self {
            advance: Channel::new(),
            peek: Channel::new(),
            data: Channel::new(),
            reset: Channel::new(),
            reset_ack: Channel::new(),
            dispose: Channel::new(),
        }
    }
}

impl<T> Clone for Link<T> {
    fn clone(&self) -> Self {
        Self {
            advance: self.advance.clone(),
            peek: self.peek.clone(),
            data: self.data.clone(),
            reset: self.reset.clone(),
            reset_ack: self.reset_ack.clone(),
            dispose: self.dispose.clone(),
        }
    }
}

#[derive(Debug)]
pub(super) enum State {
    /// Pulling one value out of the cursor.
    Producing,
    /// Idle until the consumer asks for something.
    AwaitingControl,
    /// The cursor failed; the error is owed to the consumer.
    Failed(Error),
    Done,
}

enum Control {
    Advance,
    Reset,
    Dispose,
}

/// Disposes the cursor when dropped, whether the owner returns or unwinds.
pub(super) struct Disposing<C: Cursor>(C);

impl<C: Cursor> Disposing<C> {
    pub(super) fn new(cursor: C) -> Self {
        Self(cursor)
    }
}

impl<C: Cursor> Deref for Disposing<C> {
    type Target = C;

    fn deref(&self) -> &C {
        &self.0
    }
}

impl<C: Cursor> DerefMut for Disposing<C> {
    fn deref_mut(&mut self) -> &mut C {
        &mut self.0
    }
}

impl<C: Cursor> Drop for Disposing<C> {
    fn drop(&mut self) {
        self.0.dispose();
        debug!("cursor disposed");
    }
}

pub(super) struct Producer<C: Cursor> {
    cursor: Disposing<C>,
    link: Link<C::Item>,
}

impl<C: Cursor> Producer<C> {
    pub(super) fn new(cursor: C, link: Link<C::Item>) -> Self {
        Self {
            cursor: Disposing::new(cursor),
            link,
        }
    }

    #[instrument(name = "async_seq", skip_all, fields(peek = %self.link.peek.id()))]
    pub(super) fn run(mut self) {
        let mut state = State::AwaitingControl;
        loop {
            state = match state {
                State::Producing => self.produce(),
                State::AwaitingControl => self.await_control(),
                State::Failed(err) => {
                    debug!(error = %err, "cursor failed");
                    self.link.peek.send(Err(err));
                    State::AwaitingControl
                }
                State::Done => break,
            };
            trace!(?state, "producer transition");
        }
    }

    fn produce(&mut self) -> State {
        match self.cursor.next() {
            Ok(Some(item)) => {
                self.link.peek.send(Ok(true));
                self.link.data.send(item);
                State::AwaitingControl
            }
            Ok(None) => {
                self.link.peek.send(Ok(false));
                State::AwaitingControl
            }
            Err(err) => State::Failed(err),
        }
    }

    fn await_control(&mut self) -> State {
        let control = Select::new()
            .recv(&self.link.dispose, |()| Control::Dispose)
            .recv(&self.link.reset, |()| Control::Reset)
            .recv(&self.link.advance, |()| Control::Advance)
            .wait();

        match control.map(|selected| selected.output) {
            Ok(Control::Advance) => State::Producing,
            Ok(Control::Reset) => {
                let outcome = self.cursor.reset();
                if let Err(err) = &outcome {
                    debug!(error = %err, "cursor reset failed");
                }
                self.link.reset_ack.send(outcome);
                State::AwaitingControl
            }
            Ok(Control::Dispose) | Err(_) => State::Done,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sequence::cursor::Replay;
    use std::{
        sync::{
            atomic::{AtomicUsize, Ordering},
            Arc,
        },
        thread,
    };

    struct Counted {
        inner: Replay<Vec<u8>>,
        disposed: Arc<AtomicUsize>,
    }

    impl Cursor for Counted {
        type Item = u8;

        fn next(&mut self) -> Result<Option<u8>> {
            self.inner.next()
        }

        fn reset(&mut self) -> Result<()> {
            self.inner.reset()
        }

        fn dispose(&mut self) {
            self.disposed.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn speaks_the_protocol() {
        let disposed = Arc::new(AtomicUsize::new(0));
        let link = Link::new();
        let producer = Producer::new(
            Counted {
                inner: Replay::new(vec![4]),
                disposed: Arc::clone(&disposed),
            },
            link.clone(),
        );
        let worker = thread::spawn(move || producer.run());

        link.advance.send(());
        assert!(link.peek.receive().unwrap());
        assert_eq!(link.data.receive(), 4);

        link.advance.send(());
        assert!(!link.peek.receive().unwrap());

        link.reset.send(());
        assert!(link.reset_ack.receive().is_ok());

        link.advance.send(());
        assert!(link.peek.receive().unwrap());
        assert_eq!(link.data.receive(), 4);

        link.dispose.send(());
        worker.join().unwrap();
        assert_eq!(disposed.load(Ordering::SeqCst), 1);
    }
}
