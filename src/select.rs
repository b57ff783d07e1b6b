//! Dispatch to the first ready case out of a prioritized list of channel receives,
//! blocking only when none of them is ready.
//!
//! A [`Select`] is built case by case. [`recv`](Select::recv) adds a channel case whose
//! handler gets the received value. [`default`](Select::default) adds a case with no
//! channel, whose handler takes no arguments. All handlers return the same type `R`.
//!
//! ```
//! use handoff::{Channel, Select};
//!
//! let numbers: Channel<i64> = Channel::new();
//! let words: Channel<&str> = Channel::new();
//! words.send("ping");
//!
//! let selected = Select::new()
//!     .recv(&numbers, |n| format!("number {n}"))
//!     .recv(&words, |w| format!("word {w}"))
//!     .wait()
//!     .unwrap();
//!
//! assert_eq!(selected.channel, Some(words.id()));
//! assert_eq!(selected.output, "word ping");
//! ```
//!
//! # Order matters
//!
//! Cases are tried strictly in the order they were added. A default case fires the
//! moment the scan reaches it, even if a channel case further down the list is ready.
//! A default therefore does not mean "if nothing else is ready": put it last for that.
//!
//! ```
//! use handoff::{Channel, Select};
//!
//! let (idle, busy) = (Channel::<u8>::new(), Channel::<u8>::new());
//! busy.send(1);
//!
//! let selected = Select::new()
//!     .recv(&idle, |_| "idle")
//!     .default(|| "default")
//!     .recv(&busy, |_| "busy")
//!     .wait()
//!     .unwrap();
//!
//! assert_eq!(selected.channel, None);
//! assert_eq!(selected.output, "default");
//! assert!(busy.is_ready());
//! ```
//!
//! # Blocking
//!
//! If the scan finds nothing, the select parks until one of its channels receives a
//! value and then runs exactly one handler. When another receiver drains that channel
//! first, the select goes back to waiting on the whole set. There is no timeout.

use std::sync::Arc;

use tracing::trace;

use crate::{
    channel::{Channel, ChannelId},
    error::{Error, Result},
    signal::Waiter,
};

/// Which case fired and what its handler returned. `channel` is `None` for a default case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selected<R> {
    pub channel: Option<ChannelId>,
    pub output: R,
}

#[must_use = "a select does nothing until `wait` is called"]
pub struct Select<'a, R> {
    cases: Vec<Case<'a, R>>,
}

enum Case<'a, R> {
    Recv(Box<dyn Arm<'a, R> + 'a>),
    Default(Option<Box<dyn FnOnce() -> R + 'a>>),
}

trait Watch {
    fn id(&self) -> ChannelId;
    fn is_ready(&self) -> bool;
    fn watch(&self, waiter: &Arc<Waiter>);
    fn unwatch(&self, waiter: &Arc<Waiter>);
}

impl<T> Watch for Channel<T> {
    fn id(&self) -> ChannelId {
        Channel::id(self)
    }

    fn is_ready(&self) -> bool {
        Channel::is_ready(self)
    }

    fn watch(&self, waiter: &Arc<Waiter>) {
        Channel::watch(self, waiter)
    }

    fn unwatch(&self, waiter: &Arc<Waiter>) {
        Channel::unwatch(self, waiter)
    }
}

trait Arm<'a, R> {
    fn channel(&self) -> &'a dyn Watch;
    /// Takes the value if there is one and hands it to the handler.
    fn try_fire(&mut self) -> Option<R>;
}

struct RecvArm<'a, T, F> {
    chan: &'a Channel<T>,
    handler: Option<F>,
}

impl<'a, T, R, F> Arm<'a, R> for RecvArm<'a, T, F>
where
    F: FnOnce(T) -> R,
{
    fn channel(&self) -> &'a dyn Watch {
        self.chan
    }

    fn try_fire(&mut self) -> Option<R> {
        let value = self.chan.try_receive()?;
        self.handler.take().map(|handler| handler(value))
    }
}

/// Removes the waiter from every channel when the blocking phase ends, however it ends.
struct Registration<'w, 'a> {
    channels: &'w [&'a dyn Watch],
    waiter: Arc<Waiter>,
}

impl<'w, 'a> Registration<'w, 'a> {
    fn new(channels: &'w [&'a dyn Watch]) -> Self {
        let waiter = Arc::new(Waiter::new());
        for chan in channels {
            chan.watch(&waiter);
        }
        Self { channels, waiter }
    }

    /// Index of the first ready channel, parking until there is one.
    fn wait_any(&self) -> usize {
        loop {
            let seen = self.waiter.epoch();
            if let Some(index) = self.channels.iter().position(|c| c.is_ready()) {
                return index;
            }
            self.waiter.wait_past(seen);
        }
    }
}

impl Drop for Registration<'_, '_> {
    fn drop(&mut self) {
        for chan in self.channels {
            chan.unwatch(&self.waiter);
        }
    }
}

/// An empty select. Note that `Select::default(..)` resolves to the
/// [`default`](Select::default) case builder, not to this impl; call `Select::new()`
/// or `Default::default()` for an empty one.
impl<R> Default for Select<'_, R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a, R> Select<'a, R> {
    pub fn new() -> Self {
        Self { cases: Vec::new() }
    }

    /// Adds a case receiving from `chan`.
    pub fn recv<T: 'a>(mut self, chan: &'a Channel<T>, handler: impl FnOnce(T) -> R + 'a) -> Self {
        self.cases.push(Case::Recv(Box::new(RecvArm {
            chan,
            handler: Some(handler),
        })));
        self
    }

    /// Adds a case that fires as soon as the scan reaches it.
    pub fn default(mut self, handler: impl FnOnce() -> R + 'a) -> Self {
        self.cases.push(Case::Default(Some(Box::new(handler))));
        self
    }

    pub fn len(&self) -> usize {
        self.cases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }

    /// Runs exactly one case, blocking if needed. Fails only on an empty case list.
    pub fn wait(mut self) -> Result<Selected<R>> {
        if self.cases.is_empty() {
            return Err(Error::EmptySelect);
        }

        for case in &mut self.cases {
            match case {
                Case::Recv(arm) => {
                    if let Some(output) = arm.try_fire() {
                        let channel = arm.channel().id();
                        trace!(%channel, "select fired without blocking");
                        return Ok(Selected {
                            channel: Some(channel),
                            output,
                        });
                    }
                }
                Case::Default(handler) => {
                    if let Some(handler) = handler.take() {
                        trace!("select fired default case");
                        return Ok(Selected {
                            channel: None,
                            output: handler(),
                        });
                    }
                }
            }
        }

        let mut arms: Vec<&mut Box<dyn Arm<'a, R> + 'a>> = self
            .cases
            .iter_mut()
            .filter_map(|case| match case {
                Case::Recv(arm) => Some(arm),
                Case::Default(_) => None,
            })
            .collect();
        let channels: Vec<&'a dyn Watch> = arms.iter().map(|arm| arm.channel()).collect();
        let registration = Registration::new(&channels);

        loop {
            let index = registration.wait_any();
            if let Some(output) = arms[index].try_fire() {
                let channel = channels[index].id();
                trace!(%channel, "select fired after blocking");
                return Ok(Selected {
                    channel: Some(channel),
                    output,
                });
            }
            trace!(channel = %channels[index].id(), "select lost a race, waiting again");
        }
    }
}
