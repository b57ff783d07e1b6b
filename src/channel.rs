//! A single-slot, thread-safe mailbox. One value fits at a time: [`send`](Channel::send)
//! blocks while the slot is occupied and [`receive`](Channel::receive) blocks while it is
//! empty, so every payload is handed over exactly once and never overwritten.
//!
//! [`Channel`] is a handle. Cloning it is cheap and all clones address the same slot,
//! which is how a value crosses from one thread to another:
//!
//! ```
//! use handoff::Channel;
//! use std::thread;
//!
//! let chan = Channel::new();
//! let tx = chan.clone();
//! thread::spawn(move || tx.send("hello"));
//! assert_eq!(chan.receive(), "hello");
//! assert!(chan.try_receive().is_none());
//! ```
//!
//! # Readiness
//!
//! Whether the slot is occupied is observable without consuming it, through
//! [`is_ready`](Channel::is_ready) or the [`Readiness`] signal. The signal is
//! level-triggered: it reflects current occupancy rather than counting sends, so a
//! waiter that arrives late still sees a value that is sitting in the slot.
//!
//! # Blocking and `.await`
//!
//! Both blocking operations park the calling OS thread with no timeout. Code living on
//! an async executor can use [`recv_async`](Channel::recv_async) instead, which returns a
//! future resolving once a value has been taken.

use std::{
    fmt,
    future::Future,
    mem,
    pin::Pin,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    task::{Context, Poll, Waker},
};

use parking_lot::{Condvar, Mutex};

use crate::signal::Waiter;

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of a channel, shared by all of its clones. [`Select`](crate::select::Select)
/// reports which case fired by returning the id of its channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChannelId(u64);

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "chan#{}", self.0)
    }
}

pub struct Channel<T> {
    shared: Arc<Shared<T>>,
}

struct Shared<T> {
    id: ChannelId,
    slot: Mutex<Slot<T>>,
    not_empty: Condvar,
    not_full: Condvar,
}

struct Slot<T> {
    datum: Option<T>,
    waiters: Vec<Arc<Waiter>>,
    /// Pending [`Recv`] futures, keyed so each future owns at most one entry.
    wakers: Vec<(u64, Waker)>,
    next_waker: u64,
}

impl<T> Slot<T> {
    fn forget_waker(&mut self, key: u64) {
        self.wakers.retain(|(k, _)| *k != key);
    }
}

/// The "data available" signal of a channel. Obtained from [`Channel::ready`].
pub struct Readiness<'a, T> {
    chan: &'a Channel<T>,
}

/// Future returned by [`Channel::recv_async`].
#[must_use = "futures do nothing unless polled"]
pub struct Recv<'a, T> {
    chan: &'a Channel<T>,
    key: Option<u64>,
}

impl<T> Channel<T> {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                id: ChannelId(NEXT_ID.fetch_add(1, Ordering::Relaxed)),
                slot: Mutex::new(Slot {
                    datum: None,
                    waiters: Vec::new(),
                    wakers: Vec::new(),
                    next_waker: 0,
                }),
                not_empty: Condvar::new(),
                not_full: Condvar::new(),
            }),
        }
    }

    pub fn id(&self) -> ChannelId {
        self.shared.id
    }

    /// Stores `value` in the slot, first waiting for any previous value to be taken.
    pub fn send(&self, value: T) {
        let mut slot = self.shared.slot.lock();
        while slot.datum.is_some() {
            self.shared.not_full.wait(&mut slot);
        }
        slot.datum = Some(value);
        for waiter in &slot.waiters {
            waiter.notify();
        }
        let wakers = mem::take(&mut slot.wakers);
        drop(slot);

        self.shared.not_empty.notify_all();
        for (_, waker) in wakers {
            waker.wake();
        }
    }

    /// Takes the value out of the slot, waiting for one to arrive if it is empty.
    pub fn receive(&self) -> T {
        let mut slot = self.shared.slot.lock();
        loop {
            if let Some(value) = slot.datum.take() {
                drop(slot);
                self.shared.not_full.notify_one();
                return value;
            }
            self.shared.not_empty.wait(&mut slot);
        }
    }

    /// Takes the value out of the slot if there is one. Never blocks.
    pub fn try_receive(&self) -> Option<T> {
        let value = self.shared.slot.lock().datum.take();
        if value.is_some() {
            self.shared.not_full.notify_one();
        }
        value
    }

    pub fn is_ready(&self) -> bool {
        self.shared.slot.lock().datum.is_some()
    }

    pub fn ready(&self) -> Readiness<'_, T> {
        Readiness { chan: self }
    }

    /// Like [`receive`](Self::receive), but suspends the calling task instead of
    /// parking the thread.
    pub fn recv_async(&self) -> Recv<'_, T> {
        Recv {
            chan: self,
            key: None,
        }
    }

    pub(crate) fn watch(&self, waiter: &Arc<Waiter>) {
        self.shared.slot.lock().waiters.push(Arc::clone(waiter));
    }

    pub(crate) fn unwatch(&self, waiter: &Arc<Waiter>) {
        self.shared
            .slot
            .lock()
            .waiters
            .retain(|w| !Arc::ptr_eq(w, waiter));
    }

    #[cfg(test)]
    pub(crate) fn watcher_count(&self) -> usize {
        self.shared.slot.lock().waiters.len()
    }

    #[cfg(test)]
    fn waker_count(&self) -> usize {
        self.shared.slot.lock().wakers.len()
    }
}

impl<T> Readiness<'_, T> {
    pub fn is_set(&self) -> bool {
        self.chan.is_ready()
    }

    /// Blocks until the slot holds a value, without taking it. By the time this
    /// returns another receiver may already have drained the slot again.
    pub fn wait(&self) {
        let shared = &self.chan.shared;
        let mut slot = shared.slot.lock();
        while slot.datum.is_none() {
            shared.not_empty.wait(&mut slot);
        }
    }
}

impl<T> Future for Recv<'_, T> {
    type Output = T;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<T> {
        let this = self.get_mut();
        let shared = &this.chan.shared;
        let mut slot = shared.slot.lock();
        if let Some(value) = slot.datum.take() {
            if let Some(key) = this.key.take() {
                slot.forget_waker(key);
            }
            drop(slot);
            shared.not_full.notify_one();
            return Poll::Ready(value);
        }

        // A send drains the whole list, so a registered key may be gone.
        let key = match this.key {
            Some(key) => key,
            None => {
                let key = slot.next_waker;
                slot.next_waker += 1;
                this.key = Some(key);
                key
            }
        };
        match slot.wakers.iter_mut().find(|(k, _)| *k == key) {
            Some((_, waker)) => {
                if !waker.will_wake(cx.waker()) {
                    *waker = cx.waker().clone();
                }
            }
            None => slot.wakers.push((key, cx.waker().clone())),
        }
        Poll::Pending
    }
}

impl<T> Drop for Recv<'_, T> {
    fn drop(&mut self) {
        if let Some(key) = self.key {
            self.chan.shared.slot.lock().forget_waker(key);
        }
    }
}

impl<T> Clone for Channel<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T> Default for Channel<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> PartialEq for Channel<T> {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl<T> Eq for Channel<T> {}

impl<T> fmt::Debug for Channel<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Channel")
            .field("id", &self.id())
            .field("ready", &self.is_ready())
            .finish()
    }
}
