//! The parking primitive behind [`Select`](crate::select::Select)'s blocking phase.
//!
//! A [`Waiter`] is registered with every channel a select is waiting on. Each
//! successful send on any of those channels bumps the waiter's epoch and wakes it.
//! The select reads the epoch *before* scanning its channels and parks only while
//! the epoch is unchanged, so a send racing with the scan is never missed.

use parking_lot::{Condvar, Mutex};

#[derive(Debug, Default)]
pub(crate) struct Waiter {
    epoch: Mutex<u64>,
    bumped: Condvar,
}

impl Waiter {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn epoch(&self) -> u64 {
        *self.epoch.lock()
    }

    pub(crate) fn notify(&self) {
        let mut epoch = self.epoch.lock();
        *epoch = epoch.wrapping_add(1);
        self.bumped.notify_all();
    }

    /// Parks until the epoch moves past `seen`. Returns immediately if it already has.
    pub(crate) fn wait_past(&self, seen: u64) {
        let mut epoch = self.epoch.lock();
        while *epoch == seen {
            self.bumped.wait(&mut epoch);
        }
    }
}
