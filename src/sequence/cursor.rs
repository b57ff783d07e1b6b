//! Pull-based value sources an [`AsyncSequence`](super::AsyncSequence) can drive.

use std::fmt;

use futures::{executor::BlockingStream, Stream};

use crate::error::{Error, Result};

/// A stateful cursor over a sequence of values: the external-iterator contract.
///
/// A cursor is moved onto the producer thread and only ever touched from there, so it
/// needs to be `Send` but not `Sync`.
pub trait Cursor: Send + 'static {
    type Item: Send + 'static;

    /// The next value, or `None` once the sequence is exhausted.
    fn next(&mut self) -> Result<Option<Self::Item>>;

    /// Rewinds to the first value.
    fn reset(&mut self) -> Result<()>;

    /// Releases whatever the cursor holds. Called exactly once, when the sequence is
    /// disposed.
    fn dispose(&mut self) {}
}

/// Replays a cloneable collection. Reset starts over from a fresh clone.
#[derive(Debug)]
pub struct Replay<S: IntoIterator> {
    seed: S,
    iter: S::IntoIter,
}

impl<S> Replay<S>
where
    S: IntoIterator + Clone,
{
    pub fn new(seed: S) -> Self {
        let iter = seed.clone().into_iter();
        Self { seed, iter }
    }
}

impl<S> Cursor for Replay<S>
where
    S: IntoIterator + Clone + Send + 'static,
    S::IntoIter: Send + 'static,
    S::Item: Send + 'static,
{
    type Item = S::Item;

    fn next(&mut self) -> Result<Option<S::Item>> {
        Ok(self.iter.next())
    }

    fn reset(&mut self) -> Result<()> {
        self.iter = self.seed.clone().into_iter();
        Ok(())
    }
}

/// A single pass over any iterator. Cannot be reset.
#[derive(Debug)]
pub struct Once<I> {
    iter: std::iter::Fuse<I>,
}

impl<I: Iterator> Once<I> {
    pub fn new(iter: impl IntoIterator<IntoIter = I>) -> Self {
        Self {
            iter: iter.into_iter().fuse(),
        }
    }
}

impl<I> Cursor for Once<I>
where
    I: Iterator + Send + 'static,
    I::Item: Send + 'static,
{
    type Item = I::Item;

    fn next(&mut self) -> Result<Option<I::Item>> {
        Ok(self.iter.next())
    }

    fn reset(&mut self) -> Result<()> {
        Err(Error::ResetUnsupported)
    }
}

/// A single pass over an iterator of results; an `Err` item becomes an
/// [`Error::Source`] reported to whoever advanced the sequence.
#[derive(Debug)]
pub struct Fallible<I> {
    iter: I,
}

impl<I> Fallible<I> {
    pub fn new(iter: I) -> Self {
        Self { iter }
    }
}

impl<I, T, E> Cursor for Fallible<I>
where
    I: Iterator<Item = std::result::Result<T, E>> + Send + 'static,
    T: Send + 'static,
    E: fmt::Display,
{
    type Item = T;

    fn next(&mut self) -> Result<Option<T>> {
        self.iter.next().transpose().map_err(Error::from_display)
    }

    fn reset(&mut self) -> Result<()> {
        Err(Error::ResetUnsupported)
    }
}

/// Drains an async [`Stream`] by blocking the producer thread on each item.
pub struct Blocking<S: Stream + Unpin> {
    inner: BlockingStream<S>,
}

impl<S: Stream + Unpin> Blocking<S> {
    pub fn new(stream: S) -> Self {
        Self {
            inner: futures::executor::block_on_stream(stream),
        }
    }
}

impl<S> Cursor for Blocking<S>
where
    S: Stream + Unpin + Send + 'static,
    S::Item: Send + 'static,
{
    type Item = S::Item;

    fn next(&mut self) -> Result<Option<S::Item>> {
        Ok(self.inner.next())
    }

    fn reset(&mut self) -> Result<()> {
        Err(Error::ResetUnsupported)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain<C: Cursor>(cursor: &mut C) -> Vec<C::Item> {
        let mut items = Vec::new();
        while let Some(item) = cursor.next().unwrap() {
            items.push(item);
        }
        items
    }

    #[test]
    fn replay_rewinds() {
        let mut cursor = Replay::new(vec![1, 2, 3]);
        assert_eq!(cursor.next().unwrap(), Some(1));
        cursor.reset().unwrap();
        assert_eq!(drain(&mut cursor), vec![1, 2, 3]);
        assert_eq!(cursor.next().unwrap(), None);
    }

    #[test]
    fn once_refuses_reset() {
        let mut cursor = Once::new(0..2);
        assert_eq!(drain(&mut cursor), vec![0, 1]);
        assert!(matches!(cursor.reset(), Err(Error::ResetUnsupported)));
    }

    #[test]
    fn fallible_maps_errors() {
        let mut cursor = Fallible::new(vec![Ok(1), Err("bad row")].into_iter());
        assert_eq!(cursor.next().unwrap(), Some(1));
        assert!(matches!(cursor.next(), Err(Error::Source(m)) if m == "bad row"));
    }

    #[test]
    fn blocking_drains_streams() {
        let mut cursor = Blocking::new(futures::stream::iter(vec!['a', 'b']));
        assert_eq!(drain(&mut cursor), vec!['a', 'b']);
    }
}
