use handoff::{
    sequence::{AsyncSequence, Blocking, Cursor, Fallible, Once, Replay},
    Channel, Error, Result,
};
use pretty_assertions::assert_eq;
use std::{
    thread,
    time::{Duration, Instant},
};

/// Replays its items and reports disposal on a channel, after a deliberate delay.
struct Tracked {
    inner: Replay<Vec<i32>>,
    disposed: Channel<()>,
    dispose_delay: Duration,
}

impl Tracked {
    fn new(items: Vec<i32>) -> (Self, Channel<()>) {
        let disposed = Channel::new();
        let cursor = Self {
            inner: Replay::new(items),
            disposed: disposed.clone(),
            dispose_delay: Duration::ZERO,
        };
        (cursor, disposed)
    }
}

impl Cursor for Tracked {
    type Item = i32;

    fn next(&mut self) -> Result<Option<i32>> {
        self.inner.next()
    }

    fn reset(&mut self) -> Result<()> {
        self.inner.reset()
    }

    fn dispose(&mut self) {
        thread::sleep(self.dispose_delay);
        self.disposed.send(());
    }
}

struct Exploding;

impl Cursor for Exploding {
    type Item = i32;

    fn next(&mut self) -> Result<Option<i32>> {
        panic!("cursor exploded")
    }

    fn reset(&mut self) -> Result<()> {
        Ok(())
    }
}

fn steps<C: Cursor<Item = i32>>(seq: &mut AsyncSequence<C>, n: usize) -> Vec<(bool, Option<i32>)> {
    (0..n)
        .map(|_| {
            let more = seq.advance().unwrap();
            (more, seq.current().copied())
        })
        .collect()
}

#[test]
fn round_trip_then_reset() {
    let mut seq = AsyncSequence::new(Replay::new(vec![1, 2, 3]));
    assert_eq!(
        steps(&mut seq, 4),
        vec![(true, Some(1)), (true, Some(2)), (true, Some(3)), (false, None)]
    );

    let mut seq = AsyncSequence::new(Replay::new(vec![1, 2, 3]));
    assert_eq!(steps(&mut seq, 2), vec![(true, Some(1)), (true, Some(2))]);
    seq.reset().unwrap();
    assert_eq!(steps(&mut seq, 1), vec![(true, Some(1))]);
}

#[test]
fn reset_after_exhaustion_is_serviced() {
    let mut seq = AsyncSequence::new(Replay::new(vec![7]));
    assert_eq!(steps(&mut seq, 2), vec![(true, Some(7)), (false, None)]);
    seq.reset().unwrap();
    assert_eq!(steps(&mut seq, 2), vec![(true, Some(7)), (false, None)]);
}

#[test]
fn dispose_is_asynchronous_and_happens_once() {
    let (mut cursor, disposed) = Tracked::new(vec![1, 2]);
    cursor.dispose_delay = Duration::from_millis(200);
    let mut seq = AsyncSequence::new(cursor);
    assert!(seq.advance().unwrap());

    let started = Instant::now();
    seq.dispose();
    assert!(started.elapsed() < Duration::from_millis(150));

    disposed.receive();
    drop(seq);
    thread::sleep(Duration::from_millis(50));
    assert_eq!(disposed.try_receive(), None);
}

#[test]
fn dropping_disposes() {
    let (cursor, disposed) = Tracked::new(vec![1]);
    let mut seq = AsyncSequence::new(cursor);
    assert!(seq.advance().unwrap());
    drop(seq);
    disposed.receive();
}

#[test]
fn disposing_before_first_advance_does_not_block() {
    let (mut cursor, disposed) = Tracked::new(vec![1]);
    cursor.dispose_delay = Duration::from_millis(300);
    let mut seq = AsyncSequence::new(cursor);

    let started = Instant::now();
    seq.dispose();
    assert!(started.elapsed() < Duration::from_millis(150));
    assert!(!seq.is_started());

    disposed.receive();
    drop(seq);
    thread::sleep(Duration::from_millis(50));
    assert_eq!(disposed.try_receive(), None);
}

#[test]
fn dropping_before_first_advance_does_not_block() {
    let (mut cursor, disposed) = Tracked::new(vec![1]);
    cursor.dispose_delay = Duration::from_millis(300);
    let seq = AsyncSequence::new(cursor);

    let started = Instant::now();
    drop(seq);
    assert!(started.elapsed() < Duration::from_millis(150));
    disposed.receive();
}

#[test]
fn cursor_errors_reach_the_consumer() {
    let rows = vec![Ok(1), Err("corrupt row"), Ok(3)];
    let mut seq = AsyncSequence::new(Fallible::new(rows.into_iter()));
    assert!(seq.advance().unwrap());
    assert!(matches!(seq.advance(), Err(Error::Source(m)) if m == "corrupt row"));
    assert!(seq.advance().unwrap());
    assert_eq!(seq.current(), Some(&3));
    assert!(matches!(seq.reset(), Err(Error::ResetUnsupported)));
    assert!(!seq.advance().unwrap());
}

#[test]
fn panicking_cursor_stops_the_sequence() {
    let mut seq = AsyncSequence::new(Exploding);
    assert!(matches!(seq.advance(), Err(Error::Panicked(m)) if m == "cursor exploded"));
    assert!(matches!(seq.advance(), Err(Error::Stopped)));
    assert!(matches!(seq.reset(), Err(Error::Stopped)));
}

#[test]
fn iterator_and_stream_sources() {
    let seq = AsyncSequence::new(Once::new(1..=4));
    let items: Vec<i32> = seq.collect::<Result<_>>().unwrap();
    assert_eq!(items, vec![1, 2, 3, 4]);

    let stream = futures::stream::iter(vec![10, 20]);
    let seq = AsyncSequence::new(Blocking::new(stream));
    let items: Vec<i32> = seq.collect::<Result<_>>().unwrap();
    assert_eq!(items, vec![10, 20]);
}

#[test]
fn consumer_on_another_thread() {
    let seq = AsyncSequence::new(Replay::new((0..100).collect::<Vec<u32>>()));
    let sum = thread::spawn(move || seq.map(|item| item.unwrap()).sum::<u32>())
        .join()
        .unwrap();
    assert_eq!(sum, 4950);
}

#[cfg(feature = "runtime-tokio")]
#[tokio::test(flavor = "multi_thread")]
async fn producer_on_tokio_blocking_pool() {
    use handoff::runtimes::tokio::Blocking as TokioBlocking;
    use std::sync::Arc;

    let runtime = Arc::new(TokioBlocking::current());
    let items = tokio::task::spawn_blocking(move || {
        let seq = AsyncSequence::with_runtime(Replay::new(vec!['a', 'b']), runtime);
        seq.collect::<Result<Vec<_>>>()
    })
    .await
    .unwrap()
    .unwrap();
    assert_eq!(items, vec!['a', 'b']);
}
