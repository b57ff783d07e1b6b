//! Concurrency primitives for an embeddable scripting engine, built on plain OS
//! threads and one building block: a channel that holds at most one value.
//!
//! - [`Channel`] -- a single-slot mailbox. Sending blocks while it is full, receiving
//!   blocks while it is empty.
//! - [`Select`] -- run the handler of the first ready channel out of an ordered list,
//!   blocking until one is ready.
//! - [`call_async`] -- run a computation on its own thread and get a channel that
//!   will carry its result.
//! - [`AsyncSequence`] -- iterate a stateful cursor that lives on a background thread.
//!
//! The [`script`] module exposes the four of them as built-in commands over a dynamic
//! [`Value`](script::Value) type.
//!
//! # Handing values over
//!
//! A [`Channel`] is a handle: clones share the slot. One thread sends, another
//! receives, and neither gets ahead of the other by more than one value.
//!
//! ```
//! use handoff::Channel;
//! use std::thread;
//!
//! let chan = Channel::new();
//! let producer = {
//!     let chan = chan.clone();
//!     thread::spawn(move || {
//!         for i in 0..3 {
//!             chan.send(i); // waits until the previous value is taken
//!         }
//!     })
//! };
//! let received: Vec<i32> = (0..3).map(|_| chan.receive()).collect();
//! assert_eq!(received, vec![0, 1, 2]);
//! producer.join().unwrap();
//! ```
//!
//! # Waiting on several channels
//!
//! A [`Select`] lists cases in priority order. It scans them once; the first channel
//! holding a value has its handler run. A default case fires when the scan reaches it,
//! so its position decides its priority. When nothing fires during the scan, the
//! select parks until some channel gets a value.
//!
//! ```
//! use handoff::{Channel, Select};
//!
//! let (jobs, quit) = (Channel::<u32>::new(), Channel::<()>::new());
//! quit.send(());
//!
//! let selected = Select::new()
//!     .recv(&quit, |()| None)
//!     .recv(&jobs, Some)
//!     .wait()
//!     .unwrap();
//! assert_eq!(selected.channel, Some(quit.id()));
//! assert_eq!(selected.output, None);
//! ```
//!
//! # Async calls
//!
//! [`call_async`] returns at once. The computation's outcome, including a panic or a
//! failure to start a thread, arrives on the returned channel as a [`Result`].
//!
//! ```
//! use handoff::{call_async, Error};
//!
//! let ok = call_async(|| Ok("fine"));
//! let bad = call_async::<(), _>(|| panic!("oops"));
//! assert_eq!(ok.receive().unwrap(), "fine");
//! assert!(matches!(bad.receive(), Err(Error::Panicked(_))));
//! ```
//!
//! # Async sequences
//!
//! An [`AsyncSequence`] moves a [`Cursor`](sequence::Cursor) onto a producer thread the
//! first time it is advanced. The consumer keeps the usual advance / current / reset /
//! dispose contract; every step is a request and an answer over channels.
//!
//! ```
//! use handoff::sequence::{AsyncSequence, Replay};
//!
//! let mut seq = AsyncSequence::new(Replay::new(vec!["a", "b"]));
//! let mut seen = Vec::new();
//! while seq.advance().unwrap() {
//!     seen.push(*seq.current().unwrap());
//! }
//! assert_eq!(seen, vec!["a", "b"]);
//! seq.dispose();
//! ```
//!
//! # Runtimes
//!
//! Every async call and sequence producer runs as a job on a [`Runtime`]. The default,
//! [`Threads`](runtimes::thread::Threads), starts one named OS thread per job as set by
//! a [`Config`]. The `runtime-tokio` feature adds a runtime backed by Tokio's blocking
//! pool. Jobs block on channels, so a runtime must give each of them its own thread.

pub mod call;
pub mod channel;
pub mod config;
pub mod error;
pub mod runtimes;
pub mod script;
pub mod select;
pub mod sequence;
mod signal;

pub use call::{call_async, call_async_on, run_async, run_async_on};
pub use channel::{Channel, ChannelId};
pub use config::Config;
pub use error::{Error, Result};
pub use runtimes::Runtime;
pub use select::{Select, Selected};
pub use sequence::AsyncSequence;
