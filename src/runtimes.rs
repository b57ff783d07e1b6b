//! Where async work runs. Every async call and every sequence producer is a [`Job`]
//! handed to a [`Runtime`], which must run it on a thread of control that makes
//! progress independently of the caller: jobs block on channels, so running two of
//! them on the same cooperative task would deadlock.
//!
//! [`thread::Threads`] starts a fresh OS thread per job and is what the crate uses
//! unless told otherwise. With the `runtime-tokio` feature, [`tokio::Blocking`] hands
//! jobs to Tokio's blocking pool instead.

use crate::error::Result;

pub type Job = Box<dyn FnOnce() + Send + 'static>;

pub trait Runtime: Send + Sync + 'static {
    fn spawn(&self, job: Job) -> Result<()>;
}

pub mod thread {
    use std::thread::Builder;

    use tracing::debug;

    use super::{Job, Runtime};
    use crate::{config::Config, error::Result};

    /// One detached OS thread per job, named and sized according to a [`Config`].
    #[derive(Debug, Clone, Default)]
    pub struct Threads {
        config: Config,
    }

    impl Threads {
        pub fn new(config: Config) -> Self {
            Self { config }
        }

        pub fn from_env() -> Self {
            Self::new(Config::from_env())
        }

        pub fn config(&self) -> &Config {
            &self.config
        }
    }

    impl Runtime for Threads {
        fn spawn(&self, job: Job) -> Result<()> {
            let mut builder = Builder::new().name(self.config.thread_name.clone());
            if let Some(size) = self.config.stack_size {
                builder = builder.stack_size(size);
            }
            let handle = builder.spawn(job)?;
            debug!(thread = ?handle.thread().id(), name = %self.config.thread_name, "spawned worker");
            Ok(())
        }
    }
}

#[cfg(feature = "runtime-tokio")]
pub mod tokio {
    use std::{
        io,
        panic::{self, AssertUnwindSafe},
    };

    use ::tokio::runtime::Handle;

    use super::{Job, Runtime};
    use crate::error::{panic_message, Result};

    /// Runs jobs on the blocking thread pool of a Tokio runtime.
    ///
    /// The pool grows on demand up to its configured limit; keep the limit above the
    /// number of sequences and calls that may be blocked at the same time.
    #[derive(Debug, Clone)]
    pub struct Blocking {
        handle: Handle,
    }

    impl Blocking {
        pub fn new(handle: Handle) -> Self {
            Self { handle }
        }

        /// Uses the runtime the caller is running in. Panics outside of a Tokio runtime.
        pub fn current() -> Self {
            Self::new(Handle::current())
        }
    }

    impl Runtime for Blocking {
        /// A job the runtime drops instead of running (while shutting down) is still
        /// reported by the async call layer; only a panic from Tokio itself is an error here.
        fn spawn(&self, job: Job) -> Result<()> {
            panic::catch_unwind(AssertUnwindSafe(|| drop(self.handle.spawn_blocking(job))))
                .map_err(|payload| {
                    io::Error::new(io::ErrorKind::Other, panic_message(&*payload)).into()
                })
        }
    }
}
