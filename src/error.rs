//! Errors surfaced by channels, async calls, sequences and the script commands.

use std::io;

/// Everything that can go wrong in this crate.
///
/// Blocking operations themselves never fail; errors come from the work running on
/// the other side of a channel (a panicking async call, a cursor that cannot reset)
/// or from malformed input at the script boundary.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("async computation panicked: {0}")]
    Panicked(String),

    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[from] io::Error),

    #[error("runtime dropped the job before running it")]
    Abandoned,

    #[error("sequence source does not support reset")]
    ResetUnsupported,

    #[error("sequence source failed: {0}")]
    Source(String),

    #[error("channel payload must not be nil")]
    NullPayload,

    #[error("select needs at least one case")]
    EmptySelect,

    #[error("invalid select case: {0}")]
    InvalidCase(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("unknown command `{0}`")]
    UnknownCommand(String),

    #[error("sequence has been disposed")]
    Disposed,

    #[error("sequence producer has stopped")]
    Stopped,
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Error {
    /// Builds an [`Error::Source`] from anything printable, for cursor implementations
    /// wrapping foreign error types.
    pub fn from_display(err: impl std::fmt::Display) -> Self {
        Error::Source(err.to_string())
    }

    /// Turns a payload caught by `catch_unwind` into an [`Error::Panicked`].
    pub(crate) fn from_panic(payload: Box<dyn std::any::Any + Send>) -> Self {
        Error::Panicked(panic_message(&*payload))
    }
}

pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn panic_payloads_become_messages() {
        let err = Error::from_panic(Box::new("boom"));
        assert_eq!(err.to_string(), "async computation panicked: boom");

        let err = Error::from_panic(Box::new(String::from("owned")));
        assert!(matches!(err, Error::Panicked(ref m) if m == "owned"));

        let err = Error::from_panic(Box::new(42_u8));
        assert!(matches!(err, Error::Panicked(ref m) if m == "non-string panic payload"));
    }
}
