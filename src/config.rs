//! Worker thread settings.

use std::env;

use tracing::warn;

pub const DEFAULT_THREAD_NAME: &str = "handoff-worker";

/// How worker threads started by [`Threads`](crate::runtimes::thread::Threads) look.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Name given to every spawned thread. Shows up in panics and debuggers.
    pub thread_name: String,
    /// Stack size in bytes, or `None` for the platform default.
    pub stack_size: Option<usize>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            thread_name: DEFAULT_THREAD_NAME.to_string(),
            stack_size: None,
        }
    }
}

impl Config {
    /// Reads `HANDOFF_THREAD_NAME` and `HANDOFF_STACK_SIZE`, falling back to defaults
    /// for anything unset or unparsable.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(name) = lookup("HANDOFF_THREAD_NAME").filter(|n| !n.is_empty()) {
            config.thread_name = name;
        }
        if let Some(raw) = lookup("HANDOFF_STACK_SIZE") {
            match raw.trim().parse::<usize>() {
                Ok(size) if size > 0 => config.stack_size = Some(size),
                _ => warn!(value = %raw, "ignoring invalid HANDOFF_STACK_SIZE"),
            }
        }
        config
    }

    pub fn with_thread_name(mut self, name: impl Into<String>) -> Self {
        self.thread_name = name.into();
        self
    }

    pub fn with_stack_size(mut self, bytes: usize) -> Self {
        self.stack_size = Some(bytes);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn empty_environment_gives_defaults() {
        assert_eq!(Config::from_lookup(lookup(&[])), Config::default());
    }

    #[test]
    fn reads_name_and_stack_size() {
        let config = Config::from_lookup(lookup(&[
            ("HANDOFF_THREAD_NAME", "script-async"),
            ("HANDOFF_STACK_SIZE", "1048576"),
        ]));
        assert_eq!(config.thread_name, "script-async");
        assert_eq!(config.stack_size, Some(1 << 20));
    }

    #[test]
    fn bad_stack_size_is_ignored() {
        let config = Config::from_lookup(lookup(&[("HANDOFF_STACK_SIZE", "lots")]));
        assert_eq!(config.stack_size, None);
        let config = Config::from_lookup(lookup(&[("HANDOFF_STACK_SIZE", "0")]));
        assert_eq!(config.stack_size, None);
    }
}
