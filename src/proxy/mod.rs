//! Decision engine: replay from cache, forward to the network, record

mod handler;

pub use handler::ReplayHandler;

use serde::{Deserialize, Serialize};

/// Independent switches controlling a [`ReplayHandler`]
///
/// The default enables everything: look up the cache, go to the network on
/// a miss, and record what comes back.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Behaviors {
    /// Always go to the network, even when a cached response exists
    pub skip_cache_lookup: bool,
    /// Fail with `NoCacheEntry` instead of going to the network on a miss
    pub deny_network_calls: bool,
    /// Do not record or persist network responses
    pub skip_recording_responses: bool,
}

impl Behaviors {
    /// Lookup, forward on miss, record
    #[must_use]
    pub const fn new() -> Self {
        Self {
            skip_cache_lookup: false,
            deny_network_calls: false,
            skip_recording_responses: false,
        }
    }

    /// Serve from the cache only; a miss is an error
    #[must_use]
    pub const fn replay_only() -> Self {
        Self::new().deny_network_calls()
    }

    /// Always refresh from the network and re-record
    #[must_use]
    pub const fn refresh() -> Self {
        Self::new().skip_cache_lookup()
    }

    /// Set `skip_cache_lookup`
    #[must_use]
    pub const fn skip_cache_lookup(mut self) -> Self {
        self.skip_cache_lookup = true;
        self
    }

    /// Set `deny_network_calls`
    #[must_use]
    pub const fn deny_network_calls(mut self) -> Self {
        self.deny_network_calls = true;
        self
    }

    /// Set `skip_recording_responses`
    #[must_use]
    pub const fn skip_recording_responses(mut self) -> Self {
        self.skip_recording_responses = true;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_enables_everything() {
        let behaviors = Behaviors::default();
        assert_eq!(behaviors, Behaviors::new());
        assert!(!behaviors.skip_cache_lookup);
        assert!(!behaviors.deny_network_calls);
        assert!(!behaviors.skip_recording_responses);
    }

    #[test]
    fn test_flags_are_independent() {
        let behaviors = Behaviors::new()
            .deny_network_calls()
            .skip_recording_responses();

        assert!(!behaviors.skip_cache_lookup);
        assert!(behaviors.deny_network_calls);
        assert!(behaviors.skip_recording_responses);
    }

    #[test]
    fn test_presets() {
        assert!(Behaviors::replay_only().deny_network_calls);
        assert!(Behaviors::refresh().skip_cache_lookup);
    }

    #[test]
    fn test_deserialize_partial() {
        let behaviors: Behaviors = toml::from_str("deny_network_calls = true").unwrap();
        assert_eq!(behaviors, Behaviors::replay_only());
    }
}
