//! Per-request cacheability state machine.

use serde::{Deserialize, Serialize};

/// Cacheability verdict for the current response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cacheability {
    /// Nobody has voted yet.
    #[default]
    Unset,
    /// The response may be stored by the surrogate.
    Cacheable,
    /// The response must not be stored. Absorbing.
    NotCacheable,
}

impl std::fmt::Display for Cacheability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unset => write!(f, "unset"),
            Self::Cacheable => write!(f, "cacheable"),
            Self::NotCacheable => write!(f, "not-cacheable"),
        }
    }
}

/// Cacheability state, TTL and the reason recorded for a non-cacheable verdict.
///
/// Transitions are monotonic: `Unset -> Cacheable`, and any state
/// `-> NotCacheable`. Once `NotCacheable`, the verdict never changes again.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheDecision {
    state: Cacheability,
    ttl_secs: u64,
    reason: String,
}

impl CacheDecision {
    /// Create an undecided state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Vote for caching.
    ///
    /// Moves `Unset` to `Cacheable`. A positive `ttl` is stored whatever the
    /// current state, including `NotCacheable`. Returns whether the state changed.
    pub fn mark_cacheable(&mut self, ttl: u64) -> bool {
        let transitioned = self.state == Cacheability::Unset;
        if transitioned {
            self.state = Cacheability::Cacheable;
        }
        if ttl > 0 {
            self.ttl_secs = ttl;
        }
        transitioned
    }

    /// Vote against caching.
    ///
    /// The first call records `short_reason` (or `reason` when absent);
    /// later calls are no-ops. Returns whether the state changed.
    pub fn mark_not_cacheable(&mut self, reason: &str, short_reason: Option<&str>) -> bool {
        if self.state == Cacheability::NotCacheable {
            return false;
        }
        self.state = Cacheability::NotCacheable;
        self.reason = match short_reason {
            Some(short) if !short.is_empty() => short.to_string(),
            _ => reason.to_string(),
        };
        true
    }

    /// True iff the verdict is exactly `Cacheable`.
    pub fn is_cacheable(&self) -> bool {
        self.state == Cacheability::Cacheable
    }

    /// True unless the verdict is `NotCacheable`.
    pub fn maybe_cacheable(&self) -> bool {
        self.state != Cacheability::NotCacheable
    }

    /// Current verdict.
    pub fn state(&self) -> Cacheability {
        self.state
    }

    /// Stored TTL in seconds.
    pub fn ttl_secs(&self) -> u64 {
        self.ttl_secs
    }

    /// Reason recorded with the first `NotCacheable` vote.
    pub fn reason(&self) -> &str {
        &self.reason
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state() {
        let d = CacheDecision::new();
        assert_eq!(d.state(), Cacheability::Unset);
        assert!(!d.is_cacheable());
        assert!(d.maybe_cacheable());
        assert_eq!(d.ttl_secs(), 0);
    }

    #[test]
    fn test_mark_cacheable() {
        let mut d = CacheDecision::new();
        assert!(d.mark_cacheable(3600));
        assert!(d.is_cacheable());
        assert_eq!(d.ttl_secs(), 3600);

        // Second vote keeps the state but may refresh the ttl
        assert!(!d.mark_cacheable(120));
        assert_eq!(d.ttl_secs(), 120);

        // Zero ttl leaves the stored value alone
        d.mark_cacheable(0);
        assert_eq!(d.ttl_secs(), 120);
    }

    #[test]
    fn test_not_cacheable_is_absorbing() {
        let mut d = CacheDecision::new();
        d.mark_cacheable(60);
        assert!(d.mark_not_cacheable("POST request", None));
        assert!(!d.mark_cacheable(60));
        assert!(!d.is_cacheable());
        assert!(!d.maybe_cacheable());
    }

    #[test]
    fn test_ttl_updates_after_not_cacheable() {
        let mut d = CacheDecision::new();
        d.mark_not_cacheable("disabled", None);
        d.mark_cacheable(60);
        assert!(!d.is_cacheable());
        assert_eq!(d.ttl_secs(), 60);
    }

    #[test]
    fn test_first_reason_wins() {
        let mut d = CacheDecision::new();
        d.mark_not_cacheable("first reason", None);
        assert!(!d.mark_not_cacheable("second reason", None));
        assert_eq!(d.reason(), "first reason");
    }

    #[test]
    fn test_short_reason_preferred() {
        let mut d = CacheDecision::new();
        d.mark_not_cacheable("a very long diagnostic", Some("short"));
        assert_eq!(d.reason(), "short");

        let mut d = CacheDecision::new();
        d.mark_not_cacheable("full", Some(""));
        assert_eq!(d.reason(), "full");
    }

    #[test]
    fn test_monotonic_over_sequences() {
        // Any interleaving that includes a NotCacheable vote ends NotCacheable
        let ops: [&[bool]; 4] = [
            &[true, false, true],
            &[false, true, true],
            &[true, true, false],
            &[false, false, true],
        ];
        for seq in ops {
            let mut d = CacheDecision::new();
            for &cacheable in seq {
                if cacheable {
                    d.mark_cacheable(10);
                } else {
                    d.mark_not_cacheable("no", None);
                }
            }
            assert_eq!(d.state(), Cacheability::NotCacheable);
        }
    }

    #[test]
    fn test_serialization() {
        let mut d = CacheDecision::new();
        d.mark_not_cacheable("POST", None);
        let json = serde_json::to_string(&d).unwrap();
        assert_eq!(json, r#"{"state":"not_cacheable","ttl_secs":0,"reason":"POST"}"#);
    }
}
