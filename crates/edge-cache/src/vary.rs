//! Vary-context fingerprinting.
//!
//! The surrogate keys cached variants on the `_lscache_vary` cookie. Each
//! response recomputes the fingerprint of the visitor's context (customer
//! group, currency, ...) and, when the cookie no longer matches, rewrites it and
//! refuses to cache the response that was rendered for the stale variant.

use std::collections::{BTreeMap, HashSet};

use sha2::{Digest, Sha256};

use crate::cookie::{CookieJar, CookieMetadata};
use crate::encoding::build_query;

/// Cookie holding the vary fingerprint. Fixed by the surrogate.
pub const VARY_COOKIE: &str = "_lscache_vary";

/// Path the vary cookie is scoped to.
pub const VARY_COOKIE_PATH: &str = "/";

/// Context-key to value mapping describing the visitor's variant.
pub type VaryContext = BTreeMap<String, String>;

/// Fingerprint of a non-empty vary context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VaryFingerprint {
    /// Hex digest stored in the vary cookie.
    pub hash: String,
    /// Query-string form of the sorted context, for diagnostics.
    pub raw: String,
}

impl VaryFingerprint {
    /// Fingerprint a context. Empty contexts have no fingerprint.
    pub fn compute(context: &VaryContext) -> Option<Self> {
        if context.is_empty() {
            return None;
        }

        // BTreeMap iterates keys ascending; length prefixes keep the
        // serialization unambiguous.
        let mut hasher = Sha256::new();
        for (key, value) in context {
            hasher.update((key.len() as u64).to_le_bytes());
            hasher.update(key.as_bytes());
            hasher.update((value.len() as u64).to_le_bytes());
            hasher.update(value.as_bytes());
        }

        Some(Self {
            hash: hex::encode(hasher.finalize()),
            raw: build_query(context),
        })
    }
}

/// Result of a vary evaluation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VaryOutcome {
    /// The stored cookie did not match the current context.
    pub changed: bool,
    /// Diagnostic form; suffixed with `" changed"` on mismatch.
    pub raw: String,
    /// Fingerprint of the filtered context.
    pub fingerprint: Option<VaryFingerprint>,
}

/// Computes fingerprints and keeps the vary cookie in sync.
#[derive(Debug, Clone, Default)]
pub struct VaryFingerprintEngine {
    bypassed: HashSet<String>,
}

impl VaryFingerprintEngine {
    /// Create an engine ignoring the given context keys.
    pub fn new<I, S>(bypassed: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            bypassed: bypassed.into_iter().map(Into::into).collect(),
        }
    }

    /// Drop bypassed keys from a context snapshot.
    pub fn filter<I, K, V>(&self, context: I) -> VaryContext
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        context
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .filter(|(k, _)| !self.bypassed.contains(k))
            .collect()
    }

    /// Fingerprint the context and reconcile the vary cookie.
    ///
    /// On mismatch the cookie is rewritten (or deleted when the context is
    /// empty) and the outcome reports `changed`. A matching cookie is left
    /// untouched.
    pub fn evaluate<I, K, V>(&self, context: I, jar: &mut dyn CookieJar) -> VaryOutcome
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let context = self.filter(context);
        let fingerprint = VaryFingerprint::compute(&context);

        let mut raw = fingerprint
            .as_ref()
            .map(|f| f.raw.clone())
            .unwrap_or_default();
        let computed = fingerprint.as_ref().map(|f| f.hash.as_str()).unwrap_or("");
        let current = jar.get(VARY_COOKIE).unwrap_or_default();

        let changed = computed != current;
        if changed {
            let metadata = CookieMetadata::sensitive(VARY_COOKIE_PATH);
            if computed.is_empty() {
                jar.delete(VARY_COOKIE, &metadata);
            } else {
                jar.set_sensitive(VARY_COOKIE, computed, &metadata);
            }
            raw.push_str(" changed");
        }

        VaryOutcome {
            changed,
            raw,
            fingerprint,
        }
    }
}
