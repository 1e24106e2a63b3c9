//! Stored session values and their per-value expiry.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// The value mapping carried by a session.
pub type SessionValues = BTreeMap<String, Entry>;

/// A single stored value with its expiry timestamp.
///
/// Entries expire individually inside the whole-session TTL. An expired
/// entry reads as absent but stays in the mapping until it is overwritten,
/// deleted, or the session is cleared.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    /// The stored value.
    pub value: serde_json::Value,

    /// Unix timestamp (seconds) after which the value reads as absent.
    pub expires_at: i64,
}

impl Entry {
    /// Create an entry expiring at the given Unix timestamp.
    pub fn new(value: serde_json::Value, expires_at: i64) -> Self {
        Self { value, expires_at }
    }

    /// The stored value, or `None` once the entry has expired.
    pub fn live(&self, now: i64) -> Option<&serde_json::Value> {
        (self.expires_at > now).then_some(&self.value)
    }
}

/// Clamp a requested expiry to the session's max-age.
///
/// Non-positive requests and requests beyond the max-age both fall back
/// to the max-age itself.
pub(crate) fn effective_expiry(requested: i64, max_age: i64) -> i64 {
    if requested <= 0 || requested > max_age {
        max_age
    } else {
        requested
    }
}
