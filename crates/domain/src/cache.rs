//! Persisted cache entry with optional expiry.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// A value stored by the persistent cache.
///
/// An entry without an expiration never goes stale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedEntry<T> {
    /// When the entry goes stale, if ever.
    #[serde(default)]
    pub expiration: Option<DateTime<Utc>>,
    /// The cached payload.
    pub data: T,
}

impl<T> CachedEntry<T> {
    /// Creates an entry that expires `expiration_in_days` after `now`.
    ///
    /// `None` or zero days yields an entry that never expires, and so does
    /// a day count past the representable date range.
    #[must_use]
    pub fn new(data: T, now: DateTime<Utc>, expiration_in_days: Option<u32>) -> Self {
        let expiration = expiration_in_days
            .filter(|days| *days > 0)
            .and_then(|days| Duration::try_days(i64::from(days)))
            .and_then(|ttl| now.checked_add_signed(ttl));
        Self { expiration, data }
    }

    /// True if `now` is past the expiration.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expiration.is_some_and(|expiration| now > expiration)
    }
}
