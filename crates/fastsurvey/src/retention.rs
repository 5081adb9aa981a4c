//! Pending entry retention policies.
//!
//! Pending entries are never required after verification, but they are kept
//! so that a token can be verified more than once. A policy decides how long
//! they stay around. Verified entries are never subject to retention.

use chrono::{DateTime, Duration, Utc};
use std::fmt;

/// Decides which pending entries have expired.
pub trait RetentionPolicy: fmt::Debug + Send + Sync {
    /// Pending entries submitted strictly before the returned instant are
    /// expired. `None` means nothing expires.
    fn cutoff(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>>;
}

/// Keep every pending entry forever.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeepAll;

impl RetentionPolicy for KeepAll {
    fn cutoff(&self, _now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        None
    }
}

/// Expire pending entries older than a fixed age.
#[derive(Debug, Clone, Copy)]
pub struct MaxAge(pub Duration);

impl MaxAge {
    pub fn hours(hours: u32) -> Self {
        Self(Duration::hours(i64::from(hours)))
    }
}

impl RetentionPolicy for MaxAge {
    fn cutoff(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        now.checked_sub_signed(self.0)
    }
}
