//! Stored record types.

use chrono::{DateTime, Utc};
use fastsurvey_ids::SubmissionToken;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A validated but not yet confirmed submission.
///
/// Created exactly once per accepted submission and never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingEntry {
    /// Verification capability handed to the respondent
    pub token: SubmissionToken,
    /// Respondent identity (e.g. e-mail address)
    pub identity: String,
    /// When the submission was accepted (millisecond precision)
    pub timestamp: DateTime<Utc>,
    /// Answer tree, stored verbatim
    pub answers: Value,
}

/// The confirmed submission of one identity.
///
/// At most one exists per identity per survey.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerifiedEntry {
    pub identity: String,
    /// Timestamp of the pending entry this record was promoted from
    pub timestamp: DateTime<Utc>,
    pub answers: Value,
}

impl From<PendingEntry> for VerifiedEntry {
    fn from(entry: PendingEntry) -> Self {
        Self {
            identity: entry.identity,
            timestamp: entry.timestamp,
            answers: entry.answers,
        }
    }
}
