//! A live survey: compiled validator plus its submission store.
//!
//! ```text
//! [no entry] --submit(valid)--> PENDING --verify(token)--> VERIFIED
//! [no entry] --submit(invalid)--> [no entry]
//! PENDING --verify(unknown token)--> PENDING (unchanged)
//! ```

use crate::error::{Result, SurveyError};
use crate::retention::{KeepAll, RetentionPolicy};
use chrono::{DateTime, Utc};
use fastsurvey_db::{PendingEntry, SurveyDb, VerifiedEntry};
use fastsurvey_ids::{SubmissionToken, SurveyKey};
use fastsurvey_schema::{compile, Submission, SurveyConfiguration, Validator};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

/// Returned to the respondent after a successful submission.
///
/// The token is delivered out of band (e-mail) and later presented to
/// [`Survey::verify`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Receipt {
    pub token: SubmissionToken,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug)]
pub struct Survey {
    key: SurveyKey,
    validator: Arc<Validator>,
    db: SurveyDb,
    retention: Arc<dyn RetentionPolicy>,
}

impl Survey {
    /// Compile `configuration` and bind it to a store.
    ///
    /// Pending entries are kept forever unless a retention policy is set
    /// with [`Survey::with_retention`].
    pub fn new(configuration: &SurveyConfiguration, db: SurveyDb) -> Result<Self> {
        let validator = compile(configuration)?;
        Ok(Self::from_validator(Arc::new(validator), db))
    }

    pub fn from_validator(validator: Arc<Validator>, db: SurveyDb) -> Self {
        Self {
            key: validator.survey_key().clone(),
            validator,
            db,
            retention: Arc::new(KeepAll),
        }
    }

    pub fn with_retention(mut self, retention: Arc<dyn RetentionPolicy>) -> Self {
        self.retention = retention;
        self
    }

    pub fn key(&self) -> &SurveyKey {
        &self.key
    }

    pub fn validator(&self) -> &Validator {
        &self.validator
    }

    /// Validate a submission and store it as a new pending entry.
    ///
    /// On violations nothing is stored and every violation is returned.
    pub async fn submit(&self, submission: Submission) -> Result<Receipt> {
        self.validator.validate(&submission)?;

        let entry = PendingEntry {
            token: SubmissionToken::new(),
            identity: submission.identity,
            timestamp: SurveyDb::now(),
            answers: submission.answers,
        };
        self.db.pending_insert(&self.key, &entry).await?;

        info!(survey = %self.key, token = %entry.token, "Submission accepted");
        Ok(Receipt {
            token: entry.token,
            timestamp: entry.timestamp,
        })
    }

    /// Promote the pending entry `token` to the verified record of its
    /// identity, replacing any earlier record entirely. Returns the identity.
    ///
    /// A token may be verified any number of times; each time the verified
    /// record is reset to that pending entry.
    pub async fn verify(&self, token: &str) -> Result<String> {
        match self.db.verified_promote(&self.key, token).await? {
            Some(identity) => {
                info!(survey = %self.key, identity = %identity, "Submission verified");
                Ok(identity)
            }
            None => {
                warn!(survey = %self.key, token = %token, "Verification with unknown token");
                Err(SurveyError::UnknownToken(token.to_string()))
            }
        }
    }

    /// Delete pending entries that expired under the retention policy.
    ///
    /// Returns the number of deleted entries.
    pub async fn purge_pending(&self) -> Result<u64> {
        let Some(cutoff) = self.retention.cutoff(SurveyDb::now()) else {
            return Ok(0);
        };
        let purged = self.db.pending_purge_before(&self.key, cutoff).await?;
        if purged > 0 {
            info!(survey = %self.key, purged, cutoff = %cutoff, "Expired pending entries purged");
        }
        Ok(purged)
    }
}

// Read access
impl Survey {
    pub async fn get_pending(&self, token: &str) -> Result<Option<PendingEntry>> {
        Ok(self.db.pending_get(&self.key, token).await?)
    }

    pub async fn list_pending(&self) -> Result<Vec<PendingEntry>> {
        Ok(self.db.pending_list(&self.key).await?)
    }

    pub async fn get_verified(&self, identity: &str) -> Result<Option<VerifiedEntry>> {
        Ok(self.db.verified_get(&self.key, identity).await?)
    }

    pub async fn list_verified(&self) -> Result<Vec<VerifiedEntry>> {
        Ok(self.db.verified_list(&self.key).await?)
    }

    pub async fn pending_count(&self) -> Result<i64> {
        Ok(self.db.pending_count(&self.key).await?)
    }

    pub async fn verified_count(&self) -> Result<i64> {
        Ok(self.db.verified_count(&self.key).await?)
    }
}
