//! Pending entry operations (append-only)

use crate::error::Result;
use crate::types::PendingEntry;
use crate::SurveyDb;
use chrono::{DateTime, Utc};
use fastsurvey_ids::{SubmissionToken, SurveyKey};
use sqlx::Row;
use tracing::debug;

impl SurveyDb {
    /// Persist a new pending entry.
    ///
    /// Fails if the token is already taken; existing entries are never
    /// overwritten.
    pub async fn pending_insert(&self, survey: &SurveyKey, entry: &PendingEntry) -> Result<()> {
        let answers_json = serde_json::to_string(&entry.answers)?;

        sqlx::query(
            r#"
            INSERT INTO pending_entries (token, survey_key, identity, submitted_at, answers_json)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(entry.token.as_str())
        .bind(survey.to_string())
        .bind(entry.identity.as_str())
        .bind(entry.timestamp.timestamp_millis())
        .bind(answers_json)
        .execute(&self.pool)
        .await?;

        debug!(survey = %survey, token = %entry.token, "Pending entry stored");
        Ok(())
    }

    /// Look up a pending entry of `survey` by token.
    pub async fn pending_get(&self, survey: &SurveyKey, token: &str) -> Result<Option<PendingEntry>> {
        let row = sqlx::query(
            r#"
            SELECT token, identity, submitted_at, answers_json
            FROM pending_entries
            WHERE survey_key = ? AND token = ?
            "#,
        )
        .bind(survey.to_string())
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_pending).transpose()
    }

    /// All pending entries of `survey`, oldest first.
    pub async fn pending_list(&self, survey: &SurveyKey) -> Result<Vec<PendingEntry>> {
        let rows = sqlx::query(
            r#"
            SELECT token, identity, submitted_at, answers_json
            FROM pending_entries
            WHERE survey_key = ?
            ORDER BY submitted_at ASC, token ASC
            "#,
        )
        .bind(survey.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_pending).collect()
    }

    pub async fn pending_count(&self, survey: &SurveyKey) -> Result<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM pending_entries WHERE survey_key = ?")
                .bind(survey.to_string())
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }

    /// Delete pending entries of `survey` submitted strictly before `cutoff`.
    ///
    /// Returns the number of deleted entries. Verified entries are untouched.
    pub async fn pending_purge_before(
        &self,
        survey: &SurveyKey,
        cutoff: DateTime<Utc>,
    ) -> Result<u64> {
        let result = sqlx::query(
            "DELETE FROM pending_entries WHERE survey_key = ? AND submitted_at < ?",
        )
        .bind(survey.to_string())
        .bind(cutoff.timestamp_millis())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}

fn row_to_pending(row: &sqlx::sqlite::SqliteRow) -> Result<PendingEntry> {
    let token: String = row.try_get("token")?;
    let millis: i64 = row.try_get("submitted_at")?;
    let answers_json: String = row.try_get("answers_json")?;

    Ok(PendingEntry {
        token: SubmissionToken::from_raw(token),
        identity: row.try_get("identity")?,
        timestamp: SurveyDb::millis_to_datetime(millis)?,
        answers: serde_json::from_str(&answers_json)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn survey() -> SurveyKey {
        SurveyKey::parse("fastsurvey.test").unwrap()
    }

    fn entry(token: &str, identity: &str, millis: i64, data: &str) -> PendingEntry {
        PendingEntry {
            token: SubmissionToken::from_raw(token),
            identity: identity.to_string(),
            timestamp: SurveyDb::millis_to_datetime(millis).unwrap(),
            answers: json!({ "data": data }),
        }
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let db = SurveyDb::open_memory().await.unwrap();
        let stored = entry("tomato", "aa00aaa@mytum.de", 1_590_228_251_000, "cucumber");
        db.pending_insert(&survey(), &stored).await.unwrap();

        let fetched = db.pending_get(&survey(), "tomato").await.unwrap();
        assert_eq!(fetched, Some(stored));
        assert_eq!(db.pending_get(&survey(), "peach").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_duplicate_token_is_rejected() {
        let db = SurveyDb::open_memory().await.unwrap();
        db.pending_insert(&survey(), &entry("tomato", "a@b.de", 1_000, "cucumber"))
            .await
            .unwrap();

        let second = db
            .pending_insert(&survey(), &entry("tomato", "c@d.de", 2_000, "salad"))
            .await;
        assert!(second.is_err());

        let kept = db.pending_get(&survey(), "tomato").await.unwrap().unwrap();
        assert_eq!(kept.answers, json!({"data": "cucumber"}));
    }

    #[tokio::test]
    async fn test_entries_are_scoped_by_survey() {
        let db = SurveyDb::open_memory().await.unwrap();
        let other = SurveyKey::parse("fastsurvey.other").unwrap();
        db.pending_insert(&other, &entry("tomato", "a@b.de", 1_000, "cucumber"))
            .await
            .unwrap();

        assert_eq!(db.pending_get(&survey(), "tomato").await.unwrap(), None);
        assert_eq!(db.pending_count(&survey()).await.unwrap(), 0);
        assert_eq!(db.pending_count(&other).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_updates_are_refused() {
        let db = SurveyDb::open_memory().await.unwrap();
        db.pending_insert(&survey(), &entry("tomato", "a@b.de", 1_000, "cucumber"))
            .await
            .unwrap();

        let result = sqlx::query("UPDATE pending_entries SET identity = 'x@y.de'")
            .execute(db.pool())
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_purge_before_cutoff() {
        let db = SurveyDb::open_memory().await.unwrap();
        db.pending_insert(&survey(), &entry("old", "a@b.de", 1_000, "x"))
            .await
            .unwrap();
        db.pending_insert(&survey(), &entry("new", "a@b.de", 5_000, "y"))
            .await
            .unwrap();

        let cutoff = SurveyDb::millis_to_datetime(5_000).unwrap();
        assert_eq!(db.pending_purge_before(&survey(), cutoff).await.unwrap(), 1);

        let remaining = db.pending_list(&survey()).await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].token.as_str(), "new");
    }
}
