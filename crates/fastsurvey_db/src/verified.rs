//! Verified entry operations (one record per identity)

use crate::error::Result;
use crate::types::VerifiedEntry;
use crate::SurveyDb;
use fastsurvey_ids::SurveyKey;
use sqlx::Row;
use tracing::debug;

impl SurveyDb {
    /// Promote the pending entry `token` of `survey` to the verified record
    /// of its identity.
    ///
    /// One statement copies identity, timestamp and answers out of the
    /// pending entry and inserts or fully replaces the verified record. The
    /// pending entry is left as it is. Concurrent promotions for one identity
    /// serialize on the primary key; the last to commit wins.
    ///
    /// Returns the promoted identity, or `None` if no pending entry of this
    /// survey carries `token` (nothing is written in that case).
    pub async fn verified_promote(&self, survey: &SurveyKey, token: &str) -> Result<Option<String>> {
        let identity: Option<String> = sqlx::query_scalar(
            r#"
            INSERT INTO verified_entries (survey_key, identity, submitted_at, answers_json)
            SELECT survey_key, identity, submitted_at, answers_json
            FROM pending_entries
            WHERE survey_key = ? AND token = ?
            ON CONFLICT(survey_key, identity) DO UPDATE SET
                submitted_at = excluded.submitted_at,
                answers_json = excluded.answers_json
            RETURNING identity
            "#,
        )
        .bind(survey.to_string())
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(ref identity) = identity {
            debug!(survey = %survey, identity = %identity, "Verified entry upserted");
        }
        Ok(identity)
    }

    /// Insert or fully replace the verified record of `entry.identity`.
    pub async fn verified_upsert(&self, survey: &SurveyKey, entry: &VerifiedEntry) -> Result<()> {
        let answers_json = serde_json::to_string(&entry.answers)?;

        sqlx::query(
            r#"
            INSERT INTO verified_entries (survey_key, identity, submitted_at, answers_json)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(survey_key, identity) DO UPDATE SET
                submitted_at = excluded.submitted_at,
                answers_json = excluded.answers_json
            "#,
        )
        .bind(survey.to_string())
        .bind(entry.identity.as_str())
        .bind(entry.timestamp.timestamp_millis())
        .bind(answers_json)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn verified_get(&self, survey: &SurveyKey, identity: &str) -> Result<Option<VerifiedEntry>> {
        let row = sqlx::query(
            r#"
            SELECT identity, submitted_at, answers_json
            FROM verified_entries
            WHERE survey_key = ? AND identity = ?
            "#,
        )
        .bind(survey.to_string())
        .bind(identity)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_verified).transpose()
    }

    /// All verified entries of `survey`, ordered by identity.
    pub async fn verified_list(&self, survey: &SurveyKey) -> Result<Vec<VerifiedEntry>> {
        let rows = sqlx::query(
            r#"
            SELECT identity, submitted_at, answers_json
            FROM verified_entries
            WHERE survey_key = ?
            ORDER BY identity ASC
            "#,
        )
        .bind(survey.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_verified).collect()
    }

    pub async fn verified_count(&self, survey: &SurveyKey) -> Result<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM verified_entries WHERE survey_key = ?")
                .bind(survey.to_string())
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }
}

fn row_to_verified(row: &sqlx::sqlite::SqliteRow) -> Result<VerifiedEntry> {
    let millis: i64 = row.try_get("submitted_at")?;
    let answers_json: String = row.try_get("answers_json")?;

    Ok(VerifiedEntry {
        identity: row.try_get("identity")?,
        timestamp: SurveyDb::millis_to_datetime(millis)?,
        answers: serde_json::from_str(&answers_json)?,
    })
}
