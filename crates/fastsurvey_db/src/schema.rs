//! Database schema creation.
//!
//! All CREATE statements live here - single source of truth.

use crate::error::Result;
use crate::SurveyDb;
use tracing::debug;

impl SurveyDb {
    /// Ensure all tables exist.
    pub(crate) async fn ensure_schema(&self) -> Result<()> {
        // Enable WAL mode for better concurrent access
        sqlx::query("PRAGMA journal_mode=WAL")
            .execute(&self.pool)
            .await?;
        sqlx::query("PRAGMA synchronous=NORMAL")
            .execute(&self.pool)
            .await?;

        self.create_pending_tables().await?;
        self.create_verified_tables().await?;

        debug!("Database schema verified");
        Ok(())
    }

    async fn create_pending_tables(&self) -> Result<()> {
        sqlx::query(
            r#"CREATE TABLE IF NOT EXISTS pending_entries (
                token TEXT PRIMARY KEY,
                survey_key TEXT NOT NULL,
                identity TEXT NOT NULL,
                submitted_at INTEGER NOT NULL,
                answers_json TEXT NOT NULL
            )"#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_pending_survey ON pending_entries(survey_key, submitted_at)",
        )
        .execute(&self.pool)
        .await?;

        // Pending entries are write-once
        sqlx::query(
            r#"CREATE TRIGGER IF NOT EXISTS pending_entries_immutable
            BEFORE UPDATE ON pending_entries
            BEGIN
                SELECT RAISE(ABORT, 'pending entries are immutable');
            END"#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn create_verified_tables(&self) -> Result<()> {
        sqlx::query(
            r#"CREATE TABLE IF NOT EXISTS verified_entries (
                survey_key TEXT NOT NULL,
                identity TEXT NOT NULL,
                submitted_at INTEGER NOT NULL,
                answers_json TEXT NOT NULL,
                PRIMARY KEY (survey_key, identity)
            )"#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
