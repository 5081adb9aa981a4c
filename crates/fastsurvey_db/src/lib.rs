//! Submission storage for FastSurvey
//!
//! Two keyed collections per survey live in one SQLite database:
//!
//! - `pending_entries`: every accepted submission, keyed by token, append-only
//! - `verified_entries`: the latest confirmed submission, keyed by
//!   `(survey_key, identity)`
//!
//! # Usage
//!
//! ```rust,ignore
//! use fastsurvey_db::SurveyDb;
//!
//! let db = SurveyDb::open("~/.fastsurvey/fastsurvey.sqlite3").await?;
//!
//! db.pending_insert(&survey, &entry).await?;
//! let identity = db.verified_promote(&survey, token).await?;
//! ```

mod error;
mod schema;
mod types;

// Method implementations organized by collection
mod pending;
mod verified;

pub use error::{DbError, Result};
pub use types::*;

use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use std::path::Path;
use tracing::info;

/// Handle to the submission database.
///
/// Cheap to clone; clones share one connection pool. Each survey holds its
/// own handle, so tests can substitute a fresh database per test.
#[derive(Clone, Debug)]
pub struct SurveyDb {
    pool: SqlitePool,
}

impl SurveyDb {
    /// Open or create a database at the given path.
    ///
    /// Creates all tables if they don't exist.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let url = format!("sqlite:{}?mode=rwc", path.display());

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&url)
            .await?;

        let db = Self { pool };
        db.ensure_schema().await?;

        info!(path = %path.display(), "Database opened");

        Ok(db)
    }

    /// Open an existing database (fails if not exists).
    pub async fn open_existing(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(DbError::not_found(format!(
                "Database not found: {}",
                path.display()
            )));
        }

        let url = format!("sqlite:{}?mode=rw", path.display());

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&url)
            .await?;

        let db = Self { pool };
        db.ensure_schema().await?;
        Ok(db)
    }

    /// Create a private in-memory database (for testing).
    ///
    /// A single connection is kept alive for the lifetime of the pool;
    /// every new connection would otherwise see its own empty database.
    pub async fn open_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;

        let db = Self { pool };
        db.ensure_schema().await?;
        Ok(db)
    }

    /// Get the underlying connection pool (escape hatch for complex queries).
    ///
    /// Prefer using the typed methods instead.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Close the database connection.
    pub async fn close(self) {
        self.pool.close().await;
    }
}

// Timestamp utilities
impl SurveyDb {
    /// Current time truncated to the stored (millisecond) precision.
    pub fn now() -> DateTime<Utc> {
        let now = Utc::now();
        DateTime::from_timestamp_millis(now.timestamp_millis()).unwrap_or(now)
    }

    /// Convert stored milliseconds back to a timestamp.
    pub fn millis_to_datetime(millis: i64) -> Result<DateTime<Utc>> {
        DateTime::from_timestamp_millis(millis)
            .ok_or_else(|| DbError::corrupt(format!("timestamp out of range: {}", millis)))
    }
}
