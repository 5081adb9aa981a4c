//! CLI command implementations

pub mod check;
pub mod purge;
pub mod submit;
pub mod verify;

use anyhow::{Context as _, Result};
use fastsurvey::{ServiceConfig, SurveyRegistry};
use fastsurvey_db::SurveyDb;
use fastsurvey_schema::SurveyConfiguration;
use std::future::Future;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Resolved home directory and service configuration.
pub struct Context {
    pub home: PathBuf,
    pub config: ServiceConfig,
}

impl Context {
    pub fn load(home: PathBuf) -> Result<Self> {
        let config = ServiceConfig::load(&home)?;
        Ok(Self { home, config })
    }

    /// Open (or create) the store and register every survey in the surveys
    /// directory.
    pub async fn open_registry(&self) -> Result<SurveyRegistry> {
        let db = SurveyDb::open(&self.config.database_path).await.with_context(|| {
            format!(
                "Failed to open database: {}",
                self.config.database_path.display()
            )
        })?;
        self.load_surveys(db).await
    }

    /// Like [`Context::open_registry`], but fails if no database exists yet.
    ///
    /// Used by commands that only act on stored submissions.
    pub async fn open_existing_registry(&self) -> Result<SurveyRegistry> {
        let db = SurveyDb::open_existing(&self.config.database_path)
            .await
            .with_context(|| {
                format!(
                    "No submissions database at {} (submit creates it)",
                    self.config.database_path.display()
                )
            })?;
        self.load_surveys(db).await
    }

    async fn load_surveys(&self, db: SurveyDb) -> Result<SurveyRegistry> {
        let registry = SurveyRegistry::new(db).with_retention(self.config.retention());

        for path in survey_files(&self.config.surveys_dir)? {
            let configuration = match read_configuration(&path) {
                Ok(configuration) => configuration,
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "Skipping survey configuration");
                    continue;
                }
            };
            if let Err(err) = registry.register(&configuration).await {
                warn!(path = %path.display(), error = %err, "Skipping survey configuration");
            }
        }

        info!(
            home = %self.home.display(),
            surveys = registry.keys().await.len(),
            "Survey registry loaded"
        );
        Ok(registry)
    }
}

/// Run a future to completion on a single-threaded runtime.
pub fn block_on<F: Future>(future: F) -> Result<F::Output> {
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    Ok(rt.block_on(future))
}

pub fn read_configuration(path: &Path) -> Result<SurveyConfiguration> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    SurveyConfiguration::from_json(&text)
        .with_context(|| format!("Invalid survey configuration: {}", path.display()))
}

/// `*.json` files of the surveys directory, sorted by name.
fn survey_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.exists() {
        warn!(dir = %dir.display(), "Surveys directory does not exist");
        return Ok(Vec::new());
    }

    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)
        .with_context(|| format!("Failed to read surveys directory: {}", dir.display()))?
    {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "json") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}
