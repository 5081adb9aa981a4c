//! `fastsurvey submit`: validate and store a submission.

use super::{block_on, Context};
use anyhow::{Context as _, Result};
use fastsurvey::SurveyError;
use serde_json::Value;
use std::path::Path;
use std::process::ExitCode;

/// Exit code for a submission rejected by validation.
const EXIT_REJECTED: u8 = 2;

pub fn run(ctx: &Context, survey_key: &str, submission: &Path) -> Result<ExitCode> {
    let text = std::fs::read_to_string(submission)
        .with_context(|| format!("Failed to read {}", submission.display()))?;
    let body: Value = serde_json::from_str(&text)
        .with_context(|| format!("Submission is not valid JSON: {}", submission.display()))?;

    block_on(run_async(ctx, survey_key, body))?
}

async fn run_async(ctx: &Context, survey_key: &str, body: Value) -> Result<ExitCode> {
    let registry = ctx.open_registry().await?;
    match registry.submit(survey_key, body).await {
        Ok(receipt) => {
            println!("{}", receipt.token);
            Ok(ExitCode::SUCCESS)
        }
        Err(SurveyError::Validation(violations)) => {
            println!("{}", serde_json::to_string_pretty(&violations.to_map())?);
            Ok(ExitCode::from(EXIT_REJECTED))
        }
        Err(err) => Err(err.into()),
    }
}
