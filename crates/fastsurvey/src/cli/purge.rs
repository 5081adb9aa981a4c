//! `fastsurvey purge`: apply the pending retention policy to one survey.

use super::{block_on, Context};
use anyhow::Result;
use std::process::ExitCode;

pub fn run(ctx: &Context, survey_key: &str) -> Result<ExitCode> {
    block_on(run_async(ctx, survey_key))?
}

async fn run_async(ctx: &Context, survey_key: &str) -> Result<ExitCode> {
    let registry = ctx.open_existing_registry().await?;
    let survey = registry.lookup(survey_key).await?;
    let purged = survey.purge_pending().await?;
    println!("Purged {} pending entries from {}", purged, survey.key());
    Ok(ExitCode::SUCCESS)
}
