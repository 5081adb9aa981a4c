//! `fastsurvey verify`: promote a pending submission.

use super::{block_on, Context};
use anyhow::Result;
use std::process::ExitCode;

pub fn run(ctx: &Context, survey_key: &str, token: &str) -> Result<ExitCode> {
    block_on(run_async(ctx, survey_key, token))?
}

async fn run_async(ctx: &Context, survey_key: &str, token: &str) -> Result<ExitCode> {
    let registry = ctx.open_existing_registry().await?;
    let identity = registry.verify(survey_key, token).await?;
    println!("{}", identity);
    Ok(ExitCode::SUCCESS)
}
