//! `fastsurvey check`: compile a configuration and print the field tree.

use super::read_configuration;
use anyhow::{Context, Result};
use fastsurvey_schema::{compile, CompiledField};
use std::path::Path;
use std::process::ExitCode;

pub fn run(path: &Path) -> Result<ExitCode> {
    let configuration = read_configuration(path)?;
    let validator = compile(&configuration)
        .with_context(|| format!("Survey configuration does not compile: {}", path.display()))?;

    println!("{}", validator.survey_key());
    println!("  identity: {}", validator.identity_pattern());
    for field in validator.fields() {
        print_field(field, 1);
    }
    Ok(ExitCode::SUCCESS)
}

fn print_field(field: &CompiledField, depth: usize) {
    let rules: Vec<String> = field.rules().iter().map(ToString::to_string).collect();
    println!(
        "{:indent$}{:<8} {:<10} {}",
        "",
        field.path(),
        field.kind().as_str(),
        rules.join(" "),
        indent = depth * 2
    );
    for child in field.children() {
        print_field(child, depth + 1);
    }
}
