//! Schema Compiler
//!
//! Turns a [`SurveyConfiguration`] into an immutable [`Validator`]. Compilation
//! is pure and fail-fast: the first structural problem aborts it, because a
//! partially compiled schema must never accept submissions.

use crate::field::{FieldKind, FieldModel, SurveyConfiguration};
use crate::rules::{self, Pattern, Rule, DEFAULT_EMAIL_PATTERN};
use crate::validator::{CompiledField, Validator};
use fastsurvey_ids::IdParseError;
use thiserror::Error;
use tracing::debug;

/// Errors that make a survey configuration unusable.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("Invalid configuration document: {0}")]
    Document(#[from] serde_json::Error),

    #[error("Invalid survey key: {0}")]
    SurveyKey(#[from] IdParseError),

    #[error("Field {path}: {kind} field declares no child fields")]
    MissingChildren { path: String, kind: FieldKind },

    #[error("Field {path}: {kind} field cannot declare child fields")]
    UnexpectedChildren { path: String, kind: FieldKind },

    #[error("Field {path}: unknown constraint '{name}' for {kind} field")]
    UnknownConstraint {
        path: String,
        name: String,
        kind: FieldKind,
    },

    #[error("Field {path}: constraint '{name}' {message}")]
    InvalidConstraint {
        path: String,
        name: String,
        message: String,
    },

    #[error("Field {path}: {min_name} ({min}) exceeds {max_name} ({max})")]
    InvertedBounds {
        path: String,
        min_name: &'static str,
        min: usize,
        max_name: &'static str,
        max: usize,
    },

    #[error("Invalid identity pattern '{pattern}': {message}")]
    IdentityPattern { pattern: String, message: String },
}

/// Compile a survey configuration into a validator.
pub fn compile(configuration: &SurveyConfiguration) -> Result<Validator, ConfigurationError> {
    let survey_key = configuration.survey_key()?;

    let identity_source = configuration
        .identity_pattern
        .as_deref()
        .unwrap_or(DEFAULT_EMAIL_PATTERN);
    let identity = Pattern::new(identity_source).map_err(|e| ConfigurationError::IdentityPattern {
        pattern: identity_source.to_string(),
        message: e.to_string(),
    })?;

    let fields = configuration
        .fields
        .iter()
        .enumerate()
        .map(|(index, field)| compile_field(index + 1, None, field))
        .collect::<Result<Vec<_>, _>>()?;

    debug!(
        survey = %survey_key,
        fields = fields.len(),
        "Compiled survey configuration"
    );

    Ok(Validator::new(survey_key, identity, fields))
}

fn compile_field(
    position: usize,
    parent_path: Option<&str>,
    field: &FieldModel,
) -> Result<CompiledField, ConfigurationError> {
    let path = match parent_path {
        Some(parent) => format!("{}.{}", parent, position),
        None => position.to_string(),
    };

    let declared_children = !field.properties.fields.is_empty();
    if field.kind.is_composite() && !declared_children {
        return Err(ConfigurationError::MissingChildren {
            path,
            kind: field.kind,
        });
    }
    if !field.kind.is_composite() && declared_children {
        return Err(ConfigurationError::UnexpectedChildren {
            path,
            kind: field.kind,
        });
    }

    let mut compiled_rules = field
        .constraints()
        .iter()
        .map(|(name, value)| rules::build(&path, field.kind, name, value))
        .collect::<Result<Vec<_>, _>>()?;

    check_bounds(&path, &compiled_rules)?;

    if field.kind == FieldKind::Email
        && !compiled_rules.iter().any(|rule| matches!(rule, Rule::Pattern(_)))
    {
        let default = Pattern::new(DEFAULT_EMAIL_PATTERN).map_err(|e| {
            ConfigurationError::InvalidConstraint {
                path: path.clone(),
                name: "regex".to_string(),
                message: e.to_string(),
            }
        })?;
        compiled_rules.push(Rule::Pattern(default));
    }

    let children = field
        .children()
        .map(|(child_position, child)| compile_field(child_position, Some(&path), child))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(CompiledField::new(
        position,
        path,
        field.kind,
        compiled_rules,
        children,
    ))
}

fn check_bounds(path: &str, compiled: &[Rule]) -> Result<(), ConfigurationError> {
    for (min_name, max_name) in [("min_chars", "max_chars"), ("min_select", "max_select")] {
        if let (Some(min), Some(max)) = (bound_of(compiled, min_name), bound_of(compiled, max_name)) {
            if min > max {
                return Err(ConfigurationError::InvertedBounds {
                    path: path.to_string(),
                    min_name,
                    min,
                    max_name,
                    max,
                });
            }
        }
    }
    Ok(())
}

fn bound_of(compiled: &[Rule], name: &str) -> Option<usize> {
    compiled.iter().find_map(|rule| match rule {
        Rule::MinChars(n) | Rule::MaxChars(n) | Rule::MinSelect(n) | Rule::MaxSelect(n)
            if rule.name() == name =>
        {
            Some(*n)
        }
        _ => None,
    })
}
