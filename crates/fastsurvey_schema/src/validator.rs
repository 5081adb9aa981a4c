//! Submission Validator
//!
//! A [`Validator`] is the compiled form of a survey configuration. It holds no
//! mutable state and performs no I/O, so one instance can be shared behind an
//! `Arc` by any number of concurrent requests.
//!
//! Validation is all-fields-required and never stops at the first problem:
//! every violation in the submission is collected and returned together.

use crate::field::FieldKind;
use crate::rules::{self, Pattern, Rule};
use crate::violation::{FieldViolation, Violations};
use fastsurvey_ids::SurveyKey;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Path used for violations of the respondent identity.
pub const IDENTITY_PATH: &str = "identity";

/// Path used when the answers root itself is malformed.
pub const ANSWERS_PATH: &str = "answers";

/// A respondent's candidate answer.
///
/// `answers` mirrors the configured field tree positionally: keys are the
/// 1-based position strings `"1"`, `"2"`, ... at every level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Submission {
    #[serde(alias = "email")]
    pub identity: String,

    #[serde(alias = "properties")]
    pub answers: Value,
}

impl Submission {
    pub fn new(identity: impl Into<String>, answers: Value) -> Self {
        Self {
            identity: identity.into(),
            answers,
        }
    }
}

/// Compiled survey schema.
#[derive(Debug)]
pub struct Validator {
    survey_key: SurveyKey,
    identity: Pattern,
    fields: Vec<CompiledField>,
}

/// One compiled field node.
#[derive(Debug)]
pub struct CompiledField {
    position: usize,
    key: String,
    path: String,
    kind: FieldKind,
    rules: Vec<Rule>,
    children: Vec<CompiledField>,
}

impl CompiledField {
    pub(crate) fn new(
        position: usize,
        path: String,
        kind: FieldKind,
        rules: Vec<Rule>,
        children: Vec<CompiledField>,
    ) -> Self {
        Self {
            position,
            key: position.to_string(),
            path,
            kind,
            rules,
            children,
        }
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn kind(&self) -> FieldKind {
        self.kind
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn children(&self) -> &[CompiledField] {
        &self.children
    }

    fn check(&self, value: &Value, out: &mut Violations) {
        match (self.kind, value) {
            (FieldKind::Email | FieldKind::Text | FieldKind::List, Value::String(text)) => {
                for rule in &self.rules {
                    if let Some(message) = rule.check_text(text) {
                        out.push(FieldViolation::new(&self.path, message));
                    }
                }
            }
            (FieldKind::Option, Value::Bool(_)) => {}
            (FieldKind::Selection, Value::Object(map)) => {
                check_members(&self.children, map, Some(&self.path), out);
                let count = rules::count_selections(
                    self.children.iter().map(|c| (c.key.as_str(), c.kind)),
                    map,
                );
                for rule in &self.rules {
                    if let Some(message) = rule.check_selection(count) {
                        out.push(FieldViolation::new(&self.path, message));
                    }
                }
            }
            (FieldKind::Properties, Value::Object(map)) => {
                check_members(&self.children, map, Some(&self.path), out);
            }
            _ => out.push(FieldViolation::new(
                &self.path,
                format!("must be of {} type", self.kind),
            )),
        }
    }
}

/// Check a mapping node against its declared children: every child present
/// and valid, no undeclared keys.
fn check_members(
    children: &[CompiledField],
    map: &Map<String, Value>,
    parent_path: Option<&str>,
    out: &mut Violations,
) {
    for child in children {
        match map.get(&child.key) {
            Some(value) => child.check(value, out),
            None => out.push(FieldViolation::new(&child.path, "required field")),
        }
    }

    for key in map.keys() {
        if !children.iter().any(|child| child.key == *key) {
            let path = match parent_path {
                Some(parent) => format!("{}.{}", parent, key),
                None => key.clone(),
            };
            out.push(FieldViolation::new(path, "unknown field"));
        }
    }
}

impl Validator {
    pub(crate) fn new(survey_key: SurveyKey, identity: Pattern, fields: Vec<CompiledField>) -> Self {
        Self {
            survey_key,
            identity,
            fields,
        }
    }

    pub fn survey_key(&self) -> &SurveyKey {
        &self.survey_key
    }

    pub fn fields(&self) -> &[CompiledField] {
        &self.fields
    }

    /// Pattern respondent identities must fully match.
    pub fn identity_pattern(&self) -> &str {
        self.identity.as_str()
    }

    /// Validate a full submission: identity plus answers.
    pub fn validate(&self, submission: &Submission) -> Result<(), Violations> {
        let mut out = Violations::new();
        if !self.identity.is_match(&submission.identity) {
            out.push(FieldViolation::new(
                IDENTITY_PATH,
                format!(
                    "value does not match regex '{}'",
                    self.identity.as_str()
                ),
            ));
        }
        self.collect_answer_violations(&submission.answers, &mut out);

        if out.is_empty() {
            Ok(())
        } else {
            Err(out)
        }
    }

    /// Validate an answers tree on its own.
    pub fn validate_answers(&self, answers: &Value) -> Result<(), Violations> {
        let mut out = Violations::new();
        self.collect_answer_violations(answers, &mut out);
        if out.is_empty() {
            Ok(())
        } else {
            Err(out)
        }
    }

    fn collect_answer_violations(&self, answers: &Value, out: &mut Violations) {
        match answers {
            Value::Object(map) => check_members(&self.fields, map, None, out),
            _ => out.push(FieldViolation::new(ANSWERS_PATH, "must be of dict type")),
        }
    }
}

/// Validate `submission` against `validator`.
pub fn validate(validator: &Validator, submission: &Submission) -> Result<(), Violations> {
    validator.validate(submission)
}
