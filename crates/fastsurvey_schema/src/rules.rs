//! Constraint rule registry.
//!
//! Every constraint name a configuration may use is listed in [`REGISTRY`]
//! together with the field kinds it applies to and a builder that checks its
//! argument. Names outside the registry, or used on a kind the rule does not
//! apply to, are configuration errors.

use crate::compiler::ConfigurationError;
use crate::field::FieldKind;
use regex::Regex;
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::fmt;

/// Pattern used for `Email` fields that declare no `regex` and for
/// respondent identities when the survey declares no `identity_pattern`.
pub const DEFAULT_EMAIL_PATTERN: &str = r"[^@\s]+@[^@\s]+\.[^@\s]+";

/// A compiled constraint attached to one field.
#[derive(Debug, Clone)]
pub enum Rule {
    MinChars(usize),
    MaxChars(usize),
    MinSelect(usize),
    MaxSelect(usize),
    Pattern(Pattern),
}

/// A regular expression that must match the whole value.
#[derive(Clone)]
pub struct Pattern {
    source: String,
    regex: Regex,
}

impl Pattern {
    pub fn new(source: &str) -> Result<Self, regex::Error> {
        let regex = Regex::new(&format!("^(?:{})$", source))?;
        Ok(Self {
            source: source.to_string(),
            regex,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn is_match(&self, value: &str) -> bool {
        self.regex.is_match(value)
    }
}

impl fmt::Debug for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Pattern").field(&self.source).finish()
    }
}

/// Registry entry: rule name, applicable kinds, argument builder.
pub struct RuleSpec {
    pub name: &'static str,
    pub applies_to: &'static [FieldKind],
    build: fn(&str, &str, &Value) -> Result<Rule, ConfigurationError>,
}

impl RuleSpec {
    pub fn applies_to(&self, kind: FieldKind) -> bool {
        self.applies_to.contains(&kind)
    }
}

const STRING_KINDS: &[FieldKind] = &[FieldKind::Email, FieldKind::Text, FieldKind::List];
const PATTERN_KINDS: &[FieldKind] = &[FieldKind::Email, FieldKind::Text];
const SELECTION_KINDS: &[FieldKind] = &[FieldKind::Selection];

pub const REGISTRY: &[RuleSpec] = &[
    RuleSpec {
        name: "min_chars",
        applies_to: STRING_KINDS,
        build: min_chars,
    },
    RuleSpec {
        name: "max_chars",
        applies_to: STRING_KINDS,
        build: max_chars,
    },
    RuleSpec {
        name: "min_select",
        applies_to: SELECTION_KINDS,
        build: min_select,
    },
    RuleSpec {
        name: "max_select",
        applies_to: SELECTION_KINDS,
        build: max_select,
    },
    RuleSpec {
        name: "regex",
        applies_to: PATTERN_KINDS,
        build: pattern,
    },
];

/// Find the registry entry for a constraint name.
pub fn lookup(name: &str) -> Option<&'static RuleSpec> {
    REGISTRY.iter().find(|spec| spec.name == name)
}

/// Build the rule for constraint `name` on a `kind` field at `path`.
pub(crate) fn build(
    path: &str,
    kind: FieldKind,
    name: &str,
    value: &Value,
) -> Result<Rule, ConfigurationError> {
    let spec = lookup(name)
        .filter(|spec| spec.applies_to(kind))
        .ok_or_else(|| ConfigurationError::UnknownConstraint {
            path: path.to_string(),
            name: name.to_string(),
            kind,
        })?;
    (spec.build)(path, name, value)
}

fn min_chars(path: &str, name: &str, value: &Value) -> Result<Rule, ConfigurationError> {
    bound(path, name, value).map(Rule::MinChars)
}

fn max_chars(path: &str, name: &str, value: &Value) -> Result<Rule, ConfigurationError> {
    bound(path, name, value).map(Rule::MaxChars)
}

fn min_select(path: &str, name: &str, value: &Value) -> Result<Rule, ConfigurationError> {
    bound(path, name, value).map(Rule::MinSelect)
}

fn max_select(path: &str, name: &str, value: &Value) -> Result<Rule, ConfigurationError> {
    bound(path, name, value).map(Rule::MaxSelect)
}

fn bound(path: &str, name: &str, value: &Value) -> Result<usize, ConfigurationError> {
    value
        .as_u64()
        .and_then(|n| usize::try_from(n).ok())
        .ok_or_else(|| ConfigurationError::InvalidConstraint {
            path: path.to_string(),
            name: name.to_string(),
            message: format!("expects a non-negative integer, got {}", value),
        })
}

fn pattern(path: &str, name: &str, value: &Value) -> Result<Rule, ConfigurationError> {
    let source = value
        .as_str()
        .ok_or_else(|| ConfigurationError::InvalidConstraint {
            path: path.to_string(),
            name: name.to_string(),
            message: format!("expects a string, got {}", value),
        })?;
    Pattern::new(source)
        .map(Rule::Pattern)
        .map_err(|e| ConfigurationError::InvalidConstraint {
            path: path.to_string(),
            name: name.to_string(),
            message: format!("is not a valid regular expression: {}", e),
        })
}

impl Rule {
    pub fn name(&self) -> &'static str {
        match self {
            Rule::MinChars(_) => "min_chars",
            Rule::MaxChars(_) => "max_chars",
            Rule::MinSelect(_) => "min_select",
            Rule::MaxSelect(_) => "max_select",
            Rule::Pattern(_) => "regex",
        }
    }

    /// Check a string-valued node. Returns the violation message, if any.
    pub(crate) fn check_text(&self, value: &str) -> Option<String> {
        match self {
            Rule::MinChars(min) if value.chars().count() < *min => {
                Some(format!("Must be at least {} characters long", min))
            }
            Rule::MaxChars(max) if value.chars().count() > *max => {
                Some(format!("Must be at most {} characters long", max))
            }
            Rule::Pattern(pattern) if !pattern.is_match(value) => Some(format!(
                "value does not match regex '{}'",
                pattern.as_str()
            )),
            _ => None,
        }
    }

    /// Check a selection given its computed selection count.
    pub(crate) fn check_selection(&self, count: usize) -> Option<String> {
        match self {
            Rule::MinSelect(min) if count < *min => {
                Some(format!("Must select at least {} options", min))
            }
            Rule::MaxSelect(max) if count > *max => {
                Some(format!("Must select at most {} options", max))
            }
            _ => None,
        }
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rule::MinChars(n) | Rule::MaxChars(n) | Rule::MinSelect(n) | Rule::MaxSelect(n) => {
                write!(f, "{}={}", self.name(), n)
            }
            Rule::Pattern(pattern) => write!(f, "{}='{}'", self.name(), pattern.as_str()),
        }
    }
}

/// Count the selections of a Selection node.
///
/// `children` pairs each child's position key with its kind. Every `Option`
/// child set to `true` counts once; every `List` child contributes its
/// distinct non-empty entries after trimming. Other children do not count.
pub(crate) fn count_selections<'a>(
    children: impl Iterator<Item = (&'a str, FieldKind)>,
    value: &Map<String, Value>,
) -> usize {
    let mut count = 0;
    for (key, kind) in children {
        match (kind, value.get(key)) {
            (FieldKind::Option, Some(Value::Bool(true))) => count += 1,
            (FieldKind::List, Some(Value::String(entries))) => count += list_entries(entries).len(),
            _ => {}
        }
    }
    count
}

/// Distinct, trimmed, non-empty entries of a comma-separated list.
pub fn list_entries(raw: &str) -> HashSet<&str> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .collect()
}
