//! Survey Configuration Types
//!
//! A configuration is a declarative, recursive document: an ordered list of
//! fields, each with a `type` and an optional `properties` map holding
//! constraints and, for composite types, a nested `fields` list.
//!
//! ```json
//! {
//!     "admin_name": "fastsurvey",
//!     "survey_name": "test",
//!     "fields": [
//!         {"type": "Selection", "properties": {"max_select": 2, "fields": [
//!             {"type": "Option"},
//!             {"type": "List"}
//!         ]}},
//!         {"type": "Text", "properties": {"min_chars": 1, "max_chars": 400}}
//!     ]
//! }
//! ```
//!
//! Fields are addressed by their 1-based position in configuration order, so
//! reordering fields changes the shape submissions must have.

use crate::compiler::ConfigurationError;
use fastsurvey_ids::SurveyKey;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// The closed set of question types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldKind {
    /// E-mail address, checked against a format pattern
    Email,
    /// Free text
    Text,
    /// Single checkbox
    Option,
    /// Comma-separated entries typed as one string
    List,
    /// Group of options and lists with selection-count bounds
    Selection,
    /// Plain group of sub-questions
    Properties,
}

impl FieldKind {
    /// Composite kinds hold a keyed collection of child values.
    pub fn is_composite(self) -> bool {
        matches!(self, FieldKind::Selection | FieldKind::Properties)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FieldKind::Email => "Email",
            FieldKind::Text => "Text",
            FieldKind::Option => "Option",
            FieldKind::List => "List",
            FieldKind::Selection => "Selection",
            FieldKind::Properties => "Properties",
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One question node as written in a configuration document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldModel {
    #[serde(rename = "type")]
    pub kind: FieldKind,

    #[serde(default)]
    pub properties: FieldProperties,
}

/// The `properties` map of a field.
///
/// `title` and `description` label the question. Every other key except
/// `fields` is a constraint and is checked against the rule registry when
/// the configuration is compiled.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldProperties {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Child fields of a composite, in configuration order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<FieldModel>,

    #[serde(flatten)]
    pub constraints: BTreeMap<String, Value>,
}

impl FieldModel {
    pub fn new(kind: FieldKind) -> Self {
        Self {
            kind,
            properties: FieldProperties::default(),
        }
    }

    /// Attach a constraint (e.g. `max_chars`)
    pub fn with_constraint(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.constraints.insert(name.into(), value.into());
        self
    }

    /// Append a child field; its position is its 1-based index
    pub fn with_child(mut self, child: FieldModel) -> Self {
        self.properties.fields.push(child);
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.properties.title = Some(title.into());
        self
    }

    pub fn constraints(&self) -> &BTreeMap<String, Value> {
        &self.properties.constraints
    }

    /// Children paired with their 1-based position keys.
    pub fn children(&self) -> impl Iterator<Item = (usize, &FieldModel)> {
        self.properties
            .fields
            .iter()
            .enumerate()
            .map(|(index, child)| (index + 1, child))
    }
}

/// A survey definition: metadata plus the ordered top-level fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurveyConfiguration {
    /// Owning account
    pub admin_name: String,

    /// Survey name, unique per account
    pub survey_name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Pattern every respondent identity must fully match.
    /// Defaults to a general e-mail address pattern.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity_pattern: Option<String>,

    pub fields: Vec<FieldModel>,
}

impl SurveyConfiguration {
    pub fn new(admin_name: impl Into<String>, survey_name: impl Into<String>) -> Self {
        Self {
            admin_name: admin_name.into(),
            survey_name: survey_name.into(),
            title: None,
            identity_pattern: None,
            fields: Vec::new(),
        }
    }

    /// Parse a configuration document.
    pub fn from_json(document: &str) -> Result<Self, ConfigurationError> {
        serde_json::from_str(document).map_err(ConfigurationError::from)
    }

    pub fn with_field(mut self, field: FieldModel) -> Self {
        self.fields.push(field);
        self
    }

    pub fn with_identity_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.identity_pattern = Some(pattern.into());
        self
    }

    /// Address of this survey (`<admin_name>.<survey_name>`).
    pub fn survey_key(&self) -> Result<SurveyKey, ConfigurationError> {
        SurveyKey::new(self.admin_name.as_str(), self.survey_name.as_str())
            .map_err(ConfigurationError::from)
    }
}
