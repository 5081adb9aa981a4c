//! Identifier wrappers for FastSurvey.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Error returned when an identifier fails to parse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdParseError {
    message: String,
}

impl IdParseError {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for IdParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for IdParseError {}

/// Opaque capability identifying one pending submission.
///
/// Freshly issued tokens are random v4 UUIDs. Tokens read back from storage
/// or received from a verification link are accepted verbatim: an unknown
/// token is a lookup miss, not a parse failure.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubmissionToken(String);

impl SubmissionToken {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Wrap a token string without checking its shape.
    pub fn from_raw(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Parse a token, requiring the UUID shape issued by [`SubmissionToken::new`].
    pub fn parse(value: &str) -> Result<Self, IdParseError> {
        Uuid::parse_str(value)
            .map_err(|e| IdParseError::new(format!("Invalid submission token: {}", e)))?;
        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SubmissionToken {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SubmissionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Survey address: `<admin_name>.<survey_name>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SurveyKey {
    admin_name: String,
    survey_name: String,
}

impl SurveyKey {
    pub fn new(
        admin_name: impl Into<String>,
        survey_name: impl Into<String>,
    ) -> Result<Self, IdParseError> {
        let admin_name = admin_name.into();
        let survey_name = survey_name.into();
        validate_segment("admin name", &admin_name)?;
        validate_segment("survey name", &survey_name)?;
        Ok(Self {
            admin_name,
            survey_name,
        })
    }

    pub fn parse(value: &str) -> Result<Self, IdParseError> {
        let (admin_name, survey_name) = value.split_once('.').ok_or_else(|| {
            IdParseError::new(format!(
                "Invalid survey key '{}': expected <admin_name>.<survey_name>",
                value
            ))
        })?;
        Self::new(admin_name, survey_name)
    }

    pub fn admin_name(&self) -> &str {
        &self.admin_name
    }

    pub fn survey_name(&self) -> &str {
        &self.survey_name
    }
}

fn validate_segment(label: &str, value: &str) -> Result<(), IdParseError> {
    if value.is_empty() {
        return Err(IdParseError::new(format!("Invalid {}: empty", label)));
    }
    if let Some(ch) = value
        .chars()
        .find(|ch| !(ch.is_ascii_alphanumeric() || *ch == '-' || *ch == '_'))
    {
        return Err(IdParseError::new(format!(
            "Invalid {} '{}': unexpected character '{}'",
            label, value, ch
        )));
    }
    Ok(())
}

impl fmt::Display for SurveyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.admin_name, self.survey_name)
    }
}

impl std::str::FromStr for SurveyKey {
    type Err = IdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for SurveyKey {
    type Error = IdParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<SurveyKey> for String {
    fn from(key: SurveyKey) -> Self {
        key.to_string()
    }
}
