//! Survey registry: routes requests to live surveys by survey key.

use crate::error::{Result, SurveyError};
use crate::retention::{KeepAll, RetentionPolicy};
use crate::survey::{Receipt, Survey};
use fastsurvey_db::SurveyDb;
use fastsurvey_ids::SurveyKey;
use fastsurvey_schema::validator::{ANSWERS_PATH, IDENTITY_PATH};
use fastsurvey_schema::{compile, FieldViolation, Submission, SurveyConfiguration, Violations};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};

/// Live surveys sharing one store.
///
/// Re-registering a key swaps in a freshly compiled survey. Requests that
/// already hold the previous survey finish against it.
#[derive(Debug)]
pub struct SurveyRegistry {
    db: SurveyDb,
    retention: Arc<dyn RetentionPolicy>,
    surveys: RwLock<HashMap<SurveyKey, Arc<Survey>>>,
}

impl SurveyRegistry {
    pub fn new(db: SurveyDb) -> Self {
        Self {
            db,
            retention: Arc::new(KeepAll),
            surveys: RwLock::new(HashMap::new()),
        }
    }

    /// Retention policy applied to every survey registered afterwards.
    pub fn with_retention(mut self, retention: Arc<dyn RetentionPolicy>) -> Self {
        self.retention = retention;
        self
    }

    /// Compile and register a survey configuration.
    ///
    /// A configuration that does not compile withdraws any survey already
    /// registered under its key: requests get `UnknownSurvey` until a valid
    /// configuration is registered again.
    pub async fn register(&self, configuration: &SurveyConfiguration) -> Result<SurveyKey> {
        let validator = match compile(configuration) {
            Ok(validator) => validator,
            Err(err) => {
                if let Ok(key) = configuration.survey_key() {
                    if self.surveys.write().await.remove(&key).is_some() {
                        warn!(survey = %key, error = %err, "Survey withdrawn after failed compile");
                    }
                }
                return Err(err.into());
            }
        };
        let survey = Survey::from_validator(Arc::new(validator), self.db.clone())
            .with_retention(self.retention.clone());
        let key = survey.key().clone();

        let replaced = self
            .surveys
            .write()
            .await
            .insert(key.clone(), Arc::new(survey))
            .is_some();

        info!(survey = %key, replaced, "Survey registered");
        Ok(key)
    }

    /// Remove a survey. Stored entries are kept.
    pub async fn unregister(&self, key: &SurveyKey) -> bool {
        self.surveys.write().await.remove(key).is_some()
    }

    pub async fn get(&self, key: &SurveyKey) -> Result<Arc<Survey>> {
        self.surveys
            .read()
            .await
            .get(key)
            .cloned()
            .ok_or_else(|| SurveyError::UnknownSurvey(key.to_string()))
    }

    /// Look up a survey by its textual key (`<admin_name>.<survey_name>`).
    pub async fn lookup(&self, survey_key: &str) -> Result<Arc<Survey>> {
        let key = SurveyKey::parse(survey_key)
            .map_err(|_| SurveyError::UnknownSurvey(survey_key.to_string()))?;
        self.get(&key).await
    }

    /// Registered survey keys, sorted.
    pub async fn keys(&self) -> Vec<SurveyKey> {
        let mut keys: Vec<_> = self.surveys.read().await.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Submit a raw request body to a survey.
    ///
    /// The body carries `identity` (or `email`) and `answers` (or
    /// `properties`). A malformed envelope is reported as violations, the
    /// same way as malformed answers.
    pub async fn submit(&self, survey_key: &str, body: Value) -> Result<Receipt> {
        let survey = self.lookup(survey_key).await?;
        let submission = submission_from_body(body)?;
        survey.submit(submission).await
    }

    pub async fn verify(&self, survey_key: &str, token: &str) -> Result<String> {
        let survey = self.lookup(survey_key).await?;
        survey.verify(token).await
    }
}

fn submission_from_body(body: Value) -> std::result::Result<Submission, Violations> {
    let Value::Object(mut body) = body else {
        let mut violations = Violations::new();
        violations.push(FieldViolation::new(IDENTITY_PATH, "required field"));
        violations.push(FieldViolation::new(ANSWERS_PATH, "required field"));
        return Err(violations);
    };

    let mut violations = Violations::new();
    let identity = match body.remove("identity").or_else(|| body.remove("email")) {
        Some(Value::String(identity)) => identity,
        Some(_) => {
            violations.push(FieldViolation::new(IDENTITY_PATH, "must be of string type"));
            String::new()
        }
        None => {
            violations.push(FieldViolation::new(IDENTITY_PATH, "required field"));
            String::new()
        }
    };
    let answers = body.remove("answers").or_else(|| body.remove("properties"));

    match answers {
        Some(answers) if violations.is_empty() => Ok(Submission::new(identity, answers)),
        Some(_) => Err(violations),
        None => {
            violations.push(FieldViolation::new(ANSWERS_PATH, "required field"));
            Err(violations)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fastsurvey_schema::{FieldKind, FieldModel};
    use serde_json::json;

    fn configuration(max_chars: u64) -> SurveyConfiguration {
        SurveyConfiguration::new("fastsurvey", "registry")
            .with_field(FieldModel::new(FieldKind::Text).with_constraint("max_chars", max_chars))
    }

    async fn registry() -> SurveyRegistry {
        SurveyRegistry::new(SurveyDb::open_memory().await.unwrap())
    }

    #[tokio::test]
    async fn test_unknown_survey() {
        let registry = registry().await;
        let err = registry
            .submit("fastsurvey.missing", json!({"identity": "a@b.de", "answers": {}}))
            .await
            .unwrap_err();
        assert!(matches!(err, SurveyError::UnknownSurvey(ref k) if k == "fastsurvey.missing"));

        let err = registry.verify("not a key", "tomato").await.unwrap_err();
        assert!(matches!(err, SurveyError::UnknownSurvey(_)));
    }

    #[tokio::test]
    async fn test_legacy_body_keys_are_accepted() {
        let registry = registry().await;
        registry.register(&configuration(10)).await.unwrap();

        let receipt = registry
            .submit(
                "fastsurvey.registry",
                json!({"email": "a@b.de", "properties": {"1": "hello"}}),
            )
            .await
            .unwrap();
        let identity = registry
            .verify("fastsurvey.registry", receipt.token.as_str())
            .await
            .unwrap();
        assert_eq!(identity, "a@b.de");
    }

    #[tokio::test]
    async fn test_malformed_envelope_reports_violations() {
        let registry = registry().await;
        registry.register(&configuration(10)).await.unwrap();

        let err = registry
            .submit("fastsurvey.registry", json!({"identity": 7}))
            .await
            .unwrap_err();
        let map = err.violations().unwrap().to_map();
        assert_eq!(map["identity"], vec!["must be of string type"]);
        assert_eq!(map["answers"], vec!["required field"]);

        let err = registry
            .submit("fastsurvey.registry", json!("not an object"))
            .await
            .unwrap_err();
        assert_eq!(err.violations().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_reregister_swaps_validator() {
        let registry = registry().await;
        let key = registry.register(&configuration(3)).await.unwrap();
        let old = registry.get(&key).await.unwrap();

        registry.register(&configuration(10)).await.unwrap();
        let body = json!({"identity": "a@b.de", "answers": {"1": "hello"}});

        // The swapped-in survey accepts what the old one rejects.
        assert!(registry.submit("fastsurvey.registry", body.clone()).await.is_ok());
        let submission = submission_from_body(body).unwrap();
        assert!(matches!(
            old.submit(submission).await,
            Err(SurveyError::Validation(_))
        ));
        assert_eq!(registry.keys().await, vec![key]);
    }

    #[tokio::test]
    async fn test_failed_registration_withdraws_previous_survey() {
        let registry = registry().await;
        let key = registry.register(&configuration(3)).await.unwrap();
        let body = json!({"identity": "a@b.de", "answers": {"1": "hi"}});
        assert!(registry.submit("fastsurvey.registry", body.clone()).await.is_ok());

        let broken = SurveyConfiguration::new("fastsurvey", "registry")
            .with_field(FieldModel::new(FieldKind::Selection));
        assert!(matches!(
            registry.register(&broken).await,
            Err(SurveyError::Configuration(_))
        ));

        assert!(matches!(
            registry.submit("fastsurvey.registry", body.clone()).await,
            Err(SurveyError::UnknownSurvey(_))
        ));
        assert!(matches!(
            registry.verify("fastsurvey.registry", "tomato").await,
            Err(SurveyError::UnknownSurvey(_))
        ));
        assert!(registry.keys().await.is_empty());

        // A fixed configuration brings the survey back.
        registry.register(&configuration(3)).await.unwrap();
        assert!(registry.submit("fastsurvey.registry", body).await.is_ok());
    }

    #[tokio::test]
    async fn test_unregister() {
        let registry = registry().await;
        let key = registry.register(&configuration(3)).await.unwrap();
        assert!(registry.unregister(&key).await);
        assert!(registry.get(&key).await.is_err());
        assert!(!registry.unregister(&key).await);
    }
}
