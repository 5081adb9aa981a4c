//! Pending/verified workflow against real SQLite stores.

use std::sync::Arc;

use fastsurvey::{Survey, SurveyError, SurveyRegistry};
use fastsurvey_db::{PendingEntry, SurveyDb, VerifiedEntry};
use fastsurvey_ids::SubmissionToken;
use fastsurvey_schema::{Submission, SurveyConfiguration};
use serde_json::{json, Value};
use tempfile::TempDir;

const TEST_SURVEY: &str = r#"{
    "admin_name": "fastsurvey",
    "survey_name": "test",
    "identity_pattern": "[a-z]{2}[0-9]{2}[a-z]{3}@mytum\\.de",
    "fields": [
        {
            "type": "Selection",
            "properties": {
                "min_select": 0,
                "max_select": 2,
                "fields": [
                    {"type": "Option"},
                    {"type": "Option"},
                    {"type": "Text", "properties": {"max_chars": 0}}
                ]
            }
        },
        {"type": "Text", "properties": {"min_chars": 1, "max_chars": 100}}
    ]
}"#;

const IDENTITY: &str = "aa00aaa@mytum.de";

fn configuration() -> SurveyConfiguration {
    SurveyConfiguration::from_json(TEST_SURVEY).unwrap()
}

fn valid_answers() -> Value {
    json!({"1": {"1": true, "2": true, "3": ""}, "2": "insert very good reason here"})
}

async fn memory_survey() -> (Survey, SurveyDb) {
    let db = SurveyDb::open_memory().await.unwrap();
    let survey = Survey::new(&configuration(), db.clone()).unwrap();
    (survey, db)
}

// =============================================================================
// SUBMIT
// =============================================================================

#[tokio::test]
async fn test_submit_persists_identical_answers() {
    let (survey, _db) = memory_survey().await;

    let receipt = survey
        .submit(Submission::new(IDENTITY, valid_answers()))
        .await
        .unwrap();

    let pending = survey.get_pending(receipt.token.as_str()).await.unwrap().unwrap();
    assert_eq!(pending.identity, IDENTITY);
    assert_eq!(pending.answers, valid_answers());
    assert_eq!(pending.timestamp, receipt.timestamp);
    assert_eq!(survey.verified_count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_rejected_submission_persists_nothing() {
    let (survey, _db) = memory_survey().await;

    let err = survey
        .submit(Submission::new(
            IDENTITY,
            json!({"1": {"1": 5, "2": true, "3": ""}, "2": "insert very good reason here"}),
        ))
        .await
        .unwrap_err();

    let violations = err.violations().expect("validation failure");
    assert_eq!(violations.for_path("1.1"), vec!["must be of Option type"]);
    assert_eq!(survey.pending_count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_identity_outside_pattern_is_rejected() {
    let (survey, _db) = memory_survey().await;

    let err = survey
        .submit(Submission::new("someone@example.com", valid_answers()))
        .await
        .unwrap_err();

    assert!(!err.violations().unwrap().for_path("identity").is_empty());
    assert_eq!(survey.pending_count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_each_submission_gets_a_fresh_token() {
    let (survey, _db) = memory_survey().await;

    let first = survey.submit(Submission::new(IDENTITY, valid_answers())).await.unwrap();
    let second = survey.submit(Submission::new(IDENTITY, valid_answers())).await.unwrap();

    assert_ne!(first.token, second.token);
    assert_eq!(survey.pending_count().await.unwrap(), 2);
}

// =============================================================================
// VERIFY
// =============================================================================

#[tokio::test]
async fn test_verify_replaces_existing_record_and_keeps_pending() {
    let (survey, db) = memory_survey().await;
    let key = survey.key().clone();

    db.verified_upsert(
        &key,
        &VerifiedEntry {
            identity: IDENTITY.to_string(),
            timestamp: SurveyDb::millis_to_datetime(1_590_228_043_000).unwrap(),
            answers: json!({"data": "radish"}),
        },
    )
    .await
    .unwrap();

    let pending = PendingEntry {
        token: SubmissionToken::from_raw("tomato"),
        identity: IDENTITY.to_string(),
        timestamp: SurveyDb::millis_to_datetime(1_590_228_251_000).unwrap(),
        answers: json!({"data": "cucumber"}),
    };
    db.pending_insert(&key, &pending).await.unwrap();

    assert_eq!(survey.verify("tomato").await.unwrap(), IDENTITY);

    let verified = survey.get_verified(IDENTITY).await.unwrap().unwrap();
    assert_eq!(verified, VerifiedEntry::from(pending.clone()));
    assert_eq!(survey.get_pending("tomato").await.unwrap(), Some(pending));
}

#[tokio::test]
async fn test_unknown_token_changes_nothing() {
    let (survey, db) = memory_survey().await;
    let key = survey.key().clone();

    let existing = VerifiedEntry {
        identity: IDENTITY.to_string(),
        timestamp: SurveyDb::millis_to_datetime(1_590_228_043_000).unwrap(),
        answers: json!({"data": "radish"}),
    };
    db.verified_upsert(&key, &existing).await.unwrap();
    survey.submit(Submission::new(IDENTITY, valid_answers())).await.unwrap();

    let err = survey.verify("peach").await.unwrap_err();
    assert!(matches!(err, SurveyError::UnknownToken(ref t) if t == "peach"));

    assert_eq!(survey.list_verified().await.unwrap(), vec![existing]);
    assert_eq!(survey.pending_count().await.unwrap(), 1);
}

#[tokio::test]
async fn test_second_token_fully_replaces_verified_record() {
    let (survey, _db) = memory_survey().await;

    let first = survey
        .submit(Submission::new(
            IDENTITY,
            json!({"1": {"1": true, "2": false, "3": ""}, "2": "first"}),
        ))
        .await
        .unwrap();
    let second = survey
        .submit(Submission::new(
            IDENTITY,
            json!({"1": {"1": false, "2": true, "3": ""}, "2": "second"}),
        ))
        .await
        .unwrap();

    survey.verify(first.token.as_str()).await.unwrap();
    survey.verify(second.token.as_str()).await.unwrap();

    let verified = survey.list_verified().await.unwrap();
    assert_eq!(verified.len(), 1);
    assert_eq!(verified[0].timestamp, second.timestamp);
    assert_eq!(
        verified[0].answers,
        json!({"1": {"1": false, "2": true, "3": ""}, "2": "second"})
    );
}

#[tokio::test]
async fn test_stale_token_can_be_verified_again() {
    let (survey, _db) = memory_survey().await;

    let first = survey
        .submit(Submission::new(IDENTITY, json!({"1": {"1": true, "2": false, "3": ""}, "2": "a"})))
        .await
        .unwrap();
    let second = survey
        .submit(Submission::new(IDENTITY, json!({"1": {"1": false, "2": true, "3": ""}, "2": "b"})))
        .await
        .unwrap();

    survey.verify(first.token.as_str()).await.unwrap();
    survey.verify(second.token.as_str()).await.unwrap();
    survey.verify(first.token.as_str()).await.unwrap();

    let verified = survey.get_verified(IDENTITY).await.unwrap().unwrap();
    assert_eq!(verified.timestamp, first.timestamp);
    assert_eq!(verified.answers["2"], "a");
}

#[tokio::test]
async fn test_token_of_other_survey_is_unknown() {
    let db = SurveyDb::open_memory().await.unwrap();
    let registry = SurveyRegistry::new(db);
    registry.register(&configuration()).await.unwrap();

    let mut other = configuration();
    other.survey_name = "other".to_string();
    registry.register(&other).await.unwrap();

    let body = json!({"identity": IDENTITY, "answers": valid_answers()});
    let receipt = registry.submit("fastsurvey.other", body).await.unwrap();

    let err = registry
        .verify("fastsurvey.test", receipt.token.as_str())
        .await
        .unwrap_err();
    assert!(matches!(err, SurveyError::UnknownToken(_)));
    assert_eq!(
        registry.verify("fastsurvey.other", receipt.token.as_str()).await.unwrap(),
        IDENTITY
    );
}

// =============================================================================
// CONCURRENCY
// =============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_verifies_leave_one_whole_record() {
    let tmp = TempDir::new().unwrap();
    let db = SurveyDb::open(tmp.path().join("fastsurvey.sqlite3")).await.unwrap();
    let survey = Arc::new(Survey::new(&configuration(), db).unwrap());

    let mut receipts = Vec::new();
    for i in 0..8 {
        let answers = json!({"1": {"1": true, "2": false, "3": ""}, "2": format!("reason {}", i)});
        let receipt = survey.submit(Submission::new(IDENTITY, answers)).await.unwrap();
        receipts.push(receipt);
    }

    let handles: Vec<_> = receipts
        .iter()
        .map(|receipt| {
            let survey = survey.clone();
            let token = receipt.token.clone();
            tokio::spawn(async move { survey.verify(token.as_str()).await })
        })
        .collect();
    for handle in handles {
        assert_eq!(handle.await.unwrap().unwrap(), IDENTITY);
    }

    let verified = survey.list_verified().await.unwrap();
    assert_eq!(verified.len(), 1);

    // Timestamp and answers come from the same pending entry.
    let source = survey
        .list_pending()
        .await
        .unwrap()
        .into_iter()
        .find(|pending| pending.answers == verified[0].answers)
        .expect("verified answers match no pending entry");
    assert_eq!(verified[0].timestamp, source.timestamp);
}

// =============================================================================
// RETENTION
// =============================================================================

#[tokio::test]
async fn test_purged_pending_entry_cannot_be_verified() {
    let db = SurveyDb::open_memory().await.unwrap();
    let survey = Survey::new(&configuration(), db)
        .unwrap()
        .with_retention(Arc::new(fastsurvey::MaxAge(chrono::Duration::milliseconds(-1))));

    let receipt = survey.submit(Submission::new(IDENTITY, valid_answers())).await.unwrap();
    survey.verify(receipt.token.as_str()).await.unwrap();

    assert_eq!(survey.purge_pending().await.unwrap(), 1);
    assert!(matches!(
        survey.verify(receipt.token.as_str()).await,
        Err(SurveyError::UnknownToken(_))
    ));
    // Verified entries survive retention.
    assert_eq!(survey.verified_count().await.unwrap(), 1);
}
