mod common;

use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeZone, Utc};
use common::{spawn_backend, unreachable_base_url, Behavior, ACCESS_CODE};
use exam_client::error::{ApiError, SubmissionError};
use exam_client::models::{AnswerSet, QuestionId, ReportSnapshot, QUESTION_LIMIT};
use exam_client::services::api_client::HttpAssessmentApi;
use exam_client::services::pdf_renderer::PdfRenderer;
use exam_client::services::report_builder::ReportBuilder;
use exam_client::services::submission_client::{submission_meta, SubmissionClient};
use exam_client::services::{AssessmentApi, VerifyRequest};
use serde_json::{json, Value};

fn api(base_url: &str) -> Arc<HttpAssessmentApi> {
    Arc::new(HttpAssessmentApi::new(base_url, Duration::from_secs(5)).unwrap())
}

async fn finished_snapshot(api: &HttpAssessmentApi) -> ReportSnapshot {
    let questions = api.fetch_questions(QUESTION_LIMIT).await.unwrap();
    let mut answers = AnswerSet::new();
    answers.select(QuestionId::from("1"), "4");
    answers.select(QuestionId::from("q-2"), "Toshkent");

    ReportSnapshot {
        participant_name: "  Ali  Vali!! ".into(),
        started_at: Utc.with_ymd_and_hms(2025, 5, 6, 6, 55, 55).unwrap(),
        finished_at: Utc.with_ymd_and_hms(2025, 5, 6, 7, 8, 0).unwrap(),
        violation_count: 1,
        questions,
        answers,
    }
}

#[tokio::test]
async fn verify_posts_name_and_code() {
    let backend = spawn_backend(Behavior::default()).await;
    let api = api(&backend.base_url);

    let granted = api
        .verify(&VerifyRequest {
            name: "Ali".into(),
            code: ACCESS_CODE.into(),
        })
        .await
        .unwrap();
    assert!(granted.access);

    let denied = api
        .verify(&VerifyRequest {
            name: "Ali".into(),
            code: "0000".into(),
        })
        .await
        .unwrap();
    assert!(!denied.access);
    assert_eq!(denied.message.as_deref(), Some("Kod noto'g'ri"));
}

#[tokio::test]
async fn fetch_normalizes_ids_and_truncates_to_limit() {
    let questions: Vec<Value> = (1..=30)
        .map(|i| json!({"id": i, "question": format!("Savol {i}"), "options": ["a", "b"], "answer": "b"}))
        .collect();
    let backend = spawn_backend(Behavior {
        questions: Value::Array(questions),
        ..Default::default()
    })
    .await;

    let fetched = api(&backend.base_url).fetch_questions(25).await.unwrap();
    assert_eq!(fetched.len(), 25);
    assert_eq!(fetched[0].id, QuestionId::from("1"));
    assert_eq!(fetched[24].id, QuestionId::from("25"));
}

#[tokio::test]
async fn fetch_error_status_is_reported() {
    let backend = spawn_backend(Behavior {
        fetch_status: Some(404),
        ..Default::default()
    })
    .await;

    let err = api(&backend.base_url).fetch_questions(25).await.unwrap_err();
    assert!(matches!(err, ApiError::Status { status: 404, .. }));
}

#[tokio::test]
async fn upload_carries_document_and_summary_fields() {
    let backend = spawn_backend(Behavior::default()).await;
    let api = api(&backend.base_url);
    let snapshot = finished_snapshot(&api).await;

    let (report, document) = ReportBuilder::new(Arc::new(PdfRenderer::default()))
        .generate(&snapshot)
        .unwrap();
    assert_eq!(document.filename, "Ali_Vali_20250506-0708.pdf");
    assert_eq!(report.header.duration, "12m5s");

    let meta = submission_meta(&snapshot, &report);
    SubmissionClient::new(api).submit(&document, &meta).await.unwrap();

    let uploads = backend.uploads();
    assert_eq!(uploads.len(), 1);
    let upload = &uploads[0];
    assert_eq!(upload.file_name.as_deref(), Some("Ali_Vali_20250506-0708.pdf"));
    assert_eq!(upload.content_type.as_deref(), Some("application/pdf"));
    assert_eq!(upload.file_bytes, document.bytes);
    assert_eq!(upload.fields["name"], "Ali  Vali!!");
    assert_eq!(upload.fields["startedAt"], "2025-05-06T06:55:55Z");
    assert_eq!(upload.fields["finishedAt"], "2025-05-06T07:08:00Z");
    assert_eq!(upload.fields["duration"], "12m 5s");
    assert_eq!(upload.fields["total"], "2");
    assert_eq!(upload.fields["correct"], "2");
}

#[tokio::test]
async fn rejected_upload_is_a_submission_failure() {
    let backend = spawn_backend(Behavior {
        submit_status: Some(500),
        ..Default::default()
    })
    .await;
    let api = api(&backend.base_url);
    let snapshot = finished_snapshot(&api).await;
    let (report, document) = ReportBuilder::new(Arc::new(PdfRenderer::default()))
        .generate(&snapshot)
        .unwrap();

    let err = SubmissionClient::new(api)
        .submit(&document, &submission_meta(&snapshot, &report))
        .await
        .unwrap_err();
    match err {
        SubmissionError::SubmissionFailed { status, body } => {
            assert_eq!(status, 500);
            assert_eq!(body, "storage unavailable");
        }
        other => panic!("expected SubmissionFailed, got {other:?}"),
    }
    // one attempt, no retry
    assert_eq!(backend.uploads().len(), 1);
}

#[tokio::test]
async fn unreachable_storage_is_a_network_failure() {
    let backend = spawn_backend(Behavior::default()).await;
    let snapshot = finished_snapshot(&api(&backend.base_url)).await;
    let (report, document) = ReportBuilder::new(Arc::new(PdfRenderer::default()))
        .generate(&snapshot)
        .unwrap();

    let offline = api(&unreachable_base_url().await);
    let err = SubmissionClient::new(offline)
        .submit(&document, &submission_meta(&snapshot, &report))
        .await
        .unwrap_err();
    assert!(matches!(err, SubmissionError::SubmissionNetwork(_)));
}
