use std::sync::Arc;

use tokio::sync::mpsc::UnboundedSender;

use super::report_builder::ReportBuilder;
use super::{AssessmentApi, SubmissionMeta};
use crate::error::SubmissionError;
use crate::metrics::SUBMISSIONS_TOTAL;
use crate::models::{Notice, Report, ReportDocument, ReportSnapshot};
use crate::utils::time::{format_duration_spaced, to_iso};

pub struct SubmissionClient {
    api: Arc<dyn AssessmentApi>,
}

impl SubmissionClient {
    pub fn new(api: Arc<dyn AssessmentApi>) -> Self {
        Self { api }
    }

    /// Single upload attempt. Failures are logged and returned, never retried.
    pub async fn submit(
        &self,
        document: &ReportDocument,
        meta: &SubmissionMeta,
    ) -> Result<(), SubmissionError> {
        match self.api.submit(document, meta).await {
            Ok(()) => {
                SUBMISSIONS_TOTAL.with_label_values(&["success"]).inc();
                tracing::info!("Report {} submitted", document.filename);
                Ok(())
            }
            Err(e) => {
                let err = SubmissionError::from(e);
                let label = match err {
                    SubmissionError::SubmissionFailed { .. } => "rejected",
                    _ => "network_error",
                };
                SUBMISSIONS_TOTAL.with_label_values(&[label]).inc();
                tracing::error!(error = %err, file = %document.filename, "report submission failed");
                Err(err)
            }
        }
    }
}

pub fn submission_meta(snapshot: &ReportSnapshot, report: &Report) -> SubmissionMeta {
    SubmissionMeta {
        name: snapshot.participant_name.trim().to_string(),
        started_at: to_iso(snapshot.started_at),
        finished_at: to_iso(snapshot.finished_at),
        duration: format_duration_spaced(snapshot.elapsed_seconds()),
        total: report.score.total,
        correct: report.score.correct,
    }
}

/// Finish-time work: build the report, upload it, tell the user how it went.
pub struct SubmissionPipeline {
    builder: ReportBuilder,
    client: SubmissionClient,
    notices: UnboundedSender<Notice>,
}

impl SubmissionPipeline {
    pub fn new(
        builder: ReportBuilder,
        client: SubmissionClient,
        notices: UnboundedSender<Notice>,
    ) -> Self {
        Self {
            builder,
            client,
            notices,
        }
    }

    pub async fn run(&self, snapshot: ReportSnapshot) -> Result<(), SubmissionError> {
        let result = self.process(&snapshot).await;

        let notice = match &result {
            Ok(()) => Notice::info("Natijangiz muvaffaqiyatli yuborildi."),
            Err(SubmissionError::ReportGeneration(_)) => Notice::warning(
                "Hisobot yaratib bo'lmadi, natija serverga yuborilmadi.",
            ),
            Err(SubmissionError::SubmissionFailed { status, body }) => {
                let detail = body_excerpt(body);
                let reply = if detail.is_empty() {
                    status.to_string()
                } else {
                    format!("{status}: {detail}")
                };
                Notice::error(format!(
                    "Natijani yuborishda xatolik (server javobi {reply}). Natija saqlanmagan bo'lishi mumkin."
                ))
            }
            Err(SubmissionError::SubmissionNetwork(_)) => Notice::error(
                "Server bilan aloqa yo'q. Natija saqlanmagan bo'lishi mumkin.",
            ),
        };
        if self.notices.send(notice).is_err() {
            tracing::debug!("Notice channel closed before submission outcome was delivered");
        }

        result
    }

    async fn process(&self, snapshot: &ReportSnapshot) -> Result<(), SubmissionError> {
        let (report, document) = self.builder.generate(snapshot)?;
        let meta = submission_meta(snapshot, &report);
        self.client.submit(&document, &meta).await
    }
}

/// Longest part of a rejection body repeated back to the user.
const BODY_EXCERPT_CHARS: usize = 200;

fn body_excerpt(body: &str) -> String {
    let body = body.split_whitespace().collect::<Vec<_>>().join(" ");
    if body.chars().count() <= BODY_EXCERPT_CHARS {
        return body;
    }
    let mut excerpt: String = body.chars().take(BODY_EXCERPT_CHARS).collect();
    excerpt.push_str("...");
    excerpt
}
