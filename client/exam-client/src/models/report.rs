use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{AnswerSet, Question, Score};

/// Everything the report pipeline needs, frozen at the moment of finishing.
#[derive(Debug, Clone, Serialize)]
pub struct ReportSnapshot {
    pub participant_name: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub violation_count: u32,
    pub questions: Vec<Question>,
    pub answers: AnswerSet,
}

impl ReportSnapshot {
    pub fn score(&self) -> Score {
        Score::compute(&self.questions, &self.answers)
    }

    pub fn elapsed_seconds(&self) -> u64 {
        crate::utils::time::elapsed_seconds(self.started_at, self.finished_at)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportHeader {
    pub participant_name: String,
    pub started_at: String,
    pub finished_at: String,
    pub duration: String,
    pub score: String,
    pub violations: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TranscriptLine {
    /// One-based position in the original question order.
    pub index: usize,
    pub prompt: String,
    pub chosen: Option<String>,
    pub correct: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub header: ReportHeader,
    pub score: Score,
    pub transcript: Vec<TranscriptLine>,
}

/// Rendered attachment ready for upload.
#[derive(Debug, Clone)]
pub struct ReportDocument {
    pub filename: String,
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
    pub page_count: usize,
}
