use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub mod focus;
pub mod question;
pub mod report;
pub mod timer;

pub use focus::{FocusNotice, FocusSignal};
pub use question::{AnswerSet, Question, QuestionId};
pub use report::{Report, ReportDocument, ReportHeader, ReportSnapshot, TranscriptLine};
pub use timer::{TimeExpired, TimerEvent, TimerTick};

/// Time budget of a single run.
pub const DURATION_BUDGET_SECONDS: u32 = 3600;

/// Number of questions requested from the question bank.
pub const QUESTION_LIMIT: usize = 25;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Verify,
    Rules,
    Running,
    Finished,
}

impl Phase {
    /// The only phase reachable from `self`.
    pub fn next(self) -> Option<Phase> {
        match self {
            Phase::Verify => Some(Phase::Rules),
            Phase::Rules => Some(Phase::Running),
            Phase::Running => Some(Phase::Finished),
            Phase::Finished => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub run_id: Uuid,
    pub phase: Phase,
    pub participant_name: String,
    pub access_code: String,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub duration_budget_seconds: u32,
    pub time_remaining_seconds: u32,
    pub violation_count: u32,
}

impl Session {
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            phase: Phase::Verify,
            participant_name: String::new(),
            access_code: String::new(),
            started_at: None,
            finished_at: None,
            duration_budget_seconds: DURATION_BUDGET_SECONDS,
            time_remaining_seconds: DURATION_BUDGET_SECONDS,
            violation_count: 0,
        }
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Score {
    pub correct: usize,
    pub total: usize,
}

impl Score {
    /// Counts questions whose recorded answer equals the correct option.
    /// Unanswered questions count as incorrect.
    pub fn compute(questions: &[Question], answers: &AnswerSet) -> Self {
        let correct = questions
            .iter()
            .filter(|q| answers.get(&q.id) == Some(q.correct_option.as_str()))
            .count();

        Self {
            correct,
            total: questions.len(),
        }
    }
}

impl std::fmt::Display for Score {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} / {}", self.correct, self.total)
    }
}

/// Inbound message for the session state machine from its owned resources.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    Timer(TimerEvent),
    Focus(FocusSignal),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinishReason {
    Manual,
    Timeout,
}

impl FinishReason {
    pub fn as_label(&self) -> &'static str {
        match self {
            FinishReason::Manual => "manual",
            FinishReason::Timeout => "timeout",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

/// User-visible, non-blocking notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Warning,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question(id: &str, answer: &str) -> Question {
        Question {
            id: QuestionId::from(id),
            prompt: format!("Savol {id}"),
            options: vec!["a".into(), "b".into(), "c".into()],
            correct_option: answer.into(),
        }
    }

    #[test]
    fn phase_moves_forward_only() {
        assert_eq!(Phase::Verify.next(), Some(Phase::Rules));
        assert_eq!(Phase::Rules.next(), Some(Phase::Running));
        assert_eq!(Phase::Running.next(), Some(Phase::Finished));
        assert_eq!(Phase::Finished.next(), None);
        assert!(Phase::Verify < Phase::Finished);
    }

    #[test]
    fn score_counts_exact_matches_and_ignores_order() {
        let questions = vec![question("1", "a"), question("2", "b"), question("3", "c")];

        let mut forward = AnswerSet::new();
        forward.select(QuestionId::from("1"), "a");
        forward.select(QuestionId::from("2"), "c");
        forward.select(QuestionId::from("3"), "c");

        let mut backward = AnswerSet::new();
        backward.select(QuestionId::from("3"), "c");
        backward.select(QuestionId::from("2"), "c");
        backward.select(QuestionId::from("1"), "a");

        let expected = Score {
            correct: 2,
            total: 3,
        };
        assert_eq!(Score::compute(&questions, &forward), expected);
        assert_eq!(Score::compute(&questions, &backward), expected);
    }

    #[test]
    fn unanswered_questions_are_incorrect() {
        let questions = vec![question("1", "a"), question("2", "b")];
        let score = Score::compute(&questions, &AnswerSet::new());
        assert_eq!(score.correct, 0);
        assert_eq!(score.total, 2);
    }

    #[test]
    fn empty_question_set_scores_zero_of_zero() {
        let score = Score::compute(&[], &AnswerSet::new());
        assert_eq!(score.to_string(), "0 / 0");
    }
}
