use std::sync::Arc;

use chrono::Utc;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;

use super::clock::Clock;
use super::focus_monitor::FocusMonitor;
use super::submission_client::SubmissionPipeline;
use super::{AssessmentApi, VerifyRequest};
use crate::error::{SessionError, SubmissionError};
use crate::metrics::{FOCUS_VIOLATIONS_TOTAL, SESSIONS_FINISHED_TOTAL};
use crate::models::{
    AnswerSet, FinishReason, FocusNotice, Phase, Question, QuestionId, ReportSnapshot, Score,
    Session, SessionEvent, TimerEvent, QUESTION_LIMIT,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    Previous,
    Next,
    Jump(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FinishSummary {
    pub reason: FinishReason,
    pub score: Score,
}

/// Result of feeding one clock or focus event into the machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventOutcome {
    Ignored,
    Ticked { remaining_seconds: u32 },
    Violation { count: u32 },
    ExitDeterred { advisory: &'static str },
    LeaveConfirmed,
    Finished(FinishSummary),
}

pub type SubmissionHandle = JoinHandle<Result<(), SubmissionError>>;

/// Owns one assessment run: phase, questions, answers, cursor, and the
/// resources (clock, focus monitor) whose lifetime follows the Running phase.
pub struct SessionMachine {
    api: Arc<dyn AssessmentApi>,
    pipeline: Arc<SubmissionPipeline>,
    events: UnboundedSender<SessionEvent>,
    clock: Clock,
    focus: FocusMonitor,
    session: Session,
    questions: Vec<Question>,
    answers: AnswerSet,
    cursor: usize,
    submission: Option<SubmissionHandle>,
}

impl SessionMachine {
    pub fn new(
        api: Arc<dyn AssessmentApi>,
        pipeline: Arc<SubmissionPipeline>,
        clock: Clock,
        focus: FocusMonitor,
        events: UnboundedSender<SessionEvent>,
    ) -> Self {
        let session = Session::new();
        tracing::info!(run_id = %session.run_id, "Session created");

        Self {
            api,
            pipeline,
            events,
            clock,
            focus,
            session,
            questions: Vec::new(),
            answers: AnswerSet::new(),
            cursor: 0,
            submission: None,
        }
    }

    pub fn phase(&self) -> Phase {
        self.session.phase
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn answers(&self) -> &AnswerSet {
        &self.answers
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn current_question(&self) -> Option<&Question> {
        self.questions.get(self.cursor)
    }

    pub fn compute_score(&self) -> Score {
        Score::compute(&self.questions, &self.answers)
    }

    pub fn clock_running(&self) -> bool {
        self.clock.is_running()
    }

    pub fn focus_armed(&self) -> bool {
        self.focus.is_armed()
    }

    /// Hands out the in-flight report submission, if one was scheduled.
    pub fn take_submission(&mut self) -> Option<SubmissionHandle> {
        self.submission.take()
    }

    pub async fn verify(&mut self, name: &str, code: &str) -> Result<(), SessionError> {
        self.expect_phase(Phase::Verify)?;

        let name = name.trim();
        if name.is_empty() {
            return Err(SessionError::Validation);
        }

        let request = VerifyRequest {
            name: name.to_string(),
            code: code.trim().to_string(),
        };

        let response = self.api.verify(&request).await.map_err(|e| {
            tracing::warn!(error = %e, "verification call failed");
            SessionError::TransientNetwork(e.to_string())
        })?;

        if !response.access {
            tracing::info!(run_id = %self.session.run_id, "Access denied for {}", name);
            return Err(SessionError::VerificationDenied {
                message: response.message,
            });
        }

        self.session.participant_name = request.name;
        self.session.access_code = request.code;
        self.advance();
        Ok(())
    }

    pub async fn confirm_rules(&mut self) -> Result<(), SessionError> {
        self.expect_phase(Phase::Rules)?;

        let questions = self
            .api
            .fetch_questions(QUESTION_LIMIT)
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, "question fetch failed");
                SessionError::from(e)
            })?;

        self.questions = questions;
        self.answers = AnswerSet::new();
        self.cursor = 0;
        self.session.violation_count = 0;
        self.session.time_remaining_seconds = self.session.duration_budget_seconds;
        self.session.started_at = Some(Utc::now());

        self.clock
            .start(self.session.duration_budget_seconds, self.events.clone());
        self.focus.arm();
        self.advance();

        tracing::info!(
            run_id = %self.session.run_id,
            "Test started with {} questions",
            self.questions.len()
        );
        Ok(())
    }

    pub fn select_answer(&mut self, id: &QuestionId, option: &str) -> Result<(), SessionError> {
        self.expect_phase(Phase::Running)?;

        if !self.questions.iter().any(|q| &q.id == id) {
            return Err(SessionError::UnknownQuestion(id.clone()));
        }

        self.answers.select(id.clone(), option);
        Ok(())
    }

    /// Moves the cursor, clamped to the question range. No-op outside Running.
    pub fn navigate(&mut self, navigation: Navigation) {
        if self.session.phase != Phase::Running {
            return;
        }

        let last = self.questions.len().saturating_sub(1);
        self.cursor = match navigation {
            Navigation::Previous => self.cursor.saturating_sub(1),
            Navigation::Next => (self.cursor + 1).min(last),
            Navigation::Jump(index) => index.min(last),
        };
    }

    pub fn finish_manually(&mut self, confirmed: bool) -> Option<FinishSummary> {
        if !confirmed {
            tracing::debug!("Manual finish declined");
            return None;
        }
        self.finish(FinishReason::Manual)
    }

    pub fn finish_by_timeout(&mut self) -> Option<FinishSummary> {
        self.finish(FinishReason::Timeout)
    }

    /// Single entry point for clock and focus events. Anything arriving
    /// outside Running is stale and dropped.
    pub fn handle_event(&mut self, event: SessionEvent) -> EventOutcome {
        if self.session.phase != Phase::Running {
            tracing::debug!("Ignoring {:?} in phase {:?}", event, self.session.phase);
            return EventOutcome::Ignored;
        }

        match event {
            SessionEvent::Timer(TimerEvent::TimerTick(tick)) => {
                let remaining = tick.remaining_seconds.min(self.session.time_remaining_seconds);
                self.session.time_remaining_seconds = remaining;
                EventOutcome::Ticked {
                    remaining_seconds: remaining,
                }
            }
            SessionEvent::Timer(TimerEvent::TimeExpired(_)) => {
                self.session.time_remaining_seconds = 0;
                match self.finish_by_timeout() {
                    Some(summary) => EventOutcome::Finished(summary),
                    None => EventOutcome::Ignored,
                }
            }
            SessionEvent::Focus(signal) => match self.focus.observe(signal) {
                Some(FocusNotice::Violation) => {
                    self.session.violation_count += 1;
                    FOCUS_VIOLATIONS_TOTAL.inc();
                    tracing::warn!(
                        run_id = %self.session.run_id,
                        "Focus lost, violation #{}",
                        self.session.violation_count
                    );
                    EventOutcome::Violation {
                        count: self.session.violation_count,
                    }
                }
                Some(FocusNotice::ExitDeterred { advisory }) => {
                    EventOutcome::ExitDeterred { advisory }
                }
                Some(FocusNotice::LeaveConfirmed) => {
                    tracing::warn!(run_id = %self.session.run_id, "Participant left a running test");
                    EventOutcome::LeaveConfirmed
                }
                None => EventOutcome::Ignored,
            },
        }
    }

    fn finish(&mut self, reason: FinishReason) -> Option<FinishSummary> {
        // Phase check and transition happen without an await in between,
        // so whichever finish path runs first wins.
        if self.session.phase != Phase::Running {
            tracing::debug!(
                "Finish ({}) ignored in phase {:?}",
                reason.as_label(),
                self.session.phase
            );
            return None;
        }

        self.clock.stop();
        self.focus.disarm();
        self.session.finished_at = Some(Utc::now());
        self.advance();

        let score = self.compute_score();
        SESSIONS_FINISHED_TOTAL
            .with_label_values(&[reason.as_label()])
            .inc();
        tracing::info!(
            run_id = %self.session.run_id,
            "Test finished ({}): score {}, violations {}",
            reason.as_label(),
            score,
            self.session.violation_count
        );

        if let Some(snapshot) = self.snapshot() {
            let pipeline = self.pipeline.clone();
            self.submission = Some(tokio::spawn(async move { pipeline.run(snapshot).await }));
        }

        Some(FinishSummary { reason, score })
    }

    fn snapshot(&self) -> Option<ReportSnapshot> {
        Some(ReportSnapshot {
            participant_name: self.session.participant_name.clone(),
            started_at: self.session.started_at?,
            finished_at: self.session.finished_at?,
            violation_count: self.session.violation_count,
            questions: self.questions.clone(),
            answers: self.answers.clone(),
        })
    }

    fn expect_phase(&self, expected: Phase) -> Result<(), SessionError> {
        if self.session.phase == expected {
            Ok(())
        } else {
            Err(SessionError::InvalidPhase {
                expected,
                actual: self.session.phase,
            })
        }
    }

    fn advance(&mut self) {
        let from = self.session.phase;
        if let Some(to) = from.next() {
            self.session.phase = to;
            tracing::info!(run_id = %self.session.run_id, "Phase {:?} -> {:?}", from, to);
        }
    }
}
