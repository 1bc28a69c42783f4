//! Error types shared by the client services.

use thiserror::Error;

use crate::models::{Phase, QuestionId};

/// Failures of a single call to the assessment backend.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request to {endpoint} failed: {message}")]
    Transport {
        endpoint: &'static str,
        message: String,
    },
    #[error("{endpoint} responded with status {status}: {body}")]
    Status {
        endpoint: &'static str,
        status: u16,
        body: String,
    },
    #[error("{endpoint} returned an unreadable payload: {message}")]
    Payload {
        endpoint: &'static str,
        message: String,
    },
}

impl ApiError {
    pub fn transport(endpoint: &'static str, err: impl std::fmt::Display) -> Self {
        Self::Transport {
            endpoint,
            message: err.to_string(),
        }
    }
}

/// Errors raised by session state machine actions.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("participant name must not be empty")]
    Validation,
    #[error("access denied{}", .message.as_deref().map(|m| format!(": {m}")).unwrap_or_default())]
    VerificationDenied { message: Option<String> },
    #[error("network error: {0}")]
    TransientNetwork(String),
    #[error("question bank responded with status {status}")]
    QuestionFetch { status: u16 },
    #[error("action requires phase {expected:?}, session is in {actual:?}")]
    InvalidPhase { expected: Phase, actual: Phase },
    #[error("unknown question id {0}")]
    UnknownQuestion(QuestionId),
}

impl From<ApiError> for SessionError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Status { status, .. } => SessionError::QuestionFetch { status },
            other => SessionError::TransientNetwork(other.to_string()),
        }
    }
}

/// Document rendering failures.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("invalid page geometry: {0}")]
    Geometry(String),
    #[error("renderer produced an empty document")]
    EmptyDocument,
    #[error("renderer failed: {0}")]
    Renderer(String),
}

/// Failures of the finish-time report and upload pipeline.
#[derive(Debug, Error)]
pub enum SubmissionError {
    #[error("report generation failed: {0}")]
    ReportGeneration(#[from] ReportError),
    #[error("submission rejected with status {status}: {body}")]
    SubmissionFailed { status: u16, body: String },
    #[error("submission could not reach the server: {0}")]
    SubmissionNetwork(String),
}

impl From<ApiError> for SubmissionError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Status { status, body, .. } => {
                SubmissionError::SubmissionFailed { status, body }
            }
            other => SubmissionError::SubmissionNetwork(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_errors_map_to_question_fetch() {
        let err: SessionError = ApiError::Status {
            endpoint: "/tests",
            status: 503,
            body: "down".into(),
        }
        .into();
        assert!(matches!(err, SessionError::QuestionFetch { status: 503 }));
    }

    #[test]
    fn transport_errors_map_to_transient_network() {
        let err: SessionError = ApiError::transport("/verify", "connection refused").into();
        assert!(matches!(err, SessionError::TransientNetwork(_)));
        assert!(err.to_string().contains("connection refused"));
    }

    #[test]
    fn submission_status_keeps_body() {
        let err: SubmissionError = ApiError::Status {
            endpoint: "/submit",
            status: 413,
            body: "too large".into(),
        }
        .into();
        match err {
            SubmissionError::SubmissionFailed { status, body } => {
                assert_eq!(status, 413);
                assert_eq!(body, "too large");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn denial_message_is_optional() {
        let bare = SessionError::VerificationDenied { message: None };
        assert_eq!(bare.to_string(), "access denied");
        let explained = SessionError::VerificationDenied {
            message: Some("code expired".into()),
        };
        assert_eq!(explained.to_string(), "access denied: code expired");
    }
}
