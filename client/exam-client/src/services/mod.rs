use std::sync::Arc;

use async_trait::async_trait;
use serde::de::IgnoredAny;
use serde::{Deserialize, Deserializer, Serialize};

use crate::config::Config;
use crate::error::ApiError;
use crate::models::{Notice, Question, ReportDocument, SessionEvent};
use tokio::sync::mpsc::UnboundedSender;

pub mod api_client;
pub mod clock;
pub mod focus_monitor;
pub mod pdf_renderer;
pub mod report_builder;
pub mod session_machine;
pub mod submission_client;

use api_client::HttpAssessmentApi;
use clock::Clock;
use focus_monitor::FocusMonitor;
use pdf_renderer::{DocumentRenderer, PdfRenderer};
use report_builder::ReportBuilder;
use session_machine::SessionMachine;
use submission_client::{SubmissionClient, SubmissionPipeline};

#[derive(Debug, Clone, Serialize)]
pub struct VerifyRequest {
    pub name: String,
    pub code: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VerifyResponse {
    #[serde(default, deserialize_with = "deserialize_truthy")]
    pub access: bool,
    #[serde(default)]
    pub message: Option<String>,
}

/// Accepts any JSON value for the access flag. `null`, `false`, `0`, `""`,
/// `"0"` and `"false"` deny; everything else grants.
fn deserialize_truthy<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Null(Option<()>),
        Bool(bool),
        Number(f64),
        Text(String),
        Other(IgnoredAny),
    }

    Ok(match Flag::deserialize(deserializer)? {
        Flag::Null(_) => false,
        Flag::Bool(value) => value,
        Flag::Number(value) => value != 0.0 && !value.is_nan(),
        Flag::Text(value) => {
            let value = value.trim();
            !(value.is_empty() || value == "0" || value.eq_ignore_ascii_case("false"))
        }
        Flag::Other(_) => true,
    })
}

/// Scalar fields sent next to the report attachment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionMeta {
    pub name: String,
    pub started_at: String,
    pub finished_at: String,
    pub duration: String,
    pub total: usize,
    pub correct: usize,
}

/// Remote collaborators of the client: access gate, question bank, result storage.
#[async_trait]
pub trait AssessmentApi: Send + Sync {
    async fn verify(&self, request: &VerifyRequest) -> Result<VerifyResponse, ApiError>;

    async fn fetch_questions(&self, limit: usize) -> Result<Vec<Question>, ApiError>;

    async fn submit(&self, document: &ReportDocument, meta: &SubmissionMeta)
        -> Result<(), ApiError>;
}

pub struct AppState {
    pub config: Config,
    pub api: Arc<dyn AssessmentApi>,
    pub renderer: Arc<dyn DocumentRenderer>,
}

impl AppState {
    pub fn new(config: Config) -> anyhow::Result<Self> {
        tracing::info!(
            "Using assessment backend at {} (timeout {}s)",
            config.api_base_url,
            config.request_timeout_secs
        );

        let api = HttpAssessmentApi::new(&config.api_base_url, config.request_timeout())?;

        Ok(Self {
            config,
            api: Arc::new(api),
            renderer: Arc::new(PdfRenderer::default()),
        })
    }

    /// Wires a fresh session machine with its finish-time pipeline.
    pub fn session_machine(
        &self,
        focus: FocusMonitor,
        events: UnboundedSender<SessionEvent>,
        notices: UnboundedSender<Notice>,
    ) -> SessionMachine {
        let pipeline = SubmissionPipeline::new(
            ReportBuilder::new(self.renderer.clone()),
            SubmissionClient::new(self.api.clone()),
            notices,
        );
        SessionMachine::new(
            self.api.clone(),
            Arc::new(pipeline),
            Clock::new(),
            focus,
            events,
        )
    }
}
