use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use url::Url;
use validator::Validate;

use super::{AssessmentApi, SubmissionMeta, VerifyRequest, VerifyResponse};
use crate::error::ApiError;
use crate::metrics::track_http_request;
use crate::models::{Question, ReportDocument};

const VERIFY_PATH: &str = "verify";
const QUESTIONS_PATH: &str = "tests";
const SUBMIT_PATH: &str = "submit";

/// Multipart field carrying the report attachment.
pub const FILE_FIELD: &str = "file";

#[derive(Clone, Debug)]
pub struct HttpAssessmentApi {
    http_client: Client,
    base_url: Url,
}

impl HttpAssessmentApi {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let mut base_url = Url::parse(base_url).context("Invalid assessment API base URL")?;
        if base_url.host_str().is_none() {
            bail!("Assessment API base URL must include a host");
        }
        // Url::join replaces the last segment unless the path ends with '/'
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let http_client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            http_client,
            base_url,
        })
    }

    fn endpoint(&self, path: &'static str) -> Result<Url, ApiError> {
        self.base_url
            .join(path)
            .map_err(|e| ApiError::transport(path, e))
    }

    async fn ensure_success(endpoint: &'static str, response: Response) -> Result<Response, ApiError> {
        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status();
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        Err(ApiError::Status {
            endpoint,
            status: status.as_u16(),
            body,
        })
    }

    fn build_submission_form(
        document: &ReportDocument,
        meta: &SubmissionMeta,
    ) -> Result<Form, ApiError> {
        let file = Part::bytes(document.bytes.clone())
            .file_name(document.filename.clone())
            .mime_str(document.content_type)
            .map_err(|e| ApiError::transport(SUBMIT_PATH, e))?;

        Ok(Form::new()
            .part(FILE_FIELD, file)
            .text("name", meta.name.clone())
            .text("startedAt", meta.started_at.clone())
            .text("finishedAt", meta.finished_at.clone())
            .text("duration", meta.duration.clone())
            .text("total", meta.total.to_string())
            .text("correct", meta.correct.to_string()))
    }
}

#[async_trait]
impl AssessmentApi for HttpAssessmentApi {
    async fn verify(&self, request: &VerifyRequest) -> Result<VerifyResponse, ApiError> {
        let url = self.endpoint(VERIFY_PATH)?;
        tracing::debug!("Calling verification service: {}", url);

        track_http_request(VERIFY_PATH, async {
            let response = self
                .http_client
                .post(url)
                .json(request)
                .send()
                .await
                .map_err(|e| ApiError::transport(VERIFY_PATH, e))?;

            let response = Self::ensure_success(VERIFY_PATH, response).await?;

            response
                .json::<VerifyResponse>()
                .await
                .map_err(|e| ApiError::Payload {
                    endpoint: VERIFY_PATH,
                    message: e.to_string(),
                })
        })
        .await
    }

    async fn fetch_questions(&self, limit: usize) -> Result<Vec<Question>, ApiError> {
        let url = self.endpoint(QUESTIONS_PATH)?;
        tracing::debug!("Fetching questions: {} limit={}", url, limit);

        let fetched: Vec<Question> = track_http_request(QUESTIONS_PATH, async {
            let response = self
                .http_client
                .get(url)
                .query(&[("limit", limit)])
                .send()
                .await
                .map_err(|e| ApiError::transport(QUESTIONS_PATH, e))?;

            let response = Self::ensure_success(QUESTIONS_PATH, response).await?;

            response
                .json::<Vec<Question>>()
                .await
                .map_err(|e| ApiError::Payload {
                    endpoint: QUESTIONS_PATH,
                    message: e.to_string(),
                })
        })
        .await?;

        let received = fetched.len();
        let questions: Vec<Question> = fetched
            .into_iter()
            .filter(|question| match question.validate() {
                Ok(()) => true,
                Err(errors) => {
                    tracing::warn!(question = %question.id, %errors, "dropping malformed question");
                    false
                }
            })
            .take(limit)
            .collect();

        tracing::info!(
            "Fetched {} questions ({} received, limit {})",
            questions.len(),
            received,
            limit
        );

        Ok(questions)
    }

    async fn submit(
        &self,
        document: &ReportDocument,
        meta: &SubmissionMeta,
    ) -> Result<(), ApiError> {
        let url = self.endpoint(SUBMIT_PATH)?;
        let form = Self::build_submission_form(document, meta)?;
        tracing::debug!(
            "Uploading report {} ({} bytes) to {}",
            document.filename,
            document.bytes.len(),
            url
        );

        track_http_request(SUBMIT_PATH, async {
            let response = self
                .http_client
                .post(url)
                .multipart(form)
                .send()
                .await
                .map_err(|e| ApiError::transport(SUBMIT_PATH, e))?;

            Self::ensure_success(SUBMIT_PATH, response).await?;
            Ok::<(), ApiError>(())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_gets_trailing_slash() {
        let api = HttpAssessmentApi::new("http://localhost:8000/api", Duration::from_secs(1)).unwrap();
        assert_eq!(
            api.endpoint(VERIFY_PATH).unwrap().as_str(),
            "http://localhost:8000/api/verify"
        );

        let root = HttpAssessmentApi::new("http://localhost:8000", Duration::from_secs(1)).unwrap();
        assert_eq!(
            root.endpoint(QUESTIONS_PATH).unwrap().as_str(),
            "http://localhost:8000/tests"
        );
    }

    #[test]
    fn rejects_urls_without_host() {
        assert!(HttpAssessmentApi::new("unix:/tmp/socket", Duration::from_secs(1)).is_err());
        assert!(HttpAssessmentApi::new("not a url", Duration::from_secs(1)).is_err());
    }
}
