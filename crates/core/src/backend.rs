use async_trait::async_trait;
use reqwest::{Client, Response, Url};
use serde::Deserialize;

use crate::{
    config::ClientConfig,
    error::{Result, SynopsisError},
    input::{ModelOptions, SubmissionInput},
    types::{JobStatus, ResultBundle},
};

/// The job service behind `/api/v1/*`.
#[async_trait]
pub trait JobBackend: Send + Sync {
    /// Create a job and return its id.
    async fn submit(&self, input: &SubmissionInput, options: &ModelOptions) -> Result<String>;

    /// One status request, no retry.
    async fn status(&self, job_id: &str) -> Result<JobStatus>;

    async fn result(&self, job_id: &str) -> Result<ResultBundle>;

    /// Server-rendered PDF report.
    async fn export_pdf(&self, job_id: &str) -> Result<Vec<u8>>;

    async fn translate(&self, text: &str, target_lang: &str) -> Result<String>;
}

#[derive(Deserialize)]
struct SubmitResponse {
    job_id: String,
}

#[derive(Deserialize)]
struct TranslateResponse {
    translated_text: String,
}

/// reqwest-backed implementation of [`JobBackend`].
#[derive(Clone)]
pub struct HttpBackend {
    client: Client,
    base_url: String,
}

impl HttpBackend {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let client = Client::builder().timeout(config.request_timeout).build()?;
        Ok(Self {
            client,
            base_url: config.api_url.trim_end_matches('/').to_string(),
        })
    }

    /// `{base}/api/v1/{segments...}`. Each segment is percent-encoded, so a
    /// job id always stays a single path segment.
    fn endpoint(&self, segments: &[&str]) -> std::result::Result<Url, String> {
        let mut url = Url::parse(&self.base_url).map_err(|e| format!("invalid api url: {e}"))?;
        url.path_segments_mut()
            .map_err(|_| format!("api url cannot have a path: {}", self.base_url))?
            .pop_if_empty()
            .extend(["api", "v1"])
            .extend(segments);
        Ok(url)
    }
}

/// Turn a non-2xx response into a short reason, preferring the server's
/// `detail` message.
async fn error_for_status(response: Response) -> std::result::Result<Response, String> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let detail = serde_json::from_str::<serde_json::Value>(&body)
        .ok()
        .and_then(|v| v["detail"].as_str().map(str::to_string))
        .unwrap_or(body);

    if detail.trim().is_empty() {
        Err(format!("HTTP {}", status))
    } else {
        Err(format!("HTTP {}: {}", status, detail.trim()))
    }
}

#[async_trait]
impl JobBackend for HttpBackend {
    async fn submit(&self, input: &SubmissionInput, options: &ModelOptions) -> Result<String> {
        let failed = |reason: String| SynopsisError::SubmissionFailed { reason };

        let form = input.to_form(options)?;
        let url = self.endpoint(&["submit"]).map_err(failed)?;
        let response = self
            .client
            .post(url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| failed(e.to_string()))?;
        let response = error_for_status(response).await.map_err(failed)?;

        let body: SubmitResponse = response.json().await.map_err(|e| failed(e.to_string()))?;
        tracing::debug!(job_id = %body.job_id, kind = %input.kind, "Job submitted");
        Ok(body.job_id)
    }

    async fn status(&self, job_id: &str) -> Result<JobStatus> {
        let failed = |reason: String| SynopsisError::PollFailed {
            job_id: job_id.to_string(),
            reason,
        };

        let url = self.endpoint(&["status", job_id]).map_err(failed)?;
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| failed(e.to_string()))?;
        let response = error_for_status(response).await.map_err(failed)?;

        response.json().await.map_err(|e| failed(e.to_string()))
    }

    async fn result(&self, job_id: &str) -> Result<ResultBundle> {
        let failed = |reason: String| SynopsisError::FetchFailed {
            job_id: job_id.to_string(),
            reason,
        };

        let url = self.endpoint(&["result", job_id]).map_err(failed)?;
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| failed(e.to_string()))?;
        let response = error_for_status(response).await.map_err(failed)?;

        let mut bundle: ResultBundle = response.json().await.map_err(|e| failed(e.to_string()))?;
        bundle.normalize();
        Ok(bundle)
    }

    async fn export_pdf(&self, job_id: &str) -> Result<Vec<u8>> {
        let failed = |reason: String| SynopsisError::ExportFailed {
            format: "pdf".to_string(),
            reason,
        };

        let url = self.endpoint(&["export", "pdf", job_id]).map_err(failed)?;
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| failed(e.to_string()))?;
        let response = error_for_status(response).await.map_err(failed)?;

        let bytes = response.bytes().await.map_err(|e| failed(e.to_string()))?;
        if bytes.is_empty() {
            return Err(failed("server returned an empty document".to_string()));
        }
        Ok(bytes.to_vec())
    }

    async fn translate(&self, text: &str, target_lang: &str) -> Result<String> {
        let failed = |reason: String| SynopsisError::TranslationFailed { reason };

        let url = self.endpoint(&["translate"]).map_err(failed)?;
        let response = self
            .client
            .post(url)
            .json(&serde_json::json!({
                "text": text,
                "target_lang": target_lang,
            }))
            .send()
            .await
            .map_err(|e| failed(e.to_string()))?;
        let response = error_for_status(response).await.map_err(failed)?;

        let body: TranslateResponse = response.json().await.map_err(|e| failed(e.to_string()))?;
        Ok(body.translated_text)
    }
}
