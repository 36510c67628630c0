/// Backend client — every call to the cover-letter backend goes through here.
///
/// The backend owns résumé storage, language detection and letter rendering;
/// this module only speaks its HTTP contract.
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::models::resume::{
    CvListResponse, GenerationRequest, ResumeFile, ResumeSource, ResumeSummary, UploadResponse,
};

pub const DEFAULT_LANGUAGE: &str = "en";

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid base URL '{0}'")]
    InvalidBaseUrl(String),

    #[error("Invalid MIME type '{0}'")]
    InvalidMime(String),
}

impl BackendError {
    /// True when the backend could not be reached at all (as opposed to answering with an error).
    pub fn is_transport(&self) -> bool {
        matches!(self, BackendError::Http(_) | BackendError::InvalidBaseUrl(_))
    }
}

/// The backend as seen by the popup controller.
#[async_trait]
pub trait LetterBackend: Send + Sync {
    async fn health(&self) -> Result<(), BackendError>;

    async fn list_cvs(&self) -> Result<Vec<ResumeSummary>, BackendError>;

    /// Returns the detected language code, `"en"` when the backend gives none.
    async fn detect_language(&self, content: &str) -> Result<String, BackendError>;

    /// Returns the rendered letter document.
    async fn generate_letter(&self, request: &GenerationRequest) -> Result<Bytes, BackendError>;

    async fn upload_cv(&self, file: &ResumeFile) -> Result<UploadResponse, BackendError>;
}

#[derive(Debug, Deserialize)]
struct LanguageResponse {
    #[serde(default)]
    langue: Option<String>,
}

/// FastAPI-style error body.
#[derive(Debug, Deserialize)]
struct ErrorDetail {
    detail: String,
}

/// HTTP implementation of [`LetterBackend`].
#[derive(Clone)]
pub struct BackendClient {
    client: Client,
    base_url: String,
}

impl BackendClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, BackendError> {
        let base_url = base_url.trim_end_matches('/').to_string();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(BackendError::InvalidBaseUrl(base_url));
        }
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn file_part(file: &ResumeFile) -> Result<Part, BackendError> {
        Part::bytes(file.bytes.to_vec())
            .file_name(file.file_name.clone())
            .mime_str(&file.mime_type)
            .map_err(|_| BackendError::InvalidMime(file.mime_type.clone()))
    }
}

#[async_trait]
impl LetterBackend for BackendClient {
    async fn health(&self) -> Result<(), BackendError> {
        let response = self.client.get(self.url("/health")).send().await?;
        ensure_success(response).await?;
        Ok(())
    }

    async fn list_cvs(&self) -> Result<Vec<ResumeSummary>, BackendError> {
        let response = self.client.get(self.url("/cv/list")).send().await?;
        let response = ensure_success(response).await?;
        let body = response.text().await?;
        let list: CvListResponse = serde_json::from_str(&body)?;
        debug!(count = list.cvs.len(), "Résumé catalog fetched");
        Ok(list.cvs)
    }

    async fn detect_language(&self, content: &str) -> Result<String, BackendError> {
        let response = self
            .client
            .post(self.url("/detect-language"))
            .form(&[("content", content)])
            .send()
            .await?;
        let response = ensure_success(response).await?;
        let body = response.text().await?;
        let parsed: LanguageResponse = serde_json::from_str(&body)?;

        let language = parsed
            .langue
            .filter(|code| !code.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_LANGUAGE.to_string());
        debug!(language = %language, "Language detected");
        Ok(language)
    }

    async fn generate_letter(&self, request: &GenerationRequest) -> Result<Bytes, BackendError> {
        let form = Form::new()
            .text("offre_content", request.offer_content.clone())
            .text("langue", request.language.clone());
        let form = match &request.source {
            ResumeSource::ExistingResume { id } => form.text("cv_id", id.clone()),
            ResumeSource::NewResumeFile(file) => form.part("cv_file", Self::file_part(file)?),
        };

        let response = self
            .client
            .post(self.url("/generate-letter"))
            .multipart(form)
            .send()
            .await?;
        let response = ensure_success(response).await?;
        let document = response.bytes().await?;
        debug!(bytes = document.len(), "Letter document received");
        Ok(document)
    }

    async fn upload_cv(&self, file: &ResumeFile) -> Result<UploadResponse, BackendError> {
        let form = Form::new().part("cv_file", Self::file_part(file)?);
        let response = self
            .client
            .post(self.url("/cv/upload"))
            .multipart(form)
            .send()
            .await?;
        let response = ensure_success(response).await?;
        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }
}

/// Passes 2xx responses through; turns anything else into `BackendError::Api`.
async fn ensure_success(response: Response) -> Result<Response, BackendError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    warn!("Backend returned {}: {}", status, body);
    Err(BackendError::Api {
        status: status.as_u16(),
        message: error_message(&body),
    })
}

/// Error bodies are plain text on some endpoints and `{"detail": ...}` JSON on others.
fn error_message(body: &str) -> String {
    serde_json::from_str::<ErrorDetail>(body)
        .map(|e| e.detail)
        .unwrap_or_else(|_| body.trim().to_string())
}
