//! Popup Controller — drives one popup session end to end.
//!
//! Startup: extraction round-trip → résumé catalog → backend liveness.
//! Generate: re-validate → detect language → generate letter → refresh
//! catalog (new file only) → download.
//!
//! Every step handles its own failure and turns it into a status message;
//! nothing here leaves the session in a state that prevents a retry.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::backend::{BackendError, LetterBackend};
use crate::errors::AppError;
use crate::models::job::JobPosting;
use crate::models::resume::{GenerationRequest, ResumeFile, ResumeSource};
use crate::page_scraper::channel::ScraperHandle;
use crate::popup::download::{letter_filename, DownloadSink};
use crate::popup::session::{JobDetection, PopupSession};
use crate::popup::status::StatusMessage;

const BACKEND_DOWN_WARNING: &str = "Backend unavailable. Start the backend server.";
const BACKEND_UNREACHABLE_WARNING: &str =
    "Could not contact the backend. Check that the server is running.";

/// A successfully generated and saved letter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedLetter {
    pub path: PathBuf,
    pub language: String,
}

pub struct PopupController {
    session: PopupSession,
    scraper: ScraperHandle,
    backend: Arc<dyn LetterBackend>,
    downloads: Arc<dyn DownloadSink>,
    extraction_timeout: Duration,
}

impl PopupController {
    pub fn new(
        scraper: ScraperHandle,
        backend: Arc<dyn LetterBackend>,
        downloads: Arc<dyn DownloadSink>,
        extraction_timeout: Duration,
    ) -> Self {
        Self {
            session: PopupSession::new(),
            scraper,
            backend,
            downloads,
            extraction_timeout,
        }
    }

    pub fn session(&self) -> &PopupSession {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut PopupSession {
        &mut self.session
    }

    // ────────────────────────────────────────────────────────────────────────
    // Startup
    // ────────────────────────────────────────────────────────────────────────

    /// Runs the startup sequence once. No step is retried and no step's
    /// failure stops the next one.
    pub async fn open(&mut self) {
        info!(session = %self.session.id(), "Popup opened");
        self.detect_job().await;
        self.load_catalog().await;
        self.check_backend().await;
    }

    async fn detect_job(&mut self) {
        let response = match self.scraper.extract_content(self.extraction_timeout).await {
            Ok(response) => response,
            Err(e) => {
                let err = AppError::from(e);
                self.session.mark_not_detected();
                self.session
                    .set_status(StatusMessage::error(err.user_message()));
                return;
            }
        };

        let url = response.url.clone();
        let detected = match self.session.record_extraction(response) {
            JobDetection::Detected(posting) => Some((posting.title.clone(), posting.content_chars())),
            _ => None,
        };
        match detected {
            Some((title, chars)) => {
                info!(title = %title, chars, "Job posting detected");
                self.session.set_status(StatusMessage::success(format!(
                    "Job posting detected: {chars} characters"
                )));
            }
            None => {
                warn!(url = %url, "No job posting detected");
                let err = AppError::NoJobDetected { url };
                self.session
                    .set_status(StatusMessage::error(err.user_message()));
            }
        }
    }

    /// Fetches the résumé catalog. Any failure degrades to an empty catalog.
    pub async fn load_catalog(&mut self) {
        match self.backend.list_cvs().await {
            Ok(cvs) => {
                info!(count = cvs.len(), "Résumé catalog loaded");
                self.session.set_catalog(cvs);
            }
            Err(e) => {
                warn!("Résumé catalog unavailable, continuing without it: {e}");
                self.session.set_catalog(Vec::new());
            }
        }
    }

    async fn check_backend(&mut self) {
        match self.backend.health().await {
            Ok(()) => info!("Backend available"),
            Err(e) => {
                warn!("Backend health check failed: {e}");
                let warning = if e.is_transport() {
                    BACKEND_UNREACHABLE_WARNING
                } else {
                    BACKEND_DOWN_WARNING
                };
                self.session.set_backend_warning(warning);
            }
        }
    }

    // ────────────────────────────────────────────────────────────────────────
    // Generate
    // ────────────────────────────────────────────────────────────────────────

    /// The generate action. On failure the status line carries the error and
    /// the action is enabled again.
    pub async fn generate(&mut self) -> Result<GeneratedLetter, AppError> {
        let result = self.try_generate().await;
        if let Err(e) = &result {
            self.session.set_status(StatusMessage::error(e.user_message()));
        }
        result
    }

    async fn try_generate(&mut self) -> Result<GeneratedLetter, AppError> {
        let (posting, source) = self.session.prepare_generation()?;
        let guard = self.session.begin_generation()?;
        self.session
            .set_status(StatusMessage::info("Generating cover letter..."));

        let outcome = self.run_generation(&posting, source).await;
        drop(guard);

        let letter = outcome?;
        self.session.set_status(StatusMessage::success(format!(
            "Cover letter generated in {}",
            letter.language
        )));
        Ok(letter)
    }

    async fn run_generation(
        &mut self,
        posting: &JobPosting,
        source: ResumeSource,
    ) -> Result<GeneratedLetter, AppError> {
        info!(
            session = %self.session.id(),
            chars = posting.content_chars(),
            new_file = source.is_new_file(),
            "Generating cover letter"
        );

        let language = self.backend.detect_language(&posting.content).await?;

        let request = GenerationRequest {
            offer_content: posting.content.clone(),
            language,
            source,
        };
        let document = self.backend.generate_letter(&request).await?;
        info!(bytes = document.len(), language = %request.language, "Letter received");

        // The backend stores uploaded files; refresh so they can be picked by id.
        if request.source.is_new_file() {
            self.refresh_catalog().await;
        }

        let filename = letter_filename(&posting.title);
        let path = self.downloads.save(&filename, &document).await?;

        Ok(GeneratedLetter {
            path,
            language: request.language,
        })
    }

    /// Best-effort refresh; a failure keeps the current catalog.
    async fn refresh_catalog(&mut self) {
        match self.backend.list_cvs().await {
            Ok(cvs) => self.session.set_catalog(cvs),
            Err(e) => warn!("Résumé catalog refresh failed: {e}"),
        }
    }

    // ────────────────────────────────────────────────────────────────────────
    // Upload
    // ────────────────────────────────────────────────────────────────────────

    /// Uploads a résumé without generating a letter, then refreshes the catalog.
    /// Returns the id the backend assigned.
    pub async fn upload_resume(&mut self, file: ResumeFile) -> Result<String, AppError> {
        let result = self.try_upload(file).await;
        match &result {
            Ok(id) => self
                .session
                .set_status(StatusMessage::success(format!("Résumé uploaded as {id}"))),
            Err(e) => self.session.set_status(StatusMessage::error(e.user_message())),
        }
        result
    }

    async fn try_upload(&mut self, file: ResumeFile) -> Result<String, AppError> {
        if !file.is_pdf() {
            return Err(AppError::Validation("Please select a PDF file".to_string()));
        }
        let uploaded = self.backend.upload_cv(&file).await?;
        if !uploaded.success {
            let message = uploaded
                .message
                .unwrap_or_else(|| "upload rejected".to_string());
            return Err(AppError::Backend(BackendError::Api {
                status: 200,
                message,
            }));
        }
        self.refresh_catalog().await;
        Ok(uploaded.cv_id)
    }
}
