//! Session-scoped popup state. One `PopupSession` lives exactly as long as one popup.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use uuid::Uuid;

use crate::errors::AppError;
use crate::models::job::{ExtractionResponse, JobPosting};
use crate::models::resume::{ResumeFile, ResumeSource, ResumeSummary};
use crate::popup::status::StatusMessage;

pub const NO_RESUME_LABEL: &str = "No résumé available";
pub const SELECT_RESUME_LABEL: &str = "Select a résumé";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum JobDetection {
    #[default]
    Unset,
    Detected(JobPosting),
    NotDetected,
}

/// Raw résumé selection, before validation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ResumeChoice {
    #[default]
    Unselected,
    /// Existing-résumé mode; an empty id is the picker's placeholder.
    Existing(String),
    /// New-file mode, with or without a file attached yet.
    NewFile(Option<ResumeFile>),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum GenerationPhase {
    #[default]
    Idle,
    Pending,
}

/// Holds the session in `Pending`. Dropping it, on any path including a
/// cancelled future or a panic, puts the session back to `Idle`.
#[derive(Debug)]
#[must_use = "the session returns to Idle as soon as the guard is dropped"]
pub struct GenerationGuard {
    in_flight: Arc<AtomicBool>,
}

impl Drop for GenerationGuard {
    fn drop(&mut self) {
        self.in_flight.store(false, Ordering::SeqCst);
    }
}

/// One entry of the résumé picker. An empty `value` is not selectable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogOption {
    pub value: String,
    pub label: String,
}

#[derive(Debug)]
pub struct PopupSession {
    id: Uuid,
    job: JobDetection,
    choice: ResumeChoice,
    catalog: Vec<ResumeSummary>,
    in_flight: Arc<AtomicBool>,
    status: Option<StatusMessage>,
    backend_warning: Option<String>,
}

impl Default for PopupSession {
    fn default() -> Self {
        Self::new()
    }
}

impl PopupSession {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            job: JobDetection::Unset,
            choice: ResumeChoice::Unselected,
            catalog: Vec::new(),
            in_flight: Arc::new(AtomicBool::new(false)),
            status: None,
            backend_warning: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    // ── Job posting ─────────────────────────────────────────────────────────

    pub fn job(&self) -> &JobDetection {
        &self.job
    }

    pub fn job_posting(&self) -> Option<&JobPosting> {
        match &self.job {
            JobDetection::Detected(posting) => Some(posting),
            _ => None,
        }
    }

    /// Records the extraction reply. The job is captured once per session;
    /// later calls are ignored and return the current detection.
    pub fn record_extraction(&mut self, response: ExtractionResponse) -> &JobDetection {
        if self.job == JobDetection::Unset {
            self.job = match response.into_posting() {
                Some(posting) => JobDetection::Detected(posting),
                None => JobDetection::NotDetected,
            };
        }
        &self.job
    }

    pub fn mark_not_detected(&mut self) {
        if self.job == JobDetection::Unset {
            self.job = JobDetection::NotDetected;
        }
    }

    // ── Résumé catalog ──────────────────────────────────────────────────────

    pub fn catalog(&self) -> &[ResumeSummary] {
        &self.catalog
    }

    /// Replaces the catalog. A non-empty catalog switches to existing-résumé
    /// mode with the first (most recently used) entry preselected.
    pub fn set_catalog(&mut self, cvs: Vec<ResumeSummary>) {
        self.catalog = cvs;
        if let Some(first) = self.catalog.first() {
            self.choice = ResumeChoice::Existing(first.id.clone());
        }
    }

    pub fn catalog_options(&self) -> Vec<CatalogOption> {
        if self.catalog.is_empty() {
            return vec![CatalogOption {
                value: String::new(),
                label: NO_RESUME_LABEL.to_string(),
            }];
        }
        let placeholder = CatalogOption {
            value: String::new(),
            label: SELECT_RESUME_LABEL.to_string(),
        };
        std::iter::once(placeholder)
            .chain(self.catalog.iter().map(|cv| CatalogOption {
                value: cv.id.clone(),
                label: cv.label(),
            }))
            .collect()
    }

    // ── Résumé selection ────────────────────────────────────────────────────

    pub fn choice(&self) -> &ResumeChoice {
        &self.choice
    }

    /// Switches to existing-résumé mode, dropping any attached file.
    pub fn choose_existing_mode(&mut self) {
        if !matches!(self.choice, ResumeChoice::Existing(_)) {
            self.choice = ResumeChoice::Existing(String::new());
        }
    }

    /// Switches to new-file mode, dropping any selected existing id.
    pub fn choose_new_file_mode(&mut self) {
        if !matches!(self.choice, ResumeChoice::NewFile(_)) {
            self.choice = ResumeChoice::NewFile(None);
        }
    }

    pub fn select_existing(&mut self, id: impl Into<String>) {
        self.choice = ResumeChoice::Existing(id.into());
    }

    /// Attaches a file in new-file mode. Non-PDF files are kept but never valid.
    pub fn attach_file(&mut self, file: ResumeFile) {
        if file.is_pdf() {
            self.set_status(StatusMessage::success(format!(
                "Résumé selected: {}",
                file.file_name
            )));
        } else {
            self.set_status(StatusMessage::error("Please select a PDF file"));
        }
        self.choice = ResumeChoice::NewFile(Some(file));
    }

    /// Validates the current selection into a résumé source.
    pub fn resume_source(&self) -> Result<ResumeSource, AppError> {
        match &self.choice {
            ResumeChoice::Unselected => Err(AppError::Validation(
                "Please choose a résumé source".to_string(),
            )),
            ResumeChoice::Existing(id) if id.trim().is_empty() => Err(AppError::Validation(
                "Please select an existing résumé".to_string(),
            )),
            ResumeChoice::Existing(id) => Ok(ResumeSource::ExistingResume { id: id.clone() }),
            ResumeChoice::NewFile(None) => Err(AppError::Validation(
                "Please select a résumé file (PDF)".to_string(),
            )),
            ResumeChoice::NewFile(Some(file)) if !file.is_pdf() => Err(AppError::Validation(
                "Please select a PDF file".to_string(),
            )),
            ResumeChoice::NewFile(Some(file)) => Ok(ResumeSource::NewResumeFile(file.clone())),
        }
    }

    // ── Generation gating ───────────────────────────────────────────────────

    /// A job posting is detected and exactly one valid résumé source is selected.
    pub fn can_generate(&self) -> bool {
        self.job_posting()
            .is_some_and(|posting| posting.has_enough_content())
            && self.resume_source().is_ok()
    }

    /// Whether the generate action is currently clickable.
    pub fn generate_enabled(&self) -> bool {
        self.can_generate() && self.phase() == GenerationPhase::Idle
    }

    pub fn phase(&self) -> GenerationPhase {
        if self.in_flight.load(Ordering::SeqCst) {
            GenerationPhase::Pending
        } else {
            GenerationPhase::Idle
        }
    }

    /// Re-validates everything the generation needs. UI state may be stale,
    /// so this does not trust `can_generate`.
    pub fn prepare_generation(&self) -> Result<(JobPosting, ResumeSource), AppError> {
        let posting = self
            .job_posting()
            .filter(|posting| posting.has_enough_content())
            .cloned()
            .ok_or_else(|| {
                AppError::Validation(
                    "No job posting detected on this page. Try reloading the page.".to_string(),
                )
            })?;
        let source = self.resume_source()?;
        Ok((posting, source))
    }

    /// Moves to `Pending` until the returned guard is dropped.
    pub fn begin_generation(&self) -> Result<GenerationGuard, AppError> {
        self.in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .map_err(|_| AppError::AlreadyGenerating)?;
        Ok(GenerationGuard {
            in_flight: Arc::clone(&self.in_flight),
        })
    }

    // ── Status ──────────────────────────────────────────────────────────────

    pub fn status(&self) -> Option<&StatusMessage> {
        self.status.as_ref()
    }

    pub fn set_status(&mut self, status: StatusMessage) {
        self.status = Some(status);
    }

    /// Persistent "backend unavailable" warning, independent of the status line.
    pub fn backend_warning(&self) -> Option<&str> {
        self.backend_warning.as_deref()
    }

    pub fn set_backend_warning(&mut self, warning: impl Into<String>) {
        self.backend_warning = Some(warning.into());
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;

    fn detected_session() -> PopupSession {
        let mut session = PopupSession::new();
        session.record_extraction(ExtractionResponse::new(
            "x".repeat(60),
            "Backend Engineer".into(),
            "https://jobs.example.com/1".into(),
        ));
        session
    }

    fn pdf() -> ResumeFile {
        ResumeFile::new("cv.pdf", "application/pdf", Bytes::from_static(b"%PDF"))
    }

    fn docx() -> ResumeFile {
        ResumeFile::new(
            "cv.docx",
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
            Bytes::from_static(b"PK"),
        )
    }

    fn summary(id: &str) -> ResumeSummary {
        ResumeSummary {
            id: id.into(),
            original_filename: format!("{id}.pdf"),
            upload_date: "2024-05-02T08:00:00".into(),
            last_used: None,
        }
    }

    #[test]
    fn test_can_generate_no_job_no_resume() {
        assert!(!PopupSession::new().can_generate());
    }

    #[test]
    fn test_can_generate_no_job_with_valid_resume() {
        let mut session = PopupSession::new();
        session.select_existing("abc123");
        assert!(!session.can_generate());
    }

    #[test]
    fn test_can_generate_job_without_resume() {
        assert!(!detected_session().can_generate());
    }

    #[test]
    fn test_can_generate_job_with_empty_existing_id() {
        let mut session = detected_session();
        session.choose_existing_mode();
        assert_eq!(session.choice(), &ResumeChoice::Existing(String::new()));
        assert!(!session.can_generate());
    }

    #[test]
    fn test_can_generate_job_with_non_pdf_file() {
        let mut session = detected_session();
        session.choose_new_file_mode();
        session.attach_file(docx());
        assert!(!session.can_generate());
        assert!(session.status().unwrap().is_error());
    }

    #[test]
    fn test_can_generate_job_with_pdf_file() {
        let mut session = detected_session();
        session.choose_new_file_mode();
        session.attach_file(pdf());
        assert!(session.can_generate());
    }

    #[test]
    fn test_can_generate_job_with_existing_id() {
        let mut session = detected_session();
        session.select_existing("abc123");
        assert!(session.can_generate());
    }

    #[test]
    fn test_can_generate_false_when_not_detected() {
        let mut session = PopupSession::new();
        session.record_extraction(ExtractionResponse::new(
            "short".into(),
            "t".into(),
            "u".into(),
        ));
        session.select_existing("abc123");
        assert_eq!(session.job(), &JobDetection::NotDetected);
        assert!(!session.can_generate());
    }

    #[test]
    fn test_switching_to_existing_drops_new_file() {
        let mut session = detected_session();
        session.choose_new_file_mode();
        session.attach_file(pdf());
        assert!(session.can_generate());

        session.choose_existing_mode();
        assert_eq!(session.choice(), &ResumeChoice::Existing(String::new()));
        assert!(!session.can_generate());

        session.choose_new_file_mode();
        assert_eq!(session.choice(), &ResumeChoice::NewFile(None));
    }

    #[test]
    fn test_switching_to_new_file_drops_existing_id() {
        let mut session = detected_session();
        session.select_existing("abc123");
        session.choose_new_file_mode();
        assert!(!session.can_generate());
        assert!(matches!(
            session.resume_source(),
            Err(AppError::Validation(msg)) if msg.contains("PDF")
        ));
    }

    #[test]
    fn test_choosing_the_current_mode_keeps_selection() {
        let mut session = detected_session();
        session.select_existing("abc123");
        session.choose_existing_mode();
        assert_eq!(session.choice(), &ResumeChoice::Existing("abc123".into()));
    }

    #[test]
    fn test_job_is_captured_once() {
        let mut session = detected_session();
        session.record_extraction(ExtractionResponse::new(
            "y".repeat(80),
            "Other".into(),
            "https://other".into(),
        ));
        assert_eq!(session.job_posting().unwrap().title, "Backend Engineer");

        session.mark_not_detected();
        assert!(session.job_posting().is_some());
    }

    #[test]
    fn test_empty_catalog_shows_no_resume_option() {
        let session = PopupSession::new();
        let options = session.catalog_options();
        assert_eq!(options.len(), 1);
        assert_eq!(options[0].label, NO_RESUME_LABEL);
        assert!(options[0].value.is_empty());
    }

    #[test]
    fn test_catalog_preselects_first_entry() {
        let mut session = detected_session();
        session.set_catalog(vec![summary("recent"), summary("older")]);
        assert_eq!(session.choice(), &ResumeChoice::Existing("recent".into()));
        assert!(session.can_generate());

        let options = session.catalog_options();
        assert_eq!(options[0].label, SELECT_RESUME_LABEL);
        assert_eq!(options[1].value, "recent");
        assert_eq!(options[1].label, "recent.pdf (02/05/2024)");
        assert_eq!(options.len(), 3);
    }

    #[test]
    fn test_empty_catalog_leaves_choice_alone() {
        let mut session = detected_session();
        session.attach_file(pdf());
        session.set_catalog(Vec::new());
        assert!(matches!(session.choice(), ResumeChoice::NewFile(Some(_))));
    }

    #[test]
    fn test_generation_guard_rejects_overlap() {
        let session = detected_session();
        let guard = session.begin_generation().unwrap();
        assert_eq!(session.phase(), GenerationPhase::Pending);
        assert!(matches!(
            session.begin_generation(),
            Err(AppError::AlreadyGenerating)
        ));

        drop(guard);
        assert_eq!(session.phase(), GenerationPhase::Idle);
    }

    #[test]
    fn test_generation_guard_resets_on_panic() {
        let mut session = detected_session();
        session.select_existing("abc123");

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _guard = session.begin_generation().unwrap();
            panic!("generation aborted");
        }));

        assert!(result.is_err());
        assert_eq!(session.phase(), GenerationPhase::Idle);
        assert!(session.generate_enabled());
    }

    #[test]
    fn test_generate_disabled_while_pending() {
        let mut session = detected_session();
        session.select_existing("abc123");
        assert!(session.generate_enabled());

        let _guard = session.begin_generation().unwrap();
        assert!(session.can_generate());
        assert!(!session.generate_enabled());
    }

    #[test]
    fn test_prepare_generation_requires_job() {
        let mut session = PopupSession::new();
        session.select_existing("abc123");
        let err = session.prepare_generation().unwrap_err();
        assert!(err.user_message().contains("No job posting detected"));
    }
}
