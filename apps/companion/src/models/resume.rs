use std::path::Path;

use anyhow::{Context, Result};
use bytes::Bytes;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

pub const PDF_MIME: &str = "application/pdf";

/// A résumé previously uploaded to the backend, as listed by `GET /cv/list`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResumeSummary {
    pub id: String,
    pub original_filename: String,
    pub upload_date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_used: Option<String>,
}

impl ResumeSummary {
    /// Picker label: `"<original_filename> (<dd/mm/yyyy>)"`.
    pub fn label(&self) -> String {
        let date = parse_upload_date(&self.upload_date)
            .map(|d| d.format("%d/%m/%Y").to_string())
            .unwrap_or_else(|| self.upload_date.clone());
        format!("{} ({})", self.original_filename, date)
    }
}

/// The backend emits naive ISO timestamps; RFC 3339 and bare dates are accepted too.
fn parse_upload_date(raw: &str) -> Option<NaiveDate> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.date_naive());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(dt.date());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CvListResponse {
    #[serde(default)]
    pub cvs: Vec<ResumeSummary>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadResponse {
    #[serde(default)]
    pub success: bool,
    pub cv_id: String,
    #[serde(default)]
    pub message: Option<String>,
}

/// A résumé file picked by the user, not yet known to the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResumeFile {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Bytes,
}

impl ResumeFile {
    pub fn new(file_name: impl Into<String>, mime_type: impl Into<String>, bytes: Bytes) -> Self {
        Self {
            file_name: file_name.into(),
            mime_type: mime_type.into(),
            bytes,
        }
    }

    /// Reads a file from disk, guessing its MIME type from the extension.
    pub async fn load(path: &Path) -> Result<Self> {
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read résumé file {}", path.display()))?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "cv.pdf".to_string());
        let mime_type = mime_guess::from_path(path)
            .first_or_octet_stream()
            .essence_str()
            .to_string();
        Ok(Self::new(file_name, mime_type, Bytes::from(bytes)))
    }

    pub fn is_pdf(&self) -> bool {
        self.mime_type == PDF_MIME
    }
}

/// A validated résumé source. Exactly one variant is active per generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResumeSource {
    ExistingResume { id: String },
    NewResumeFile(ResumeFile),
}

impl ResumeSource {
    pub fn is_new_file(&self) -> bool {
        matches!(self, ResumeSource::NewResumeFile(_))
    }
}

/// Everything `POST /generate-letter` needs. Built at generation time, dropped afterwards.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub offer_content: String,
    pub language: String,
    pub source: ResumeSource,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(upload_date: &str) -> ResumeSummary {
        ResumeSummary {
            id: "cv_1".into(),
            original_filename: "cv.pdf".into(),
            upload_date: upload_date.into(),
            last_used: None,
        }
    }

    #[test]
    fn test_label_formats_naive_iso_timestamp() {
        assert_eq!(summary("2024-03-07T09:15:42.123456").label(), "cv.pdf (07/03/2024)");
    }

    #[test]
    fn test_label_formats_rfc3339_timestamp() {
        assert_eq!(summary("2024-11-30T23:00:00+00:00").label(), "cv.pdf (30/11/2024)");
    }

    #[test]
    fn test_label_keeps_unparseable_date() {
        assert_eq!(summary("yesterday").label(), "cv.pdf (yesterday)");
    }

    #[test]
    fn test_cv_list_tolerates_extra_fields_and_missing_key() {
        let json = r#"{"cvs": [{"id": "a", "original_filename": "a.pdf",
            "upload_date": "2024-01-01T00:00:00", "last_used": "2024-02-01T00:00:00",
            "path": "cv_storage/a.pdf"}]}"#;
        let list: CvListResponse = serde_json::from_str(json).unwrap();
        assert_eq!(list.cvs.len(), 1);
        assert_eq!(list.cvs[0].last_used.as_deref(), Some("2024-02-01T00:00:00"));

        let empty: CvListResponse = serde_json::from_str("{}").unwrap();
        assert!(empty.cvs.is_empty());
    }

    #[tokio::test]
    async fn test_load_guesses_pdf_mime_from_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Jane Doe.pdf");
        tokio::fs::write(&path, b"%PDF-1.4").await.unwrap();

        let file = ResumeFile::load(&path).await.unwrap();
        assert_eq!(file.file_name, "Jane Doe.pdf");
        assert!(file.is_pdf());
        assert_eq!(file.bytes.as_ref(), b"%PDF-1.4");
    }

    #[tokio::test]
    async fn test_load_non_pdf_is_not_pdf() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cv.docx");
        tokio::fs::write(&path, b"PK").await.unwrap();

        let file = ResumeFile::load(&path).await.unwrap();
        assert!(!file.is_pdf());
    }
}
