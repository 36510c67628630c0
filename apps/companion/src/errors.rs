use thiserror::Error;
use tracing::error;

use crate::backend::BackendError;
use crate::page_scraper::channel::ChannelError;

const CONNECTIVITY_MESSAGE: &str =
    "Could not reach the backend. Check that the server is running.";

/// Application-level error type.
/// `user_message` turns any variant into the status line shown to the user.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Extraction failed: {0}")]
    Extraction(#[from] ChannelError),

    #[error("No job posting detected on {url}")]
    NoJobDetected { url: String },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("A cover letter is already being generated")]
    AlreadyGenerating,

    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    #[error("Download failed: {0}")]
    Download(#[from] std::io::Error),
}

impl AppError {
    pub fn user_message(&self) -> String {
        match self {
            AppError::Extraction(e) => {
                error!("Extraction error: {e}");
                "Error while extracting the page content".to_string()
            }
            AppError::NoJobDetected { url } => {
                format!("Could not detect a job posting on this page. URL: {url}")
            }
            AppError::Validation(msg) => msg.clone(),
            AppError::AlreadyGenerating => self.to_string(),
            AppError::Backend(BackendError::Api { message, .. }) => {
                format!("Backend error: {message}")
            }
            AppError::Backend(BackendError::InvalidMime(mime)) => {
                format!("Unsupported résumé file type: {mime}")
            }
            AppError::Backend(e) => {
                error!("Backend error: {e}");
                CONNECTIVITY_MESSAGE.to_string()
            }
            AppError::Download(e) => format!("Could not save the letter: {e}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn test_api_error_surfaces_raw_backend_text() {
        let err = AppError::Backend(BackendError::Api {
            status: 500,
            message: "server error".into(),
        });
        assert!(err.user_message().contains("server error"));
    }

    #[test]
    fn test_invalid_mime_is_not_reported_as_connectivity() {
        let err = AppError::Backend(BackendError::InvalidMime("text/plain; x".into()));
        let message = err.user_message();
        assert!(message.contains("text/plain; x"));
        assert_ne!(message, CONNECTIVITY_MESSAGE);
    }

    #[test]
    fn test_parse_error_is_reported_as_connectivity() {
        let parse = serde_json::from_str::<serde_json::Value>("not json").unwrap_err();
        let err = AppError::Backend(BackendError::Parse(parse));
        assert_eq!(err.user_message(), CONNECTIVITY_MESSAGE);
    }

    #[test]
    fn test_channel_timeout_is_an_extraction_error() {
        let err: AppError = ChannelError::Timeout(Duration::from_secs(1)).into();
        assert_eq!(err.user_message(), "Error while extracting the page content");
    }

    #[test]
    fn test_validation_message_is_shown_verbatim() {
        let err = AppError::Validation("Please select a PDF file".into());
        assert_eq!(err.user_message(), "Please select a PDF file");
    }
}
