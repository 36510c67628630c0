//! Client-side download of the generated letter.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tracing::info;

use crate::errors::AppError;

pub const LETTER_FILE_PREFIX: &str = "lettre_motivation_";
pub const LETTER_FILE_EXTENSION: &str = "pdf";
/// Keeps the file name, including a ` (n)` suffix, under the usual 255-byte limit.
pub const MAX_TITLE_CHARS: usize = 200;

/// `lettre_motivation_<title>.pdf`, with every character that is not ASCII
/// alphanumeric replaced by `_` and the title cut to `MAX_TITLE_CHARS`.
pub fn letter_filename(job_title: &str) -> String {
    let sanitized: String = job_title
        .chars()
        .take(MAX_TITLE_CHARS)
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    format!("{LETTER_FILE_PREFIX}{sanitized}.{LETTER_FILE_EXTENSION}")
}

/// Where downloaded documents end up.
#[async_trait]
pub trait DownloadSink: Send + Sync {
    /// Saves `document` under `filename` and returns where it landed.
    async fn save(&self, filename: &str, document: &Bytes) -> Result<PathBuf, AppError>;
}

/// Saves into a directory. An existing file is never overwritten; like a
/// browser, a ` (n)` suffix is added instead.
pub struct DirectoryDownloads {
    dir: PathBuf,
}

impl DirectoryDownloads {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// `filename` for the first attempt, then `stem (n).ext`.
    fn candidate(&self, filename: &str, attempt: u32) -> PathBuf {
        if attempt == 0 {
            return self.dir.join(filename);
        }
        let name = Path::new(filename);
        let stem = name
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| filename.to_string());
        let extension = name
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_default();
        self.dir.join(format!("{stem} ({attempt}){extension}"))
    }
}

#[async_trait]
impl DownloadSink for DirectoryDownloads {
    async fn save(&self, filename: &str, document: &Bytes) -> Result<PathBuf, AppError> {
        tokio::fs::create_dir_all(&self.dir).await?;

        let mut attempt = 0;
        let (path, mut file) = loop {
            let path = self.candidate(filename, attempt);
            match OpenOptions::new().write(true).create_new(true).open(&path).await {
                Ok(file) => break (path, file),
                Err(e) if e.kind() == ErrorKind::AlreadyExists => attempt += 1,
                Err(e) => return Err(e.into()),
            }
        };
        file.write_all(document).await?;
        file.flush().await?;

        info!(path = %path.display(), bytes = document.len(), "Letter saved");
        Ok(path)
    }
}
