mod backend;
mod config;
mod errors;
mod models;
mod page_scraper;
mod popup;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::backend::BackendClient;
use crate::config::Config;
use crate::models::resume::ResumeFile;
use crate::page_scraper::channel::{PageScraper, ScraperHandle};
use crate::page_scraper::page::Page;
use crate::popup::download::DirectoryDownloads;
use crate::popup::session::{JobDetection, ResumeChoice};
use crate::popup::{PopupController, PopupSession};

/// Scrape a job posting from a web page and have the backend write a cover letter for it.
#[derive(Debug, Parser)]
#[command(name = "companion", version)]
struct Cli {
    /// Job posting page to fetch and scrape.
    #[arg(long, conflicts_with = "html")]
    url: Option<String>,

    /// Saved HTML page to scrape instead of fetching one.
    #[arg(long)]
    html: Option<PathBuf>,

    /// Address reported for a saved page (defaults to its file:// path).
    #[arg(long, requires = "html")]
    page_url: Option<String>,

    /// Use a résumé already stored by the backend.
    #[arg(long, conflicts_with = "cv_file")]
    cv_id: Option<String>,

    /// Upload a new PDF résumé with the request.
    #[arg(long)]
    cv_file: Option<PathBuf>,

    /// Only upload --cv-file to the backend; do not generate a letter.
    #[arg(long, requires = "cv_file")]
    upload_only: bool,

    /// Print the stored résumés and exit.
    #[arg(long)]
    list: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!("Starting companion v{}", env!("CARGO_PKG_VERSION"));

    let backend = Arc::new(BackendClient::new(&config.backend_url, config.http_timeout)?);
    info!("Backend client initialized ({})", backend.base_url());

    let downloads = Arc::new(DirectoryDownloads::new(&config.download_dir));

    // A run without a page behaves like a tab the scraper was never injected into.
    let scraper = match load_page(&cli).await? {
        Some(page) => PageScraper::spawn(page),
        None => ScraperHandle::detached(),
    };

    let mut popup = PopupController::new(scraper, backend, downloads, config.extraction_timeout);
    popup.open().await;
    report_job(popup.session());
    report(popup.session());

    if cli.list {
        for option in popup.session().catalog_options() {
            if option.value.is_empty() {
                println!("{}", option.label);
            } else {
                println!("{}\t{}", option.value, option.label);
            }
        }
        return Ok(());
    }

    if let Some(path) = &cli.cv_file {
        let file = ResumeFile::load(path).await?;
        if cli.upload_only {
            let uploaded = popup.upload_resume(file).await;
            report(popup.session());
            return match uploaded {
                Ok(id) => {
                    println!("{id}");
                    Ok(())
                }
                Err(e) => bail!(e.user_message()),
            };
        }
        popup.session_mut().choose_new_file_mode();
        popup.session_mut().attach_file(file);
    } else if let Some(id) = &cli.cv_id {
        popup.session_mut().choose_existing_mode();
        popup.session_mut().select_existing(id.clone());
    }
    report_choice(popup.session());

    if !popup.session().generate_enabled() {
        let reason = popup
            .session()
            .prepare_generation()
            .err()
            .map(|e| e.user_message())
            .unwrap_or_else(|| "generation is not available".to_string());
        bail!("Cannot generate a cover letter: {reason}");
    }

    let generated = popup.generate().await;
    report(popup.session());
    match generated {
        Ok(letter) => {
            println!("{}", letter.path.display());
            Ok(())
        }
        Err(e) => bail!(e.user_message()),
    }
}

async fn load_page(cli: &Cli) -> Result<Option<Page>> {
    if let Some(url) = &cli.url {
        let client = reqwest::Client::builder()
            .user_agent(concat!("companion/", env!("CARGO_PKG_VERSION")))
            .build()?;
        return Ok(Some(Page::fetch(&client, url).await?));
    }
    if let Some(path) = &cli.html {
        return Ok(Some(Page::from_file(path, cli.page_url.clone()).await?));
    }
    Ok(None)
}

/// Prints the detected posting, like the popup's job panel.
fn report_job(session: &PopupSession) {
    for line in job_lines(session) {
        eprintln!("{line}");
    }
}

fn job_lines(session: &PopupSession) -> Vec<String> {
    match session.job() {
        JobDetection::Detected(posting) => vec![
            format!("Job: {}", posting.title),
            format!("URL: {}", posting.url),
        ],
        JobDetection::NotDetected | JobDetection::Unset => vec!["Job: none detected".to_string()],
    }
}

fn report_choice(session: &PopupSession) {
    let stored = session.catalog().len();
    match session.choice() {
        ResumeChoice::Existing(id) if !id.is_empty() => {
            eprintln!("Résumé: {id} ({stored} stored)")
        }
        ResumeChoice::NewFile(Some(file)) => eprintln!("Résumé: new file {}", file.file_name),
        _ => eprintln!("Résumé: none selected ({stored} stored)"),
    }
}

/// Prints what the popup would display.
fn report(session: &PopupSession) {
    if let Some(warning) = session.backend_warning() {
        eprintln!("[warning] {warning}");
    }
    if let Some(status) = session.status() {
        eprintln!("{status}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::job::ExtractionResponse;

    #[test]
    fn test_job_lines_show_title_and_url() {
        let mut session = PopupSession::new();
        session.record_extraction(ExtractionResponse::new(
            "Build and run our payment services in Rust. ".repeat(3),
            "Backend Engineer".into(),
            "https://jobs.example.com/42".into(),
        ));

        assert_eq!(
            job_lines(&session),
            vec![
                "Job: Backend Engineer".to_string(),
                "URL: https://jobs.example.com/42".to_string(),
            ]
        );
    }

    #[test]
    fn test_job_lines_without_posting() {
        let mut session = PopupSession::new();
        session.mark_not_detected();
        assert_eq!(job_lines(&session), vec!["Job: none detected".to_string()]);
    }
}
