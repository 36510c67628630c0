//! Cross-context message bus between the popup and the page scraper.
//!
//! Requests are typed, answered exactly once through a oneshot reply, and
//! bounded by a caller-supplied timeout.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

use crate::models::job::ExtractionResponse;
use crate::page_scraper::page::Page;

const MAILBOX_CAPACITY: usize = 8;

/// Wire shape: `{ "action": "extractContent" }`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum PageRequest {
    ExtractContent,
}

#[derive(Debug, Error)]
pub enum ChannelError {
    /// Nothing is listening on the page (scraper not injected or already gone).
    #[error("no page scraper is listening on this page")]
    NoReceiver,

    #[error("page scraper did not answer within {0:?}")]
    Timeout(Duration),

    #[error("page scraper dropped the request without answering")]
    ReplyDropped,
}

struct Envelope {
    request: PageRequest,
    reply: oneshot::Sender<ExtractionResponse>,
}

/// Popup-side end of the bus.
#[derive(Clone)]
pub struct ScraperHandle {
    tx: mpsc::Sender<Envelope>,
}

impl ScraperHandle {
    /// A handle to a tab with no scraper injected. Every request fails with `NoReceiver`.
    pub fn detached() -> Self {
        let (tx, _rx) = mpsc::channel(1);
        Self { tx }
    }

    /// Sends one request and waits for its reply, for at most `timeout`.
    pub async fn request(
        &self,
        request: PageRequest,
        timeout: Duration,
    ) -> Result<ExtractionResponse, ChannelError> {
        let (reply, rx) = oneshot::channel();
        let round_trip = async {
            self.tx
                .send(Envelope { request, reply })
                .await
                .map_err(|_| ChannelError::NoReceiver)?;
            rx.await.map_err(|_| ChannelError::ReplyDropped)
        };

        tokio::time::timeout(timeout, round_trip)
            .await
            .map_err(|_| ChannelError::Timeout(timeout))?
    }

    pub async fn extract_content(
        &self,
        timeout: Duration,
    ) -> Result<ExtractionResponse, ChannelError> {
        self.request(PageRequest::ExtractContent, timeout).await
    }
}

/// Page-side end of the bus: owns the page and answers requests one at a time.
pub struct PageScraper {
    page: Page,
    rx: mpsc::Receiver<Envelope>,
}

impl PageScraper {
    /// Injects the scraper into `page`: shows the indicator and starts listening.
    pub fn spawn(page: Page) -> ScraperHandle {
        let (tx, rx) = mpsc::channel(MAILBOX_CAPACITY);
        page.show_indicator();
        info!(url = page.url(), "Page scraper listening");

        let scraper = PageScraper { page, rx };
        tokio::spawn(scraper.run());
        ScraperHandle { tx }
    }

    async fn run(mut self) {
        while let Some(envelope) = self.rx.recv().await {
            let response = self.handle(envelope.request);
            if envelope.reply.send(response).is_err() {
                debug!("Requester went away before the reply was delivered");
            }
        }
        debug!(url = self.page.url(), "Page scraper stopped");
    }

    fn handle(&self, request: PageRequest) -> ExtractionResponse {
        match request {
            PageRequest::ExtractContent => {
                let response = self.page.extract();
                debug!(
                    chars = response.content.chars().count(),
                    success = response.success,
                    "Extraction done"
                );
                response
            }
        }
    }
}
