//! Page Scraper — best-effort job title/content extraction from a page's DOM.
//!
//! The heuristics are pure functions over the [`DomQuery`] abstraction, so they
//! can be exercised without a rendering environment. [`html::HtmlDocument`] is
//! the concrete DOM used at runtime.

pub mod channel;
pub mod html;
pub mod indicator;
pub mod page;

use crate::models::job::ExtractionResponse;

/// Content selectors in priority order: site-specific first, generic fallback last.
pub const CONTENT_SELECTORS: &[&str] = &[
    // JobTeaser
    ".job-description",
    "[data-testid=\"job-description\"]",
    ".offer-description",
    // LinkedIn
    ".jobs-description-content__text",
    ".jobs-box__html-content",
    // Indeed
    ".jobsearch-jobDescriptionText",
    "#jobDescriptionText",
    // Generic
    "[class*=\"description\"]",
    "[class*=\"content\"]",
    "[id*=\"description\"]",
    "main",
    "article",
    ".job-detail",
    ".job-content",
];

pub const TITLE_SELECTORS: &[&str] = &[
    "h1",
    ".job-title",
    "[data-testid=\"job-title\"]",
    ".position-title",
    ".offer-title",
];

/// A selector match must be strictly longer than this to be accepted.
pub const MIN_SELECTOR_CONTENT_CHARS: usize = 100;
/// Fallback lines of this length or shorter are dropped.
pub const MIN_FALLBACK_LINE_CHARS: usize = 5;
pub const MAX_FALLBACK_CHARS: usize = 5000;
/// Lines containing any of these are cookie/JavaScript notices, not job text.
pub const BOILERPLATE_MARKERS: &[&str] = &["Cookie", "JavaScript"];
pub const UNIDENTIFIED_TITLE: &str = "Unidentified position";

/// Read-only view of a document, as much as the heuristics need.
pub trait DomQuery {
    /// Text content of the first element matching `selector`, untrimmed.
    fn first_text(&self, selector: &str) -> Option<String>;

    /// Visible text of the whole page body, line breaks preserved.
    fn body_text(&self) -> String;
}

/// Ordered candidate strings: the trimmed text of the first match of each selector.
///
/// Selectors with no match contribute nothing; later matches of the same
/// selector are never considered.
pub fn candidate_texts<'a, D>(
    dom: &'a D,
    selectors: &'a [&'a str],
) -> impl Iterator<Item = String> + 'a
where
    D: DomQuery + ?Sized,
{
    selectors
        .iter()
        .filter_map(move |selector| dom.first_text(selector))
        .map(|text| text.trim().to_string())
}

/// Extracts the job description text, falling back to the cleaned page body.
pub fn extract_content<D: DomQuery + ?Sized>(dom: &D) -> String {
    candidate_texts(dom, CONTENT_SELECTORS)
        .find(|text| text.chars().count() > MIN_SELECTOR_CONTENT_CHARS)
        .unwrap_or_else(|| clean_body_text(&dom.body_text()))
}

pub fn extract_title<D: DomQuery + ?Sized>(dom: &D) -> String {
    candidate_texts(dom, TITLE_SELECTORS)
        .find(|text| !text.is_empty())
        .unwrap_or_else(|| UNIDENTIFIED_TITLE.to_string())
}

/// Runs both extractions and packages the reply for the message bus.
pub fn extract<D: DomQuery + ?Sized>(dom: &D, url: &str) -> ExtractionResponse {
    let content = extract_content(dom);
    let title = extract_title(dom);
    ExtractionResponse::new(content, title, url.to_string())
}

/// Whole-page fallback: keep meaningful lines, join them, cap the length.
pub fn clean_body_text(text: &str) -> String {
    let joined = text
        .split('\n')
        .map(str::trim)
        .filter(|line| line.chars().count() > MIN_FALLBACK_LINE_CHARS)
        .filter(|line| !BOILERPLATE_MARKERS.iter().any(|marker| line.contains(marker)))
        .collect::<Vec<_>>()
        .join(" ");
    truncate_chars(joined, MAX_FALLBACK_CHARS)
}

fn truncate_chars(mut text: String, max_chars: usize) -> String {
    if let Some((byte_index, _)) = text.char_indices().nth(max_chars) {
        text.truncate(byte_index);
    }
    text
}
