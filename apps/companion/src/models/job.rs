use serde::{Deserialize, Serialize};

/// Minimum content length (in characters) for an extraction to count as a job posting.
pub const MIN_JOB_CONTENT_CHARS: usize = 50;

/// A job posting captured from the active page. Immutable once captured.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobPosting {
    pub title: String,
    pub content: String,
    pub url: String,
}

impl JobPosting {
    pub fn content_chars(&self) -> usize {
        self.content.chars().count()
    }

    pub fn has_enough_content(&self) -> bool {
        has_enough_content(&self.content)
    }
}

/// Reply to an `extractContent` request on the message bus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionResponse {
    pub content: String,
    pub title: String,
    pub url: String,
    pub success: bool,
}

impl ExtractionResponse {
    pub fn new(content: String, title: String, url: String) -> Self {
        let success = has_enough_content(&content);
        Self {
            content,
            title,
            url,
            success,
        }
    }

    /// Converts a reply into a job posting. Returns `None` for "no job detected".
    pub fn into_posting(self) -> Option<JobPosting> {
        if !self.success || !has_enough_content(&self.content) {
            return None;
        }
        Some(JobPosting {
            title: self.title,
            content: self.content,
            url: self.url,
        })
    }
}

pub fn has_enough_content(content: &str) -> bool {
    content.chars().count() > MIN_JOB_CONTENT_CHARS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_requires_more_than_fifty_chars() {
        let exactly_fifty = "a".repeat(50);
        let response = ExtractionResponse::new(exactly_fifty, "t".into(), "u".into());
        assert!(!response.success);

        let fifty_one = "a".repeat(51);
        let response = ExtractionResponse::new(fifty_one, "t".into(), "u".into());
        assert!(response.success);
    }

    #[test]
    fn test_response_wire_format() {
        let response = ExtractionResponse::new("x".repeat(60), "Dev".into(), "https://a.b".into());
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["title"], "Dev");
        assert_eq!(json["url"], "https://a.b");
        assert_eq!(json["success"], true);
    }

    #[test]
    fn test_failed_response_is_not_a_posting() {
        let response = ExtractionResponse {
            content: "x".repeat(80),
            title: "Dev".into(),
            url: "u".into(),
            success: false,
        };
        assert!(response.into_posting().is_none());
    }
}
