//! `DomQuery` over a parsed HTML document.

use scraper::{ElementRef, Html, Node, Selector};
use tracing::warn;

use crate::page_scraper::DomQuery;

/// Subtrees whose text never renders.
const HIDDEN_TAGS: &[&str] = &["script", "style", "noscript", "template"];

pub struct HtmlDocument {
    html: Html,
}

impl HtmlDocument {
    pub fn parse(source: &str) -> Self {
        Self {
            html: Html::parse_document(source),
        }
    }

    fn body(&self) -> ElementRef<'_> {
        Selector::parse("body")
            .ok()
            .and_then(|selector| self.html.select(&selector).next())
            .unwrap_or_else(|| self.html.root_element())
    }
}

impl DomQuery for HtmlDocument {
    fn first_text(&self, selector: &str) -> Option<String> {
        let parsed = match Selector::parse(selector) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!(selector, "Ignoring invalid selector: {e}");
                return None;
            }
        };
        self.html
            .select(&parsed)
            .next()
            .map(|element| element.text().collect())
    }

    fn body_text(&self) -> String {
        let mut text = String::new();
        collect_visible_text(self.body(), &mut text);
        text
    }
}

fn collect_visible_text(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => out.push_str(text),
            Node::Element(el) if HIDDEN_TAGS.contains(&el.name()) => {}
            Node::Element(_) => {
                if let Some(child_element) = ElementRef::wrap(child) {
                    collect_visible_text(child_element, out);
                }
            }
            _ => {}
        }
    }
}
