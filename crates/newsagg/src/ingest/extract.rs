//! Main-text extraction from HTML pages.
//!
//! Simple, best-effort heuristics: prefer `<article>`, then the main
//! landmark, then every paragraph. Text inside `script`, `style` and
//! `noscript` is never returned.

use scraper::{ElementRef, Html, Node, Selector};

/// Elements whose text content is never part of the page text.
const SKIPPED_ELEMENTS: &[&str] = &["script", "style", "noscript"];

/// Selectors tried in order for a single main container.
const CONTAINER_SELECTORS: &[&str] = &["article", r#"[role="main"]"#, "#main"];

/// Extract the main article text from a full HTML document.
///
/// Returns `None` when nothing useful was found.
#[must_use]
pub fn extract_text(html: &str) -> Option<String> {
    let document = Html::parse_document(html);

    for css in CONTAINER_SELECTORS {
        let Some(selector) = parse_selector(css) else {
            continue;
        };
        if let Some(element) = document.select(&selector).next() {
            let text = element_text(element);
            if !text.is_empty() {
                return Some(text);
            }
        }
    }

    let selector = parse_selector("p")?;
    let paragraphs: Vec<String> = document
        .select(&selector)
        .map(element_text)
        .filter(|text| !text.is_empty())
        .collect();

    let joined = paragraphs.join("\n\n");
    let joined = joined.trim();
    if joined.is_empty() {
        None
    } else {
        Some(joined.to_string())
    }
}

/// Strip markup from an HTML fragment, returning its visible text.
///
/// Plain text passes through, trimmed.
#[must_use]
pub fn html_to_text(fragment: &str) -> String {
    let fragment = Html::parse_fragment(fragment);
    element_text(fragment.root_element())
}

/// Visible text of an element: trimmed text nodes joined by single spaces.
fn element_text(element: ElementRef<'_>) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for node in element.descendants() {
        let Node::Text(text) = node.value() else {
            continue;
        };
        let inside_skipped = node.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .is_some_and(|el| SKIPPED_ELEMENTS.contains(&el.name()))
        });
        if inside_skipped {
            continue;
        }
        let trimmed = text.trim();
        if !trimmed.is_empty() {
            parts.push(trimmed);
        }
    }
    parts.join(" ")
}

fn parse_selector(css: &str) -> Option<Selector> {
    // Only called with the constant selectors above
    Selector::parse(css).ok()
}
