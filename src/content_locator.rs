use regex::Regex;
use scraper::{ElementRef, Html};
use std::sync::OnceLock;

use crate::error::{ImportError, Result};
use crate::templates::BANCO_DE_CHILE;

fn ws_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("invalid ws regex"))
}

/// Collapses whitespace runs to a single space and trims both ends.
pub fn trim_text(s: &str) -> String {
    ws_re().replace_all(s.trim(), " ").trim().to_string()
}

/// Returns the purchase sentence of a Banco de Chile notification.
pub fn locate(html: &str) -> Result<String> {
    BANCO_DE_CHILE.locate(html)
}

pub(crate) fn locate_with_trigger(html: &str, trigger_phrase: &str) -> Result<String> {
    let doc = Html::parse_document(html);
    for node in doc.tree.root().descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        // Mail clients hard-wrap long lines, so compare on collapsed text.
        if !trim_text(text).contains(trigger_phrase) {
            continue;
        }
        let Some(parent) = node.parent().and_then(ElementRef::wrap) else {
            continue;
        };
        // Inline tags split tokens like `****<b>1234</b>`; glue the pieces as-is.
        let fragment = trim_text(&parent.text().collect::<String>());
        if !fragment.is_empty() {
            return Ok(fragment);
        }
    }
    Err(ImportError::ContentNotFound)
}
