use regex::Regex;
use std::sync::OnceLock;

use crate::content_locator::locate_with_trigger;
use crate::error::Result;
use crate::transaction_extractor::{extract_with_pattern, TransactionRecord};

/// Sentence layout of one issuer's purchase notification.
#[derive(Debug)]
pub struct TransactionTemplate {
    pub source_id: &'static str,
    pub bank_name: &'static str,
    pub sender: &'static str,
    pub subject_marker: &'static str,
    pub trigger_phrase: &'static str,
    pattern: fn() -> &'static Regex,
}

fn banco_de_chile_purchase_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(concat!(
            r"(?s)por \$(?P<amount>\d+(?:[.,]\d+)*)",
            r".*?(?P<card>\*{4}\d{4})",
            r" en (?P<location>.*?)",
            r" el (?P<date>\d{2}/\d{2}/\d{4}) (?P<hour>\d{2}:\d{2})",
        ))
        .expect("invalid banco de chile purchase regex")
    })
}

pub static BANCO_DE_CHILE: TransactionTemplate = TransactionTemplate {
    source_id: "1",
    bank_name: "Banco de Chile",
    sender: "enviodigital@bancochile.cl",
    subject_marker: "Compra con Tarjeta de Crédito",
    trigger_phrase: "Te informamos que se ha realizado una compra",
    pattern: banco_de_chile_purchase_re,
};

static TEMPLATES: &[&TransactionTemplate] = &[&BANCO_DE_CHILE];

/// Picks the template whose sender address appears in `sender`
/// (either a bare address or a full `From` header value).
pub fn template_for_sender(sender: &str) -> Option<&'static TransactionTemplate> {
    let needle = sender.trim().to_lowercase();
    if needle.is_empty() {
        return None;
    }
    TEMPLATES
        .iter()
        .copied()
        .find(|t| needle.contains(&t.sender.to_lowercase()))
}

impl TransactionTemplate {
    pub fn pattern(&self) -> &'static Regex {
        (self.pattern)()
    }

    pub fn matches_subject(&self, subject: &str) -> bool {
        subject.contains(self.subject_marker)
    }

    pub fn locate(&self, html: &str) -> Result<String> {
        locate_with_trigger(html, self.trigger_phrase)
    }

    pub fn extract(&self, text: &str) -> TransactionRecord {
        extract_with_pattern(text, self.pattern())
    }

    /// Locate, extract, then tag with this template's source id.
    pub fn retrieve_transaction(&self, html: &str) -> Result<TransactionRecord> {
        let content = self.locate(html)?;
        let mut record = self.extract(&content);
        record.set_source_id(self.source_id);
        Ok(record)
    }
}
