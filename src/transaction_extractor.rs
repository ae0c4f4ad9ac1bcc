use regex::Regex;
use std::fmt;
use tracing::debug;

use crate::content_locator::trim_text;
use crate::error::Result;
use crate::templates::BANCO_DE_CHILE;

/// One purchase parsed out of a notification sentence.
///
/// Either every primary field is populated or none is; `source_id` is bound
/// once after extraction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransactionRecord {
    amount: i64,
    card_suffix: String,
    location: String,
    date: String,
    hour: String,
    source_id: Option<String>,
}

impl TransactionRecord {
    pub fn new(
        amount: i64,
        card_suffix: impl Into<String>,
        location: impl Into<String>,
        date: impl Into<String>,
        hour: impl Into<String>,
    ) -> Self {
        Self {
            amount,
            card_suffix: card_suffix.into(),
            location: location.into(),
            date: date.into(),
            hour: hour.into(),
            source_id: None,
        }
    }

    pub fn amount(&self) -> i64 {
        self.amount
    }

    pub fn card_suffix(&self) -> &str {
        &self.card_suffix
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn date(&self) -> &str {
        &self.date
    }

    pub fn hour(&self) -> &str {
        &self.hour
    }

    pub fn source_id(&self) -> Option<&str> {
        self.source_id.as_deref()
    }

    /// Binds the issuing template id. Later calls are ignored.
    pub fn set_source_id(&mut self, source_id: &str) {
        match &self.source_id {
            Some(existing) => {
                debug!(existing = %existing, ignored = source_id, "source id already bound");
            }
            None => self.source_id = Some(source_id.to_string()),
        }
    }

    /// True when the sentence did not match at all.
    pub fn is_empty(&self) -> bool {
        self.amount == 0
            && self.card_suffix.is_empty()
            && self.location.is_empty()
            && self.date.is_empty()
            && self.hour.is_empty()
    }

    pub fn missing_mandatory_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.amount == 0 {
            missing.push("amount");
        }
        if self.date.is_empty() {
            missing.push("date");
        }
        if self.card_suffix.is_empty() {
            missing.push("card_suffix");
        }
        missing
    }
}

impl fmt::Display for TransactionRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Amount: {}, Card: {}, Location: {}, Date: {}, Hour: {}, Bank ID: {}",
            self.amount,
            self.card_suffix,
            self.location,
            self.date,
            self.hour,
            self.source_id.as_deref().unwrap_or("-")
        )
    }
}

/// Thousands and decimal separators are both dropped: `$1.234.567` is 1234567.
fn parse_amount(raw: &str) -> Option<i64> {
    let digits = raw
        .chars()
        .filter(|c| !matches!(c, '.' | ','))
        .collect::<String>();
    digits.parse::<i64>().ok()
}

/// Parses a Banco de Chile purchase sentence. Never fails: a sentence that
/// does not match yields the empty record.
pub fn extract(text: &str) -> TransactionRecord {
    BANCO_DE_CHILE.extract(text)
}

/// Locates and extracts the purchase from a Banco de Chile HTML body.
pub fn retrieve_transaction(html: &str) -> Result<TransactionRecord> {
    BANCO_DE_CHILE.retrieve_transaction(html)
}

pub(crate) fn extract_with_pattern(text: &str, pattern: &Regex) -> TransactionRecord {
    let Some(caps) = pattern.captures(text) else {
        debug!("purchase pattern did not match fragment");
        return TransactionRecord::default();
    };
    // Zero is the unparsed sentinel, so a `$0` purchase counts as no match.
    let Some(amount) = parse_amount(&caps["amount"]).filter(|a| *a != 0) else {
        debug!(raw = &caps["amount"], "purchase amount zero or out of range");
        return TransactionRecord::default();
    };
    TransactionRecord::new(
        amount,
        &caps["card"],
        trim_text(&caps["location"]),
        &caps["date"],
        &caps["hour"],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ImportError;

    const SENTENCE: &str = "Te informamos que se ha realizado una compra por $12.500 con tarjeta ****1234 en SUPERMERCADO LIDER el 15/09/2024 10:30. Si no reconoces esta compra, contáctanos.";

    #[test]
    fn extracts_all_five_fields() {
        let record = extract(SENTENCE);
        assert_eq!(record, TransactionRecord::new(12500, "****1234", "SUPERMERCADO LIDER", "15/09/2024", "10:30"));
        assert!(record.missing_mandatory_fields().is_empty());
        assert_eq!(record.source_id(), None);
    }

    #[test]
    fn strips_every_separator_from_the_amount() {
        let record = extract(
            "se ha realizado una compra por $1.234.567 con Tarjeta de Crédito ****9876 en AUTOMOTORA el 01/10/2024 09:05",
        );
        assert_eq!(record.amount(), 1234567);

        let with_decimals = extract("una compra por $4.990,50 con tarjeta ****0001 en KIOSKO el 02/10/2024 18:00");
        assert_eq!(with_decimals.amount(), 499050);

        let no_separator = extract("una compra por $990 con tarjeta ****0001 en KIOSKO el 02/10/2024 18:00");
        assert_eq!(no_separator.amount(), 990);
    }

    #[test]
    fn location_whitespace_is_collapsed() {
        let record = extract("compra por $3.000 con tarjeta ****4321 en   MERCADOPAGO \t *UBER   el 30/08/2024 21:43");
        assert_eq!(record.location(), "MERCADOPAGO *UBER");
        assert_eq!(trim_text(record.location()), record.location());
    }

    #[test]
    fn location_may_contain_the_word_el_before_the_date() {
        let record = extract("compra por $7.500 con tarjeta ****4321 en CAFE el MOLINO el 05/09/2024 08:15");
        assert_eq!(record.location(), "CAFE el MOLINO");
        assert_eq!(record.date(), "05/09/2024");
        assert_eq!(record.hour(), "08:15");
    }

    #[test]
    fn non_matching_text_yields_the_empty_record() {
        for text in [
            "",
            "Te informamos que se ha realizado una compra",
            "compra por $12.500 con tarjeta 1234 en LIDER el 15/09/2024 10:30",
            "compra por $12.500 con tarjeta ****1234 en LIDER el 15-09-2024 10:30",
            "compra por $12.500 con tarjeta ****1234 en LIDER el 15/09/2024",
        ] {
            let record = extract(text);
            assert!(record.is_empty(), "expected empty record for {text:?}, got {record:?}");
            assert_eq!(record, TransactionRecord::default());
        }
    }

    #[test]
    fn overflowing_amount_degrades_to_the_empty_record() {
        let record = extract("compra por $99.999.999.999.999.999.999 con tarjeta ****1234 en LIDER el 15/09/2024 10:30");
        assert!(record.is_empty());
    }

    #[test]
    fn zero_amount_degrades_to_the_empty_record() {
        for amount in ["$0", "$0.000", "$0,00"] {
            let record = extract(&format!(
                "compra por {amount} con tarjeta ****1234 en LIDER el 15/09/2024 10:30"
            ));
            assert!(record.is_empty(), "{amount} gave {record:?}");
        }
    }

    #[test]
    fn source_id_binds_only_once() {
        let mut record = extract(SENTENCE);
        record.set_source_id("1");
        record.set_source_id("2");
        assert_eq!(record.source_id(), Some("1"));
    }

    #[test]
    fn missing_fields_are_reported_by_name() {
        let record = TransactionRecord::new(12500, "", "LIDER", "15/09/2024", "10:30");
        assert_eq!(record.missing_mandatory_fields(), vec!["card_suffix"]);
        assert!(!record.is_empty());
        assert_eq!(
            TransactionRecord::default().missing_mandatory_fields(),
            vec!["amount", "date", "card_suffix"]
        );
    }

    #[test]
    fn retrieve_transaction_tags_the_record_with_the_bank_id() {
        let html = "<html><body><div>...<span>Te informamos que se ha realizado una compra por $12.500 con tarjeta ****1234 en SUPERMERCADO LIDER el 15/09/2024 10:30</span>...</div></body></html>";
        let record = retrieve_transaction(html).expect("purchase html");
        assert_eq!(record.amount(), 12500);
        assert_eq!(record.card_suffix(), "****1234");
        assert_eq!(record.location(), "SUPERMERCADO LIDER");
        assert_eq!(record.date(), "15/09/2024");
        assert_eq!(record.hour(), "10:30");
        assert_eq!(record.source_id(), Some("1"));
    }

    #[test]
    fn retrieve_transaction_reads_fields_wrapped_in_inline_tags() {
        let html = "<html><body><p>Te informamos que se ha realizado una compra por $<b>12.500</b> con tarjeta ****<strong>1234</strong> en <span>SUPERMERCADO LIDER</span> el 15/09/2024 10:30</p></body></html>";
        let record = retrieve_transaction(html).expect("purchase html");
        assert_eq!(record.amount(), 12500);
        assert_eq!(record.card_suffix(), "****1234");
        assert_eq!(record.location(), "SUPERMERCADO LIDER");
        assert_eq!(record.date(), "15/09/2024");
        assert_eq!(record.hour(), "10:30");
        assert_eq!(record.source_id(), Some("1"));
    }

    #[test]
    fn retrieve_transaction_propagates_content_not_found() {
        let err = retrieve_transaction("<p>Tu cartola mensual</p>").expect_err("no trigger");
        assert!(matches!(err, ImportError::ContentNotFound));
    }

    #[test]
    fn sentence_with_trigger_but_garbled_fields_is_located_but_empty() {
        let html = "<p>Te informamos que se ha realizado una compra. Detalle no disponible.</p>";
        let record = retrieve_transaction(html).expect("trigger present");
        assert!(record.is_empty());
        assert_eq!(record.source_id(), Some("1"));
    }

    #[test]
    fn display_matches_log_layout() {
        let mut record = extract(SENTENCE);
        record.set_source_id("1");
        assert_eq!(
            record.to_string(),
            "Amount: 12500, Card: ****1234, Location: SUPERMERCADO LIDER, Date: 15/09/2024, Hour: 10:30, Bank ID: 1"
        );
    }
}
