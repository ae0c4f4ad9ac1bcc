use tracing::{info, warn};

use crate::error::Result;
use crate::transaction_extractor::TransactionRecord;

/// Row shape of `credit_transactions`; empty fields become NULL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionRow {
    pub amount: Option<i64>,
    pub card_last_digits: Option<String>,
    pub location: Option<String>,
    pub date: Option<String>,
    pub hour: Option<String>,
    pub bank_id: Option<String>,
}

fn non_empty(s: &str) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}

impl TransactionRow {
    pub fn from_record(record: &TransactionRecord) -> Self {
        Self {
            amount: (record.amount() != 0).then_some(record.amount()),
            card_last_digits: non_empty(record.card_suffix()),
            location: non_empty(record.location()),
            date: non_empty(record.date()),
            hour: non_empty(record.hour()),
            bank_id: record.source_id().and_then(non_empty),
        }
    }
}

/// Append-only sink for purchase rows. Every call is its own committed write.
pub trait TransactionStore {
    fn insert_transaction(&self, row: &TransactionRow) -> Result<()>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The purchase sentence was found but the field pattern did not match.
    NoMatch,
    MissingMandatory(Vec<&'static str>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersistOutcome {
    Stored,
    Skipped(SkipReason),
}

/// Writes `record` when amount, date and card suffix are all present.
pub fn persist<S: TransactionStore + ?Sized>(
    record: &TransactionRecord,
    store: &S,
) -> Result<PersistOutcome> {
    info!(
        amount = record.amount(),
        card = record.card_suffix(),
        location = record.location(),
        date = record.date(),
        hour = record.hour(),
        bank_id = record.source_id().unwrap_or_default(),
        "extracted transaction data"
    );

    if record.is_empty() {
        warn!("skipping insertion: purchase sentence did not match the field pattern");
        return Ok(PersistOutcome::Skipped(SkipReason::NoMatch));
    }
    let missing = record.missing_mandatory_fields();
    if !missing.is_empty() {
        warn!(missing = ?missing, "skipping insertion due to missing mandatory fields");
        return Ok(PersistOutcome::Skipped(SkipReason::MissingMandatory(missing)));
    }

    store.insert_transaction(&TransactionRow::from_record(record))?;
    Ok(PersistOutcome::Stored)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[derive(Default)]
    struct RecordingStore {
        rows: RefCell<Vec<TransactionRow>>,
    }

    impl TransactionStore for RecordingStore {
        fn insert_transaction(&self, row: &TransactionRow) -> Result<()> {
            self.rows.borrow_mut().push(row.clone());
            Ok(())
        }
    }

    fn tagged(record: TransactionRecord) -> TransactionRecord {
        let mut record = record;
        record.set_source_id("1");
        record
    }

    #[test]
    fn complete_record_is_written_once() {
        let store = RecordingStore::default();
        let record = tagged(TransactionRecord::new(
            12500,
            "****1234",
            "SUPERMERCADO LIDER",
            "15/09/2024",
            "10:30",
        ));
        assert_eq!(persist(&record, &store).expect("persist"), PersistOutcome::Stored);

        let rows = store.rows.borrow();
        assert_eq!(rows.len(), 1);
        assert_eq!(
            rows[0],
            TransactionRow {
                amount: Some(12500),
                card_last_digits: Some("****1234".to_string()),
                location: Some("SUPERMERCADO LIDER".to_string()),
                date: Some("15/09/2024".to_string()),
                hour: Some("10:30".to_string()),
                bank_id: Some("1".to_string()),
            }
        );
    }

    #[test]
    fn record_missing_only_card_suffix_is_skipped() {
        let store = RecordingStore::default();
        let record = tagged(TransactionRecord::new(12500, "", "LIDER", "15/09/2024", "10:30"));
        assert_eq!(
            persist(&record, &store).expect("persist"),
            PersistOutcome::Skipped(SkipReason::MissingMandatory(vec!["card_suffix"]))
        );
        assert!(store.rows.borrow().is_empty());
    }

    #[test]
    fn zero_amount_or_missing_date_is_skipped() {
        let store = RecordingStore::default();
        let zero = tagged(TransactionRecord::new(0, "****1234", "LIDER", "15/09/2024", "10:30"));
        let undated = tagged(TransactionRecord::new(500, "****1234", "LIDER", "", "10:30"));
        assert!(matches!(persist(&zero, &store), Ok(PersistOutcome::Skipped(_))));
        assert!(matches!(persist(&undated, &store), Ok(PersistOutcome::Skipped(_))));
        assert!(store.rows.borrow().is_empty());
    }

    #[test]
    fn empty_record_is_reported_as_no_match() {
        let store = RecordingStore::default();
        let record = tagged(TransactionRecord::default());
        assert_eq!(
            persist(&record, &store).expect("persist"),
            PersistOutcome::Skipped(SkipReason::NoMatch)
        );
        assert!(store.rows.borrow().is_empty());
    }

    #[test]
    fn optional_fields_are_stored_as_null() {
        let store = RecordingStore::default();
        let record = TransactionRecord::new(800, "****5555", "", "01/09/2024", "");
        assert_eq!(persist(&record, &store).expect("persist"), PersistOutcome::Stored);

        let rows = store.rows.borrow();
        assert_eq!(rows[0].location, None);
        assert_eq!(rows[0].hour, None);
        assert_eq!(rows[0].bank_id, None);
    }

    #[test]
    fn duplicate_records_produce_duplicate_rows() {
        let store = RecordingStore::default();
        let record = tagged(TransactionRecord::new(100, "****1111", "A", "01/09/2024", "12:00"));
        persist(&record, &store).expect("first");
        persist(&record, &store).expect("second");
        assert_eq!(store.rows.borrow().len(), 2);
    }
}
