pub mod config;
pub mod content_locator;
pub mod eml_import;
pub mod error;
pub mod ledger_db;
pub mod mail_source;
pub mod persistence_gate;
pub mod templates;
pub mod transaction_extractor;

pub use config::ImportConfig;
pub use content_locator::locate;
pub use eml_import::{import_messages, run_import, run_import_with_source, ImportSummary};
pub use error::ImportError;
pub use mail_source::{EmlDirSource, MailMessage, MailQuery, MailSource};
pub use persistence_gate::{persist, PersistOutcome, SkipReason, TransactionRow, TransactionStore};
pub use templates::{template_for_sender, TransactionTemplate, BANCO_DE_CHILE};
pub use transaction_extractor::{extract, retrieve_transaction, TransactionRecord};
