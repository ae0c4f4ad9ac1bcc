use serde::Serialize;
use serde_json::json;
use tracing::{error, info, warn};

use crate::config::ImportConfig;
use crate::error::{ImportError, Result};
use crate::ledger_db::{
    begin_import_job, close_ledger_db, ensure_schema, finish_import_job, open_ledger_db,
};
use crate::mail_source::{EmlDirSource, MailMessage, MailSource};
use crate::persistence_gate::{persist, PersistOutcome, SkipReason, TransactionStore};
use crate::templates::{template_for_sender, TransactionTemplate};

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub fetched_count: usize,
    pub subject_matched_count: usize,
    pub html_parts_count: usize,
    pub stored_count: usize,
    pub skipped_no_match_count: usize,
    pub skipped_incomplete_count: usize,
    pub content_not_found_count: usize,
}

/// Runs every subject-matching message through locate → extract → persist.
///
/// Messages are handled newest first. A body without the purchase sentence is
/// logged and skipped; store failures abort the batch.
pub fn import_messages<S: TransactionStore + ?Sized>(
    messages: &[MailMessage],
    template: &TransactionTemplate,
    store: &S,
) -> Result<ImportSummary> {
    let mut summary = ImportSummary {
        fetched_count: messages.len(),
        ..ImportSummary::default()
    };

    let filtered = messages
        .iter()
        .filter(|m| template.matches_subject(&m.subject))
        .collect::<Vec<_>>();
    summary.subject_matched_count = filtered.len();
    info!(
        fetched = summary.fetched_count,
        matched = summary.subject_matched_count,
        "filtered messages by subject"
    );

    for msg in filtered.iter().rev() {
        info!(from = %msg.from, subject = %msg.subject, "processing message");
        for html in &msg.html_bodies {
            summary.html_parts_count += 1;
            let record = match template.retrieve_transaction(html) {
                Ok(record) => record,
                Err(err @ ImportError::ContentNotFound) => {
                    error!(source = %msg.source, error = %err, "error processing HTML content");
                    summary.content_not_found_count += 1;
                    continue;
                }
                Err(err) => return Err(err),
            };
            match persist(&record, store)? {
                PersistOutcome::Stored => summary.stored_count += 1,
                PersistOutcome::Skipped(SkipReason::NoMatch) => summary.skipped_no_match_count += 1,
                PersistOutcome::Skipped(SkipReason::MissingMandatory(_)) => {
                    summary.skipped_incomplete_count += 1
                }
            }
        }
    }

    info!(
        stored = summary.stored_count,
        skipped = summary.skipped_no_match_count + summary.skipped_incomplete_count,
        not_found = summary.content_not_found_count,
        "email processing completed"
    );
    Ok(summary)
}

pub fn run_import(config: &ImportConfig) -> Result<ImportSummary> {
    let mut source = EmlDirSource::open(&config.mail_dir)?;
    run_import_with_source(config, &mut source)
}

/// Opens the ledger, records an import job around the batch and closes the
/// connection whatever the batch outcome.
pub fn run_import_with_source<M: MailSource + ?Sized>(
    config: &ImportConfig,
    source: &mut M,
) -> Result<ImportSummary> {
    let template = template_for_sender(&config.sender)
        .ok_or_else(|| ImportError::UnknownSender(config.sender.clone()))?;

    info!(db_path = %config.db_path.display(), "connecting to ledger database");
    let conn = open_ledger_db(&config.db_path)?;
    ensure_schema(&conn)?;

    let source_path = config.mail_dir.to_string_lossy().to_string();
    let job_id = begin_import_job(
        &conn,
        &source_path,
        &json!({
            "bank": template.bank_name,
            "bank_id": template.source_id,
            "sender": config.sender,
            "since": config.since.to_string(),
            "limit": config.limit,
        }),
    )?;

    let query = config.mail_query();
    info!(
        sender = %query.sender,
        since = %query.since,
        limit = query.limit,
        "fetching emails from the specified sender"
    );
    let outcome = source.fetch(&query).and_then(|messages| {
        info!(count = messages.len(), "found emails matching the criteria");
        import_messages(&messages, template, &conn)
    });

    let bookkeeping = match &outcome {
        Ok(summary) => finish_import_job(&conn, &job_id, Some(summary), None),
        Err(err) => {
            let message = err.to_string();
            finish_import_job(&conn, &job_id, None, Some(message.as_str()))
        }
    };
    if let Err(err) = &bookkeeping {
        warn!(job_id = %job_id, error = %err, "failed to update import job");
    }

    match close_ledger_db(conn) {
        Ok(()) => {}
        Err(err) if outcome.is_ok() => return Err(err),
        Err(err) => warn!(error = %err, "failed to close database after aborted run"),
    }
    outcome
}
