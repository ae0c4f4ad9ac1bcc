use chrono::{SecondsFormat, Utc};
use rusqlite::{params, Connection};
use serde_json::Value;
use std::path::Path;
use tracing::{debug, info};
use uuid::Uuid;

use crate::eml_import::ImportSummary;
use crate::error::{ImportError, Result};
use crate::persistence_gate::{TransactionRow, TransactionStore};

pub const DEFAULT_LEDGER_DB_RELATIVE_PATH: &str = "data/card_mail.db";
pub(crate) const IMPORT_SOURCE_TYPE: &str = "bank_mail";

const SCHEMA_SQL: &str = include_str!("../db/schema.sql");

pub fn open_ledger_db(db_path: &Path) -> Result<Connection> {
    if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|source| ImportError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    let conn = Connection::open(db_path)?;
    conn.execute_batch("PRAGMA journal_mode=WAL;")?;
    Ok(conn)
}

/// Creates the ledger tables when absent. Existing tables are left untouched.
pub fn ensure_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}

/// Releases the connection, surfacing any error SQLite reports on close.
pub fn close_ledger_db(conn: Connection) -> Result<()> {
    conn.close().map_err(|(_conn, err)| ImportError::Db(err))?;
    info!("database connection closed");
    Ok(())
}

impl TransactionStore for Connection {
    fn insert_transaction(&self, row: &TransactionRow) -> Result<()> {
        let tx = self.unchecked_transaction()?;
        tx.execute(
            r#"
            INSERT INTO credit_transactions(amount, card_last_digits, location, date, hour, bank_id)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                row.amount,
                row.card_last_digits,
                row.location,
                row.date,
                row.hour,
                row.bank_id,
            ],
        )?;
        tx.commit()?;
        debug!(row_id = self.last_insert_rowid(), "transaction committed");
        Ok(())
    }
}

pub fn count_credit_transactions(conn: &Connection) -> Result<i64> {
    let count = conn.query_row("SELECT COUNT(*) FROM credit_transactions", [], |row| {
        row.get::<_, i64>(0)
    })?;
    Ok(count)
}

fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

pub fn begin_import_job(conn: &Connection, source_path: &str, metadata: &Value) -> Result<String> {
    let job_id = Uuid::new_v4().to_string();
    conn.execute(
        r#"
        INSERT INTO import_jobs(id, source_type, source_path, status, started_at, metadata_json)
        VALUES (?1, ?2, ?3, 'running', ?4, ?5)
        "#,
        params![
            job_id,
            IMPORT_SOURCE_TYPE,
            source_path,
            now_rfc3339(),
            metadata.to_string(),
        ],
    )?;
    Ok(job_id)
}

pub fn finish_import_job(
    conn: &Connection,
    job_id: &str,
    summary: Option<&ImportSummary>,
    error_message: Option<&str>,
) -> Result<()> {
    let status = if error_message.is_some() {
        "failed"
    } else {
        "success"
    };
    let summary = summary.cloned().unwrap_or_default();
    conn.execute(
        r#"
        UPDATE import_jobs
        SET status=?1,
            finished_at=?2,
            total_count=?3,
            imported_count=?4,
            skipped_count=?5,
            error_count=?6,
            error_message=?7
        WHERE id=?8
        "#,
        params![
            status,
            now_rfc3339(),
            summary.fetched_count,
            summary.stored_count,
            summary.skipped_no_match_count + summary.skipped_incomplete_count,
            summary.content_not_found_count,
            error_message,
            job_id,
        ],
    )?;
    Ok(())
}
