use chrono::NaiveDate;
use std::path::PathBuf;

use crate::ledger_db::DEFAULT_LEDGER_DB_RELATIVE_PATH;
use crate::mail_source::MailQuery;
use crate::templates::BANCO_DE_CHILE;

pub const DEFAULT_SINCE_DATE: &str = "2024-08-30";
pub const DEFAULT_MESSAGE_LIMIT: usize = 50;

#[derive(Debug, Clone)]
pub struct ImportConfig {
    pub mail_dir: PathBuf,
    pub db_path: PathBuf,
    pub sender: String,
    pub since: NaiveDate,
    pub limit: usize,
}

impl ImportConfig {
    /// Config with every optional knob at its default.
    pub fn for_mail_dir(mail_dir: impl Into<PathBuf>) -> Self {
        Self {
            mail_dir: mail_dir.into(),
            db_path: PathBuf::from(DEFAULT_LEDGER_DB_RELATIVE_PATH),
            sender: BANCO_DE_CHILE.sender.to_string(),
            since: parse_since_date(DEFAULT_SINCE_DATE).unwrap_or(NaiveDate::MIN),
            limit: DEFAULT_MESSAGE_LIMIT,
        }
    }

    pub fn mail_query(&self) -> MailQuery {
        MailQuery {
            sender: self.sender.clone(),
            since: self.since,
            limit: self.limit,
        }
    }
}

pub fn parse_since_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|e| format!("since must be YYYY-MM-DD ({raw}): {e}"))
}

pub fn parse_message_limit(raw: &str) -> Result<usize, String> {
    let limit = raw
        .trim()
        .parse::<usize>()
        .map_err(|e| format!("limit must be a positive integer ({raw}): {e}"))?;
    if limit == 0 {
        return Err("limit must be at least 1".to_string());
    }
    Ok(limit)
}
