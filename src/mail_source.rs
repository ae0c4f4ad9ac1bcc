use chrono::NaiveDate;
use mailparse::{dateparse, parse_mail, MailHeaderMap, MailParseError, ParsedMail};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::error::{ImportError, Result};

/// Server-side style filter applied before any content inspection.
#[derive(Debug, Clone)]
pub struct MailQuery {
    pub sender: String,
    pub since: NaiveDate,
    pub limit: usize,
}

#[derive(Debug, Clone)]
pub struct MailMessage {
    pub source: String,
    pub from: String,
    pub subject: String,
    pub received_at: Option<i64>,
    pub html_bodies: Vec<String>,
}

pub trait MailSource {
    /// Messages from `query.sender` received on or after `query.since`,
    /// oldest first, at most `query.limit` of them.
    fn fetch(&mut self, query: &MailQuery) -> Result<Vec<MailMessage>>;
}

fn collect_html_bodies(mail: &ParsedMail, source: &str, out: &mut Vec<String>) {
    if mail.ctype.mimetype.eq_ignore_ascii_case("text/html") {
        match mail.get_body() {
            Ok(body) => out.push(body),
            Err(err) => warn!(source, error = %err, "undecodable text/html part"),
        }
    }
    for part in &mail.subparts {
        collect_html_bodies(part, source, out);
    }
}

pub fn parse_message(source: &str, raw: &[u8]) -> std::result::Result<MailMessage, MailParseError> {
    let mail = parse_mail(raw)?;
    let subject = mail.headers.get_first_value("Subject").unwrap_or_default();
    let from = mail.headers.get_first_value("From").unwrap_or_default();
    let received_at = mail
        .headers
        .get_first_value("Date")
        .and_then(|d| dateparse(&d).ok());
    let mut html_bodies = Vec::new();
    collect_html_bodies(&mail, source, &mut html_bodies);
    Ok(MailMessage {
        source: source.to_string(),
        from,
        subject,
        received_at,
        html_bodies,
    })
}

fn sender_matches(from: &str, sender: &str) -> bool {
    let sender = sender.trim().to_lowercase();
    !sender.is_empty() && from.to_lowercase().contains(&sender)
}

fn since_timestamp(since: NaiveDate) -> i64 {
    since
        .and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc().timestamp())
        .unwrap_or(i64::MIN)
}

fn is_eml(path: &Path) -> bool {
    path.extension()
        .and_then(|s| s.to_str())
        .map(|s| s.eq_ignore_ascii_case("eml"))
        .unwrap_or(false)
}

/// A directory tree of exported `.eml` files standing in for a mailbox.
#[derive(Debug)]
pub struct EmlDirSource {
    root: PathBuf,
}

impl EmlDirSource {
    pub fn open(root: &Path) -> Result<Self> {
        if !root.exists() {
            return Err(ImportError::MailSource(format!(
                "path not found: {}",
                root.display()
            )));
        }
        if !root.is_dir() && !(root.is_file() && is_eml(root)) {
            return Err(ImportError::MailSource(format!(
                "expected an .eml file or a directory: {}",
                root.display()
            )));
        }
        info!(root = %root.display(), "mail source opened");
        Ok(Self {
            root: root.to_path_buf(),
        })
    }

    fn collect_eml_files(&self) -> Vec<PathBuf> {
        if self.root.is_file() {
            return vec![self.root.clone()];
        }
        let mut files = WalkDir::new(&self.root)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .map(|e| e.into_path())
            .filter(|p| is_eml(p))
            .collect::<Vec<_>>();
        files.sort();
        files
    }

    fn read_message(path: &Path) -> Result<MailMessage> {
        let bytes = fs::read(path).map_err(|source| ImportError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        parse_message(&path.to_string_lossy(), &bytes).map_err(|source| {
            ImportError::MessageParse {
                path: path.to_path_buf(),
                source,
            }
        })
    }
}

impl MailSource for EmlDirSource {
    fn fetch(&mut self, query: &MailQuery) -> Result<Vec<MailMessage>> {
        let since_ts = since_timestamp(query.since);
        let mut out = Vec::new();
        for path in self.collect_eml_files() {
            let msg = match Self::read_message(&path) {
                Ok(msg) => msg,
                Err(err) => {
                    warn!(error = %err, "skipping unreadable message");
                    continue;
                }
            };
            if !sender_matches(&msg.from, &query.sender) {
                continue;
            }
            match msg.received_at {
                Some(ts) if ts >= since_ts => out.push(msg),
                Some(_) => debug!(source = %msg.source, "message older than lower bound"),
                None => debug!(source = %msg.source, "message without a usable Date header"),
            }
        }
        out.sort_by_key(|m| m.received_at);
        out.truncate(query.limit);
        Ok(out)
    }
}
