use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ImportError {
    /// The HTML body carries no purchase sentence; the mail is not a tracked notification.
    #[error("transaction details not found in the HTML content")]
    ContentNotFound,

    #[error("no transaction template registered for sender {0}")]
    UnknownSender(String),

    #[error("mail source unavailable: {0}")]
    MailSource(String),

    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse message {}: {source}", .path.display())]
    MessageParse {
        path: PathBuf,
        #[source]
        source: mailparse::MailParseError,
    },

    #[error("database error: {0}")]
    Db(#[from] rusqlite::Error),
}

pub type Result<T, E = ImportError> = std::result::Result<T, E>;
