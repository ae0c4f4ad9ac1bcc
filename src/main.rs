use std::path::PathBuf;

use anyhow::Context;
use card_mail_import_lib::config::{
    parse_message_limit, parse_since_date, DEFAULT_MESSAGE_LIMIT, DEFAULT_SINCE_DATE,
};
use card_mail_import_lib::ledger_db::DEFAULT_LEDGER_DB_RELATIVE_PATH;
use card_mail_import_lib::{run_import, ImportConfig, ImportSummary, BANCO_DE_CHILE};
use chrono::NaiveDate;
use clap::Parser;
use tracing::info;

#[derive(Parser)]
#[command(
    name = "card-mail-import",
    about = "Import credit card purchase notifications from bank e-mails"
)]
struct Cli {
    /// Directory (or single file) of exported .eml messages
    #[arg(long, env = "CARD_MAIL_DIR")]
    mail_dir: PathBuf,
    /// SQLite ledger file, created when missing
    #[arg(long, env = "CARD_MAIL_DB", default_value = DEFAULT_LEDGER_DB_RELATIVE_PATH)]
    db_path: PathBuf,
    /// Sender address the notifications come from
    #[arg(long, env = "CARD_MAIL_SENDER", default_value = BANCO_DE_CHILE.sender)]
    sender: String,
    /// Ignore messages received before this date (YYYY-MM-DD)
    #[arg(long, env = "CARD_MAIL_SINCE", default_value = DEFAULT_SINCE_DATE, value_parser = parse_since_date)]
    since: NaiveDate,
    /// Max messages fetched before subject filtering
    #[arg(short = 'n', long, env = "CARD_MAIL_LIMIT", default_value_t = DEFAULT_MESSAGE_LIMIT, value_parser = parse_message_limit)]
    limit: usize,
    /// Print the run summary as JSON
    #[arg(long)]
    json: bool,
}

impl Cli {
    fn into_config(self) -> ImportConfig {
        ImportConfig {
            mail_dir: self.mail_dir,
            db_path: self.db_path,
            sender: self.sender,
            since: self.since,
            limit: self.limit,
        }
    }
}

fn print_summary(summary: &ImportSummary) {
    println!("Fetched:            {}", summary.fetched_count);
    println!("Subject matched:    {}", summary.subject_matched_count);
    println!("HTML parts:         {}", summary.html_parts_count);
    println!("Stored:             {}", summary.stored_count);
    println!("Skipped (no match): {}", summary.skipped_no_match_count);
    println!("Skipped (partial):  {}", summary.skipped_incomplete_count);
    println!("Content not found:  {}", summary.content_not_found_count);
}

fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();
    let json = cli.json;
    let config = cli.into_config();

    let summary = run_import(&config)
        .with_context(|| format!("import from {} failed", config.mail_dir.display()))?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&summary).context("serialize summary")?
        );
    } else {
        print_summary(&summary);
    }
    info!("email fetching and processing completed");
    Ok(())
}
