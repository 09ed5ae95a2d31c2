//! Shared command utilities: rule loading and input files

use std::fs::{self, File};
use std::path::Path;

use anyhow::{Context, Result};
use billsense_core::{
    import::{parse_emails_json, parse_transactions_csv, parse_transactions_json},
    load_config, Config, Email, Transaction,
};
use serde::Serialize;

/// Load bill rules from an explicit override, the user config, or defaults
pub fn load_rules(path: Option<&Path>) -> Result<Config> {
    load_config(path).context("Failed to load bill rules")
}

/// Resolve the email body from --body or --body-file
pub fn read_body(body: Option<String>, body_file: Option<&Path>) -> Result<String> {
    match (body, body_file) {
        (Some(body), _) => Ok(body),
        (None, Some(path)) => fs::read_to_string(path)
            .with_context(|| format!("Failed to read body file: {}", path.display())),
        (None, None) => Ok(String::new()),
    }
}

/// Load transactions from a .csv or .json export
pub fn load_transactions(path: &Path) -> Result<Vec<Transaction>> {
    let file =
        File::open(path).with_context(|| format!("Failed to open file: {}", path.display()))?;

    let is_json = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"));

    let transactions = if is_json {
        parse_transactions_json(file)
    } else {
        parse_transactions_csv(file)
    }
    .with_context(|| format!("Failed to parse transactions from {}", path.display()))?;

    Ok(transactions)
}

/// Load a JSON array of emails
pub fn load_emails(path: &Path) -> Result<Vec<Email>> {
    let file =
        File::open(path).with_context(|| format!("Failed to open file: {}", path.display()))?;
    parse_emails_json(file).with_context(|| format!("Failed to parse emails from {}", path.display()))
}

/// Pretty-print a value as JSON on stdout
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
