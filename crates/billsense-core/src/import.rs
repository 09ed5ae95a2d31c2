//! Input adapters for transaction and email files
//!
//! Bank integrations are out of scope; these parsers read the local export
//! files a user would hand the CLI instead.

use std::io::Read;

use chrono::NaiveDate;
use csv::{ReaderBuilder, StringRecord};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::error::{Error, Result};
use crate::models::{Email, Transaction};

/// Column positions resolved from a CSV header row
#[derive(Debug)]
struct CsvColumns {
    date: usize,
    description: usize,
    amount: usize,
    id: Option<usize>,
    merchant: Option<usize>,
    category: Option<usize>,
}

impl CsvColumns {
    fn from_headers(headers: &StringRecord) -> Result<Self> {
        let find = |names: &[&str]| {
            headers
                .iter()
                .position(|h| names.contains(&h.trim().to_lowercase().as_str()))
        };

        Ok(Self {
            date: find(&["date", "transaction date", "posted date", "post date"])
                .ok_or_else(|| Error::Import("Missing date column".into()))?,
            description: find(&["description", "name", "payee"])
                .ok_or_else(|| Error::Import("Missing description column".into()))?,
            amount: find(&["amount"])
                .ok_or_else(|| Error::Import("Missing amount column".into()))?,
            id: find(&["id", "transaction id", "reference"]),
            merchant: find(&["merchant", "merchant name"]),
            category: find(&["category"]),
        })
    }
}

/// Parse a transaction CSV.
///
/// Requires `date`, `description` and `amount` columns (matched by header
/// name, case-insensitive). `id`, `merchant` and `category` are optional;
/// rows without an id get one derived from their contents.
pub fn parse_transactions_csv<R: Read>(reader: R) -> Result<Vec<Transaction>> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = rdr.headers()?.clone();
    let columns = CsvColumns::from_headers(&headers)?;
    let mut transactions = Vec::new();

    for (index, result) in rdr.records().enumerate() {
        let record = result?;
        let row = index + 2; // 1-based, after the header

        let field = |col: usize, name: &str| {
            record
                .get(col)
                .ok_or_else(|| Error::Import(format!("Row {}: missing {}", row, name)))
        };
        let optional = |col: Option<usize>| {
            col.and_then(|c| record.get(c))
                .map(|s| s.to_string())
                .filter(|s| !s.is_empty())
        };

        let date = parse_date(field(columns.date, "date")?)
            .map_err(|e| Error::Import(format!("Row {}: {}", row, e)))?;
        let description = field(columns.description, "description")?.to_string();
        let amount = parse_amount(field(columns.amount, "amount")?)
            .map_err(|e| Error::Import(format!("Row {}: {}", row, e)))?;

        let id = optional(columns.id).unwrap_or_else(|| generate_id(&date, &description, amount));

        transactions.push(Transaction {
            id,
            date,
            amount,
            description,
            merchant: optional(columns.merchant),
            category: optional(columns.category),
        });
    }

    debug!("Parsed {} transactions from CSV", transactions.len());
    Ok(transactions)
}

/// Parse a JSON array of transactions
pub fn parse_transactions_json<R: Read>(reader: R) -> Result<Vec<Transaction>> {
    let transactions: Vec<Transaction> = serde_json::from_reader(reader)?;
    debug!("Parsed {} transactions from JSON", transactions.len());
    Ok(transactions)
}

/// Parse a JSON array of emails (`subject`, `sender` or `from`, `body`)
pub fn parse_emails_json<R: Read>(reader: R) -> Result<Vec<Email>> {
    let emails: Vec<Email> = serde_json::from_reader(reader)?;
    debug!("Parsed {} emails from JSON", emails.len());
    Ok(emails)
}

/// Stable id for a transaction row without one
fn generate_id(date: &NaiveDate, description: &str, amount: f64) -> String {
    let mut hasher = Sha256::new();
    hasher.update(date.to_string().as_bytes());
    hasher.update(description.as_bytes());
    hasher.update(amount.to_be_bytes());
    hex::encode(hasher.finalize())
}

fn parse_date(s: &str) -> Result<NaiveDate> {
    let s = s.trim();

    let formats = [
        "%Y-%m-%d", // 2024-01-15
        "%m/%d/%y", // 01/15/24 (four-digit years fail this one)
        "%m/%d/%Y", // 01/15/2024
    ];

    for fmt in formats {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            return Ok(date);
        }
    }

    Err(Error::Import(format!("Unable to parse date: {}", s)))
}

/// Parse an amount string, handling currency symbols and commas
fn parse_amount(s: &str) -> Result<f64> {
    let cleaned: String = s
        .trim()
        .replace(['$', ',', ' '], "")
        .replace('(', "-")
        .replace(')', "");

    cleaned
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| Error::Import(format!("Unable to parse amount: {}", s)))
}
