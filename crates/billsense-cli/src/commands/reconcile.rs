//! Reconciliation and confidence combination commands

use std::path::Path;

use anyhow::Result;
use billsense_core::{
    calculate_confidence_score, reconcile, Config, EmailClassifier, RecurrenceDetector,
};
use serde::Serialize;

use super::{format_amount, load_emails, load_transactions, print_json, truncate};

pub fn cmd_reconcile(config: &Config, emails: &Path, transactions: &Path, json: bool) -> Result<()> {
    let emails = load_emails(emails)?;
    let transactions = load_transactions(transactions)?;

    let candidates = EmailClassifier::with_rules(&config.rules).classify_batch(&emails);
    let patterns = RecurrenceDetector::with_config(&config.rules, config.recurrence.clone())
        .detect(&transactions);
    let matches = reconcile(&candidates, &patterns);

    if json {
        return print_json(&matches);
    }

    println!();
    println!(
        "🔗 {} emails, {} recurring patterns, {} confirmed bills",
        emails.len(),
        patterns.len(),
        matches.len()
    );

    if matches.is_empty() {
        return Ok(());
    }

    println!("   ─────────────────────────────────────────────────────────────");
    for m in &matches {
        println!(
            "   {:>3}% │ {:20} ↔ {:20} │ {:>9} │ {}",
            m.confidence,
            truncate(m.candidate.merchant.as_deref().unwrap_or("?"), 20),
            truncate(&m.pattern.merchant, 20),
            format_amount(m.candidate.amount.or(m.pattern.last_amount())),
            m.pattern.frequency
        );
    }

    Ok(())
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CombinedScore {
    email_confidence: u8,
    transaction_confidence: u8,
    has_multiple_sources: bool,
    confidence: u8,
}

pub fn cmd_combine(email: u8, transaction: u8, multiple_sources: bool, json: bool) -> Result<()> {
    let confidence = calculate_confidence_score(email, transaction, multiple_sources);

    if json {
        return print_json(&CombinedScore {
            email_confidence: email,
            transaction_confidence: transaction,
            has_multiple_sources: multiple_sources,
            confidence,
        });
    }

    println!("{}", confidence);
    Ok(())
}
