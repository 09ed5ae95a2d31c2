//! Recurring bill detection command

use std::path::Path;

use anyhow::Result;
use billsense_core::{Config, RecurrenceDetector};

use super::{format_amount, load_transactions, print_json, truncate};

pub fn cmd_recurring(config: &Config, file: &Path, json: bool) -> Result<()> {
    let transactions = load_transactions(file)?;
    let detector = RecurrenceDetector::with_config(&config.rules, config.recurrence.clone());
    let patterns = detector.detect(&transactions);

    if json {
        return print_json(&patterns);
    }

    if patterns.is_empty() {
        println!(
            "No recurring bills found in {} transactions.",
            transactions.len()
        );
        return Ok(());
    }

    println!();
    println!("🔁 Recurring Bills");
    println!("   ─────────────────────────────────────────────────────────────");

    for pattern in &patterns {
        println!(
            "   {:>3}% │ {:24} │ {:>9}/{:<9} │ x{:<3} │ next {}",
            pattern.confidence,
            truncate(&pattern.merchant, 24),
            format_amount(pattern.last_amount()),
            pattern.frequency.as_str(),
            pattern.occurrences(),
            pattern
                .next_predicted
                .map(|d| d.to_string())
                .unwrap_or_else(|| "?".to_string())
        );
    }

    Ok(())
}
