//! Email classification commands

use std::path::Path;

use anyhow::Result;
use billsense_core::{Config, EmailBillCandidate, EmailClassifier};

use super::{format_amount, load_emails, print_json, truncate};

pub fn cmd_email(config: &Config, subject: &str, sender: &str, body: &str, json: bool) -> Result<()> {
    let candidate = EmailClassifier::with_rules(&config.rules).classify(subject, sender, body);

    if json {
        return print_json(&candidate);
    }

    println!();
    println!("{} Bill confidence: {}%", confidence_icon(candidate.confidence), candidate.confidence);
    println!("   Merchant:  {}", candidate.merchant.as_deref().unwrap_or("?"));
    println!(
        "   Category:  {}",
        candidate.category.map(|c| c.as_str()).unwrap_or("?")
    );
    println!("   Amount:    {}", format_amount(candidate.amount));
    println!(
        "   Due date:  {}",
        candidate
            .due_date
            .map(|d| d.to_string())
            .unwrap_or_else(|| "?".to_string())
    );

    Ok(())
}

pub fn cmd_emails(config: &Config, file: &Path, json: bool) -> Result<()> {
    let emails = load_emails(file)?;
    let candidates = EmailClassifier::with_rules(&config.rules).classify_batch(&emails);

    if json {
        return print_json(&candidates);
    }

    if candidates.is_empty() {
        println!("No emails in {}", file.display());
        return Ok(());
    }

    println!();
    println!("📬 Classified {} emails", candidates.len());
    println!("   ─────────────────────────────────────────────────────────────");

    for candidate in &candidates {
        print_candidate_row(candidate);
    }

    let likely = candidates.iter().filter(|c| c.confidence >= 70).count();
    println!();
    println!("   {} likely bills (confidence ≥ 70)", likely);

    Ok(())
}

fn print_candidate_row(candidate: &EmailBillCandidate) {
    println!(
        "   {} {:>3}% │ {:30} │ {:16} │ {:>9} │ due {}",
        confidence_icon(candidate.confidence),
        candidate.confidence,
        truncate(&candidate.description, 30),
        truncate(candidate.merchant.as_deref().unwrap_or("?"), 16),
        format_amount(candidate.amount),
        candidate
            .due_date
            .map(|d| d.to_string())
            .unwrap_or_else(|| "?".to_string())
    );
}

pub(crate) fn confidence_icon(confidence: u8) -> &'static str {
    match confidence {
        70..=100 => "🧾",
        40..=69 => "🤔",
        _ => "  ",
    }
}
