//! Reconcile email bill candidates with recurring transaction patterns
//!
//! A bill that shows up both as an email and as a recurring charge is
//! stronger evidence than either alone. Matches are scored with
//! [`calculate_confidence_score`] with multiple sources set.

use tracing::debug;

use crate::confidence::calculate_confidence_score;
use crate::models::{BillMatch, EmailBillCandidate, RecurringPattern};

/// Relative difference allowed between the email amount and the last charge
pub const AMOUNT_TOLERANCE: f64 = 0.10;

/// Merchant keys shorter than this must match exactly
const MIN_SUBSTRING_KEY_LEN: usize = 3;

/// Pair candidates with patterns of the same merchant.
///
/// Candidates are visited from most to least confident, and each pattern
/// is used at most once (the most confident unused one that matches).
/// Candidates without a merchant are skipped. Output is sorted by combined
/// confidence, highest first.
pub fn reconcile(
    candidates: &[EmailBillCandidate],
    patterns: &[RecurringPattern],
) -> Vec<BillMatch> {
    let mut order: Vec<&EmailBillCandidate> = candidates.iter().collect();
    order.sort_by(|a, b| b.confidence.cmp(&a.confidence));

    let mut ranked: Vec<(usize, &RecurringPattern)> = patterns.iter().enumerate().collect();
    ranked.sort_by(|a, b| b.1.confidence.cmp(&a.1.confidence));

    let mut used = vec![false; patterns.len()];
    let mut matches = Vec::new();

    for candidate in order {
        let Some(merchant) = candidate.merchant.as_deref() else {
            continue;
        };
        let candidate_key = merchant_key(merchant);
        if candidate_key.is_empty() {
            continue;
        }

        let found = ranked.iter().find(|(index, pattern)| {
            !used[*index]
                && merchants_match(&candidate_key, &merchant_key(&pattern.merchant))
                && amounts_match(candidate.amount, pattern.last_amount())
        });

        if let Some((index, pattern)) = found {
            used[*index] = true;
            let confidence = calculate_confidence_score(candidate.confidence, pattern.confidence, true);
            debug!(
                "Matched email bill {:?} with recurring {} (confidence {})",
                merchant, pattern.merchant, confidence
            );
            matches.push(BillMatch {
                candidate: candidate.clone(),
                pattern: (*pattern).clone(),
                confidence,
            });
        }
    }

    matches.sort_by(|a, b| b.confidence.cmp(&a.confidence));
    matches
}

/// Lowercase alphanumerics only: "NETFLIX.COM" -> "netflixcom"
fn merchant_key(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

fn merchants_match(a: &str, b: &str) -> bool {
    if a.is_empty() || b.is_empty() {
        return false;
    }
    if a == b {
        return true;
    }
    let (short, long) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    short.len() >= MIN_SUBSTRING_KEY_LEN && long.contains(short)
}

/// Unknown amounts on either side don't block a match
fn amounts_match(email_amount: Option<f64>, last_charge: Option<f64>) -> bool {
    match (email_amount, last_charge) {
        (Some(email), Some(charge)) => {
            let charge = charge.abs();
            if charge < 0.01 {
                return email.abs() < 0.01;
            }
            (email.abs() - charge).abs() / charge <= AMOUNT_TOLERANCE
        }
        _ => true,
    }
}
