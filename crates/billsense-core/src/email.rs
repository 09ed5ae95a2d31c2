//! Email bill classification
//!
//! Scores a single email for how likely it is to be a bill and pulls out
//! amount, due date, merchant and category. Scoring is additive:
//!
//! | Signal                       | Default weight            |
//! |------------------------------|---------------------------|
//! | Subject pattern              | +20 each, capped at 40    |
//! | Sender pattern               | +15 each, capped at 30    |
//! | Dollar amount in body        | +20                       |
//! | Due date in body             | +15                       |
//! | Category keyword/pattern     | +15                       |
//! | Explicit merchant name       | +10                       |
//!
//! The total is clamped to 100. Classification never fails; emails with no
//! signal score 0.

use chrono::NaiveDate;
use rayon::prelude::*;
use tracing::debug;

use crate::models::{clamp_confidence, Email, EmailBillCandidate};
use crate::normalize::merchant_from_sender;
use crate::rules::{DueDatePattern, RuleSet};

/// Email classifier over a rule set
#[derive(Debug, Clone, Copy)]
pub struct EmailClassifier<'a> {
    rules: &'a RuleSet,
}

impl Default for EmailClassifier<'static> {
    fn default() -> Self {
        Self::new()
    }
}

impl EmailClassifier<'static> {
    /// Classifier over the embedded default rules
    pub fn new() -> Self {
        Self {
            rules: RuleSet::builtin(),
        }
    }
}

impl<'a> EmailClassifier<'a> {
    pub fn with_rules(rules: &'a RuleSet) -> Self {
        Self { rules }
    }

    /// Classify one email
    pub fn classify(&self, subject: &str, sender: &str, body: &str) -> EmailBillCandidate {
        let email_rules = &self.rules.email;
        let mut score: i64 = 0;

        let subject_hits = email_rules
            .subject_patterns
            .iter()
            .filter(|p| p.is_match(subject))
            .count() as u32;
        score += capped(subject_hits, email_rules.subject_weight, email_rules.subject_cap);

        let sender_hits = email_rules
            .sender_patterns
            .iter()
            .filter(|p| p.is_match(sender))
            .count() as u32;
        score += capped(sender_hits, email_rules.sender_weight, email_rules.sender_cap);

        let amount = self.extract_amount(body);
        if amount.is_some() {
            score += email_rules.amount_weight as i64;
        }

        let due_date = extract_due_date(&email_rules.due_date_patterns, body);
        if due_date.is_some() {
            score += email_rules.due_date_weight as i64;
        }

        let combined = format!("{} {} {}", subject, sender, body);
        let hit = self.rules.resolve_category(&combined);
        let mut category = None;
        let mut merchant = None;
        if let Some(hit) = hit {
            score += hit.score as i64;
            category = Some(hit.category);
            merchant = hit.merchant.map(str::to_string);
        }

        // Sender-derived names only make sense for something bill-like
        if merchant.is_none() && score > 0 {
            merchant = merchant_from_sender(sender, &email_rules.role_mailboxes);
        }

        let confidence = clamp_confidence(score);
        debug!(
            "Classified email {:?}: subject_hits={} sender_hits={} amount={:?} \
             due={:?} category={:?} confidence={}",
            subject,
            subject_hits,
            sender_hits,
            amount,
            due_date,
            category,
            confidence
        );

        EmailBillCandidate {
            confidence,
            amount,
            due_date,
            merchant,
            category,
            description: subject.trim().to_string(),
        }
    }

    /// Classify an [`Email`] record
    pub fn classify_email(&self, email: &Email) -> EmailBillCandidate {
        self.classify(&email.subject, &email.sender, &email.body)
    }

    /// Classify many emails across the rayon pool. Output keeps input order.
    pub fn classify_batch(&self, emails: &[Email]) -> Vec<EmailBillCandidate> {
        emails
            .par_iter()
            .map(|email| self.classify_email(email))
            .collect()
    }

    /// Largest dollar amount in the body.
    ///
    /// The biggest figure in a bill email is usually the total due. This
    /// misfires on itemized invoices where a line item or pre-discount
    /// subtotal is larger than the total.
    fn extract_amount(&self, body: &str) -> Option<f64> {
        let pattern = self.rules.email.amount_pattern.as_ref()?;
        pattern
            .captures_iter(body)
            .filter_map(|caps| caps.get(1))
            .filter_map(|m| m.as_str().replace(',', "").parse::<f64>().ok())
            .filter(|v| v.is_finite())
            .fold(None, |max: Option<f64>, v| match max {
                Some(current) if current >= v => Some(current),
                _ => Some(v),
            })
    }
}

/// `hits * weight`, capped
fn capped(hits: u32, weight: u32, cap: u32) -> i64 {
    hits.saturating_mul(weight).min(cap) as i64
}

/// First pattern (in declaration order) whose capture parses as a date
fn extract_due_date(patterns: &[DueDatePattern], body: &str) -> Option<NaiveDate> {
    for pattern in patterns {
        for caps in pattern.regex.captures_iter(body) {
            let Some(m) = caps.get(1) else {
                continue;
            };
            if let Some(date) = parse_date_text(m.as_str(), &pattern.formats) {
                return Some(date);
            }
        }
    }
    None
}

/// Parse captured date text with the given formats.
///
/// Periods and commas are dropped first so "Dec. 15, 2024" and
/// "Dec 15 2024" both read as "Dec 15 2024".
fn parse_date_text(text: &str, formats: &[String]) -> Option<NaiveDate> {
    let cleaned = text
        .replace(['.', ','], " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");

    formats
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(&cleaned, fmt).ok())
}

/// Classify an email with the embedded default rules
pub fn detect_bill_from_email(subject: &str, sender: &str, body: &str) -> EmailBillCandidate {
    EmailClassifier::new().classify(subject, sender, body)
}
