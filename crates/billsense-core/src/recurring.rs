//! Recurring bill detection over bank transactions
//!
//! A recurring bill is characterized by:
//! 1. The same normalized merchant name on every charge
//! 2. At least `min_occurrences` charges (3 by default)
//! 3. A mean interval that matches a known cadence within tolerance
//! 4. Consistent amounts ((max - min) / mean within 10% by default)
//!
//! Grouping is by exact normalized name. Near-duplicate merchant strings
//! that normalize differently stay in separate groups.

use std::collections::HashMap;

use chrono::Duration;
use tracing::{debug, info};

use crate::models::{clamp_confidence, Frequency, RecurringPattern, Transaction};
use crate::normalize::normalize_merchant;
use crate::rules::RuleSet;

/// A cadence the mean interval is checked against
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrequencyBucket {
    pub frequency: Frequency,
    /// Nominal days between charges (also used for the next prediction)
    pub days: i64,
    /// Allowed distance of the mean interval from `days`
    pub tolerance: i64,
}

impl FrequencyBucket {
    pub fn contains(&self, mean_interval: f64) -> bool {
        (mean_interval - self.days as f64).abs() <= self.tolerance as f64
    }
}

/// Recurrence detection thresholds and scoring weights
#[derive(Debug, Clone, PartialEq)]
pub struct RecurrenceConfig {
    /// Minimum charges in a group before a cadence is considered
    pub min_occurrences: usize,
    /// Groups whose (max - min) / mean amount exceeds this are dropped
    pub max_amount_variation: f64,
    /// Variation below this earns the tight amount bonus
    pub tight_amount_variation: f64,
    pub base_confidence: u32,
    pub tight_amount_bonus: u32,
    /// Earned when variation is below `max_amount_variation` but not tight
    pub loose_amount_bonus: u32,
    /// Earned when max interval - min interval is within bucket tolerance
    pub interval_spread_bonus: u32,
    pub per_occurrence_bonus: u32,
    pub occurrence_bonus_cap: u32,
    /// Earned when the merchant matches a category rule
    pub category_bonus: u32,
    /// Checked in order; first match wins
    pub buckets: Vec<FrequencyBucket>,
}

impl Default for RecurrenceConfig {
    fn default() -> Self {
        Self {
            min_occurrences: 3,
            max_amount_variation: 0.10,
            tight_amount_variation: 0.05,
            base_confidence: 60,
            tight_amount_bonus: 20,
            loose_amount_bonus: 10,
            interval_spread_bonus: 15,
            per_occurrence_bonus: 2,
            occurrence_bonus_cap: 20,
            category_bonus: 10,
            buckets: vec![
                FrequencyBucket {
                    frequency: Frequency::Weekly,
                    days: 7,
                    tolerance: 2,
                },
                FrequencyBucket {
                    frequency: Frequency::Monthly,
                    days: 30,
                    tolerance: 5,
                },
                FrequencyBucket {
                    frequency: Frequency::Quarterly,
                    days: 90,
                    tolerance: 10,
                },
                FrequencyBucket {
                    frequency: Frequency::Yearly,
                    days: 365,
                    tolerance: 30,
                },
            ],
        }
    }
}

/// Detects recurring payment patterns in a list of transactions
#[derive(Debug, Clone)]
pub struct RecurrenceDetector<'a> {
    rules: &'a RuleSet,
    config: RecurrenceConfig,
}

impl Default for RecurrenceDetector<'static> {
    fn default() -> Self {
        Self::new()
    }
}

impl RecurrenceDetector<'static> {
    /// Detector over the embedded default rules and thresholds
    pub fn new() -> Self {
        Self {
            rules: RuleSet::builtin(),
            config: RecurrenceConfig::default(),
        }
    }
}

impl<'a> RecurrenceDetector<'a> {
    pub fn with_rules(rules: &'a RuleSet) -> Self {
        Self {
            rules,
            config: RecurrenceConfig::default(),
        }
    }

    pub fn with_config(rules: &'a RuleSet, config: RecurrenceConfig) -> Self {
        Self { rules, config }
    }

    pub fn config(&self) -> &RecurrenceConfig {
        &self.config
    }

    /// Detect all recurring patterns, highest confidence first.
    ///
    /// Input order does not matter. Ties in confidence are ordered by
    /// merchant name so the output is deterministic.
    pub fn detect(&self, transactions: &[Transaction]) -> Vec<RecurringPattern> {
        let mut groups: HashMap<String, Vec<&Transaction>> = HashMap::new();
        for tx in transactions {
            let merchant = normalize_merchant(&tx.description);
            if merchant.is_empty() {
                debug!("Skipping transaction {} - empty description", tx.id);
                continue;
            }
            groups.entry(merchant).or_default().push(tx);
        }

        let group_count = groups.len();
        let mut patterns: Vec<RecurringPattern> = groups
            .into_iter()
            .filter_map(|(merchant, txs)| self.evaluate_group(merchant, txs))
            .collect();

        patterns.sort_by(|a, b| {
            b.confidence
                .cmp(&a.confidence)
                .then_with(|| a.merchant.cmp(&b.merchant))
        });

        info!(
            "Recurrence detection complete: {} transactions, {} merchants, {} recurring",
            transactions.len(),
            group_count,
            patterns.len()
        );

        patterns
    }

    /// Turn one merchant group into a pattern, or reject it
    fn evaluate_group(
        &self,
        merchant: String,
        mut txs: Vec<&Transaction>,
    ) -> Option<RecurringPattern> {
        // Need enough charges to establish periodicity
        if txs.len() < self.config.min_occurrences {
            debug!(
                "Skipping {} - {} occurrences (need {})",
                merchant,
                txs.len(),
                self.config.min_occurrences
            );
            return None;
        }

        txs.sort_by_key(|t| t.date);

        let intervals: Vec<i64> = txs
            .windows(2)
            .map(|w| (w[1].date - w[0].date).num_days())
            .collect();
        let mean_interval = intervals.iter().sum::<i64>() as f64 / intervals.len() as f64;

        let Some(bucket) = self.classify_interval(mean_interval) else {
            debug!(
                "Skipping {} - mean interval {:.1} days matches no cadence",
                merchant, mean_interval
            );
            return None;
        };

        let abs_amounts: Vec<f64> = txs.iter().map(|t| t.amount.abs()).collect();
        let Some(variation) = amount_variation(&abs_amounts) else {
            debug!("Skipping {} - zero amounts", merchant);
            return None;
        };
        if variation > self.config.max_amount_variation {
            debug!(
                "Skipping {} - amount variation {:.1}% too high",
                merchant,
                variation * 100.0
            );
            return None;
        }

        let mut score = self.config.base_confidence as i64;

        if variation < self.config.tight_amount_variation {
            score += self.config.tight_amount_bonus as i64;
        } else if variation < self.config.max_amount_variation {
            score += self.config.loose_amount_bonus as i64;
        }

        let max_interval = intervals.iter().copied().max().unwrap_or(0);
        let min_interval = intervals.iter().copied().min().unwrap_or(0);
        if max_interval - min_interval <= bucket.tolerance {
            score += self.config.interval_spread_bonus as i64;
        }

        let occurrence_bonus = (self.config.per_occurrence_bonus as i64)
            .saturating_mul(txs.len() as i64)
            .min(self.config.occurrence_bonus_cap as i64);
        score += occurrence_bonus;

        let category = self.rules.categorize_merchant(&merchant);
        if category.is_some() {
            score += self.config.category_bonus as i64;
        }

        let last_date = txs.last()?.date;
        let next_predicted =
            Duration::try_days(bucket.days).and_then(|d| last_date.checked_add_signed(d));

        let confidence = clamp_confidence(score);
        debug!(
            "Found recurring bill: {} {} x{} (confidence {})",
            merchant,
            bucket.frequency,
            txs.len(),
            confidence
        );

        Some(RecurringPattern {
            merchant,
            amounts: txs.iter().map(|t| t.amount).collect(),
            dates: txs.iter().map(|t| t.date).collect(),
            frequency: bucket.frequency,
            confidence,
            next_predicted,
            category,
        })
    }

    fn classify_interval(&self, mean_interval: f64) -> Option<&FrequencyBucket> {
        self.config
            .buckets
            .iter()
            .find(|bucket| bucket.contains(mean_interval))
    }
}

/// (max - min) / mean, or None when the mean is effectively zero
fn amount_variation(amounts: &[f64]) -> Option<f64> {
    if amounts.is_empty() {
        return None;
    }
    let mean = amounts.iter().sum::<f64>() / amounts.len() as f64;
    if mean < 0.01 {
        return None;
    }
    let max = amounts.iter().copied().fold(f64::MIN, f64::max);
    let min = amounts.iter().copied().fold(f64::MAX, f64::min);
    Some((max - min) / mean)
}

/// Detect recurring bills with the embedded default rules and thresholds
pub fn detect_recurring_bills(transactions: &[Transaction]) -> Vec<RecurringPattern> {
    RecurrenceDetector::new().detect(transactions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BillCategory;
    use chrono::NaiveDate;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn make_tx(id: &str, day: &str, amount: f64, description: &str) -> Transaction {
        Transaction {
            id: id.to_string(),
            date: date(day),
            amount,
            description: description.to_string(),
            merchant: None,
            category: None,
        }
    }

    fn series(description: &str, days: &[&str], amounts: &[f64]) -> Vec<Transaction> {
        days.iter()
            .zip(amounts)
            .enumerate()
            .map(|(i, (day, amount))| {
                make_tx(&format!("{}-{}", description, i), day, *amount, description)
            })
            .collect()
    }

    #[test]
    fn test_monthly_netflix() {
        let txs = series(
            "NETFLIX.COM",
            &["2024-09-28", "2024-10-28", "2024-11-28"],
            &[-15.99, -15.99, -15.99],
        );

        let patterns = detect_recurring_bills(&txs);
        assert_eq!(patterns.len(), 1);

        let p = &patterns[0];
        assert_eq!(p.merchant, "NETFLIX.COM");
        assert_eq!(p.frequency, Frequency::Monthly);
        assert_eq!(p.confidence, 100);
        assert_eq!(p.next_predicted, Some(date("2024-12-28")));
        assert_eq!(p.category, Some(BillCategory::Entertainment));
        assert_eq!(p.amounts, vec![-15.99, -15.99, -15.99]);
        assert_eq!(p.dates.len(), p.amounts.len());
    }

    #[test]
    fn test_two_occurrences_never_recurring() {
        let txs = series("NETFLIX.COM", &["2024-10-28", "2024-11-28"], &[15.99, 15.99]);
        assert!(detect_recurring_bills(&txs).is_empty());
    }

    #[test]
    fn test_varying_amounts_rejected() {
        let txs = series(
            "CITY PARKING",
            &["2024-01-05", "2024-02-05", "2024-03-05"],
            &[10.0, 50.0, 200.0],
        );
        assert!(detect_recurring_bills(&txs).is_empty());
    }

    #[test]
    fn test_irregular_interval_rejected() {
        // Mean interval of 50 days sits between monthly and quarterly
        let txs = series(
            "ACME WIDGETS",
            &["2024-01-01", "2024-02-20", "2024-04-10"],
            &[20.0, 20.0, 20.0],
        );
        assert!(detect_recurring_bills(&txs).is_empty());
    }

    #[test]
    fn test_frequency_buckets() {
        let weekly = series(
            "DOG WALKER",
            &["2024-03-01", "2024-03-08", "2024-03-15", "2024-03-22"],
            &[25.0; 4],
        );
        let quarterly = series(
            "WATER DISTRICT",
            &["2024-01-15", "2024-04-15", "2024-07-15"],
            &[88.0; 3],
        );
        let yearly = series(
            "DOMAIN RENEWALS",
            &["2021-06-01", "2022-06-01", "2023-06-01"],
            &[12.0; 3],
        );

        let find = |txs: &[Transaction]| detect_recurring_bills(txs)[0].frequency;
        assert_eq!(find(&weekly), Frequency::Weekly);
        assert_eq!(find(&quarterly), Frequency::Quarterly);
        assert_eq!(find(&yearly), Frequency::Yearly);
    }

    #[test]
    fn test_unordered_input_is_sorted() {
        let txs = vec![
            make_tx("3", "2024-03-10", -9.99, "SPOTIFY USA"),
            make_tx("1", "2024-01-10", -9.99, "SPOTIFY USA"),
            make_tx("2", "2024-02-10", -9.99, "SPOTIFY USA"),
        ];

        let patterns = detect_recurring_bills(&txs);
        assert_eq!(patterns.len(), 1);
        assert_eq!(
            patterns[0].dates,
            vec![date("2024-01-10"), date("2024-02-10"), date("2024-03-10")]
        );
        assert_eq!(patterns[0].next_predicted, Some(date("2024-04-09")));
    }

    #[test]
    fn test_normalized_descriptions_group_together() {
        let txs = vec![
            make_tx("1", "2024-01-03", -11.99, "PAYPAL *SPOTIFY 8449"),
            make_tx("2", "2024-02-03", -11.99, "SPOTIFY"),
            make_tx("3", "2024-03-03", -11.99, "Spotify  Inc"),
        ];

        let patterns = detect_recurring_bills(&txs);
        assert_eq!(patterns.len(), 1);
        assert_eq!(patterns[0].merchant, "SPOTIFY");
    }

    #[test]
    fn test_confidence_components() {
        let rules = RuleSet::empty();
        let detector = RecurrenceDetector::with_rules(&rules);

        // Tight amounts, even spacing, 3 charges: 60 + 20 + 15 + 6
        let even = series(
            "ACME WIDGETS",
            &["2024-01-01", "2024-01-31", "2024-03-01"],
            &[20.0; 3],
        );
        assert_eq!(detector.detect(&even)[0].confidence, 100);

        // Loose amounts (~6.7%): 60 + 10 + 15 + 6
        let loose = series(
            "LAWN CARE",
            &["2024-01-01", "2024-01-31", "2024-03-01"],
            &[40.0, 42.0, 42.8],
        );
        assert_eq!(detector.detect(&loose)[0].confidence, 91);

        // Uneven spacing (24 then 36 days, spread 12 > 5): 60 + 20 + 6
        let uneven = series(
            "ACME WIDGETS",
            &["2024-01-01", "2024-01-25", "2024-03-01"],
            &[20.0; 3],
        );
        assert_eq!(detector.detect(&uneven)[0].confidence, 86);
    }

    #[test]
    fn test_occurrence_bonus_capped() {
        let rules = RuleSet::empty();
        let config = RecurrenceConfig {
            base_confidence: 0,
            tight_amount_bonus: 0,
            interval_spread_bonus: 0,
            ..RecurrenceConfig::default()
        };
        let detector = RecurrenceDetector::with_config(&rules, config);

        let days: Vec<String> = (0..12)
            .map(|i| {
                (date("2024-01-01") + Duration::days(30 * i))
                    .format("%Y-%m-%d")
                    .to_string()
            })
            .collect();
        let day_refs: Vec<&str> = days.iter().map(String::as_str).collect();
        let txs = series("GYM MEMBERSHIP", &day_refs, &[30.0; 12]);

        let patterns = detector.detect(&txs);
        assert_eq!(patterns[0].confidence, 20);
    }

    #[test]
    fn test_sorted_by_confidence() {
        let rules = RuleSet::empty();
        let detector = RecurrenceDetector::with_rules(&rules);

        let mut txs = series(
            "LAWN CARE",
            &["2024-01-01", "2024-01-31", "2024-03-01"],
            &[40.0, 42.0, 42.8],
        );
        txs.extend(series(
            "ACME WIDGETS",
            &["2024-01-01", "2024-01-25", "2024-03-01"],
            &[20.0; 3],
        ));
        txs.extend(series(
            "DOG WALKER",
            &["2024-03-01", "2024-03-08", "2024-03-15", "2024-03-22"],
            &[25.0; 4],
        ));

        let patterns = detector.detect(&txs);
        let confidences: Vec<u8> = patterns.iter().map(|p| p.confidence).collect();
        assert_eq!(confidences, vec![100, 91, 86]);
        assert_eq!(patterns[0].merchant, "DOG WALKER");
    }

    /// Three equal charges spaced `interval` days apart
    fn evenly_spaced(description: &str, interval: i64, amounts: &[f64]) -> Vec<Transaction> {
        let start = date("2024-01-01");
        amounts
            .iter()
            .enumerate()
            .map(|(i, amount)| Transaction {
                id: format!("{}-{}", description, i),
                date: start + Duration::days(interval * i as i64),
                amount: *amount,
                description: description.to_string(),
                merchant: None,
                category: None,
            })
            .collect()
    }

    #[test]
    fn test_bucket_tolerance_inclusive() {
        let rules = RuleSet::empty();
        let detector = RecurrenceDetector::with_rules(&rules);

        let cases = [
            (4, None),
            (5, Some(Frequency::Weekly)),
            (9, Some(Frequency::Weekly)),
            (10, None),
            (24, None),
            (25, Some(Frequency::Monthly)),
            (35, Some(Frequency::Monthly)),
            (36, None),
            (80, Some(Frequency::Quarterly)),
            (100, Some(Frequency::Quarterly)),
            (335, Some(Frequency::Yearly)),
            (395, Some(Frequency::Yearly)),
            (396, None),
        ];
        for (interval, expected) in cases {
            let txs = evenly_spaced("ACME WIDGETS", interval, &[20.0; 3]);
            let found = detector.detect(&txs).first().map(|p| p.frequency);
            assert_eq!(found, expected, "interval of {} days", interval);
        }
    }

    #[test]
    fn test_variation_boundary() {
        let rules = RuleSet::empty();
        let detector = RecurrenceDetector::with_rules(&rules);

        // Exactly 10%: kept, but earns no amount bonus (60 + 15 + 6)
        let at_max = evenly_spaced("LAWN CARE", 30, &[95.0, 100.0, 105.0]);
        let patterns = detector.detect(&at_max);
        assert_eq!(patterns.len(), 1);
        assert_eq!(patterns[0].confidence, 81);

        // Exactly 5%: loose bonus, not tight (60 + 10 + 15 + 6)
        let at_tight = evenly_spaced("LAWN CARE", 30, &[97.5, 100.0, 102.5]);
        assert_eq!(detector.detect(&at_tight)[0].confidence, 91);

        // Just over 10%: dropped
        let over = evenly_spaced("LAWN CARE", 30, &[94.9, 100.0, 105.1]);
        assert!(detector.detect(&over).is_empty());
    }

    #[test]
    fn test_out_of_range_bucket_does_not_panic() {
        let rules = RuleSet::empty();
        let config = RecurrenceConfig {
            buckets: vec![FrequencyBucket {
                frequency: Frequency::Monthly,
                days: 1_000_000_000_000_000,
                tolerance: i64::MAX,
            }],
            ..RecurrenceConfig::default()
        };
        let detector = RecurrenceDetector::with_config(&rules, config);

        let txs = evenly_spaced("ACME WIDGETS", 30, &[20.0; 3]);
        let patterns = detector.detect(&txs);
        assert_eq!(patterns.len(), 1);
        assert_eq!(patterns[0].next_predicted, None);
    }

    #[test]
    fn test_trailing_posting_dates_group_together() {
        let txs = vec![
            make_tx("1", "2024-09-28", -15.99, "NETFLIX.COM 09/28"),
            make_tx("2", "2024-10-28", -15.99, "NETFLIX.COM 10/28"),
            make_tx("3", "2024-11-28", -15.99, "NETFLIX.COM 11/28"),
        ];

        let patterns = detect_recurring_bills(&txs);
        assert_eq!(patterns.len(), 1);
        assert_eq!(patterns[0].merchant, "NETFLIX.COM");
    }

    #[test]
    fn test_zero_amounts_rejected() {
        let txs = series(
            "FREE TRIAL",
            &["2024-01-01", "2024-01-31", "2024-03-01"],
            &[0.0; 3],
        );
        assert!(detect_recurring_bills(&txs).is_empty());
    }

    #[test]
    fn test_empty_input() {
        assert!(detect_recurring_bills(&[]).is_empty());
    }

    #[test]
    fn test_amount_variation() {
        assert_eq!(amount_variation(&[10.0, 10.0]), Some(0.0));
        assert_eq!(amount_variation(&[]), None);
        assert_eq!(amount_variation(&[0.0, 0.0]), None);
        let v = amount_variation(&[90.0, 110.0]).unwrap();
        assert!((v - 0.2).abs() < 1e-9);
    }
}
