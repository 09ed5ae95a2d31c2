//! Rule and threshold configuration
//!
//! ## Configuration Resolution
//!
//! Config is loaded with a two-layer resolution:
//! 1. Check for an override file (explicit path, or
//!    ~/.local/share/billsense/config/bill_rules.toml)
//! 2. Fall back to embedded defaults (compiled into binary)
//!
//! Override files only need the keys they change. Scalar keys and pattern
//! lists replace the default value; `[[categories]]` replaces the whole
//! category list since its order is significant.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::models::{BillCategory, Frequency};
use crate::recurring::{FrequencyBucket, RecurrenceConfig};
use crate::rules::{compile_pattern, CategoryRule, DueDatePattern, EmailRules, RuleSet};

/// Embedded default config (compiled into binary)
const DEFAULT_CONFIG: &str = include_str!("../../../config/bill_rules.toml");

/// Upper bound for bucket `days` and `tolerance` (ten years)
const MAX_BUCKET_DAYS: i64 = 3650;

/// Everything the detectors can be configured with
#[derive(Debug, Clone)]
pub struct Config {
    pub rules: RuleSet,
    pub recurrence: RecurrenceConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            rules: RuleSet::default(),
            recurrence: RecurrenceConfig::default(),
        }
    }
}

/// Default config override path
pub fn default_config_path() -> Option<PathBuf> {
    dirs::data_local_dir().map(|d| {
        d.join("billsense")
            .join("config")
            .join("bill_rules.toml")
    })
}

/// Load configuration (override first, then default)
pub fn load_config(override_path: Option<&Path>) -> Result<Config> {
    let content = if let Some(path) = override_path {
        if !path.exists() {
            return Err(Error::Config(format!(
                "Rules file not found: {}",
                path.display()
            )));
        }
        info!("Loading bill rules from {}", path.display());
        fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read config: {}", e)))?
    } else if let Some(default_path) = default_config_path().filter(|p| p.exists()) {
        info!("Loading bill rules from {}", default_path.display());
        fs::read_to_string(&default_path)
            .map_err(|e| Error::Config(format!("Failed to read config: {}", e)))?
    } else {
        debug!("Using embedded bill rules");
        String::new()
    };

    parse_config(&content)
}

/// Raw config structure for TOML parsing
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    email: Option<RawEmail>,
    recurrence: Option<RawRecurrence>,
    categories: Option<Vec<RawCategory>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawEmail {
    subject_weight: Option<u32>,
    subject_cap: Option<u32>,
    sender_weight: Option<u32>,
    sender_cap: Option<u32>,
    amount_weight: Option<u32>,
    due_date_weight: Option<u32>,
    subject_patterns: Option<Vec<String>>,
    sender_patterns: Option<Vec<String>>,
    amount_pattern: Option<String>,
    role_mailboxes: Option<Vec<String>>,
    due_date_patterns: Option<Vec<RawDueDate>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawDueDate {
    pattern: String,
    formats: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawRecurrence {
    min_occurrences: Option<usize>,
    max_amount_variation: Option<f64>,
    tight_amount_variation: Option<f64>,
    base_confidence: Option<u32>,
    tight_amount_bonus: Option<u32>,
    loose_amount_bonus: Option<u32>,
    interval_spread_bonus: Option<u32>,
    per_occurrence_bonus: Option<u32>,
    occurrence_bonus_cap: Option<u32>,
    category_bonus: Option<u32>,
    buckets: Option<Vec<RawBucket>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawBucket {
    frequency: String,
    days: i64,
    tolerance: i64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawCategory {
    category: String,
    #[serde(default)]
    keywords: Vec<String>,
    #[serde(default)]
    patterns: Vec<String>,
    #[serde(default)]
    merchants: Vec<String>,
    keyword_weight: Option<u32>,
    merchant_weight: Option<u32>,
}

/// Parse config from TOML content, layered over the embedded defaults
pub fn parse_config(content: &str) -> Result<Config> {
    let defaults: RawConfig = toml::from_str(DEFAULT_CONFIG)
        .map_err(|e| Error::Config(format!("Invalid embedded config TOML: {}", e)))?;
    let overrides: RawConfig = toml::from_str(content)
        .map_err(|e| Error::Config(format!("Invalid config TOML: {}", e)))?;

    let email = overlay_email(
        defaults.email.unwrap_or_default(),
        overrides.email.unwrap_or_default(),
    );
    let recurrence = overlay_recurrence(
        defaults.recurrence.unwrap_or_default(),
        overrides.recurrence.unwrap_or_default(),
    );
    let categories = overrides
        .categories
        .or(defaults.categories)
        .unwrap_or_default();

    Ok(Config {
        rules: RuleSet {
            email: build_email_rules(email)?,
            categories: categories
                .into_iter()
                .map(build_category_rule)
                .collect::<Result<Vec<_>>>()?,
        },
        recurrence: build_recurrence(recurrence)?,
    })
}

fn overlay_email(base: RawEmail, over: RawEmail) -> RawEmail {
    RawEmail {
        subject_weight: over.subject_weight.or(base.subject_weight),
        subject_cap: over.subject_cap.or(base.subject_cap),
        sender_weight: over.sender_weight.or(base.sender_weight),
        sender_cap: over.sender_cap.or(base.sender_cap),
        amount_weight: over.amount_weight.or(base.amount_weight),
        due_date_weight: over.due_date_weight.or(base.due_date_weight),
        subject_patterns: over.subject_patterns.or(base.subject_patterns),
        sender_patterns: over.sender_patterns.or(base.sender_patterns),
        amount_pattern: over.amount_pattern.or(base.amount_pattern),
        role_mailboxes: over.role_mailboxes.or(base.role_mailboxes),
        due_date_patterns: over.due_date_patterns.or(base.due_date_patterns),
    }
}

fn overlay_recurrence(base: RawRecurrence, over: RawRecurrence) -> RawRecurrence {
    RawRecurrence {
        min_occurrences: over.min_occurrences.or(base.min_occurrences),
        max_amount_variation: over.max_amount_variation.or(base.max_amount_variation),
        tight_amount_variation: over.tight_amount_variation.or(base.tight_amount_variation),
        base_confidence: over.base_confidence.or(base.base_confidence),
        tight_amount_bonus: over.tight_amount_bonus.or(base.tight_amount_bonus),
        loose_amount_bonus: over.loose_amount_bonus.or(base.loose_amount_bonus),
        interval_spread_bonus: over.interval_spread_bonus.or(base.interval_spread_bonus),
        per_occurrence_bonus: over.per_occurrence_bonus.or(base.per_occurrence_bonus),
        occurrence_bonus_cap: over.occurrence_bonus_cap.or(base.occurrence_bonus_cap),
        category_bonus: over.category_bonus.or(base.category_bonus),
        buckets: over.buckets.or(base.buckets),
    }
}

fn compile_all(patterns: &[String]) -> Result<Vec<regex::Regex>> {
    patterns.iter().map(|p| compile_pattern(p)).collect()
}

fn build_email_rules(raw: RawEmail) -> Result<EmailRules> {
    let mut rules = EmailRules::empty();

    if let Some(weight) = raw.subject_weight {
        rules.subject_weight = weight;
    }
    if let Some(cap) = raw.subject_cap {
        rules.subject_cap = cap;
    }
    if let Some(weight) = raw.sender_weight {
        rules.sender_weight = weight;
    }
    if let Some(cap) = raw.sender_cap {
        rules.sender_cap = cap;
    }
    if let Some(weight) = raw.amount_weight {
        rules.amount_weight = weight;
    }
    if let Some(weight) = raw.due_date_weight {
        rules.due_date_weight = weight;
    }

    rules.subject_patterns = compile_all(&raw.subject_patterns.unwrap_or_default())?;
    rules.sender_patterns = compile_all(&raw.sender_patterns.unwrap_or_default())?;
    rules.amount_pattern = raw
        .amount_pattern
        .as_deref()
        .map(compile_pattern)
        .transpose()?;
    if let Some(re) = &rules.amount_pattern {
        if re.captures_len() < 2 {
            return Err(Error::Config(
                "amount_pattern needs a capture group for the value".into(),
            ));
        }
    }

    rules.role_mailboxes = raw
        .role_mailboxes
        .unwrap_or_default()
        .into_iter()
        .map(|m| m.to_lowercase())
        .collect();

    for due in raw.due_date_patterns.unwrap_or_default() {
        let regex = compile_pattern(&due.pattern)?;
        if regex.captures_len() < 2 {
            return Err(Error::Config(format!(
                "Due-date pattern needs a capture group: {}",
                due.pattern
            )));
        }
        if due.formats.is_empty() {
            return Err(Error::Config(format!(
                "Due-date pattern has no date formats: {}",
                due.pattern
            )));
        }
        rules.due_date_patterns.push(DueDatePattern {
            regex,
            formats: due.formats,
        });
    }

    Ok(rules)
}

fn build_category_rule(raw: RawCategory) -> Result<CategoryRule> {
    let category: BillCategory = raw.category.parse().map_err(Error::Config)?;

    let mut rule = CategoryRule::new(category)
        .with_keywords(&raw.keywords)?
        .with_patterns(&raw.patterns)?
        .with_merchants(raw.merchants)?;

    if let Some(weight) = raw.keyword_weight {
        rule.keyword_weight = weight;
    }
    if let Some(weight) = raw.merchant_weight {
        rule.merchant_weight = weight;
    }

    Ok(rule)
}

fn build_recurrence(raw: RawRecurrence) -> Result<RecurrenceConfig> {
    let mut config = RecurrenceConfig::default();

    if let Some(min) = raw.min_occurrences {
        if min < 2 {
            return Err(Error::Config(format!(
                "min_occurrences must be at least 2, got {}",
                min
            )));
        }
        config.min_occurrences = min;
    }
    if let Some(v) = raw.max_amount_variation {
        config.max_amount_variation = v;
    }
    if let Some(v) = raw.tight_amount_variation {
        config.tight_amount_variation = v;
    }
    for v in [config.max_amount_variation, config.tight_amount_variation] {
        if !v.is_finite() || v < 0.0 {
            return Err(Error::Config(format!(
                "Amount variation must be a finite, non-negative number, got {}",
                v
            )));
        }
    }
    if let Some(v) = raw.base_confidence {
        config.base_confidence = v;
    }
    if let Some(v) = raw.tight_amount_bonus {
        config.tight_amount_bonus = v;
    }
    if let Some(v) = raw.loose_amount_bonus {
        config.loose_amount_bonus = v;
    }
    if let Some(v) = raw.interval_spread_bonus {
        config.interval_spread_bonus = v;
    }
    if let Some(v) = raw.per_occurrence_bonus {
        config.per_occurrence_bonus = v;
    }
    if let Some(v) = raw.occurrence_bonus_cap {
        config.occurrence_bonus_cap = v;
    }
    if let Some(v) = raw.category_bonus {
        config.category_bonus = v;
    }

    if let Some(buckets) = raw.buckets {
        if buckets.is_empty() {
            return Err(Error::Config("At least one frequency bucket is required".into()));
        }
        config.buckets = buckets
            .into_iter()
            .map(|b| {
                let frequency: Frequency = b.frequency.parse().map_err(Error::Config)?;
                if !(1..=MAX_BUCKET_DAYS).contains(&b.days)
                    || !(0..=MAX_BUCKET_DAYS).contains(&b.tolerance)
                {
                    return Err(Error::Config(format!(
                        "Invalid {} bucket: days={} tolerance={}",
                        frequency, b.days, b.tolerance
                    )));
                }
                Ok(FrequencyBucket {
                    frequency,
                    days: b.days,
                    tolerance: b.tolerance,
                })
            })
            .collect::<Result<Vec<_>>>()?;
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_embedded_defaults() {
        let config = parse_config("").unwrap();
        assert_eq!(config.rules.email.subject_weight, 20);
        assert_eq!(config.rules.email.subject_cap, 40);
        assert_eq!(config.rules.email.sender_weight, 15);
        assert_eq!(config.rules.email.sender_cap, 30);
        assert_eq!(config.rules.email.amount_weight, 20);
        assert_eq!(config.rules.email.due_date_weight, 15);
        assert!(config.rules.email.amount_pattern.is_some());
        assert_eq!(config.rules.categories.len(), 9);
    }

    #[test]
    fn test_embedded_recurrence_matches_code_defaults() {
        let config = parse_config("").unwrap();
        assert_eq!(config.recurrence, RecurrenceConfig::default());
    }

    #[test]
    fn test_override_scalar_keeps_other_defaults() {
        let config = parse_config(
            r#"
[email]
subject_weight = 25

[recurrence]
min_occurrences = 4
"#,
        )
        .unwrap();
        assert_eq!(config.rules.email.subject_weight, 25);
        assert_eq!(config.rules.email.sender_weight, 15);
        assert!(!config.rules.email.subject_patterns.is_empty());
        assert_eq!(config.recurrence.min_occurrences, 4);
        assert_eq!(config.recurrence.buckets.len(), 4);
        assert_eq!(config.rules.categories.len(), 9);
    }

    #[test]
    fn test_out_of_range_bucket_rejected() {
        for (days, tolerance) in [
            ("1000000000000000", "9223372036854775807"),
            ("3651", "5"),
            ("30", "3651"),
            ("0", "5"),
            ("30", "-1"),
        ] {
            let content = format!(
                "[[recurrence.buckets]]\nfrequency = 'monthly'\ndays = {}\ntolerance = {}\n",
                days, tolerance
            );
            let result = parse_config(&content);
            assert!(
                matches!(result, Err(Error::Config(_))),
                "days={} tolerance={}",
                days,
                tolerance
            );
        }

        let content = "[[recurrence.buckets]]\nfrequency = 'yearly'\ndays = 3650\ntolerance = 0\n";
        let config = parse_config(content).unwrap();
        assert_eq!(config.recurrence.buckets[0].days, 3650);
    }

    #[test]
    fn test_non_finite_variation_rejected() {
        for value in ["nan", "inf", "-0.5"] {
            let content = format!("[recurrence]\nmax_amount_variation = {}\n", value);
            assert!(parse_config(&content).is_err(), "accepted {}", value);

            let content = format!("[recurrence]\ntight_amount_variation = {}\n", value);
            assert!(parse_config(&content).is_err(), "accepted {}", value);
        }
    }

    #[test]
    fn test_override_categories_replaces_list() {
        let config = parse_config(
            r#"
[[categories]]
category = "fitness"
keywords = ["climbing gym"]
merchant_weight = 5
"#,
        )
        .unwrap();
        assert_eq!(config.rules.categories.len(), 1);
        let rule = &config.rules.categories[0];
        assert_eq!(rule.category, BillCategory::Fitness);
        assert_eq!(rule.keywords, vec!["climbing gym".to_string()]);
        assert_eq!(rule.keyword_weight, 15);
        assert_eq!(rule.merchant_weight, 5);
    }

    #[test]
    fn test_unknown_category_rejected() {
        let result = parse_config(
            r#"
[[categories]]
category = "groceries"
keywords = ["safeway"]
"#,
        );
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_bad_regex_rejected() {
        let result = parse_config(
            r#"
[email]
subject_patterns = ["bill(("]
"#,
        );
        assert!(matches!(result, Err(Error::Regex(_))));
    }

    #[test]
    fn test_unknown_key_rejected() {
        let result = parse_config("[email]\nsubject_wieght = 5\n");
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_invalid_buckets_rejected() {
        assert!(parse_config("[recurrence]\nbuckets = []\n").is_err());
        assert!(parse_config(
            r#"
[[recurrence.buckets]]
frequency = "fortnightly"
days = 14
tolerance = 2
"#
        )
        .is_err());
        assert!(parse_config("[recurrence]\nmin_occurrences = 1\n").is_err());
    }

    #[test]
    fn test_due_date_pattern_requires_capture() {
        let result = parse_config(
            r#"
[[email.due_date_patterns]]
pattern = 'due \d+/\d+/\d{4}'
formats = ["%m/%d/%Y"]
"#,
        );
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_load_config_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[recurrence]\nmax_amount_variation = 0.2").unwrap();

        let config = load_config(Some(file.path())).unwrap();
        assert_eq!(config.recurrence.max_amount_variation, 0.2);
    }

    #[test]
    fn test_load_config_missing_file() {
        let result = load_config(Some(Path::new("/nonexistent/bill_rules.toml")));
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
