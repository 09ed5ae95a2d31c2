//! Rule set summary command

use anyhow::Result;
use billsense_core::{Config, RuleSet};
use serde::Serialize;

use super::print_json;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RulesSummary<'a> {
    subject_patterns: Vec<&'a str>,
    sender_patterns: Vec<&'a str>,
    due_date_patterns: usize,
    categories: Vec<CategorySummary<'a>>,
    min_occurrences: usize,
    max_amount_variation: f64,
    buckets: Vec<BucketSummary>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CategorySummary<'a> {
    category: &'static str,
    keywords: usize,
    patterns: usize,
    merchants: &'a [String],
}

#[derive(Serialize)]
struct BucketSummary {
    frequency: &'static str,
    days: i64,
    tolerance: i64,
}

fn summarize(config: &Config) -> RulesSummary<'_> {
    let rules: &RuleSet = &config.rules;
    RulesSummary {
        subject_patterns: rules.email.subject_patterns.iter().map(|r| r.as_str()).collect(),
        sender_patterns: rules.email.sender_patterns.iter().map(|r| r.as_str()).collect(),
        due_date_patterns: rules.email.due_date_patterns.len(),
        categories: rules
            .categories
            .iter()
            .map(|rule| CategorySummary {
                category: rule.category.as_str(),
                keywords: rule.keywords.len(),
                patterns: rule.patterns.len(),
                merchants: &rule.merchants,
            })
            .collect(),
        min_occurrences: config.recurrence.min_occurrences,
        max_amount_variation: config.recurrence.max_amount_variation,
        buckets: config
            .recurrence
            .buckets
            .iter()
            .map(|b| BucketSummary {
                frequency: b.frequency.as_str(),
                days: b.days,
                tolerance: b.tolerance,
            })
            .collect(),
    }
}

pub fn cmd_rules(config: &Config, json: bool) -> Result<()> {
    let summary = summarize(config);

    if json {
        return print_json(&summary);
    }

    println!();
    println!("📐 Bill Rules");
    println!("   ─────────────────────────────────────────────────────────────");
    println!("   Subject patterns:  {}", summary.subject_patterns.len());
    println!("   Sender patterns:   {}", summary.sender_patterns.len());
    println!("   Due date patterns: {}", summary.due_date_patterns);
    println!();
    println!("   Categories (first match wins):");
    for (i, category) in summary.categories.iter().enumerate() {
        println!(
            "   {:>2}. {:14} {:>2} keywords, {:>2} patterns, {:>2} merchants",
            i + 1,
            category.category,
            category.keywords,
            category.patterns,
            category.merchants.len()
        );
    }
    println!();
    println!(
        "   Recurrence: ≥{} charges, ≤{:.0}% amount variation",
        summary.min_occurrences,
        summary.max_amount_variation * 100.0
    );
    for bucket in &summary.buckets {
        println!(
            "      {:10} {:>3} ± {} days",
            bucket.frequency, bucket.days, bucket.tolerance
        );
    }

    Ok(())
}
