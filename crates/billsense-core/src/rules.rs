//! Bill rule tables
//!
//! A [`RuleSet`] holds every table the detectors read: subject/sender
//! patterns, amount and due-date extraction patterns, scoring weights, and
//! the ordered list of category rules. Rule sets are immutable once built
//! and can be shared freely across threads.
//!
//! Category resolution walks [`RuleSet::categories`] in declaration order
//! and the first rule with any hit wins. Order is part of the contract.

use std::path::Path;
use std::sync::OnceLock;

use regex::{Regex, RegexBuilder};
use tracing::{debug, warn};

use crate::config;
use crate::error::Result;
use crate::models::BillCategory;

/// Default weight for a keyword or pattern hit
pub const DEFAULT_KEYWORD_WEIGHT: u32 = 15;
/// Default extra weight for an explicit merchant-name hit
pub const DEFAULT_MERCHANT_WEIGHT: u32 = 10;

/// Compile a pattern the way every bill rule is matched: case-insensitive.
pub(crate) fn compile_pattern(pattern: &str) -> Result<Regex> {
    Ok(RegexBuilder::new(pattern).case_insensitive(true).build()?)
}

/// Compile a literal keyword or merchant name into a whole-word matcher.
///
/// Word boundaries are only required on sides where the term starts or ends
/// with a letter or digit, so "disney+" and "pg&e" still match.
pub(crate) fn compile_term(term: &str) -> Result<Regex> {
    let starts_word = term.chars().next().is_some_and(char::is_alphanumeric);
    let ends_word = term.chars().last().is_some_and(char::is_alphanumeric);

    let mut pattern = String::new();
    if starts_word {
        pattern.push_str(r"\b");
    }
    pattern.push_str(&regex::escape(term));
    if ends_word {
        pattern.push_str(r"\b");
    }
    compile_pattern(&pattern)
}

/// One category's matching rules
#[derive(Debug, Clone)]
pub struct CategoryRule {
    pub category: BillCategory,
    /// Lowercase whole-word terms
    pub keywords: Vec<String>,
    pub patterns: Vec<Regex>,
    /// Canonical merchant names, in priority order
    pub merchants: Vec<String>,
    /// Added when any keyword or pattern hits
    pub keyword_weight: u32,
    /// Added on top when a merchant name hits
    pub merchant_weight: u32,
    keyword_terms: Vec<Regex>,
    /// Parallel to `merchants`
    merchant_terms: Vec<Regex>,
}

impl CategoryRule {
    pub fn new(category: BillCategory) -> Self {
        Self {
            category,
            keywords: Vec::new(),
            patterns: Vec::new(),
            merchants: Vec::new(),
            keyword_weight: DEFAULT_KEYWORD_WEIGHT,
            merchant_weight: DEFAULT_MERCHANT_WEIGHT,
            keyword_terms: Vec::new(),
            merchant_terms: Vec::new(),
        }
    }

    /// Add keywords. Blank entries are ignored.
    pub fn with_keywords<I, S>(mut self, keywords: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for keyword in keywords {
            let keyword = keyword.as_ref().trim().to_lowercase();
            if keyword.is_empty() {
                continue;
            }
            self.keyword_terms.push(compile_term(&keyword)?);
            self.keywords.push(keyword);
        }
        Ok(self)
    }

    pub fn with_patterns<I, S>(mut self, patterns: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for pattern in patterns {
            self.patterns.push(compile_pattern(pattern.as_ref())?);
        }
        Ok(self)
    }

    /// Add canonical merchant names. Blank entries are ignored.
    pub fn with_merchants<I, S>(mut self, merchants: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for merchant in merchants {
            let merchant: String = merchant.into();
            let trimmed = merchant.trim();
            if trimmed.is_empty() {
                continue;
            }
            self.merchant_terms.push(compile_term(trimmed)?);
            self.merchants.push(trimmed.to_string());
        }
        Ok(self)
    }

    /// True if any keyword or pattern occurs in `text`
    pub fn keyword_or_pattern_hit(&self, text: &str) -> bool {
        self.keyword_terms.iter().any(|t| t.is_match(text))
            || self.patterns.iter().any(|p| p.is_match(text))
    }

    /// First canonical merchant name that occurs in `text` as a whole word
    pub fn merchant_hit(&self, text: &str) -> Option<&str> {
        self.merchants
            .iter()
            .zip(&self.merchant_terms)
            .find(|(_, term)| term.is_match(text))
            .map(|(name, _)| name.as_str())
    }
}

/// Result of resolving a category against some text
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryHit<'a> {
    pub category: BillCategory,
    /// Canonical merchant name, if one was named explicitly
    pub merchant: Option<&'a str>,
    /// Confidence contribution of this hit
    pub score: u32,
}

/// Ordered due-date extraction pattern
#[derive(Debug, Clone)]
pub struct DueDatePattern {
    /// Capture group 1 holds the date text
    pub regex: Regex,
    /// chrono formats tried in order against the capture
    pub formats: Vec<String>,
}

/// Tables and weights used by the email classifier
#[derive(Debug, Clone)]
pub struct EmailRules {
    pub subject_patterns: Vec<Regex>,
    pub subject_weight: u32,
    pub subject_cap: u32,
    pub sender_patterns: Vec<Regex>,
    pub sender_weight: u32,
    pub sender_cap: u32,
    /// Capture group 1 holds the numeric amount
    pub amount_pattern: Option<Regex>,
    pub amount_weight: u32,
    pub due_date_patterns: Vec<DueDatePattern>,
    pub due_date_weight: u32,
    /// Letters-only lowercase local-parts that are not merchant names
    pub role_mailboxes: Vec<String>,
}

impl EmailRules {
    /// Email rules with no patterns and the standard weights
    pub fn empty() -> Self {
        Self {
            subject_patterns: Vec::new(),
            subject_weight: 20,
            subject_cap: 40,
            sender_patterns: Vec::new(),
            sender_weight: 15,
            sender_cap: 30,
            amount_pattern: None,
            amount_weight: 20,
            due_date_patterns: Vec::new(),
            due_date_weight: 15,
            role_mailboxes: Vec::new(),
        }
    }
}

/// The complete, immutable rule configuration
#[derive(Debug, Clone)]
pub struct RuleSet {
    pub email: EmailRules,
    /// Declaration order decides ties
    pub categories: Vec<CategoryRule>,
}

impl RuleSet {
    /// A rule set that matches nothing
    pub fn empty() -> Self {
        Self {
            email: EmailRules::empty(),
            categories: Vec::new(),
        }
    }

    /// Build a rule set from TOML, filling gaps from the embedded defaults
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(config::parse_config(content)?.rules)
    }

    /// Load rules from an override file, the user config dir, or the
    /// embedded defaults, in that order
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Ok(config::load_config(path)?.rules)
    }

    /// Shared instance of the embedded default rules
    pub fn builtin() -> &'static RuleSet {
        static BUILTIN: OnceLock<RuleSet> = OnceLock::new();
        BUILTIN.get_or_init(|| match config::parse_config("") {
            Ok(config) => config.rules,
            Err(e) => {
                warn!("Embedded bill rules failed to load, using empty rules: {}", e);
                RuleSet::empty()
            }
        })
    }

    /// Resolve the first category whose rules hit the given text.
    ///
    /// Keywords and merchant names match case-insensitively on word
    /// boundaries. A keyword or pattern hit scores the rule's keyword
    /// weight, and a merchant-name hit adds the merchant weight on top.
    pub fn resolve_category(&self, text: &str) -> Option<CategoryHit<'_>> {
        for rule in &self.categories {
            let keyword_hit = rule.keyword_or_pattern_hit(text);
            let merchant = rule.merchant_hit(text);

            if !keyword_hit && merchant.is_none() {
                continue;
            }

            let mut score = 0;
            if keyword_hit {
                score += rule.keyword_weight;
            }
            if merchant.is_some() {
                score += rule.merchant_weight;
            }

            debug!(
                "Category {} matched (merchant: {:?}, score: {})",
                rule.category, merchant, score
            );
            return Some(CategoryHit {
                category: rule.category,
                merchant,
                score,
            });
        }

        None
    }

    /// Category of a normalized merchant name, if any rule knows it
    pub fn categorize_merchant(&self, merchant: &str) -> Option<BillCategory> {
        self.resolve_category(merchant).map(|hit| hit.category)
    }
}

impl Default for RuleSet {
    fn default() -> Self {
        Self::builtin().clone()
    }
}
