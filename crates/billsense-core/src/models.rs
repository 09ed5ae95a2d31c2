//! Domain models for Billsense

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Bill categories recognized by the rule set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BillCategory {
    Utilities,
    Telecom,
    Insurance,
    Housing,
    Entertainment,
    Software,
    Fitness,
    Loans,
    Healthcare,
    Other,
}

impl BillCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Utilities => "utilities",
            Self::Telecom => "telecom",
            Self::Insurance => "insurance",
            Self::Housing => "housing",
            Self::Entertainment => "entertainment",
            Self::Software => "software",
            Self::Fitness => "fitness",
            Self::Loans => "loans",
            Self::Healthcare => "healthcare",
            Self::Other => "other",
        }
    }

    /// Get all categories
    pub fn all() -> &'static [BillCategory] {
        &[
            Self::Utilities,
            Self::Telecom,
            Self::Insurance,
            Self::Housing,
            Self::Entertainment,
            Self::Software,
            Self::Fitness,
            Self::Loans,
            Self::Healthcare,
            Self::Other,
        ]
    }
}

impl std::str::FromStr for BillCategory {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "utilities" | "utility" => Ok(Self::Utilities),
            "telecom" | "phone" | "internet" => Ok(Self::Telecom),
            "insurance" => Ok(Self::Insurance),
            "housing" | "rent" => Ok(Self::Housing),
            "entertainment" | "streaming" => Ok(Self::Entertainment),
            "software" | "subscriptions" => Ok(Self::Software),
            "fitness" => Ok(Self::Fitness),
            "loans" | "loan" => Ok(Self::Loans),
            "healthcare" | "medical" => Ok(Self::Healthcare),
            "other" => Ok(Self::Other),
            _ => Err(format!("Unknown bill category: {}", s)),
        }
    }
}

impl std::fmt::Display for BillCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Payment frequency of a recurring bill
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Weekly,
    Monthly,
    Quarterly,
    Yearly,
}

impl Frequency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
            Self::Quarterly => "quarterly",
            Self::Yearly => "yearly",
        }
    }

    /// Nominal number of days between payments
    pub fn nominal_days(&self) -> i64 {
        match self {
            Self::Weekly => 7,
            Self::Monthly => 30,
            Self::Quarterly => 90,
            Self::Yearly => 365,
        }
    }
}

impl std::str::FromStr for Frequency {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "weekly" => Ok(Self::Weekly),
            "monthly" => Ok(Self::Monthly),
            "quarterly" => Ok(Self::Quarterly),
            "yearly" | "annual" | "annually" => Ok(Self::Yearly),
            _ => Err(format!("Unknown frequency: {}", s)),
        }
    }
}

impl std::fmt::Display for Frequency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A raw email as handed over by an email integration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Email {
    #[serde(default)]
    pub subject: String,
    /// Sender address, e.g. "billing@comcast.net"
    #[serde(default, alias = "from")]
    pub sender: String,
    #[serde(default)]
    pub body: String,
}

impl Email {
    pub fn new(
        subject: impl Into<String>,
        sender: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            subject: subject.into(),
            sender: sender.into(),
            body: body.into(),
        }
    }
}

/// Tentative bill extracted from a single email
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailBillCandidate {
    /// Heuristic score in [0, 100]
    pub confidence: u8,
    pub amount: Option<f64>,
    pub due_date: Option<NaiveDate>,
    pub merchant: Option<String>,
    pub category: Option<BillCategory>,
    pub description: String,
}

/// A bank transaction as supplied by a bank integration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,
    pub date: NaiveDate,
    /// Signed amount (negative = money out for most bank exports)
    pub amount: f64,
    pub description: String,
    #[serde(default)]
    pub merchant: Option<String>,
    /// Bank-provided category, passed through untouched
    #[serde(default)]
    pub category: Option<String>,
}

/// A detected periodic payment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecurringPattern {
    /// Normalized merchant name (the grouping key)
    pub merchant: String,
    /// Observed amounts, ordered by date
    pub amounts: Vec<f64>,
    /// Observed dates, ascending
    pub dates: Vec<NaiveDate>,
    pub frequency: Frequency,
    /// Heuristic score in [0, 100]
    pub confidence: u8,
    pub next_predicted: Option<NaiveDate>,
    pub category: Option<BillCategory>,
}

impl RecurringPattern {
    pub fn occurrences(&self) -> usize {
        self.dates.len()
    }

    pub fn last_amount(&self) -> Option<f64> {
        self.amounts.last().copied()
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.dates.last().copied()
    }
}

/// A bill seen through both an email and a recurring transaction pattern
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BillMatch {
    pub candidate: EmailBillCandidate,
    pub pattern: RecurringPattern,
    /// Combined score from both sources
    pub confidence: u8,
}

/// Clamp an additive score into the [0, 100] confidence range
pub fn clamp_confidence(score: i64) -> u8 {
    score.clamp(0, 100) as u8
}
