//! Billsense Core Library
//!
//! Bill detection for a consumer bill-management app:
//! - Email bill classifier (subject/sender/body scoring and extraction)
//! - Recurring bill detection over bank transactions
//! - Confidence combination for bills seen through both sources
//! - Rule tables loaded from TOML, with embedded defaults
//! - CSV/JSON input adapters
//!
//! The detectors are pure functions over immutable rule tables. They never
//! fail and are safe to call from many threads at once.

pub mod config;
pub mod confidence;
pub mod email;
pub mod error;
pub mod import;
pub mod models;
pub mod normalize;
pub mod reconcile;
pub mod recurring;
pub mod rules;

pub use confidence::calculate_confidence_score;
pub use config::{load_config, Config};
pub use email::{detect_bill_from_email, EmailClassifier};
pub use error::{Error, Result};
pub use models::{
    BillCategory, BillMatch, Email, EmailBillCandidate, Frequency, RecurringPattern, Transaction,
};
pub use reconcile::reconcile;
pub use recurring::{detect_recurring_bills, FrequencyBucket, RecurrenceConfig, RecurrenceDetector};
pub use rules::{CategoryRule, RuleSet};
