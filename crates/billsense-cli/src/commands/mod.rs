//! CLI command implementations
//!
//! Commands are organized by domain:
//! - `core` - Shared utilities (rule loading, input files, JSON output)
//! - `email` - Email classification commands (email, emails)
//! - `recurring` - Recurring bill detection over transaction exports
//! - `reconcile` - Email/transaction reconciliation and score combination
//! - `rules` - Active rule set summary

pub mod core;
pub mod email;
pub mod reconcile;
pub mod recurring;
pub mod rules;

// Re-export command functions for main.rs
pub use core::*;
pub use email::*;
pub use reconcile::*;
pub use recurring::*;
pub use rules::*;

/// Truncate a string to a maximum length, adding "..." if truncated
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Format an optional amount as dollars, "?" if unknown
pub fn format_amount(amount: Option<f64>) -> String {
    amount
        .map(|a| format!("${:.2}", a.abs()))
        .unwrap_or_else(|| "?".to_string())
}
