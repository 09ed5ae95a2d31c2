//! CLI argument definitions using clap
//!
//! This module contains all the clap structs and enums for parsing CLI arguments.
//! The actual command implementations are in the `commands` module.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Billsense - Detect bills in email and bank transactions
#[derive(Parser)]
#[command(name = "billsense")]
#[command(about = "Detect bills from emails and recurring bank charges", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Bill rules override file (TOML)
    ///
    /// Defaults to ~/.local/share/billsense/config/bill_rules.toml when it
    /// exists, otherwise the built-in rules.
    #[arg(long, global = true)]
    pub rules: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Classify a single email
    Email {
        /// Subject line
        #[arg(short, long, default_value = "")]
        subject: String,

        /// Sender address
        #[arg(long, default_value = "")]
        sender: String,

        /// Email body text
        #[arg(short, long, conflicts_with = "body_file", required_unless_present = "body_file")]
        body: Option<String>,

        /// Read the email body from a file
        #[arg(long)]
        body_file: Option<PathBuf>,
    },

    /// Classify a JSON array of emails
    Emails {
        /// JSON file with `subject`, `sender` (or `from`) and `body` fields
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Detect recurring bills in a transaction export
    Recurring {
        /// Transaction file (.csv or .json)
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Match email bills against recurring transaction patterns
    Reconcile {
        /// JSON file of emails
        #[arg(long)]
        emails: PathBuf,

        /// Transaction file (.csv or .json)
        #[arg(long)]
        transactions: PathBuf,
    },

    /// Combine an email score and a transaction score
    Combine {
        /// Email detector confidence (0-100)
        #[arg(value_parser = clap::value_parser!(u8).range(0..=100))]
        email: u8,

        /// Transaction detector confidence (0-100)
        #[arg(value_parser = clap::value_parser!(u8).range(0..=100))]
        transaction: u8,

        /// Both detectors saw the same bill
        #[arg(short, long)]
        multiple_sources: bool,
    },

    /// Show the active rule set
    Rules,
}
