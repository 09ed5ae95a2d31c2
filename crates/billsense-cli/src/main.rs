//! Billsense CLI - Bill detection from emails and bank transactions
//!
//! Usage:
//!   billsense email --subject S --sender A --body TEXT   Classify one email
//!   billsense recurring --file tx.csv                    Find recurring bills
//!   billsense reconcile --emails e.json --transactions tx.csv
//!   billsense combine 80 90 --multiple-sources           Combine two scores

mod cli;
mod commands;


use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    // Logs go to stderr so --json output stays parseable
    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr)
                .compact(),
        )
        .init();

    let rules_path = cli.rules.as_deref();

    match cli.command {
        Commands::Email {
            subject,
            sender,
            body,
            body_file,
        } => {
            let config = commands::load_rules(rules_path)?;
            let body = commands::read_body(body, body_file.as_deref())?;
            commands::cmd_email(&config, &subject, &sender, &body, cli.json)
        }
        Commands::Emails { file } => {
            let config = commands::load_rules(rules_path)?;
            commands::cmd_emails(&config, &file, cli.json)
        }
        Commands::Recurring { file } => {
            let config = commands::load_rules(rules_path)?;
            commands::cmd_recurring(&config, &file, cli.json)
        }
        Commands::Reconcile {
            emails,
            transactions,
        } => {
            let config = commands::load_rules(rules_path)?;
            commands::cmd_reconcile(&config, &emails, &transactions, cli.json)
        }
        Commands::Combine {
            email,
            transaction,
            multiple_sources,
        } => commands::cmd_combine(email, transaction, multiple_sources, cli.json),
        Commands::Rules => {
            let config = commands::load_rules(rules_path)?;
            commands::cmd_rules(&config, cli.json)
        }
    }
}
