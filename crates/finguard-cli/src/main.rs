//! Finguard CLI - Transaction fraud scoring
//!
//! Usage:
//!   finguard train --csv history.csv     Train and publish a model
//!   finguard predict --amount 250        Score a transaction
//!   finguard status                      Show artifact state
//!   finguard advise --income ..          Assistance decision + advice

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

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    let config = commands::load_config(cli.config.as_deref(), cli.artifacts_dir.as_deref())?;

    match cli.command {
        Commands::Train {
            csv,
            db,
            table,
            break_lock,
        } => {
            let input = match (csv, db) {
                (Some(path), _) => commands::TrainInput::Csv(path),
                (None, Some(path)) => commands::TrainInput::Sqlite { path, table },
                (None, None) => anyhow::bail!("Pass --csv or --db"),
            };
            commands::cmd_train(&config, input, break_lock)
        }
        Commands::Predict {
            amount,
            category,
            transaction_type,
            json,
        } => commands::cmd_predict(
            &config,
            &commands::build_record(amount, category, transaction_type),
            json,
        ),
        Commands::Status => commands::cmd_status(&config),
        Commands::Features => commands::cmd_features(),
        Commands::Advise {
            income,
            expenses,
            credit_score,
            debts,
            investment,
            amount,
            category,
            transaction_type,
        } => {
            let snapshot = finguard_core::FinancialSnapshot {
                income,
                expenses,
                credit_score,
                debts,
                monthly_investment: investment,
            };
            let record =
                amount.map(|amount| commands::build_record(amount, category, transaction_type));
            commands::cmd_advise(&config, &snapshot, record.as_ref())
        }
    }
}
