//! CLI argument definitions using clap
//!
//! This module contains all the clap structs and enums for parsing CLI arguments.
//! The actual command implementations are in the `commands` module.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Finguard - Transaction fraud scoring
#[derive(Parser)]
#[command(name = "finguard")]
#[command(about = "Train and serve a transaction fraud classifier", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Config file (defaults to ~/.local/share/finguard/config.toml if present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Artifact directory (overrides the config file)
    #[arg(long, global = true)]
    pub artifacts_dir: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Train on labeled history and publish the scaler/model pair
    Train {
        /// CSV file with amount,category,transaction_type,is_fraud columns
        #[arg(long, conflicts_with = "db", required_unless_present = "db")]
        csv: Option<PathBuf>,

        /// SQLite database holding labeled transactions
        #[arg(long)]
        db: Option<PathBuf>,

        /// Table to read from the SQLite database
        #[arg(long, requires = "db")]
        table: Option<String>,

        /// Remove a training lock left behind by a crashed run
        #[arg(long)]
        break_lock: bool,
    },

    /// Score a single transaction
    Predict {
        /// Transaction amount
        #[arg(short, long, allow_hyphen_values = true)]
        amount: f64,

        /// Category: payment, purchase, withdrawal, transfer
        #[arg(short, long)]
        category: Option<String>,

        /// Transaction type: credit, debit
        #[arg(short = 't', long = "type")]
        transaction_type: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the state of the artifact directory
    Status,

    /// List the encoded feature columns
    Features,

    /// Flag a user for assistance and print recommendations
    Advise {
        /// Monthly income
        #[arg(long)]
        income: f64,

        /// Monthly expenses
        #[arg(long)]
        expenses: f64,

        /// Credit score
        #[arg(long)]
        credit_score: f64,

        /// Outstanding debts
        #[arg(long, default_value = "0")]
        debts: f64,

        /// Monthly investment
        #[arg(long, default_value = "0")]
        investment: f64,

        /// Amount of a transaction to score alongside the heuristic
        #[arg(long, allow_hyphen_values = true)]
        amount: Option<f64>,

        /// Category of that transaction
        #[arg(long, requires = "amount")]
        category: Option<String>,

        /// Type of that transaction
        #[arg(long = "type", requires = "amount")]
        transaction_type: Option<String>,
    },
}
