//! CLI argument definitions using clap
//!
//! This module contains all the clap structs and enums for parsing CLI arguments.
//! The actual command implementations are in the `commands` module.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Owlin - Match supplier invoices against delivery notes
#[derive(Parser)]
#[command(name = "owlin")]
#[command(about = "Invoice and delivery-note matching for hospitality venues", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Database path
    #[arg(long, default_value = "owlin.db", global = true)]
    pub db: PathBuf,

    /// Matching config file (defaults to the data-dir override, then built-in values)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize the database
    Init,

    /// Store an extracted invoice or delivery note (JSON)
    Ingest {
        /// Document kind: invoice or delivery
        #[arg(short, long)]
        kind: String,

        /// JSON file produced by the extraction layer
        #[arg(short, long)]
        file: PathBuf,
    },

    /// List stored invoices
    Invoices {
        /// Filter by status: scanned, matched
        #[arg(short, long)]
        status: Option<String>,
    },

    /// List stored delivery notes
    Deliveries {
        /// Filter by status: parsed, matched
        #[arg(short, long)]
        status: Option<String>,
    },

    /// Compare an invoice file with a delivery-note file (no database writes)
    Compare {
        /// Invoice JSON file
        #[arg(long)]
        invoice: PathBuf,

        /// Delivery note JSON file
        #[arg(long)]
        delivery: PathBuf,

        /// Minimum item similarity (0.0-1.0, defaults to the configured value)
        #[arg(short, long)]
        threshold: Option<f64>,

        /// Print the full report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Rank delivery-note candidates for an invoice
    Candidates {
        /// Invoice ID
        invoice_id: String,

        /// Minimum confidence (0-100, defaults to the configured value)
        #[arg(long)]
        min_confidence: Option<f64>,

        /// Maximum number of candidates (defaults to the configured value)
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Confirm an invoice/delivery-note pairing
    Confirm {
        /// Invoice ID
        invoice_id: String,

        /// Delivery note ID
        delivery_note_id: String,

        /// Role recorded as the confirming actor
        #[arg(long, default_value = "user")]
        actor: String,
    },

    /// Reject an invoice/delivery-note pairing
    Reject {
        /// Invoice ID
        invoice_id: String,

        /// Delivery note ID
        delivery_note_id: String,

        /// Role recorded as the rejecting actor
        #[arg(long, default_value = "user")]
        actor: String,

        /// Reason for the rejection
        #[arg(long)]
        notes: Option<String>,
    },

    /// Auto-pair unmatched invoices with high-confidence delivery notes
    Retry,

    /// List pairing records
    Pairs {
        /// Filter by status: pending, confirmed, rejected
        #[arg(short, long)]
        status: Option<String>,
    },

    /// Show the rejection history
    History {
        /// Only show entries for this invoice
        #[arg(long)]
        invoice: Option<String>,
    },
}
