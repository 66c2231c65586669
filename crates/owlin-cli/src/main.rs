//! Owlin CLI - Invoice and delivery-note matching
//!
//! Usage:
//!   owlin init                                   Initialize database
//!   owlin ingest --kind invoice --file inv.json  Store an extracted document
//!   owlin candidates INV-1001                    Rank delivery notes for an invoice
//!   owlin confirm INV-1001 DN-2001               Confirm a pairing
//!   owlin retry                                  Auto-pair late uploads

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

    match cli.command {
        Commands::Init => commands::cmd_init(&cli.db),
        Commands::Ingest { kind, file } => {
            let db = commands::open_db(&cli.db)?;
            commands::cmd_ingest(&db, &kind, &file).map(|_| ())
        }
        Commands::Invoices { status } => {
            let db = commands::open_db(&cli.db)?;
            commands::cmd_invoices(&db, status.as_deref())
        }
        Commands::Deliveries { status } => {
            let db = commands::open_db(&cli.db)?;
            commands::cmd_deliveries(&db, status.as_deref())
        }
        Commands::Compare {
            invoice,
            delivery,
            threshold,
            json,
        } => {
            let config = commands::load_config(cli.config.as_deref())?;
            commands::cmd_compare(&config, &invoice, &delivery, threshold, json)
        }
        Commands::Candidates {
            invoice_id,
            min_confidence,
            limit,
        } => {
            let config = commands::load_config(cli.config.as_deref())?;
            let db = commands::open_db(&cli.db)?;
            commands::cmd_candidates(&db, &config, &invoice_id, min_confidence, limit)
        }
        Commands::Confirm {
            invoice_id,
            delivery_note_id,
            actor,
        } => {
            let db = commands::open_db(&cli.db)?;
            commands::cmd_confirm(&db, &invoice_id, &delivery_note_id, &actor)
        }
        Commands::Reject {
            invoice_id,
            delivery_note_id,
            actor,
            notes,
        } => {
            let db = commands::open_db(&cli.db)?;
            commands::cmd_reject(
                &db,
                &invoice_id,
                &delivery_note_id,
                &actor,
                notes.as_deref(),
            )
        }
        Commands::Retry => {
            let config = commands::load_config(cli.config.as_deref())?;
            let db = commands::open_db(&cli.db)?;
            commands::cmd_retry(&db, &config)
        }
        Commands::Pairs { status } => {
            let db = commands::open_db(&cli.db)?;
            commands::cmd_pairs(&db, status.as_deref())
        }
        Commands::History { invoice } => {
            let db = commands::open_db(&cli.db)?;
            commands::cmd_history(&db, invoice.as_deref())
        }
    }
}
