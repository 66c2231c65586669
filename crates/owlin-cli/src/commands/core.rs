//! Core command implementations and shared utilities
//!
//! This module contains:
//! - `open_db` - Shared utility to open the database
//! - `load_config` - Shared utility to resolve the matching config
//! - `cmd_init` - Initialize the database

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use owlin_core::{db::Database, MatchingConfig};
use tracing::debug;

/// Open the database at `db_path`, running migrations
pub fn open_db(db_path: &Path) -> Result<Database> {
    let path_str = db_path
        .to_str()
        .ok_or_else(|| anyhow!("Database path is not valid UTF-8: {}", db_path.display()))?;
    debug!("Opening database at {}", path_str);
    Database::new(path_str).context("Failed to open database")
}

/// Load the matching config from `--config`, the data-dir override, or defaults
pub fn load_config(path: Option<&Path>) -> Result<MatchingConfig> {
    let config = MatchingConfig::load(path).context("Failed to load matching config")?;
    debug!(
        "Matching config: item threshold {}, auto-pair at {}",
        config.item_threshold, config.high_confidence
    );
    Ok(config)
}

pub fn cmd_init(db_path: &Path) -> Result<()> {
    println!("🔧 Initializing database at {}...", db_path.display());

    open_db(db_path)?;

    println!("✅ Database initialized successfully!");
    println!();
    println!("Next steps:");
    println!("  1. Store documents: owlin ingest --kind invoice --file invoice.json");
    println!("  2. Pair them:       owlin retry");

    Ok(())
}
