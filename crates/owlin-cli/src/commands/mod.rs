//! CLI command implementations
//!
//! Commands are organized by domain:
//! - `core` - Init and shared utilities (open_db, load_config)
//! - `documents` - Document ingestion and listing
//! - `matching` - Comparison, candidate ranking, confirm/reject, auto-pairing, history

pub mod core;
pub mod documents;
pub mod matching;

// Re-export command functions for main.rs
pub use core::*;
pub use documents::*;
pub use matching::*;

/// Truncate a string to a maximum length, adding "..." if truncated
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
