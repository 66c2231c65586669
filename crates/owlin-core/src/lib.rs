//! Owlin Core Library
//!
//! Invoice and delivery-note matching for hospitality back offices:
//! - Similarity scoring of OCR'd descriptions and supplier names
//! - Greedy line-item matching with quantity discrepancy detection
//! - Document-level comparison reports
//! - Confidence-weighted ranking of candidate delivery notes (0-100)
//! - Persistence of pairings, rejections and auto-pairing of late uploads

pub mod config;
pub mod db;
pub mod document_matching;
pub mod error;
pub mod ingest;
pub mod item_matching;
pub mod models;
pub mod scoring;
pub mod similarity;

/// Shared fixtures for tests
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use config::MatchingConfig;
pub use db::Database;
pub use document_matching::{match_documents, DocumentChecks, DocumentMatchReport, MatchSummary};
pub use error::{Error, Result};
pub use ingest::{content_hash, parse_delivery_json, parse_invoice_json};
pub use item_matching::{
    match_items, suggest_matches, validate_matching_result, MatchQuality, MatchSuggestion,
    MatchedItem, MatchingResult,
};
pub use scoring::calculate_confidence;
pub use similarity::similarity;
