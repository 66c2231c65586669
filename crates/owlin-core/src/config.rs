//! Matching configuration
//!
//! Thresholds and ranking bands are loaded from TOML with a layered resolution:
//! 1. An explicit path (`--config`), which must exist
//! 2. The override in the data dir (~/.local/share/owlin/config/matching.toml)
//! 3. Embedded defaults (compiled into the binary)
//!
//! The factor maxima of the ranker (40/25/30/5) are not configurable.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use crate::error::{Error, Result};
use crate::item_matching::{DEFAULT_ITEM_THRESHOLD, DEFAULT_SUGGESTION_THRESHOLD};

/// Embedded default config (compiled into binary)
const DEFAULT_CONFIG: &str = include_str!("../../../config/matching.toml");

/// Tunable thresholds for matching and ranking
#[derive(Debug, Clone, PartialEq)]
pub struct MatchingConfig {
    /// Minimum item similarity for a pair (0.0-1.0)
    pub item_threshold: f64,
    /// Upper bound of the review-suggestion band (0.0-1.0)
    pub suggestion_threshold: f64,
    /// Auto-pairing band (0-100)
    pub high_confidence: f64,
    /// Suggestion band (0-100)
    pub medium_confidence: f64,
    pub min_confidence: f64,
    pub candidate_limit: usize,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            item_threshold: DEFAULT_ITEM_THRESHOLD,
            suggestion_threshold: DEFAULT_SUGGESTION_THRESHOLD,
            high_confidence: 80.0,
            medium_confidence: 60.0,
            min_confidence: 0.0,
            candidate_limit: 5,
        }
    }
}

impl MatchingConfig {
    /// Load configuration, preferring `path`, then the data-dir override
    ///
    /// A `path` that does not exist is an error rather than a silent fallback.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let source = match path {
            Some(path) if path.exists() => Some(path.to_path_buf()),
            Some(path) => {
                return Err(Error::Config(format!(
                    "Config file {} not found",
                    path.display()
                )));
            }
            None => default_config_path().filter(|p| p.exists()),
        };

        match source {
            Some(path) => {
                debug!("Loading matching config from {}", path.display());
                let content = fs::read_to_string(&path)
                    .map_err(|e| Error::Config(format!("Failed to read {}: {}", path.display(), e)))?;
                parse_config(&content)
            }
            None => parse_config(DEFAULT_CONFIG),
        }
    }

    fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("item_threshold", self.item_threshold),
            ("suggestion_threshold", self.suggestion_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(Error::Config(format!(
                    "{} must be between 0.0 and 1.0, got {}",
                    name, value
                )));
            }
        }
        for (name, value) in [
            ("high_confidence", self.high_confidence),
            ("medium_confidence", self.medium_confidence),
            ("min_confidence", self.min_confidence),
        ] {
            if !(0.0..=100.0).contains(&value) {
                return Err(Error::Config(format!(
                    "{} must be between 0 and 100, got {}",
                    name, value
                )));
            }
        }
        if self.medium_confidence > self.high_confidence {
            return Err(Error::Config(format!(
                "medium_confidence ({}) exceeds high_confidence ({})",
                self.medium_confidence, self.high_confidence
            )));
        }
        Ok(())
    }
}

/// Default config override path
pub fn default_config_path() -> Option<PathBuf> {
    dirs::data_local_dir().map(|d| d.join("owlin").join("config").join("matching.toml"))
}

/// Raw config structure for TOML parsing
#[derive(Debug, Deserialize)]
struct RawConfig {
    matching: Option<RawMatching>,
    ranking: Option<RawRanking>,
}

#[derive(Debug, Deserialize)]
struct RawMatching {
    item_threshold: Option<f64>,
    suggestion_threshold: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct RawRanking {
    high_confidence: Option<f64>,
    medium_confidence: Option<f64>,
    min_confidence: Option<f64>,
    candidate_limit: Option<usize>,
}

/// Parse config from TOML content
fn parse_config(content: &str) -> Result<MatchingConfig> {
    let raw: RawConfig = toml::from_str(content)
        .map_err(|e| Error::Config(format!("Invalid config TOML: {}", e)))?;

    let mut config = MatchingConfig::default();

    if let Some(matching) = raw.matching {
        if let Some(threshold) = matching.item_threshold {
            config.item_threshold = threshold;
        }
        if let Some(threshold) = matching.suggestion_threshold {
            config.suggestion_threshold = threshold;
        }
    }

    if let Some(ranking) = raw.ranking {
        if let Some(high) = ranking.high_confidence {
            config.high_confidence = high;
        }
        if let Some(medium) = ranking.medium_confidence {
            config.medium_confidence = medium;
        }
        if let Some(min) = ranking.min_confidence {
            config.min_confidence = min;
        }
        if let Some(limit) = ranking.candidate_limit {
            config.candidate_limit = limit;
        }
    }

    config.validate()?;
    Ok(config)
}
