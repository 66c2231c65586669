//! Domain models for Owlin

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

// ========== Line Items ==========

/// OCR output sometimes carries `"description": null`
fn string_or_null<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// A line item parsed from an invoice
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LineItem {
    #[serde(default, deserialize_with = "string_or_null")]
    pub description: String,
    #[serde(default, alias = "qty")]
    pub quantity: Option<f64>,
    #[serde(default)]
    pub unit_price: Option<f64>,
    #[serde(default, alias = "total")]
    pub total_price: Option<f64>,
}

impl LineItem {
    pub fn new(description: impl Into<String>, quantity: Option<f64>) -> Self {
        Self {
            description: description.into(),
            quantity,
            ..Default::default()
        }
    }
}

fn default_line_confidence() -> f64 {
    1.0
}

/// A line item parsed from a delivery note
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryLineItem {
    #[serde(default, deserialize_with = "string_or_null")]
    pub description: String,
    #[serde(default, alias = "qty")]
    pub quantity: Option<f64>,
    /// Unit of measure ("case", "ea", ...)
    #[serde(default)]
    pub unit: Option<String>,
    /// OCR/parsing confidence (0.0-1.0)
    #[serde(default = "default_line_confidence")]
    pub confidence: f64,
}

impl DeliveryLineItem {
    pub fn new(description: impl Into<String>, quantity: Option<f64>) -> Self {
        Self {
            description: description.into(),
            quantity,
            unit: None,
            confidence: 1.0,
        }
    }
}

// ========== Extracted Documents ==========

/// Invoice as produced by the extraction layer, before storage
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct InvoiceDocument {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default, alias = "supplier_name")]
    pub supplier: Option<String>,
    #[serde(default, alias = "invoice_date")]
    pub date: Option<String>,
    #[serde(default, alias = "total")]
    pub total_amount: Option<f64>,
    #[serde(default, alias = "items")]
    pub line_items: Vec<LineItem>,
}

/// Delivery note as produced by the extraction layer, before storage
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DeliveryDocument {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default, alias = "supplier_name")]
    pub supplier: Option<String>,
    #[serde(default, alias = "delivery_date")]
    pub date: Option<String>,
    #[serde(default, alias = "total")]
    pub total_amount: Option<f64>,
    #[serde(default, alias = "items")]
    pub line_items: Vec<DeliveryLineItem>,
}

/// Which side of a pairing a document belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    Invoice,
    Delivery,
}

impl DocumentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Invoice => "invoice",
            Self::Delivery => "delivery",
        }
    }
}

impl std::str::FromStr for DocumentKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "invoice" | "inv" => Ok(Self::Invoice),
            "delivery" | "delivery_note" | "dn" => Ok(Self::Delivery),
            _ => Err(format!("Unknown document kind: {}", s)),
        }
    }
}

// ========== Stored Documents ==========

/// Invoice workflow status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum InvoiceStatus {
    /// Parsed and waiting for a delivery note
    #[default]
    Scanned,
    /// Paired with a confirmed delivery note
    Matched,
}

impl InvoiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Scanned => "scanned",
            Self::Matched => "matched",
        }
    }
}

impl std::str::FromStr for InvoiceStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "scanned" => Ok(Self::Scanned),
            "matched" => Ok(Self::Matched),
            _ => Err(format!("Unknown invoice status: {}", s)),
        }
    }
}

/// Delivery note workflow status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryNoteStatus {
    /// Parsed and waiting for an invoice
    #[default]
    Parsed,
    /// Paired with a confirmed invoice
    Matched,
}

impl DeliveryNoteStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Parsed => "parsed",
            Self::Matched => "matched",
        }
    }
}

impl std::str::FromStr for DeliveryNoteStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "parsed" => Ok(Self::Parsed),
            "matched" => Ok(Self::Matched),
            _ => Err(format!("Unknown delivery note status: {}", s)),
        }
    }
}

/// A stored invoice
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invoice {
    pub id: String,
    pub supplier_name: Option<String>,
    pub invoice_date: Option<String>,
    pub total_amount: Option<f64>,
    pub line_items: Vec<LineItem>,
    pub status: InvoiceStatus,
    /// SHA256 of the uploaded document, for deduplication
    pub content_hash: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Invoice {
    /// View this record as an extracted document for scoring
    pub fn to_document(&self) -> InvoiceDocument {
        InvoiceDocument {
            id: Some(self.id.clone()),
            supplier: self.supplier_name.clone(),
            date: self.invoice_date.clone(),
            total_amount: self.total_amount,
            line_items: self.line_items.clone(),
        }
    }
}

/// A stored delivery note
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryNote {
    pub id: String,
    pub supplier_name: Option<String>,
    pub delivery_date: Option<String>,
    pub total_amount: Option<f64>,
    pub line_items: Vec<DeliveryLineItem>,
    pub status: DeliveryNoteStatus,
    pub content_hash: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl DeliveryNote {
    pub fn to_document(&self) -> DeliveryDocument {
        DeliveryDocument {
            id: Some(self.id.clone()),
            supplier: self.supplier_name.clone(),
            date: self.delivery_date.clone(),
            total_amount: self.total_amount,
            line_items: self.line_items.clone(),
        }
    }
}

// ========== Candidate Ranking ==========

/// Per-factor contribution to a 0-100 pairing confidence
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ConfidenceBreakdown {
    /// Supplier match (0-40)
    pub supplier: f64,
    /// Date proximity (0-25)
    pub date: f64,
    /// Line item overlap (0-30)
    pub line_items: f64,
    /// Total value agreement (0-5)
    pub value: f64,
}

impl ConfidenceBreakdown {
    pub fn total(&self) -> f64 {
        self.supplier + self.date + self.line_items + self.value
    }
}

/// Confidence band for a 0-100 pairing score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceBand {
    /// Eligible for auto-pairing
    High,
    /// Surfaced as a suggestion
    Medium,
    /// Not surfaced by default
    Low,
}

impl ConfidenceBand {
    pub fn from_score(score: f64, high: f64, medium: f64) -> Self {
        if score >= high {
            Self::High
        } else if score >= medium {
            Self::Medium
        } else {
            Self::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }
}

impl std::fmt::Display for ConfidenceBand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A delivery note ranked against an invoice
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchCandidate {
    pub delivery_note_id: String,
    /// Overall confidence (0-100)
    pub confidence: f64,
    pub breakdown: ConfidenceBreakdown,
    /// The delivery note data the score was computed from
    pub delivery_note: DeliveryNote,
}

// ========== Pairing Records ==========

/// Status of an invoice/delivery-note pairing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PairStatus {
    #[default]
    Pending,
    Confirmed,
    Rejected,
}

impl PairStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Rejected => "rejected",
        }
    }
}

impl std::str::FromStr for PairStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "confirmed" => Ok(Self::Confirmed),
            "rejected" => Ok(Self::Rejected),
            _ => Err(format!("Unknown pair status: {}", s)),
        }
    }
}

impl std::fmt::Display for PairStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A persisted invoice/delivery-note pairing (never deleted)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvoiceDeliveryPair {
    pub id: i64,
    pub invoice_id: String,
    pub delivery_note_id: String,
    pub confidence_score: f64,
    pub breakdown: ConfidenceBreakdown,
    pub status: PairStatus,
    pub confirmed_by: Option<String>,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Append-only record of a pairing decision
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchHistoryEntry {
    pub id: i64,
    pub invoice_id: String,
    pub delivery_note_id: String,
    pub action: PairStatus,
    /// Score snapshot at the time of the action
    pub confidence_score: f64,
    pub breakdown: ConfidenceBreakdown,
    pub actor_role: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Result of confirming a pairing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfirmOutcome {
    pub status: PairStatus,
    pub confidence: f64,
    pub pair_id: i64,
}

/// Result of rejecting a pairing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RejectOutcome {
    pub status: PairStatus,
    pub history_id: i64,
}

/// Result of an auto-pairing sweep over unmatched invoices
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RetryOutcome {
    pub invoices_checked: usize,
    pub new_matches_found: usize,
    /// (invoice_id, delivery_note_id) pairs confirmed by this sweep
    pub paired: Vec<(String, String)>,
    pub message: String,
}
