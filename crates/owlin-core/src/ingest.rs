//! Parsing and validation of extracted documents
//!
//! The extraction layer emits JSON with loosely named fields; serde aliases on
//! the models absorb the naming differences and this module rejects values the
//! matchers cannot use (non-finite numbers, out-of-range confidences).

use sha2::{Digest, Sha256};

use crate::error::{Error, Result};
use crate::models::{DeliveryDocument, DocumentKind, InvoiceDocument};

/// Hex characters of the content hash used in derived document IDs
const DERIVED_ID_HASH_LEN: usize = 12;

/// SHA-256 hex digest of raw document bytes
pub fn content_hash(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Document ID for producers that did not supply one ("inv-1a2b3c4d5e6f")
pub fn derive_document_id(kind: DocumentKind, hash: &str) -> String {
    let prefix = match kind {
        DocumentKind::Invoice => "inv",
        DocumentKind::Delivery => "dn",
    };
    let short = hash.get(..DERIVED_ID_HASH_LEN).unwrap_or(hash);
    format!("{}-{}", prefix, short)
}

fn check_finite(value: Option<f64>, field: &str, context: &str) -> Result<()> {
    match value {
        Some(v) if !v.is_finite() => Err(Error::InvalidData(format!(
            "{}: {} is not a finite number",
            context, field
        ))),
        _ => Ok(()),
    }
}

/// Parse an invoice produced by the extraction layer
pub fn parse_invoice_json(bytes: &[u8]) -> Result<InvoiceDocument> {
    let document: InvoiceDocument = serde_json::from_slice(bytes)?;
    validate_invoice(&document)?;
    Ok(document)
}

/// Parse a delivery note produced by the extraction layer
pub fn parse_delivery_json(bytes: &[u8]) -> Result<DeliveryDocument> {
    let document: DeliveryDocument = serde_json::from_slice(bytes)?;
    validate_delivery(&document)?;
    Ok(document)
}

pub fn validate_invoice(document: &InvoiceDocument) -> Result<()> {
    check_finite(document.total_amount, "total_amount", "invoice")?;
    for (index, item) in document.line_items.iter().enumerate() {
        let context = format!("invoice line item {}", index);
        check_finite(item.quantity, "quantity", &context)?;
        check_finite(item.unit_price, "unit_price", &context)?;
        check_finite(item.total_price, "total_price", &context)?;
    }
    Ok(())
}

pub fn validate_delivery(document: &DeliveryDocument) -> Result<()> {
    check_finite(document.total_amount, "total_amount", "delivery note")?;
    for (index, item) in document.line_items.iter().enumerate() {
        let context = format!("delivery line item {}", index);
        check_finite(item.quantity, "quantity", &context)?;
        if !(0.0..=1.0).contains(&item.confidence) {
            return Err(Error::InvalidData(format!(
                "{}: confidence {} is outside 0.0-1.0",
                context, item.confidence
            )));
        }
    }
    Ok(())
}
