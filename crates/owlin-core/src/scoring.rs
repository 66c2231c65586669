//! Confidence-weighted scoring of an invoice against a candidate delivery note
//!
//! Four independent factors, each pre-weighted by its maximum, sum to a 0-100
//! score. Missing or malformed data scores zero for its factor; nothing here
//! returns an error.

use chrono::NaiveDate;

use crate::models::{ConfidenceBreakdown, DeliveryDocument, DeliveryLineItem, InvoiceDocument, LineItem};
use crate::similarity::{normalize_supplier_name, similarity};

/// Maximum points for the supplier factor
pub const SUPPLIER_WEIGHT: f64 = 40.0;
/// Maximum points for the date factor
pub const DATE_WEIGHT: f64 = 25.0;
/// Maximum points for the line-item factor
pub const LINE_ITEMS_WEIGHT: f64 = 30.0;
/// Maximum points for the total-value factor
pub const VALUE_WEIGHT: f64 = 5.0;

/// Minimum description similarity for a line to count toward the line-item factor
const LINE_ITEM_THRESHOLD: f64 = 0.7;

/// Supplier match score (0-40)
///
/// Exact match after suffix normalization earns full credit. Note the partial
/// bands: similarity >= 0.8 earns 20 but 0.6..0.8 earns 30. The closer match
/// scores lower; existing rankings depend on this, so it is kept as is.
pub fn supplier_score(invoice_supplier: Option<&str>, delivery_supplier: Option<&str>) -> f64 {
    let (Some(inv), Some(del)) = (invoice_supplier, delivery_supplier) else {
        return 0.0;
    };
    if inv.is_empty() || del.is_empty() {
        return 0.0;
    }

    let inv_norm = normalize_supplier_name(inv);
    let del_norm = normalize_supplier_name(del);
    if inv_norm == del_norm {
        return SUPPLIER_WEIGHT;
    }

    let ratio = similarity(&inv_norm, &del_norm);
    if ratio >= 0.8 {
        SUPPLIER_WEIGHT * 0.5
    } else if ratio >= 0.6 {
        SUPPLIER_WEIGHT * 0.75
    } else {
        0.0
    }
}

/// Parse the calendar date of an ISO date or timestamp ("2025-01-15T09:30:00")
fn parse_document_date(value: &str) -> Option<NaiveDate> {
    let date_part = value.trim().split(['T', ' ']).next()?;
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()
}

/// Date proximity score (0-25)
pub fn date_score(invoice_date: Option<&str>, delivery_date: Option<&str>) -> f64 {
    let (Some(inv), Some(del)) = (
        invoice_date.and_then(parse_document_date),
        delivery_date.and_then(parse_document_date),
    ) else {
        return 0.0;
    };

    match (inv - del).num_days().abs() {
        0 => DATE_WEIGHT,
        1 => DATE_WEIGHT * 0.8,
        2..=3 => DATE_WEIGHT * 0.4,
        _ => 0.0,
    }
}

/// Line-item overlap score (0-30)
///
/// Greedy like the item matcher, but with a fixed 0.7 bar and no punctuation
/// normalization. Scaled by the longer side so extra lines on either document
/// cost points.
pub fn line_items_score(invoice_items: &[LineItem], delivery_items: &[DeliveryLineItem]) -> f64 {
    if invoice_items.is_empty() || delivery_items.is_empty() {
        return 0.0;
    }

    let mut used = vec![false; delivery_items.len()];
    let mut matches = 0usize;

    for inv_item in invoice_items {
        let inv_desc = inv_item.description.trim();
        if inv_desc.is_empty() {
            continue;
        }

        let mut best_score = 0.0;
        let mut best_index = None;
        for (index, del_item) in delivery_items.iter().enumerate() {
            if used[index] {
                continue;
            }
            let del_desc = del_item.description.trim();
            if del_desc.is_empty() {
                continue;
            }
            let score = similarity(inv_desc, del_desc);
            if score > best_score && score >= LINE_ITEM_THRESHOLD {
                best_score = score;
                best_index = Some(index);
            }
        }

        if let Some(index) = best_index {
            used[index] = true;
            matches += 1;
        }
    }

    let total_items = invoice_items.len().max(delivery_items.len());
    LINE_ITEMS_WEIGHT * matches as f64 / total_items as f64
}

/// Total value agreement score (0-5)
pub fn value_score(invoice_total: Option<f64>, delivery_total: Option<f64>) -> f64 {
    let inv = invoice_total.unwrap_or(0.0);
    let del = delivery_total.unwrap_or(0.0);
    // Also rejects NaN
    if !(inv > 0.0 && del > 0.0) {
        return 0.0;
    }

    let diff = (inv - del).abs() / inv.max(del);
    if diff <= 0.02 {
        VALUE_WEIGHT
    } else if diff <= 0.05 {
        VALUE_WEIGHT * 0.5
    } else if diff <= 0.10 {
        VALUE_WEIGHT * 0.25
    } else {
        0.0
    }
}

/// Score a delivery note as a pairing candidate for an invoice
///
/// Returns the 0-100 total and its per-factor breakdown.
pub fn calculate_confidence(
    invoice: &InvoiceDocument,
    delivery: &DeliveryDocument,
) -> (f64, ConfidenceBreakdown) {
    let breakdown = ConfidenceBreakdown {
        supplier: supplier_score(invoice.supplier.as_deref(), delivery.supplier.as_deref()),
        date: date_score(invoice.date.as_deref(), delivery.date.as_deref()),
        line_items: line_items_score(&invoice.line_items, &delivery.line_items),
        value: value_score(invoice.total_amount, delivery.total_amount),
    };
    (breakdown.total(), breakdown)
}
