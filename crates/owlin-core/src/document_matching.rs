//! Document-level comparison of one invoice against one delivery note

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::Result;
use crate::item_matching::{match_items, MatchingResult};
use crate::models::{DeliveryDocument, InvoiceDocument};

const SUPPLIER_FACTOR: f64 = 0.4;
const DATE_FACTOR: f64 = 0.3;
const ITEMS_FACTOR: f64 = 0.3;

/// Header-level checks between the two documents
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentChecks {
    /// Case-insensitive supplier equality
    pub supplier_match: bool,
    /// Exact date-string equality (no parsing at this layer)
    pub date_match: bool,
    /// Weighted average of the contributing factors (0.0-1.0)
    pub overall_confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchSummary {
    pub total_invoice_items: usize,
    pub total_delivery_items: usize,
    /// Matched pairs over the longer side, as a percentage
    pub matched_percentage: f64,
    /// Pairs with a discrepancy over all pairs, as a percentage
    pub discrepancy_percentage: f64,
}

/// Full comparison report for an invoice/delivery-note pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentMatchReport {
    pub document_matching: DocumentChecks,
    pub item_matching: MatchingResult,
    pub summary: MatchSummary,
}

/// Compare an invoice with a delivery note
///
/// Line items go through [`match_items`] with normalization on. The document
/// confidence averages only the factors that contributed: a supplier or date
/// that does not match drops out of both numerator and denominator, while the
/// item factor always counts.
pub fn match_documents(
    invoice: &InvoiceDocument,
    delivery: &DeliveryDocument,
    threshold: f64,
) -> Result<DocumentMatchReport> {
    info!("Starting document-level matching");

    let item_matching = match_items(&invoice.line_items, &delivery.line_items, threshold, true)?;

    let supplier_match = invoice.supplier.as_deref().unwrap_or("").to_lowercase()
        == delivery.supplier.as_deref().unwrap_or("").to_lowercase();
    let date_match = invoice.date == delivery.date;

    let mut confidence = 0.0;
    let mut factors = 0u32;
    if supplier_match {
        confidence += SUPPLIER_FACTOR;
        factors += 1;
    }
    if date_match {
        confidence += DATE_FACTOR;
        factors += 1;
    }
    confidence += item_matching.overall_confidence * ITEMS_FACTOR;
    factors += 1;
    let overall_confidence = confidence / f64::from(factors);

    let total_invoice_items = invoice.line_items.len();
    let total_delivery_items = delivery.line_items.len();
    let longer_side = total_invoice_items.max(total_delivery_items);
    let matched_percentage = if longer_side > 0 {
        item_matching.total_matches as f64 / longer_side as f64 * 100.0
    } else {
        0.0
    };
    let discrepancy_percentage = if item_matching.total_matches > 0 {
        item_matching.total_discrepancies as f64 / item_matching.total_matches as f64 * 100.0
    } else {
        0.0
    };

    info!(
        "Document matching completed: {:.1}% matched, {:.1}% with discrepancies",
        matched_percentage, discrepancy_percentage
    );

    Ok(DocumentMatchReport {
        document_matching: DocumentChecks {
            supplier_match,
            date_match,
            overall_confidence,
        },
        item_matching,
        summary: MatchSummary {
            total_invoice_items,
            total_delivery_items,
            matched_percentage,
            discrepancy_percentage,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::models::{DeliveryLineItem, LineItem};

    fn invoice() -> InvoiceDocument {
        InvoiceDocument {
            id: Some("inv-1".into()),
            supplier: Some("Heineken UK".into()),
            date: Some("2025-01-15".into()),
            total_amount: Some(38000.0),
            line_items: vec![
                LineItem::new("Heineken Lager 24x330ml", Some(10.0)),
                LineItem::new("Corona Extra 24x330ml", Some(5.0)),
            ],
        }
    }

    fn delivery() -> DeliveryDocument {
        DeliveryDocument {
            id: Some("dn-1".into()),
            supplier: Some("heineken uk".into()),
            date: Some("2025-01-15".into()),
            total_amount: Some(38000.0),
            line_items: vec![
                DeliveryLineItem::new("Heineken Lager 24x330ml", Some(8.0)),
                DeliveryLineItem::new("Corona Extra 24x330ml", Some(5.0)),
            ],
        }
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_all_factors_match() {
        let report = match_documents(&invoice(), &delivery(), 0.8).unwrap();

        assert!(report.document_matching.supplier_match);
        assert!(report.document_matching.date_match);
        // (0.4 + 0.3 + 0.5 * 0.3) / 3
        assert!(approx(report.document_matching.overall_confidence, 0.85 / 3.0));

        assert_eq!(report.item_matching.total_matches, 2);
        assert_eq!(report.summary.total_invoice_items, 2);
        assert_eq!(report.summary.total_delivery_items, 2);
        assert_eq!(report.summary.matched_percentage, 100.0);
        assert_eq!(report.summary.discrepancy_percentage, 50.0);
    }

    #[test]
    fn test_header_mismatch_drops_factors() {
        let mut delivery = delivery();
        delivery.supplier = Some("Carlsberg UK".into());
        delivery.date = Some("2025-01-16".into());

        let report = match_documents(&invoice(), &delivery, 0.8).unwrap();

        assert!(!report.document_matching.supplier_match);
        assert!(!report.document_matching.date_match);
        assert!(approx(report.document_matching.overall_confidence, 0.15));
    }

    #[test]
    fn test_date_strings_not_normalized() {
        let mut delivery = delivery();
        delivery.date = Some("2025-01-15T00:00:00".into());

        let report = match_documents(&invoice(), &delivery, 0.8).unwrap();
        assert!(!report.document_matching.date_match);
    }

    #[test]
    fn test_missing_headers_compare_equal() {
        let mut invoice = invoice();
        let mut delivery = delivery();
        invoice.supplier = None;
        delivery.supplier = Some(String::new());
        invoice.date = None;
        delivery.date = None;

        let report = match_documents(&invoice, &delivery, 0.8).unwrap();
        assert!(report.document_matching.supplier_match);
        assert!(report.document_matching.date_match);
    }

    #[test]
    fn test_report_keeps_original_descriptions() {
        let mut invoice = invoice();
        invoice.line_items[0].description = "The Heineken Lager, 24x330ml".into();

        let report = match_documents(&invoice, &delivery(), 0.8).unwrap();

        let pair = &report.item_matching.matched_items[0];
        assert_eq!(pair.invoice_item.description, "The Heineken Lager, 24x330ml");
        assert_eq!(pair.compared_invoice_description, "heineken lager 24x330ml");
    }

    #[test]
    fn test_no_items() {
        let mut invoice = invoice();
        let mut delivery = delivery();
        invoice.line_items.clear();
        delivery.line_items.clear();

        let report = match_documents(&invoice, &delivery, 0.8).unwrap();

        assert_eq!(report.summary.matched_percentage, 0.0);
        assert_eq!(report.summary.discrepancy_percentage, 0.0);
        assert!(approx(report.document_matching.overall_confidence, 0.7 / 3.0));
    }

    #[test]
    fn test_report_serializes_sections() {
        let report = match_documents(&invoice(), &delivery(), 0.8).unwrap();
        let json = serde_json::to_value(&report).unwrap();

        assert!(json["document_matching"]["supplier_match"].as_bool().unwrap());
        assert_eq!(json["item_matching"]["total_matches"], 2);
        assert_eq!(json["summary"]["matched_percentage"], 100.0);
    }

    #[test]
    fn test_invalid_threshold() {
        let result = match_documents(&invoice(), &delivery(), 2.0);
        assert!(matches!(result, Err(Error::InvalidThreshold(_))));
    }
}
