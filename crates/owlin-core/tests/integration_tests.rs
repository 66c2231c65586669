//! Integration tests for owlin-core
//!
//! These tests exercise the full ingest → rank → confirm → auto-pair workflow,
//! starting from the JSON the extraction layer produces.

use owlin_core::{
    content_hash,
    db::Database,
    match_documents,
    models::{ConfidenceBand, DeliveryNoteStatus, InvoiceStatus, PairStatus},
    parse_delivery_json, parse_invoice_json, suggest_matches, validate_matching_result,
    MatchingConfig,
};

const INVOICE_JSON: &str = r#"{
    "supplier_name": "Heineken UK",
    "invoice_date": "2025-01-15",
    "total_amount": 38000,
    "line_items": [
        {"description": "Heineken Lager 24x330ml", "qty": 10, "unit_price": 2400, "total": 24000},
        {"description": "Corona Extra 24x330ml", "qty": 5, "unit_price": 2800, "total": 14000}
    ]
}"#;

/// Arrives on time, complete, one case short on lager
const DELIVERY_JSON: &str = r#"{
    "supplier": "Heineken UK Ltd",
    "delivery_date": "2025-01-15",
    "total": 38000,
    "items": [
        {"description": "Heineken Lager 24x330ml", "qty": 9, "unit": "case", "confidence": 0.97},
        {"description": "Corona Extra 24x330ml", "qty": 5, "unit": "case", "confidence": 0.91}
    ]
}"#;

/// A later, unrelated delivery from another supplier
const OTHER_DELIVERY_JSON: &str = r#"{
    "supplier": "Carlsberg UK",
    "delivery_date": "2025-01-20",
    "total": 31600,
    "items": [
        {"description": "Carlsberg Pilsner 24x330ml", "qty": 8},
        {"description": "Stella Artois 24x330ml", "qty": 6}
    ]
}"#;

/// Ingest raw JSON the way the CLI does; returns the stored ID
fn ingest_invoice(db: &Database, json: &str) -> String {
    let document = parse_invoice_json(json.as_bytes()).expect("Failed to parse invoice");
    db.insert_invoice(&document, &content_hash(json.as_bytes()))
        .expect("Failed to store invoice")
}

fn ingest_delivery(db: &Database, json: &str) -> String {
    let document = parse_delivery_json(json.as_bytes()).expect("Failed to parse delivery note");
    db.insert_delivery_note(&document, &content_hash(json.as_bytes()))
        .expect("Failed to store delivery note")
}

// =============================================================================
// Database Integration Tests
// =============================================================================

#[test]
fn test_full_matching_workflow() {
    let db = Database::in_memory().expect("Failed to create in-memory database");
    let config = MatchingConfig::default();

    let invoice_id = ingest_invoice(&db, INVOICE_JSON);
    let delivery_id = ingest_delivery(&db, DELIVERY_JSON);
    let other_id = ingest_delivery(&db, OTHER_DELIVERY_JSON);

    assert!(invoice_id.starts_with("inv-"));
    assert!(delivery_id.starts_with("dn-"));

    // Rank candidates
    let candidates = db
        .find_candidates(&invoice_id, config.min_confidence, config.candidate_limit)
        .expect("Failed to rank candidates");
    assert_eq!(candidates.len(), 2);
    assert_eq!(candidates[0].delivery_note_id, delivery_id);
    assert!(candidates[0].confidence >= 95.0);
    assert_eq!(candidates[1].delivery_note_id, other_id);
    assert_eq!(candidates[1].confidence, 0.0);

    // Auto-pair late uploads
    let outcome = db
        .retry_late_uploads(config.high_confidence)
        .expect("Failed to auto-pair");
    assert_eq!(outcome.new_matches_found, 1);

    let invoice = db.get_invoice(&invoice_id).unwrap().unwrap();
    assert_eq!(invoice.status, InvoiceStatus::Matched);
    let delivery = db.get_delivery_note(&delivery_id).unwrap().unwrap();
    assert_eq!(delivery.status, DeliveryNoteStatus::Matched);
    let other = db.get_delivery_note(&other_id).unwrap().unwrap();
    assert_eq!(other.status, DeliveryNoteStatus::Parsed);

    let pairs = db.list_pairs(Some(PairStatus::Confirmed)).unwrap();
    assert_eq!(pairs.len(), 1);
    assert_eq!(pairs[0].confirmed_by.as_deref(), Some("system"));

    // Running again is a no-op
    let again = db.retry_late_uploads(config.high_confidence).unwrap();
    assert_eq!(again.new_matches_found, 0);
    assert_eq!(db.list_pairs(None).unwrap().len(), 1);
}

#[test]
fn test_reupload_is_deduplicated() {
    let db = Database::in_memory().expect("Failed to create in-memory database");

    let first = ingest_invoice(&db, INVOICE_JSON);
    let second = ingest_invoice(&db, INVOICE_JSON);

    assert_eq!(first, second);
    assert_eq!(db.list_invoices(None).unwrap().len(), 1);
}

#[test]
fn test_human_rejection_blocks_auto_pairing() {
    let db = Database::in_memory().expect("Failed to create in-memory database");
    let invoice_id = ingest_invoice(&db, INVOICE_JSON);
    let delivery_id = ingest_delivery(&db, DELIVERY_JSON);

    db.reject_match(&invoice_id, &delivery_id, "manager", Some("wrong site"))
        .expect("Failed to reject");
    let outcome = db.retry_late_uploads(80.0).unwrap();

    assert_eq!(outcome.new_matches_found, 0);
    let history = db.get_matching_history(Some(&invoice_id)).unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].notes.as_deref(), Some("wrong site"));
}

// =============================================================================
// Document Comparison Tests
// =============================================================================

#[test]
fn test_document_comparison_report() {
    let invoice = parse_invoice_json(INVOICE_JSON.as_bytes()).unwrap();
    let delivery = parse_delivery_json(DELIVERY_JSON.as_bytes()).unwrap();

    let report = match_documents(&invoice, &delivery, 0.8).expect("Failed to compare");

    // "Heineken UK" vs "Heineken UK Ltd" is not equal at this layer
    assert!(!report.document_matching.supplier_match);
    assert!(report.document_matching.date_match);
    assert_eq!(report.item_matching.total_matches, 2);
    assert_eq!(report.item_matching.total_discrepancies, 1);
    assert_eq!(report.summary.matched_percentage, 100.0);
    assert_eq!(report.summary.discrepancy_percentage, 50.0);

    let short = &report.item_matching.matched_items[0];
    assert!(short.quantity_mismatch);
    assert_eq!(short.quantity_difference, Some(1.0));

    let quality = validate_matching_result(&report.item_matching);
    assert_eq!(quality.coverage_rate, 1.0);
    assert!(quality
        .recommendations
        .iter()
        .any(|r| r.contains("discrepancy")));

    // The two cross pairings (lager vs corona) sit at exactly 0.5 similarity
    let suggestions = suggest_matches(&invoice.line_items, &delivery.line_items, 0.6).unwrap();
    assert_eq!(suggestions.len(), 2);
    assert!(suggestions
        .iter()
        .all(|s| s.confidence == ConfidenceBand::Medium));
}
