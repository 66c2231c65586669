//! Test fixtures for owlin-core
//!
//! A Heineken UK invoice plus three delivery notes that score as an exact,
//! partial, and unrelated match against it.

use crate::db::Database;
use crate::ingest::content_hash;
use crate::models::{DeliveryDocument, DeliveryLineItem, InvoiceDocument, LineItem};

pub const SAMPLE_INVOICE_ID: &str = "INV-1001";
pub const EXACT_DELIVERY_ID: &str = "DN-2001";
pub const PARTIAL_DELIVERY_ID: &str = "DN-2002";
pub const UNRELATED_DELIVERY_ID: &str = "DN-2003";

fn invoice_line(description: &str, qty: f64, unit_price: f64) -> LineItem {
    LineItem {
        description: description.to_string(),
        quantity: Some(qty),
        unit_price: Some(unit_price),
        total_price: Some(qty * unit_price),
    }
}

/// Heineken UK, 2025-01-15, two lines totalling 38000
pub fn sample_invoice() -> InvoiceDocument {
    InvoiceDocument {
        id: Some(SAMPLE_INVOICE_ID.to_string()),
        supplier: Some("Heineken UK".to_string()),
        date: Some("2025-01-15".to_string()),
        total_amount: Some(38000.0),
        line_items: vec![
            invoice_line("Heineken Lager 24x330ml", 10.0, 2400.0),
            invoice_line("Corona Extra 24x330ml", 5.0, 2800.0),
        ],
    }
}

fn delivery(
    id: &str,
    supplier: &str,
    date: &str,
    total: f64,
    lines: &[(&str, f64)],
) -> DeliveryDocument {
    DeliveryDocument {
        id: Some(id.to_string()),
        supplier: Some(supplier.to_string()),
        date: Some(date.to_string()),
        total_amount: Some(total),
        line_items: lines
            .iter()
            .map(|(description, qty)| DeliveryLineItem::new(*description, Some(*qty)))
            .collect(),
    }
}

/// Same supplier (with "Ltd"), date, lines and total: scores 100
pub fn exact_delivery() -> DeliveryDocument {
    delivery(
        EXACT_DELIVERY_ID,
        "Heineken UK Ltd",
        "2025-01-15",
        38000.0,
        &[("Heineken Lager 24x330ml", 10.0), ("Corona Extra 24x330ml", 5.0)],
    )
}

/// One day late, one substituted line, lower total: scores 76.25
pub fn partial_delivery() -> DeliveryDocument {
    delivery(
        PARTIAL_DELIVERY_ID,
        "Heineken UK",
        "2025-01-16",
        35000.0,
        &[("Heineken Lager 24x330ml", 10.0), ("Budweiser 24x330ml", 5.0)],
    )
}

/// Different supplier, date, lines and total: scores 0
pub fn unrelated_delivery() -> DeliveryDocument {
    delivery(
        UNRELATED_DELIVERY_ID,
        "Carlsberg UK",
        "2025-01-20",
        31600.0,
        &[("Carlsberg Pilsner 24x330ml", 8.0), ("Stella Artois 24x330ml", 6.0)],
    )
}

/// Hash a fixture the way ingestion hashes uploaded bytes
pub fn fixture_hash<T: serde::Serialize>(document: &T) -> String {
    content_hash(&serde_json::to_vec(document).unwrap())
}

/// Store the sample invoice and all three delivery notes
pub fn seed_sample_data(db: &Database) {
    let invoice = sample_invoice();
    db.insert_invoice(&invoice, &fixture_hash(&invoice)).unwrap();
    for note in [exact_delivery(), partial_delivery(), unrelated_delivery()] {
        db.insert_delivery_note(&note, &fixture_hash(&note)).unwrap();
    }
}

/// Deterministic xorshift generator for property-style tests
pub struct XorShift(pub u64);

impl XorShift {
    pub fn next_u64(&mut self) -> u64 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.0 = x;
        x
    }

    /// Uniform-ish index in `0..n`
    pub fn below(&mut self, n: usize) -> usize {
        (self.next_u64() % n as u64) as usize
    }
}
