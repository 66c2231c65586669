//! Document ingestion and listing commands

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use owlin_core::{
    content_hash,
    db::Database,
    models::{DeliveryNoteStatus, DocumentKind, InvoiceStatus},
    parse_delivery_json, parse_invoice_json,
};

use super::truncate;

/// Store an extracted invoice or delivery note, returning its ID
pub fn cmd_ingest(db: &Database, kind: &str, file: &Path) -> Result<String> {
    let kind: DocumentKind = kind.parse().map_err(|e: String| anyhow!(e))?;
    let bytes = std::fs::read(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let hash = content_hash(&bytes);

    let id = match kind {
        DocumentKind::Invoice => {
            let document = parse_invoice_json(&bytes)?;
            let items = document.line_items.len();
            let id = db.insert_invoice(&document, &hash)?;
            println!("📄 Stored invoice {} ({} line items)", id, items);
            id
        }
        DocumentKind::Delivery => {
            let document = parse_delivery_json(&bytes)?;
            let items = document.line_items.len();
            let id = db.insert_delivery_note(&document, &hash)?;
            println!("🚚 Stored delivery note {} ({} line items)", id, items);
            id
        }
    };

    Ok(id)
}

fn fmt_amount(amount: Option<f64>) -> String {
    amount
        .map(|a| format!("{:.2}", a))
        .unwrap_or_else(|| "?".to_string())
}

pub fn cmd_invoices(db: &Database, status: Option<&str>) -> Result<()> {
    let status: Option<InvoiceStatus> = status
        .map(|s| s.parse().map_err(|e: String| anyhow!(e)))
        .transpose()?;
    let invoices = db.list_invoices(status)?;

    if invoices.is_empty() {
        println!("No invoices stored yet. Run:");
        println!("  owlin ingest --kind invoice --file invoice.json");
        return Ok(());
    }

    println!();
    println!("📄 Invoices");
    println!("   ─────────────────────────────────────────────────────────────");

    for invoice in invoices {
        let status_icon = match invoice.status {
            InvoiceStatus::Scanned => "⏳",
            InvoiceStatus::Matched => "✅",
        };

        println!(
            "   {} {:18} │ {:20} │ {:10} │ {:>10} │ {} items",
            status_icon,
            truncate(&invoice.id, 18),
            truncate(invoice.supplier_name.as_deref().unwrap_or("?"), 20),
            invoice.invoice_date.as_deref().unwrap_or("?"),
            fmt_amount(invoice.total_amount),
            invoice.line_items.len()
        );
    }

    Ok(())
}

pub fn cmd_deliveries(db: &Database, status: Option<&str>) -> Result<()> {
    let status: Option<DeliveryNoteStatus> = status
        .map(|s| s.parse().map_err(|e: String| anyhow!(e)))
        .transpose()?;
    let notes = db.list_delivery_notes(status)?;

    if notes.is_empty() {
        println!("No delivery notes stored yet. Run:");
        println!("  owlin ingest --kind delivery --file delivery.json");
        return Ok(());
    }

    println!();
    println!("🚚 Delivery Notes");
    println!("   ─────────────────────────────────────────────────────────────");

    for note in notes {
        let status_icon = match note.status {
            DeliveryNoteStatus::Parsed => "⏳",
            DeliveryNoteStatus::Matched => "✅",
        };

        println!(
            "   {} {:18} │ {:20} │ {:10} │ {:>10} │ {} items",
            status_icon,
            truncate(&note.id, 18),
            truncate(note.supplier_name.as_deref().unwrap_or("?"), 20),
            note.delivery_date.as_deref().unwrap_or("?"),
            fmt_amount(note.total_amount),
            note.line_items.len()
        );
    }

    Ok(())
}
