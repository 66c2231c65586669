//! Invoice and delivery-note storage

use rusqlite::{params, OptionalExtension};
use tracing::{debug, info, warn};

use super::{parse_datetime, Database};
use crate::error::{Error, Result};
use crate::ingest::{derive_document_id, validate_delivery, validate_invoice};
use crate::models::*;

const INVOICE_COLUMNS: &str =
    "id, supplier_name, invoice_date, total_amount, line_items, status, content_hash, created_at";

const DELIVERY_NOTE_COLUMNS: &str =
    "id, supplier_name, delivery_date, total_amount, line_items, status, content_hash, created_at";

/// Decode a stored line-item array; unreadable JSON degrades to no items
fn parse_line_items<T: serde::de::DeserializeOwned>(json: &str, owner: &str) -> Vec<T> {
    serde_json::from_str(json).unwrap_or_else(|e| {
        warn!("Ignoring unreadable line items on {}: {}", owner, e);
        Vec::new()
    })
}

impl Database {
    /// Store an extracted invoice
    ///
    /// Re-uploading the same document (same content hash) returns the existing
    /// invoice ID without writing. Invoices without an ID get one derived from
    /// the hash.
    pub fn insert_invoice(&self, document: &InvoiceDocument, content_hash: &str) -> Result<String> {
        validate_invoice(document)?;

        if let Some(existing) = self.get_invoice_by_hash(content_hash)? {
            debug!("Invoice already stored as {}", existing.id);
            return Ok(existing.id);
        }

        let id = document
            .id
            .clone()
            .unwrap_or_else(|| derive_document_id(DocumentKind::Invoice, content_hash));
        if self.get_invoice(&id)?.is_some() {
            return Err(Error::InvalidData(format!(
                "Invoice {} already exists with different content",
                id
            )));
        }

        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO invoices (id, supplier_name, invoice_date, total_amount, line_items, content_hash)
             VALUES (?, ?, ?, ?, ?, ?)",
            params![
                id,
                document.supplier,
                document.date,
                document.total_amount,
                serde_json::to_string(&document.line_items)?,
                content_hash,
            ],
        )?;

        info!(
            "Stored invoice {} ({} line items)",
            id,
            document.line_items.len()
        );
        Ok(id)
    }

    /// Store an extracted delivery note (idempotent on content hash)
    pub fn insert_delivery_note(
        &self,
        document: &DeliveryDocument,
        content_hash: &str,
    ) -> Result<String> {
        validate_delivery(document)?;

        if let Some(existing) = self.get_delivery_note_by_hash(content_hash)? {
            debug!("Delivery note already stored as {}", existing.id);
            return Ok(existing.id);
        }

        let id = document
            .id
            .clone()
            .unwrap_or_else(|| derive_document_id(DocumentKind::Delivery, content_hash));
        if self.get_delivery_note(&id)?.is_some() {
            return Err(Error::InvalidData(format!(
                "Delivery note {} already exists with different content",
                id
            )));
        }

        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO delivery_notes (id, supplier_name, delivery_date, total_amount, line_items, content_hash)
             VALUES (?, ?, ?, ?, ?, ?)",
            params![
                id,
                document.supplier,
                document.date,
                document.total_amount,
                serde_json::to_string(&document.line_items)?,
                content_hash,
            ],
        )?;

        info!(
            "Stored delivery note {} ({} line items)",
            id,
            document.line_items.len()
        );
        Ok(id)
    }

    /// Get invoice by ID
    pub fn get_invoice(&self, id: &str) -> Result<Option<Invoice>> {
        let conn = self.conn()?;
        let invoice = conn
            .query_row(
                &format!("SELECT {} FROM invoices WHERE id = ?", INVOICE_COLUMNS),
                params![id],
                Self::row_to_invoice,
            )
            .optional()?;
        Ok(invoice)
    }

    /// Get invoice by content hash (for deduplication)
    pub fn get_invoice_by_hash(&self, content_hash: &str) -> Result<Option<Invoice>> {
        let conn = self.conn()?;
        let invoice = conn
            .query_row(
                &format!("SELECT {} FROM invoices WHERE content_hash = ?", INVOICE_COLUMNS),
                params![content_hash],
                Self::row_to_invoice,
            )
            .optional()?;
        Ok(invoice)
    }

    /// List invoices, optionally filtered by status
    pub fn list_invoices(&self, status: Option<InvoiceStatus>) -> Result<Vec<Invoice>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM invoices WHERE (?1 IS NULL OR status = ?1) ORDER BY created_at, id",
            INVOICE_COLUMNS
        ))?;

        let invoices = stmt
            .query_map(params![status.map(|s| s.as_str())], Self::row_to_invoice)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(invoices)
    }

    /// Get delivery note by ID
    pub fn get_delivery_note(&self, id: &str) -> Result<Option<DeliveryNote>> {
        let conn = self.conn()?;
        let note = conn
            .query_row(
                &format!("SELECT {} FROM delivery_notes WHERE id = ?", DELIVERY_NOTE_COLUMNS),
                params![id],
                Self::row_to_delivery_note,
            )
            .optional()?;
        Ok(note)
    }

    /// Get delivery note by content hash (for deduplication)
    pub fn get_delivery_note_by_hash(&self, content_hash: &str) -> Result<Option<DeliveryNote>> {
        let conn = self.conn()?;
        let note = conn
            .query_row(
                &format!(
                    "SELECT {} FROM delivery_notes WHERE content_hash = ?",
                    DELIVERY_NOTE_COLUMNS
                ),
                params![content_hash],
                Self::row_to_delivery_note,
            )
            .optional()?;
        Ok(note)
    }

    /// List delivery notes, optionally filtered by status
    pub fn list_delivery_notes(&self, status: Option<DeliveryNoteStatus>) -> Result<Vec<DeliveryNote>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM delivery_notes WHERE (?1 IS NULL OR status = ?1) ORDER BY created_at, id",
            DELIVERY_NOTE_COLUMNS
        ))?;

        let notes = stmt
            .query_map(params![status.map(|s| s.as_str())], Self::row_to_delivery_note)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(notes)
    }

    /// Get an invoice or fail with `NotFound`
    pub(crate) fn require_invoice(&self, id: &str) -> Result<Invoice> {
        self.get_invoice(id)?
            .ok_or_else(|| Error::NotFound(format!("Invoice {} not found", id)))
    }

    /// Get a delivery note or fail with `NotFound`
    pub(crate) fn require_delivery_note(&self, id: &str) -> Result<DeliveryNote> {
        self.get_delivery_note(id)?
            .ok_or_else(|| Error::NotFound(format!("Delivery note {} not found", id)))
    }

    pub(crate) fn row_to_invoice(row: &rusqlite::Row) -> rusqlite::Result<Invoice> {
        let id: String = row.get(0)?;
        let line_items_json: String = row.get(4)?;
        let status_str: String = row.get(5)?;
        let created_at_str: String = row.get(7)?;

        Ok(Invoice {
            line_items: parse_line_items(&line_items_json, &id),
            id,
            supplier_name: row.get(1)?,
            invoice_date: row.get(2)?,
            total_amount: row.get(3)?,
            status: status_str.parse().unwrap_or_default(),
            content_hash: row.get(6)?,
            created_at: parse_datetime(&created_at_str),
        })
    }

    pub(crate) fn row_to_delivery_note(row: &rusqlite::Row) -> rusqlite::Result<DeliveryNote> {
        let id: String = row.get(0)?;
        let line_items_json: String = row.get(4)?;
        let status_str: String = row.get(5)?;
        let created_at_str: String = row.get(7)?;

        Ok(DeliveryNote {
            line_items: parse_line_items(&line_items_json, &id),
            id,
            supplier_name: row.get(1)?,
            delivery_date: row.get(2)?,
            total_amount: row.get(3)?,
            status: status_str.parse().unwrap_or_default(),
            content_hash: row.get(6)?,
            created_at: parse_datetime(&created_at_str),
        })
    }
}
