//! Candidate ranking and pairing workflow

use std::collections::HashSet;

use rusqlite::{params, OptionalExtension};
use tracing::{debug, info};

use super::{parse_datetime, Database};
use crate::error::Result;
use crate::models::*;
use crate::scoring::calculate_confidence;

/// Actor recorded for pairings made by the auto-pairing sweep
pub const SYSTEM_ACTOR: &str = "system";

const PAIR_COLUMNS: &str = "id, invoice_id, delivery_note_id, confidence_score,
    breakdown_supplier, breakdown_date, breakdown_line_items, breakdown_value,
    status, confirmed_by, confirmed_at, created_at, updated_at";

const HISTORY_COLUMNS: &str = "id, invoice_id, delivery_note_id, action, confidence_score,
    breakdown_supplier, breakdown_date, breakdown_line_items, breakdown_value,
    actor_role, notes, created_at";

impl Database {
    /// Rank unmatched delivery notes as pairing candidates for an invoice
    ///
    /// Every delivery note not yet matched is scored; those at or above
    /// `min_confidence` are returned best first, at most `limit` of them. Ties
    /// keep the most recent delivery date first.
    pub fn find_candidates(
        &self,
        invoice_id: &str,
        min_confidence: f64,
        limit: usize,
    ) -> Result<Vec<MatchCandidate>> {
        let invoice = self.require_invoice(invoice_id)?.to_document();

        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, supplier_name, delivery_date, total_amount, line_items, status, content_hash, created_at
             FROM delivery_notes
             WHERE status != 'matched'
             ORDER BY delivery_date DESC, id",
        )?;
        let notes = stmt
            .query_map([], Self::row_to_delivery_note)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        let scanned = notes.len();

        let mut candidates: Vec<MatchCandidate> = notes
            .into_iter()
            .filter_map(|note| {
                let (confidence, breakdown) = calculate_confidence(&invoice, &note.to_document());
                (confidence >= min_confidence).then(|| MatchCandidate {
                    delivery_note_id: note.id.clone(),
                    confidence,
                    breakdown,
                    delivery_note: note,
                })
            })
            .collect();

        candidates.sort_by(|a, b| {
            b.confidence
                .partial_cmp(&a.confidence)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        candidates.truncate(limit);

        debug!(
            "Invoice {}: {} candidates from {} unmatched delivery notes",
            invoice_id,
            candidates.len(),
            scanned
        );
        Ok(candidates)
    }

    /// Confidence previously persisted for this exact pair, if any
    pub fn existing_confidence(
        &self,
        invoice_id: &str,
        delivery_note_id: &str,
    ) -> Result<Option<(f64, ConfidenceBreakdown)>> {
        Ok(self
            .get_pair(invoice_id, delivery_note_id)?
            .map(|pair| (pair.confidence_score, pair.breakdown)))
    }

    /// Score for a pair, reusing the persisted one so repeated actions don't drift
    fn pair_confidence(
        &self,
        invoice: &Invoice,
        note: &DeliveryNote,
    ) -> Result<(f64, ConfidenceBreakdown)> {
        match self.existing_confidence(&invoice.id, &note.id)? {
            Some(existing) => Ok(existing),
            None => Ok(calculate_confidence(
                &invoice.to_document(),
                &note.to_document(),
            )),
        }
    }

    /// Confirm an invoice/delivery-note pairing
    ///
    /// Upserts the pair as confirmed and flips both documents to matched in one
    /// transaction. Confirming the same pair again updates the existing row.
    pub fn confirm_match(
        &self,
        invoice_id: &str,
        delivery_note_id: &str,
        actor_role: &str,
    ) -> Result<ConfirmOutcome> {
        let invoice = self.require_invoice(invoice_id)?;
        let note = self.require_delivery_note(delivery_note_id)?;
        let (confidence, breakdown) = self.pair_confidence(&invoice, &note)?;

        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        tx.execute(
            "INSERT INTO invoice_delivery_pairs
                (invoice_id, delivery_note_id, confidence_score,
                 breakdown_supplier, breakdown_date, breakdown_line_items, breakdown_value,
                 status, confirmed_by, confirmed_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, 'confirmed', ?, CURRENT_TIMESTAMP)
             ON CONFLICT(invoice_id, delivery_note_id) DO UPDATE SET
                confidence_score = excluded.confidence_score,
                breakdown_supplier = excluded.breakdown_supplier,
                breakdown_date = excluded.breakdown_date,
                breakdown_line_items = excluded.breakdown_line_items,
                breakdown_value = excluded.breakdown_value,
                status = 'confirmed',
                confirmed_by = excluded.confirmed_by,
                confirmed_at = excluded.confirmed_at,
                updated_at = CURRENT_TIMESTAMP",
            params![
                invoice_id,
                delivery_note_id,
                confidence,
                breakdown.supplier,
                breakdown.date,
                breakdown.line_items,
                breakdown.value,
                actor_role,
            ],
        )?;

        let pair_id: i64 = tx.query_row(
            "SELECT id FROM invoice_delivery_pairs WHERE invoice_id = ? AND delivery_note_id = ?",
            params![invoice_id, delivery_note_id],
            |row| row.get(0),
        )?;

        tx.execute(
            "UPDATE invoices SET status = 'matched' WHERE id = ?",
            params![invoice_id],
        )?;
        tx.execute(
            "UPDATE delivery_notes SET status = 'matched' WHERE id = ?",
            params![delivery_note_id],
        )?;

        tx.commit()?;

        info!(
            "Confirmed {} <-> {} (confidence {:.1}, by {})",
            invoice_id, delivery_note_id, confidence, actor_role
        );
        Ok(ConfirmOutcome {
            status: PairStatus::Confirmed,
            confidence,
            pair_id,
        })
    }

    /// Reject an invoice/delivery-note pairing
    ///
    /// Records the pair as rejected and appends a history entry with the score
    /// snapshot. Document statuses are left alone.
    pub fn reject_match(
        &self,
        invoice_id: &str,
        delivery_note_id: &str,
        actor_role: &str,
        notes: Option<&str>,
    ) -> Result<RejectOutcome> {
        let invoice = self.require_invoice(invoice_id)?;
        let note = self.require_delivery_note(delivery_note_id)?;
        let (confidence, breakdown) = self.pair_confidence(&invoice, &note)?;

        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        tx.execute(
            "INSERT INTO invoice_delivery_pairs
                (invoice_id, delivery_note_id, confidence_score,
                 breakdown_supplier, breakdown_date, breakdown_line_items, breakdown_value,
                 status)
             VALUES (?, ?, ?, ?, ?, ?, ?, 'rejected')
             ON CONFLICT(invoice_id, delivery_note_id) DO UPDATE SET
                status = 'rejected',
                updated_at = CURRENT_TIMESTAMP",
            params![
                invoice_id,
                delivery_note_id,
                confidence,
                breakdown.supplier,
                breakdown.date,
                breakdown.line_items,
                breakdown.value,
            ],
        )?;

        tx.execute(
            "INSERT INTO matching_history
                (invoice_id, delivery_note_id, action, confidence_score,
                 breakdown_supplier, breakdown_date, breakdown_line_items, breakdown_value,
                 actor_role, notes)
             VALUES (?, ?, 'rejected', ?, ?, ?, ?, ?, ?, ?)",
            params![
                invoice_id,
                delivery_note_id,
                confidence,
                breakdown.supplier,
                breakdown.date,
                breakdown.line_items,
                breakdown.value,
                actor_role,
                notes,
            ],
        )?;
        let history_id = tx.last_insert_rowid();

        tx.commit()?;

        info!(
            "Rejected {} <-> {} (confidence {:.1}, by {})",
            invoice_id, delivery_note_id, confidence, actor_role
        );
        Ok(RejectOutcome {
            status: PairStatus::Rejected,
            history_id,
        })
    }

    /// Auto-pair invoices still waiting for a delivery note
    ///
    /// For each scanned invoice, the best candidate scoring at least
    /// `high_confidence` is confirmed as the system actor. Pairs a person has
    /// rejected are never picked. Running it again finds nothing new, since
    /// paired documents are no longer unmatched.
    pub fn retry_late_uploads(&self, high_confidence: f64) -> Result<RetryOutcome> {
        let invoices = self.list_invoices(Some(InvoiceStatus::Scanned))?;
        let mut outcome = RetryOutcome {
            invoices_checked: invoices.len(),
            ..Default::default()
        };

        for invoice in &invoices {
            let rejected = self.rejected_delivery_notes(&invoice.id)?;
            let candidates = self.find_candidates(&invoice.id, high_confidence, usize::MAX)?;

            let Some(best) = candidates
                .iter()
                .find(|c| !rejected.contains(&c.delivery_note_id))
            else {
                continue;
            };

            self.confirm_match(&invoice.id, &best.delivery_note_id, SYSTEM_ACTOR)?;
            outcome
                .paired
                .push((invoice.id.clone(), best.delivery_note_id.clone()));
        }

        outcome.new_matches_found = outcome.paired.len();
        outcome.message = format!(
            "Found {} new high-confidence matches",
            outcome.new_matches_found
        );
        info!(
            "Auto-pairing checked {} invoices: {}",
            outcome.invoices_checked, outcome.message
        );
        Ok(outcome)
    }

    /// Delivery notes a person has rejected for this invoice
    fn rejected_delivery_notes(&self, invoice_id: &str) -> Result<HashSet<String>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT delivery_note_id FROM invoice_delivery_pairs
             WHERE invoice_id = ? AND status = 'rejected'",
        )?;
        let ids = stmt
            .query_map(params![invoice_id], |row| row.get(0))?
            .collect::<std::result::Result<HashSet<String>, _>>()?;
        Ok(ids)
    }

    /// Get the pairing record for an exact pair
    pub fn get_pair(
        &self,
        invoice_id: &str,
        delivery_note_id: &str,
    ) -> Result<Option<InvoiceDeliveryPair>> {
        let conn = self.conn()?;
        let pair = conn
            .query_row(
                &format!(
                    "SELECT {} FROM invoice_delivery_pairs WHERE invoice_id = ? AND delivery_note_id = ?",
                    PAIR_COLUMNS
                ),
                params![invoice_id, delivery_note_id],
                Self::row_to_pair,
            )
            .optional()?;
        Ok(pair)
    }

    /// List pairing records, optionally filtered by status
    pub fn list_pairs(&self, status: Option<PairStatus>) -> Result<Vec<InvoiceDeliveryPair>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM invoice_delivery_pairs WHERE (?1 IS NULL OR status = ?1) ORDER BY id",
            PAIR_COLUMNS
        ))?;

        let pairs = stmt
            .query_map(params![status.map(|s| s.as_str())], Self::row_to_pair)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(pairs)
    }

    /// Matching history, oldest first, optionally for one invoice
    pub fn get_matching_history(&self, invoice_id: Option<&str>) -> Result<Vec<MatchHistoryEntry>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM matching_history WHERE (?1 IS NULL OR invoice_id = ?1) ORDER BY id",
            HISTORY_COLUMNS
        ))?;

        let entries = stmt
            .query_map(params![invoice_id], Self::row_to_history)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(entries)
    }

    fn row_to_pair(row: &rusqlite::Row) -> rusqlite::Result<InvoiceDeliveryPair> {
        let status_str: String = row.get(8)?;
        let confirmed_at_str: Option<String> = row.get(10)?;
        let created_at_str: String = row.get(11)?;
        let updated_at_str: String = row.get(12)?;

        Ok(InvoiceDeliveryPair {
            id: row.get(0)?,
            invoice_id: row.get(1)?,
            delivery_note_id: row.get(2)?,
            confidence_score: row.get(3)?,
            breakdown: ConfidenceBreakdown {
                supplier: row.get(4)?,
                date: row.get(5)?,
                line_items: row.get(6)?,
                value: row.get(7)?,
            },
            status: status_str.parse().unwrap_or_default(),
            confirmed_by: row.get(9)?,
            confirmed_at: confirmed_at_str.map(|s| parse_datetime(&s)),
            created_at: parse_datetime(&created_at_str),
            updated_at: parse_datetime(&updated_at_str),
        })
    }

    fn row_to_history(row: &rusqlite::Row) -> rusqlite::Result<MatchHistoryEntry> {
        let action_str: String = row.get(3)?;
        let created_at_str: String = row.get(11)?;

        Ok(MatchHistoryEntry {
            id: row.get(0)?,
            invoice_id: row.get(1)?,
            delivery_note_id: row.get(2)?,
            action: action_str.parse().unwrap_or_default(),
            confidence_score: row.get(4)?,
            breakdown: ConfidenceBreakdown {
                supplier: row.get(5)?,
                date: row.get(6)?,
                line_items: row.get(7)?,
                value: row.get(8)?,
            },
            actor_role: row.get(9)?,
            notes: row.get(10)?,
            created_at: parse_datetime(&created_at_str),
        })
    }
}
