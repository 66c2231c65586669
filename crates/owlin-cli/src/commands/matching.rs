//! Matching command implementations
//!
//! - `compare` runs the document comparison on two JSON files without storing them
//! - `candidates`, `confirm`, `reject` drive the pairing workflow
//! - `retry` auto-pairs late uploads
//! - `pairs`, `history` inspect what has been decided

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use owlin_core::{
    db::Database,
    match_documents,
    models::{ConfidenceBand, ConfidenceBreakdown, PairStatus},
    parse_delivery_json, parse_invoice_json, suggest_matches, validate_matching_result,
    MatchingConfig,
};

use super::truncate;

fn band_icon(band: ConfidenceBand) -> &'static str {
    match band {
        ConfidenceBand::High => "🟢",
        ConfidenceBand::Medium => "🟡",
        ConfidenceBand::Low => "🔴",
    }
}

fn fmt_breakdown(breakdown: &ConfidenceBreakdown) -> String {
    format!(
        "supplier {:.0} · date {:.0} · items {:.2} · value {:.2}",
        breakdown.supplier, breakdown.date, breakdown.line_items, breakdown.value
    )
}

fn fmt_quantity(quantity: Option<f64>) -> String {
    quantity
        .map(|q| format!("{}", q))
        .unwrap_or_else(|| "?".to_string())
}

pub fn cmd_compare(
    config: &MatchingConfig,
    invoice_path: &Path,
    delivery_path: &Path,
    threshold: Option<f64>,
    json: bool,
) -> Result<()> {
    let invoice_bytes = std::fs::read(invoice_path)
        .with_context(|| format!("Failed to read {}", invoice_path.display()))?;
    let delivery_bytes = std::fs::read(delivery_path)
        .with_context(|| format!("Failed to read {}", delivery_path.display()))?;
    let invoice = parse_invoice_json(&invoice_bytes)?;
    let delivery = parse_delivery_json(&delivery_bytes)?;

    let threshold = threshold.unwrap_or(config.item_threshold);
    let report = match_documents(&invoice, &delivery, threshold)?;
    let suggestions = suggest_matches(
        &report.item_matching.invoice_only_items,
        &report.item_matching.delivery_only_items,
        config.suggestion_threshold.max(threshold),
    )?;
    let quality = validate_matching_result(&report.item_matching);

    if json {
        let output = serde_json::json!({
            "report": report,
            "suggestions": suggestions,
            "quality": quality,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    let checks = &report.document_matching;
    println!();
    println!("🔍 Document Comparison (item threshold {:.2})", threshold);
    println!("   ─────────────────────────────────────────────────────────────");
    println!(
        "   Supplier: {}   Date: {}   Confidence: {:.0}%",
        if checks.supplier_match { "✅" } else { "❌" },
        if checks.date_match { "✅" } else { "❌" },
        checks.overall_confidence * 100.0
    );
    println!(
        "   Items: {} invoice / {} delivery │ {:.1}% matched │ {:.1}% with discrepancies",
        report.summary.total_invoice_items,
        report.summary.total_delivery_items,
        report.summary.matched_percentage,
        report.summary.discrepancy_percentage
    );

    if !report.item_matching.matched_items.is_empty() {
        println!();
        println!("   Matched:");
        for item in &report.item_matching.matched_items {
            let icon = if item.has_discrepancy() { "⚠️ " } else { "✅" };
            println!(
                "   {} {:30} │ {:>6} vs {:<6} │ {:.2}",
                icon,
                truncate(&item.invoice_item.description, 30),
                fmt_quantity(item.invoice_item.quantity),
                fmt_quantity(item.delivery_item.quantity),
                item.similarity_score
            );
            if let Some(diff) = item.quantity_difference {
                println!("      quantity off by {}", diff);
            }
        }
    }

    if !report.item_matching.invoice_only_items.is_empty() {
        println!();
        println!("   Invoiced but not delivered:");
        for item in &report.item_matching.invoice_only_items {
            println!("   ❓ {}", truncate(&item.description, 50));
        }
    }

    if !report.item_matching.delivery_only_items.is_empty() {
        println!();
        println!("   Delivered but not invoiced:");
        for item in &report.item_matching.delivery_only_items {
            println!("   ❓ {}", truncate(&item.description, 50));
        }
    }

    if !suggestions.is_empty() {
        println!();
        println!("   Possible matches:");
        for suggestion in &suggestions {
            println!(
                "   {} {:28} ↔ {:28} │ {:.2}",
                band_icon(suggestion.confidence),
                truncate(&suggestion.invoice_description, 28),
                truncate(&suggestion.delivery_description, 28),
                suggestion.similarity_score
            );
        }
    }

    if !quality.recommendations.is_empty() {
        println!();
        println!("💡 Recommendations:");
        for recommendation in &quality.recommendations {
            println!("   • {}", recommendation);
        }
    }

    Ok(())
}

pub fn cmd_candidates(
    db: &Database,
    config: &MatchingConfig,
    invoice_id: &str,
    min_confidence: Option<f64>,
    limit: Option<usize>,
) -> Result<()> {
    let min_confidence = min_confidence.unwrap_or(config.min_confidence);
    let limit = limit.unwrap_or(config.candidate_limit);
    let candidates = db.find_candidates(invoice_id, min_confidence, limit)?;

    if candidates.is_empty() {
        println!(
            "No unmatched delivery notes at or above {:.0} for {}",
            min_confidence, invoice_id
        );
        return Ok(());
    }

    println!();
    println!("🔗 Candidates for {}", invoice_id);
    println!("   ─────────────────────────────────────────────────────────────");

    for candidate in &candidates {
        let band = ConfidenceBand::from_score(
            candidate.confidence,
            config.high_confidence,
            config.medium_confidence,
        );
        let note = &candidate.delivery_note;
        println!(
            "   {} {:18} │ {:20} │ {:10} │ {:>5.1} ({})",
            band_icon(band),
            truncate(&candidate.delivery_note_id, 18),
            truncate(note.supplier_name.as_deref().unwrap_or("?"), 20),
            note.delivery_date.as_deref().unwrap_or("?"),
            candidate.confidence,
            band
        );
        println!("      {}", fmt_breakdown(&candidate.breakdown));
    }

    println!();
    println!(
        "   Confirm with: owlin confirm {} {}",
        invoice_id, candidates[0].delivery_note_id
    );

    Ok(())
}

pub fn cmd_confirm(
    db: &Database,
    invoice_id: &str,
    delivery_note_id: &str,
    actor: &str,
) -> Result<()> {
    let outcome = db.confirm_match(invoice_id, delivery_note_id, actor)?;

    println!(
        "✅ Paired {} with {} (pair {}, confidence {:.1})",
        invoice_id, delivery_note_id, outcome.pair_id, outcome.confidence
    );

    Ok(())
}

pub fn cmd_reject(
    db: &Database,
    invoice_id: &str,
    delivery_note_id: &str,
    actor: &str,
    notes: Option<&str>,
) -> Result<()> {
    let outcome = db.reject_match(invoice_id, delivery_note_id, actor, notes)?;

    println!(
        "🚫 Rejected {} ↔ {} (history entry {})",
        invoice_id, delivery_note_id, outcome.history_id
    );
    println!("   This pair will not be auto-paired.");

    Ok(())
}

pub fn cmd_retry(db: &Database, config: &MatchingConfig) -> Result<()> {
    println!(
        "🔄 Auto-pairing unmatched invoices (confidence ≥ {:.0})...",
        config.high_confidence
    );

    let outcome = db.retry_late_uploads(config.high_confidence)?;

    for (invoice_id, delivery_note_id) in &outcome.paired {
        println!("   ✅ {} ↔ {}", invoice_id, delivery_note_id);
    }
    println!(
        "   Checked {} invoices. {}",
        outcome.invoices_checked, outcome.message
    );

    Ok(())
}

pub fn cmd_pairs(db: &Database, status: Option<&str>) -> Result<()> {
    let status: Option<PairStatus> = status
        .map(|s| s.parse().map_err(|e: String| anyhow!(e)))
        .transpose()?;
    let pairs = db.list_pairs(status)?;

    if pairs.is_empty() {
        println!("No pairings recorded yet.");
        return Ok(());
    }

    println!();
    println!("🔗 Pairings");
    println!("   ─────────────────────────────────────────────────────────────");

    for pair in pairs {
        let status_icon = match pair.status {
            PairStatus::Pending => "⏳",
            PairStatus::Confirmed => "✅",
            PairStatus::Rejected => "🚫",
        };

        println!(
            "   {} {:18} ↔ {:18} │ {:>5.1} │ {}",
            status_icon,
            truncate(&pair.invoice_id, 18),
            truncate(&pair.delivery_note_id, 18),
            pair.confidence_score,
            pair.confirmed_by.as_deref().unwrap_or("-")
        );
    }

    Ok(())
}

pub fn cmd_history(db: &Database, invoice_id: Option<&str>) -> Result<()> {
    let entries = db.get_matching_history(invoice_id)?;

    if entries.is_empty() {
        println!("No rejections recorded.");
        return Ok(());
    }

    println!();
    println!("📜 Matching History");
    println!("   ─────────────────────────────────────────────────────────────");

    for entry in entries {
        println!(
            "   {} {:18} ↔ {:18} │ {:>5.1} │ {} by {}",
            entry.created_at.format("%Y-%m-%d %H:%M"),
            truncate(&entry.invoice_id, 18),
            truncate(&entry.delivery_note_id, 18),
            entry.confidence_score,
            entry.action,
            entry.actor_role.as_deref().unwrap_or("?")
        );
        if let Some(notes) = &entry.notes {
            println!("      \"{}\"", notes);
        }
    }

    Ok(())
}
