//! Invoice line item to delivery-note line item matching
//!
//! Pairs items greedily: each invoice item, in input order, claims the most
//! similar delivery item that is still unclaimed, provided the similarity clears
//! the threshold. There is no global optimization (no Hungarian assignment);
//! invoices carry tens of lines, and first-come ordering keeps results
//! reproducible. A claimed delivery item is never handed to a later invoice item.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::models::{ConfidenceBand, DeliveryLineItem, LineItem};
use crate::similarity::{normalize_description, similarity};

/// Default minimum similarity for pairing two items
pub const DEFAULT_ITEM_THRESHOLD: f64 = 0.8;

/// Default upper bound (exclusive) for review suggestions
pub const DEFAULT_SUGGESTION_THRESHOLD: f64 = 0.6;

/// Below this similarity a suggestion is noise
const SUGGESTION_FLOOR: f64 = 0.3;

/// Quantities closer than this are treated as equal (float noise from OCR parsing)
const QUANTITY_TOLERANCE: f64 = 0.01;

/// A paired invoice item and delivery item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchedItem {
    /// Invoice item as supplied by the caller
    pub invoice_item: LineItem,
    /// Delivery item as supplied by the caller
    pub delivery_item: DeliveryLineItem,
    /// Invoice description as it was compared (normalized when requested)
    pub compared_invoice_description: String,
    /// Delivery description as it was compared
    pub compared_delivery_description: String,
    pub similarity_score: f64,
    pub quantity_mismatch: bool,
    /// Always false: delivery lines carry no price at this layer
    pub price_mismatch: bool,
    /// Invoice quantity minus delivery quantity, when they disagree
    pub quantity_difference: Option<f64>,
    pub price_difference: Option<f64>,
}

impl MatchedItem {
    pub fn has_discrepancy(&self) -> bool {
        self.quantity_mismatch || self.price_mismatch
    }
}

/// Outcome of one item-matching run
///
/// Every input item lands in exactly one place: a pair in `matched_items`,
/// `invoice_only_items`, or `delivery_only_items`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MatchingResult {
    pub matched_items: Vec<MatchedItem>,
    pub invoice_only_items: Vec<LineItem>,
    pub delivery_only_items: Vec<DeliveryLineItem>,
    /// Matched pairs over the item count of both sides (0.0 when both are empty)
    pub overall_confidence: f64,
    pub total_matches: usize,
    pub total_discrepancies: usize,
}

/// Reject thresholds outside `[0, 1]` (and NaN) instead of silently changing
/// what counts as a match
pub(crate) fn validate_threshold(threshold: f64) -> Result<f64> {
    if (0.0..=1.0).contains(&threshold) {
        Ok(threshold)
    } else {
        Err(Error::InvalidThreshold(threshold))
    }
}

/// Match invoice line items to delivery-note line items
///
/// With `normalize` set, descriptions are compared through
/// [`normalize_description`]; the caller's items are never modified and the
/// result carries them unchanged alongside the compared text. Items whose
/// compared description is blank never pair and land in the "only" lists.
pub fn match_items(
    invoice_items: &[LineItem],
    delivery_items: &[DeliveryLineItem],
    threshold: f64,
    normalize: bool,
) -> Result<MatchingResult> {
    let threshold = validate_threshold(threshold)?;

    info!(
        "Starting item matching: {} invoice items, {} delivery items",
        invoice_items.len(),
        delivery_items.len()
    );

    let prepare = |description: &str| {
        if normalize {
            normalize_description(description)
        } else {
            description.to_string()
        }
    };
    let invoice_descriptions: Vec<String> = invoice_items
        .iter()
        .map(|item| prepare(&item.description))
        .collect();
    let delivery_descriptions: Vec<String> = delivery_items
        .iter()
        .map(|item| prepare(&item.description))
        .collect();

    let mut claimed = vec![false; delivery_items.len()];
    let mut matched_items = Vec::new();
    let mut invoice_only_items = Vec::new();

    for (inv_item, inv_desc) in invoice_items.iter().zip(&invoice_descriptions) {
        let mut best_ratio = 0.0;
        let mut best_index = None;

        // Blank lines (null OCR text, or only stop words after normalization)
        // carry nothing to compare and would pair with each other at 1.0
        if inv_desc.trim().is_empty() {
            debug!("Skipping blank invoice item");
            invoice_only_items.push(inv_item.clone());
            continue;
        }

        for (index, del_desc) in delivery_descriptions.iter().enumerate() {
            if claimed[index] || del_desc.trim().is_empty() {
                continue;
            }
            let ratio = similarity(inv_desc, del_desc);
            if ratio > best_ratio {
                best_ratio = ratio;
                best_index = Some(index);
            }
        }

        match best_index {
            Some(index) if best_ratio >= threshold => {
                claimed[index] = true;
                let del_item = &delivery_items[index];

                let (quantity_mismatch, quantity_difference) =
                    match (inv_item.quantity, del_item.quantity) {
                        (Some(inv_qty), Some(del_qty))
                            if (inv_qty - del_qty).abs() > QUANTITY_TOLERANCE =>
                        {
                            (true, Some(inv_qty - del_qty))
                        }
                        _ => (false, None),
                    };

                debug!(
                    "Matched '{}' -> '{}' (similarity: {:.3})",
                    inv_item.description, del_item.description, best_ratio
                );
                if quantity_mismatch {
                    warn!(
                        "Quantity mismatch for '{}': invoice {:?} vs delivery {:?}",
                        inv_item.description, inv_item.quantity, del_item.quantity
                    );
                }

                matched_items.push(MatchedItem {
                    invoice_item: inv_item.clone(),
                    delivery_item: del_item.clone(),
                    compared_invoice_description: inv_desc.clone(),
                    compared_delivery_description: delivery_descriptions[index].clone(),
                    similarity_score: best_ratio,
                    quantity_mismatch,
                    price_mismatch: false,
                    quantity_difference,
                    price_difference: None,
                });
            }
            _ => {
                debug!(
                    "No match for invoice item '{}' (best similarity: {:.3})",
                    inv_item.description, best_ratio
                );
                invoice_only_items.push(inv_item.clone());
            }
        }
    }

    let delivery_only_items: Vec<DeliveryLineItem> = delivery_items
        .iter()
        .zip(&claimed)
        .filter(|(_, claimed)| !**claimed)
        .map(|(item, _)| item.clone())
        .collect();

    let total_items = invoice_items.len() + delivery_items.len();
    let total_matches = matched_items.len();
    let overall_confidence = if total_items > 0 {
        total_matches as f64 / total_items as f64
    } else {
        0.0
    };
    let total_discrepancies = matched_items
        .iter()
        .filter(|item| item.has_discrepancy())
        .count();

    info!(
        "Matching completed: {} matches, {} invoice-only, {} delivery-only, confidence {:.3}, {} discrepancies",
        total_matches,
        invoice_only_items.len(),
        delivery_only_items.len(),
        overall_confidence,
        total_discrepancies
    );

    Ok(MatchingResult {
        matched_items,
        invoice_only_items,
        delivery_only_items,
        overall_confidence,
        total_matches,
        total_discrepancies,
    })
}

// ========== Review Helpers ==========

/// A near-miss pairing worth a human look
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchSuggestion {
    pub invoice_description: String,
    pub delivery_description: String,
    pub similarity_score: f64,
    /// `Low` below 0.5 similarity, otherwise `Medium`
    pub confidence: ConfidenceBand,
}

/// Suggest pairs that fall below the matching threshold but above noise level
///
/// Every invoice/delivery combination with `0.3 <= similarity < threshold` is
/// returned, most similar first.
pub fn suggest_matches(
    invoice_items: &[LineItem],
    delivery_items: &[DeliveryLineItem],
    threshold: f64,
) -> Result<Vec<MatchSuggestion>> {
    let threshold = validate_threshold(threshold)?;

    let mut suggestions = Vec::new();
    for inv_item in invoice_items {
        for del_item in delivery_items {
            let score = similarity(&inv_item.description, &del_item.description);
            if score >= SUGGESTION_FLOOR && score < threshold {
                suggestions.push(MatchSuggestion {
                    invoice_description: inv_item.description.clone(),
                    delivery_description: del_item.description.clone(),
                    similarity_score: score,
                    confidence: if score < 0.5 {
                        ConfidenceBand::Low
                    } else {
                        ConfidenceBand::Medium
                    },
                });
            }
        }
    }

    suggestions.sort_by(|a, b| {
        b.similarity_score
            .partial_cmp(&a.similarity_score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    info!("Generated {} match suggestions", suggestions.len());
    Ok(suggestions)
}

/// Quality assessment of a matching run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchQuality {
    pub match_rate: f64,
    /// Discrepancies per matched pair
    pub discrepancy_rate: f64,
    /// Matched pairs over the larger side's item count
    pub coverage_rate: f64,
    pub recommendations: Vec<String>,
}

/// Summarize how trustworthy a matching run looks
pub fn validate_matching_result(result: &MatchingResult) -> MatchQuality {
    let matched = result.matched_items.len();
    let discrepancy_rate = if result.total_matches > 0 {
        result.total_discrepancies as f64 / result.total_matches as f64
    } else {
        0.0
    };
    let larger_side = (matched + result.invoice_only_items.len())
        .max(matched + result.delivery_only_items.len());
    let coverage_rate = if larger_side > 0 {
        result.total_matches as f64 / larger_side as f64
    } else {
        0.0
    };

    let mut recommendations = Vec::new();
    if result.overall_confidence < 0.5 {
        recommendations.push("Low match rate - consider manual review of all items".to_string());
    }
    if result.total_discrepancies as f64 > result.total_matches as f64 * 0.3 {
        recommendations
            .push("High discrepancy rate - review quantity and price mismatches".to_string());
    }
    if result.invoice_only_items.len() as f64 > matched as f64 * 0.5 {
        recommendations
            .push("Many invoice-only items - check for missing delivery items".to_string());
    }
    if result.delivery_only_items.len() as f64 > matched as f64 * 0.5 {
        recommendations
            .push("Many delivery-only items - check for extra delivery items".to_string());
    }
    if recommendations.is_empty() {
        recommendations
            .push("Matching quality appears good - proceed with confidence".to_string());
    }

    MatchQuality {
        match_rate: result.overall_confidence,
        discrepancy_rate,
        coverage_rate,
        recommendations,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::XorShift;

    fn inv(description: &str, quantity: f64) -> LineItem {
        LineItem::new(description, Some(quantity))
    }

    fn del(description: &str, quantity: f64) -> DeliveryLineItem {
        DeliveryLineItem::new(description, Some(quantity))
    }

    fn assert_partition(
        result: &MatchingResult,
        invoice_items: &[LineItem],
        delivery_items: &[DeliveryLineItem],
    ) {
        assert_eq!(
            result.matched_items.len() + result.invoice_only_items.len(),
            invoice_items.len()
        );
        assert_eq!(
            result.matched_items.len() + result.delivery_only_items.len(),
            delivery_items.len()
        );
    }

    #[test]
    fn test_exact_match_same_quantity() {
        let invoice = vec![inv("Heineken Lager 24x330ml", 10.0)];
        let delivery = vec![del("Heineken Lager 24x330ml", 10.0)];

        let result = match_items(&invoice, &delivery, 0.8, true).unwrap();

        assert_eq!(result.matched_items.len(), 1);
        let pair = &result.matched_items[0];
        assert_eq!(pair.similarity_score, 1.0);
        assert!(!pair.quantity_mismatch);
        assert!(!pair.price_mismatch);
        assert_eq!(pair.quantity_difference, None);
        assert_eq!(result.total_discrepancies, 0);
        // one pair over two items
        assert_eq!(result.overall_confidence, 0.5);
    }

    #[test]
    fn test_quantity_mismatch() {
        let invoice = vec![inv("Heineken Lager 24x330ml", 10.0)];
        let delivery = vec![del("Heineken Lager 24x330ml", 8.0)];

        let result = match_items(&invoice, &delivery, 0.8, true).unwrap();

        assert_eq!(result.total_matches, 1);
        let pair = &result.matched_items[0];
        assert!(pair.quantity_mismatch);
        assert_eq!(pair.quantity_difference, Some(2.0));
        assert_eq!(result.total_discrepancies, 1);
    }

    #[test]
    fn test_quantity_within_tolerance() {
        let invoice = vec![inv("Coke 330ml", 10.0)];
        let delivery = vec![del("Coke 330ml", 10.005)];

        let result = match_items(&invoice, &delivery, 0.8, true).unwrap();
        assert!(!result.matched_items[0].quantity_mismatch);
    }

    #[test]
    fn test_missing_quantity_skips_check() {
        let invoice = vec![LineItem::new("Coke 330ml", None)];
        let delivery = vec![del("Coke 330ml", 4.0)];

        let result = match_items(&invoice, &delivery, 0.8, true).unwrap();
        assert_eq!(result.total_matches, 1);
        assert!(!result.matched_items[0].quantity_mismatch);
        assert_eq!(result.total_discrepancies, 0);
    }

    #[test]
    fn test_empty_inputs() {
        let result = match_items(&[], &[], 0.8, true).unwrap();

        assert!(result.matched_items.is_empty());
        assert!(result.invoice_only_items.is_empty());
        assert!(result.delivery_only_items.is_empty());
        assert_eq!(result.overall_confidence, 0.0);
        assert_eq!(result.total_matches, 0);
        assert_eq!(result.total_discrepancies, 0);
    }

    #[test]
    fn test_one_side_empty() {
        let invoice = vec![inv("Coke 330ml", 1.0), inv("Fanta 330ml", 1.0)];
        let result = match_items(&invoice, &[], 0.8, true).unwrap();

        assert_eq!(result.invoice_only_items, invoice);
        assert_eq!(result.overall_confidence, 0.0);

        let delivery = vec![del("Coke 330ml", 1.0)];
        let result = match_items(&[], &delivery, 0.8, true).unwrap();
        assert_eq!(result.delivery_only_items, delivery);
    }

    #[test]
    fn test_partition_and_order() {
        let invoice = vec![
            inv("Heineken Lager 24x330ml", 10.0),
            inv("Walkers Crisps Ready Salted", 3.0),
            inv("Corona Extra 24x330ml", 5.0),
        ];
        let delivery = vec![
            del("Corona Extra 24x330ml", 5.0),
            del("Fever-Tree Tonic 24x200ml", 2.0),
            del("Heineken Lager 24x330ml", 9.0),
        ];

        let result = match_items(&invoice, &delivery, 0.8, true).unwrap();

        assert_partition(&result, &invoice, &delivery);
        assert_eq!(result.total_matches, 2);
        // Pairs follow invoice order
        assert_eq!(
            result.matched_items[0].invoice_item.description,
            "Heineken Lager 24x330ml"
        );
        assert_eq!(
            result.matched_items[1].invoice_item.description,
            "Corona Extra 24x330ml"
        );
        assert_eq!(result.invoice_only_items[0].description, "Walkers Crisps Ready Salted");
        assert_eq!(result.delivery_only_items[0].description, "Fever-Tree Tonic 24x200ml");
        assert_eq!(result.total_discrepancies, 1);
        assert!((result.overall_confidence - 2.0 / 6.0).abs() < 1e-9);
    }

    #[test]
    fn test_tie_goes_to_first_delivery_item() {
        let invoice = vec![inv("Coke 330ml", 1.0)];
        let delivery = vec![del("Coke 330ml", 1.0), del("Coke 330ml", 2.0)];

        let result = match_items(&invoice, &delivery, 0.8, true).unwrap();

        assert_eq!(result.matched_items[0].delivery_item.quantity, Some(1.0));
        assert_eq!(result.delivery_only_items[0].quantity, Some(2.0));
    }

    #[test]
    fn test_claimed_items_are_not_stolen_back() {
        // The first invoice item claims the only close delivery item, even though
        // the second invoice item is an exact match for it.
        let invoice = vec![
            inv("Heineken Lager 24x330ml", 10.0),
            inv("Heineken Lager 24x300ml", 10.0),
        ];
        let delivery = vec![del("Heineken Lager 24x300ml", 10.0)];

        let result = match_items(&invoice, &delivery, 0.8, true).unwrap();

        assert_eq!(result.total_matches, 1);
        assert_eq!(
            result.matched_items[0].invoice_item.description,
            "Heineken Lager 24x330ml"
        );
        assert_eq!(result.invoice_only_items[0].description, "Heineken Lager 24x300ml");
    }

    #[test]
    fn test_normalization_keeps_original_text() {
        let invoice = vec![inv("The Lager, 24 x 330ml.", 1.0)];
        let delivery = vec![del("Lager 24 x 330ml", 1.0)];

        let result = match_items(&invoice, &delivery, 0.95, true).unwrap();

        assert_eq!(result.total_matches, 1);
        let pair = &result.matched_items[0];
        assert_eq!(pair.similarity_score, 1.0);
        assert_eq!(pair.invoice_item.description, "The Lager, 24 x 330ml.");
        assert_eq!(pair.compared_invoice_description, "lager 24 x 330ml");

        // Without normalization the punctuation and stop word cost the match
        let raw = match_items(&invoice, &delivery, 0.95, false).unwrap();
        assert_eq!(raw.total_matches, 0);
    }

    #[test]
    fn test_threshold_monotonicity() {
        let invoice = vec![
            inv("Heineken Lager 24x330ml", 10.0),
            inv("Corona Extra 24x330ml", 5.0),
            inv("Stella Artois 24x330ml", 2.0),
            inv("Kegs 50L", 1.0),
        ];
        let delivery = vec![
            del("Heineken Lager 24x330ml", 10.0),
            del("Budweiser 24x330ml", 5.0),
            del("Stella Artois 24x330", 2.0),
            del("Keg 50 L", 1.0),
        ];

        let mut previous = usize::MAX;
        for step in 0..=10 {
            let threshold = step as f64 / 10.0;
            let result = match_items(&invoice, &delivery, threshold, true).unwrap();
            assert_partition(&result, &invoice, &delivery);
            assert!(result.total_matches <= previous);
            previous = result.total_matches;
        }
    }

    const WORDS: &[&str] = &[
        "Heineken", "Lager", "24x330ml", "Corona", "Extra", "the", "and", "Coke", "330ml", "Keg",
        "50L", "(12x)", "cans", "Stella", "stella,", "of", "",
    ];

    fn random_description(rng: &mut XorShift) -> String {
        let words = rng.below(5);
        (0..words)
            .map(|_| WORDS[rng.below(WORDS.len())])
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Up to five descriptions, with repeats and lines copied from `other`
    fn random_side(rng: &mut XorShift, other: &[String]) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        for _ in 0..rng.below(6) {
            let description = match rng.below(4) {
                0 if !out.is_empty() => out[rng.below(out.len())].clone(),
                1 if !other.is_empty() => other[rng.below(other.len())].clone(),
                _ => random_description(rng),
            };
            out.push(description);
        }
        out
    }

    #[test]
    fn test_partition_and_monotonicity_on_generated_inputs() {
        let mut rng = XorShift(0x9E37_79B9_7F4A_7C15);

        for _ in 0..200 {
            let invoice_text = random_side(&mut rng, &[]);
            let delivery_text = random_side(&mut rng, &invoice_text);
            let invoice: Vec<LineItem> = invoice_text.iter().map(|d| inv(d, 1.0)).collect();
            let delivery: Vec<DeliveryLineItem> =
                delivery_text.iter().map(|d| del(d, 2.0)).collect();

            let mut previous = usize::MAX;
            for step in 0..=20 {
                let threshold = step as f64 / 20.0;
                let result = match_items(&invoice, &delivery, threshold, true).unwrap();

                assert_partition(&result, &invoice, &delivery);
                assert!(
                    result.total_matches <= previous,
                    "more matches at {} for {:?} / {:?}",
                    threshold,
                    invoice_text,
                    delivery_text
                );
                for pair in &result.matched_items {
                    assert!(pair.similarity_score >= threshold);
                    assert!(pair.similarity_score <= 1.0);
                }
                assert!((0.0..=0.5).contains(&result.overall_confidence));
                previous = result.total_matches;
            }
        }
    }

    #[test]
    fn test_blank_descriptions_never_pair() {
        let invoice = vec![inv("", 1.0), inv("the and of", 1.0), inv("Coke 330ml", 1.0)];
        let delivery = vec![del("", 1.0), del("  ", 1.0), del("Coke 330ml", 1.0)];

        let result = match_items(&invoice, &delivery, 0.0, true).unwrap();

        assert_partition(&result, &invoice, &delivery);
        assert_eq!(result.total_matches, 1);
        assert_eq!(result.matched_items[0].invoice_item.description, "Coke 330ml");
        assert_eq!(result.invoice_only_items.len(), 2);
        assert_eq!(result.delivery_only_items.len(), 2);

        // Without normalization, only genuinely empty text is skipped
        let raw = match_items(&invoice, &delivery, 0.0, false).unwrap();
        assert_partition(&raw, &invoice, &delivery);
        assert!(raw
            .matched_items
            .iter()
            .all(|pair| !pair.invoice_item.description.trim().is_empty()));
    }

    #[test]
    fn test_threshold_out_of_range_rejected() {
        let invoice = vec![inv("Coke", 1.0)];
        let delivery = vec![del("Coke", 1.0)];

        assert!(matches!(
            match_items(&invoice, &delivery, 1.5, true),
            Err(Error::InvalidThreshold(_))
        ));
        assert!(matches!(
            match_items(&invoice, &delivery, -0.1, true),
            Err(Error::InvalidThreshold(_))
        ));
        assert!(match_items(&invoice, &delivery, f64::NAN, true).is_err());
    }

    #[test]
    fn test_suggest_matches() {
        let invoice = vec![inv("Corona Extra 24x330ml", 5.0)];
        let delivery = vec![
            del("Budweiser 24x330ml", 5.0),
            del("Corona Extra 24x330ml", 5.0),
            del("Mint Leaves", 1.0),
        ];

        let suggestions = suggest_matches(&invoice, &delivery, 0.6).unwrap();

        // Exact match is above the threshold, mint leaves below the floor
        assert_eq!(suggestions.len(), 1);
        assert_eq!(suggestions[0].delivery_description, "Budweiser 24x330ml");
        assert_eq!(suggestions[0].confidence, ConfidenceBand::Medium);
    }

    #[test]
    fn test_validate_good_result() {
        let invoice = vec![inv("Coke 330ml", 1.0), inv("Fanta 330ml", 1.0)];
        let delivery = vec![del("Coke 330ml", 1.0), del("Fanta 330ml", 1.0)];
        let result = match_items(&invoice, &delivery, 0.8, true).unwrap();

        let quality = validate_matching_result(&result);

        assert_eq!(quality.coverage_rate, 1.0);
        assert_eq!(quality.discrepancy_rate, 0.0);
        // match rate counts both sides, so a perfect run still reads 0.5
        assert_eq!(quality.match_rate, 0.5);
        assert_eq!(quality.recommendations.len(), 1);
        assert!(quality.recommendations[0].contains("quality appears good"));
    }

    #[test]
    fn test_validate_poor_result() {
        let invoice = vec![inv("Coke 330ml", 4.0), inv("Walkers Crisps", 1.0)];
        let delivery = vec![del("Coke 330ml", 2.0), del("Lemons", 1.0)];
        let result = match_items(&invoice, &delivery, 0.8, true).unwrap();

        let quality = validate_matching_result(&result);

        assert_eq!(quality.discrepancy_rate, 1.0);
        assert_eq!(quality.coverage_rate, 0.5);
        assert!(quality.recommendations.iter().any(|r| r.contains("Low match rate")));
        assert!(quality.recommendations.iter().any(|r| r.contains("discrepancy")));
        assert!(quality.recommendations.iter().any(|r| r.contains("invoice-only")));
        assert!(quality.recommendations.iter().any(|r| r.contains("delivery-only")));
    }
}
