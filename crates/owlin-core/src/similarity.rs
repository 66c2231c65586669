//! Text similarity for OCR'd descriptions and supplier names
//!
//! The ratio is the classic matching-blocks measure: find the longest common
//! contiguous run, recurse on the pieces to its left and right, and score
//! `2 * matched / (len(a) + len(b))`. OCR noise is mostly character-level, so
//! there is no tokenization or stemming here.
//!
//! Longest-run tie-breaking depends on argument order, so the block search runs
//! in both orientations and the better cover wins. That keeps the score
//! symmetric.

/// Words dropped by [`normalize_description`]
const STOP_WORDS: &[&str] = &[
    "the", "a", "an", "and", "or", "in", "on", "at", "to", "for", "of", "with", "by",
];

/// Punctuation replaced by spaces in [`normalize_description`]
const STRIPPED_PUNCTUATION: &[char] = &[',', '.', ';', ':', '(', ')', '[', ']', '!', '?', '"'];

/// Corporate suffixes removed by [`normalize_supplier_name`], applied in order
const SUPPLIER_SUFFIXES: &[&str] = &[
    " ltd", " limited", " plc", " inc", " corp", " company", " co",
];

/// Similarity of two descriptions in `[0.0, 1.0]`
///
/// Both sides are lower-cased and trimmed first. Symmetric, and 1.0 for
/// identical input (including two empty strings).
pub fn similarity(a: &str, b: &str) -> f64 {
    let a = a.trim().to_lowercase();
    let b = b.trim().to_lowercase();
    ratio(&a, &b)
}

/// Matching-blocks ratio of two strings, compared as-is
pub fn ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }

    let matched = matched_chars(&a, &b).max(matched_chars(&b, &a));
    2.0 * matched as f64 / total as f64
}

/// Total characters covered by the matching blocks of `a` and `b`
fn matched_chars(a: &[char], b: &[char]) -> usize {
    let mut matched = 0;
    let mut pending = vec![(0, a.len(), 0, b.len())];

    while let Some((alo, ahi, blo, bhi)) = pending.pop() {
        let (i, j, k) = longest_match(a, b, alo, ahi, blo, bhi);
        if k == 0 {
            continue;
        }
        matched += k;
        if alo < i && blo < j {
            pending.push((alo, i, blo, j));
        }
        if i + k < ahi && j + k < bhi {
            pending.push((i + k, ahi, j + k, bhi));
        }
    }

    matched
}

/// Longest common run of `a[alo..ahi]` and `b[blo..bhi]` as `(i, j, len)`
///
/// Ties go to the run that ends earliest in `a`, then earliest in `b`.
fn longest_match(
    a: &[char],
    b: &[char],
    alo: usize,
    ahi: usize,
    blo: usize,
    bhi: usize,
) -> (usize, usize, usize) {
    let (mut best_i, mut best_j, mut best_len) = (alo, blo, 0);
    let width = bhi - blo;
    let mut prev = vec![0usize; width + 1];
    let mut curr = vec![0usize; width + 1];

    for i in alo..ahi {
        for j in blo..bhi {
            let col = j - blo + 1;
            if a[i] == b[j] {
                let len = prev[col - 1] + 1;
                curr[col] = len;
                if len > best_len {
                    best_i = i + 1 - len;
                    best_j = j + 1 - len;
                    best_len = len;
                }
            } else {
                curr[col] = 0;
            }
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    (best_i, best_j, best_len)
}

/// Normalize a product description before matching
///
/// Lower-cases, turns common punctuation into spaces, collapses whitespace and
/// drops stop words, so "12 x Lager cans" and "Lager Cans (12x)" compare on
/// their content words.
pub fn normalize_description(description: &str) -> String {
    let lowered = description.to_lowercase().replace(STRIPPED_PUNCTUATION, " ");

    lowered
        .split_whitespace()
        .filter(|word| !STOP_WORDS.contains(word))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Normalize a supplier name for comparison ("Heineken UK Ltd" -> "heineken uk")
pub fn normalize_supplier_name(name: &str) -> String {
    let mut normalized = name.trim().to_lowercase();
    for suffix in SUPPLIER_SUFFIXES {
        if let Some(stripped) = normalized.strip_suffix(suffix) {
            normalized = stripped.to_string();
        }
    }
    normalized.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_identical_strings() {
        assert_eq!(similarity("Heineken Lager 24x330ml", "Heineken Lager 24x330ml"), 1.0);
        assert_eq!(similarity("", ""), 1.0);
    }

    #[test]
    fn test_case_and_whitespace_ignored() {
        assert_eq!(similarity("  HEINEKEN UK ", "heineken uk"), 1.0);
    }

    #[test]
    fn test_known_ratios() {
        // 8 shared chars over 11 + 8
        assert!(approx(similarity("Heineken UK", "Heineken"), 16.0 / 19.0));
        // 11 shared chars over 21 + 18
        assert!(approx(
            similarity("Corona Extra 24x330ml", "Budweiser 24x330ml"),
            22.0 / 39.0
        ));
        assert!(approx(
            similarity("Heineken Lager 24x330ml", "Heineken Lager 24x300ml"),
            44.0 / 46.0
        ));
    }

    #[test]
    fn test_one_side_empty() {
        assert_eq!(similarity("abc", ""), 0.0);
        assert_eq!(similarity("", "abc"), 0.0);
    }

    #[test]
    fn test_symmetry_and_bounds() {
        let samples = [
            "Heineken Lager 24x330ml",
            "Corona Extra 24x330ml",
            "Stella Artois",
            "stella",
            "abcabcabc",
            "cba",
            "",
            "Kegs 50L",
        ];
        for a in samples {
            for b in samples {
                let ab = similarity(a, b);
                let ba = similarity(b, a);
                assert!(approx(ab, ba), "asymmetric for {:?} / {:?}", a, b);
                assert!((0.0..=1.0).contains(&ab));
            }
            assert_eq!(similarity(a, a), 1.0);
        }
    }

    #[test]
    fn test_normalize_description() {
        assert_eq!(normalize_description("The Lager, 24 x 330ml."), "lager 24 x 330ml");
        assert_eq!(normalize_description("Lager Cans (12x)"), "lager cans 12x");
        assert_eq!(normalize_description("  Fish   and Chips  "), "fish chips");
        assert_eq!(normalize_description(""), "");
    }

    #[test]
    fn test_normalize_supplier_name() {
        assert_eq!(normalize_supplier_name("Heineken UK Ltd"), "heineken uk");
        assert_eq!(normalize_supplier_name("Heineken UK Limited"), "heineken uk");
        assert_eq!(normalize_supplier_name(" Brakes PLC "), "brakes");
        assert_eq!(normalize_supplier_name("Bidfood"), "bidfood");
        assert_eq!(normalize_supplier_name(""), "");
    }
}
