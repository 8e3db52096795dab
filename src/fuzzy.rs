//! Lexical fuzzy matching between queries and product fields.
//!
//! Scores are partial-match ratios: the shorter string is aligned against
//! the best-matching substring of the longer one, so "bootcut" scores 1.0
//! against "Grace Bootcut Jeans Blue" and misspellings degrade smoothly.

use crate::feed::ProductRecord;

/// Partial-match ratio between two strings, in [0, 1].
///
/// Case-insensitive. The shorter string is matched against the closest
/// substring of the longer one (edit distance with free prefix/suffix skip
/// in the longer string), normalized by the shorter string's length.
/// An exact substring scores 1.0; strings with no characters in common
/// score 0.0. Either side empty scores 0.0.
pub fn partial_ratio(query: &str, field: &str) -> f32 {
    let a: Vec<char> = query.to_lowercase().chars().collect();
    let b: Vec<char> = field.to_lowercase().chars().collect();

    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    let (needle, haystack) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    let distance = substring_distance(&needle, &haystack);

    1.0 - distance as f32 / needle.len() as f32
}

/// Best lexical score of a query against a product, in [0, 1].
///
/// Takes the maximum partial ratio over the fields a shopper is likely to
/// type: name, model, description, category, season, gender.
pub fn lexical_score(query: &str, product: &ProductRecord) -> f32 {
    [
        product.name.as_str(),
        product.model.as_str(),
        product.description.as_str(),
        product.category.as_str(),
        product.season.as_str(),
        product.gender.as_str(),
    ]
    .iter()
    .map(|field| partial_ratio(query, field))
    .fold(0.0, f32::max)
}

/// Minimum edit distance between `needle` and any substring of `haystack`.
///
/// Single-column dynamic program over the haystack: entering the match at
/// any haystack position is free (first row zero), and so is leaving it
/// (minimum over the final row). Never exceeds `needle.len()`.
fn substring_distance(needle: &[char], haystack: &[char]) -> usize {
    let n = needle.len();
    let mut column: Vec<usize> = (0..=n).collect();
    let mut best = n;

    for &hay_char in haystack {
        let mut prev_diagonal = column[0];
        column[0] = 0;

        for i in 1..=n {
            let substitution = if needle[i - 1] == hay_char { 0 } else { 1 };
            let next = (prev_diagonal + substitution)
                .min(column[i] + 1)
                .min(column[i - 1] + 1);
            prev_diagonal = column[i];
            column[i] = next;
        }

        best = best.min(column[n]);
    }

    best
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(name: &str, model: &str, description: &str) -> ProductRecord {
        ProductRecord {
            name: name.to_string(),
            model: model.to_string(),
            description: description.to_string(),
            category: "Jeans".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_exact_substring_scores_one() {
        assert_eq!(partial_ratio("bootcut", "Grace Bootcut Jeans Blue"), 1.0);
        assert_eq!(partial_ratio("jeans", "jeans"), 1.0);
    }

    #[test]
    fn test_case_insensitive() {
        assert_eq!(partial_ratio("BLACK", "Ashley Jeans Black"), 1.0);
    }

    #[test]
    fn test_disjoint_strings_score_zero() {
        assert_eq!(partial_ratio("xyz", "qqqq"), 0.0);
    }

    #[test]
    fn test_empty_field_scores_zero() {
        assert_eq!(partial_ratio("jeans", ""), 0.0);
        assert_eq!(partial_ratio("", "jeans"), 0.0);
    }

    #[test]
    fn test_long_query_matches_short_field() {
        // the shorter side is the needle, so a query mentioning the field
        // verbatim still scores 1.0
        assert_eq!(partial_ratio("black bootcut jeans for women", "bootcut"), 1.0);
    }

    #[test]
    fn test_typo_degrades_gracefully() {
        let close = partial_ratio("bootcat", "Grace Bootcut Jeans Blue");
        let far = partial_ratio("sandals", "Grace Bootcut Jeans Blue");

        assert!(close > 0.7, "one-letter typo should stay high, got {close}");
        assert!(close < 1.0);
        assert!(far < close);
    }

    #[test]
    fn test_greek_text() {
        assert_eq!(partial_ratio("τζιν", "Ashley Slim Fit Τζιν Μαύρο"), 1.0);
        let score = partial_ratio("μαυρο", "Ashley Slim Fit Τζιν Μαύρο");
        assert!(score >= 0.6, "accent mismatch is one edit, got {score}");
    }

    #[test]
    fn test_lexical_score_takes_field_maximum() {
        let record = product("Ashley Slim", "ASH-001-BLK", "black denim");

        let by_model = lexical_score("ash-001-blk", &record);
        assert_eq!(by_model, 1.0);

        let by_category = lexical_score("jeans", &record);
        assert_eq!(by_category, 1.0);
    }

    #[test]
    fn test_lexical_score_zero_for_unrelated_query() {
        let record = ProductRecord {
            name: "αβγ".to_string(),
            ..Default::default()
        };
        assert_eq!(lexical_score("xyz", &record), 0.0);
    }

    #[test]
    fn test_scores_bounded() {
        let record = product("Grace Bootcut", "GRC-002", "classic bootcut in blue");
        for query in ["boot", "bootcut jeans", "grc", "completely unrelated words"] {
            let score = lexical_score(query, &record);
            assert!((0.0..=1.0).contains(&score), "{query} -> {score}");
        }
    }
}
