//! Word-level similarity used by the loop detector
//!
//! Arguments and outputs are compared as bags of lowercase words so that a
//! model which merely reorders or re-cases a query is still recognised as
//! repeating itself.

use std::collections::HashSet;

/// Split text into its set of lowercase whitespace-delimited words.
pub fn word_set(text: &str) -> HashSet<String> {
    text.split_whitespace().map(|word| word.to_lowercase()).collect()
}

/// Jaccard similarity between the word sets of two strings.
///
/// Returns a score between 0.0 (no shared words) and 1.0 (same word set).
/// Two empty inputs are treated as identical; one empty input scores 0.0.
pub fn jaccard_similarity(a: &str, b: &str) -> f64 {
    let words_a = word_set(a);
    let words_b = word_set(b);

    match (words_a.is_empty(), words_b.is_empty()) {
        (true, true) => return 1.0,
        (true, false) | (false, true) => return 0.0,
        _ => {}
    }

    let intersection = words_a.intersection(&words_b).count();
    let union = words_a.union(&words_b).count();

    intersection as f64 / union as f64
}

/// Mean of the pairwise similarities across a group of texts.
///
/// Fewer than two texts have no pairs; that case scores 0.0.
pub fn mean_pairwise_similarity<S: AsRef<str>>(texts: &[S]) -> f64 {
    let mut total = 0.0;
    let mut pairs = 0usize;

    for (i, first) in texts.iter().enumerate() {
        for second in &texts[i + 1..] {
            total += jaccard_similarity(first.as_ref(), second.as_ref());
            pairs += 1;
        }
    }

    if pairs == 0 {
        return 0.0;
    }

    total / pairs as f64
}
