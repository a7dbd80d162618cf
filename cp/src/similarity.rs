//! Approximate string matching for near-duplicate detection
//!
//! Strings are case-folded and split into alphanumeric tokens; whitespace and
//! punctuation only separate tokens. The similarity ratio is
//!
//! ```text
//! ratio = 2 * LCS(tokens_a, tokens_b) / (len(tokens_a) + len(tokens_b))
//! ```
//!
//! where LCS is the length of the longest common token subsequence. Two
//! strings without any tokens score 1.0 when their whitespace-collapsed,
//! lowercased forms are equal and 0.0 otherwise; one empty side scores 0.0.

use tracing::debug;

/// Default duplicate threshold
pub const DEFAULT_THRESHOLD: f64 = 0.70;

/// Lowercase and collapse all whitespace runs to a single space
pub fn normalize(s: &str) -> String {
    s.split_whitespace()
        .map(|word| word.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Split a string into lowercase alphanumeric tokens
pub fn tokenize(s: &str) -> Vec<String> {
    s.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(String::from)
        .collect()
}

/// Similarity ratio in `[0, 1]`
pub fn ratio(a: &str, b: &str) -> f64 {
    let ta = tokenize(a);
    let tb = tokenize(b);

    match (ta.is_empty(), tb.is_empty()) {
        (true, true) => {
            if normalize(a) == normalize(b) {
                1.0
            } else {
                0.0
            }
        }
        (true, false) | (false, true) => 0.0,
        (false, false) => {
            let common = lcs_len(&ta, &tb);
            (2 * common) as f64 / (ta.len() + tb.len()) as f64
        }
    }
}

/// Whether two strings are near-duplicates at the given threshold
pub fn is_duplicate(a: &str, b: &str, threshold: f64) -> bool {
    let score = ratio(a, b);
    let duplicate = score >= threshold;
    debug!(%a, %b, %score, %threshold, %duplicate, "is_duplicate: called");
    duplicate
}

/// Longest common subsequence length (two-row dynamic programming)
fn lcs_len<T: PartialEq>(a: &[T], b: &[T]) -> usize {
    let mut prev = vec![0usize; b.len() + 1];
    let mut curr = vec![0usize; b.len() + 1];

    for x in a {
        for (j, y) in b.iter().enumerate() {
            curr[j + 1] = if x == y { prev[j] + 1 } else { prev[j + 1].max(curr[j]) };
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}
