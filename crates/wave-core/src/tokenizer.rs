use std::collections::{BTreeSet, HashSet};
use std::sync::LazyLock;

use regex::Regex;

use crate::constants::{MIN_SIGNIFICANT_LEN, SIGNATURE_WORDS};

static NON_WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^\w']+").unwrap());

/// Lowercase words longer than three characters, in order of appearance.
/// Splits on anything that is not a word character or apostrophe.
/// Duplicates are kept.
pub fn significant_words(text: &str) -> Vec<String> {
    let lower = text.to_lowercase();
    NON_WORD
        .split(&lower)
        .map(|t| t.trim_matches('\''))
        .filter(|t| t.chars().count() > MIN_SIGNIFICANT_LEN)
        .map(str::to_string)
        .collect()
}

/// Distinct significant words.
pub fn significant_word_set(text: &str) -> HashSet<String> {
    significant_words(text).into_iter().collect()
}

/// Fast matching fingerprint: the five longest distinct significant words,
/// re-sorted alphabetically and joined with `|`.
pub fn coherence_signature(text: &str) -> String {
    let distinct: BTreeSet<String> = significant_words(text).into_iter().collect();
    let mut by_length: Vec<String> = distinct.into_iter().collect();
    // BTreeSet order already breaks length ties alphabetically
    by_length.sort_by_key(|w| std::cmp::Reverse(w.chars().count()));
    by_length.truncate(SIGNATURE_WORDS);
    by_length.sort();
    by_length.join("|")
}

/// Whitespace tokens, lowercased, with leading and trailing punctuation removed.
pub fn whitespace_tokens(text: &str) -> Vec<String> {
    text.split_whitespace()
        .map(|t| t.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase())
        .filter(|t| !t.is_empty())
        .collect()
}

/// Jaccard ratio of two word sets; 0 when both are empty.
pub fn overlap_ratio(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    let union = a.union(b).count();
    if union == 0 {
        return 0.0;
    }
    a.intersection(b).count() as f64 / union as f64
}
