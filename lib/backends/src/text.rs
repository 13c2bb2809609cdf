//! Tokenization and hashing helpers shared by the text embeddings

use std::collections::hash_map::DefaultHasher;
use std::collections::BTreeSet;
use std::hash::{Hash, Hasher};

/// Split text into word tokens
///
/// Splits on whitespace and ASCII punctuation and drops single-character tokens.
#[inline]
pub fn tokenize(text: &str, lowercase: bool) -> Vec<String> {
    let normalized = if lowercase {
        text.to_lowercase()
    } else {
        text.to_string()
    };
    normalized
        .split(|c: char| c.is_whitespace() || c.is_ascii_punctuation())
        .map(|s| s.trim_matches(|c: char| !c.is_alphanumeric()).to_string())
        .filter(|s| s.chars().count() > 1)
        .collect()
}

/// Distinct character trigrams of a string, padded with two spaces on each side
pub fn trigrams(s: &str) -> BTreeSet<String> {
    let padded = format!("  {}  ", s);
    let chars: Vec<char> = padded.chars().collect();
    chars.windows(3).map(|w| w.iter().collect()).collect()
}

/// Map a token to a bucket in `0..dim`
#[inline]
pub fn hash_bucket(token: &str, dim: usize) -> usize {
    let mut hasher = DefaultHasher::new();
    token.hash(&mut hasher);
    (hasher.finish() as usize) % dim
}
