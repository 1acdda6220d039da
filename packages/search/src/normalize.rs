//! Text normalization shared by the indexer and the query expander.
//!
//! The same pipeline runs on document names, URLs, catalog aliases and
//! queries, so "São Cristóvão", "sao-cristovao" and "S.Cristovao" all
//! collapse to comparable token sequences.

use std::sync::LazyLock;

use regex::Regex;
use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

/// Articles and conjunctions dropped by [`tokenize`].
pub const STOPWORDS: &[&str] = &["de", "da", "do", "das", "dos", "e", "a", "o", "as", "os", "the"];

/// `.` and `_` separate words in file names.
static DOT_UNDERSCORE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[._]").expect("valid regex"));

/// Regex to collapse runs of whitespace into a single space.
static WHITESPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Everything that is not a letter, digit or whitespace.
static NON_WORD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\p{L}\p{N}\s]").expect("valid regex"));

/// Normalizes free text for substring comparison.
///
/// The pipeline:
/// 1. Lowercase
/// 2. Decompose (NFD) and drop combining marks (`ã`→`a`, `ç`→`c`)
/// 3. Replace `.` and `_` with spaces
/// 4. Collapse whitespace
/// 5. Trim
///
/// Hyphens and slashes are kept so `-03-25` style dates survive.
#[must_use]
pub fn normalize(input: &str) -> String {
    let folded: String = input
        .to_lowercase()
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect();
    let spaced = DOT_UNDERSCORE_RE.replace_all(&folded, " ");
    WHITESPACE_RE.replace_all(&spaced, " ").trim().to_string()
}

/// Splits text into normalized word tokens, dropping [`STOPWORDS`].
#[must_use]
pub fn tokenize(input: &str) -> Vec<String> {
    let normalized = normalize(input).replace(['-', '/'], " ");
    let words = NON_WORD_RE.replace_all(&normalized, " ");
    words
        .split_whitespace()
        .filter(|token| !STOPWORDS.contains(token))
        .map(str::to_string)
        .collect()
}

/// Tokenizes and re-joins a phrase so it can be compared against a slug.
///
/// Returns an empty string when nothing but stopwords and punctuation is
/// left.
#[must_use]
pub fn phrase(input: &str) -> String {
    tokenize(input).join(" ")
}

/// Builds the space-bounded slug of a text: `" tok1 tok2 "`.
///
/// The leading and trailing space make ` word ` containment a whole-word
/// test even at the edges.
#[must_use]
pub fn slug(input: &str) -> String {
    let tokens = tokenize(input);
    if tokens.is_empty() {
        return " ".to_string();
    }
    format!(" {} ", tokens.join(" "))
}

/// Returns `true` if `word` (already normalized, may contain spaces) occurs
/// as a whole word sequence in `slug`.
#[must_use]
pub fn contains_word(slug: &str, word: &str) -> bool {
    !word.is_empty() && slug.contains(&format!(" {word} "))
}

/// Returns `true` if `text`, once tokenized, occurs as a whole phrase in
/// `slug`. A phrase with no tokens never matches.
#[must_use]
pub fn contains_phrase(slug: &str, text: &str) -> bool {
    contains_word(slug, &phrase(text))
}
