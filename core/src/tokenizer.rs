use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // Letters of any script and decimal digits; everything else separates tokens.
    static ref RE: Regex = Regex::new(r"[\p{L}\p{Nd}]+").expect("valid regex");
}

/// Tokenize document text into (token, position) pairs.
///
/// Every character that is not a letter or a decimal digit acts as a separator.
/// Tokens keep their case and appear in text order, duplicates included, so the
/// position of a token is its 0-based rank within the document.
pub fn tokenize(text: &str) -> Vec<(String, usize)> {
    RE.find_iter(text)
        .enumerate()
        .map(|(pos, mat)| (mat.as_str().to_string(), pos))
        .collect()
}

/// Split query text into keywords on literal spaces only.
///
/// Punctuation is kept, so `"rust,"` will not match the indexed token `rust`.
pub fn split_query(text: &str) -> Vec<&str> {
    text.split(' ').filter(|s| !s.trim().is_empty()).collect()
}
