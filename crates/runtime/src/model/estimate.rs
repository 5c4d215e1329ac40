//! Approximate token counting for backends that report no usage.

/// Tokens assumed per whitespace-separated word.
pub const TOKENS_PER_WORD: f64 = 1.3;

/// Estimate the token count of `text`.
///
/// Counts whitespace-separated words and scales by [`TOKENS_PER_WORD`],
/// rounding down. The result is approximate but deterministic: the same
/// text always yields the same count.
pub fn estimate_tokens(text: &str) -> u32 {
    let words = text.split_whitespace().count();
    (words as f64 * TOKENS_PER_WORD) as u32
}
