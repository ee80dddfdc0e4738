//! Refusal detection on a completed page response.
//!
//! Matching is strict: the whole response, after normalisation, must equal
//! the sentinel. A substantive answer that merely quotes the phrase is not a
//! refusal, and neither is the sentinel wrapped in extra commentary.

/// The normalised phrase the template asks the model to reply with.
pub const REFUSAL_SENTINEL: &str = "i cannot complete this task";

/// Returns `true` if `response` is exactly the refusal sentinel.
///
/// Normalisation: trim surrounding whitespace, drop the trailing run of
/// `.` and `!` characters, lower-case. No other punctuation is stripped.
pub fn is_refusal(response: &str) -> bool {
    response
        .trim()
        .trim_end_matches(['.', '!'])
        .to_lowercase()
        == REFUSAL_SENTINEL
}
