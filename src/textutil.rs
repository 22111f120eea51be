use once_cell::sync::Lazy;
use regex::Regex;

static WS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("ws regex"));

/// Canonical form of a text run used for mapping keys and comparisons.
///
/// Leading/trailing whitespace is dropped and inner whitespace runs collapse to a
/// single space. With `case_insensitive` the result is also lowercased; that form is
/// a lookup key only, display values should be normalized without folding.
pub fn normalize_text(text: &str, case_insensitive: bool) -> String {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return String::new();
    }
    let collapsed = WS_RE.replace_all(trimmed, " ");
    if case_insensitive {
        collapsed.to_lowercase()
    } else {
        collapsed.into_owned()
    }
}

/// Splits a trailing 4-digit year off `text`, returning `(prefix, year)`.
///
/// The prefix is returned untrimmed; it may be empty when `text` is the bare year.
pub fn split_trailing_year(text: &str) -> Option<(&str, &str)> {
    let bytes = text.as_bytes();
    if bytes.len() < 4 {
        return None;
    }
    let cut = bytes.len() - 4;
    if !bytes[cut..].iter().all(|b| b.is_ascii_digit()) {
        return None;
    }
    // The last four bytes are ASCII, so `cut` sits on a char boundary.
    Some((&text[..cut], &text[cut..]))
}
