//! Numeral list and range expansion for bracket and superscript pointers.

use std::sync::LazyLock;

use regex::Regex;

/// One list element: a numeral or a numeral range.
const ITEM: &str = r"\d{1,4}(?:\s*[-\u{2013}\u{2014}]\s*\d{1,4})?";

/// Bracketed numeral lists: `[3]`, `[1,2]`, `[1-3]`, `[1, 3–5; 8]`.
#[allow(clippy::expect_used)]
pub(crate) static BRACKET_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"\[\s*{ITEM}(?:\s*[,;]\s*{ITEM})*\s*\]"))
        .expect("bracket pointer regex is valid") // Static pattern, safe to panic
});

/// Whole-text numeral list, used to decide whether a `<sup>` is a pointer.
#[allow(clippy::expect_used)]
pub(crate) static NUMERAL_LIST_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"^\s*{ITEM}(?:\s*[,;]\s*{ITEM})*\s*$"))
        .expect("numeral list regex is valid") // Static pattern, safe to panic
});

const RANGE_SEPARATORS: [char; 3] = ['-', '\u{2013}', '\u{2014}'];

/// Expands a numeral list into ordinal tokens in written order.
///
/// `"1,3-5"` becomes `["1", "3", "4", "5"]`. A range that descends or spans
/// more than `max_range_span` numbers keeps only its two endpoints.
#[must_use]
pub fn expand_ordinals(list: &str, max_range_span: u32) -> Vec<String> {
    let list = list.trim().trim_start_matches('[').trim_end_matches(']');
    let mut tokens = Vec::new();

    for item in list.split([',', ';']).map(str::trim).filter(|item| !item.is_empty()) {
        let Some((low, high)) = item.split_once(RANGE_SEPARATORS) else {
            tokens.push(item.to_string());
            continue;
        };
        let (low, high) = (low.trim(), high.trim());
        match (low.parse::<u32>(), high.parse::<u32>()) {
            (Ok(first), Ok(last)) if first <= last && last - first <= max_range_span => {
                tokens.extend((first..=last).map(|n| n.to_string()));
            }
            _ => {
                tokens.push(low.to_string());
                tokens.push(high.to_string());
            }
        }
    }

    tokens
}
