//! Schema-agnostic DOI detection, normalization, and validation.

use std::sync::LazyLock;

use regex::Regex;
use tracing::trace;

/// Bare DOIs: `10.XXXX/suffix`, including nested registrants like `10.1000.10/example`.
/// The preceding-character check (to reject IP-like patterns) is done in code
/// since the `regex` crate doesn't support lookbehind.
#[allow(clippy::expect_used)]
static DOI_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"10\.\d{4,9}(?:\.\d+)*/[^\s<>"'\]\[]+"#).expect("DOI regex is valid") // Static pattern, safe to panic
});

/// A DOI found in free text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DoiMatch {
    /// Byte offset of the first DOI character
    pub start: usize,
    /// Byte offset one past the last kept DOI character (after cleanup)
    pub end: usize,
    /// Validated DOI, e.g. `10.1038/nature12373`
    pub doi: String,
}

/// Finds every valid DOI in `text`, in order of appearance.
#[must_use]
pub fn find_dois(text: &str) -> Vec<DoiMatch> {
    let mut found = Vec::new();
    for m in DOI_PATTERN.find_iter(text) {
        // Reject IP-like (`192.10.1234/24`) and versioned (`v10.1234/rc1`) candidates
        if m.start() > 0 {
            let prev_byte = text.as_bytes()[m.start() - 1];
            if prev_byte.is_ascii_alphanumeric() || prev_byte == b'.' {
                continue;
            }
        }

        let cleaned = clean_doi(m.as_str());
        if let Some(doi) = validate_doi(&cleaned) {
            trace!(doi = %doi, "found DOI");
            found.push(DoiMatch {
                start: m.start(),
                end: m.start() + cleaned.len(),
                doi,
            });
        }
    }
    found
}

/// Returns the first valid DOI in `text`.
#[must_use]
pub fn find_doi(text: &str) -> Option<String> {
    find_dois(text).into_iter().next().map(|m| m.doi)
}

/// Normalizes a DOI taken from a dedicated element such as `<pub-id pub-id-type="doi">`.
///
/// Strips resolver URL and `doi:` prefixes, URL-decodes, and validates.
#[must_use]
pub fn normalize_doi(input: &str) -> Option<String> {
    let mut doi = input.trim();

    for prefix in &[
        "https://doi.org/",
        "http://doi.org/",
        "https://dx.doi.org/",
        "http://dx.doi.org/",
        "info:doi/",
    ] {
        if let Some(stripped) = doi.strip_prefix(prefix) {
            doi = stripped;
            break;
        }
    }

    if doi.len() >= 4 && doi.is_char_boundary(4) && doi[..4].eq_ignore_ascii_case("doi:") {
        doi = doi[4..].trim_start();
    }

    let decoded = match urlencoding::decode(doi) {
        Ok(decoded) => decoded.trim().to_string(),
        Err(_) => doi.trim().to_string(),
    };
    validate_doi(&clean_doi(&decoded))
}

/// Compares two DOIs the way registries do (case-insensitively).
#[must_use]
pub fn same_doi(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b)
}

/// Validates `10.<registrant>/<suffix>` with a 4+ digit first registrant segment.
fn validate_doi(doi: &str) -> Option<String> {
    let rest = doi.strip_prefix("10.")?;
    let (registrant, suffix) = rest.split_once('/')?;
    let first_segment = registrant.split('.').next().unwrap_or("");
    if first_segment.len() < 4 || !first_segment.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    if suffix.is_empty() {
        return None;
    }
    Some(doi.to_string())
}

/// Strips sentence punctuation and unmatched closing brackets from the end of a DOI.
fn clean_doi(raw: &str) -> String {
    let mut result = raw.to_string();
    let Some(slash_pos) = result.find('/') else {
        return result;
    };

    loop {
        let Some(last) = result.chars().last() else {
            break;
        };
        let suffix = &result[slash_pos + 1..];
        let strip = match last {
            '.' | ',' | ';' | ':' | '!' | '?' => true,
            ')' => count(suffix, ')') > count(suffix, '('),
            '}' => count(suffix, '}') > count(suffix, '{'),
            _ => false,
        };
        if !strip || result.len() <= slash_pos + 1 {
            break;
        }
        result.pop();
    }

    result
}

fn count(s: &str, needle: char) -> usize {
    s.chars().filter(|&c| c == needle).count()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_find_doi_bare_doi_detected() {
        assert_eq!(find_doi("10.1234/example").unwrap(), "10.1234/example");
    }

    #[test]
    fn test_find_doi_nested_registrant_detected() {
        assert_eq!(find_doi("10.1000.10/example").unwrap(), "10.1000.10/example");
    }

    #[test]
    fn test_find_doi_in_reference_text() {
        let text = "Smith J. (2020). Data paper. Ecology 5, 1-2. https://doi.org/10.1002/ece3.4466.";
        assert_eq!(find_doi(text).unwrap(), "10.1002/ece3.4466");
    }

    #[test]
    fn test_find_dois_reports_offsets_after_cleanup() {
        let text = "Data at 10.5061/dryad.abc12, see";
        let found = find_dois(text);
        assert_eq!(found.len(), 1);
        assert_eq!(&text[found[0].start..found[0].end], "10.5061/dryad.abc12");
    }

    #[test]
    fn test_find_doi_in_parentheses() {
        assert_eq!(find_doi("(10.1234/example)").unwrap(), "10.1234/example");
    }

    #[test]
    fn test_find_doi_parens_in_suffix_preserved() {
        assert_eq!(
            find_doi("10.1002/(SICI)1097-4636").unwrap(),
            "10.1002/(SICI)1097-4636"
        );
    }

    #[test]
    fn test_find_doi_stops_at_closing_bracket() {
        assert_eq!(find_doi("[10.1234/abc]").unwrap(), "10.1234/abc");
    }

    #[test]
    fn test_find_doi_ignores_version_number() {
        assert!(find_doi("v10.1234/rc1").is_none());
    }

    #[test]
    fn test_find_doi_ignores_ip_like_pattern() {
        assert!(find_doi("192.10.1234/24").is_none());
    }

    #[test]
    fn test_find_doi_ignores_short_registrant() {
        assert!(find_doi("rated 10.5/10").is_none());
        assert!(find_doi("10.12/something").is_none());
    }

    #[test]
    fn test_normalize_doi_strips_prefixes() {
        assert_eq!(normalize_doi("https://doi.org/10.1234/x").unwrap(), "10.1234/x");
        assert_eq!(normalize_doi("DOI: 10.1234/x").unwrap(), "10.1234/x");
        assert_eq!(normalize_doi("info:doi/10.1002/ece3.1").unwrap(), "10.1002/ece3.1");
    }

    #[test]
    fn test_normalize_doi_url_decodes() {
        assert_eq!(
            normalize_doi("https://doi.org/10.1002%2F(SICI)1097-4636").unwrap(),
            "10.1002/(SICI)1097-4636"
        );
    }

    #[test]
    fn test_normalize_doi_rejects_garbage() {
        assert!(normalize_doi("not a doi").is_none());
        assert!(normalize_doi("10.1234/").is_none());
    }

    #[test]
    fn test_same_doi_is_case_insensitive() {
        assert!(same_doi("10.1002/ECE3.4466", "10.1002/ece3.4466"));
    }
}
