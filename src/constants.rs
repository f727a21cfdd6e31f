//! Process-wide read-only vocabulary shared by every schema strategy.

/// Heading tokens that are never bibliography entries on their own.
///
/// Compared case-insensitively after trimming whitespace and a trailing `:` or `.`.
pub const HEADING_TOKENS: &[&str] = &[
    "references",
    "reference",
    "bibliography",
    "literature cited",
    "works cited",
    "references and notes",
];

/// `BioC` `section_type` infon values that mark a reference passage.
pub const REFERENCE_SECTION_TYPES: &[&str] = &["ref", "reference", "references"];

/// Root namespace used by Wiley component XML.
pub const WILEY_NAMESPACE: &str = "http://www.wiley.com/namespaces/wiley";

/// Root namespace used by TEI documents (including GROBID output).
pub const TEI_NAMESPACE: &str = "http://www.tei-c.org/ns/1.0";

/// Element names that contain a bibliography list, in lookup order.
pub const BIBLIOGRAPHY_CONTAINERS: &[&str] = &["ref-list", "listBibl", "bibliography"];

/// Default upper bound on the number of ordinals a single `[a-b]` range expands to.
pub const DEFAULT_MAX_RANGE_SPAN: u32 = 100;

/// Returns true if `text` is exactly a bibliography heading such as "References".
#[must_use]
pub fn is_heading_token(text: &str) -> bool {
    let trimmed = text.trim().trim_end_matches([':', '.']).trim();
    HEADING_TOKENS
        .iter()
        .any(|token| token.eq_ignore_ascii_case(trimmed))
}

/// Returns true if a `BioC` `section_type` value denotes the reference section.
#[must_use]
pub fn is_reference_section_type(value: &str) -> bool {
    let trimmed = value.trim();
    REFERENCE_SECTION_TYPES
        .iter()
        .any(|token| token.eq_ignore_ascii_case(trimmed))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_heading_token_matches_case_insensitively() {
        assert!(is_heading_token("References"));
        assert!(is_heading_token("  REFERENCES: "));
        assert!(is_heading_token("Literature Cited."));
    }

    #[test]
    fn test_is_heading_token_rejects_entry_text() {
        assert!(!is_heading_token("References to prior work, Smith 2020"));
        assert!(!is_heading_token(""));
    }

    #[test]
    fn test_is_reference_section_type_accepts_bioc_markers() {
        assert!(is_reference_section_type("REF"));
        assert!(is_reference_section_type("reference"));
        assert!(!is_reference_section_type("INTRO"));
    }
}
