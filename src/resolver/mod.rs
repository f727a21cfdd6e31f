//! Resolution of citation pointers to bibliography entries.
//!
//! A [`ReferenceResolver`] is built once per document from its extracted
//! entries. Resolution is a pure function of the entry list and the pointer
//! list: invoking it twice yields identical output, including ordering.
//!
//! Resolution order per pointer:
//!
//! 1. Explicit target ids are looked up by entry id ([`ResolutionMethod::DirectId`]).
//! 2. Otherwise ordinal tokens are normalized and matched against entry labels,
//!    in ascending numeric order ([`ResolutionMethod::LabelMatch`] for one
//!    token, [`ResolutionMethod::RangeExpansion`] for several).
//! 3. If nothing matched the pointer is kept with no entries
//!    ([`ResolutionMethod::Unresolved`]).
//!
//! # Example
//!
//! ```
//! use citegraph_core::{Document, PointerScanner, ReferenceResolver, ResolutionMethod, extract};
//!
//! let doc = Document::parse(
//!     "example",
//!     r#"<article><body><p>Prior work [1-2].</p></body><back><ref-list>
//!          <ref id="a"><label>1</label><mixed-citation>First.</mixed-citation></ref>
//!          <ref id="b"><label>2</label><mixed-citation>Second.</mixed-citation></ref>
//!        </ref-list></back></article>"#,
//! );
//! let entries = extract(&doc, doc.schema()).entries;
//! let pointers = PointerScanner::default().scan(doc.body());
//! let citations = ReferenceResolver::new(&entries).resolve(&pointers);
//! assert_eq!(citations[0].resolution_method(), ResolutionMethod::RangeExpansion);
//! assert_eq!(citations[0].entry_ids().collect::<Vec<_>>(), vec!["a", "b"]);
//! ```

mod map;

pub use map::normalize_ordinal;

use std::collections::HashSet;

use serde::{Serialize, Serializer};
use tracing::trace;

use crate::bibliography::BibliographyEntry;
use crate::pointer::PointerOccurrence;
use crate::warning::CitationWarning;

use map::BibliographyMap;

/// How a pointer was matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResolutionMethod {
    /// Explicit target id equal to an entry id
    DirectId,
    /// Single ordinal token equal to an entry label
    LabelMatch,
    /// Several ordinal tokens, each matched by label
    RangeExpansion,
    /// No entry matched
    Unresolved,
}

/// A pointer together with the entries it denotes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedCitation {
    pointer: PointerOccurrence,
    #[serde(rename = "entry_ids", serialize_with = "serialize_entry_ids")]
    entries: Vec<BibliographyEntry>,
    resolution_method: ResolutionMethod,
}

impl ResolvedCitation {
    /// The originating pointer, always retained.
    #[must_use]
    pub fn pointer(&self) -> &PointerOccurrence {
        &self.pointer
    }

    /// Matched entries; empty when unresolved.
    #[must_use]
    pub fn entries(&self) -> &[BibliographyEntry] {
        &self.entries
    }

    /// Ids of the matched entries, in order.
    pub fn entry_ids(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(BibliographyEntry::id)
    }

    /// How the entries were matched.
    #[must_use]
    pub fn resolution_method(&self) -> ResolutionMethod {
        self.resolution_method
    }

    /// Returns true if no entry matched.
    #[must_use]
    pub fn is_unresolved(&self) -> bool {
        self.resolution_method == ResolutionMethod::Unresolved
    }
}

fn serialize_entry_ids<S: Serializer>(
    entries: &[BibliographyEntry],
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_seq(entries.iter().map(BibliographyEntry::id))
}

/// Resolves pointers against one document's bibliography.
#[derive(Debug)]
pub struct ReferenceResolver<'a> {
    map: BibliographyMap<'a>,
}

impl<'a> ReferenceResolver<'a> {
    /// Indexes `entries` by id and normalized label.
    ///
    /// When two entries share a label the first in document order wins; see
    /// [`ReferenceResolver::warnings`].
    #[must_use]
    pub fn new(entries: &'a [BibliographyEntry]) -> Self {
        Self {
            map: BibliographyMap::build(entries),
        }
    }

    /// Warnings raised while indexing (duplicate labels).
    #[must_use]
    pub fn warnings(&self) -> &[CitationWarning] {
        self.map.warnings()
    }

    /// Resolves every pointer, preserving input order.
    #[must_use]
    pub fn resolve(&self, pointers: &[PointerOccurrence]) -> Vec<ResolvedCitation> {
        self.resolve_with_warnings(pointers).0
    }

    /// Resolves every pointer and reports tokens or ids that matched nothing.
    #[tracing::instrument(skip_all, fields(pointers = pointers.len()))]
    #[must_use]
    pub fn resolve_with_warnings(
        &self,
        pointers: &[PointerOccurrence],
    ) -> (Vec<ResolvedCitation>, Vec<CitationWarning>) {
        let mut warnings = Vec::new();
        let citations = pointers
            .iter()
            .map(|pointer| {
                let (citation, missing) = self.resolve_one(pointer);
                if !missing.is_empty() {
                    trace!(raw = pointer.raw_text(), ?missing, "pointer not fully resolved");
                    warnings.push(CitationWarning::UnresolvedPointer {
                        raw_text: pointer.raw_text().to_string(),
                        span: pointer.span(),
                        missing,
                    });
                }
                citation
            })
            .collect();
        (citations, warnings)
    }

    fn resolve_one(&self, pointer: &PointerOccurrence) -> (ResolvedCitation, Vec<String>) {
        let mut matched: Vec<&BibliographyEntry> = Vec::new();
        let mut missing = Vec::new();

        let method = if pointer.explicit_target_ids().is_empty() {
            let tokens = ordered_tokens(pointer.ordinal_tokens());
            for token in &tokens {
                match self.map.by_label(token) {
                    Some(entry) => matched.push(entry),
                    None => missing.push(token.clone()),
                }
            }
            if tokens.len() > 1 {
                ResolutionMethod::RangeExpansion
            } else {
                ResolutionMethod::LabelMatch
            }
        } else {
            for id in pointer.explicit_target_ids() {
                match self.map.by_id(id) {
                    Some(entry) => matched.push(entry),
                    None => missing.push(id.clone()),
                }
            }
            ResolutionMethod::DirectId
        };

        let mut seen = HashSet::new();
        let entries: Vec<BibliographyEntry> = matched
            .into_iter()
            .filter(|entry| seen.insert(entry.id()))
            .cloned()
            .collect();

        let resolution_method = if entries.is_empty() {
            ResolutionMethod::Unresolved
        } else {
            method
        };

        let citation = ResolvedCitation {
            pointer: pointer.clone(),
            entries,
            resolution_method,
        };
        (citation, missing)
    }
}

/// Normalizes, de-duplicates, and sorts tokens: numerals ascending, then others.
fn ordered_tokens(tokens: &[String]) -> Vec<String> {
    let mut normalized: Vec<String> = tokens
        .iter()
        .map(|token| normalize_ordinal(token))
        .filter(|token| !token.is_empty())
        .collect();
    normalized.sort_by(|a, b| token_key(a).cmp(&token_key(b)));
    normalized.dedup();
    normalized
}

fn token_key(token: &str) -> (u8, u64, &str) {
    match token.parse::<u64>() {
        Ok(n) => (0, n, token),
        Err(_) => (1, 0, token),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::bibliography::LabelOrigin;
    use crate::document::Span;
    use crate::pointer::PointerForm;
    use crate::schema::SchemaKind;

    fn entry(id: &str, label: &str) -> BibliographyEntry {
        BibliographyEntry::new(
            id.to_string(),
            label.to_string(),
            LabelOrigin::Explicit,
            format!("Reference {id}"),
            None,
            SchemaKind::Jats,
        )
    }

    fn numbered(count: usize) -> Vec<BibliographyEntry> {
        (1..=count)
            .map(|n| entry(&format!("r{n}"), &n.to_string()))
            .collect()
    }

    fn bracket(raw: &str, tokens: &[&str]) -> PointerOccurrence {
        PointerOccurrence::new(
            Span::new(0, raw.chars().count()),
            raw,
            Vec::new(),
            tokens.iter().map(|t| (*t).to_string()).collect(),
            PointerForm::Bracket,
        )
    }

    fn xref(ids: &[&str]) -> PointerOccurrence {
        PointerOccurrence::new(
            Span::new(20, 23),
            "[2]",
            ids.iter().map(|t| (*t).to_string()).collect(),
            Vec::new(),
            PointerForm::CrossReference,
        )
    }

    #[test]
    fn test_resolve_range_returns_entries_ascending() {
        let entries = numbered(3);
        let resolver = ReferenceResolver::new(&entries);
        let resolved = resolver.resolve(&[bracket("[3,1-2]", &["3", "1", "2"])]);
        assert_eq!(resolved[0].resolution_method(), ResolutionMethod::RangeExpansion);
        assert_eq!(resolved[0].entry_ids().collect::<Vec<_>>(), vec!["r1", "r2", "r3"]);
    }

    #[test]
    fn test_resolve_single_token_is_label_match() {
        let entries = numbered(3);
        let resolved = ReferenceResolver::new(&entries).resolve(&[bracket("[02]", &["02"])]);
        assert_eq!(resolved[0].resolution_method(), ResolutionMethod::LabelMatch);
        assert_eq!(resolved[0].entry_ids().collect::<Vec<_>>(), vec!["r2"]);
    }

    #[test]
    fn test_resolve_explicit_target_is_direct_id() {
        let entries = numbered(3);
        let resolver = ReferenceResolver::new(&entries);
        let resolved = resolver.resolve(&[xref(&["r3"]), bracket("[2]", &["2"])]);
        assert_eq!(resolved[0].resolution_method(), ResolutionMethod::DirectId);
        assert_eq!(resolved[0].entry_ids().collect::<Vec<_>>(), vec!["r3"]);
        assert_eq!(resolved[1].entry_ids().collect::<Vec<_>>(), vec!["r2"]);
    }

    #[test]
    fn test_resolve_missing_label_is_unresolved_and_keeps_pointer() {
        let entries = numbered(5);
        let resolver = ReferenceResolver::new(&entries);
        let (resolved, warnings) = resolver.resolve_with_warnings(&[bracket("[7]", &["7"])]);
        assert!(resolved[0].is_unresolved());
        assert!(resolved[0].entries().is_empty());
        assert_eq!(resolved[0].pointer().raw_text(), "[7]");
        assert_eq!(resolved[0].pointer().span(), Span::new(0, 3));
        assert_eq!(
            warnings,
            vec![CitationWarning::UnresolvedPointer {
                raw_text: "[7]".to_string(),
                span: Span::new(0, 3),
                missing: vec!["7".to_string()],
            }]
        );
    }

    #[test]
    fn test_resolve_partial_match_keeps_matched_and_warns() {
        let entries = numbered(2);
        let resolver = ReferenceResolver::new(&entries);
        let (resolved, warnings) =
            resolver.resolve_with_warnings(&[bracket("[1-3]", &["1", "2", "3"])]);
        assert_eq!(resolved[0].resolution_method(), ResolutionMethod::RangeExpansion);
        assert_eq!(resolved[0].entries().len(), 2);
        assert!(matches!(
            &warnings[0],
            CitationWarning::UnresolvedPointer { missing, .. } if missing == &vec!["3".to_string()]
        ));
    }

    #[test]
    fn test_resolve_unknown_target_id_is_unresolved() {
        let entries = numbered(2);
        let resolved = ReferenceResolver::new(&entries).resolve(&[xref(&["missing"])]);
        assert!(resolved[0].is_unresolved());
    }

    #[test]
    fn test_duplicate_label_first_entry_wins() {
        let entries = vec![entry("a", "1"), entry("b", "1")];
        let resolver = ReferenceResolver::new(&entries);
        assert_eq!(
            resolver.warnings(),
            [CitationWarning::DuplicateLabel {
                label: "1".to_string(),
                kept_id: "a".to_string(),
                ignored_id: "b".to_string(),
            }]
        );
        let resolved = resolver.resolve(&[bracket("[1]", &["1"])]);
        assert_eq!(resolved[0].entry_ids().collect::<Vec<_>>(), vec!["a"]);
    }

    #[test]
    fn test_resolve_is_idempotent() {
        let entries = numbered(4);
        let resolver = ReferenceResolver::new(&entries);
        let pointers = vec![
            bracket("[4]", &["4"]),
            bracket("[1-3]", &["1", "2", "3"]),
            xref(&["r2", "r1"]),
        ];
        let first = resolver.resolve(&pointers);
        let second = resolver.resolve(&pointers);
        assert_eq!(first, second);
        assert_eq!(first[2].entry_ids().collect::<Vec<_>>(), vec!["r2", "r1"]);
    }

    #[test]
    fn test_resolved_citation_serializes_entry_ids() {
        let entries = numbered(1);
        let resolved = ReferenceResolver::new(&entries).resolve(&[bracket("[1]", &["1"])]);
        let json = serde_json::to_value(&resolved[0]).unwrap();
        assert_eq!(json["entry_ids"], serde_json::json!(["r1"]));
        assert_eq!(json["resolution_method"], "label-match");
        assert_eq!(json["pointer"]["form"], "bracket");
    }
}
