//! Schema-dispatched bibliography extraction.
//!
//! Each schema has one strategy module that walks its bibliography markup and
//! yields [`EntryCandidate`]s. A single shared pass then normalizes text,
//! assigns labels and ids, and detects DOIs, so every strategy produces
//! entries with identical guarantees.
//!
//! # Example
//!
//! ```
//! use citegraph_core::{Document, extract};
//!
//! let doc = Document::parse(
//!     "example",
//!     r#"<TEI><text><back><listBibl>
//!          <biblStruct xml:id="b0"><note type="raw_reference">Doe (2020). Paper. doi:10.1234/abcd.</note></biblStruct>
//!        </listBibl></back></text></TEI>"#,
//! );
//! let outcome = extract(&doc, doc.schema());
//! assert_eq!(outcome.entries.len(), 1);
//! assert_eq!(outcome.entries[0].id(), "b0");
//! assert_eq!(outcome.entries[0].label(), "1");
//! assert_eq!(outcome.entries[0].doi(), Some("10.1234/abcd"));
//! ```

mod bioc;
mod doi;
mod entry;
mod fallback;
mod jats;
mod tei;
mod wiley;

pub use doi::{DoiMatch, find_doi, find_dois, normalize_doi, same_doi};
pub use entry::{BibliographyEntry, LabelOrigin, normalize_label};

use std::collections::HashSet;

use tracing::{debug, info, trace};

use crate::document::{Document, collapse_whitespace};
use crate::schema::SchemaKind;
use crate::warning::CitationWarning;

use entry::EntryCandidate;

/// Extraction strategy, selected once per document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// `ref-list` / `ref`
    Jats,
    /// `listBibl` / `biblStruct`
    Tei,
    /// `bib` / `citation`
    Wiley,
    /// Reference-typed `passage` elements
    Bioc,
    /// Every top-level child of the bibliography container, or the items of
    /// the last reference-titled section
    Fallback,
}

impl Strategy {
    /// Maps a schema to its strategy; [`SchemaKind::Unknown`] uses the fallback.
    #[must_use]
    pub fn for_schema(schema: SchemaKind) -> Self {
        match schema {
            SchemaKind::Jats => Self::Jats,
            SchemaKind::Tei => Self::Tei,
            SchemaKind::Wiley => Self::Wiley,
            SchemaKind::Bioc => Self::Bioc,
            SchemaKind::Unknown => Self::Fallback,
        }
    }

    fn collect(self, document: &Document) -> Vec<EntryCandidate> {
        match self {
            Self::Jats => jats::collect(document),
            Self::Tei => tei::collect(document),
            Self::Wiley => wiley::collect(document),
            Self::Bioc => bioc::collect(document),
            Self::Fallback => fallback::collect_document(document),
        }
    }
}

/// Result of [`extract`]: entries are always present, possibly empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionOutcome {
    /// Entries in document order
    pub entries: Vec<BibliographyEntry>,
    /// Extraction diagnostics
    pub warnings: Vec<CitationWarning>,
    /// Strategy that produced the entries
    pub strategy: Strategy,
}

/// Extracts the bibliography of `document` using the strategy for `schema`.
///
/// When the strategy finds nothing but the bibliography container still has
/// entry-like children, the fallback strategy is used and an
/// [`CitationWarning::ExtractionStrategyMismatch`] is recorded.
#[tracing::instrument(skip(document), fields(document_id = document.id()))]
#[must_use]
pub fn extract(document: &Document, schema: SchemaKind) -> ExtractionOutcome {
    let mut warnings = Vec::new();
    let mut strategy = Strategy::for_schema(schema);
    let mut candidates = strategy.collect(document);

    if candidates.is_empty() && strategy != Strategy::Fallback {
        if let Some(container) = document
            .bibliography_section()
            .filter(|container| fallback::has_entry_like_children(container))
        {
            info!(
                container = container.local_name(),
                "schema strategy found no entries; using fallback"
            );
            warnings.push(CitationWarning::ExtractionStrategyMismatch {
                schema,
                container: container.local_name().to_string(),
            });
            candidates = fallback::collect(container);
            strategy = Strategy::Fallback;
        }
    }

    let entries = finalize(candidates, schema, &mut warnings);
    if entries.is_empty() && schema != SchemaKind::Unknown {
        warnings.push(CitationWarning::EmptyBibliography { schema });
    }

    debug!(entries = entries.len(), ?strategy, "bibliography extracted");
    ExtractionOutcome {
        entries,
        warnings,
        strategy,
    }
}

/// Shared post-processing applied to every strategy's candidates.
fn finalize(
    candidates: Vec<EntryCandidate>,
    schema: SchemaKind,
    warnings: &mut Vec<CitationWarning>,
) -> Vec<BibliographyEntry> {
    let mut seen_ids: HashSet<String> = HashSet::with_capacity(candidates.len());
    let mut entries = Vec::with_capacity(candidates.len());

    for candidate in candidates {
        let raw_text = collapse_whitespace(&candidate.raw_text);
        if raw_text.is_empty() {
            trace!(id = ?candidate.native_id, "dropping entry with empty text");
            continue;
        }
        let position = entries.len() + 1;

        let (label, label_origin) = match candidate.label.as_deref().and_then(normalize_label) {
            Some(label) => (label, LabelOrigin::Explicit),
            None => (position.to_string(), LabelOrigin::Positional),
        };

        let base_id = candidate
            .native_id
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| format!("{schema}-ref-{position}"));
        let id = if seen_ids.contains(&base_id) {
            let renamed = unique_id(&base_id, position, &seen_ids);
            debug!(id = %base_id, renamed = %renamed, "duplicate entry id");
            warnings.push(CitationWarning::DuplicateEntryId {
                id: base_id,
                renamed_to: renamed.clone(),
            });
            renamed
        } else {
            base_id
        };
        seen_ids.insert(id.clone());

        let doi = candidate
            .doi
            .as_deref()
            .and_then(normalize_doi)
            .or_else(|| find_doi(&raw_text));

        entries.push(BibliographyEntry::new(
            id,
            label,
            label_origin,
            raw_text,
            doi,
            schema,
        ));
    }

    entries
}

fn unique_id(base: &str, position: usize, taken: &HashSet<String>) -> String {
    let mut candidate = format!("{base}-{position}");
    let mut attempt = 2;
    while taken.contains(&candidate) {
        candidate = format!("{base}-{position}-{attempt}");
        attempt += 1;
    }
    candidate
}
