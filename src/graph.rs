//! Per-document pipeline and its serializable result.
//!
//! [`process_document`] never fails: every degraded outcome (repaired markup,
//! unknown schema, empty bibliography, unresolved pointers) becomes a
//! [`CitationWarning`] on the returned [`CitationGraph`].

use std::collections::HashSet;

use serde::Serialize;
use tracing::{debug, info};

use crate::bibliography::{BibliographyEntry, extract, same_doi};
use crate::document::{Document, Span};
use crate::pointer::{PointerScanner, ScanOptions};
use crate::resolver::{ReferenceResolver, ResolvedCitation};
use crate::schema::SchemaKind;
use crate::warning::CitationWarning;

/// A DOI written directly in the body text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DoiMention {
    /// Location in the body text
    pub span: Span,
    /// Validated DOI
    pub doi: String,
    /// Bibliography entry with the same DOI, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entry_id: Option<String>,
}

/// Settings for [`process_document_with`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineOptions {
    /// Pointer scanner settings
    pub scan: ScanOptions,
}

/// Everything extracted from one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CitationGraph {
    /// Input identifier (usually the file stem)
    pub document_id: String,
    /// Detected schema
    pub schema: SchemaKind,
    /// Entries in document order
    pub bibliography: Vec<BibliographyEntry>,
    /// One item per pointer, in body order
    pub resolved_citations: Vec<ResolvedCitation>,
    /// Ids of entries no pointer resolved to
    pub unreferenced_entries: Vec<String>,
    /// DOIs written directly in the body
    pub doi_mentions: Vec<DoiMention>,
    /// Non-fatal diagnostics
    pub warnings: Vec<CitationWarning>,
}

impl CitationGraph {
    /// Creates an empty graph carrying a single warning.
    ///
    /// Used when a document could not be processed at all (timeout, panic).
    #[must_use]
    pub fn abandoned(document_id: impl Into<String>, warning: CitationWarning) -> Self {
        Self {
            document_id: document_id.into(),
            schema: SchemaKind::Unknown,
            bibliography: Vec::new(),
            resolved_citations: Vec::new(),
            unreferenced_entries: Vec::new(),
            doi_mentions: Vec::new(),
            warnings: vec![warning],
        }
    }

    /// Returns true if any warning satisfies `predicate`.
    pub fn has_warning(&self, predicate: impl Fn(&CitationWarning) -> bool) -> bool {
        self.warnings.iter().any(predicate)
    }

    /// Serializes the graph as a single JSON line.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Runs the full pipeline with default options.
#[must_use]
pub fn process_document(document_id: &str, source: &str) -> CitationGraph {
    process_document_with(document_id, source, &PipelineOptions::default())
}

/// Parses, classifies, extracts, scans, and resolves one document.
#[tracing::instrument(skip(source, options), fields(source_len = source.len()))]
#[must_use]
pub fn process_document_with(
    document_id: &str,
    source: &str,
    options: &PipelineOptions,
) -> CitationGraph {
    let document = Document::parse(document_id, source);
    let mut warnings: Vec<CitationWarning> = document
        .markup_issues()
        .iter()
        .map(|issue| CitationWarning::MalformedMarkup {
            detail: issue.to_string(),
        })
        .collect();

    let schema = document.schema();
    if schema == SchemaKind::Unknown {
        warnings.push(CitationWarning::UnknownSchema);
    }

    let extraction = extract(&document, schema);
    warnings.extend(extraction.warnings);
    let bibliography = extraction.entries;

    let scanner = PointerScanner::new(options.scan);
    let pointers = scanner.scan(document.body());

    let resolver = ReferenceResolver::new(&bibliography);
    warnings.extend_from_slice(resolver.warnings());
    let (resolved_citations, resolution_warnings) = resolver.resolve_with_warnings(&pointers);
    warnings.extend(resolution_warnings);

    let referenced: HashSet<&str> = resolved_citations
        .iter()
        .flat_map(ResolvedCitation::entry_ids)
        .collect();
    let unreferenced_entries = bibliography
        .iter()
        .map(BibliographyEntry::id)
        .filter(|id| !referenced.contains(id))
        .map(str::to_string)
        .collect();

    let doi_mentions = scanner
        .scan_dois(document.body())
        .into_iter()
        .map(|(span, doi)| {
            let entry_id = bibliography
                .iter()
                .find(|entry| entry.doi().is_some_and(|known| same_doi(known, &doi)))
                .map(|entry| entry.id().to_string());
            DoiMention { span, doi, entry_id }
        })
        .collect::<Vec<_>>();

    debug!(
        pointers = pointers.len(),
        doi_mentions = doi_mentions.len(),
        "pointers scanned"
    );
    info!(
        %schema,
        entries = bibliography.len(),
        citations = resolved_citations.len(),
        warnings = warnings.len(),
        "document processed"
    );

    CitationGraph {
        document_id: document_id.to_string(),
        schema,
        bibliography,
        resolved_citations,
        unreferenced_entries,
        doi_mentions,
        warnings,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::resolver::ResolutionMethod;

    const JATS: &str = r#"<article><body>
        <p>Earlier work [1-3] and <xref ref-type="bibr" rid="r2">2</xref>; see also [9].</p>
        <p>Data at https://doi.org/10.5555/data.1 and 10.1000/one.</p>
      </body><back><ref-list>
        <ref id="r1"><label>1</label><mixed-citation>One. doi:10.1000/ONE</mixed-citation></ref>
        <ref id="r2"><label>2</label><mixed-citation>Two.</mixed-citation></ref>
        <ref id="r3"><label>3</label><mixed-citation>Three.</mixed-citation></ref>
        <ref id="r4"><label>4</label><mixed-citation>Four.</mixed-citation></ref>
      </ref-list></back></article>"#;

    #[test]
    fn test_process_document_builds_complete_graph() {
        let graph = process_document("10.1234_x", JATS);
        assert_eq!(graph.document_id, "10.1234_x");
        assert_eq!(graph.schema, SchemaKind::Jats);
        assert_eq!(graph.bibliography.len(), 4);

        let methods: Vec<ResolutionMethod> = graph
            .resolved_citations
            .iter()
            .map(ResolvedCitation::resolution_method)
            .collect();
        assert_eq!(
            methods,
            vec![
                ResolutionMethod::RangeExpansion,
                ResolutionMethod::DirectId,
                ResolutionMethod::Unresolved
            ]
        );
        assert_eq!(graph.unreferenced_entries, vec!["r4".to_string()]);
    }

    #[test]
    fn test_process_document_links_doi_mentions() {
        let graph = process_document("x", JATS);
        assert_eq!(graph.doi_mentions.len(), 2);
        assert_eq!(graph.doi_mentions[0].doi, "10.5555/data.1");
        assert_eq!(graph.doi_mentions[0].entry_id, None);
        assert_eq!(graph.doi_mentions[1].entry_id.as_deref(), Some("r1"));
    }

    #[test]
    fn test_process_document_unknown_schema_warns() {
        let graph = process_document("plain", "<html><body><p>No refs [1].</p></body></html>");
        assert_eq!(graph.schema, SchemaKind::Unknown);
        assert!(graph.has_warning(|w| matches!(w, CitationWarning::UnknownSchema)));
        assert!(graph.resolved_citations[0].is_unresolved());
    }

    #[test]
    fn test_process_document_reports_malformed_markup() {
        let graph = process_document(
            "broken",
            r#"<article><body><p>See [1]</body><back><ref-list><ref id="r1"><label>1</label><mixed-citation>One</mixed-citation></ref></ref-list></back>"#,
        );
        assert!(graph.has_warning(|w| matches!(w, CitationWarning::MalformedMarkup { .. })));
        assert_eq!(graph.bibliography.len(), 1);
        assert_eq!(
            graph.resolved_citations[0].entry_ids().collect::<Vec<_>>(),
            vec!["r1"]
        );
    }

    #[test]
    fn test_abandoned_graph_serializes_warning() {
        let graph = CitationGraph::abandoned("slow", CitationWarning::Timeout { seconds: 30 });
        let json: serde_json::Value = serde_json::from_str(&graph.to_json().unwrap()).unwrap();
        assert_eq!(json["document_id"], "slow");
        assert_eq!(json["schema"], "unknown");
        assert_eq!(json["warnings"][0]["kind"], "timeout");
        assert_eq!(json["bibliography"], serde_json::json!([]));
    }
}
