//! Corpus-level coverage accounting.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use serde::Serialize;

use crate::graph::CitationGraph;
use crate::schema::SchemaKind;
use crate::warning::CitationWarning;

/// Number of failing document ids kept for the summary.
pub const FAILED_SAMPLE_LIMIT: usize = 10;

/// Per-schema document counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SchemaCounts {
    /// Documents with at least one bibliography entry
    pub succeeded: usize,
    /// Documents with no entries
    pub failed: usize,
}

/// How much of a corpus yielded a usable bibliography.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CoverageReport {
    total: usize,
    with_entries: usize,
    unreadable: usize,
    empty_bibliography: usize,
    timed_out: usize,
    per_schema: BTreeMap<SchemaKind, SchemaCounts>,
    failed_samples: Vec<String>,
}

impl CoverageReport {
    /// Creates an empty report.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts one processed document.
    pub fn record(&mut self, graph: &CitationGraph) {
        self.total += 1;
        let counts = self.per_schema.entry(graph.schema).or_default();
        if graph.bibliography.is_empty() {
            counts.failed += 1;
            self.sample_failure(&graph.document_id);
        } else {
            counts.succeeded += 1;
            self.with_entries += 1;
        }

        if graph.has_warning(|w| matches!(w, CitationWarning::EmptyBibliography { .. })) {
            self.empty_bibliography += 1;
        }
        if graph.has_warning(|w| matches!(w, CitationWarning::Timeout { .. })) {
            self.timed_out += 1;
        }
    }

    /// Counts a file that could not be read.
    pub fn record_unreadable(&mut self, document_id: &str) {
        self.total += 1;
        self.unreadable += 1;
        self.sample_failure(document_id);
    }

    fn sample_failure(&mut self, document_id: &str) {
        if self.failed_samples.len() < FAILED_SAMPLE_LIMIT {
            self.failed_samples.push(document_id.to_string());
        }
    }

    /// Documents counted, including unreadable files.
    #[must_use]
    pub fn total(&self) -> usize {
        self.total
    }

    /// Documents with at least one bibliography entry.
    #[must_use]
    pub fn with_entries(&self) -> usize {
        self.with_entries
    }

    /// Files that could not be read.
    #[must_use]
    pub fn unreadable(&self) -> usize {
        self.unreadable
    }

    /// Documents whose detected schema had an empty bibliography.
    #[must_use]
    pub fn empty_bibliography(&self) -> usize {
        self.empty_bibliography
    }

    /// Documents abandoned after the time budget.
    #[must_use]
    pub fn timed_out(&self) -> usize {
        self.timed_out
    }

    /// Counts for one schema.
    #[must_use]
    pub fn schema_counts(&self, schema: SchemaKind) -> SchemaCounts {
        self.per_schema.get(&schema).copied().unwrap_or_default()
    }

    /// First failing document ids, in processing order.
    #[must_use]
    pub fn failed_samples(&self) -> &[String] {
        &self.failed_samples
    }

    /// Fraction of documents with a detected schema that yielded at least one entry.
    ///
    /// Returns 0.0 when no document had a detectable schema.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn coverage(&self) -> f64 {
        let (detected, succeeded) = self
            .per_schema
            .iter()
            .filter(|(schema, _)| **schema != SchemaKind::Unknown)
            .fold((0, 0), |(detected, succeeded), (_, counts)| {
                (
                    detected + counts.succeeded + counts.failed,
                    succeeded + counts.succeeded,
                )
            });
        if detected == 0 {
            0.0
        } else {
            succeeded as f64 / detected as f64
        }
    }

    /// Renders a multi-line human summary.
    #[must_use]
    pub fn format_summary(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "Processed {} documents: {} with entries, {} unreadable, {} timed out",
            self.total, self.with_entries, self.unreadable, self.timed_out
        );
        let _ = writeln!(out, "Coverage: {:.1}%", self.coverage() * 100.0);
        for schema in SchemaKind::ALL {
            let counts = self.schema_counts(schema);
            if counts.succeeded + counts.failed == 0 {
                continue;
            }
            let _ = writeln!(
                out,
                "  {:<8} {:>6} ok {:>6} empty",
                schema.as_str(),
                counts.succeeded,
                counts.failed
            );
        }
        if self.empty_bibliography > 0 {
            let _ = writeln!(out, "Empty bibliographies: {}", self.empty_bibliography);
        }
        if !self.failed_samples.is_empty() {
            let _ = writeln!(out, "Failed samples: {}", self.failed_samples.join(", "));
        }
        out
    }
}
