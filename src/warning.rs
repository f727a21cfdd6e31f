//! Non-fatal diagnostics attached to every [`CitationGraph`](crate::CitationGraph).
//!
//! Nothing in the per-document pipeline returns an error; every degraded
//! outcome is one of these warnings instead.

use serde::Serialize;
use thiserror::Error;

use crate::document::Span;
use crate::schema::SchemaKind;

/// A structured, serializable diagnostic.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CitationWarning {
    /// The markup was repaired by the tolerant parser.
    #[error("malformed markup recovered: {detail}")]
    MalformedMarkup {
        /// Description of the repair
        detail: String,
    },

    /// No schema markers were found; extraction ran with the fallback strategy.
    #[error("no schema markers found")]
    UnknownSchema,

    /// The schema was detected but no bibliography entries exist.
    #[error("{schema} bibliography is empty")]
    EmptyBibliography {
        /// Detected schema
        schema: SchemaKind,
    },

    /// The schema strategy found nothing in a non-empty container; fallback extraction was used.
    #[error("{schema} structure not found in <{container}>; used fallback extraction")]
    ExtractionStrategyMismatch {
        /// Detected schema
        schema: SchemaKind,
        /// Local name of the bibliography container
        container: String,
    },

    /// A pointer (or part of a list/range pointer) matched no bibliography entry.
    #[error("pointer {raw_text:?} at {}..{} has no match for {missing:?}", .span.start, .span.end)]
    UnresolvedPointer {
        /// Matched marker text
        raw_text: String,
        /// Marker location in the body text
        span: Span,
        /// Tokens or target ids without a matching entry
        missing: Vec<String>,
    },

    /// Two entries carried the same native id; the later one was renamed.
    #[error("duplicate entry id '{id}' renamed to '{renamed_to}'")]
    DuplicateEntryId {
        /// Original id
        id: String,
        /// Unique replacement
        renamed_to: String,
    },

    /// Two entries normalized to the same label; the first in document order wins.
    #[error("label '{label}' used by '{kept_id}' and '{ignored_id}'; keeping '{kept_id}'")]
    DuplicateLabel {
        /// Normalized label
        label: String,
        /// Entry that owns the label
        kept_id: String,
        /// Entry not reachable by label
        ignored_id: String,
    },

    /// The batch driver abandoned the document after its time budget.
    #[error("processing exceeded {seconds}s; document abandoned")]
    Timeout {
        /// Budget in seconds
        seconds: u64,
    },

    /// The processing task panicked; the document was abandoned.
    #[error("processing task failed: {detail}")]
    ProcessingPanic {
        /// Join error description
        detail: String,
    },
}

impl CitationWarning {
    /// Returns the stable snake-case kind label (matches the serialized `kind` tag).
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MalformedMarkup { .. } => "malformed_markup",
            Self::UnknownSchema => "unknown_schema",
            Self::EmptyBibliography { .. } => "empty_bibliography",
            Self::ExtractionStrategyMismatch { .. } => "extraction_strategy_mismatch",
            Self::UnresolvedPointer { .. } => "unresolved_pointer",
            Self::DuplicateEntryId { .. } => "duplicate_entry_id",
            Self::DuplicateLabel { .. } => "duplicate_label",
            Self::Timeout { .. } => "timeout",
            Self::ProcessingPanic { .. } => "processing_panic",
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_unresolved_pointer_message_includes_span_and_tokens() {
        let warning = CitationWarning::UnresolvedPointer {
            raw_text: "[7]".to_string(),
            span: Span::new(10, 13),
            missing: vec!["7".to_string()],
        };
        let msg = warning.to_string();
        assert!(msg.contains("\"[7]\""), "should quote raw text: {msg}");
        assert!(msg.contains("10..13"), "should contain span: {msg}");
    }

    #[test]
    fn test_warning_serializes_with_kind_tag() {
        let warning = CitationWarning::EmptyBibliography {
            schema: SchemaKind::Tei,
        };
        let json = serde_json::to_value(&warning).unwrap();
        assert_eq!(json["kind"], "empty_bibliography");
        assert_eq!(json["schema"], "tei");
        assert_eq!(warning.kind(), "empty_bibliography");
    }

    #[test]
    fn test_unit_variant_serializes_with_kind_only() {
        let json = serde_json::to_value(CitationWarning::UnknownSchema).unwrap();
        assert_eq!(json, serde_json::json!({ "kind": "unknown_schema" }));
    }
}
