//! Uniform bibliography entry representation.

use serde::Serialize;

use crate::schema::SchemaKind;

/// Where an entry's label came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LabelOrigin {
    /// Written in the markup (e.g. JATS `<label>1.</label>`)
    Explicit,
    /// Derived from the entry's 1-based position at extraction time
    Positional,
}

/// One bibliography entry, independent of the source schema.
///
/// Entries are immutable once extracted; fields are exposed through accessors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BibliographyEntry {
    id: String,
    label: String,
    label_origin: LabelOrigin,
    raw_text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    doi: Option<String>,
    source_schema: SchemaKind,
}

impl BibliographyEntry {
    pub(crate) fn new(
        id: String,
        label: String,
        label_origin: LabelOrigin,
        raw_text: String,
        doi: Option<String>,
        source_schema: SchemaKind,
    ) -> Self {
        Self {
            id,
            label,
            label_origin,
            raw_text,
            doi,
            source_schema,
        }
    }

    /// Schema-native identifier, unique within the document.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Explicit or position-derived label, normalized (`"[1]."` becomes `"1"`).
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Whether [`label`](Self::label) was written in the markup.
    #[must_use]
    pub fn label_origin(&self) -> LabelOrigin {
        self.label_origin
    }

    /// Whitespace-collapsed citation text.
    #[must_use]
    pub fn raw_text(&self) -> &str {
        &self.raw_text
    }

    /// DOI from a dedicated element, else the first DOI found in the text.
    #[must_use]
    pub fn doi(&self) -> Option<&str> {
        self.doi.as_deref()
    }

    /// Schema the entry was extracted from.
    #[must_use]
    pub fn source_schema(&self) -> SchemaKind {
        self.source_schema
    }
}

/// What a strategy found for one entry, before shared post-processing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct EntryCandidate {
    pub native_id: Option<String>,
    pub label: Option<String>,
    pub raw_text: String,
    pub doi: Option<String>,
}

/// Normalizes an explicit label: `"[12]"`, `"(12)"`, `"12."` and `" 12 "` all become `"12"`.
///
/// Returns `None` when nothing meaningful remains.
#[must_use]
pub fn normalize_label(raw: &str) -> Option<String> {
    let mut label = raw.trim();
    label = label.trim_end_matches('.').trim();
    if let Some(inner) = label
        .strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'))
        .or_else(|| label.strip_prefix('(').and_then(|rest| rest.strip_suffix(')')))
    {
        label = inner.trim();
    }
    label = label.trim_end_matches('.').trim();
    if label.is_empty() {
        None
    } else {
        Some(label.to_string())
    }
}
