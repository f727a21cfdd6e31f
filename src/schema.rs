//! Schema classification for scholarly-article markup.
//!
//! Classification walks an explicit, ordered rule table and returns the kind
//! of the first rule that matches. Structural rules (what bibliography markup
//! is actually present) come first; declaration hints (DOCTYPE and root
//! namespace) only apply when no structural marker is found. Hybrid forms are
//! handled by ordering: a JATS-shaped `ref-list` whose entries carry Wiley's
//! dedicated `<citation>` element classifies as Wiley because that rule is
//! checked before the JATS rule.

use std::fmt;

use serde::Serialize;
use tracing::debug;

use crate::constants::{TEI_NAMESPACE, WILEY_NAMESPACE};
use crate::document::{Document, Element, is_reference_passage};

/// Markup schema of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaKind {
    /// Journal Article Tag Suite (`ref-list` / `ref`)
    Jats,
    /// Text Encoding Initiative (`listBibl` / `biblStruct`)
    Tei,
    /// Wiley component XML (`bib` / `citation`)
    Wiley,
    /// `BioC` collections (`passage` with `section_type` infons)
    Bioc,
    /// No recognised markers
    Unknown,
}

impl SchemaKind {
    /// All kinds, in reporting order.
    pub const ALL: [SchemaKind; 5] = [
        SchemaKind::Jats,
        SchemaKind::Tei,
        SchemaKind::Wiley,
        SchemaKind::Bioc,
        SchemaKind::Unknown,
    ];

    /// Returns the stable lowercase label used in output and ids.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Jats => "jats",
            Self::Tei => "tei",
            Self::Wiley => "wiley",
            Self::Bioc => "bioc",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for SchemaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry in the classification priority list.
struct DetectionRule {
    name: &'static str,
    kind: SchemaKind,
    matches: fn(&Document) -> bool,
}

/// Ordered priority list; append new hybrid forms here as they are found.
const DETECTION_RULES: &[DetectionRule] = &[
    DetectionRule {
        name: "bibliography entries with dedicated citation element",
        kind: SchemaKind::Wiley,
        matches: has_dedicated_citation_entries,
    },
    DetectionRule {
        name: "ref-list container",
        kind: SchemaKind::Jats,
        matches: has_ref_list,
    },
    DetectionRule {
        name: "listBibl or biblStruct",
        kind: SchemaKind::Tei,
        matches: has_tei_bibliography,
    },
    DetectionRule {
        name: "passage with reference section_type",
        kind: SchemaKind::Bioc,
        matches: has_reference_passage,
    },
    DetectionRule {
        name: "Wiley root namespace",
        kind: SchemaKind::Wiley,
        matches: has_wiley_namespace,
    },
    DetectionRule {
        name: "TEI root or namespace",
        kind: SchemaKind::Tei,
        matches: has_tei_root,
    },
    DetectionRule {
        name: "BioC doctype or collection root",
        kind: SchemaKind::Bioc,
        matches: has_bioc_declaration,
    },
    DetectionRule {
        name: "JATS/NLM doctype",
        kind: SchemaKind::Jats,
        matches: has_jats_doctype,
    },
];

/// Classifies a parsed document into a [`SchemaKind`].
///
/// Never fails; [`SchemaKind::Unknown`] is returned when no rule matches.
#[must_use]
pub fn classify(document: &Document) -> SchemaKind {
    for rule in DETECTION_RULES {
        if (rule.matches)(document) {
            debug!(rule = rule.name, schema = %rule.kind, "schema detected");
            return rule.kind;
        }
    }
    debug!("no schema markers found");
    SchemaKind::Unknown
}

/// Returns true if `entry` holds a Wiley-style dedicated `<citation>` child.
#[must_use]
pub fn has_dedicated_citation(entry: &Element) -> bool {
    entry.find_child("citation").is_some()
}

fn has_dedicated_citation_entries(document: &Document) -> bool {
    document
        .tree()
        .descendants()
        .filter(|element| element.is_any(&["ref-list", "bibliography"]))
        .any(|container| {
            container
                .descendants()
                .filter(|entry| entry.is_any(&["ref", "bib"]))
                .any(has_dedicated_citation)
        })
}

fn has_ref_list(document: &Document) -> bool {
    document.tree().find("ref-list").is_some()
}

fn has_tei_bibliography(document: &Document) -> bool {
    document
        .tree()
        .descendants()
        .any(|element| element.is_any(&["listBibl", "biblStruct"]))
}

fn has_reference_passage(document: &Document) -> bool {
    document.tree().find_all("passage").any(is_reference_passage)
}

fn has_wiley_namespace(document: &Document) -> bool {
    document
        .root_namespace()
        .is_some_and(|ns| ns.trim() == WILEY_NAMESPACE)
        || document
            .tree()
            .find_all("component")
            .any(|component| component.attr("xmlns") == Some(WILEY_NAMESPACE))
}

fn has_tei_root(document: &Document) -> bool {
    document
        .root_namespace()
        .is_some_and(|ns| ns.trim() == TEI_NAMESPACE)
        || document.root().is_some_and(|root| root.is("TEI"))
}

fn has_bioc_declaration(document: &Document) -> bool {
    document
        .doctype()
        .is_some_and(|doctype| doctype.to_ascii_lowercase().contains("bioc"))
        || document.root().is_some_and(|root| root.is("collection"))
}

fn has_jats_doctype(document: &Document) -> bool {
    document.doctype().is_some_and(|doctype| {
        let lower = doctype.to_ascii_lowercase();
        lower.contains("jats") || lower.contains("//nlm//") || lower.contains("journal archiving")
    })
}
