//! Parsed scholarly-article documents.
//!
//! A [`Document`] is built once per input file: the markup is tolerantly
//! parsed into an owned tree, the schema is classified, and the body is
//! flattened into text with structural anchors for pointer scanning.
//!
//! # Example
//!
//! ```
//! use citegraph_core::{Document, SchemaKind};
//!
//! let doc = Document::parse(
//!     "10.1234_example",
//!     r#"<article><body><p>See [1].</p></body>
//!        <back><ref-list><ref id="r1"><label>1</label><mixed-citation>Smith 2020</mixed-citation></ref></ref-list></back>
//!        </article>"#,
//! );
//! assert_eq!(doc.schema(), SchemaKind::Jats);
//! assert_eq!(doc.body().text(), "See [1].");
//! ```

mod body;
mod error;
mod parse;
mod tree;

pub use body::{Anchor, AnchorKind, BodyText, Span, char_to_byte, is_reference_passage};
pub use error::{MAX_NESTING_DEPTH, MAX_SYNTAX_RECOVERIES, MarkupIssue};
pub use parse::{DOCUMENT_NODE_NAME, ParsedMarkup, parse_markup};
pub use tree::{Attribute, Descendants, Element, Node, collapse_whitespace};

use tracing::{debug, warn};

use crate::constants::BIBLIOGRAPHY_CONTAINERS;
use crate::schema::{SchemaKind, classify};

/// A scholarly article parsed from markup.
#[derive(Debug, Clone)]
pub struct Document {
    id: String,
    tree: Element,
    doctype: Option<String>,
    issues: Vec<MarkupIssue>,
    body: BodyText,
    schema: SchemaKind,
}

impl Document {
    /// Parses `source` tolerantly and classifies its schema.
    ///
    /// Never fails: malformed markup is repaired and the repairs are kept in
    /// [`Document::markup_issues`].
    #[tracing::instrument(skip(source), fields(source_len = source.len()))]
    #[must_use]
    pub fn parse(id: impl Into<String> + std::fmt::Debug, source: &str) -> Self {
        let ParsedMarkup {
            tree,
            doctype,
            issues,
        } = parse_markup(source);

        for issue in &issues {
            warn!(issue = %issue, "markup recovered");
        }

        let body = BodyText::from_tree(&tree);
        let mut document = Self {
            id: id.into(),
            tree,
            doctype,
            issues,
            body,
            schema: SchemaKind::Unknown,
        };
        document.schema = classify(&document);

        debug!(
            schema = %document.schema,
            body_chars = document.body.text().chars().count(),
            anchors = document.body.anchors().len(),
            "document parsed"
        );
        document
    }

    /// Returns the document identifier (usually the DOI-derived file stem).
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns the synthetic `#document` element wrapping the markup.
    #[must_use]
    pub fn tree(&self) -> &Element {
        &self.tree
    }

    /// Returns the first top-level element, if any.
    #[must_use]
    pub fn root(&self) -> Option<&Element> {
        self.tree.child_elements().next()
    }

    /// Returns the DOCTYPE declaration body, if present.
    #[must_use]
    pub fn doctype(&self) -> Option<&str> {
        self.doctype.as_deref()
    }

    /// Returns the default namespace declared on the root element.
    #[must_use]
    pub fn root_namespace(&self) -> Option<&str> {
        self.root()?
            .attributes()
            .iter()
            .find(|attr| attr.name == "xmlns")
            .map(|attr| attr.value.as_str())
    }

    /// Returns the repairs made while parsing.
    #[must_use]
    pub fn markup_issues(&self) -> &[MarkupIssue] {
        &self.issues
    }

    /// Returns the flattened body text.
    #[must_use]
    pub fn body(&self) -> &BodyText {
        &self.body
    }

    /// Returns the schema assigned at parse time.
    #[must_use]
    pub fn schema(&self) -> SchemaKind {
        self.schema
    }

    /// Returns the first bibliography container (`ref-list`, `listBibl`, `bibliography`).
    #[must_use]
    pub fn bibliography_section(&self) -> Option<&Element> {
        BIBLIOGRAPHY_CONTAINERS
            .iter()
            .find_map(|name| self.tree.find(name))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_document_root_namespace() {
        let doc = Document::parse(
            "tei",
            r#"<TEI xmlns="http://www.tei-c.org/ns/1.0"><text/></TEI>"#,
        );
        assert_eq!(doc.root_namespace(), Some("http://www.tei-c.org/ns/1.0"));
        assert_eq!(doc.root().unwrap().local_name(), "TEI");
    }

    #[test]
    fn test_document_bibliography_section_finds_tei_list() {
        let doc = Document::parse(
            "tei",
            r#"<TEI><text><back><div><listBibl/></div></back></text></TEI>"#,
        );
        assert_eq!(doc.bibliography_section().unwrap().local_name(), "listBibl");
    }

    #[test]
    fn test_document_parse_never_fails_on_garbage() {
        let doc = Document::parse("junk", "<<<not xml at all");
        assert_eq!(doc.schema(), SchemaKind::Unknown);
        assert!(!doc.markup_issues().is_empty());
    }
}
