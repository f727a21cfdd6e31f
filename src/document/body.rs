//! Flattening of the article body into plain text with structural anchors.
//!
//! Pointer spans are character offsets into [`BodyText::text`], counted in
//! Unicode scalar values. Whitespace runs collapse to a single space and
//! block-level elements end with a newline, so offsets stay stable for a given
//! input regardless of the source's indentation.

use serde::Serialize;

use crate::constants::{BIBLIOGRAPHY_CONTAINERS, is_reference_section_type};

use super::tree::{Element, Node};

/// Elements that start a new line in the flattened text.
const BLOCK_ELEMENTS: &[&str] = &[
    "p",
    "title",
    "sec",
    "section",
    "div",
    "head",
    "list-item",
    "item",
    "caption",
    "fig",
    "table-wrap",
    "passage",
    "abstract",
    "para",
    "label",
];

/// Elements that never contribute body text.
const SKIPPED_ELEMENTS: &[&str] = &["infon", "offset", "annotation", "teiHeader", "front"];

/// A half-open `[start, end)` range of character offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Span {
    /// First character offset (inclusive)
    pub start: usize,
    /// Last character offset (exclusive)
    pub end: usize,
}

impl Span {
    /// Creates a span.
    #[must_use]
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Returns true if the two spans share at least one character.
    #[must_use]
    pub fn overlaps(&self, other: &Span) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Number of characters covered.
    #[must_use]
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    /// Returns true if the span covers no characters.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// What a structural anchor in the body represents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnchorKind {
    /// A cross-reference element carrying bibliography target ids.
    CrossReference {
        /// Target ids with any leading `#` removed, in attribute order
        target_ids: Vec<String>,
    },
    /// A `<sup>` element; whether it is a pointer is decided by the scanner.
    Superscript,
}

/// A markup element whose extent in the flattened text matters to the scanner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Anchor {
    /// Location in [`BodyText::text`]
    pub span: Span,
    /// Anchor type
    pub kind: AnchorKind,
}

/// The body of a document as plain text plus structural anchors.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BodyText {
    text: String,
    anchors: Vec<Anchor>,
}

impl BodyText {
    /// Wraps plain text that carries no structural anchors.
    #[must_use]
    pub fn from_plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            anchors: Vec::new(),
        }
    }

    /// Flattens the body of a parsed document tree.
    ///
    /// Uses the first `body` element when present; otherwise the non-reference
    /// `BioC` passages; otherwise the whole tree. Bibliography containers are
    /// always skipped.
    #[must_use]
    pub fn from_tree(tree: &Element) -> Self {
        let mut flattener = Flattener::default();

        if let Some(body) = tree.find("body") {
            flattener.walk(body);
        } else {
            let passages: Vec<&Element> = tree.find_all("passage").collect();
            if passages.is_empty() {
                flattener.walk(tree);
            } else {
                for passage in passages.into_iter().filter(|p| !is_reference_passage(p)) {
                    flattener.block_break();
                    flattener.walk(passage);
                }
            }
        }

        flattener.finish()
    }

    /// Returns the flattened text.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Returns structural anchors in document order.
    #[must_use]
    pub fn anchors(&self) -> &[Anchor] {
        &self.anchors
    }

    /// Returns the text covered by `span`, or an empty string when out of range.
    #[must_use]
    pub fn slice(&self, span: Span) -> &str {
        let start = char_to_byte(&self.text, span.start);
        let end = char_to_byte(&self.text, span.end);
        match (start, end) {
            (Some(start), Some(end)) if start <= end => &self.text[start..end],
            _ => "",
        }
    }
}

/// Returns true if a `BioC` passage carries a reference `section_type` infon.
#[must_use]
pub fn is_reference_passage(passage: &Element) -> bool {
    passage
        .child_elements()
        .filter(|child| child.is("infon") && child.attr_is("key", "section_type"))
        .any(|infon| is_reference_section_type(&infon.text()))
}

/// Converts a character offset into a byte offset; `None` if past the end.
#[must_use]
pub fn char_to_byte(text: &str, char_offset: usize) -> Option<usize> {
    if char_offset == 0 {
        return Some(0);
    }
    text.char_indices()
        .map(|(byte, _)| byte)
        .chain(std::iter::once(text.len()))
        .nth(char_offset)
}

#[derive(Default)]
struct Flattener {
    text: String,
    chars: usize,
    pending_space: bool,
    anchors: Vec<Anchor>,
}

impl Flattener {
    fn walk(&mut self, element: &Element) {
        for child in element.children() {
            match child {
                Node::Text(text) => self.push_text(text),
                Node::Element(child) => self.visit(child),
            }
        }
    }

    fn visit(&mut self, element: &Element) {
        if element.is_any(BIBLIOGRAPHY_CONTAINERS) || element.is_any(SKIPPED_ELEMENTS) {
            return;
        }

        let is_block = element.is_any(BLOCK_ELEMENTS);
        if is_block {
            self.block_break();
        }

        if let Some(kind) = anchor_kind(element) {
            self.flush_space();
            let start = self.chars;
            self.walk(element);
            let end = self.chars;
            self.anchors.push(Anchor {
                span: Span::new(start, end),
                kind,
            });
        } else {
            self.walk(element);
        }

        if is_block {
            self.block_break();
        }
    }

    fn push_text(&mut self, text: &str) {
        for c in text.chars() {
            if c.is_whitespace() {
                self.pending_space = true;
            } else {
                self.flush_space();
                self.text.push(c);
                self.chars += 1;
            }
        }
    }

    fn flush_space(&mut self) {
        if self.pending_space && !self.text.is_empty() && !self.text.ends_with('\n') {
            self.text.push(' ');
            self.chars += 1;
        }
        self.pending_space = false;
    }

    fn block_break(&mut self) {
        if !self.text.is_empty() && !self.text.ends_with('\n') {
            self.text.push('\n');
            self.chars += 1;
        }
        self.pending_space = false;
    }

    fn finish(mut self) -> BodyText {
        while self.text.ends_with('\n') {
            self.text.pop();
        }
        self.anchors.sort_by_key(|anchor| anchor.span);
        BodyText {
            text: self.text,
            anchors: self.anchors,
        }
    }
}

fn anchor_kind(element: &Element) -> Option<AnchorKind> {
    if element.is("xref") && element.attr_is("ref-type", "bibr") {
        return cross_reference(element.attr("rid"));
    }
    if element.is("ref") && element.attr_is("type", "bibr") {
        return cross_reference(element.attr("target"));
    }
    if element.is("link")
        && let Some(href) = element.attr("href")
        && href.starts_with('#')
        && href.to_ascii_lowercase().contains("bib")
    {
        return cross_reference(Some(href));
    }
    if element.is("sup") {
        return Some(AnchorKind::Superscript);
    }
    None
}

fn cross_reference(targets: Option<&str>) -> Option<AnchorKind> {
    let target_ids: Vec<String> = targets?
        .split_whitespace()
        .map(|id| id.trim_start_matches('#').to_string())
        .filter(|id| !id.is_empty())
        .collect();
    if target_ids.is_empty() {
        None
    } else {
        Some(AnchorKind::CrossReference { target_ids })
    }
}
