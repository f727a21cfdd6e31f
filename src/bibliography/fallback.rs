//! Fallback strategy: every top-level child of the bibliography container is one entry.
//!
//! Used when the detected schema's expected structure is missing (e.g. a
//! `ref-list` holding bare `<mixed-citation>` elements) and for documents of
//! unknown schema. Without any recognizable container, the last section titled
//! "References" (or another heading token) stands in for it.

use crate::constants::is_heading_token;
use crate::document::{Document, Element};

use super::entry::EntryCandidate;

/// Container children that are headings, not entries.
const HEADING_ELEMENTS: &[&str] = &["title", "head", "label", "sec-meta"];

/// Generic section elements that may carry a reference heading.
const SECTION_ELEMENTS: &[&str] = &["sec", "section", "div"];

/// List entries inside a heading-titled section.
const LIST_ITEM_ELEMENTS: &[&str] = &["list-item", "item"];

/// Collects candidates for a document whose schema strategy does not apply.
pub(crate) fn collect_document(document: &Document) -> Vec<EntryCandidate> {
    if let Some(container) = document.bibliography_section() {
        let found = collect(container);
        if !found.is_empty() {
            return found;
        }
    }
    heading_section(document.tree())
        .map(collect_section)
        .unwrap_or_default()
}

/// Returns the last generic section whose title is a bibliography heading.
fn heading_section(tree: &Element) -> Option<&Element> {
    tree.descendants()
        .filter(|element| element.is_any(SECTION_ELEMENTS))
        .filter(|section| {
            section
                .child_elements()
                .find(|child| child.is_any(&["title", "head"]))
                .is_some_and(|title| is_heading_token(&title.text()))
        })
        .last()
}

fn collect_section(section: &Element) -> Vec<EntryCandidate> {
    let items: Vec<&Element> = section
        .descendants()
        .filter(|element| element.is_any(LIST_ITEM_ELEMENTS))
        .collect();
    let entries: Vec<&Element> = if items.is_empty() {
        section.child_elements().filter(|child| child.is("p")).collect()
    } else {
        items
    };

    entries
        .into_iter()
        .filter(|entry| !is_heading_token(&entry.text()))
        .map(|entry| EntryCandidate {
            native_id: entry.attr("id").map(str::to_string),
            label: None,
            raw_text: entry.text(),
            doi: None,
        })
        .collect()
}

pub(crate) fn collect(container: &Element) -> Vec<EntryCandidate> {
    entry_like_children(container)
        .map(|child| EntryCandidate {
            native_id: child.attr("id").map(str::to_string),
            label: None,
            raw_text: child.text(),
            doi: None,
        })
        .collect()
}

/// Returns true if the container has at least one child that could be an entry.
pub(crate) fn has_entry_like_children(container: &Element) -> bool {
    entry_like_children(container).next().is_some()
}

fn entry_like_children(container: &Element) -> impl Iterator<Item = &Element> {
    container.child_elements().filter(|child| {
        if child.is_any(HEADING_ELEMENTS) {
            return false;
        }
        let text = child.text();
        !text.is_empty() && !is_heading_token(&text)
    })
}
