//! `BioC` strategy: reference-typed `<passage>` elements.

use tracing::debug;

use crate::constants::is_heading_token;
use crate::document::{Document, Element, is_reference_passage};

use super::entry::EntryCandidate;

pub(crate) fn collect(document: &Document) -> Vec<EntryCandidate> {
    document
        .tree()
        .find_all("passage")
        .filter(|passage| is_reference_passage(passage))
        .filter_map(candidate_from_passage)
        .collect()
}

fn candidate_from_passage(passage: &Element) -> Option<EntryCandidate> {
    let raw_text = passage
        .find_child("text")
        .map_or_else(|| passage.text_excluding(&["infon", "offset", "annotation"]), Element::text);

    // The section heading is itself a REF-typed passage in PMC BioC exports
    if is_heading_token(&raw_text) {
        debug!(text = %raw_text, "skipping reference heading passage");
        return None;
    }

    let native_id = passage
        .attr("id")
        .map(str::to_string)
        .or_else(|| infon(passage, "id"));

    Some(EntryCandidate {
        native_id,
        label: None,
        raw_text,
        doi: infon(passage, "pub-id_doi"),
    })
}

fn infon(passage: &Element, key: &str) -> Option<String> {
    passage
        .child_elements()
        .find(|child| child.is("infon") && child.attr_is("key", key))
        .map(Element::text)
        .filter(|text| !text.is_empty())
}
