//! TEI strategy: `<biblStruct>` / `<bibl>` children of `<listBibl>`.
//!
//! TEI (and GROBID output in particular) rarely carries explicit numerals, so
//! labels are always position-derived.

use crate::document::{Document, Element};

use super::entry::EntryCandidate;

pub(crate) fn collect(document: &Document) -> Vec<EntryCandidate> {
    document
        .tree()
        .find_all("listBibl")
        .flat_map(|list| {
            list.child_elements()
                .filter(|child| child.is_any(&["biblStruct", "bibl"]))
        })
        .map(|entry| EntryCandidate {
            native_id: entry.attr("id").map(str::to_string),
            label: None,
            raw_text: raw_text(entry),
            doi: entry
                .find_all("idno")
                .find(|idno| idno.attr_is("type", "DOI"))
                .map(Element::text),
        })
        .collect()
}

/// Raw reference note, else analytic + monograph text, else the whole entry.
fn raw_text(entry: &Element) -> String {
    if let Some(note) = entry
        .find_all("note")
        .find(|note| note.attr_is("type", "raw_reference"))
    {
        let text = note.text();
        if !text.is_empty() {
            return text;
        }
    }

    let parts: Vec<String> = entry
        .child_elements()
        .filter(|child| child.is_any(&["analytic", "monogr", "series"]))
        .map(Element::text)
        .filter(|text| !text.is_empty())
        .collect();
    if parts.is_empty() {
        entry.text()
    } else {
        parts.join(". ")
    }
}
