//! Wiley strategy: `<bib>` entries (or JATS-shaped `<ref>` hybrids) whose
//! dedicated `<citation>` element is authoritative over `<mixed-citation>`.

use tracing::trace;

use crate::document::{Document, Element};

use super::entry::EntryCandidate;
use super::jats::structural_doi;

pub(crate) fn collect(document: &Document) -> Vec<EntryCandidate> {
    let tree = document.tree();
    tree.find_all("bibliography")
        .chain(tree.find_all("ref-list"))
        .flat_map(|list| list.child_elements().filter(|child| child.is_any(&["bib", "ref"])))
        .map(candidate_from_entry)
        .collect()
}

fn candidate_from_entry(entry: &Element) -> EntryCandidate {
    let citation = entry.find_child("citation");
    if citation.is_none() {
        trace!(id = ?entry.attr("id"), "Wiley entry without dedicated citation");
    }

    let raw_text = citation
        .or_else(|| entry.find_child("mixed-citation"))
        .map_or_else(|| entry.text_excluding(&["label"]), Element::text);

    let native_id = entry
        .attr("id")
        .or_else(|| citation.and_then(|c| c.attr("id")))
        .map(str::to_string);

    let doi = citation
        .and_then(|c| c.find("doi"))
        .map(Element::text)
        .or_else(|| structural_doi(entry));

    EntryCandidate {
        native_id,
        label: entry.find_child("label").map(Element::text),
        raw_text,
        doi,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_collect_wiley_bibliography() {
        let doc = Document::parse(
            "wiley",
            r#"<component><back><bibliography>
                <bib xml:id="ece34466-bib-0001"><citation type="journal" xml:id="cit1">Smith, J. (2020). Paper. <doi>10.1002/ece3.1</doi></citation></bib>
                <bib xml:id="ece34466-bib-0002"><citation type="book">Jones, K. (2019). Book.</citation></bib>
            </bibliography></back></component>"#,
        );
        let found = collect(&doc);
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].native_id.as_deref(), Some("ece34466-bib-0001"));
        assert_eq!(found[0].doi.as_deref(), Some("10.1002/ece3.1"));
        assert_eq!(found[1].raw_text, "Jones, K. (2019). Book.");
    }

    #[test]
    fn test_collect_hybrid_prefers_dedicated_citation() {
        let doc = Document::parse(
            "hybrid",
            r#"<article><ref-list>
                <ref id="r1"><label>1</label><mixed-citation>Generic text</mixed-citation><citation>Dedicated text</citation></ref>
            </ref-list></article>"#,
        );
        let found = collect(&doc);
        assert_eq!(found[0].raw_text, "Dedicated text");
        assert_eq!(found[0].label.as_deref(), Some("1"));
    }

    #[test]
    fn test_collect_falls_back_to_citation_id() {
        let doc = Document::parse(
            "wiley",
            r#"<bibliography><bib><citation xml:id="c7">Text</citation></bib></bibliography>"#,
        );
        assert_eq!(collect(&doc)[0].native_id.as_deref(), Some("c7"));
    }
}
