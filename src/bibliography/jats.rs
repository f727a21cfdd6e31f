//! JATS strategy: `<ref>` entries inside `<ref-list>`.

use tracing::trace;

use crate::document::{Document, Element};

use super::entry::EntryCandidate;

/// Citation elements in preference order.
const CITATION_ELEMENTS: &[&str] = &["mixed-citation", "element-citation", "nlm-citation"];

pub(crate) fn collect(document: &Document) -> Vec<EntryCandidate> {
    document
        .tree()
        .find_all("ref-list")
        .flat_map(|list| list.child_elements().filter(|child| child.is("ref")))
        .map(candidate_from_ref)
        .collect()
}

fn candidate_from_ref(reference: &Element) -> EntryCandidate {
    let raw_text = CITATION_ELEMENTS
        .iter()
        .find_map(|name| reference.find_child(name))
        .map_or_else(|| reference.text_excluding(&["label"]), Element::text);

    let candidate = EntryCandidate {
        native_id: reference.attr("id").map(str::to_string),
        label: reference.find_child("label").map(Element::text),
        raw_text,
        doi: structural_doi(reference),
    };
    trace!(id = ?candidate.native_id, label = ?candidate.label, "JATS ref");
    candidate
}

/// DOI from `<pub-id pub-id-type="doi">` or `<ext-link ext-link-type="doi">`.
pub(crate) fn structural_doi(reference: &Element) -> Option<String> {
    reference
        .descendants()
        .find(|element| {
            (element.is("pub-id") && element.attr_is("pub-id-type", "doi"))
                || (element.is("ext-link") && element.attr_is("ext-link-type", "doi"))
        })
        .map(Element::text)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_collect_reads_id_label_and_citation() {
        let doc = Document::parse(
            "jats",
            r#"<article><back><ref-list><title>References</title>
                <ref id="r1"><label>1.</label><mixed-citation>Smith J. <year>2020</year>. Title.
                    <pub-id pub-id-type="doi">10.1000/xyz</pub-id></mixed-citation></ref>
                <ref id="r2"><element-citation>Jones K. 2019.</element-citation></ref>
            </ref-list></back></article>"#,
        );
        let found = collect(&doc);
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].native_id.as_deref(), Some("r1"));
        assert_eq!(found[0].label.as_deref(), Some("1."));
        assert!(found[0].raw_text.starts_with("Smith J. 2020 . Title."));
        assert_eq!(found[0].doi.as_deref(), Some("10.1000/xyz"));
        assert_eq!(found[1].label, None);
        assert_eq!(found[1].raw_text, "Jones K. 2019.");
    }

    #[test]
    fn test_collect_without_citation_element_uses_ref_text_minus_label() {
        let doc = Document::parse(
            "jats",
            r#"<ref-list><ref id="r9"><label>9</label>Plain text reference</ref></ref-list>"#,
        );
        let found = collect(&doc);
        assert_eq!(found[0].raw_text, "Plain text reference");
    }

    #[test]
    fn test_collect_empty_ref_list() {
        let doc = Document::parse("jats", "<ref-list><title>References</title></ref-list>");
        assert!(collect(&doc).is_empty());
    }
}
