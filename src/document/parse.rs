//! Tolerant XML reader that always produces a tree.
//!
//! Publisher XML in the wild has mismatched tags, stray closing tags, unknown
//! HTML entities and truncated tails. The reader keeps going through all of
//! these, closing elements where the markup implies it and recording a
//! [`MarkupIssue`] for each recovery.

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use tracing::{debug, trace};

use super::error::{MAX_NESTING_DEPTH, MAX_SYNTAX_RECOVERIES, MarkupIssue};
use super::tree::{Attribute, Element, Node, collapse_whitespace};

/// Name of the synthetic element holding every top-level node.
pub const DOCUMENT_NODE_NAME: &str = "#document";

/// Output of [`parse_markup`].
#[derive(Debug, Clone)]
pub struct ParsedMarkup {
    /// Synthetic `#document` element wrapping the top-level nodes.
    pub tree: Element,
    /// The DOCTYPE declaration body, whitespace-collapsed.
    pub doctype: Option<String>,
    /// Problems recovered from while reading.
    pub issues: Vec<MarkupIssue>,
}

/// Parses markup into an owned tree, recovering from malformed input.
#[tracing::instrument(skip(source), fields(source_len = source.len()))]
#[must_use]
pub fn parse_markup(source: &str) -> ParsedMarkup {
    let mut reader = Reader::from_str(source);
    {
        let config = reader.config_mut();
        config.trim_text(false);
        config.check_end_names = false;
        config.allow_unmatched_ends = true;
    }

    let mut builder = TreeBuilder::new();
    let mut doctype = None;
    let mut error_count = 0usize;
    let mut last_error_at: Option<u64> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(start)) => builder.open(element_from_start(&start)),
            Ok(Event::Empty(start)) => builder.append(Node::Element(element_from_start(&start))),
            Ok(Event::End(end)) => {
                let name = String::from_utf8_lossy(end.name().as_ref()).into_owned();
                builder.close(&name);
            }
            Ok(Event::Text(text)) => {
                builder.append(Node::Text(String::from_utf8_lossy(&text).into_owned()));
            }
            Ok(Event::GeneralRef(entity)) => {
                let name = String::from_utf8_lossy(&entity);
                let resolved = resolve_entity(&name).unwrap_or_else(|| format!("&{name};"));
                builder.append(Node::Text(resolved));
            }
            Ok(Event::CData(data)) => {
                builder.append(Node::Text(String::from_utf8_lossy(&data).into_owned()));
            }
            Ok(Event::DocType(decl)) => {
                doctype = Some(collapse_whitespace(&String::from_utf8_lossy(&decl)));
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(error) => {
                let position = reader.error_position();
                debug!(position, error = %error, "recovering from markup error");
                builder.issues.push(MarkupIssue::syntax(position, &error));
                error_count += 1;

                let resume_at = reader.buffer_position();
                if error_count >= MAX_SYNTAX_RECOVERIES || last_error_at == Some(resume_at) {
                    builder.issues.push(MarkupIssue::TooManyErrors { count: error_count });
                    break;
                }
                last_error_at = Some(resume_at);
            }
        }
    }

    let (tree, issues) = builder.finish();
    trace!(issues = issues.len(), "markup parsed");
    ParsedMarkup {
        tree,
        doctype,
        issues,
    }
}

fn element_from_start(start: &BytesStart<'_>) -> Element {
    let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
    let mut raw_attributes = start.attributes();
    raw_attributes.with_checks(false);

    let attributes = raw_attributes
        .flatten()
        .map(|attr| Attribute {
            name: String::from_utf8_lossy(attr.key.as_ref()).into_owned(),
            value: unescape_value(&String::from_utf8_lossy(&attr.value)),
        })
        .collect();

    Element::new(name, attributes)
}

/// Builds the tree from open/close events, repairing nesting as it goes.
struct TreeBuilder {
    root: Element,
    stack: Vec<Element>,
    issues: Vec<MarkupIssue>,
    depth_capped: bool,
}

impl TreeBuilder {
    fn new() -> Self {
        Self {
            root: Element::new(DOCUMENT_NODE_NAME, Vec::new()),
            stack: Vec::new(),
            issues: Vec::new(),
            depth_capped: false,
        }
    }

    fn open(&mut self, element: Element) {
        // Tree walks recurse per level, so depth must stay bounded
        if self.stack.len() >= MAX_NESTING_DEPTH {
            if !self.depth_capped {
                debug!(limit = MAX_NESTING_DEPTH, "nesting limit reached");
                self.issues.push(MarkupIssue::NestingTooDeep {
                    limit: MAX_NESTING_DEPTH,
                });
                self.depth_capped = true;
            }
            if let Some(innermost) = self.stack.pop() {
                self.append(Node::Element(innermost));
            }
        }
        self.stack.push(element);
    }

    fn append(&mut self, node: Node) {
        match self.stack.last_mut() {
            Some(top) => top.push_child(node),
            None => self.root.push_child(node),
        }
    }

    fn close(&mut self, name: &str) {
        let Some(depth) = self
            .stack
            .iter()
            .rposition(|open| open.name().eq_ignore_ascii_case(name))
        else {
            self.issues.push(MarkupIssue::StrayEndTag {
                name: name.to_string(),
            });
            return;
        };

        while self.stack.len() > depth + 1 {
            if let Some(unclosed) = self.stack.pop() {
                self.issues.push(MarkupIssue::UnclosedElement {
                    name: unclosed.name().to_string(),
                });
                self.append(Node::Element(unclosed));
            }
        }

        if let Some(closed) = self.stack.pop() {
            self.append(Node::Element(closed));
        }
    }

    fn finish(mut self) -> (Element, Vec<MarkupIssue>) {
        while let Some(unclosed) = self.stack.pop() {
            self.issues.push(MarkupIssue::UnclosedElement {
                name: unclosed.name().to_string(),
            });
            self.append(Node::Element(unclosed));
        }
        if self.root.child_elements().next().is_none() {
            self.issues.push(MarkupIssue::NoElements);
        }
        (self.root, self.issues)
    }
}

/// Resolves a general entity reference (without `&` and `;`).
fn resolve_entity(entity: &str) -> Option<String> {
    let named = match entity {
        "apos" => Some('\''),
        "quot" => Some('"'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "amp" => Some('&'),
        "nbsp" => Some('\u{a0}'),
        "thinsp" => Some('\u{2009}'),
        "ndash" => Some('\u{2013}'),
        "mdash" => Some('\u{2014}'),
        "minus" => Some('\u{2212}'),
        "hellip" => Some('\u{2026}'),
        _ => None,
    };
    if let Some(c) = named {
        return Some(c.to_string());
    }

    if let Some(hex) = entity
        .strip_prefix("#x")
        .or_else(|| entity.strip_prefix("#X"))
    {
        if let Ok(code) = u32::from_str_radix(hex, 16)
            && let Some(c) = char::from_u32(code)
        {
            return Some(c.to_string());
        }
    } else if let Some(dec) = entity.strip_prefix('#')
        && let Ok(code) = dec.parse::<u32>()
        && let Some(c) = char::from_u32(code)
    {
        return Some(c.to_string());
    }

    None
}

/// Unescapes entity references inside an attribute value, keeping unknown ones verbatim.
fn unescape_value(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let after = &rest[amp + 1..];
        match after.find(';') {
            Some(semi) if semi > 0 && semi <= 10 => match resolve_entity(&after[..semi]) {
                Some(resolved) => {
                    out.push_str(&resolved);
                    rest = &after[semi + 1..];
                }
                None => {
                    out.push('&');
                    rest = after;
                }
            },
            _ => {
                out.push('&');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_markup_well_formed_has_no_issues() {
        let parsed = parse_markup(r#"<article><ref id="r1">Smith</ref></article>"#);
        assert!(parsed.issues.is_empty(), "issues: {:?}", parsed.issues);
        let article = parsed.tree.find("article").unwrap();
        assert_eq!(article.find("ref").unwrap().attr("id"), Some("r1"));
    }

    #[test]
    fn test_parse_markup_resolves_entities_in_text() {
        let parsed = parse_markup("<p>A &amp; B &#8211; C &nbsp;D &unknown;</p>");
        let text = parsed.tree.find("p").unwrap().text();
        assert!(text.starts_with("A & B \u{2013} C"), "got {text}");
        assert!(text.ends_with("&unknown;"), "unknown entity kept verbatim: {text}");
    }

    #[test]
    fn test_parse_markup_unescapes_attribute_values() {
        let parsed = parse_markup(r#"<xref rid="r1&amp;r2"/>"#);
        assert_eq!(parsed.tree.find("xref").unwrap().attr("rid"), Some("r1&r2"));
    }

    #[test]
    fn test_parse_markup_closes_unclosed_child_on_parent_end() {
        let parsed = parse_markup("<ref-list><ref id=\"r1\"><label>1</ref></ref-list>");
        let list = parsed.tree.find("ref-list").unwrap();
        assert_eq!(list.find_all("ref").count(), 1);
        assert!(
            parsed
                .issues
                .iter()
                .any(|i| matches!(i, MarkupIssue::UnclosedElement { name } if name == "label"))
        );
    }

    #[test]
    fn test_parse_markup_ignores_stray_end_tag() {
        let parsed = parse_markup("<body><p>text</p></div></body>");
        assert!(parsed.tree.find("body").unwrap().find("p").is_some());
        assert!(
            parsed
                .issues
                .iter()
                .any(|i| matches!(i, MarkupIssue::StrayEndTag { name } if name == "div"))
        );
    }

    #[test]
    fn test_parse_markup_truncated_input_keeps_partial_tree() {
        let parsed = parse_markup("<article><body><p>Cut off here");
        let p = parsed.tree.find("p").unwrap();
        assert_eq!(p.text(), "Cut off here");
        assert!(!parsed.issues.is_empty());
    }

    #[test]
    fn test_parse_markup_captures_doctype() {
        let parsed = parse_markup(
            "<?xml version=\"1.0\"?>\n<!DOCTYPE collection SYSTEM \"BioC.dtd\">\n<collection/>",
        );
        assert!(parsed.doctype.unwrap().contains("BioC.dtd"));
    }

    #[test]
    fn test_parse_markup_empty_input_reports_no_elements() {
        let parsed = parse_markup("");
        assert_eq!(parsed.issues, vec![MarkupIssue::NoElements]);
    }

    fn depth(element: &Element) -> usize {
        let mut deepest = 0;
        let mut stack = vec![(element, 0usize)];
        while let Some((current, level)) = stack.pop() {
            deepest = deepest.max(level);
            stack.extend(current.child_elements().map(|child| (child, level + 1)));
        }
        deepest
    }

    #[test]
    fn test_parse_markup_caps_nesting_depth() {
        let source = format!("<root>{}x", "<a>".repeat(10_000));
        let parsed = parse_markup(&source);
        assert!(depth(&parsed.tree) <= MAX_NESTING_DEPTH + 1);
        let capped = parsed
            .issues
            .iter()
            .filter(|i| matches!(i, MarkupIssue::NestingTooDeep { .. }))
            .count();
        assert_eq!(capped, 1, "limit is reported once");
        assert_eq!(parsed.tree.find("root").unwrap().text(), "x");
    }

    #[test]
    fn test_parse_markup_deep_input_fits_small_stack() {
        let handle = std::thread::Builder::new()
            .stack_size(2 * 1024 * 1024)
            .spawn(|| {
                let source = format!("<root>{}x", "<a>".repeat(200_000));
                let parsed = parse_markup(&source);
                let text = parsed.tree.text();
                drop(parsed);
                text
            })
            .unwrap();
        assert_eq!(handle.join().unwrap(), "x");
    }

    #[test]
    fn test_unescape_value_keeps_bare_ampersand() {
        assert_eq!(unescape_value("AT&T"), "AT&T");
        assert_eq!(unescape_value("a&lt;b"), "a<b");
    }
}
