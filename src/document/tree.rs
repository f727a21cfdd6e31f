//! Owned element tree produced by the tolerant parser.

/// A single attribute as written in the markup (value already unescaped).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    /// Qualified attribute name (e.g. `xml:id`, `ref-type`).
    pub name: String,
    /// Unescaped attribute value.
    pub value: String,
}

/// A node in the element tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// Nested element.
    Element(Element),
    /// Character data (entities resolved, whitespace preserved).
    Text(String),
}

/// An element with its attributes and children.
///
/// Name and attribute lookups use the local name (namespace prefix stripped)
/// and compare ASCII case-insensitively, so `listBibl`, `listbibl` and
/// `tei:listBibl` are the same element for every query in this crate.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Element {
    name: String,
    attributes: Vec<Attribute>,
    children: Vec<Node>,
}

impl Element {
    /// Creates an element with the given qualified name and attributes.
    #[must_use]
    pub fn new(name: impl Into<String>, attributes: Vec<Attribute>) -> Self {
        Self {
            name: name.into(),
            attributes,
            children: Vec::new(),
        }
    }

    /// Returns the qualified name as written.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the name without its namespace prefix.
    #[must_use]
    pub fn local_name(&self) -> &str {
        local_part(&self.name)
    }

    /// Returns true if this element's local name equals `local` (ASCII case-insensitive).
    #[must_use]
    pub fn is(&self, local: &str) -> bool {
        self.local_name().eq_ignore_ascii_case(local)
    }

    /// Returns true if this element's local name is any of `names`.
    #[must_use]
    pub fn is_any(&self, names: &[&str]) -> bool {
        names.iter().any(|name| self.is(name))
    }

    /// Looks up an attribute by exact qualified name, then by local name.
    ///
    /// `attr("id")` therefore finds both `id="r1"` and `xml:id="b0"`.
    #[must_use]
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name.eq_ignore_ascii_case(name))
            .or_else(|| {
                self.attributes
                    .iter()
                    .find(|a| local_part(&a.name).eq_ignore_ascii_case(name))
            })
            .map(|a| a.value.as_str())
    }

    /// Returns true if attribute `name` exists and equals `value` (ASCII case-insensitive).
    #[must_use]
    pub fn attr_is(&self, name: &str, value: &str) -> bool {
        self.attr(name)
            .is_some_and(|v| v.trim().eq_ignore_ascii_case(value))
    }

    /// Returns all attributes in document order.
    #[must_use]
    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    /// Returns all child nodes in document order.
    #[must_use]
    pub fn children(&self) -> &[Node] {
        &self.children
    }

    pub(crate) fn push_child(&mut self, node: Node) {
        if let Node::Text(text) = &node
            && let Some(Node::Text(previous)) = self.children.last_mut()
        {
            previous.push_str(text);
            return;
        }
        self.children.push(node);
    }

    /// Iterates over direct child elements.
    pub fn child_elements(&self) -> impl DoubleEndedIterator<Item = &Element> {
        self.children.iter().filter_map(|node| match node {
            Node::Element(element) => Some(element),
            Node::Text(_) => None,
        })
    }

    /// Returns the first direct child element with the given local name.
    #[must_use]
    pub fn find_child(&self, local: &str) -> Option<&Element> {
        self.child_elements().find(|child| child.is(local))
    }

    /// Iterates over all descendant elements in document (pre-)order, excluding `self`.
    #[must_use]
    pub fn descendants(&self) -> Descendants<'_> {
        Descendants {
            stack: self.child_elements().rev().collect(),
        }
    }

    /// Returns the first descendant with the given local name.
    #[must_use]
    pub fn find(&self, local: &str) -> Option<&Element> {
        self.descendants().find(|element| element.is(local))
    }

    /// Iterates over every descendant with the given local name.
    pub fn find_all<'a>(&'a self, local: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.descendants().filter(move |element| element.is(local))
    }

    /// Returns the element's text content with whitespace collapsed.
    ///
    /// Text from separate nodes is joined by a single space, so
    /// `<a>Smith<b>2020</b></a>` reads `Smith 2020`.
    #[must_use]
    pub fn text(&self) -> String {
        self.text_excluding(&[])
    }

    /// Like [`Element::text`], but skips subtrees whose local name is in `skip`.
    #[must_use]
    pub fn text_excluding(&self, skip: &[&str]) -> String {
        let mut pieces = Vec::new();
        self.collect_text(skip, &mut pieces);
        collapse_whitespace(&pieces.join(" "))
    }

    fn collect_text<'a>(&'a self, skip: &[&str], pieces: &mut Vec<&'a str>) {
        for child in &self.children {
            match child {
                Node::Text(text) => pieces.push(text),
                Node::Element(element) if !element.is_any(skip) => {
                    element.collect_text(skip, pieces);
                }
                Node::Element(_) => {}
            }
        }
    }
}

/// Pre-order iterator over descendant elements.
#[derive(Debug)]
pub struct Descendants<'a> {
    stack: Vec<&'a Element>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = &'a Element;

    fn next(&mut self) -> Option<Self::Item> {
        let next = self.stack.pop()?;
        self.stack.extend(next.child_elements().rev());
        Some(next)
    }
}

/// Collapses every whitespace run to a single space and trims the ends.
#[must_use]
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn local_part(name: &str) -> &str {
    name.rsplit_once(':').map_or(name, |(_, local)| local)
}
