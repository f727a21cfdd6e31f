//! In-text citation pointer scanning.
//!
//! The scanner works on a document's flattened [`BodyText`]. Three pointer
//! forms are recognized:
//!
//! - explicit cross-references (`xref`, TEI `ref`, Wiley `link`) carrying
//!   target ids, taken from the body's structural anchors;
//! - bracketed numeral lists such as `[3]`, `[1,2]` and `[1,3-5]`;
//! - superscripts whose text is a numeral list, unless they follow a number
//!   or a unit of measure (`10<sup>6</sup>`, `m<sup>2</sup>`).
//!
//! Numeral forms are expanded into ordinal tokens at scan time. Where forms
//! overlap, explicit cross-references win over brackets, and brackets win over
//! superscripts.

mod ordinal;

pub use ordinal::expand_ordinals;

use serde::Serialize;
use tracing::{debug, trace};

use crate::bibliography::find_dois;
use crate::constants::DEFAULT_MAX_RANGE_SPAN;
use crate::document::{AnchorKind, BodyText, Span};

use ordinal::{BRACKET_PATTERN, NUMERAL_LIST_PATTERN};

/// Tokens after which a numeric superscript is an exponent, not a citation.
const UNIT_TOKENS: &[&str] = &[
    "m", "cm", "mm", "km", "nm", "µm", "μm", "s", "ms", "g", "kg", "mg", "l", "ml", "mol",
    "ha", "ft", "yr",
];

/// How a pointer was written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum PointerForm {
    /// Square-bracketed numeral list
    Bracket,
    /// Superscript numeral list
    Superscript,
    /// Markup element naming its targets
    CrossReference,
}

/// One in-text citation marker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PointerOccurrence {
    span: Span,
    raw_text: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    explicit_target_ids: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    ordinal_tokens: Vec<String>,
    form: PointerForm,
}

impl PointerOccurrence {
    /// Creates an occurrence.
    #[must_use]
    pub fn new(
        span: Span,
        raw_text: impl Into<String>,
        explicit_target_ids: Vec<String>,
        ordinal_tokens: Vec<String>,
        form: PointerForm,
    ) -> Self {
        Self {
            span,
            raw_text: raw_text.into(),
            explicit_target_ids,
            ordinal_tokens,
            form,
        }
    }

    /// Character span in the body text.
    #[must_use]
    pub fn span(&self) -> Span {
        self.span
    }

    /// Text the marker covered, e.g. `"[1-3]"`.
    #[must_use]
    pub fn raw_text(&self) -> &str {
        &self.raw_text
    }

    /// Target ids for cross-references; empty for numeral forms.
    #[must_use]
    pub fn explicit_target_ids(&self) -> &[String] {
        &self.explicit_target_ids
    }

    /// Expanded ordinals for numeral forms; empty for cross-references.
    #[must_use]
    pub fn ordinal_tokens(&self) -> &[String] {
        &self.ordinal_tokens
    }

    /// How the marker was written.
    #[must_use]
    pub fn form(&self) -> PointerForm {
        self.form
    }
}

/// Scanner settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanOptions {
    /// Widest numeral range that is expanded; wider ranges keep their endpoints
    pub max_range_span: u32,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            max_range_span: DEFAULT_MAX_RANGE_SPAN,
        }
    }
}

/// Finds citation pointers in body text.
#[derive(Debug, Clone, Copy, Default)]
pub struct PointerScanner {
    options: ScanOptions,
}

impl PointerScanner {
    /// Creates a scanner with the given options.
    #[must_use]
    pub fn new(options: ScanOptions) -> Self {
        Self { options }
    }

    /// Scans a flattened body, ordered by span start then end.
    #[tracing::instrument(skip_all, fields(body_chars = body.text().chars().count()))]
    #[must_use]
    pub fn scan(&self, body: &BodyText) -> Vec<PointerOccurrence> {
        let text = body.text();
        let mut accepted: Vec<PointerOccurrence> = Vec::new();

        let mut offsets = Offsets::new(text);
        for anchor in body.anchors() {
            if let AnchorKind::CrossReference { target_ids } = &anchor.kind {
                accepted.push(PointerOccurrence::new(
                    anchor.span,
                    offsets.slice(anchor.span),
                    target_ids.clone(),
                    Vec::new(),
                    PointerForm::CrossReference,
                ));
            }
        }

        for bracket in self.brackets(text) {
            admit(&mut accepted, bracket);
        }

        let mut offsets = Offsets::new(text);
        for anchor in body.anchors() {
            if anchor.kind != AnchorKind::Superscript {
                continue;
            }
            let preceding = offsets.prefix(anchor.span.start);
            let raw = offsets.slice(anchor.span);
            if !NUMERAL_LIST_PATTERN.is_match(raw) {
                continue;
            }
            if follows_quantity(preceding) {
                trace!(superscript = %raw, "exponent skipped");
                continue;
            }
            let tokens = expand_ordinals(raw, self.options.max_range_span);
            admit(
                &mut accepted,
                PointerOccurrence::new(anchor.span, raw, Vec::new(), tokens, PointerForm::Superscript),
            );
        }

        accepted.sort_by_key(|pointer| pointer.span);
        debug!(pointers = accepted.len(), "body scanned");
        accepted
    }

    /// Scans plain text with no structural anchors (bracket forms only).
    #[must_use]
    pub fn scan_text(&self, text: &str) -> Vec<PointerOccurrence> {
        self.scan(&BodyText::from_plain(text))
    }

    /// Finds DOIs written directly in the body, with character spans.
    #[must_use]
    pub fn scan_dois(&self, body: &BodyText) -> Vec<(Span, String)> {
        let text = body.text();
        let mut offsets = Offsets::new(text);
        find_dois(text)
            .into_iter()
            .map(|found| {
                let span = Span::new(offsets.char_offset(found.start), offsets.char_offset(found.end));
                (span, found.doi)
            })
            .collect()
    }

    fn brackets(&self, text: &str) -> Vec<PointerOccurrence> {
        let mut offsets = Offsets::new(text);
        BRACKET_PATTERN
            .find_iter(text)
            .map(|found| {
                let span = Span::new(offsets.char_offset(found.start()), offsets.char_offset(found.end()));
                let tokens = expand_ordinals(found.as_str(), self.options.max_range_span);
                PointerOccurrence::new(span, found.as_str(), Vec::new(), tokens, PointerForm::Bracket)
            })
            .collect()
    }
}

/// Adds `pointer` unless it overlaps one already accepted.
///
/// `accepted` stays sorted by span, so only the neighbours at the insertion
/// point can overlap.
fn admit(accepted: &mut Vec<PointerOccurrence>, pointer: PointerOccurrence) {
    let index = accepted.partition_point(|other| other.span < pointer.span);
    let winner = index
        .checked_sub(1)
        .into_iter()
        .chain(std::iter::once(index))
        .filter_map(|i| accepted.get(i))
        .find(|other| other.span.overlaps(&pointer.span));
    if let Some(winner) = winner {
        trace!(
            suppressed = %pointer.raw_text,
            kept = %winner.raw_text,
            "overlapping pointer suppressed"
        );
        return;
    }
    accepted.insert(index, pointer);
}

/// Returns true if the last token of `preceding` is a number or a unit of measure.
fn follows_quantity(preceding: &str) -> bool {
    let Some(token) = preceding.split_whitespace().next_back() else {
        return false;
    };
    if token.chars().last().is_some_and(|c| c.is_ascii_digit()) {
        return true;
    }
    UNIT_TOKENS
        .iter()
        .any(|unit| unit.eq_ignore_ascii_case(token))
}

/// Converts between byte and character offsets, walking forward from the last position.
///
/// Increasing lookups cost one pass over the text in total; a lookup behind
/// the cursor restarts from the beginning.
struct Offsets<'a> {
    text: &'a str,
    byte: usize,
    chars: usize,
}

impl<'a> Offsets<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            text,
            byte: 0,
            chars: 0,
        }
    }

    /// Character offset of byte offset `byte` (which must be a char boundary).
    fn char_offset(&mut self, byte: usize) -> usize {
        if byte < self.byte {
            self.byte = 0;
            self.chars = 0;
        }
        self.chars += self.text[self.byte..byte].chars().count();
        self.byte = byte;
        self.chars
    }

    /// Byte offset of character offset `chars`, clamped to the end of the text.
    fn byte_offset(&mut self, chars: usize) -> usize {
        if chars < self.chars {
            self.byte = 0;
            self.chars = 0;
        }
        for c in self.text[self.byte..].chars() {
            if self.chars == chars {
                break;
            }
            self.byte += c.len_utf8();
            self.chars += 1;
        }
        self.byte
    }

    /// Text before character offset `end`.
    fn prefix(&mut self, end: usize) -> &'a str {
        let end = self.byte_offset(end);
        &self.text[..end]
    }

    /// Text covered by `span`.
    fn slice(&mut self, span: Span) -> &'a str {
        let start = self.byte_offset(span.start);
        let end = self.byte_offset(span.end);
        &self.text[start..end]
    }
}
