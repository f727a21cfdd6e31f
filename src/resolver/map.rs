//! Lookup tables from labels and ids to bibliography entries.

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use tracing::debug;

use crate::bibliography::BibliographyEntry;
use crate::warning::CitationWarning;

/// Normalizes an ordinal token or label for comparison.
///
/// Whitespace is removed, leading zeros are stripped (`"007"` becomes `"7"`,
/// `"0"` stays `"0"`), and letters are lowercased.
#[must_use]
pub fn normalize_ordinal(token: &str) -> String {
    let compact: String = token
        .chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect();
    let stripped = compact.trim_start_matches('0');
    if stripped.is_empty() && !compact.is_empty() {
        "0".to_string()
    } else {
        stripped.to_string()
    }
}

/// Normalized label and id indexes over one document's entries.
#[derive(Debug)]
pub(crate) struct BibliographyMap<'a> {
    entries: &'a [BibliographyEntry],
    by_label: HashMap<String, usize>,
    by_id: HashMap<&'a str, usize>,
    warnings: Vec<CitationWarning>,
}

impl<'a> BibliographyMap<'a> {
    pub(crate) fn build(entries: &'a [BibliographyEntry]) -> Self {
        let mut by_label = HashMap::with_capacity(entries.len());
        let mut by_id = HashMap::with_capacity(entries.len());
        let mut warnings = Vec::new();

        for (index, entry) in entries.iter().enumerate() {
            by_id.entry(entry.id()).or_insert(index);

            let label = normalize_ordinal(entry.label());
            if label.is_empty() {
                continue;
            }
            match by_label.entry(label) {
                Entry::Vacant(slot) => {
                    slot.insert(index);
                }
                Entry::Occupied(slot) => {
                    let kept = &entries[*slot.get()];
                    debug!(label = %slot.key(), kept = kept.id(), ignored = entry.id(), "duplicate label");
                    warnings.push(CitationWarning::DuplicateLabel {
                        label: slot.key().clone(),
                        kept_id: kept.id().to_string(),
                        ignored_id: entry.id().to_string(),
                    });
                }
            }
        }

        Self {
            entries,
            by_label,
            by_id,
            warnings,
        }
    }

    pub(crate) fn by_id(&self, id: &str) -> Option<&'a BibliographyEntry> {
        self.by_id.get(id).map(|&index| &self.entries[index])
    }

    pub(crate) fn by_label(&self, normalized_label: &str) -> Option<&'a BibliographyEntry> {
        self.by_label
            .get(normalized_label)
            .map(|&index| &self.entries[index])
    }

    pub(crate) fn warnings(&self) -> &[CitationWarning] {
        &self.warnings
    }
}
