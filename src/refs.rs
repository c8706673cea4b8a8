/// Link reference definitions collected while building blocks
use std::collections::HashMap;
use unicode_casefold::UnicodeCaseFold;

#[derive(Debug, Clone, PartialEq)]
pub struct LinkReference {
    pub destination: String,
    pub title: Option<String>,
}

/// Per-document map from normalized label to its definition.
///
/// Lives for one parse: the block builder fills it, the inline parser reads
/// it, and nothing is shared between documents.
#[derive(Debug, Default)]
pub struct LinkReferenceTable {
    map: HashMap<String, LinkReference>,
}

impl LinkReferenceTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a definition under `label` (the text between the brackets).
    /// The first definition for a label wins; returns false for an inert
    /// duplicate.
    pub fn insert(&mut self, label: &str, reference: LinkReference) -> bool {
        let key = normalize_label(label);
        if self.map.contains_key(&key) {
            log::debug!("ignoring duplicate link reference definition [{}]", key);
            return false;
        }
        log::debug!("link reference definition [{}] -> {}", key, reference.destination);
        self.map.insert(key, reference);
        true
    }

    pub fn get(&self, label: &str) -> Option<&LinkReference> {
        self.map.get(&normalize_label(label))
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

/// Normalize a link label for matching: Unicode case fold, trim, and
/// collapse internal whitespace runs to a single space.
pub fn normalize_label(label: &str) -> String {
    let collapsed = label.split_ascii_whitespace().collect::<Vec<_>>().join(" ");
    collapsed.chars().case_fold().collect()
}
