use crate::model::OwnershipNode;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A parsed share class label.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ShareClass {
    A,
    B,
    C,
    Ordinary,
    Other(String),
}

impl ShareClass {
    /// Parses labels like `"Class A"`, `"class_b"`, `"C"`, `"Ordinary shares"`.
    ///
    /// Matching is case-insensitive and ignores a leading `class` word and separators.
    pub fn parse(label: &str) -> Self {
        let key = normalize_class_key(label);
        match key.as_str() {
            "a" => ShareClass::A,
            "b" => ShareClass::B,
            "c" => ShareClass::C,
            "ordinary" | "ordinaryshares" | "ord" => ShareClass::Ordinary,
            _ => ShareClass::Other(label.trim().to_string()),
        }
    }

    /// Sort rank used by shareholder priority: A → 0, B → 1, C → 2, anything else → 3.
    pub fn rank(&self) -> u8 {
        match self {
            ShareClass::A => 0,
            ShareClass::B => 1,
            ShareClass::C => 2,
            ShareClass::Ordinary | ShareClass::Other(_) => 3,
        }
    }
}

/// Lower-cases, drops separators and strips a leading `class` word.
pub fn normalize_class_key(label: &str) -> String {
    let compact: String = label
        .chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect();
    match compact.strip_prefix("class") {
        Some(rest) if !rest.is_empty() => rest.to_string(),
        _ => compact,
    }
}

/// Total shares issued by the root, per class label.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShareClassTotals(IndexMap<String, i64>);

impl ShareClassTotals {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, class: impl Into<String>, total: i64) {
        self.0.insert(class.into(), total);
    }

    pub fn with(mut self, class: impl Into<String>, total: i64) -> Self {
        self.insert(class, total);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, i64)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Looks a class up by label, falling back to a normalized match (`"A"` finds `"Class A"`).
    pub fn total_for(&self, class: &str) -> Option<i64> {
        if let Some(v) = self.0.get(class) {
            return Some(*v);
        }
        let key = normalize_class_key(class);
        self.0
            .iter()
            .find(|(k, _)| normalize_class_key(k) == key)
            .map(|(_, v)| *v)
    }

    fn accumulate(&mut self, class: &str, count: i64) {
        let total = self.0.entry(class.to_string()).or_insert(0);
        *total = total.saturating_add(count);
    }

    /// Explicit totals are preferred by callers; this derives them when absent.
    ///
    /// Uses the root's own allocations when it lists any, otherwise the per-class sum over
    /// direct descendants.
    pub fn resolve(root: &OwnershipNode) -> Self {
        let mut totals = Self::new();
        if !root.share_allocations.is_empty() {
            for a in &root.share_allocations {
                totals.accumulate(&a.class, a.count);
            }
            return totals;
        }
        for child in &root.children {
            for a in &child.share_allocations {
                totals.accumulate(&a.class, a.count);
            }
        }
        totals
    }
}

impl FromIterator<(String, i64)> for ShareClassTotals {
    fn from_iter<T: IntoIterator<Item = (String, i64)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}
