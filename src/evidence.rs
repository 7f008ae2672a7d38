//! Evidence model for grounded answers.
//!
//! An [`EvidenceItem`] is a content fragment plus the source it came from,
//! produced either by the vector index retriever or the web search fallback.
//! An [`EvidenceSet`] collects items for a single query: deduplicated by
//! source, capped, and ranked by descending relevance.

use serde::{Deserialize, Serialize};

/// Where a piece of evidence came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvidenceOrigin {
    /// Retrieved from the local vector index.
    Indexed,
    /// Fetched from live web search.
    Web,
}

/// A content fragment with its source, used to ground an answer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvidenceItem {
    /// Text content of the fragment.
    pub content: String,
    /// Source identifier (document/segment reference or URL).
    pub source: String,
    /// Which retrieval path produced this item.
    pub origin: EvidenceOrigin,
    /// Relevance score in [0, 1], higher is better.
    pub relevance_score: f32,
}

impl EvidenceItem {
    /// Create a new evidence item.
    pub fn new(
        content: impl Into<String>,
        source: impl Into<String>,
        origin: EvidenceOrigin,
        relevance_score: f32,
    ) -> Self {
        Self {
            content: content.into(),
            source: source.into(),
            origin,
            relevance_score,
        }
    }
}

/// An ordered, source-deduplicated collection of evidence for one query.
///
/// Append-only within a single workflow run. Items are kept sorted by
/// descending relevance; when two items share a source, the higher-scoring
/// one wins.
#[derive(Debug, Clone)]
pub struct EvidenceSet {
    items: Vec<EvidenceItem>,
    max_items: usize,
}

/// Default cap on evidence items per query.
pub const DEFAULT_MAX_ITEMS: usize = 12;

impl EvidenceSet {
    /// Create an empty evidence set with the default cap.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_MAX_ITEMS)
    }

    /// Create an empty evidence set with a custom cap.
    pub fn with_capacity(max_items: usize) -> Self {
        Self {
            items: Vec::new(),
            max_items,
        }
    }

    /// Add an item, deduplicating by source and enforcing the cap.
    pub fn push(&mut self, item: EvidenceItem) {
        if let Some(existing) = self.items.iter_mut().find(|i| i.source == item.source) {
            if item.relevance_score > existing.relevance_score {
                *existing = item;
            }
        } else {
            self.items.push(item);
        }

        self.items.sort_by(|a, b| {
            b.relevance_score
                .partial_cmp(&a.relevance_score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        self.items.truncate(self.max_items);
    }

    /// Add multiple items.
    pub fn extend(&mut self, items: impl IntoIterator<Item = EvidenceItem>) {
        for item in items {
            self.push(item);
        }
    }

    /// Items in descending relevance order.
    pub fn items(&self) -> &[EvidenceItem] {
        &self.items
    }

    /// Consume the set, yielding its items in relevance order.
    pub fn into_items(self) -> Vec<EvidenceItem> {
        self.items
    }

    /// Highest relevance score, or 0.0 when empty.
    pub fn top_score(&self) -> f32 {
        self.items.first().map(|i| i.relevance_score).unwrap_or(0.0)
    }

    /// All source identifiers, in relevance order.
    pub fn sources(&self) -> Vec<&str> {
        self.items.iter().map(|i| i.source.as_str()).collect()
    }

    /// Whether any item came from the given origin.
    pub fn has_origin(&self, origin: EvidenceOrigin) -> bool {
        self.items.iter().any(|i| i.origin == origin)
    }

    /// Number of items.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the set holds no evidence.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl Default for EvidenceSet {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(source: &str, score: f32) -> EvidenceItem {
        EvidenceItem::new("content", source, EvidenceOrigin::Indexed, score)
    }

    #[test]
    fn test_ranked_descending() {
        let mut set = EvidenceSet::new();
        set.push(item("a", 0.2));
        set.push(item("b", 0.9));
        set.push(item("c", 0.5));

        let scores: Vec<f32> = set.items().iter().map(|i| i.relevance_score).collect();
        assert_eq!(scores, vec![0.9, 0.5, 0.2]);
        assert!((set.top_score() - 0.9).abs() < f32::EPSILON);
    }

    #[test]
    fn test_dedup_by_source_keeps_higher_score() {
        let mut set = EvidenceSet::new();
        set.push(item("a", 0.3));
        set.push(item("a", 0.8));
        set.push(item("a", 0.1));

        assert_eq!(set.len(), 1);
        assert!((set.top_score() - 0.8).abs() < f32::EPSILON);
    }

    #[test]
    fn test_cap_enforced() {
        let mut set = EvidenceSet::with_capacity(2);
        set.push(item("a", 0.5));
        set.push(item("b", 0.9));
        set.push(item("c", 0.7));

        assert_eq!(set.len(), 2);
        assert_eq!(set.sources(), vec!["b", "c"]);
    }

    #[test]
    fn test_empty_set() {
        let set = EvidenceSet::new();
        assert!(set.is_empty());
        assert_eq!(set.top_score(), 0.0);
        assert!(set.sources().is_empty());
    }

    #[test]
    fn test_mixed_origins() {
        let mut set = EvidenceSet::new();
        set.push(item("seg-1", 0.6));
        set.push(EvidenceItem::new(
            "web content",
            "https://example.com",
            EvidenceOrigin::Web,
            0.4,
        ));

        assert!(set.has_origin(EvidenceOrigin::Indexed));
        assert!(set.has_origin(EvidenceOrigin::Web));
    }
}
