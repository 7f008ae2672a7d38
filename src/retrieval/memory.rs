//! In-memory vector index implementation.
//!
//! Useful for testing and tiny corpora. Scores passages by keyword overlap
//! with the query rather than a real embedding metric, so scores are crude
//! but deterministic.

use super::{IndexHit, IndexQuery, VectorIndex};
use crate::error::Result;
use async_trait::async_trait;
use std::sync::RwLock;

/// One indexed passage.
#[derive(Debug, Clone)]
struct Passage {
    content: String,
    source_id: String,
    language: Option<String>,
}

/// In-memory keyword-overlap index.
pub struct MemoryVectorIndex {
    passages: RwLock<Vec<Passage>>,
}

impl MemoryVectorIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        Self {
            passages: RwLock::new(Vec::new()),
        }
    }

    /// Add a passage.
    pub fn insert(&self, content: &str, source_id: &str, language: Option<&str>) {
        let mut passages = self.passages.write().unwrap();
        passages.push(Passage {
            content: content.to_string(),
            source_id: source_id.to_string(),
            language: language.map(|l| l.to_string()),
        });
    }
}

impl Default for MemoryVectorIndex {
    fn default() -> Self {
        Self::new()
    }
}

/// Fraction of query terms that appear in the passage.
fn overlap_score(query: &str, content: &str) -> f32 {
    let content_lower = content.to_lowercase();
    let terms: Vec<&str> = query.split_whitespace().collect();
    if terms.is_empty() {
        return 0.0;
    }

    let matched = terms
        .iter()
        .filter(|t| content_lower.contains(&t.to_lowercase()))
        .count();

    matched as f32 / terms.len() as f32
}

#[async_trait]
impl VectorIndex for MemoryVectorIndex {
    async fn query(&self, request: &IndexQuery) -> Result<Vec<IndexHit>> {
        let passages = self.passages.read().unwrap();

        let mut hits: Vec<IndexHit> = passages
            .iter()
            .filter(|p| match (&request.language, &p.language) {
                (Some(wanted), Some(have)) => wanted == have,
                _ => true,
            })
            .map(|p| IndexHit {
                content: p.content.clone(),
                source_id: p.source_id.clone(),
                score: overlap_score(&request.query_text, &p.content),
            })
            .filter(|h| h.score > 0.0)
            .collect();

        hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        hits.truncate(request.top_k);

        Ok(hits)
    }
}
