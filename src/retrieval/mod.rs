//! Evidence retrieval from the vector index.
//!
//! The index itself is an external service consumed through the
//! [`VectorIndex`] capability trait; this module owns the mapping from index
//! hits to evidence and the policy that an unreachable index is treated as
//! "no evidence" rather than a hard error.

mod http;
mod memory;

pub use http::HttpVectorIndex;
pub use memory::MemoryVectorIndex;

use crate::error::Result;
use crate::evidence::{EvidenceItem, EvidenceOrigin, EvidenceSet};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// A nearest-neighbor query against the index.
#[derive(Debug, Clone, Serialize)]
pub struct IndexQuery {
    pub query_text: String,
    pub top_k: usize,
    /// Language filter, applied where the backend supports it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

/// One hit returned by the index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexHit {
    pub content: String,
    pub source_id: String,
    pub score: f32,
}

/// Capability trait for the vector index query interface.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Run a semantic nearest-neighbor lookup.
    async fn query(&self, request: &IndexQuery) -> Result<Vec<IndexHit>>;
}

/// Maps index hits into an [`EvidenceSet`], absorbing index failures.
pub struct Retriever {
    index: Arc<dyn VectorIndex>,
    top_k: usize,
    timeout: Duration,
}

impl Retriever {
    /// Create a retriever over the given index.
    pub fn new(index: Arc<dyn VectorIndex>, top_k: usize, timeout: Duration) -> Self {
        Self {
            index,
            top_k,
            timeout,
        }
    }

    /// Retrieve evidence for a query.
    ///
    /// An unreachable or timed-out index yields an empty set; the workflow
    /// treats that identically to insufficient evidence.
    pub async fn retrieve(&self, query_text: &str, language: Option<&str>) -> EvidenceSet {
        let request = IndexQuery {
            query_text: query_text.to_string(),
            top_k: self.top_k,
            language: language.map(|l| l.to_string()),
        };

        let hits = match tokio::time::timeout(self.timeout, self.index.query(&request)).await {
            Ok(Ok(hits)) => hits,
            Ok(Err(e)) => {
                warn!("Vector index query failed, proceeding without indexed evidence: {}", e);
                return EvidenceSet::new();
            }
            Err(_) => {
                warn!(
                    "Vector index query timed out after {:?}, proceeding without indexed evidence",
                    self.timeout
                );
                return EvidenceSet::new();
            }
        };

        debug!("Index returned {} hits", hits.len());

        let mut evidence = EvidenceSet::new();
        evidence.extend(hits.into_iter().map(|hit| {
            EvidenceItem::new(
                hit.content,
                hit.source_id,
                EvidenceOrigin::Indexed,
                normalize_score(hit.score),
            )
        }));
        evidence
    }
}

/// Normalize a backend similarity metric to [0, 1].
///
/// Cosine-style similarities already in range pass through; values above 1
/// are assumed to be distances (lower is better) and mapped via `1/(1+d)`;
/// negative values clamp to 0.
pub fn normalize_score(raw: f32) -> f32 {
    if raw < 0.0 {
        0.0
    } else if raw <= 1.0 {
        raw
    } else {
        1.0 / (1.0 + raw)
    }
}
