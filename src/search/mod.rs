//! Web search fallback.
//!
//! Invoked only when the evaluator judges indexed evidence insufficient.
//! Results are normalized into the same evidence shape as retrieved
//! passages, with relevance assigned by result rank. Provider failures
//! collapse to an empty set; synthesis proceeds with whatever evidence
//! exists.

mod http;

pub use http::HttpSearchProvider;

use crate::error::Result;
use crate::evidence::{EvidenceItem, EvidenceOrigin, EvidenceSet};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// One web search result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    pub title: String,
    pub snippet: String,
    pub url: String,
}

/// Capability trait for the external search service.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Run a web search and return up to `max_results` results, best first.
    async fn search(&self, query_text: &str, max_results: usize) -> Result<Vec<SearchHit>>;
}

/// Maps search results into an [`EvidenceSet`], absorbing provider failures.
pub struct WebSearcher {
    provider: Arc<dyn SearchProvider>,
    max_results: usize,
    timeout: Duration,
}

impl WebSearcher {
    /// Create a searcher over the given provider.
    pub fn new(provider: Arc<dyn SearchProvider>, max_results: usize, timeout: Duration) -> Self {
        Self {
            provider,
            max_results,
            timeout,
        }
    }

    /// Search the web and fold the results into evidence.
    ///
    /// Relevance is assigned by rank: the first of `n` results scores
    /// `n/n`, the last `1/n`. Errors, timeouts, and empty results all
    /// yield an empty set.
    pub async fn search(&self, query_text: &str) -> EvidenceSet {
        let hits = match tokio::time::timeout(
            self.timeout,
            self.provider.search(query_text, self.max_results),
        )
        .await
        {
            Ok(Ok(hits)) => hits,
            Ok(Err(e)) => {
                warn!("Web search failed, proceeding without web evidence: {}", e);
                return EvidenceSet::new();
            }
            Err(_) => {
                warn!(
                    "Web search timed out after {:?}, proceeding without web evidence",
                    self.timeout
                );
                return EvidenceSet::new();
            }
        };

        debug!("Web search returned {} results", hits.len());

        let total = hits.len();
        let mut evidence = EvidenceSet::new();
        evidence.extend(hits.into_iter().enumerate().map(|(rank, hit)| {
            let score = (total - rank) as f32 / total as f32;
            let content = if hit.title.is_empty() {
                hit.snippet
            } else {
                format!("{}: {}", hit.title, hit.snippet)
            };
            EvidenceItem::new(content, hit.url, EvidenceOrigin::Web, score)
        }));
        evidence
    }
}
