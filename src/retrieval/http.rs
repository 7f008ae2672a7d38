//! HTTP-backed vector index client.
//!
//! Speaks a minimal JSON protocol: POST the query, get back an ordered hit
//! list. The index service itself (schema, writes, lifecycle) is out of
//! scope; this is a read-only consumer.

use super::{IndexHit, IndexQuery, VectorIndex};
use crate::error::{Result, SvarError};
use async_trait::async_trait;
use serde::Deserialize;
use url::Url;

/// Vector index reached over HTTP.
pub struct HttpVectorIndex {
    client: reqwest::Client,
    endpoint: Url,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    hits: Vec<IndexHit>,
}

impl HttpVectorIndex {
    /// Create a client for the given query endpoint.
    pub fn new(endpoint: &str) -> Result<Self> {
        let endpoint = Url::parse(endpoint)
            .map_err(|e| SvarError::Config(format!("Invalid index endpoint '{}': {}", endpoint, e)))?;

        Ok(Self {
            client: reqwest::Client::new(),
            endpoint,
        })
    }
}

#[async_trait]
impl VectorIndex for HttpVectorIndex {
    async fn query(&self, request: &IndexQuery) -> Result<Vec<IndexHit>> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .json(request)
            .send()
            .await
            .map_err(|e| SvarError::Retrieval(e.to_string()))?;

        if !response.status().is_success() {
            return Err(SvarError::Retrieval(format!(
                "Index returned status {}",
                response.status()
            )));
        }

        let body: QueryResponse = response
            .json()
            .await
            .map_err(|e| SvarError::Retrieval(format!("Malformed index response: {}", e)))?;

        Ok(body.hits)
    }
}
