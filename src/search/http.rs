//! HTTP-backed search provider.
//!
//! Works against JSON search APIs of the Tavily/SearXNG family: POST the
//! query with an optional bearer key, read back an ordered result list.

use super::{SearchHit, SearchProvider};
use crate::error::{Result, SvarError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use url::Url;

/// Search provider reached over HTTP.
pub struct HttpSearchProvider {
    client: reqwest::Client,
    endpoint: Url,
    api_key: Option<String>,
}

#[derive(Debug, Serialize)]
struct SearchRequest<'a> {
    query: &'a str,
    max_results: usize,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    results: Vec<SearchHit>,
}

impl HttpSearchProvider {
    /// Create a provider for the given endpoint, with an optional API key.
    pub fn new(endpoint: &str, api_key: Option<&str>) -> Result<Self> {
        let endpoint = Url::parse(endpoint).map_err(|e| {
            SvarError::Config(format!("Invalid search endpoint '{}': {}", endpoint, e))
        })?;

        Ok(Self {
            client: reqwest::Client::new(),
            endpoint,
            api_key: api_key.map(|k| k.to_string()),
        })
    }
}

#[async_trait]
impl SearchProvider for HttpSearchProvider {
    async fn search(&self, query_text: &str, max_results: usize) -> Result<Vec<SearchHit>> {
        let mut request = self.client.post(self.endpoint.clone()).json(&SearchRequest {
            query: query_text,
            max_results,
        });

        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| SvarError::Search(e.to_string()))?;

        if !response.status().is_success() {
            return Err(SvarError::Search(format!(
                "Search provider returned status {}",
                response.status()
            )));
        }

        let body: SearchResponse = response
            .json()
            .await
            .map_err(|e| SvarError::Search(format!("Malformed search response: {}", e)))?;

        Ok(body.results.into_iter().take(max_results).collect())
    }
}
