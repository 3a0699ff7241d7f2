//! Remote Qdrant vector index
//!
//! Talks to Qdrant's JSON REST API. Every point carries `owner`,
//! `document_id`, `ordinal`, and `text` in its payload; queries always send a
//! server-side filter on the stored `owner` tag. All requests share one
//! bounded timeout, so a slow or unreachable store surfaces
//! `StoreUnavailable` instead of hanging the caller.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use uuid::Uuid;

use crate::config::VectorIndexConfig;
use crate::error::{Error, Result};

use super::vector_index::{sort_scored, ChunkRecord, ScoredChunk, VectorIndex};

/// Qdrant-backed vector index
pub struct QdrantIndex {
    client: reqwest::Client,
    base_url: String,
    collection: String,
}

#[derive(Deserialize)]
struct SearchResponse {
    result: Vec<SearchHit>,
}

#[derive(Deserialize)]
struct SearchHit {
    score: f32,
    payload: Option<serde_json::Value>,
}

impl QdrantIndex {
    /// Connect to Qdrant and make sure the collection exists.
    ///
    /// Creating a collection that already exists is not an error; payload
    /// indexes on `owner` and `document_id` keep scoped queries fast.
    pub async fn connect(config: &VectorIndexConfig, dimensions: usize) -> Result<Self> {
        let mut headers = reqwest::header::HeaderMap::new();
        if let Some(api_key) = &config.api_key {
            let mut value = reqwest::header::HeaderValue::from_str(api_key)
                .map_err(|e| Error::Config(format!("Invalid Qdrant API key: {}", e)))?;
            value.set_sensitive(true);
            headers.insert("api-key", value);
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(headers)
            .build()
            .map_err(|e| Error::Config(format!("Failed to build HTTP client: {}", e)))?;

        let index = Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            collection: config.collection.clone(),
        };

        index.ensure_collection(dimensions).await?;
        Ok(index)
    }

    async fn ensure_collection(&self, dimensions: usize) -> Result<()> {
        let url = format!("{}/collections/{}", self.base_url, self.collection);

        let response = self
            .client
            .put(&url)
            .json(&json!({
                "vectors": { "size": dimensions, "distance": "Cosine" }
            }))
            .send()
            .await
            .map_err(store_unavailable)?;

        // 409 means the collection already exists
        if !response.status().is_success() && response.status().as_u16() != 409 {
            return Err(Error::StoreUnavailable(format!(
                "Failed to create collection: {}",
                response.status()
            )));
        }

        for field in ["owner", "document_id"] {
            let response = self
                .client
                .put(format!("{}/index", url))
                .json(&json!({ "field_name": field, "field_schema": "keyword" }))
                .send()
                .await
                .map_err(store_unavailable)?;

            if !response.status().is_success() && response.status().as_u16() != 409 {
                tracing::warn!(field, status = %response.status(), "payload index creation failed");
            }
        }

        tracing::info!(collection = %self.collection, "Qdrant collection ready");
        Ok(())
    }

    fn owner_filter(owner: Uuid) -> serde_json::Value {
        json!({
            "must": [
                { "key": "owner", "match": { "value": owner.to_string() } }
            ]
        })
    }
}

#[async_trait]
impl VectorIndex for QdrantIndex {
    async fn upsert(&self, records: &[ChunkRecord]) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }

        let points: Vec<serde_json::Value> = records
            .iter()
            .map(|r| {
                json!({
                    "id": r.id.to_string(),
                    "vector": r.embedding,
                    "payload": {
                        "owner": r.owner.to_string(),
                        "document_id": r.document_id.to_string(),
                        "ordinal": r.ordinal,
                        "text": r.text,
                    }
                })
            })
            .collect();

        let response = self
            .client
            .put(format!(
                "{}/collections/{}/points?wait=true",
                self.base_url, self.collection
            ))
            .json(&json!({ "points": points }))
            .send()
            .await
            .map_err(store_unavailable)?;

        if !response.status().is_success() {
            return Err(Error::StoreUnavailable(format!(
                "Upsert failed: {}",
                response.status()
            )));
        }

        Ok(())
    }

    async fn query(
        &self,
        owner: Uuid,
        embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<ScoredChunk>> {
        let response = self
            .client
            .post(format!(
                "{}/collections/{}/points/search",
                self.base_url, self.collection
            ))
            .json(&json!({
                "vector": embedding,
                "limit": top_k,
                "with_payload": true,
                "filter": Self::owner_filter(owner),
            }))
            .send()
            .await
            .map_err(store_unavailable)?;

        if !response.status().is_success() {
            return Err(Error::StoreUnavailable(format!(
                "Search failed: {}",
                response.status()
            )));
        }

        let body: SearchResponse = response
            .json()
            .await
            .map_err(|e| Error::StoreUnavailable(format!("Invalid search response: {}", e)))?;

        let mut results = Vec::with_capacity(body.result.len());
        for hit in body.result {
            let Some(payload) = hit.payload else { continue };

            let document_id = payload
                .get("document_id")
                .and_then(|v| v.as_str())
                .and_then(|s| Uuid::parse_str(s).ok());
            let Some(document_id) = document_id else {
                tracing::warn!("search hit without a document_id payload, skipping");
                continue;
            };

            results.push(ScoredChunk {
                document_id,
                ordinal: payload.get("ordinal").and_then(|v| v.as_u64()).unwrap_or(0) as u32,
                text: payload
                    .get("text")
                    .and_then(|v| v.as_str())
                    .unwrap_or("")
                    .to_string(),
                score: hit.score,
            });
        }

        // Qdrant orders by score; re-sort for deterministic tie-breaks
        sort_scored(&mut results);
        Ok(results)
    }

    async fn delete_document(&self, owner: Uuid, document_id: Uuid) -> Result<()> {
        let response = self
            .client
            .post(format!(
                "{}/collections/{}/points/delete?wait=true",
                self.base_url, self.collection
            ))
            .json(&json!({
                "filter": {
                    "must": [
                        { "key": "owner", "match": { "value": owner.to_string() } },
                        { "key": "document_id", "match": { "value": document_id.to_string() } }
                    ]
                }
            }))
            .send()
            .await
            .map_err(store_unavailable)?;

        if !response.status().is_success() {
            return Err(Error::StoreUnavailable(format!(
                "Delete failed: {}",
                response.status()
            )));
        }

        Ok(())
    }

    fn name(&self) -> &str {
        "qdrant"
    }
}

fn store_unavailable(e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::StoreUnavailable("Vector store timed out".to_string())
    } else {
        Error::StoreUnavailable(format!("Vector store request failed: {}", e))
    }
}
