//! Ollama-backed embedding and answer generation providers

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::{EmbeddingConfig, GenerationConfig};
use crate::error::{Error, Result};
use crate::types::response::RetrievedChunk;

use super::embedding::Embedder;
use super::generation::AnswerGenerator;

/// Ollama embedding provider (nomic-embed-text or similar)
pub struct OllamaEmbedder {
    client: reqwest::Client,
    base_url: String,
    model: String,
    dimensions: usize,
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Deserialize)]
struct EmbedResponse {
    embedding: Vec<f32>,
}

impl OllamaEmbedder {
    /// Create a new embedder from configuration
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            dimensions: config.dimensions,
        })
    }
}

#[async_trait]
impl Embedder for OllamaEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let response = self
            .client
            .post(format!("{}/api/embeddings", self.base_url))
            .json(&EmbedRequest {
                model: &self.model,
                prompt: text,
            })
            .send()
            .await
            .map_err(|e| Error::StoreUnavailable(format!("Embedding request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(Error::StoreUnavailable(format!(
                "Embedding service returned {}",
                response.status()
            )));
        }

        let body: EmbedResponse = response
            .json()
            .await
            .map_err(|e| Error::StoreUnavailable(format!("Invalid embedding response: {}", e)))?;

        if body.embedding.len() != self.dimensions {
            return Err(Error::Internal(format!(
                "Embedding has {} dimensions, expected {}",
                body.embedding.len(),
                self.dimensions
            )));
        }

        Ok(body.embedding)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn name(&self) -> &str {
        "ollama"
    }
}

/// Ollama answer generator.
///
/// Builds the prompt from the retrieved chunks only; the model is instructed
/// to answer from that context and to cite filenames.
pub struct OllamaGenerator {
    client: reqwest::Client,
    base_url: String,
    model: String,
    temperature: f32,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: String,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Serialize)]
struct GenerateOptions {
    temperature: f32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

impl OllamaGenerator {
    /// Create a new generator from configuration
    pub fn new(config: &GenerationConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            temperature: config.temperature,
        })
    }

    fn build_prompt(question: &str, chunks: &[RetrievedChunk]) -> String {
        let context = chunks
            .iter()
            .map(|c| format!("[From {}, chunk {}]:\n{}", c.filename, c.ordinal, c.text))
            .collect::<Vec<_>>()
            .join("\n\n");

        format!(
            "Answer the question using only the document excerpts below. \
             Cite the source filename for any fact you use. If the excerpts \
             do not contain the answer, say so.\n\n\
             Excerpts:\n{}\n\nQuestion: {}\n\nAnswer:",
            context, question
        )
    }
}

#[async_trait]
impl AnswerGenerator for OllamaGenerator {
    async fn generate(&self, question: &str, chunks: &[RetrievedChunk]) -> Result<String> {
        let request = GenerateRequest {
            model: &self.model,
            prompt: Self::build_prompt(question, chunks),
            stream: false,
            options: GenerateOptions {
                temperature: self.temperature,
            },
        };

        let response = self
            .client
            .post(format!("{}/api/generate", self.base_url))
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::StoreUnavailable(format!("Generation request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(Error::StoreUnavailable(format!(
                "Generation service returned {}",
                response.status()
            )));
        }

        let body: GenerateResponse = response
            .json()
            .await
            .map_err(|e| Error::StoreUnavailable(format!("Invalid generation response: {}", e)))?;

        Ok(body.response.trim().to_string())
    }

    fn name(&self) -> &str {
        "ollama"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn prompt_carries_provenance_for_citations() {
        let chunks = vec![RetrievedChunk {
            document_id: Uuid::new_v4(),
            filename: "Report_Q1.pdf".to_string(),
            ordinal: 2,
            text: "Sales were $1.2M in Q1.".to_string(),
            score: 0.93,
        }];

        let prompt = OllamaGenerator::build_prompt("What were Q1 sales?", &chunks);
        assert!(prompt.contains("[From Report_Q1.pdf, chunk 2]"));
        assert!(prompt.contains("Sales were $1.2M in Q1."));
        assert!(prompt.contains("What were Q1 sales?"));
    }
}
