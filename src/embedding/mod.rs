//! Embedding client abstraction and the OpenAI-compatible adapter.
//!
//! The adapter issues `POST {base_url}/embeddings` requests directly with `reqwest`. Every
//! vector returned by the provider is checked against the configured dimension so that a model
//! mismatch surfaces here instead of as a rejected Qdrant write.

use crate::config::Config;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;

/// Largest number of texts sent to the provider in one ingestion request.
pub const EMBED_BATCH_SIZE: usize = 50;

/// Errors raised by embedding providers.
#[derive(Debug, Error)]
pub enum EmbeddingClientError {
    /// HTTP layer failed before receiving a response.
    #[error("Embedding request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// Provider answered with a non-success status.
    #[error("Failed to generate embeddings ({status}): {body}")]
    GenerationFailed {
        /// HTTP status returned by the provider.
        status: reqwest::StatusCode,
        /// Body payload associated with the failing response.
        body: String,
    },
    /// Provider returned a different number of vectors than inputs.
    #[error("Embedding provider returned {actual} vectors for {expected} inputs")]
    CountMismatch {
        /// Number of texts submitted.
        expected: usize,
        /// Number of vectors received.
        actual: usize,
    },
    /// Returned embedding dimension does not match configuration.
    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Expected embedding dimension configured on the server.
        expected: usize,
        /// Actual embedding dimension produced by the provider.
        actual: usize,
    },
}

/// Interface implemented by embedding backends.
#[async_trait]
pub trait EmbeddingClient: Send + Sync {
    /// Produce one embedding vector per supplied text, in input order.
    async fn embed_documents(
        &self,
        texts: Vec<String>,
    ) -> Result<Vec<Vec<f32>>, EmbeddingClientError>;

    /// Produce the embedding vector for a single question.
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, EmbeddingClientError>;
}

/// Embedding client for OpenAI's `/embeddings` endpoint and compatible servers.
pub struct OpenAiEmbeddingClient {
    http: Client,
    base_url: String,
    api_key: String,
    model: String,
    dimension: usize,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    #[serde(default)]
    index: usize,
    embedding: Vec<f32>,
}

impl OpenAiEmbeddingClient {
    /// Construct a client from the loaded configuration.
    pub fn new(config: &Config) -> Result<Self, EmbeddingClientError> {
        let http = Client::builder().user_agent("pdf-qa/0.1").build()?;
        tracing::debug!(
            base_url = %config.openai_base_url,
            model = %config.embedding_model,
            dimension = config.embedding_dimension,
            "Initialized embedding client"
        );
        Ok(Self {
            http,
            base_url: config.openai_base_url.trim_end_matches('/').to_string(),
            api_key: config.openai_api_key.clone(),
            model: config.embedding_model.clone(),
            dimension: config.embedding_dimension,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/embeddings", self.base_url)
    }

    async fn request_embeddings(
        &self,
        texts: Vec<String>,
    ) -> Result<Vec<Vec<f32>>, EmbeddingClientError> {
        let expected = texts.len();
        if expected == 0 {
            return Ok(Vec::new());
        }

        tracing::debug!(model = %self.model, inputs = expected, "Requesting embeddings");
        let response = self
            .http
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&json!({
                "model": self.model,
                "input": texts,
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let error = EmbeddingClientError::GenerationFailed { status, body };
            tracing::error!(error = %error, "Embedding request failed");
            return Err(error);
        }

        let EmbeddingResponse { mut data } = response.json().await?;
        if data.len() != expected {
            return Err(EmbeddingClientError::CountMismatch {
                expected,
                actual: data.len(),
            });
        }

        data.sort_by_key(|item| item.index);
        data.into_iter()
            .map(|item| self.check_dimension(item.embedding))
            .collect()
    }

    fn check_dimension(&self, vector: Vec<f32>) -> Result<Vec<f32>, EmbeddingClientError> {
        if vector.len() == self.dimension {
            Ok(vector)
        } else {
            Err(EmbeddingClientError::DimensionMismatch {
                expected: self.dimension,
                actual: vector.len(),
            })
        }
    }
}

#[async_trait]
impl EmbeddingClient for OpenAiEmbeddingClient {
    async fn embed_documents(
        &self,
        texts: Vec<String>,
    ) -> Result<Vec<Vec<f32>>, EmbeddingClientError> {
        self.request_embeddings(texts).await
    }

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, EmbeddingClientError> {
        let mut vectors = self.request_embeddings(vec![text.to_string()]).await?;
        vectors.pop().ok_or(EmbeddingClientError::CountMismatch {
            expected: 1,
            actual: 0,
        })
    }
}

/// Embed `texts` in consecutive batches of at most [`EMBED_BATCH_SIZE`], concatenating results.
///
/// The first failing batch aborts the whole sequence.
pub async fn embed_in_batches(
    client: &dyn EmbeddingClient,
    texts: &[String],
) -> Result<Vec<Vec<f32>>, EmbeddingClientError> {
    let mut vectors = Vec::with_capacity(texts.len());
    for (batch_index, batch) in texts.chunks(EMBED_BATCH_SIZE).enumerate() {
        tracing::debug!(batch = batch_index, size = batch.len(), "Embedding batch");
        let batch_vectors = client.embed_documents(batch.to_vec()).await?;
        if batch_vectors.len() != batch.len() {
            return Err(EmbeddingClientError::CountMismatch {
                expected: batch.len(),
                actual: batch_vectors.len(),
            });
        }
        vectors.extend(batch_vectors);
    }
    Ok(vectors)
}
