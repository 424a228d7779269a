//! Core data types, error definitions, and response payloads for the pipelines.
//!
//! Every pipeline operation ends in one of the response enums below. Their variants are the
//! exact JSON bodies served over HTTP, so the transport layer never has to interpret failures.

use crate::{embedding::EmbeddingClientError, extraction::ExtractionError, qdrant::QdrantError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors produced while configuring the chunk splitter.
#[derive(Debug, Error)]
pub enum ChunkingError {
    /// Splitter configured with a zero chunk size.
    #[error("chunk size must be greater than zero")]
    InvalidChunkSize,
    /// Overlap cannot exceed the chunk it is carved from.
    #[error("chunk overlap {chunk_overlap} is larger than chunk size {chunk_size}")]
    OverlapTooLarge {
        /// Configured chunk size.
        chunk_size: usize,
        /// Configured overlap.
        chunk_overlap: usize,
    },
}

/// Errors emitted by the ingestion pipeline.
#[derive(Debug, Error)]
pub enum IngestError {
    /// Multipart body was malformed or lacked a usable `file` field.
    #[error("{0}")]
    Upload(String),
    /// Upload could not be turned into text.
    #[error(transparent)]
    Extraction(#[from] ExtractionError),
    /// Splitter produced nothing from the extracted text.
    #[error("No chunks were created from the extracted text.")]
    NoChunks,
    /// Embedding provider failed to produce vectors for the chunks.
    #[error("{0}")]
    Embedding(#[from] EmbeddingClientError),
    /// Qdrant rejected or failed an upsert batch.
    #[error("{0}")]
    Storage(#[from] QdrantError),
    /// Blocking extraction task panicked or was cancelled.
    #[error("extraction task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl IngestError {
    /// Message placed in the `{status: "error"}` body returned to clients.
    pub fn user_message(&self) -> String {
        match self {
            Self::Upload(_)
            | Self::Extraction(ExtractionError::Oversize { .. })
            | Self::Extraction(ExtractionError::NoText)
            | Self::NoChunks => self.to_string(),
            other => format!("Error processing PDF: {other}"),
        }
    }
}

/// Errors emitted while answering a question.
#[derive(Debug, Error)]
pub enum QueryError {
    /// Request body could not be decoded.
    #[error("{0}")]
    InvalidRequest(String),
    /// Embedding provider failed to return a vector for the question.
    #[error("{0}")]
    Embedding(#[from] EmbeddingClientError),
    /// Qdrant search request returned an error response.
    #[error("{0}")]
    Storage(#[from] QdrantError),
}

impl QueryError {
    /// Message placed in the `{status: "error"}` body returned to clients.
    pub fn user_message(&self) -> String {
        format!("Error processing query: {self}")
    }
}

/// Errors raised while wiring the long-lived service handles at startup.
#[derive(Debug, Error)]
pub enum StartupError {
    /// Embedding client could not be constructed.
    #[error("Failed to initialize embedding client: {0}")]
    Embedding(#[from] EmbeddingClientError),
    /// Qdrant client could not be constructed.
    #[error("Failed to initialize Qdrant client: {0}")]
    Qdrant(#[from] QdrantError),
}

/// Counters reported after a document has been stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestOutcome {
    /// Number of chunks written to Qdrant.
    pub chunks_stored: usize,
    /// Filename the chunks were stored under.
    pub filename: String,
    /// Length of the annotated extracted text, in characters.
    pub text_length: usize,
    /// Number of pages in the uploaded document.
    pub pages_processed: usize,
}

/// Body of `POST /ask`.
#[derive(Debug, Clone, Deserialize)]
pub struct AskRequest {
    /// Natural-language question.
    pub question: String,
    /// File whose chunks are searched; empty or missing means no file was selected.
    #[serde(default)]
    pub filename: Option<String>,
}

/// Response body of `POST /upload-pdf`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum UploadResponse {
    /// Document stored.
    Success {
        /// Number of chunks written to Qdrant.
        chunks_stored: usize,
        /// Filename the chunks were stored under.
        filename: String,
        /// Length of the annotated extracted text, in characters.
        text_length: usize,
        /// Number of pages in the uploaded document.
        pages_processed: usize,
    },
    /// Ingestion halted.
    Error {
        /// Human readable reason.
        message: String,
    },
}

impl From<IngestOutcome> for UploadResponse {
    fn from(outcome: IngestOutcome) -> Self {
        Self::Success {
            chunks_stored: outcome.chunks_stored,
            filename: outcome.filename,
            text_length: outcome.text_length,
            pages_processed: outcome.pages_processed,
        }
    }
}

impl From<IngestError> for UploadResponse {
    fn from(error: IngestError) -> Self {
        Self::Error {
            message: error.user_message(),
        }
    }
}

/// Literal `status` value carried by error bodies that have no other tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorStatus {
    /// Serialized as `"error"`.
    Error,
}

/// Response body of `POST /ask`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AskResponse {
    /// Extracted answer, or a guidance message with zero sources.
    Answer {
        /// Answer text or guidance message.
        answer: String,
        /// Number of chunks the answer was drawn from.
        sources_found: usize,
        /// Untruncated context length in characters; absent when nothing was found.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        context_length: Option<usize>,
    },
    /// Query failed.
    Error {
        /// Always `"error"`.
        status: ErrorStatus,
        /// Human readable reason.
        message: String,
    },
}

impl AskResponse {
    /// Message-only answer reporting zero sources.
    pub fn without_sources(message: &str) -> Self {
        Self::Answer {
            answer: message.to_string(),
            sources_found: 0,
            context_length: None,
        }
    }
}

impl From<QueryError> for AskResponse {
    fn from(error: QueryError) -> Self {
        Self::Error {
            status: ErrorStatus::Error,
            message: error.user_message(),
        }
    }
}

/// Response body of `GET /health`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum HealthResponse {
    /// Qdrant answered.
    Healthy {
        /// Always `true` for this variant.
        qdrant_connected: bool,
        /// Whether the document collection exists.
        collection_exists: bool,
        /// Number of collections in Qdrant.
        total_collections: usize,
    },
    /// Qdrant could not be reached or answered with an error.
    Unhealthy {
        /// Failure description.
        error: String,
    },
}

/// Response body of `DELETE /clear-collection`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ClearResponse {
    /// Collection dropped and recreated with its index.
    Success {
        /// Confirmation text.
        message: String,
    },
    /// Recreation failed.
    Error {
        /// Human readable reason.
        message: String,
    },
}
