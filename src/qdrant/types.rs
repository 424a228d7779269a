//! Point, payload, and error types exchanged with Qdrant, plus the REST response shapes.

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use uuid::Uuid;

/// Errors returned while interacting with Qdrant.
#[derive(Debug, Error)]
pub enum QdrantError {
    /// Base URL failed to parse or normalize.
    #[error("Invalid Qdrant URL: {0}")]
    InvalidUrl(String),
    /// Request never produced a response (connection refused, timeout).
    #[error("Qdrant request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// Qdrant answered with a status the caller does not accept.
    #[error("Qdrant returned {status}: {body}")]
    UnexpectedStatus {
        /// Status line of the response.
        status: StatusCode,
        /// Raw response body, empty when unreadable.
        body: String,
    },
}

/// Payload stored alongside every chunk vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkPayload {
    /// Chunk text exactly as produced by the splitter.
    pub text: String,
    /// Name of the uploaded file the chunk belongs to.
    pub filename: String,
    /// Position of the chunk within its document, starting at zero.
    pub chunk_index: usize,
}

/// Prepared point ready for upsert.
#[derive(Debug, Clone, Serialize)]
pub struct ChunkPoint {
    /// Freshly generated identifier; re-uploads never collide.
    pub id: Uuid,
    /// Embedding vector produced for the chunk text.
    pub vector: Vec<f32>,
    /// Stored payload.
    pub payload: ChunkPayload,
}

impl ChunkPoint {
    /// Build a point with a new random identifier.
    pub fn new(vector: Vec<f32>, payload: ChunkPayload) -> Self {
        Self {
            id: Uuid::new_v4(),
            vector,
            payload,
        }
    }
}

/// Search hit returned by [`crate::qdrant::VectorStore::search`].
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredChunk {
    /// Identifier assigned to the vector.
    pub id: String,
    /// Cosine similarity reported by Qdrant.
    pub score: f32,
    /// Stored chunk text; empty when the payload lacks a `text` field.
    pub text: String,
    /// Stored chunk position, when present.
    pub chunk_index: Option<usize>,
}

/// Outcome of recreating the collection.
#[derive(Debug, Default)]
pub struct SchemaReport {
    /// Whether an existing collection was dropped first.
    pub dropped_existing: bool,
    /// Failure raised while creating the `filename` payload index, if any.
    pub index_error: Option<QdrantError>,
}

/// `{"result": ...}` wrapper around every Qdrant REST response.
#[derive(Deserialize)]
pub(crate) struct Envelope<T> {
    pub(crate) result: T,
}

#[derive(Deserialize)]
pub(crate) struct CollectionList {
    pub(crate) collections: Vec<CollectionName>,
}

#[derive(Deserialize)]
pub(crate) struct CollectionName {
    pub(crate) name: String,
}

/// Hits from `points/query`; servers answer with either a bare list or `{"points": [...]}`.
#[derive(Deserialize)]
#[serde(untagged)]
pub(crate) enum QueryHits {
    Bare(Vec<RawHit>),
    Wrapped {
        #[serde(default)]
        points: Vec<RawHit>,
    },
}

impl QueryHits {
    pub(crate) fn into_hits(self) -> Vec<RawHit> {
        match self {
            Self::Bare(hits) | Self::Wrapped { points: hits } => hits,
        }
    }
}

#[derive(Deserialize)]
pub(crate) struct RawHit {
    pub(crate) id: Value,
    pub(crate) score: f32,
    #[serde(default)]
    pub(crate) payload: Option<Map<String, Value>>,
}
