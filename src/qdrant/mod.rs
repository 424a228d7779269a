//! Qdrant vector store integration.

pub mod client;
pub mod filters;
pub mod store;
pub mod types;

pub use client::{QdrantService, UPSERT_BATCH_SIZE};
pub use filters::filename_filter;
pub use store::{SEARCH_LIMIT, SEARCH_SCORE_THRESHOLD, VectorStore};
pub use types::{ChunkPayload, ChunkPoint, QdrantError, SchemaReport, ScoredChunk};
