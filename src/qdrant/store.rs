//! Storage abstraction consumed by the ingestion and query pipelines.

use crate::qdrant::{
    QdrantService,
    types::{ChunkPoint, QdrantError, SchemaReport, ScoredChunk},
};
use async_trait::async_trait;

/// Default number of neighbours returned for a question.
pub const SEARCH_LIMIT: usize = 5;
/// Minimum cosine similarity a chunk must reach to be returned.
pub const SEARCH_SCORE_THRESHOLD: f64 = 0.1;

/// Operations the pipelines need from the vector database.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Drop and recreate the collection with its `filename` index.
    async fn ensure_schema(&self) -> Result<SchemaReport, QdrantError>;

    /// Persist points, returning how many were written.
    async fn upsert(&self, points: Vec<ChunkPoint>) -> Result<usize, QdrantError>;

    /// Nearest neighbours of `vector` among chunks of `filename`.
    async fn search(
        &self,
        vector: Vec<f32>,
        filename: &str,
        limit: usize,
        score_threshold: f64,
    ) -> Result<Vec<ScoredChunk>, QdrantError>;

    /// Whether the document collection is present.
    async fn collection_exists(&self) -> Result<bool, QdrantError>;

    /// Names of every collection known to the database.
    async fn list_collections(&self) -> Result<Vec<String>, QdrantError>;
}

#[async_trait]
impl VectorStore for QdrantService {
    async fn ensure_schema(&self) -> Result<SchemaReport, QdrantError> {
        self.recreate_collection().await
    }

    async fn upsert(&self, points: Vec<ChunkPoint>) -> Result<usize, QdrantError> {
        self.upsert_points(points).await
    }

    async fn search(
        &self,
        vector: Vec<f32>,
        filename: &str,
        limit: usize,
        score_threshold: f64,
    ) -> Result<Vec<ScoredChunk>, QdrantError> {
        self.search_by_filename(vector, filename, limit, score_threshold)
            .await
    }

    async fn collection_exists(&self) -> Result<bool, QdrantError> {
        QdrantService::collection_exists(self).await
    }

    async fn list_collections(&self) -> Result<Vec<String>, QdrantError> {
        QdrantService::list_collections(self).await
    }
}
