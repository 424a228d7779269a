//! Service coordinating extraction, chunking, embedding, and Qdrant operations.

use crate::{
    config::Config,
    embedding::{EmbeddingClient, OpenAiEmbeddingClient, embed_in_batches},
    extraction::{LopdfExtractor, PdfExtractor, extract_document},
    metrics::{MetricsSnapshot, PipelineMetrics},
    processing::{
        chunking::{RecursiveCharacterSplitter, char_len},
        types::{
            AskRequest, AskResponse, ClearResponse, HealthResponse, IngestError, IngestOutcome,
            QueryError, StartupError, UploadResponse,
        },
    },
    qdrant::{
        ChunkPayload, ChunkPoint, QdrantError, QdrantService, SEARCH_LIMIT,
        SEARCH_SCORE_THRESHOLD, VectorStore,
    },
};
use async_trait::async_trait;
use std::sync::Arc;

/// Answer returned when a question does not name a document.
pub const NO_FILENAME_MESSAGE: &str =
    "No PDF filename provided. Upload a PDF first (frontend should pass filename).";
/// Answer returned when no stored chunk clears the score threshold.
pub const NO_RESULTS_MESSAGE: &str = "No relevant information found in that PDF.";
/// Text placed before the retrieved context in every answer.
pub const ANSWER_PREFIX: &str = "Based on the PDF content, here's what I found:\n\n";
/// Longest context, in characters, copied into an answer.
pub const MAX_CONTEXT_CHARS: usize = 2000;
/// Confirmation returned after the collection is rebuilt.
pub const CLEARED_MESSAGE: &str = "Collection cleared and recreated with index.";

/// Runs the ingestion and query pipelines over shared backend handles.
///
/// Build it once at startup and share it through an `Arc`; every handle it owns is safe to use
/// from concurrent requests.
pub struct PdfQaService {
    extractor: Arc<dyn PdfExtractor>,
    embedding_client: Arc<dyn EmbeddingClient>,
    store: Arc<dyn VectorStore>,
    splitter: RecursiveCharacterSplitter,
    metrics: Arc<PipelineMetrics>,
}

/// Operations exposed to the HTTP surface.
///
/// Every method folds its failures into the returned payload, so callers only serialize.
#[async_trait]
pub trait PdfQaApi: Send + Sync {
    /// Extract, chunk, embed, and store an uploaded PDF.
    async fn upload_pdf(&self, filename: String, bytes: Vec<u8>) -> UploadResponse;

    /// Answer a question from the chunks of one document.
    async fn ask(&self, request: AskRequest) -> AskResponse;

    /// Report Qdrant reachability and collection state.
    async fn health(&self) -> HealthResponse;

    /// Drop every stored chunk and rebuild the collection.
    async fn clear_collection(&self) -> ClearResponse;

    /// Retrieve the current metrics snapshot for diagnostics.
    fn metrics_snapshot(&self) -> MetricsSnapshot;
}

impl PdfQaService {
    /// Assemble a service from explicit components.
    pub fn new(
        extractor: Arc<dyn PdfExtractor>,
        embedding_client: Arc<dyn EmbeddingClient>,
        store: Arc<dyn VectorStore>,
        splitter: RecursiveCharacterSplitter,
    ) -> Self {
        Self {
            extractor,
            embedding_client,
            store,
            splitter,
            metrics: Arc::new(PipelineMetrics::new()),
        }
    }

    /// Build the production service: `lopdf` extraction, OpenAI embeddings, and Qdrant storage.
    pub fn from_config(config: &Config) -> Result<Self, StartupError> {
        tracing::info!("Initializing embedding client");
        let embedding_client = OpenAiEmbeddingClient::new(config)?;
        let store = QdrantService::new(config)?;
        tracing::info!(
            collection = %store.collection_name(),
            "Backend clients initialized"
        );

        Ok(Self::new(
            Arc::new(LopdfExtractor),
            Arc::new(embedding_client),
            Arc::new(store),
            RecursiveCharacterSplitter::default(),
        ))
    }

    /// Reset the collection at startup. Failures are logged and the service stays usable.
    pub async fn initialize_schema(&self) {
        match self.store.ensure_schema().await {
            Ok(report) => tracing::info!(
                dropped_existing = report.dropped_existing,
                index_ready = report.index_error.is_none(),
                "Collection schema initialized"
            ),
            Err(error) => {
                tracing::error!(error = %error, "Failed to initialize collection schema");
            }
        }
    }

    /// Run the ingestion pipeline for one uploaded document.
    ///
    /// Stops at the first failing step. Batches already written to Qdrant when a later upsert
    /// fails are left in place.
    pub async fn ingest_pdf(
        &self,
        filename: String,
        bytes: Vec<u8>,
    ) -> Result<IngestOutcome, IngestError> {
        tracing::info!(filename = %filename, bytes = bytes.len(), "Received PDF upload");

        let extractor = Arc::clone(&self.extractor);
        let document =
            tokio::task::spawn_blocking(move || extract_document(extractor.as_ref(), &bytes))
                .await??;
        let text_length = document.text_length();
        tracing::debug!(
            filename = %filename,
            pages = document.page_count,
            text_length,
            "Extracted PDF text"
        );

        let chunks = self.splitter.split_text(&document.text);
        if chunks.is_empty() {
            return Err(IngestError::NoChunks);
        }
        tracing::debug!(filename = %filename, chunks = chunks.len(), "Split text into chunks");

        let vectors = embed_in_batches(self.embedding_client.as_ref(), &chunks).await?;
        tracing::debug!(filename = %filename, vectors = vectors.len(), "Embedded chunks");

        let points: Vec<ChunkPoint> = chunks
            .into_iter()
            .zip(vectors)
            .enumerate()
            .map(|(chunk_index, (text, vector))| {
                ChunkPoint::new(
                    vector,
                    ChunkPayload {
                        text,
                        filename: filename.clone(),
                        chunk_index,
                    },
                )
            })
            .collect();

        let chunks_stored = self.store.upsert(points).await?;
        self.metrics.record_document(chunks_stored as u64);
        tracing::info!(
            filename = %filename,
            chunks = chunks_stored,
            pages = document.page_count,
            "Document stored"
        );

        Ok(IngestOutcome {
            chunks_stored,
            filename,
            text_length,
            pages_processed: document.page_count,
        })
    }

    /// Run the query pipeline for one question.
    pub async fn answer_question(&self, request: AskRequest) -> Result<AskResponse, QueryError> {
        let AskRequest { question, filename } = request;
        let Some(filename) = filename.filter(|name| !name.is_empty()) else {
            tracing::debug!("Question received without a filename");
            return Ok(AskResponse::without_sources(NO_FILENAME_MESSAGE));
        };

        let vector = self.embedding_client.embed_query(&question).await?;
        let hits = self
            .store
            .search(vector, &filename, SEARCH_LIMIT, SEARCH_SCORE_THRESHOLD)
            .await?;
        self.metrics.record_question();
        tracing::info!(filename = %filename, hits = hits.len(), "Question answered");
        for hit in &hits {
            tracing::debug!(
                id = %hit.id,
                score = hit.score,
                chunk_index = ?hit.chunk_index,
                "Retrieved chunk"
            );
        }

        if hits.is_empty() {
            return Ok(AskResponse::without_sources(NO_RESULTS_MESSAGE));
        }

        let context = hits
            .iter()
            .map(|hit| hit.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");
        let context_length = char_len(&context);

        Ok(AskResponse::Answer {
            answer: format!("{ANSWER_PREFIX}{}", truncate_context(&context)),
            sources_found: hits.len(),
            context_length: Some(context_length),
        })
    }

    /// Probe Qdrant for the collection and the total number of collections.
    pub async fn health(&self) -> HealthResponse {
        match self.probe_collections().await {
            Ok((collection_exists, total_collections)) => HealthResponse::Healthy {
                qdrant_connected: true,
                collection_exists,
                total_collections,
            },
            Err(error) => {
                tracing::warn!(error = %error, "Qdrant health probe failed");
                HealthResponse::Unhealthy {
                    error: error.to_string(),
                }
            }
        }
    }

    async fn probe_collections(&self) -> Result<(bool, usize), QdrantError> {
        let collection_exists = self.store.collection_exists().await?;
        let total_collections = self.store.list_collections().await?.len();
        Ok((collection_exists, total_collections))
    }

    /// Drop the collection and recreate it with its `filename` index.
    ///
    /// Unlike the startup reset, a failed index creation is reported as an error here.
    pub async fn clear_collection(&self) -> ClearResponse {
        let result = match self.store.ensure_schema().await {
            Ok(report) => match report.index_error {
                None => Ok(()),
                Some(error) => Err(error),
            },
            Err(error) => Err(error),
        };

        match result {
            Ok(()) => {
                tracing::info!("Collection cleared");
                ClearResponse::Success {
                    message: CLEARED_MESSAGE.to_string(),
                }
            }
            Err(error) => {
                tracing::error!(error = %error, "Failed to clear collection");
                ClearResponse::Error {
                    message: format!("Error clearing collection: {error}"),
                }
            }
        }
    }

    /// Return the current pipeline metrics snapshot.
    pub fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }
}

/// First [`MAX_CONTEXT_CHARS`] characters of `context`, with `...` appended when cut.
fn truncate_context(context: &str) -> String {
    match context.char_indices().nth(MAX_CONTEXT_CHARS) {
        Some((cut, _)) => format!("{}...", &context[..cut]),
        None => context.to_string(),
    }
}

#[async_trait]
impl PdfQaApi for PdfQaService {
    async fn upload_pdf(&self, filename: String, bytes: Vec<u8>) -> UploadResponse {
        match self.ingest_pdf(filename, bytes).await {
            Ok(outcome) => outcome.into(),
            Err(error) => {
                tracing::error!(error = %error, "PDF ingestion failed");
                error.into()
            }
        }
    }

    async fn ask(&self, request: AskRequest) -> AskResponse {
        match self.answer_question(request).await {
            Ok(response) => response,
            Err(error) => {
                tracing::error!(error = %error, "Question failed");
                error.into()
            }
        }
    }

    async fn health(&self) -> HealthResponse {
        PdfQaService::health(self).await
    }

    async fn clear_collection(&self) -> ClearResponse {
        PdfQaService::clear_collection(self).await
    }

    fn metrics_snapshot(&self) -> MetricsSnapshot {
        PdfQaService::metrics_snapshot(self)
    }
}
