use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters describing ingestion and query activity.
#[derive(Default)]
pub struct PipelineMetrics {
    documents_ingested: AtomicU64,
    chunks_stored: AtomicU64,
    questions_answered: AtomicU64,
    last_document_chunks: AtomicU64,
}

impl PipelineMetrics {
    /// Create an empty metrics accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a stored document and the number of chunks written for it.
    pub fn record_document(&self, chunk_count: u64) {
        self.documents_ingested.fetch_add(1, Ordering::Relaxed);
        self.chunks_stored.fetch_add(chunk_count, Ordering::Relaxed);
        self.last_document_chunks
            .store(chunk_count, Ordering::Relaxed);
    }

    /// Record a question that reached the vector store.
    pub fn record_question(&self) {
        self.questions_answered.fetch_add(1, Ordering::Relaxed);
    }

    /// Return a snapshot of the current counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let documents_ingested = self.documents_ingested.load(Ordering::Relaxed);
        MetricsSnapshot {
            documents_ingested,
            chunks_stored: self.chunks_stored.load(Ordering::Relaxed),
            questions_answered: self.questions_answered.load(Ordering::Relaxed),
            last_document_chunks: (documents_ingested > 0)
                .then(|| self.last_document_chunks.load(Ordering::Relaxed)),
        }
    }
}

/// Immutable view of pipeline counters used for reporting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct MetricsSnapshot {
    /// Number of documents stored since startup.
    pub documents_ingested: u64,
    /// Total chunk count written across all stored documents.
    pub chunks_stored: u64,
    /// Number of questions that were embedded and searched.
    pub questions_answered: u64,
    /// Chunk count of the most recently stored document.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_document_chunks: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_documents_and_chunks() {
        let metrics = PipelineMetrics::new();
        metrics.record_document(2);
        metrics.record_document(3);
        metrics.record_question();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.documents_ingested, 2);
        assert_eq!(snapshot.chunks_stored, 5);
        assert_eq!(snapshot.questions_answered, 1);
        assert_eq!(snapshot.last_document_chunks, Some(3));
    }

    #[test]
    fn empty_snapshot_omits_last_document() {
        let snapshot = PipelineMetrics::new().snapshot();
        assert_eq!(snapshot, MetricsSnapshot::default());
        let json = serde_json::to_value(snapshot).unwrap();
        assert!(json.get("last_document_chunks").is_none());
    }
}
