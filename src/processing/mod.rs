//! Document pipelines: chunking, ingestion, and question answering.

pub mod chunking;
mod service;
pub mod types;

pub use service::{
    ANSWER_PREFIX, CLEARED_MESSAGE, MAX_CONTEXT_CHARS, NO_FILENAME_MESSAGE, NO_RESULTS_MESSAGE,
    PdfQaApi, PdfQaService,
};
pub use types::{
    AskRequest, AskResponse, ChunkingError, ClearResponse, ErrorStatus, HealthResponse,
    IngestError, IngestOutcome, QueryError, StartupError, UploadResponse,
};
