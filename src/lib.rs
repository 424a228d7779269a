#![deny(missing_docs)]

//! Core library for the PDF question answering service.

/// HTTP routing and REST handlers.
pub mod api;
/// Environment-driven configuration management.
pub mod config;
/// Embedding client abstraction and adapters.
pub mod embedding;
/// PDF text extraction.
pub mod extraction;
/// Structured logging and tracing setup.
pub mod logging;
/// Ingestion and query metrics helpers.
pub mod metrics;
/// Document pipelines: chunking, ingestion, and question answering.
pub mod processing;
/// Qdrant vector store integration.
pub mod qdrant;
