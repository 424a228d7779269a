//! HTTP surface for the PDF question answering service.
//!
//! This module exposes a compact Axum router:
//!
//! - `POST /upload-pdf` – Multipart upload (field `file`). Extracts, chunks, embeds, and stores
//!   the document, returning `chunks_stored`, `filename`, `text_length`, and `pages_processed`.
//! - `POST /ask` – `{question, filename}`. Answers from the chunks stored for that filename.
//! - `GET /` – Liveness message.
//! - `GET /health` – Qdrant reachability and collection state.
//! - `DELETE /clear-collection` – Drop every chunk and rebuild the collection.
//! - `GET /metrics` – Ingestion and query counters.
//!
//! Every route answers `200 OK`; failures are reported inside the JSON body.

use crate::config::Config;
use crate::extraction::{ExtractionError, MAX_FILE_SIZE};
use crate::metrics::MetricsSnapshot;
use crate::processing::{
    AskRequest, AskResponse, ClearResponse, HealthResponse, IngestError, PdfQaApi, QueryError,
    UploadResponse,
};
use axum::{
    Json, Router,
    extract::{
        DefaultBodyLimit, Multipart, State,
        multipart::{Field, MultipartError, MultipartRejection},
        rejection::JsonRejection,
    },
    http::{HeaderValue, Method, StatusCode},
    routing::{delete, get, post},
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::{
    cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

/// Message served by `GET /`.
pub const ROOT_MESSAGE: &str = "PDF Reader API is running successfully!";

/// Request body ceiling. Bodies that trip it while the upload is read are still reported as
/// oversize uploads.
const BODY_LIMIT: usize = MAX_FILE_SIZE + 1024 * 1024;

/// Build the HTTP router exposing the upload and question API surface.
pub fn create_router<S>(service: Arc<S>) -> Router
where
    S: PdfQaApi + 'static,
{
    Router::new()
        .route("/", get(root))
        .route("/upload-pdf", post(upload_pdf::<S>))
        .route("/ask", post(ask::<S>))
        .route("/health", get(health::<S>))
        .route("/clear-collection", delete(clear_collection::<S>))
        .route("/metrics", get(get_metrics::<S>))
        .layer(DefaultBodyLimit::max(BODY_LIMIT))
        .with_state(service)
}

/// Wrap a router with request tracing and the configured CORS policy.
pub fn with_http_layers(router: Router, config: &Config) -> Router {
    router
        .layer(cors_layer(config))
        .layer(TraceLayer::new_for_http())
}

/// CORS policy for browser clients.
///
/// By default every origin, method, and header is mirrored back with credentials allowed.
/// When `CORS_ENFORCE_ALLOWLIST` is set only `ALLOWED_ORIGINS` are accepted.
pub fn cors_layer(config: &Config) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true);

    if !config.cors_enforce_allowlist {
        return layer
            .allow_origin(AllowOrigin::mirror_request())
            .allow_methods(AllowMethods::mirror_request());
    }

    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    tracing::info!(origins = ?config.allowed_origins, "Enforcing CORS allow-list");

    layer
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
}

/// Response body for `GET /`.
#[derive(Serialize)]
struct RootResponse {
    message: &'static str,
}

async fn root() -> Json<RootResponse> {
    Json(RootResponse {
        message: ROOT_MESSAGE,
    })
}

/// Store an uploaded PDF.
///
/// The `file` field is read chunk by chunk and reading stops as soon as more than
/// [`MAX_FILE_SIZE`] bytes have arrived; the service then rejects the upload as oversize.
async fn upload_pdf<S>(
    State(service): State<Arc<S>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Json<UploadResponse>
where
    S: PdfQaApi,
{
    let upload = match multipart {
        Ok(multipart) => read_upload(multipart).await,
        Err(rejection) => Err(IngestError::Upload(rejection.body_text())),
    };

    match upload {
        Ok((filename, bytes)) => Json(service.upload_pdf(filename, bytes).await),
        Err(error) => {
            tracing::warn!(error = %error, "Rejected upload request");
            Json(error.into())
        }
    }
}

async fn read_upload(mut multipart: Multipart) -> Result<(String, Vec<u8>), IngestError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|error| upload_error(error, 0))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field
            .file_name()
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .ok_or_else(|| IngestError::Upload("Uploaded file has no filename.".into()))?;
        let bytes = read_capped(field).await?;
        return Ok((filename, bytes));
    }

    Err(IngestError::Upload("No file uploaded.".into()))
}

/// Read a field until it ends or exceeds [`MAX_FILE_SIZE`].
async fn read_capped(mut field: Field<'_>) -> Result<Vec<u8>, IngestError> {
    let mut bytes = Vec::new();
    while let Some(chunk) = field
        .chunk()
        .await
        .map_err(|error| upload_error(error, bytes.len()))?
    {
        bytes.extend_from_slice(&chunk);
        if bytes.len() > MAX_FILE_SIZE {
            break;
        }
    }
    Ok(bytes)
}

/// Map a multipart read failure; hitting the body limit counts as an oversize upload.
fn upload_error(error: MultipartError, received: usize) -> IngestError {
    if error.status() == StatusCode::PAYLOAD_TOO_LARGE {
        IngestError::Extraction(ExtractionError::Oversize {
            size: received.max(MAX_FILE_SIZE + 1),
        })
    } else {
        IngestError::Upload(error.body_text())
    }
}

/// Answer a question about one uploaded document.
async fn ask<S>(
    State(service): State<Arc<S>>,
    request: Result<Json<AskRequest>, JsonRejection>,
) -> Json<AskResponse>
where
    S: PdfQaApi,
{
    match request {
        Ok(Json(request)) => Json(service.ask(request).await),
        Err(rejection) => {
            tracing::warn!(error = %rejection.body_text(), "Rejected ask request");
            Json(QueryError::InvalidRequest(rejection.body_text()).into())
        }
    }
}

async fn health<S>(State(service): State<Arc<S>>) -> Json<HealthResponse>
where
    S: PdfQaApi,
{
    Json(service.health().await)
}

async fn clear_collection<S>(State(service): State<Arc<S>>) -> Json<ClearResponse>
where
    S: PdfQaApi,
{
    Json(service.clear_collection().await)
}

/// Return the ingestion and query counters.
async fn get_metrics<S>(State(service): State<Arc<S>>) -> Json<MetricsSnapshot>
where
    S: PdfQaApi,
{
    Json(service.metrics_snapshot())
}
