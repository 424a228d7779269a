//! REST client for the document collection in Qdrant.

use crate::config::Config;
use crate::qdrant::{
    filters::filename_filter,
    types::{
        ChunkPoint, CollectionList, Envelope, QdrantError, QueryHits, SchemaReport, ScoredChunk,
    },
};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode, Url};
use serde_json::{Map, Value, json};

/// Largest number of points written in a single upsert request.
pub const UPSERT_BATCH_SIZE: usize = 64;

/// Lightweight HTTP client bound to the document collection.
pub struct QdrantService {
    pub(crate) client: Client,
    pub(crate) base_url: String,
    pub(crate) api_key: Option<String>,
    pub(crate) collection: String,
    pub(crate) vector_size: usize,
}

impl QdrantService {
    /// Construct a new client using the loaded configuration.
    ///
    /// The configured timeout applies to every request issued through this client.
    pub fn new(config: &Config) -> Result<Self, QdrantError> {
        let client = Client::builder()
            .user_agent("pdf-qa/0.1")
            .timeout(config.qdrant_timeout())
            .build()?;
        let base_url = parse_base_url(&config.qdrant_url)?;
        let api_key = config
            .qdrant_api_key
            .clone()
            .filter(|key| !key.trim().is_empty());

        tracing::debug!(
            url = %base_url,
            collection = %config.qdrant_collection_name,
            timeout_secs = config.qdrant_timeout_secs,
            authenticated = api_key.is_some(),
            "Qdrant client ready"
        );

        Ok(Self {
            client,
            base_url,
            api_key,
            collection: config.qdrant_collection_name.clone(),
            vector_size: config.embedding_dimension,
        })
    }

    /// Name of the collection this client reads and writes.
    pub fn collection_name(&self) -> &str {
        &self.collection
    }

    /// Drop the collection when present and create it again with the `filename` index.
    ///
    /// Any data previously stored in the collection is lost. Failing to create the payload
    /// index is logged and reported but does not fail the call.
    pub async fn recreate_collection(&self) -> Result<SchemaReport, QdrantError> {
        let dropped_existing = self.collection_exists().await?;
        if dropped_existing {
            tracing::info!(collection = %self.collection, "Dropping existing collection");
            self.delete_collection().await?;
        }

        self.create_collection().await?;

        let index_error = self.create_filename_index().await.err();
        match &index_error {
            None => tracing::info!(collection = %self.collection, "Collection ready with filename index"),
            Some(error) => tracing::warn!(
                collection = %self.collection,
                error = %error,
                "Collection created without filename index"
            ),
        }

        Ok(SchemaReport {
            dropped_existing,
            index_error,
        })
    }

    /// Create the collection with cosine distance and disk-backed payload storage.
    pub async fn create_collection(&self) -> Result<(), QdrantError> {
        let response = self
            .collection_request(Method::PUT, "")
            .json(&json!({
                "vectors": { "size": self.vector_size, "distance": "Cosine" },
                "on_disk_payload": true
            }))
            .send()
            .await?;
        expect_success(response).await?;
        tracing::debug!(collection = %self.collection, vector_size = self.vector_size, "Collection created");
        Ok(())
    }

    /// Delete the collection and every point stored in it.
    pub async fn delete_collection(&self) -> Result<(), QdrantError> {
        let response = self.collection_request(Method::DELETE, "").send().await?;
        expect_success(response).await?;
        tracing::debug!(collection = %self.collection, "Collection deleted");
        Ok(())
    }

    /// Create the keyword index on `filename` used by filtered searches.
    ///
    /// An index that already exists (`409 Conflict`) counts as success.
    pub async fn create_filename_index(&self) -> Result<(), QdrantError> {
        let response = self
            .collection_request(Method::PUT, "/index")
            .query(&[("wait", true)])
            .json(&json!({ "field_name": "filename", "field_schema": "keyword" }))
            .send()
            .await?;
        if response.status() != StatusCode::CONFLICT {
            expect_success(response).await?;
        }
        Ok(())
    }

    /// Check whether the collection is present.
    pub async fn collection_exists(&self) -> Result<bool, QdrantError> {
        let response = self.collection_request(Method::GET, "").send().await?;
        match response.status() {
            StatusCode::NOT_FOUND => Ok(false),
            _ => expect_success(response).await.map(|_| true),
        }
    }

    /// Retrieve the names of all collections present in Qdrant.
    pub async fn list_collections(&self) -> Result<Vec<String>, QdrantError> {
        let response = self.request(Method::GET, "collections").send().await?;
        let listing: Envelope<CollectionList> = expect_success(response).await?.json().await?;
        Ok(listing
            .result
            .collections
            .into_iter()
            .map(|collection| collection.name)
            .collect())
    }

    /// Write points in batches of at most [`UPSERT_BATCH_SIZE`].
    ///
    /// Batches are sent sequentially; a failing batch stops the sequence and leaves earlier
    /// batches in place.
    pub async fn upsert_points(&self, points: Vec<ChunkPoint>) -> Result<usize, QdrantError> {
        for (batch_index, batch) in points.chunks(UPSERT_BATCH_SIZE).enumerate() {
            let response = self
                .collection_request(Method::PUT, "/points")
                .query(&[("wait", true)])
                .json(&json!({ "points": batch }))
                .send()
                .await?;
            expect_success(response).await?;
            tracing::debug!(batch = batch_index, points = batch.len(), "Upserted batch");
        }
        Ok(points.len())
    }

    /// Similarity search restricted to chunks whose `filename` equals `filename`.
    pub async fn search_by_filename(
        &self,
        vector: Vec<f32>,
        filename: &str,
        limit: usize,
        score_threshold: f64,
    ) -> Result<Vec<ScoredChunk>, QdrantError> {
        let response = self
            .collection_request(Method::POST, "/points/query")
            .json(&json!({
                "query": vector,
                "limit": limit,
                "score_threshold": score_threshold,
                "filter": filename_filter(filename),
                "with_payload": true,
            }))
            .send()
            .await?;

        let envelope: Envelope<QueryHits> = expect_success(response).await?.json().await?;
        Ok(envelope
            .result
            .into_hits()
            .into_iter()
            .map(|hit| scored_chunk(hit.id, hit.score, hit.payload))
            .collect())
    }

    /// Request against `collections/{collection}{suffix}`.
    fn collection_request(&self, method: Method, suffix: &str) -> RequestBuilder {
        self.request(method, &format!("collections/{}{suffix}", self.collection))
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self
            .client
            .request(method, format!("{}/{path}", self.base_url));
        match &self.api_key {
            Some(key) => builder.header("api-key", key),
            None => builder,
        }
    }
}

/// Pass successful responses through; turn anything else into [`QdrantError::UnexpectedStatus`].
async fn expect_success(response: Response) -> Result<Response, QdrantError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let url = response.url().path().to_string();
    let body = response.text().await.unwrap_or_default();
    let error = QdrantError::UnexpectedStatus { status, body };
    tracing::error!(path = %url, error = %error, "Qdrant request failed");
    Err(error)
}

fn scored_chunk(id: Value, score: f32, payload: Option<Map<String, Value>>) -> ScoredChunk {
    let payload = payload.unwrap_or_default();
    ScoredChunk {
        id: match id {
            Value::String(uuid) => uuid,
            other => other.to_string(),
        },
        score,
        text: payload
            .get("text")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        chunk_index: payload
            .get("chunk_index")
            .and_then(Value::as_u64)
            .map(|index| index as usize),
    }
}

/// Parse the configured URL and drop any trailing slash so paths can be appended.
fn parse_base_url(raw: &str) -> Result<String, QdrantError> {
    let url = Url::parse(raw).map_err(|error| QdrantError::InvalidUrl(format!("{raw}: {error}")))?;
    Ok(url.as_str().trim_end_matches('/').to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_config;
    use crate::qdrant::types::ChunkPayload;
    use httpmock::{
        Method::{DELETE, GET, POST, PUT},
        MockServer,
    };

    fn service_for(server: &MockServer) -> QdrantService {
        QdrantService::new(&test_config("http://127.0.0.1:9", &server.base_url(), 2))
            .expect("qdrant client")
    }

    fn point(index: usize) -> ChunkPoint {
        ChunkPoint::new(
            vec![0.1, 0.2],
            ChunkPayload {
                text: format!("chunk {index}"),
                filename: "doc.pdf".into(),
                chunk_index: index,
            },
        )
    }

    #[tokio::test]
    async fn search_emits_filename_filter_and_threshold() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/collections/pdf_collection/points/query")
                    .json_body_partial(
                        r#"{
                            "limit": 5,
                            "score_threshold": 0.1,
                            "with_payload": true,
                            "filter": {"must": [{"key": "filename", "match": {"value": "doc.pdf"}}]}
                        }"#,
                    );
                then.status(200).json_body(json!({
                    "status": "ok",
                    "time": 0.0,
                    "result": {
                        "points": [
                            {
                                "id": "8c1f6f3e-2b7a-4d1e-9a43-2f0c5f1d6b10",
                                "score": 0.42,
                                "payload": {
                                    "text": "Example",
                                    "filename": "doc.pdf",
                                    "chunk_index": 3
                                }
                            }
                        ]
                    }
                }));
            })
            .await;

        let service = service_for(&server);
        let results = service
            .search_by_filename(vec![0.1, 0.2], "doc.pdf", 5, 0.1)
            .await
            .expect("search request");

        mock.assert_async().await;
        assert_eq!(results.len(), 1);
        let hit = &results[0];
        assert_eq!(hit.id, "8c1f6f3e-2b7a-4d1e-9a43-2f0c5f1d6b10");
        assert!((hit.score - 0.42).abs() < f32::EPSILON);
        assert_eq!(hit.text, "Example");
        assert_eq!(hit.chunk_index, Some(3));
    }

    #[tokio::test]
    async fn search_without_hits_is_empty() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/collections/pdf_collection/points/query");
                then.status(200)
                    .json_body(json!({ "status": "ok", "result": [] }));
            })
            .await;

        let results = service_for(&server)
            .search_by_filename(vec![0.0, 1.0], "missing.pdf", 5, 0.1)
            .await
            .expect("search request");
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn upsert_splits_points_into_bounded_batches() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(PUT)
                    .path("/collections/pdf_collection/points")
                    .query_param("wait", "true");
                then.status(200).json_body(json!({
                    "status": "ok",
                    "result": { "operation_id": 1, "status": "completed" }
                }));
            })
            .await;

        let points: Vec<ChunkPoint> = (0..130).map(point).collect();
        let written = service_for(&server)
            .upsert_points(points)
            .await
            .expect("upsert");

        assert_eq!(written, 130);
        assert_eq!(mock.hits_async().await, 3);
    }

    #[tokio::test]
    async fn upsert_failure_stops_after_first_batch() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(PUT).path("/collections/pdf_collection/points");
                then.status(500).body("storage error");
            })
            .await;

        let points: Vec<ChunkPoint> = (0..100).map(point).collect();
        let error = service_for(&server)
            .upsert_points(points)
            .await
            .unwrap_err();

        assert_eq!(mock.hits_async().await, 1);
        assert!(error.to_string().contains("storage error"));
    }

    #[tokio::test]
    async fn recreate_drops_existing_and_tolerates_index_failure() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/collections/pdf_collection");
                then.status(200)
                    .json_body(json!({ "status": "ok", "result": {} }));
            })
            .await;
        let delete = server
            .mock_async(|when, then| {
                when.method(DELETE).path("/collections/pdf_collection");
                then.status(200)
                    .json_body(json!({ "status": "ok", "result": true }));
            })
            .await;
        let create = server
            .mock_async(|when, then| {
                when.method(PUT)
                    .path("/collections/pdf_collection")
                    .json_body(json!({
                        "vectors": { "size": 2, "distance": "Cosine" },
                        "on_disk_payload": true
                    }));
                then.status(200)
                    .json_body(json!({ "status": "ok", "result": true }));
            })
            .await;
        let index = server
            .mock_async(|when, then| {
                when.method(PUT).path("/collections/pdf_collection/index");
                then.status(500).body("index unavailable");
            })
            .await;

        let report = service_for(&server)
            .recreate_collection()
            .await
            .expect("collection recreated");

        delete.assert_async().await;
        create.assert_async().await;
        index.assert_async().await;
        assert!(report.dropped_existing);
        let index_error = report.index_error.expect("index failure reported");
        assert!(index_error.to_string().contains("index unavailable"));
    }

    #[tokio::test]
    async fn recreate_skips_delete_when_collection_missing() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/collections/pdf_collection");
                then.status(404)
                    .json_body(json!({ "status": { "error": "Not found" } }));
            })
            .await;
        let delete = server
            .mock_async(|when, then| {
                when.method(DELETE).path("/collections/pdf_collection");
                then.status(200);
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(PUT).path("/collections/pdf_collection");
                then.status(200)
                    .json_body(json!({ "status": "ok", "result": true }));
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(PUT).path("/collections/pdf_collection/index");
                then.status(200)
                    .json_body(json!({ "status": "ok", "result": { "status": "completed" } }));
            })
            .await;

        let report = service_for(&server)
            .recreate_collection()
            .await
            .expect("collection created");

        assert_eq!(delete.hits_async().await, 0);
        assert!(!report.dropped_existing);
        assert!(report.index_error.is_none());
    }

    #[tokio::test]
    async fn list_collections_returns_names() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/collections");
                then.status(200).json_body(json!({
                    "status": "ok",
                    "result": { "collections": [{ "name": "pdf_collection" }, { "name": "other" }] }
                }));
            })
            .await;

        let names = service_for(&server)
            .list_collections()
            .await
            .expect("collections");
        assert_eq!(names, vec!["pdf_collection", "other"]);
    }

    #[test]
    fn base_urls_lose_trailing_slashes() {
        assert_eq!(
            parse_base_url("http://localhost:6333/").unwrap(),
            "http://localhost:6333"
        );
        assert_eq!(
            parse_base_url("https://qdrant.example/prefix/").unwrap(),
            "https://qdrant.example/prefix"
        );
        assert!(matches!(
            parse_base_url("not a url"),
            Err(QdrantError::InvalidUrl(_))
        ));
    }
}
