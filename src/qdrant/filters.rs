//! Filter helpers for Qdrant search queries.

use serde_json::{Value, json};

/// Exact-match filter restricting a search to chunks of a single file.
pub fn filename_filter(filename: &str) -> Value {
    json!({
        "must": [
            {
                "key": "filename",
                "match": { "value": filename }
            }
        ]
    })
}
