//! Pinecone data-plane client over HTTPS.

use std::collections::HashMap;
use std::time::Duration;

use reqwest::blocking::{Client, Response};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::{IndexStats, Metadata, VectorBackend, VectorError, VectorMatch};

pub struct PineconeBackend {
    client: Client,
    host: String,
    api_key: SecretString,
    dimension: usize,
}

#[derive(Serialize)]
struct UpsertVector<'a> {
    id: &'a str,
    values: &'a [f32],
    metadata: Metadata,
}

#[derive(Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<QueryMatch>,
}

#[derive(Deserialize)]
struct QueryMatch {
    id: String,
    score: f32,
    #[serde(default)]
    metadata: Option<Metadata>,
}

#[derive(Deserialize)]
struct FetchResponse {
    #[serde(default)]
    vectors: HashMap<String, FetchedVector>,
}

#[derive(Deserialize)]
struct FetchedVector {
    values: Vec<f32>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatsResponse {
    #[serde(default)]
    total_vector_count: u64,
    #[serde(default)]
    dimension: usize,
    #[serde(default)]
    index_fullness: Option<f64>,
}

impl PineconeBackend {
    pub fn new(
        host: &str,
        api_key: SecretString,
        dimension: usize,
        timeout_secs: u64,
    ) -> Result<Self, VectorError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;
        let host = if host.starts_with("http://") || host.starts_with("https://") {
            host.trim_end_matches('/').to_string()
        } else {
            format!("https://{}", host.trim_end_matches('/'))
        };
        Ok(Self {
            client,
            host,
            api_key,
            dimension,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.host, path)
    }

    fn post(&self, path: &str, body: &Value) -> Result<Response, VectorError> {
        let response = self
            .client
            .post(self.url(path))
            .header("Api-Key", self.api_key.expose_secret())
            .json(body)
            .send()?;
        check_status(response)
    }

    fn check_dimension(&self, vector: &[f32]) -> Result<(), VectorError> {
        if vector.len() != self.dimension {
            return Err(VectorError::DimensionMismatch {
                expected: self.dimension,
                actual: vector.len(),
            });
        }
        Ok(())
    }
}

fn check_status(response: Response) -> Result<Response, VectorError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().unwrap_or_default();
    Err(VectorError::Status {
        status: status.as_u16(),
        body,
    })
}

/// Pinecone rejects null metadata values.
fn strip_nulls(metadata: &Metadata) -> Metadata {
    metadata
        .iter()
        .filter(|(_, v)| !v.is_null())
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

/// Rewrites `{"key": value}` equality filters into `{"key": {"$eq": value}}`.
fn to_filter(filter: &Metadata) -> Value {
    let clauses: Metadata = filter
        .iter()
        .map(|(k, v)| (k.clone(), json!({ "$eq": v })))
        .collect();
    Value::Object(clauses)
}

impl VectorBackend for PineconeBackend {
    fn name(&self) -> &'static str {
        "pinecone"
    }

    fn upsert(&self, id: &str, vector: &[f32], metadata: &Metadata) -> Result<(), VectorError> {
        self.check_dimension(vector)?;
        let entry = UpsertVector {
            id,
            values: vector,
            metadata: strip_nulls(metadata),
        };
        let body = json!({ "vectors": [entry] });
        self.post("/vectors/upsert", &body)?;
        Ok(())
    }

    fn query(
        &self,
        vector: &[f32],
        top_k: usize,
        filter: Option<&Metadata>,
    ) -> Result<Vec<VectorMatch>, VectorError> {
        self.check_dimension(vector)?;
        let mut body = json!({
            "vector": vector,
            "topK": top_k,
            "includeMetadata": true,
            "includeValues": false,
        });
        if let Some(filter) = filter.filter(|f| !f.is_empty()) {
            body["filter"] = to_filter(filter);
        }

        let response: QueryResponse = self
            .post("/query", &body)?
            .json()
            .map_err(|e| VectorError::Decode(e.to_string()))?;

        Ok(response
            .matches
            .into_iter()
            .map(|m| VectorMatch {
                id: m.id,
                score: m.score,
                metadata: m.metadata.unwrap_or_default(),
            })
            .collect())
    }

    fn fetch(&self, id: &str) -> Result<Option<Vec<f32>>, VectorError> {
        let response = self
            .client
            .get(self.url("/vectors/fetch"))
            .query(&[("ids", id)])
            .header("Api-Key", self.api_key.expose_secret())
            .send()?;
        let mut response: FetchResponse = check_status(response)?
            .json()
            .map_err(|e| VectorError::Decode(e.to_string()))?;
        Ok(response.vectors.remove(id).map(|v| v.values))
    }

    fn delete(&self, id: &str) -> Result<(), VectorError> {
        self.post("/vectors/delete", &json!({ "ids": [id] }))?;
        Ok(())
    }

    fn stats(&self) -> Result<IndexStats, VectorError> {
        let response: StatsResponse = self
            .post("/describe_index_stats", &json!({}))?
            .json()
            .map_err(|e| VectorError::Decode(e.to_string()))?;
        Ok(IndexStats {
            total_vector_count: response.total_vector_count,
            dimension: response.dimension,
            index_fullness: response.index_fullness,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend(host: &str) -> PineconeBackend {
        PineconeBackend::new(host, SecretString::from("key".to_string()), 4, 1).unwrap()
    }

    #[test]
    fn test_host_normalization() {
        assert_eq!(
            backend("idx-123.svc.pinecone.io").url("/query"),
            "https://idx-123.svc.pinecone.io/query"
        );
        assert_eq!(
            backend("http://localhost:5080/").url("/query"),
            "http://localhost:5080/query"
        );
    }

    #[test]
    fn test_strip_nulls() {
        let metadata = json!({"title": "A", "year": null})
            .as_object()
            .cloned()
            .unwrap();
        let stripped = strip_nulls(&metadata);
        assert_eq!(stripped.len(), 1);
        assert!(stripped.contains_key("title"));
    }

    #[test]
    fn test_filter_uses_eq_operator() {
        let filter = json!({"format_type": "painting"})
            .as_object()
            .cloned()
            .unwrap();
        assert_eq!(
            to_filter(&filter),
            json!({"format_type": {"$eq": "painting"}})
        );
    }

    #[test]
    fn test_dimension_checked_before_request() {
        let err = backend("http://127.0.0.1:9")
            .upsert("1", &[1.0], &Metadata::new())
            .unwrap_err();
        assert!(matches!(err, VectorError::DimensionMismatch { .. }));
    }

    #[test]
    fn test_unreachable_host_is_an_error() {
        assert!(backend("http://127.0.0.1:9").stats().is_err());
    }
}
