//! Firestore over its REST `runQuery` endpoint.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Map, Number, Value};
use url::Url;

use super::DocumentStore;
use crate::config::StoreConfig;
use crate::error::{Error, Result};
use crate::types::Collection;

const REQUEST_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone)]
pub struct FirestoreStore {
    client: Client,
    run_query: Url,
}

#[derive(Debug, Deserialize)]
struct QueryRow {
    #[serde(default)]
    document: Option<RawDocument>,
}

#[derive(Debug, Deserialize)]
struct RawDocument {
    name: String,
    #[serde(default)]
    fields: Map<String, Value>,
}

impl FirestoreStore {
    pub fn new(config: &StoreConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .user_agent(concat!("showcase/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client, run_query: run_query_url(config)? })
    }

    pub fn run_query_url(&self) -> &Url {
        &self.run_query
    }
}

#[async_trait]
impl DocumentStore for FirestoreStore {
    async fn visible(&self, collection: Collection) -> Result<Vec<Value>> {
        tracing::trace!(%collection, "runQuery");
        let resp = self.client.post(self.run_query.clone()).json(&query_body(collection)).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::store(collection.name(), format!("status {}: {}", status.as_u16(), body.trim())));
        }
        decode_run_query(&resp.text().await?)
    }
}

/// `<endpoint>/projects/<id>/databases/(default)/documents:runQuery[?key=..]`
pub fn run_query_url(config: &StoreConfig) -> Result<Url> {
    let mut url = Url::parse(&config.endpoint)?;
    {
        let mut segments = url
            .path_segments_mut()
            .map_err(|_| Error::config(format!("{} cannot be used as a base URL", config.endpoint)))?;
        segments
            .pop_if_empty()
            .push("projects")
            .push(config.project_id.trim())
            .push("databases")
            .push("(default)")
            .push("documents:runQuery");
    }
    if let Some(key) = config.api_key.as_deref().filter(|k| !k.is_empty()) {
        url.query_pairs_mut().append_pair("key", key);
    }
    Ok(url)
}

/// Visible documents of one collection, newest first.
pub fn query_body(collection: Collection) -> Value {
    json!({
        "structuredQuery": {
            "from": [{ "collectionId": collection.name() }],
            "where": {
                "fieldFilter": {
                    "field": { "fieldPath": "show" },
                    "op": "EQUAL",
                    "value": { "booleanValue": true }
                }
            },
            "orderBy": [{ "field": { "fieldPath": "createdAt" }, "direction": "DESCENDING" }]
        }
    })
}

/// Flatten a `runQuery` response into plain JSON documents. Each document gets
/// an `id` taken from the last segment of its resource name unless its own
/// fields carry one.
pub fn decode_run_query(body: &str) -> Result<Vec<Value>> {
    let rows: Vec<QueryRow> = serde_json::from_str(body)?;
    Ok(rows
        .into_iter()
        .filter_map(|row| row.document)
        .map(|doc| {
            let mut out = Map::new();
            if let Some(id) = doc.name.rsplit('/').next().filter(|id| !id.is_empty()) {
                out.insert("id".into(), Value::String(id.to_string()));
            }
            for (key, value) in &doc.fields {
                out.insert(key.clone(), decode_value(value));
            }
            Value::Object(out)
        })
        .collect())
}

/// Typed Firestore value to plain JSON. Unknown shapes become `null`.
pub fn decode_value(value: &Value) -> Value {
    let Some((kind, inner)) = value.as_object().and_then(|o| o.iter().next()) else {
        return Value::Null;
    };
    match kind.as_str() {
        "stringValue" | "timestampValue" | "referenceValue" | "bytesValue" => inner.clone(),
        "booleanValue" => inner.clone(),
        // 64-bit integers arrive as strings.
        "integerValue" => match inner {
            Value::String(s) => s.parse::<i64>().map(Value::from).unwrap_or_else(|_| inner.clone()),
            other => other.clone(),
        },
        "doubleValue" => match inner {
            Value::String(s) => s.parse::<f64>().ok().and_then(Number::from_f64).map_or(Value::Null, Value::Number),
            other => other.clone(),
        },
        "mapValue" => {
            let fields = inner.get("fields").and_then(Value::as_object);
            Value::Object(
                fields
                    .into_iter()
                    .flatten()
                    .map(|(k, v)| (k.clone(), decode_value(v)))
                    .collect(),
            )
        }
        "arrayValue" => {
            let values = inner.get("values").and_then(Value::as_array);
            Value::Array(values.into_iter().flatten().map(decode_value).collect())
        }
        "geoPointValue" => inner.clone(),
        _ => Value::Null,
    }
}
