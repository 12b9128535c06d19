// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Elasticsearch adapter for [`SearchProvider`].
//!
//! Talks to the REST API over a pooled `reqwest` client. Transport errors
//! are retried with backoff; HTTP-level outcomes (item statuses, 404s,
//! "already exists") are interpreted here and never retried blindly.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::error;

use super::{encode_bulk, BulkItem, BulkReport, Page, SearchError, SearchProvider};
use crate::entity::Document;
use crate::resilience::{retry, RetryConfig};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub struct ElasticProvider {
    client: reqwest::Client,
    base_url: String,
}

impl ElasticProvider {
    /// Build a client for the given base URL (e.g. `http://localhost:9200`)
    /// and verify the node is reachable, with startup-mode retry.
    pub async fn connect(base_url: &str) -> Result<Self, SearchError> {
        let provider = Self::new(base_url)?;

        retry("elastic_connect", &RetryConfig::startup(), || {
            let client = provider.client.clone();
            let url = provider.base_url.clone();
            async move {
                client.get(&url).send().await?.error_for_status()?;
                Ok(())
            }
        })
        .await
        .map_err(|e: reqwest::Error| SearchError::Backend(e.to_string()))?;

        Ok(provider)
    }

    /// Build a client without probing the node.
    pub fn new(base_url: &str) -> Result<Self, SearchError> {
        let client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| SearchError::Backend(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// POST a search body and unwrap `hits.hits[]._source`.
    async fn run_search(&self, index: &str, body: Value, page: Page) -> Result<Vec<Value>, SearchError> {
        let url = format!(
            "{}/{}/_search?from={}&size={}",
            self.base_url,
            index,
            page.offset(),
            page.size
        );

        let response: Value = retry("elastic_search", &RetryConfig::query(), || {
            let client = self.client.clone();
            let url = url.clone();
            let body = body.clone();
            async move {
                client
                    .post(&url)
                    .json(&body)
                    .send()
                    .await?
                    .error_for_status()?
                    .json::<Value>()
                    .await
            }
        })
        .await
        .map_err(|e: reqwest::Error| SearchError::Backend(e.to_string()))?;

        let hits = response["hits"]["hits"]
            .as_array()
            .cloned()
            .unwrap_or_default();
        Ok(hits.into_iter().map(|mut hit| hit["_source"].take()).collect())
    }
}

#[async_trait]
impl SearchProvider for ElasticProvider {
    async fn create_index(&self, index: &str, body: &Value) -> Result<bool, SearchError> {
        let url = format!("{}/{}", self.base_url, index);

        let response = retry("elastic_create_index", &RetryConfig::pass(), || {
            let client = self.client.clone();
            let url = url.clone();
            let body = body.clone();
            async move { client.put(&url).json(&body).send().await }
        })
        .await
        .map_err(|e: reqwest::Error| SearchError::Backend(e.to_string()))?;

        if response.status().is_success() {
            return Ok(true);
        }

        let status = response.status();
        let detail = response.text().await.unwrap_or_default();
        if detail.contains("resource_already_exists_exception") {
            // Someone else created it first; that is success for us
            return Ok(false);
        }
        error!(index = %index, status = %status, detail = %detail, "Index creation failed");
        Err(SearchError::Backend(format!(
            "create_index {} failed with {}: {}",
            index, status, detail
        )))
    }

    async fn bulk(&self, index: &str, documents: &[Document]) -> Result<BulkReport, SearchError> {
        let url = format!("{}/_bulk", self.base_url);
        let body = encode_bulk(index, documents);

        let response: Value = retry("elastic_bulk", &RetryConfig::pass(), || {
            let client = self.client.clone();
            let url = url.clone();
            let body = body.clone();
            async move {
                client
                    .post(&url)
                    .header("content-type", "application/x-ndjson")
                    .body(body)
                    .send()
                    .await?
                    .error_for_status()?
                    .json::<Value>()
                    .await
            }
        })
        .await
        .map_err(|e: reqwest::Error| SearchError::Backend(e.to_string()))?;

        let items = response["items"]
            .as_array()
            .map(|items| {
                items
                    .iter()
                    .map(|item| {
                        let action = &item["index"];
                        BulkItem {
                            id: action["_id"].as_str().unwrap_or_default().to_string(),
                            status: action["status"].as_u64().unwrap_or(0) as u16,
                            error: action["error"].as_object().map(|e| json!(e).to_string()),
                        }
                    })
                    .collect()
            })
            .unwrap_or_default();

        Ok(BulkReport {
            errors: response["errors"].as_bool().unwrap_or(false),
            items,
        })
    }

    async fn search(&self, index: &str, query: &str, page: Page) -> Result<Vec<Value>, SearchError> {
        let body = json!({
            "query": {"multi_match": {"query": query, "fuzziness": "auto"}}
        });
        self.run_search(index, body, page).await
    }

    async fn get_all(
        &self,
        index: &str,
        sort: Option<&str>,
        filter: Option<(&str, &str)>,
        page: Page,
    ) -> Result<Vec<Value>, SearchError> {
        let mut body = json!({
            "query": {"bool": {"must": {"match_all": {}}}}
        });

        if let Some(field) = sort {
            body["sort"] = json!([{field: "desc"}, "_score"]);
        }
        if let Some((name, arg)) = filter {
            body["query"]["bool"]["filter"] = json!({"match": {name: arg}});
        }

        self.run_search(index, body, page).await
    }

    async fn get_by_id(&self, index: &str, id: &str) -> Result<Option<Value>, SearchError> {
        let url = format!("{}/{}/_doc/{}", self.base_url, index, id);

        let response = retry("elastic_get", &RetryConfig::query(), || {
            let client = self.client.clone();
            let url = url.clone();
            async move { client.get(&url).send().await }
        })
        .await
        .map_err(|e: reqwest::Error| SearchError::Backend(e.to_string()))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let mut doc: Value = response
            .error_for_status()
            .map_err(|e| SearchError::Backend(e.to_string()))?
            .json()
            .await
            .map_err(|e| SearchError::Backend(e.to_string()))?;

        Ok(Some(doc["_source"].take()))
    }
}
