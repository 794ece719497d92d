//! HTTP backend for Elasticsearch-compatible servers.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use crsearch_types::{AliasAction, BackendSettings};

use crate::backend::{DocumentHit, ScrollPage, SearchBackend};
use crate::error::BackendError;

/// Configuration for [`HttpBackend`].
#[derive(Debug, Clone)]
pub struct HttpBackendConfig {
    /// Base URL (e.g. "http://localhost:9200")
    pub base_url: String,

    /// Request timeout
    pub timeout: Duration,

    /// Basic auth user
    pub username: Option<String>,

    /// Basic auth password
    pub password: Option<SecretString>,
}

impl HttpBackendConfig {
    /// Config for an unauthenticated server.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: Duration::from_secs(30),
            username: None,
            password: None,
        }
    }

    pub fn from_settings(settings: &BackendSettings) -> Self {
        Self {
            base_url: settings.url.clone(),
            timeout: Duration::from_secs(settings.timeout_secs),
            username: settings.username.clone(),
            password: settings.password.clone(),
        }
    }
}

/// [`SearchBackend`] over HTTP.
pub struct HttpBackend {
    client: Client,
    config: HttpBackendConfig,
}

#[derive(Deserialize)]
struct ScrollResponse {
    #[serde(rename = "_scroll_id")]
    scroll_id: String,
    #[serde(default)]
    hits: ScrollHits,
}

#[derive(Deserialize, Default)]
struct ScrollHits {
    #[serde(default)]
    hits: Vec<DocumentHit>,
}

impl From<ScrollResponse> for ScrollPage {
    fn from(response: ScrollResponse) -> Self {
        ScrollPage {
            scroll_id: response.scroll_id,
            hits: response.hits.hits,
        }
    }
}

impl HttpBackend {
    pub fn new(config: HttpBackendConfig) -> Result<Self, BackendError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| BackendError::Config(e.to_string()))?;

        Ok(Self { client, config })
    }

    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.config.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self.client.request(method, self.url(path));
        match &self.config.username {
            Some(username) => builder.basic_auth(
                username,
                self.config.password.as_ref().map(|p| p.expose_secret().to_string()),
            ),
            None => builder,
        }
    }

    /// Send a request, mapping 404 to `NotFound` and other failures to
    /// `UnexpectedStatus`.
    async fn send(&self, builder: RequestBuilder, resource: &str) -> Result<Response, BackendError> {
        let response = builder.send().await?;
        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            return Err(BackendError::NotFound(resource.to_string()));
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::UnexpectedStatus {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response)
    }

    async fn send_json(&self, builder: RequestBuilder, resource: &str) -> Result<Value, BackendError> {
        let response = self.send(builder, resource).await?;
        response
            .json()
            .await
            .map_err(|e| BackendError::InvalidResponse(e.to_string()))
    }
}

fn object_keys(value: Value) -> Result<Vec<String>, BackendError> {
    match value {
        Value::Object(map) => Ok(map.into_iter().map(|(k, _)| k).collect()),
        other => Err(BackendError::InvalidResponse(format!(
            "expected an object keyed by index name, got {}",
            other
        ))),
    }
}

#[async_trait]
impl SearchBackend for HttpBackend {
    async fn create_index(&self, index: &str) -> Result<(), BackendError> {
        debug!(index = %index, "Creating index");
        self.send(self.request(Method::PUT, index), index).await?;
        Ok(())
    }

    async fn index_exists(&self, index: &str) -> Result<bool, BackendError> {
        match self.send(self.request(Method::HEAD, index), index).await {
            Ok(_) => Ok(true),
            Err(BackendError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn delete_indices(&self, indices: &[String]) -> Result<(), BackendError> {
        if indices.is_empty() {
            return Ok(());
        }
        let names = indices.join(",");
        debug!(indices = %names, "Deleting indices");
        self.send(self.request(Method::DELETE, &names), &names).await?;
        Ok(())
    }

    async fn refresh(&self, index: &str) -> Result<(), BackendError> {
        let path = format!("{}/_refresh", index);
        self.send(self.request(Method::POST, &path), index).await?;
        Ok(())
    }

    async fn put_mapping(
        &self,
        index: &str,
        type_name: &str,
        mapping: &Value,
    ) -> Result<(), BackendError> {
        let path = format!("{}/_mapping/{}", index, type_name);
        self.send(self.request(Method::PUT, &path).json(mapping), &path)
            .await?;
        Ok(())
    }

    async fn bulk(&self, index: &str, body: String) -> Result<String, BackendError> {
        let path = format!("{}/_bulk", index);
        let response = self
            .send(
                self.request(Method::POST, &path)
                    .header(CONTENT_TYPE, "application/x-ndjson")
                    .body(body),
                &path,
            )
            .await?;
        Ok(response.text().await?)
    }

    async fn open_scroll(
        &self,
        index: &str,
        query: &Value,
        keep_alive: &str,
    ) -> Result<ScrollPage, BackendError> {
        let path = format!("{}/_search?scroll={}", index, keep_alive);
        let value = self
            .send_json(self.request(Method::POST, &path).json(query), index)
            .await?;
        let response: ScrollResponse = serde_json::from_value(value)?;
        Ok(response.into())
    }

    async fn next_scroll_page(
        &self,
        scroll_id: &str,
        keep_alive: &str,
    ) -> Result<ScrollPage, BackendError> {
        let body = json!({ "scroll": keep_alive, "scroll_id": scroll_id });
        let value = self
            .send_json(
                self.request(Method::POST, "_search/scroll").json(&body),
                "_search/scroll",
            )
            .await?;
        let response: ScrollResponse = serde_json::from_value(value)?;
        Ok(response.into())
    }

    async fn clear_scroll(&self, scroll_id: &str) -> Result<(), BackendError> {
        let body = json!({ "scroll_id": [scroll_id] });
        self.send(
            self.request(Method::DELETE, "_search/scroll").json(&body),
            "_search/scroll",
        )
        .await?;
        Ok(())
    }

    async fn aliased_indices(&self, alias: &str) -> Result<Vec<String>, BackendError> {
        let path = format!("_alias/{}", alias);
        let value = self.send_json(self.request(Method::GET, &path), alias).await?;
        object_keys(value)
    }

    async fn update_aliases(&self, actions: &[AliasAction]) -> Result<(), BackendError> {
        let body = json!({ "actions": actions });
        self.send(self.request(Method::POST, "_aliases").json(&body), "_aliases")
            .await?;
        Ok(())
    }

    async fn list_indices(&self) -> Result<Vec<String>, BackendError> {
        let value = self.send_json(self.request(Method::GET, "_all"), "_all").await?;
        object_keys(value)
    }
}
