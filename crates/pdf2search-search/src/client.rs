//! Thin HTTP layer over the Elasticsearch REST API.

use std::time::Duration;

use reqwest::Method;
use serde_json::Value;

use crate::error::{Result, SearchError};

/// JSON-in, JSON-out Elasticsearch client. Paths are given relative to
/// the base URL (leading slash included).
#[derive(Debug, Clone)]
pub struct EsClient {
    http: reqwest::Client,
    base_url: String,
}

pub(crate) struct EsResponse {
    pub method: String,
    pub path: String,
    pub status: u16,
    pub body: Value,
}

impl EsResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_not_found(&self) -> bool {
        self.status == 404
    }

    /// Body on 2xx, `UnexpectedStatus` otherwise.
    pub fn into_body(self) -> Result<Value> {
        if self.is_success() {
            Ok(self.body)
        } else {
            Err(SearchError::UnexpectedStatus {
                method: self.method,
                path: self.path,
                status: self.status,
                body: self.body.to_string(),
            })
        }
    }
}

impl EsClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub(crate) async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<EsResponse> {
        let method_name = method.as_str().to_string();
        let url = format!("{}{}", self.base_url, path);
        let mut request = self.http.request(method, &url);
        if let Some(body) = body {
            request = request.json(body);
        }
        let response = request.send().await?;
        let status = response.status().as_u16();
        let bytes = response.bytes().await?;
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        Ok(EsResponse {
            method: method_name,
            path: path.to_string(),
            status,
            body,
        })
    }

    pub(crate) async fn get(&self, path: &str) -> Result<EsResponse> {
        self.request(Method::GET, path, None).await
    }

    pub(crate) async fn head(&self, path: &str) -> Result<EsResponse> {
        self.request(Method::HEAD, path, None).await
    }

    pub(crate) async fn put(&self, path: &str, body: Option<&Value>) -> Result<EsResponse> {
        self.request(Method::PUT, path, body).await
    }

    pub(crate) async fn post(&self, path: &str, body: Option<&Value>) -> Result<EsResponse> {
        self.request(Method::POST, path, body).await
    }

    pub(crate) async fn delete(&self, path: &str) -> Result<EsResponse> {
        self.request(Method::DELETE, path, None).await
    }

    /// `_bulk` takes newline-delimited JSON, not a single document.
    pub(crate) async fn post_ndjson(&self, path: &str, body: String) -> Result<EsResponse> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .http
            .post(&url)
            .header("Content-Type", "application/x-ndjson")
            .body(body)
            .send()
            .await?;
        let status = response.status().as_u16();
        let bytes = response.bytes().await?;
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        Ok(EsResponse {
            method: "POST".to_string(),
            path: path.to_string(),
            status,
            body,
        })
    }
}
