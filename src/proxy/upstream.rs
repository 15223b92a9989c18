// ────────────────────────────────
// src/proxy/upstream.rs
// Outbound side: URL construction and the HTTP client behind a trait.
// ────────────────────────────────

use super::routes::UpstreamCall;
use super::ProxyError;
use crate::config::UpstreamConfig;
use async_trait::async_trait;
use futures::future::try_join_all;
use reqwest::{header::ACCEPT, Client};
use serde_json::Value;
use std::future::Future;
use tracing::debug;

/// Sent with every outbound call.
pub const LANGUAGE: &str = "fr";

#[async_trait]
pub trait Upstream: Send + Sync {
    /// GET `url` and decode the body as JSON.
    async fn fetch(&self, url: &str) -> Result<Value, ProxyError>;
}

/// Builds outbound URLs. Values are interpolated as-is, without escaping.
#[derive(Clone)]
pub struct Endpoints {
    base_url: String,
    api_secret: String,
}

impl Endpoints {
    pub fn new(config: &UpstreamConfig) -> Self {
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_secret: config.api_secret.clone(),
        }
    }

    pub fn url(&self, call: &UpstreamCall) -> String {
        let mut url = format!(
            "{}/{}?api_key={}&language={}",
            self.base_url, call.resource, self.api_secret, LANGUAGE
        );
        for (name, value) in &call.params {
            url.push('&');
            url.push_str(name);
            url.push('=');
            url.push_str(value);
        }
        url
    }
}

/// Default client: reqwest with its stock settings (pooled, no timeout, no retries).
#[derive(Clone, Default)]
pub struct HttpUpstream {
    client: Client,
}

impl HttpUpstream {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Upstream for HttpUpstream {
    async fn fetch(&self, url: &str) -> Result<Value, ProxyError> {
        // reqwest errors carry the request URL, which contains the api key.
        let response = self
            .client
            .get(url)
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| ProxyError::Request(e.without_url()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProxyError::Status(status));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| ProxyError::Request(e.without_url()))?;
        debug!(%status, bytes = body.len(), "upstream responded");

        Ok(serde_json::from_slice(&body)?)
    }
}

/// Run every future concurrently and collect the results in input order.
/// The first error wins; the remaining futures are dropped, which cancels
/// their in-flight requests.
pub async fn fetch_all<I, F, T>(calls: I) -> Result<Vec<T>, ProxyError>
where
    I: IntoIterator<Item = F>,
    F: Future<Output = Result<T, ProxyError>>,
{
    try_join_all(calls).await
}
