// ────────────────────────────────
// src/proxy/proxy.rs
// Dispatcher: inbound route -> upstream call(s) -> extracted JSON field.
// ────────────────────────────────

use super::routes::{Route, UpstreamCall};
use super::upstream::{fetch_all, Endpoints, Upstream};
use crate::config::UpstreamConfig;
use crate::metrics::{MetricsCollector, Timer};
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::{Body, Method, Request, Response, StatusCode};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, warn};

pub struct Proxy {
    endpoints: Endpoints,
    upstream: Arc<dyn Upstream>,
    metrics: Option<Arc<MetricsCollector>>,
}

impl Proxy {
    pub fn new(config: &UpstreamConfig, upstream: Arc<dyn Upstream>) -> Self {
        Self {
            endpoints: Endpoints::new(config),
            upstream,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<MetricsCollector>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Serve one inbound request. Upstream failures become 500 responses
    /// here; nothing escapes as an `Err`.
    pub async fn handle(&self, req: Request<Body>) -> Response<Body> {
        let timer = Timer::new();

        let Some(route) = Route::parse(req.method(), req.uri().path()) else {
            let response = not_found(req.method(), req.uri().path());
            self.record("not_found", &response, &timer);
            return response;
        };
        drop(req);

        debug!(route = route.name(), ?route, "dispatching");

        let response = match self.dispatch(&route).await.and_then(json_response) {
            Ok(response) => response,
            Err(err) => {
                warn!(route = route.name(), %err, "upstream failure");
                Response::from(err)
            }
        };

        self.record(route.name(), &response, &timer);
        response
    }

    /// Run the route's upstream calls and extract what goes back to the
    /// caller. `Ok(None)` means the expected field was missing.
    pub async fn dispatch(&self, route: &Route) -> Result<Option<Value>, ProxyError> {
        let calls = route.calls();
        let bodies = fetch_all(calls.iter().map(|call| self.fetch(call))).await?;
        Ok(route.extract().apply(bodies))
    }

    async fn fetch(&self, call: &UpstreamCall) -> Result<Value, ProxyError> {
        let url = self.endpoints.url(call);
        let timer = Timer::new();

        let result = self.upstream.fetch(&url).await;

        if let Some(metrics) = &self.metrics {
            metrics.record_upstream_request(call.template, result.is_ok(), timer.elapsed());
        }
        result
    }

    fn record(&self, route: &str, response: &Response<Body>, timer: &Timer) {
        if let Some(metrics) = &self.metrics {
            metrics.record_request(route, response.status().as_u16(), timer.elapsed());
        }
    }
}

fn json_response(value: Option<Value>) -> Result<Response<Body>, ProxyError> {
    // A missing field is sent as an empty 200, not as an error.
    let Some(value) = value else {
        return Ok(Response::new(Body::empty()));
    };

    let mut response = Response::new(Body::from(serde_json::to_vec(&value)?));
    response.headers_mut().insert(
        CONTENT_TYPE,
        HeaderValue::from_static("application/json; charset=utf-8"),
    );
    Ok(response)
}

fn not_found(method: &Method, path: &str) -> Response<Body> {
    let body = json!({
        "message": format!("Route {}:{} not found", method, path),
        "error": "Not Found",
        "statusCode": 404,
    });

    let mut response = Response::new(Body::from(body.to_string()));
    *response.status_mut() = StatusCode::NOT_FOUND;
    response.headers_mut().insert(
        CONTENT_TYPE,
        HeaderValue::from_static("application/json; charset=utf-8"),
    );
    response
}

/// Anything that can go wrong between building the outbound request and
/// reading the field out of its body. All of it surfaces as a 500.
#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    #[error(transparent)]
    Request(reqwest::Error),

    #[error("upstream responded with status {0}")]
    Status(StatusCode),

    #[error("invalid JSON from upstream: {0}")]
    Decode(#[from] serde_json::Error),
}

// The body is the bare error message; there is no structured error shape.
impl From<ProxyError> for Response<Body> {
    fn from(err: ProxyError) -> Self {
        let mut response = Response::new(Body::from(err.to_string()));
        *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
        response.headers_mut().insert(
            CONTENT_TYPE,
            HeaderValue::from_static("text/plain; charset=utf-8"),
        );
        response
    }
}
