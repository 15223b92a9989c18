// src/metrics/collector.rs
use prometheus::{Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder};
use std::sync::Arc;
use std::time::{Duration, Instant};
use anyhow::Result;

pub struct MetricsRegistry {
    registry: Registry,
    collector: Arc<MetricsCollector>,
}

impl MetricsRegistry {
    pub fn new() -> Result<Self> {
        let registry = Registry::new();
        let collector = Arc::new(MetricsCollector::new(&registry)?);

        Ok(Self {
            registry,
            collector,
        })
    }

    pub fn collector(&self) -> Arc<MetricsCollector> {
        self.collector.clone()
    }

    /// Prometheus text exposition of everything registered.
    pub fn gather(&self) -> Result<Vec<u8>> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(buffer)
    }
}

pub struct MetricsCollector {
    // Inbound
    pub requests_total: IntCounterVec,
    pub request_duration_seconds: HistogramVec,

    // Outbound, labelled by resource template
    pub upstream_requests_total: IntCounterVec,
    pub upstream_request_duration_seconds: HistogramVec,
}

impl MetricsCollector {
    pub fn new(registry: &Registry) -> Result<Self> {
        let requests_total = IntCounterVec::new(
            Opts::new("proxy_requests_total", "Total number of inbound requests"),
            &["route", "status_code"],
        )?;
        registry.register(Box::new(requests_total.clone()))?;

        let request_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "proxy_request_duration_seconds",
                "Inbound request duration in seconds",
            ),
            &["route"],
        )?;
        registry.register(Box::new(request_duration_seconds.clone()))?;

        let upstream_requests_total = IntCounterVec::new(
            Opts::new("proxy_upstream_requests_total", "Total upstream requests"),
            &["resource", "status"],
        )?;
        registry.register(Box::new(upstream_requests_total.clone()))?;

        let upstream_request_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "proxy_upstream_request_duration_seconds",
                "Upstream request duration in seconds",
            ),
            &["resource"],
        )?;
        registry.register(Box::new(upstream_request_duration_seconds.clone()))?;

        Ok(Self {
            requests_total,
            request_duration_seconds,
            upstream_requests_total,
            upstream_request_duration_seconds,
        })
    }

    pub fn record_request(&self, route: &str, status_code: u16, duration: Duration) {
        let status = status_code.to_string();
        self.requests_total
            .with_label_values(&[route, &status])
            .inc();

        self.request_duration_seconds
            .with_label_values(&[route])
            .observe(duration.as_secs_f64());
    }

    pub fn record_upstream_request(&self, resource: &str, success: bool, duration: Duration) {
        let status = if success { "success" } else { "failure" };
        self.upstream_requests_total
            .with_label_values(&[resource, status])
            .inc();

        self.upstream_request_duration_seconds
            .with_label_values(&[resource])
            .observe(duration.as_secs_f64());
    }
}

// Helper for timing operations
pub struct Timer {
    start: Instant,
}

impl Timer {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}
