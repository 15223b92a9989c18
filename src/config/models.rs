// src/config/models.rs
use anyhow::{anyhow, bail, Context, Result};
use serde::Deserialize;
use std::fmt;
use std::net::SocketAddr;
use url::Url;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    pub upstream: UpstreamConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Clone, Deserialize)]
pub struct UpstreamConfig {
    /// Root of the movie metadata API, e.g. `https://api.themoviedb.org/3/`.
    pub base_url: String,
    /// Sent as `api_key` on every outbound call. Never logged.
    pub api_secret: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_metrics_port")]
    pub port: u16,
    #[serde(default = "default_metrics_path")]
    pub path: String,
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        self.upstream.validate()?;

        if !self.metrics.path.starts_with('/') {
            bail!("metrics.path must start with '/', got {:?}", self.metrics.path);
        }
        if self.metrics.enabled && self.metrics.port == self.server.port {
            bail!("metrics.port must differ from server.port ({})", self.server.port);
        }

        Ok(())
    }
}

impl ServerConfig {
    /// Resolve `host` (an IP or a hostname) to the address to bind.
    pub async fn socket_addr(&self) -> Result<SocketAddr> {
        tokio::net::lookup_host((self.host.as_str(), self.port))
            .await
            .with_context(|| format!("Invalid listen address {}:{}", self.host, self.port))?
            .next()
            .ok_or_else(|| anyhow!("{} resolved to no addresses", self.host))
    }
}

impl MetricsConfig {
    /// The scrape listener shares the proxy's interface.
    pub fn socket_addr(&self, server: SocketAddr) -> SocketAddr {
        SocketAddr::new(server.ip(), self.port)
    }
}

impl UpstreamConfig {
    pub fn validate(&self) -> Result<()> {
        let url = Url::parse(&self.base_url)
            .with_context(|| format!("upstream.base_url is not a valid URL: {}", self.base_url))?;
        if !matches!(url.scheme(), "http" | "https") {
            bail!("upstream.base_url must use http or https, got {}", url.scheme());
        }
        if self.api_secret.trim().is_empty() {
            bail!("upstream.api_secret must not be empty");
        }
        Ok(())
    }
}

// Keeps the secret out of `{:?}` output, which ends up in logs.
impl fmt::Debug for UpstreamConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpstreamConfig")
            .field("base_url", &self.base_url)
            .field("api_secret", &"<redacted>")
            .finish()
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            port: default_metrics_port(),
            path: default_metrics_path(),
        }
    }
}

pub(crate) fn default_host() -> String {
    "0.0.0.0".to_string()
}

pub(crate) fn default_port() -> u16 {
    8080
}

pub(crate) fn default_metrics_port() -> u16 {
    9090
}

pub(crate) fn default_metrics_path() -> String {
    "/metrics".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> Config {
        Config {
            server: ServerConfig::default(),
            upstream: UpstreamConfig {
                base_url: "https://api.themoviedb.org/3/".to_string(),
                api_secret: "s3cr3t".to_string(),
            },
            metrics: MetricsConfig::default(),
        }
    }

    #[test]
    fn test_valid_config_passes() {
        assert!(config().validate().is_ok());
    }

    #[test]
    fn test_rejects_non_http_base_url() {
        let mut config = config();
        config.upstream.base_url = "ftp://example.com/3/".to_string();
        assert!(config.validate().is_err());

        config.upstream.base_url = "not a url".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_blank_secret() {
        let mut config = config();
        config.upstream.api_secret = "   ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_metrics_port_clash() {
        let mut config = config();
        config.metrics.enabled = true;
        config.metrics.port = config.server.port;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_debug_redacts_secret() {
        let rendered = format!("{:?}", config());
        assert!(!rendered.contains("s3cr3t"));
        assert!(rendered.contains("<redacted>"));
    }

    #[tokio::test]
    async fn test_socket_addr() {
        let server = ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 3000,
        };
        assert_eq!(
            server.socket_addr().await.unwrap(),
            "127.0.0.1:3000".parse::<SocketAddr>().unwrap()
        );
    }

    #[tokio::test]
    async fn test_socket_addr_resolves_hostname() {
        let server = ServerConfig {
            host: "localhost".to_string(),
            port: 8080,
        };
        let addr = server.socket_addr().await.unwrap();
        assert!(addr.ip().is_loopback());
        assert_eq!(addr.port(), 8080);
    }

    #[tokio::test]
    async fn test_socket_addr_rejects_garbage_host() {
        let server = ServerConfig {
            host: "not a host!".to_string(),
            port: 8080,
        };
        assert!(server.socket_addr().await.is_err());
    }

    #[test]
    fn test_metrics_addr_follows_server_ip() {
        let metrics = MetricsConfig::default();
        let server: SocketAddr = "127.0.0.1:8080".parse().unwrap();
        assert_eq!(
            metrics.socket_addr(server),
            "127.0.0.1:9090".parse::<SocketAddr>().unwrap()
        );
    }
}
