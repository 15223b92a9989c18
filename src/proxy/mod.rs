//
// src/proxy/mod.rs
//
mod proxy;
mod routes;
mod upstream;

pub use proxy::{Proxy, ProxyError};
pub use routes::{Extract, Route, UpstreamCall, DEFAULT_PAGE, DEFAULT_QUERY};
pub use upstream::{fetch_all, Endpoints, HttpUpstream, Upstream, LANGUAGE};
