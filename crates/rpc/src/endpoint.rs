//! Addressing for the orchestrator's HTTP API.
//!
//! A core URL containing `mesh` is reached through the local mesh sidecar:
//! requests go to the sidecar port and carry the original authority in the
//! `Host` header.

use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE, HOST};
use reqwest::{Client, Method, RequestBuilder};

/// Local sidecar that fronts every mesh address.
pub const MESH_PROXY_URL: &str = "http://localhost:19193";

const MESH_SCHEME: &str = "mesh://";

/// Base API path on the orchestrator.
pub const API_BASE: &str = "/api/v2";

/// Resolved base URL plus the headers every request must carry.
#[derive(Debug, Clone)]
pub struct CoreEndpoint {
    base_url: String,
    headers: HeaderMap,
}

impl CoreEndpoint {
    pub fn new(core_url: &str) -> Self {
        Self::via_proxy(core_url, MESH_PROXY_URL)
    }

    /// Like [`new`](Self::new) with an explicit sidecar address.
    pub fn via_proxy(core_url: &str, proxy_url: &str) -> Self {
        if !core_url.contains("mesh") {
            return Self {
                base_url: core_url.trim_end_matches('/').to_string(),
                headers: HeaderMap::new(),
            };
        }

        let mut headers = HeaderMap::new();
        let authority = core_url.replace(MESH_SCHEME, "");
        match HeaderValue::from_str(&authority) {
            Ok(host) => {
                headers.insert(HOST, host);
            }
            Err(_) => tracing::warn!(core_url, "Mesh authority is not a valid Host header"),
        }
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        tracing::info!(core_url, proxy_url, "Routing core calls through mesh sidecar");

        Self {
            base_url: proxy_url.trim_end_matches('/').to_string(),
            headers,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Absolute URL for `path` under the API base.
    pub fn url(&self, path: &str) -> String {
        format!("{}{}{}", self.base_url, API_BASE, path)
    }

    pub fn request(&self, client: &Client, method: Method, path: &str) -> RequestBuilder {
        client
            .request(method, self.url(path))
            .headers(self.headers.clone())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
