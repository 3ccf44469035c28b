//! ResourceDB client.

use async_trait::async_trait;
use reqwest::{Method, StatusCode};

use satellite_core::error::RemoteCallError;
use satellite_core::remote::ResourceDb;
use satellite_core::resource::Resource;

use crate::endpoint::CoreEndpoint;
use crate::error::{parse_response, RpcError};

/// Reads resources from the orchestrator over HTTP.
pub struct RpcResourceDb {
    client: reqwest::Client,
    endpoint: CoreEndpoint,
}

impl RpcResourceDb {
    pub fn new(endpoint: CoreEndpoint) -> Self {
        Self::with_client(reqwest::Client::new(), endpoint)
    }

    /// Reuse an existing [`reqwest::Client`] for connection pooling.
    pub fn with_client(client: reqwest::Client, endpoint: CoreEndpoint) -> Self {
        tracing::info!(core_url = %endpoint.base_url(), "Configured resource DB client");
        Self { client, endpoint }
    }

    async fn fetch(&self, id: &str) -> Result<Resource, RpcError> {
        let response = self
            .endpoint
            .request(&self.client, Method::GET, &format!("/resources/{id}"))
            .send()
            .await?;
        parse_response(response, StatusCode::OK).await
    }
}

#[async_trait]
impl ResourceDb for RpcResourceDb {
    async fn get_resource_by_id(&self, id: &str) -> Result<Resource, RemoteCallError> {
        self.fetch(id)
            .await
            .map_err(|e| e.during(format!("find resource {id}")))
    }
}
