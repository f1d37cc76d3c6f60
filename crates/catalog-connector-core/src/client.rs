use std::sync::Arc;

use serde::de::DeserializeOwned;

use crate::auth::Credentials;
use crate::config::ConnectorConfig;
use crate::error::Result;
use crate::transport::{ApiRequest, ApiResponse, Transport};

/// Authorized access to the catalog API for one session.
pub struct ApiClient {
    config: Arc<ConnectorConfig>,
    transport: Arc<dyn Transport>,
    credentials: Credentials,
}

impl ApiClient {
    pub fn new(
        config: Arc<ConnectorConfig>,
        transport: Arc<dyn Transport>,
        credentials: Credentials,
    ) -> Self {
        Self {
            config,
            transport,
            credentials,
        }
    }

    pub fn config(&self) -> &ConnectorConfig {
        &self.config
    }

    pub fn endpoint(&self, path: &str) -> String {
        self.config.endpoint(path)
    }

    /// Send with credentials attached. Non-2xx answers become errors.
    pub async fn send(&self, request: ApiRequest) -> Result<ApiResponse> {
        let request = self
            .credentials
            .authorize(self.transport.as_ref(), request)
            .await?;

        let url = request.url.clone();
        let response = self.transport.send(request).await?;
        if !response.is_success() {
            tracing::warn!("{} answered {}", url, response.status);
        }
        response.error_for_status()
    }

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.send(ApiRequest::get(self.endpoint(path))).await?.json()
    }

    pub async fn post_text_json<T: DeserializeOwned>(&self, path: &str, body: &str) -> Result<T> {
        self.send(ApiRequest::post_text(self.endpoint(path), body))
            .await?
            .json()
    }
}
