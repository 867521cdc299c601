//! Profile provider backed by an HTTP identity endpoint

use application::{
    error::ApplicationError,
    ports::{ProfileProviderPort, UpstreamReply},
};
use async_trait::async_trait;
use reqwest::Url;
use tracing::{debug, instrument};

use crate::http::CorrelatedHttpClient;

/// Resolves a bearer token by calling `GET <endpoint>` with it
#[derive(Debug, Clone)]
pub struct HttpProfileProvider {
    client: CorrelatedHttpClient,
    endpoint: Url,
    scope: String,
}

impl HttpProfileProvider {
    /// Create a provider for an endpoint
    ///
    /// The scope defaults to the endpoint's `host[:port]`.
    ///
    /// # Errors
    ///
    /// Returns [`ApplicationError::Configuration`] for an unparsable URL.
    pub fn new(client: CorrelatedHttpClient, endpoint: &str) -> Result<Self, ApplicationError> {
        let endpoint = Url::parse(endpoint).map_err(|e| {
            ApplicationError::Configuration(format!("invalid profile endpoint '{endpoint}': {e}"))
        })?;
        let scope = match (endpoint.host_str(), endpoint.port()) {
            (Some(host), Some(port)) => format!("{host}:{port}"),
            (Some(host), None) => host.to_string(),
            (None, _) => endpoint.as_str().to_string(),
        };
        Ok(Self {
            client,
            endpoint,
            scope,
        })
    }

    /// Override the cache scope discriminator
    #[must_use]
    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = scope.into();
        self
    }
}

#[async_trait]
impl ProfileProviderPort for HttpProfileProvider {
    #[instrument(skip(self, token), fields(endpoint = %self.endpoint), level = "debug")]
    async fn fetch_profile(
        &self,
        token: &str,
        request_id: &str,
    ) -> Result<UpstreamReply, ApplicationError> {
        let response = self
            .client
            .get(self.endpoint.as_str())
            .with_request_id(request_id)
            .bearer_auth(token)
            .header("accept", "application/json")
            .send()
            .await
            .map_err(|e| ApplicationError::ExternalService(format!("profile request failed: {e}")))?;

        let status = response.status().as_u16();
        let body = response.text().await.map_err(|e| {
            ApplicationError::ExternalService(format!("profile reply unreadable: {e}"))
        })?;

        debug!(status, bytes = body.len(), "Profile upstream replied");
        Ok(UpstreamReply::new(status, body))
    }

    fn scope(&self) -> String {
        self.scope.clone()
    }
}
