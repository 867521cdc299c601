//! HTTP client with automatic request ID correlation
//!
//! Wraps `reqwest::Client` so every sub-request a validator or the backend
//! forwarder makes carries the `X-Request-Id` of the request it serves.
//!
//! # Examples
//!
//! ```ignore
//! use infrastructure::http::CorrelatedHttpClient;
//!
//! let client = CorrelatedHttpClient::new()?;
//! let response = client
//!     .get("https://idp.example.com/me")
//!     .with_request_id(&ctx)
//!     .bearer_auth(token)
//!     .send()
//!     .await?;
//! ```

use std::time::Duration;

use reqwest::{
    Client, Method, RequestBuilder, Response,
    header::{HeaderName, HeaderValue},
};
use tracing::{debug, instrument};
use uuid::Uuid;

/// Header name for request correlation ID
pub const X_REQUEST_ID: &str = "x-request-id";

/// Types that carry a correlation id
pub trait RequestIdProvider {
    /// Correlation id to send upstream
    fn correlation_id(&self) -> String;
}

impl RequestIdProvider for Uuid {
    fn correlation_id(&self) -> String {
        self.to_string()
    }
}

impl RequestIdProvider for str {
    fn correlation_id(&self) -> String {
        self.to_string()
    }
}

impl RequestIdProvider for application::RequestContext {
    fn correlation_id(&self) -> String {
        self.request_id().to_string()
    }
}

/// Configuration for the correlated HTTP client
#[derive(Debug, Clone)]
pub struct CorrelatedClientConfig {
    /// Connection timeout
    pub connect_timeout: Duration,
    /// Request timeout
    pub timeout: Duration,
    /// User agent string
    pub user_agent: String,
}

impl Default for CorrelatedClientConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(2),
            timeout: Duration::from_secs(5),
            user_agent: format!("validation-gateway/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl CorrelatedClientConfig {
    /// Set the request timeout
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the connect timeout
    #[must_use]
    pub const fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the user agent string
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}

/// HTTP client that propagates request correlation IDs
///
/// Redirects are not followed: a validator endpoint answering 3xx is a
/// failure like any other non-200 reply.
#[derive(Debug, Clone)]
pub struct CorrelatedHttpClient {
    inner: Client,
    config: CorrelatedClientConfig,
}

impl CorrelatedHttpClient {
    /// Create a new client with default configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying reqwest client cannot be built.
    pub fn new() -> Result<Self, reqwest::Error> {
        Self::with_config(CorrelatedClientConfig::default())
    }

    /// Create a new client with custom configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying reqwest client cannot be built.
    pub fn with_config(config: CorrelatedClientConfig) -> Result<Self, reqwest::Error> {
        let inner = Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .redirect(reqwest::redirect::Policy::none())
            .build()?;

        Ok(Self { inner, config })
    }

    /// Get the configuration
    #[must_use]
    pub const fn config(&self) -> &CorrelatedClientConfig {
        &self.config
    }

    /// Start a GET request
    pub fn get(&self, url: impl AsRef<str>) -> CorrelatedRequestBuilder {
        CorrelatedRequestBuilder::new(self.inner.get(url.as_ref()))
    }

    /// Start a request with a specific method
    pub fn request(&self, method: Method, url: impl AsRef<str>) -> CorrelatedRequestBuilder {
        CorrelatedRequestBuilder::new(self.inner.request(method, url.as_ref()))
    }
}

/// A request builder that supports correlation ID attachment
pub struct CorrelatedRequestBuilder {
    inner: RequestBuilder,
    request_id: Option<String>,
}

impl std::fmt::Debug for CorrelatedRequestBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CorrelatedRequestBuilder")
            .field("request_id", &self.request_id)
            .finish_non_exhaustive()
    }
}

impl CorrelatedRequestBuilder {
    #[allow(clippy::missing_const_for_fn)]
    fn new(inner: RequestBuilder) -> Self {
        Self {
            inner,
            request_id: None,
        }
    }

    /// Attach a request ID for correlation
    #[must_use]
    pub fn with_request_id(mut self, id: &(impl RequestIdProvider + ?Sized)) -> Self {
        self.request_id = Some(id.correlation_id());
        self
    }

    /// Add a header; invalid names or values are skipped
    #[must_use]
    pub fn header(
        mut self,
        name: impl TryInto<HeaderName>,
        value: impl TryInto<HeaderValue>,
    ) -> Self {
        if let (Ok(name), Ok(value)) = (name.try_into(), value.try_into()) {
            self.inner = self.inner.header(name, value);
        }
        self
    }

    /// Add several headers
    #[must_use]
    pub fn headers<'a>(mut self, headers: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        for (name, value) in headers {
            self = self.header(name, value);
        }
        self
    }

    /// Set the request body as raw bytes
    #[must_use]
    pub fn body(mut self, body: impl Into<reqwest::Body>) -> Self {
        self.inner = self.inner.body(body);
        self
    }

    /// Set a bearer auth token
    #[must_use]
    pub fn bearer_auth(mut self, token: impl std::fmt::Display) -> Self {
        self.inner = self.inner.bearer_auth(token);
        self
    }

    /// Override the request timeout
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.inner = self.inner.timeout(timeout);
        self
    }

    /// Send the request
    ///
    /// # Errors
    ///
    /// Returns an error if no response was received.
    #[instrument(skip(self), fields(request_id = ?self.request_id))]
    pub async fn send(self) -> Result<Response, reqwest::Error> {
        let mut builder = self.inner;

        if let Some(request_id) = self.request_id {
            debug!(request_id = %request_id, "Sending correlated HTTP request");
            builder = builder.header(X_REQUEST_ID, request_id);
        }

        builder.send().await
    }
}

#[cfg(test)]
mod tests {
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{header, method, path},
    };

    use super::*;

    #[test]
    fn config_default() {
        let config = CorrelatedClientConfig::default();
        assert_eq!(config.connect_timeout, Duration::from_secs(2));
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert!(config.user_agent.starts_with("validation-gateway/"));
    }

    #[test]
    fn config_builders() {
        let config = CorrelatedClientConfig::default()
            .with_timeout(Duration::from_secs(60))
            .with_connect_timeout(Duration::from_secs(1))
            .with_user_agent("TestAgent/1.0");
        assert_eq!(config.timeout, Duration::from_secs(60));
        assert_eq!(config.connect_timeout, Duration::from_secs(1));
        assert_eq!(config.user_agent, "TestAgent/1.0");
    }

    #[test]
    fn request_builder_with_request_id() {
        let client = CorrelatedHttpClient::new().unwrap();
        let id = Uuid::new_v4();
        let builder = client.get("https://example.com").with_request_id(&id);
        assert_eq!(builder.request_id, Some(id.to_string()));

        let builder = client.get("https://example.com").with_request_id("abc");
        assert_eq!(builder.request_id.as_deref(), Some("abc"));
    }

    #[tokio::test]
    async fn send_attaches_request_id_header() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/check"))
            .and(header("x-request-id", "req-42"))
            .and(header("x-extra", "1"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let client = CorrelatedHttpClient::new().unwrap();
        let response = client
            .get(format!("{}/check", server.uri()))
            .with_request_id("req-42")
            .headers([("x-extra", "1"), ("bad header", "skipped")])
            .send()
            .await
            .unwrap();

        assert_eq!(response.status().as_u16(), 200);
    }

    #[tokio::test]
    async fn redirects_are_not_followed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/moved"))
            .respond_with(ResponseTemplate::new(302).insert_header("location", "/elsewhere"))
            .mount(&server)
            .await;

        let client = CorrelatedHttpClient::new().unwrap();
        let response = client
            .get(format!("{}/moved", server.uri()))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), 302);
    }

    #[test]
    fn client_debug() {
        let client = CorrelatedHttpClient::new().unwrap();
        let debug = format!("{client:?}");
        assert!(debug.contains("CorrelatedHttpClient"));
    }
}
