//! Application configuration
//!
//! Split into focused sub-modules:
//! - `server`: HTTP server and logging settings
//! - `cache`: two-tier cache TTLs and storage
//! - `upstream`: sub-request transport and profile resolution
//! - `routes`: guarded routes and response overrides
//!
//! Sources are layered: built-in defaults, then an optional TOML file, then
//! environment variables such as `VALIDATION_GATEWAY__SERVER__PORT=9000`.

mod cache;
mod routes;
mod server;
mod upstream;

use std::path::Path;

use application::ApplicationError;
use serde::{Deserialize, Serialize};
use tracing::debug;

pub use cache::CacheConfig;
pub use routes::{ResponsesConfig, RouteConfig, load_override_document};
pub use server::{LogFormat, LoggingConfig, ServerConfig};
pub use upstream::{ProfileConfig, UpstreamConfig};

/// Environment variable prefix
pub const ENV_PREFIX: &str = "VALIDATION_GATEWAY";

/// Default configuration file name, resolved relative to the working directory
pub const DEFAULT_CONFIG_FILE: &str = "config";

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Cache configuration
    #[serde(default)]
    pub cache: CacheConfig,

    /// Sub-request transport configuration
    #[serde(default)]
    pub upstream: UpstreamConfig,

    /// Profile resolution configuration
    #[serde(default)]
    pub profile: ProfileConfig,

    /// Guarded routes
    #[serde(default)]
    pub routes: Vec<RouteConfig>,

    /// Response decoration configuration
    #[serde(default)]
    pub responses: ResponsesConfig,
}

impl AppConfig {
    /// Load configuration from `config.toml` (optional) and the environment
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_from(Path::new(DEFAULT_CONFIG_FILE))
    }

    /// Load configuration from a specific file (optional) and the environment
    ///
    /// The extension may be omitted, as with [`config::File::with_name`].
    pub fn load_from(path: &Path) -> Result<Self, config::ConfigError> {
        debug!(path = %path.display(), "Loading configuration");
        let builder = config::Config::builder()
            .add_source(config::File::from(path).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            );

        builder.build()?.try_deserialize()
    }

    /// Check cross-field constraints
    ///
    /// # Errors
    ///
    /// Returns [`ApplicationError::Configuration`] for the first violation.
    pub fn validate(&self) -> Result<(), ApplicationError> {
        if self.cache.local_ceiling_secs == 0 {
            return Err(ApplicationError::Configuration(
                "cache.local_ceiling_secs must be positive".to_string(),
            ));
        }
        if self.cache.default_ttl_secs == 0 {
            return Err(ApplicationError::Configuration(
                "cache.default_ttl_secs must be positive".to_string(),
            ));
        }
        if self.server.validator_timeout_ms == Some(0) {
            return Err(ApplicationError::Configuration(
                "server.validator_timeout_ms must be positive".to_string(),
            ));
        }
        for route in &self.routes {
            route.validate()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::{io::Write, time::Duration};

    use domain::Region;

    use super::*;

    fn write_toml(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn defaults_are_sensible() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.cache.local_ceiling(), Duration::from_secs(60));
        assert_eq!(config.cache.default_ttl(), Duration::from_secs(7200));
        assert_eq!(config.logging.log_format, LogFormat::Text);
        assert!(config.routes.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn missing_file_yields_defaults() {
        let config = AppConfig::load_from(Path::new("/nonexistent/gateway.toml")).unwrap();
        assert_eq!(config.server.host, "127.0.0.1");
        assert!(config.profile.endpoint.is_none());
    }

    #[test]
    fn loads_routes_with_directives_and_fields() {
        let file = write_toml(
            r#"
            [server]
            port = 9100
            validator_timeout_ms = 1500

            [logging]
            log_format = "json"

            [profile]
            endpoint = "https://idp.example.com/me"
            accepted_regions = ["EMEA", "NA"]

            [[routes]]
            path_prefix = "/v1/orders"
            backend_url = "http://orders:8000"

            [[routes.validators]]
            name = "api_key"
            directive = "on; path=/validate_api_key; order=1;"

            [[routes.validators]]
            name = "profile"
            order = 2
            "#,
        );

        let config = AppConfig::load_from(file.path()).unwrap();
        assert_eq!(config.server.port, 9100);
        assert_eq!(
            config.server.validator_timeout(),
            Some(Duration::from_millis(1500))
        );
        assert_eq!(config.logging.log_format, LogFormat::Json);
        assert_eq!(config.profile.accepted_regions, vec![Region::Emea, Region::Na]);

        let route = &config.routes[0];
        assert_eq!(route.validators.len(), 2);
        assert_eq!(
            route.validators[0].endpoint.as_deref(),
            Some("/validate_api_key")
        );
        assert_eq!(route.validators[1].order, 2);
        assert_eq!(route.policy().groups().len(), 2);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn malformed_directive_fails_to_load() {
        let file = write_toml(
            r#"
            [[routes]]
            path_prefix = "/"
            backend_url = "http://backend"

            [[routes.validators]]
            name = "api_key"
            directive = "on; order=zero;"
            "#,
        );
        assert!(AppConfig::load_from(file.path()).is_err());
    }

    #[test]
    fn validate_rejects_bad_routes() {
        let mut config = AppConfig::default();
        config.routes.push(RouteConfig {
            path_prefix: "v1".to_string(),
            backend_url: "http://backend".to_string(),
            validators: Vec::new(),
        });
        assert!(matches!(
            config.validate(),
            Err(ApplicationError::Configuration(_))
        ));

        config.routes[0].path_prefix = "/v1".to_string();
        config.routes[0].backend_url = "not a url".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_ceiling() {
        let mut config = AppConfig::default();
        config.cache.local_ceiling_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn override_document_loading() {
        let file = write_toml(r#"{"403000": {"http_status": 401, "message": "key please"}}"#);
        let responses = ResponsesConfig {
            overrides_path: Some(file.path().to_path_buf()),
        };
        let document = responses.load_overrides().unwrap().unwrap();
        assert_eq!(document.rules()[0].http_status, 401);

        assert!(ResponsesConfig::default().load_overrides().unwrap().is_none());

        let missing = ResponsesConfig {
            overrides_path: Some("/nonexistent/overrides.json".into()),
        };
        assert!(matches!(
            missing.load_overrides(),
            Err(ApplicationError::Configuration(_))
        ));

        let broken = write_toml("[1, 2]");
        assert!(matches!(
            load_override_document(broken.path()),
            Err(ApplicationError::Domain(_))
        ));
    }

    #[test]
    fn upstream_client_config() {
        let upstream = UpstreamConfig {
            timeout_ms: 750,
            user_agent: Some("gw-test".to_string()),
            ..UpstreamConfig::default()
        };
        let client = upstream.client_config();
        assert_eq!(client.timeout, Duration::from_millis(750));
        assert_eq!(client.user_agent, "gw-test");
    }
}
