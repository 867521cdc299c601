//! Gateway state shared across handlers and middleware
//!
//! Everything that configuration reload may change lives in a
//! [`GatewaySnapshot`] held behind an `ArcSwap`; in-flight requests keep the
//! snapshot they started with. The cache and the HTTP client outlive reloads.

use std::sync::Arc;

use application::{
    ApplicationError, OrchestratorConfig, ResponseDecorator, TtlPolicy, ValidationOrchestrator,
    ValidatorRegistry,
    ports::{CachePort, ValidatorPort},
};
use arc_swap::ArcSwap;
use domain::ValidationPolicy;
use infrastructure::{
    AppConfig, CorrelatedHttpClient, HttpProfileProvider, HttpSubrequestValidator,
    ProfileValidator, RegionAllowList,
};
use tracing::{info, warn};

/// Name under which the profile validator is registered
pub const PROFILE_VALIDATOR: &str = "profile";

/// A guarded route with its resolved policy
#[derive(Debug, Clone)]
pub struct GatewayRoute {
    /// Path prefix the route applies to
    pub path_prefix: String,
    /// Backend receiving validated requests
    pub backend_url: String,
    /// Validators guarding the route
    pub policy: ValidationPolicy,
}

impl GatewayRoute {
    fn matches(&self, path: &str) -> bool {
        let prefix = self.path_prefix.trim_end_matches('/');
        prefix.is_empty()
            || path == prefix
            || path
                .strip_prefix(prefix)
                .is_some_and(|rest| rest.starts_with('/'))
    }
}

/// Reloadable part of the gateway
#[derive(Debug)]
pub struct GatewaySnapshot {
    /// Policy executor
    pub orchestrator: ValidationOrchestrator,
    /// Failure response builder
    pub decorator: ResponseDecorator,
    routes: Vec<GatewayRoute>,
}

impl GatewaySnapshot {
    /// Assemble a snapshot from its parts
    ///
    /// Routes are kept longest prefix first.
    #[must_use]
    pub fn new(
        orchestrator: ValidationOrchestrator,
        decorator: ResponseDecorator,
        mut routes: Vec<GatewayRoute>,
    ) -> Self {
        routes.sort_by(|a, b| b.path_prefix.len().cmp(&a.path_prefix.len()));
        Self {
            orchestrator,
            decorator,
            routes,
        }
    }

    /// Build a snapshot from configuration
    ///
    /// Unnamed validators fall back to the HTTP sub-request validator; the
    /// profile validator is registered when a profile endpoint is configured.
    ///
    /// # Errors
    ///
    /// Returns an error when the configuration is inconsistent or the
    /// response override document cannot be loaded.
    pub fn from_config(
        config: &AppConfig,
        client: &CorrelatedHttpClient,
        cache: Arc<dyn CachePort>,
    ) -> Result<Self, ApplicationError> {
        config.validate()?;

        let mut fallback = HttpSubrequestValidator::new(client.clone());
        if let Some(base_url) = &config.upstream.validator_base_url {
            fallback = fallback.with_base_url(base_url.clone());
        }
        let mut registry = ValidatorRegistry::new().with_fallback(Arc::new(fallback));

        if let Some(endpoint) = &config.profile.endpoint {
            let mut provider = HttpProfileProvider::new(client.clone(), endpoint)?;
            if let Some(scope) = &config.profile.scope {
                provider = provider.with_scope(scope.clone());
            }
            let acceptance = RegionAllowList::new(config.profile.accepted_regions.iter().copied())
                .require_email(config.profile.require_email);
            let validator: Arc<dyn ValidatorPort> = Arc::new(
                ProfileValidator::new(Arc::new(provider), cache)
                    .with_acceptance(Arc::new(acceptance))
                    .with_ttl_policy(TtlPolicy::new(config.cache.default_ttl())),
            );
            registry.register(PROFILE_VALIDATOR, validator);
        }

        let routes: Vec<GatewayRoute> = config
            .routes
            .iter()
            .map(|route| GatewayRoute {
                path_prefix: route.path_prefix.clone(),
                backend_url: route.backend_url.clone(),
                policy: route.policy(),
            })
            .collect();

        let registered = registry.names();
        for route in &routes {
            for spec in route.policy.specs().iter().filter(|s| s.enabled) {
                if !registered.contains(&spec.name) && spec.endpoint.is_none() {
                    warn!(
                        route = %route.path_prefix,
                        validator = %spec.name,
                        "Validator has no implementation and no endpoint; it will always fail"
                    );
                }
            }
        }

        let decorator = match config.responses.load_overrides()? {
            Some(document) => ResponseDecorator::new().load_overrides(&document),
            None => ResponseDecorator::new(),
        };

        let orchestrator_config = config
            .server
            .validator_timeout()
            .map_or_else(OrchestratorConfig::default, OrchestratorConfig::with_timeout);

        info!(
            routes = routes.len(),
            validators = ?registered,
            response_rules = decorator.table().len(),
            "Gateway snapshot built"
        );

        Ok(Self::new(
            ValidationOrchestrator::new(registry, orchestrator_config),
            decorator,
            routes,
        ))
    }

    /// Route with the longest prefix matching `path`
    #[must_use]
    pub fn resolve_route(&self, path: &str) -> Option<&GatewayRoute> {
        self.routes.iter().find(|route| route.matches(path))
    }

    /// All routes, longest prefix first
    #[must_use]
    pub fn routes(&self) -> &[GatewayRoute] {
        &self.routes
    }
}

/// Shared application state
#[derive(Debug, Clone)]
pub struct AppState {
    snapshot: Arc<ArcSwap<GatewaySnapshot>>,
    /// Profile cache, reported on readiness
    pub cache: Arc<dyn CachePort>,
    /// Client used to forward validated requests
    pub client: CorrelatedHttpClient,
}

impl AppState {
    /// Create the state around an initial snapshot
    #[must_use]
    pub fn new(
        snapshot: GatewaySnapshot,
        cache: Arc<dyn CachePort>,
        client: CorrelatedHttpClient,
    ) -> Self {
        Self {
            snapshot: Arc::new(ArcSwap::from_pointee(snapshot)),
            cache,
            client,
        }
    }

    /// The current snapshot
    #[must_use]
    pub fn snapshot(&self) -> Arc<GatewaySnapshot> {
        self.snapshot.load_full()
    }

    /// Atomically replace the snapshot, returning the previous one
    pub fn swap(&self, snapshot: GatewaySnapshot) -> Arc<GatewaySnapshot> {
        self.snapshot.swap(Arc::new(snapshot))
    }
}

#[cfg(test)]
mod tests {
    use domain::ValidatorSpec;
    use infrastructure::{MokaCache, RouteConfig};

    use super::*;

    fn route(prefix: &str) -> GatewayRoute {
        GatewayRoute {
            path_prefix: prefix.to_string(),
            backend_url: format!("http://backend{prefix}"),
            policy: ValidationPolicy::default(),
        }
    }

    fn snapshot(routes: Vec<GatewayRoute>) -> GatewaySnapshot {
        GatewaySnapshot::new(
            ValidationOrchestrator::new(ValidatorRegistry::new(), OrchestratorConfig::default()),
            ResponseDecorator::new(),
            routes,
        )
    }

    #[test]
    fn longest_prefix_wins() {
        let snapshot = snapshot(vec![route("/"), route("/v1"), route("/v1/orders")]);
        assert_eq!(
            snapshot.resolve_route("/v1/orders/7").unwrap().path_prefix,
            "/v1/orders"
        );
        assert_eq!(snapshot.resolve_route("/v1/users").unwrap().path_prefix, "/v1");
        assert_eq!(snapshot.resolve_route("/other").unwrap().path_prefix, "/");
    }

    #[test]
    fn prefix_matches_on_segment_boundary() {
        let snapshot = snapshot(vec![route("/v1/orders")]);
        assert!(snapshot.resolve_route("/v1/orders").is_some());
        assert!(snapshot.resolve_route("/v1/orders/").is_some());
        assert!(snapshot.resolve_route("/v1/ordersx").is_none());
        assert!(snapshot.resolve_route("/v2").is_none());
    }

    #[test]
    fn from_config_registers_profile_validator() {
        let mut config = AppConfig::default();
        config.profile.endpoint = Some("https://idp.example.com/me".to_string());
        config.routes.push(RouteConfig {
            path_prefix: "/v1".to_string(),
            backend_url: "http://backend:9000".to_string(),
            validators: vec![ValidatorSpec::new(PROFILE_VALIDATOR)],
        });

        let client = CorrelatedHttpClient::new().unwrap();
        let snapshot =
            GatewaySnapshot::from_config(&config, &client, Arc::new(MokaCache::new())).unwrap();

        assert_eq!(
            snapshot.orchestrator.registry().names(),
            vec![PROFILE_VALIDATOR.to_string()]
        );
        assert_eq!(snapshot.routes().len(), 1);
    }

    #[test]
    fn from_config_rejects_invalid_routes() {
        let mut config = AppConfig::default();
        config.routes.push(RouteConfig {
            path_prefix: "/v1".to_string(),
            backend_url: "nope".to_string(),
            validators: Vec::new(),
        });
        let client = CorrelatedHttpClient::new().unwrap();
        assert!(GatewaySnapshot::from_config(&config, &client, Arc::new(MokaCache::new())).is_err());
    }

    #[test]
    fn swap_replaces_snapshot() {
        let client = CorrelatedHttpClient::new().unwrap();
        let state = AppState::new(snapshot(Vec::new()), Arc::new(MokaCache::new()), client);
        assert!(state.snapshot().routes().is_empty());

        let previous = state.swap(snapshot(vec![route("/v1")]));
        assert!(previous.routes().is_empty());
        assert_eq!(state.snapshot().routes().len(), 1);
    }
}
