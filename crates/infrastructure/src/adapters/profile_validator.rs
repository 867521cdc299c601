//! Profile resolution validator
//!
//! Resolves the caller's bearer token into a [`UserProfile`], exposes the
//! profile as context variables and checks it against an acceptance
//! predicate. Resolved profiles are cached under a digest of the token and
//! the provider scope; the cache TTL follows the token's remaining lifetime
//! when an earlier validator published it, and a default otherwise.
//!
//! ```text
//! START --no token--> MISSING_TOKEN
//!   |
//!   +--cache hit--> accept?
//!   |
//!   +--cache miss--> upstream --200--> cache, accept?
//!                        |--400/401--> NOT_ALLOWED
//!                        +--other/unparsable--> UNKNOWN_ERROR
//! ```

use std::{fmt, sync::Arc};

use application::{
    RequestContext,
    ports::{CachePort, CachePortExt, ProfileProviderPort, ValidationRequest, ValidatorPort},
    services::{CacheTtl, TtlPolicy, parse_expiry},
};
use async_trait::async_trait;
use domain::{ErrorCode, Region, UserProfile, ValidationOutcome, ValidatorSpec};
use tracing::{debug, info, instrument, warn};

use crate::cache::profile_cache_key;

/// Context variable holding the bearer token's expiry
pub const TOKEN_EXPIRY_VAR: &str = "oauth_token_expires_at";

/// Decides whether a resolved profile may proceed
pub trait ProfileAcceptance: Send + Sync + fmt::Debug {
    /// `true` when the profile is acceptable
    fn accepts(&self, profile: &UserProfile) -> bool;
}

/// Accepts every profile
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAll;

impl ProfileAcceptance for AcceptAll {
    fn accepts(&self, _profile: &UserProfile) -> bool {
        true
    }
}

/// Accepts profiles from listed regions
///
/// An empty list accepts every region.
#[derive(Debug, Clone, Default)]
pub struct RegionAllowList {
    regions: Vec<Region>,
    require_email: bool,
}

impl RegionAllowList {
    /// Create an allow list
    #[must_use]
    pub fn new(regions: impl IntoIterator<Item = Region>) -> Self {
        Self {
            regions: regions.into_iter().collect(),
            require_email: false,
        }
    }

    /// Also require a non-empty email
    #[must_use]
    pub const fn require_email(mut self, require: bool) -> Self {
        self.require_email = require;
        self
    }
}

impl ProfileAcceptance for RegionAllowList {
    fn accepts(&self, profile: &UserProfile) -> bool {
        let email_ok = !self.require_email
            || profile
                .email
                .as_deref()
                .is_some_and(|e| !e.trim().is_empty());
        let region_ok = self.regions.is_empty() || self.regions.contains(&profile.region());
        email_ok && region_ok
    }
}

/// Validator resolving and checking the caller's profile
pub struct ProfileValidator {
    provider: Arc<dyn ProfileProviderPort>,
    cache: Arc<dyn CachePort>,
    acceptance: Arc<dyn ProfileAcceptance>,
    ttl_policy: TtlPolicy,
}

impl fmt::Debug for ProfileValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProfileValidator")
            .field("scope", &self.provider.scope())
            .field("cache", &self.cache)
            .field("acceptance", &self.acceptance)
            .field("ttl_policy", &self.ttl_policy)
            .finish()
    }
}

impl ProfileValidator {
    /// Create a validator accepting every resolved profile
    #[must_use]
    pub fn new(provider: Arc<dyn ProfileProviderPort>, cache: Arc<dyn CachePort>) -> Self {
        Self {
            provider,
            cache,
            acceptance: Arc::new(AcceptAll),
            ttl_policy: TtlPolicy::default(),
        }
    }

    /// Use a custom acceptance predicate
    #[must_use]
    pub fn with_acceptance(mut self, acceptance: Arc<dyn ProfileAcceptance>) -> Self {
        self.acceptance = acceptance;
        self
    }

    /// Use a custom TTL policy
    #[must_use]
    pub const fn with_ttl_policy(mut self, ttl_policy: TtlPolicy) -> Self {
        self.ttl_policy = ttl_policy;
        self
    }

    fn conclude(&self, profile: &UserProfile, source: &'static str) -> ValidationOutcome {
        if self.acceptance.accepts(profile) {
            debug!(source, region = %profile.region(), "Profile accepted");
            ValidationOutcome::success_with(profile.to_context_vars())
        } else {
            info!(source, region = %profile.region(), "Profile rejected");
            ValidationOutcome::failure(403, ErrorCode::INVALID_PROFILE)
        }
    }

    async fn cached(&self, key: &str) -> Option<UserProfile> {
        match self.cache.get::<UserProfile>(key).await {
            Ok(profile) => profile,
            Err(e) => {
                warn!(error = %e, "Profile cache unusable, treating as miss");
                None
            },
        }
    }

    async fn store(&self, key: &str, profile: &UserProfile, context: &RequestContext) {
        let expiry = context.get(TOKEN_EXPIRY_VAR).and_then(parse_expiry);
        match self.ttl_policy.derive(expiry) {
            CacheTtl::Cache(ttl) => {
                if let Err(e) = self.cache.set(key, profile, ttl).await {
                    warn!(error = %e, "Failed to cache profile");
                }
            },
            CacheTtl::Skip => debug!("Token already expired, profile not cached"),
        }
    }
}

/// Extract the bearer token from the Authorization header
fn bearer_token(request: &ValidationRequest) -> Option<&str> {
    let value = request.header("authorization")?.trim();
    let token = match value.split_once(' ') {
        Some((scheme, token)) if scheme.eq_ignore_ascii_case("bearer") => token.trim(),
        Some(_) => return None,
        None => value,
    };
    (!token.is_empty()).then_some(token)
}

#[async_trait]
impl ValidatorPort for ProfileValidator {
    #[instrument(skip_all, fields(validator = %spec.name), level = "debug")]
    async fn validate(
        &self,
        spec: &ValidatorSpec,
        request: &ValidationRequest,
        context: &RequestContext,
    ) -> ValidationOutcome {
        let Some(token) = bearer_token(request) else {
            debug!("No bearer token presented");
            return ValidationOutcome::failure(403, ErrorCode::PROFILE_MISSING_TOKEN);
        };

        let key = profile_cache_key(token, &self.provider.scope());

        if let Some(profile) = self.cached(&key).await {
            return self.conclude(&profile, "cache");
        }

        let request_id = context.request_id().to_string();
        let reply = match self.provider.fetch_profile(token, &request_id).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!(error = %e, "Profile upstream unreachable");
                return ValidationOutcome::failure(503, ErrorCode::PROFILE_UNKNOWN_ERROR);
            },
        };

        match reply.status {
            200 => {},
            400 | 401 => {
                info!(status = reply.status, "Profile upstream refused token");
                return ValidationOutcome::failure(403, ErrorCode::NOT_ALLOWED);
            },
            status => {
                warn!(status, "Unexpected profile upstream status");
                return ValidationOutcome::failure(503, ErrorCode::PROFILE_UNKNOWN_ERROR);
            },
        }

        let profile: UserProfile = match serde_json::from_str(&reply.body) {
            Ok(profile) => profile,
            Err(e) => {
                warn!(error = %e, "Unparsable profile payload");
                return ValidationOutcome::failure(503, ErrorCode::PROFILE_UNKNOWN_ERROR);
            },
        };

        self.store(&key, &profile, context).await;
        self.conclude(&profile, "upstream")
    }
}
