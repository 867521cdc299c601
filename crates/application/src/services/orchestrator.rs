//! Validation orchestrator
//!
//! Runs a [`ValidationPolicy`] against one request. Order groups execute in
//! ascending order; the members of a group run concurrently and the group is
//! evaluated only once every member answered. The first failing group ends
//! the validation, and its context contributions are dropped.
//!
//! When several members of one group fail, the failure of the member
//! declared first in the policy is returned.

use std::{collections::BTreeMap, panic::AssertUnwindSafe, time::Duration};

use domain::{GroupMember, ValidationOutcome, ValidationPolicy, ValidatorSpec};
use futures::{FutureExt, future::join_all};
use serde::{Deserialize, Serialize};
use tokio::time::timeout;
use tracing::{debug, error, info, instrument, warn};

use crate::{RequestContext, ports::ValidationRequest, services::ValidatorRegistry};

/// Orchestrator tuning
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Upper bound for a single validator; `None` leaves it to the validator
    #[serde(default)]
    pub validator_timeout: Option<Duration>,
}

impl OrchestratorConfig {
    /// Config with a per-validator timeout
    #[must_use]
    pub const fn with_timeout(timeout: Duration) -> Self {
        Self {
            validator_timeout: Some(timeout),
        }
    }
}

/// Executes validation policies
#[derive(Debug, Clone)]
pub struct ValidationOrchestrator {
    registry: ValidatorRegistry,
    config: OrchestratorConfig,
}

impl ValidationOrchestrator {
    /// Create an orchestrator over a registry
    #[must_use]
    pub const fn new(registry: ValidatorRegistry, config: OrchestratorConfig) -> Self {
        Self { registry, config }
    }

    /// Registry used to resolve validators
    #[must_use]
    pub const fn registry(&self) -> &ValidatorRegistry {
        &self.registry
    }

    /// Validate a request against a policy
    ///
    /// Returns a success outcome when the request is a preflight, the policy
    /// has no enabled validator, or every group succeeded. Otherwise returns
    /// the selected failing outcome unchanged.
    #[instrument(
        skip(self, policy, request, context),
        fields(request_id = %context.request_id(), path = %request.path()),
        level = "debug"
    )]
    pub async fn validate(
        &self,
        policy: &ValidationPolicy,
        request: &ValidationRequest,
        context: &mut RequestContext,
    ) -> ValidationOutcome {
        if request.is_preflight() {
            debug!("Preflight request, skipping validation");
            return ValidationOutcome::success();
        }

        let groups = policy.groups();
        if groups.is_empty() {
            debug!("No enabled validators, passing through");
            return ValidationOutcome::success();
        }

        for group in groups {
            let outcomes = {
                let snapshot: &RequestContext = context;
                join_all(
                    group
                        .members
                        .iter()
                        .map(|member| self.run_member(member, request, snapshot)),
                )
                .await
            };

            let mut contributed = BTreeMap::new();
            for (member, outcome) in group.members.iter().zip(outcomes) {
                if !outcome.is_success() {
                    info!(
                        order = group.order,
                        validator = %member.spec.name,
                        status = outcome.status,
                        error_code = ?outcome.error_code,
                        "Validation failed"
                    );
                    return outcome;
                }
                contributed.extend(outcome.context_vars);
            }

            debug!(
                order = group.order,
                members = group.members.len(),
                vars = contributed.len(),
                "Order group passed"
            );
            context.merge(contributed);
        }

        ValidationOutcome::success()
    }

    /// Validate against an ad-hoc list of specs
    pub async fn validate_specs(
        &self,
        specs: Vec<ValidatorSpec>,
        request: &ValidationRequest,
        context: &mut RequestContext,
    ) -> ValidationOutcome {
        self.validate(&ValidationPolicy::new(specs), request, context)
            .await
    }

    async fn run_member(
        &self,
        member: &GroupMember,
        request: &ValidationRequest,
        context: &RequestContext,
    ) -> ValidationOutcome {
        let spec = &member.spec;
        let Some(validator) = self.registry.resolve(&spec.name) else {
            warn!(validator = %spec.name, "No validator registered");
            return ValidationOutcome::unknown_error();
        };

        let call = AssertUnwindSafe(validator.validate(spec, request, context)).catch_unwind();
        let result = match self.config.validator_timeout {
            Some(limit) => match timeout(limit, call).await {
                Ok(result) => result,
                Err(_) => {
                    warn!(
                        validator = %spec.name,
                        timeout_ms = limit.as_millis(),
                        "Validator timed out"
                    );
                    return ValidationOutcome::unknown_error();
                },
            },
            None => call.await,
        };

        result.unwrap_or_else(|_| {
            error!(validator = %spec.name, "Validator panicked");
            ValidationOutcome::unknown_error()
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use domain::ErrorCode;
    use parking_lot::Mutex;

    use super::*;
    use crate::ports::{MockValidatorPort, ValidatorPort};

    /// Records start/end events and answers after a delay
    #[derive(Debug)]
    struct ScriptedValidator {
        delay: Duration,
        outcome: ValidationOutcome,
        log: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl ValidatorPort for ScriptedValidator {
        async fn validate(
            &self,
            spec: &ValidatorSpec,
            _request: &ValidationRequest,
            context: &RequestContext,
        ) -> ValidationOutcome {
            let seen = context.get("group1_var").unwrap_or("-").to_string();
            self.log.lock().push(format!("start {} {seen}", spec.name));
            tokio::time::sleep(self.delay).await;
            self.log.lock().push(format!("end {}", spec.name));
            self.outcome.clone()
        }
    }

    #[derive(Debug)]
    struct PanickingValidator;

    #[async_trait]
    impl ValidatorPort for PanickingValidator {
        async fn validate(
            &self,
            _spec: &ValidatorSpec,
            _request: &ValidationRequest,
            _context: &RequestContext,
        ) -> ValidationOutcome {
            panic!("validator bug")
        }
    }

    fn scripted(
        log: &Arc<Mutex<Vec<String>>>,
        delay_ms: u64,
        outcome: ValidationOutcome,
    ) -> Arc<dyn ValidatorPort> {
        Arc::new(ScriptedValidator {
            delay: Duration::from_millis(delay_ms),
            outcome,
            log: Arc::clone(log),
        })
    }

    fn spec(name: &str, order: u32) -> ValidatorSpec {
        ValidatorSpec::new(name).with_order(order).unwrap()
    }

    fn request() -> ValidationRequest {
        ValidationRequest::new("GET", "/v1/items")
    }

    fn position(log: &[String], event: &str) -> usize {
        log.iter()
            .position(|e| e.starts_with(event))
            .unwrap_or_else(|| panic!("missing event {event} in {log:?}"))
    }

    #[tokio::test]
    async fn groups_run_in_order_and_members_concurrently() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let registry = ValidatorRegistry::new()
            .with_validator(
                "a",
                scripted(&log, 40, ValidationOutcome::success().with_var("group1_var", "x")),
            )
            .with_validator("b", scripted(&log, 10, ValidationOutcome::success()))
            .with_validator("c", scripted(&log, 0, ValidationOutcome::success()));
        let orchestrator = ValidationOrchestrator::new(registry, OrchestratorConfig::default());
        let policy = ValidationPolicy::new(vec![spec("c", 2), spec("a", 1), spec("b", 1)]);

        let mut ctx = RequestContext::new();
        let outcome = orchestrator.validate(&policy, &request(), &mut ctx).await;

        assert!(outcome.is_success());
        let log = log.lock().clone();
        // both group 1 members started before either finished
        assert!(position(&log, "start b") < position(&log, "end a"));
        assert!(position(&log, "start a") < position(&log, "end b"));
        // group 2 starts after group 1 fully resolved, and sees its vars
        assert!(position(&log, "start c") > position(&log, "end a"));
        assert!(position(&log, "start c") > position(&log, "end b"));
        assert!(log.contains(&"start c x".to_string()));
        assert_eq!(ctx.get("group1_var"), Some("x"));
    }

    #[tokio::test]
    async fn failing_group_discards_context_and_stops() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let registry = ValidatorRegistry::new()
            .with_validator(
                "ok",
                scripted(&log, 0, ValidationOutcome::success().with_var("leaked", "1")),
            )
            .with_validator(
                "bad",
                scripted(
                    &log,
                    5,
                    ValidationOutcome::failure(403, ErrorCode::INVALID_KEY),
                ),
            )
            .with_validator("later", scripted(&log, 0, ValidationOutcome::success()));
        let orchestrator = ValidationOrchestrator::new(registry, OrchestratorConfig::default());
        let policy = ValidationPolicy::new(vec![spec("ok", 1), spec("bad", 1), spec("later", 2)]);

        let mut ctx = RequestContext::new();
        let outcome = orchestrator.validate(&policy, &request(), &mut ctx).await;

        assert_eq!(outcome.status, 403);
        assert_eq!(outcome.error_code, Some(ErrorCode::INVALID_KEY));
        assert_eq!(ctx.get("leaked"), None);
        assert!(!log.lock().iter().any(|e| e.contains("later")));
    }

    #[tokio::test]
    async fn simultaneous_failures_pick_first_declared() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let registry = ValidatorRegistry::new()
            .with_validator(
                "slow",
                scripted(
                    &log,
                    30,
                    ValidationOutcome::failure(403, ErrorCode::MISSING_KEY),
                ),
            )
            .with_validator(
                "fast",
                scripted(
                    &log,
                    0,
                    ValidationOutcome::failure(401, ErrorCode::INVALID_TOKEN),
                ),
            );
        let orchestrator = ValidationOrchestrator::new(registry, OrchestratorConfig::default());
        let policy = ValidationPolicy::new(vec![spec("slow", 1), spec("fast", 1)]);

        let outcome = orchestrator
            .validate(&policy, &request(), &mut RequestContext::new())
            .await;

        assert_eq!(outcome.error_code, Some(ErrorCode::MISSING_KEY));
    }

    #[tokio::test]
    async fn empty_policy_passes_through() {
        let orchestrator =
            ValidationOrchestrator::new(ValidatorRegistry::new(), OrchestratorConfig::default());
        let policy = ValidationPolicy::new(vec![ValidatorSpec::new("a").disabled()]);

        let outcome = orchestrator
            .validate(&policy, &request(), &mut RequestContext::new())
            .await;
        assert!(outcome.is_success());
    }

    #[tokio::test]
    async fn preflight_skips_validators() {
        let mut mock = MockValidatorPort::new();
        mock.expect_validate().never();
        let registry = ValidatorRegistry::new().with_validator("api_key", Arc::new(mock));
        let orchestrator = ValidationOrchestrator::new(registry, OrchestratorConfig::default());
        let policy = ValidationPolicy::new(vec![ValidatorSpec::new("api_key")]);

        let outcome = orchestrator
            .validate(
                &policy,
                &ValidationRequest::new("OPTIONS", "/").with_preflight(true),
                &mut RequestContext::new(),
            )
            .await;
        assert!(outcome.is_success());
    }

    #[tokio::test]
    async fn unknown_validator_is_unknown_error() {
        let orchestrator =
            ValidationOrchestrator::new(ValidatorRegistry::new(), OrchestratorConfig::default());

        let outcome = orchestrator
            .validate_specs(
                vec![ValidatorSpec::new("nowhere")],
                &request(),
                &mut RequestContext::new(),
            )
            .await;

        assert_eq!(outcome.status, 503);
        assert_eq!(outcome.error_code, Some(ErrorCode::UNKNOWN_ERROR));
    }

    #[tokio::test]
    async fn slow_validator_times_out_as_unknown_error() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let registry = ValidatorRegistry::new()
            .with_validator("slow", scripted(&log, 500, ValidationOutcome::success()));
        let orchestrator = ValidationOrchestrator::new(
            registry,
            OrchestratorConfig::with_timeout(Duration::from_millis(20)),
        );

        let outcome = orchestrator
            .validate_specs(
                vec![ValidatorSpec::new("slow")],
                &request(),
                &mut RequestContext::new(),
            )
            .await;

        assert_eq!(outcome, ValidationOutcome::unknown_error());
    }

    #[tokio::test]
    async fn panicking_validator_is_unknown_error() {
        let registry = ValidatorRegistry::new().with_validator("buggy", Arc::new(PanickingValidator));
        let orchestrator = ValidationOrchestrator::new(registry, OrchestratorConfig::default());

        let outcome = orchestrator
            .validate_specs(
                vec![ValidatorSpec::new("buggy")],
                &request(),
                &mut RequestContext::new(),
            )
            .await;

        assert_eq!(outcome.status, 503);
    }

    #[tokio::test]
    async fn non_200_success_status_is_failure() {
        let mut mock = MockValidatorPort::new();
        mock.expect_validate()
            .returning(|_, _, _| ValidationOutcome::raw_failure(204, None));
        let registry = ValidatorRegistry::new().with_validator("odd", Arc::new(mock));
        let orchestrator = ValidationOrchestrator::new(registry, OrchestratorConfig::default());

        let outcome = orchestrator
            .validate_specs(
                vec![ValidatorSpec::new("odd")],
                &request(),
                &mut RequestContext::new(),
            )
            .await;

        assert_eq!(outcome.status, 204);
        assert!(!outcome.is_success());
    }
}
