//! Validation policy - the ordered set of validators guarding a route
//!
//! A policy is a list of [`ValidatorSpec`] entries. Enabled specs are grouped
//! by their `order`; groups run in strictly ascending order and members of a
//! group run concurrently.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

/// Order assigned to a validator when none is given
pub const DEFAULT_ORDER: u32 = 1;

/// Declaration of one validator within a policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawValidatorSpec")]
pub struct ValidatorSpec {
    /// Validator name, used to resolve the implementation
    pub name: String,
    /// Disabled specs are ignored entirely
    pub enabled: bool,
    /// Locator for the validation sub-request (path or absolute URL)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    /// Execution order, starting at 1
    pub order: u32,
}

impl ValidatorSpec {
    /// Create an enabled spec with the default order
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            enabled: true,
            endpoint: None,
            order: DEFAULT_ORDER,
        }
    }

    /// Set the sub-request endpoint
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Set the execution order
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::InvalidPolicy`] when `order` is zero.
    pub fn with_order(mut self, order: u32) -> Result<Self, DomainError> {
        if order == 0 {
            return Err(DomainError::policy(&self.name, "order must be >= 1"));
        }
        self.order = order;
        Ok(self)
    }

    /// Disable this spec
    #[must_use]
    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Parse a validator directive such as `"on; path=/validate_api_key; order=1;"`
    ///
    /// The optional leading flag (`on`/`off`/`true`/`false`) sets `enabled`;
    /// a directive without a flag is enabled. `path=` sets the endpoint and
    /// `order=` the execution order. Unknown attributes are ignored. An empty
    /// directive yields a disabled spec.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::InvalidPolicy`] for an unknown flag or an
    /// order that is not an integer >= 1.
    pub fn from_directive(name: impl Into<String>, directive: &str) -> Result<Self, DomainError> {
        let mut spec = Self::new(name);
        let mut tokens = directive
            .split(';')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .peekable();

        if tokens.peek().is_none() {
            return Ok(spec.disabled());
        }

        if let Some(flag) = tokens.next_if(|t| !t.contains('=')) {
            spec.enabled = match flag.to_ascii_lowercase().as_str() {
                "on" | "true" | "yes" | "1" => true,
                "off" | "false" | "no" | "0" => false,
                other => {
                    return Err(DomainError::policy(
                        &spec.name,
                        format!("unknown flag '{other}'"),
                    ));
                },
            };
        }

        for token in tokens {
            let Some((key, value)) = token.split_once('=') else {
                continue;
            };
            match key.trim() {
                "path" | "endpoint" => spec.endpoint = Some(value.trim().to_string()),
                "order" => {
                    let order = value.trim().parse::<u32>().map_err(|_| {
                        DomainError::policy(&spec.name, format!("invalid order '{}'", value.trim()))
                    })?;
                    spec = spec.with_order(order)?;
                },
                _ => {},
            }
        }

        Ok(spec)
    }
}

/// Serialized shape accepted for a validator spec
///
/// Either explicit fields or a `directive` string.
#[derive(Debug, Deserialize)]
struct RawValidatorSpec {
    name: String,
    #[serde(default)]
    directive: Option<String>,
    #[serde(default)]
    enabled: Option<bool>,
    #[serde(default)]
    endpoint: Option<String>,
    #[serde(default)]
    order: Option<u32>,
}

impl TryFrom<RawValidatorSpec> for ValidatorSpec {
    type Error = DomainError;

    fn try_from(raw: RawValidatorSpec) -> Result<Self, Self::Error> {
        if let Some(directive) = raw.directive {
            return Self::from_directive(raw.name, &directive);
        }
        let mut spec = Self::new(raw.name).with_order(raw.order.unwrap_or(DEFAULT_ORDER))?;
        spec.enabled = raw.enabled.unwrap_or(true);
        spec.endpoint = raw.endpoint;
        Ok(spec)
    }
}

/// A validator scheduled within an order group
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupMember {
    /// Position of the spec in the policy declaration
    pub position: usize,
    /// The spec itself
    pub spec: ValidatorSpec,
}

/// Validators sharing the same order value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderGroup {
    /// Shared order value
    pub order: u32,
    /// Members in declaration order
    pub members: Vec<GroupMember>,
}

/// Ordered collection of validator specs for one route
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValidationPolicy {
    specs: Vec<ValidatorSpec>,
}

impl ValidationPolicy {
    /// Create a policy from specs in declaration order
    #[must_use]
    pub const fn new(specs: Vec<ValidatorSpec>) -> Self {
        Self { specs }
    }

    /// All declared specs, including disabled ones
    #[must_use]
    pub fn specs(&self) -> &[ValidatorSpec] {
        &self.specs
    }

    /// Whether the policy lets every request through without validation
    #[must_use]
    pub fn is_pass_through(&self) -> bool {
        !self.specs.iter().any(|s| s.enabled)
    }

    /// Group enabled specs by order, ascending
    ///
    /// Members keep declaration order inside their group.
    #[must_use]
    pub fn groups(&self) -> Vec<OrderGroup> {
        let mut by_order: BTreeMap<u32, Vec<GroupMember>> = BTreeMap::new();
        for (position, spec) in self.specs.iter().enumerate().filter(|(_, s)| s.enabled) {
            by_order.entry(spec.order).or_default().push(GroupMember {
                position,
                spec: spec.clone(),
            });
        }
        by_order
            .into_iter()
            .map(|(order, members)| OrderGroup { order, members })
            .collect()
    }
}

impl From<Vec<ValidatorSpec>> for ValidationPolicy {
    fn from(specs: Vec<ValidatorSpec>) -> Self {
        Self::new(specs)
    }
}
