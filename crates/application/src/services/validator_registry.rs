//! Validator registry - resolves policy entries to implementations

use std::{collections::HashMap, fmt, sync::Arc};

use tracing::debug;

use crate::ports::ValidatorPort;

/// Name to validator mapping with an optional fallback
///
/// The fallback (usually the HTTP sub-request validator) handles every spec
/// whose name has no dedicated implementation.
#[derive(Clone, Default)]
pub struct ValidatorRegistry {
    validators: HashMap<String, Arc<dyn ValidatorPort>>,
    fallback: Option<Arc<dyn ValidatorPort>>,
}

impl ValidatorRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a validator under a name, replacing any previous one
    #[must_use]
    pub fn with_validator(mut self, name: impl Into<String>, validator: Arc<dyn ValidatorPort>) -> Self {
        self.register(name, validator);
        self
    }

    /// Set the validator used for unregistered names
    #[must_use]
    pub fn with_fallback(mut self, validator: Arc<dyn ValidatorPort>) -> Self {
        self.fallback = Some(validator);
        self
    }

    /// Register a validator under a name
    pub fn register(&mut self, name: impl Into<String>, validator: Arc<dyn ValidatorPort>) {
        let name = name.into();
        debug!(validator = %name, "Registering validator");
        self.validators.insert(name, validator);
    }

    /// Resolve a validator by name, falling back when configured
    #[must_use]
    pub fn resolve(&self, name: &str) -> Option<Arc<dyn ValidatorPort>> {
        self.validators
            .get(name)
            .or(self.fallback.as_ref())
            .cloned()
    }

    /// Names of the dedicated validators, sorted
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.validators.keys().cloned().collect();
        names.sort();
        names
    }
}

impl fmt::Debug for ValidatorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidatorRegistry")
            .field("validators", &self.names())
            .field("fallback", &self.fallback.is_some())
            .finish()
    }
}
