//! Route policies and response override configuration.

use std::path::{Path, PathBuf};

use application::ApplicationError;
use domain::{OverrideDocument, ValidationPolicy, ValidatorSpec};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// A guarded route
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteConfig {
    /// Path prefix the route applies to; the longest matching prefix wins
    pub path_prefix: String,

    /// Backend receiving validated requests
    pub backend_url: String,

    /// Validators guarding the route
    #[serde(default)]
    pub validators: Vec<ValidatorSpec>,
}

impl RouteConfig {
    /// The route's validation policy
    #[must_use]
    pub fn policy(&self) -> ValidationPolicy {
        ValidationPolicy::new(self.validators.clone())
    }

    /// Check the prefix and backend URL
    ///
    /// # Errors
    ///
    /// Returns [`ApplicationError::Configuration`] naming the offending route.
    pub fn validate(&self) -> Result<(), ApplicationError> {
        if !self.path_prefix.starts_with('/') {
            return Err(ApplicationError::Configuration(format!(
                "route prefix '{}' must start with '/'",
                self.path_prefix
            )));
        }
        Url::parse(&self.backend_url).map_err(|e| {
            ApplicationError::Configuration(format!(
                "route '{}' has invalid backend '{}': {e}",
                self.path_prefix, self.backend_url
            ))
        })?;
        Ok(())
    }
}

/// Response decoration settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResponsesConfig {
    /// JSON document overriding or extending the default response rules
    #[serde(default)]
    pub overrides_path: Option<PathBuf>,
}

impl ResponsesConfig {
    /// Load the configured override document, if any
    ///
    /// # Errors
    ///
    /// Returns [`ApplicationError::Configuration`] when the file cannot be
    /// read and [`ApplicationError::Domain`] when it is malformed.
    pub fn load_overrides(&self) -> Result<Option<OverrideDocument>, ApplicationError> {
        self.overrides_path
            .as_deref()
            .map(load_override_document)
            .transpose()
    }
}

/// Read and parse an override document
///
/// # Errors
///
/// See [`ResponsesConfig::load_overrides`].
pub fn load_override_document(path: &Path) -> Result<OverrideDocument, ApplicationError> {
    debug!(path = %path.display(), "Loading response overrides");
    let raw = std::fs::read_to_string(path).map_err(|e| {
        ApplicationError::Configuration(format!(
            "cannot read response overrides '{}': {e}",
            path.display()
        ))
    })?;
    let document = OverrideDocument::from_json(&raw)?;
    info!(path = %path.display(), rules = document.rules().len(), "Response overrides loaded");
    Ok(document)
}
