//! Infrastructure adapters
//!
//! Adapters connect application ports to concrete implementations.

mod http_profile_provider;
mod http_subrequest_validator;
mod profile_validator;

pub use http_profile_provider::HttpProfileProvider;
pub use http_subrequest_validator::{
    CONTEXT_HEADER_PREFIX, HttpSubrequestValidator, X_ORIGINAL_METHOD, X_ORIGINAL_URI,
    outcome_from_reply,
};
pub use profile_validator::{
    AcceptAll, ProfileAcceptance, ProfileValidator, RegionAllowList, TOKEN_EXPIRY_VAR,
};
