//! User profile entity
//!
//! The fixed projection of an identity provider profile that the gateway
//! exposes to backends as request context variables.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::value_objects::Region;

/// Context variable names written for a resolved profile
pub mod vars {
    /// Email address (escaped)
    pub const EMAIL: &str = "user_email";
    /// ISO country code
    pub const COUNTRY_CODE: &str = "user_country_code";
    /// Region derived from the country code
    pub const REGION: &str = "user_region";
    /// Display name (escaped)
    pub const NAME: &str = "user_name";
    /// First name (escaped)
    pub const FIRST_NAME: &str = "user_first_name";
    /// Last name (escaped)
    pub const LAST_NAME: &str = "user_last_name";
}

/// Projection of a user profile
///
/// Providers spell fields differently and some send several spellings of
/// the same field at once; the first present spelling wins.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "RawProfile")]
pub struct UserProfile {
    /// Email address
    pub email: Option<String>,
    /// ISO 3166-1 alpha-2 country code
    pub country_code: Option<String>,
    /// Display name
    pub display_name: Option<String>,
    /// First name
    pub first_name: Option<String>,
    /// Last name
    pub last_name: Option<String>,
}

/// Provider payload with every accepted spelling kept apart
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawProfile {
    email: Option<String>,
    country_code: Option<String>,
    #[serde(rename = "countryCode")]
    country_code_camel: Option<String>,
    display_name: Option<String>,
    #[serde(rename = "displayName")]
    display_name_camel: Option<String>,
    name: Option<String>,
    first_name: Option<String>,
    #[serde(rename = "firstName")]
    first_name_camel: Option<String>,
    last_name: Option<String>,
    #[serde(rename = "lastName")]
    last_name_camel: Option<String>,
}

impl From<RawProfile> for UserProfile {
    fn from(raw: RawProfile) -> Self {
        Self {
            email: raw.email,
            country_code: raw.country_code.or(raw.country_code_camel),
            display_name: raw.display_name.or(raw.display_name_camel).or(raw.name),
            first_name: raw.first_name.or(raw.first_name_camel),
            last_name: raw.last_name.or(raw.last_name_camel),
        }
    }
}

impl UserProfile {
    /// Region bucket for the profile's country
    #[must_use]
    pub fn region(&self) -> Region {
        self.country_code
            .as_deref()
            .map_or_else(Region::default, Region::from_country_code)
    }

    /// Context variables for this profile
    ///
    /// Free-text identity fields are URI-escaped. Absent fields are exposed
    /// as empty strings so later validators see a stable variable set.
    #[must_use]
    pub fn to_context_vars(&self) -> BTreeMap<String, String> {
        let escaped = |v: &Option<String>| v.as_deref().map(escape_uri).unwrap_or_default();
        BTreeMap::from([
            (vars::EMAIL.to_string(), escaped(&self.email)),
            (
                vars::COUNTRY_CODE.to_string(),
                self.country_code.clone().unwrap_or_default(),
            ),
            (vars::REGION.to_string(), self.region().to_string()),
            (vars::NAME.to_string(), escaped(&self.display_name)),
            (vars::FIRST_NAME.to_string(), escaped(&self.first_name)),
            (vars::LAST_NAME.to_string(), escaped(&self.last_name)),
        ])
    }
}

/// Percent-encode everything outside the RFC 3986 unreserved set
#[must_use]
pub fn escape_uri(input: &str) -> String {
    let mut result = String::with_capacity(input.len() * 3);
    for b in input.bytes() {
        match b {
            b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                result.push(char::from(b));
            },
            _ => result.push_str(&format!("%{b:02X}")),
        }
    }
    result
}
