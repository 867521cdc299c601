//! Region value object derived from an ISO country code

use std::fmt;

use serde::{Deserialize, Serialize};

/// Coarse geographic bucket a user profile is assigned to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Region {
    /// North America and every country without an explicit mapping
    #[default]
    Na,
    /// Europe, Middle East and Africa
    Emea,
    /// Asia Pacific
    Apac,
    /// Latin America
    Latam,
}

const EMEA: &[&str] = &[
    "AD", "AE", "AL", "AT", "BA", "BE", "BG", "BH", "BY", "CH", "CY", "CZ", "DE", "DK", "DZ", "EE",
    "EG", "ES", "FI", "FO", "FR", "GB", "GI", "GR", "HR", "HU", "IE", "IL", "IQ", "IS", "IT", "JO",
    "KE", "KW", "LB", "LI", "LT", "LU", "LV", "MA", "MC", "MD", "ME", "MK", "MT", "NG", "NL", "NO",
    "OM", "PL", "PT", "QA", "RO", "RS", "RU", "SA", "SE", "SI", "SK", "SM", "TN", "TR", "UA", "UK",
    "VA", "ZA",
];

const APAC: &[&str] = &[
    "AU", "BD", "BN", "CN", "FJ", "HK", "ID", "IN", "JP", "KH", "KR", "LA", "LK", "MM", "MN", "MO",
    "MY", "NP", "NZ", "PG", "PH", "PK", "SG", "TH", "TW", "VN",
];

const LATAM: &[&str] = &[
    "AR", "BO", "BR", "CL", "CO", "CR", "CU", "DO", "EC", "GT", "HN", "MX", "NI", "PA", "PE", "PR",
    "PY", "SV", "UY", "VE",
];

impl Region {
    /// Map an ISO 3166-1 alpha-2 country code to its region
    ///
    /// Matching is case-insensitive. Unknown or empty codes fall into
    /// [`Region::Na`].
    #[must_use]
    pub fn from_country_code(code: &str) -> Self {
        let code = code.trim().to_ascii_uppercase();
        let code = code.as_str();
        if EMEA.contains(&code) {
            Self::Emea
        } else if APAC.contains(&code) {
            Self::Apac
        } else if LATAM.contains(&code) {
            Self::Latam
        } else {
            Self::Na
        }
    }

    /// Short label exposed to backends
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Na => "NA",
            Self::Emea => "EMEA",
            Self::Apac => "APAC",
            Self::Latam => "LATAM",
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
