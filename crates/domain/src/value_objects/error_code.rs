//! Validation error code value object
//!
//! Error codes are domain-specific and independent of the HTTP status a
//! validator replies with. The first three digits usually mirror the HTTP
//! status of the default response, the last three identify the family and
//! the concrete failure.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::errors::DomainError;

/// A numeric validation error code such as `403000`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ErrorCode(u32);

impl ErrorCode {
    /// Api key is missing from the request
    pub const MISSING_KEY: Self = Self(403_000);
    /// Api key is not known or not active
    pub const INVALID_KEY: Self = Self(403_003);
    /// Api key could not be validated
    pub const KEY_UNKNOWN_ERROR: Self = Self(503_000);

    /// OAuth token is missing from the request
    pub const MISSING_TOKEN: Self = Self(403_010);
    /// OAuth token scope does not cover the requested resource
    pub const SCOPE_MISMATCH: Self = Self(403_011);
    /// OAuth token is not valid
    pub const INVALID_TOKEN: Self = Self(401_013);
    /// OAuth token could not be validated
    pub const TOKEN_UNKNOWN_ERROR: Self = Self(503_010);

    /// Profile lookup was attempted without a token
    pub const PROFILE_MISSING_TOKEN: Self = Self(403_020);
    /// Profile was resolved but rejected
    pub const INVALID_PROFILE: Self = Self(403_023);
    /// Upstream refused to return the profile
    pub const NOT_ALLOWED: Self = Self(403_024);
    /// Profile could not be read
    pub const PROFILE_UNKNOWN_ERROR: Self = Self(503_020);

    /// Request signature is missing
    pub const MISSING_SIGNATURE: Self = Self(403_030);
    /// Request signature does not match
    pub const INVALID_SIGNATURE: Self = Self(403_033);
    /// Request signature could not be validated
    pub const SIGNATURE_UNKNOWN_ERROR: Self = Self(503_030);

    /// Link is malformed or was tampered with
    pub const INVALID_LINK: Self = Self(403_040);
    /// Link is past its expiration
    pub const EXPIRED_LINK: Self = Self(403_041);

    /// Request rate limit exceeded
    pub const RATE_LIMIT_EXCEEDED: Self = Self(429_050);
    /// Usage quota exceeded
    pub const USAGE_LIMIT_EXCEEDED: Self = Self(429_051);

    /// Generic failure: the validator could not be reached or did not answer
    pub const UNKNOWN_ERROR: Self = Self(503_090);

    /// Create an error code from its numeric value
    #[must_use]
    pub const fn new(code: u32) -> Self {
        Self(code)
    }

    /// Numeric value of the code
    #[must_use]
    pub const fn value(self) -> u32 {
        self.0
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ErrorCode {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u32>()
            .map(Self)
            .map_err(|_| DomainError::InvalidErrorCode(s.to_string()))
    }
}

impl From<u32> for ErrorCode {
    fn from(code: u32) -> Self {
        Self(code)
    }
}

impl Serialize for ErrorCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0.to_string())
    }
}

impl<'de> Deserialize<'de> for ErrorCode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(u32),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Number(n) => Ok(Self(n)),
            Raw::Text(s) => s.parse().map_err(serde::de::Error::custom),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_from_string() {
        let code: ErrorCode = "403010".parse().unwrap();
        assert_eq!(code, ErrorCode::MISSING_TOKEN);
    }

    #[test]
    fn parse_trims_whitespace() {
        let code: ErrorCode = " 403000\n".parse().unwrap();
        assert_eq!(code, ErrorCode::MISSING_KEY);
    }

    #[test]
    fn rejects_non_numeric() {
        let err = "MISSING_KEY".parse::<ErrorCode>().unwrap_err();
        assert!(matches!(err, DomainError::InvalidErrorCode(_)));
    }

    #[test]
    fn deserializes_string_and_number() {
        let a: ErrorCode = serde_json::from_str("\"403003\"").unwrap();
        let b: ErrorCode = serde_json::from_str("403003").unwrap();
        assert_eq!(a, b);
        assert_eq!(a, ErrorCode::INVALID_KEY);
    }

    #[test]
    fn serializes_as_string() {
        let json = serde_json::to_string(&ErrorCode::UNKNOWN_ERROR).unwrap();
        assert_eq!(json, "\"503090\"");
    }
}
