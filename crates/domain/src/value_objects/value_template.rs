//! Value templates used for response header values
//!
//! A template is either a literal string or a back-reference to a
//! request-scoped variable. Back-references are written `$name`; a leading
//! `$$` escapes a literal dollar sign.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A header value that may reference a request variable
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ValueTemplate {
    /// Emitted verbatim
    Literal(String),
    /// Resolved from the request context at decoration time
    Variable(String),
}

impl ValueTemplate {
    /// Parse a template from its textual form
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        if let Some(rest) = raw.strip_prefix("$$") {
            return Self::Literal(format!("${rest}"));
        }
        match raw.strip_prefix('$') {
            Some(name) if !name.is_empty() => Self::Variable(name.to_string()),
            _ => Self::Literal(raw.to_string()),
        }
    }

    /// Create a back-reference template
    #[must_use]
    pub fn variable(name: impl Into<String>) -> Self {
        Self::Variable(name.into())
    }

    /// Create a literal template
    #[must_use]
    pub fn literal(value: impl Into<String>) -> Self {
        Self::Literal(value.into())
    }

    /// Resolve the template; a missing variable resolves to an empty string
    pub fn resolve<'v, F>(&self, lookup: F) -> String
    where
        F: FnOnce(&str) -> Option<&'v str>,
    {
        match self {
            Self::Literal(value) => value.clone(),
            Self::Variable(name) => lookup(name).unwrap_or_default().to_string(),
        }
    }
}

impl fmt::Display for ValueTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(value) if value.starts_with('$') => write!(f, "${value}"),
            Self::Literal(value) => f.write_str(value),
            Self::Variable(name) => write!(f, "${name}"),
        }
    }
}

impl Serialize for ValueTemplate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ValueTemplate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::parse(&raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_variable() {
        assert_eq!(
            ValueTemplate::parse("$request_id"),
            ValueTemplate::Variable("request_id".to_string())
        );
    }

    #[test]
    fn parses_literal() {
        assert_eq!(
            ValueTemplate::parse("application/json"),
            ValueTemplate::Literal("application/json".to_string())
        );
    }

    #[test]
    fn lone_dollar_is_literal() {
        assert_eq!(ValueTemplate::parse("$"), ValueTemplate::literal("$"));
    }

    #[test]
    fn double_dollar_escapes() {
        let template = ValueTemplate::parse("$$5");
        assert_eq!(template, ValueTemplate::literal("$5"));
        assert_eq!(template.to_string(), "$$5");
    }

    #[test]
    fn missing_variable_resolves_empty() {
        let template = ValueTemplate::variable("absent");
        assert_eq!(template.resolve(|_| None), "");
    }

    #[test]
    fn variable_resolves_through_lookup() {
        let template = ValueTemplate::variable("request_id");
        let resolved = template.resolve(|name| (name == "request_id").then_some("abc"));
        assert_eq!(resolved, "abc");
    }
}
