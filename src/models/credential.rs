// src/models/credential.rs

use std::fmt;

/// Opaque access token (a cookie header value) that lets requests through
/// the retailer's bot defenses.
///
/// Has no expiry; it is treated as possibly stale at any time and replaced
/// wholesale on refresh.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

// Cookie values are secrets; keep them out of logs.
impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Credential(<{} chars>)", self.0.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_is_redacted() {
        let credential = Credential::new("visid_incap=secret");
        assert_eq!(format!("{credential:?}"), "Credential(<18 chars>)");
    }

    #[test]
    fn test_blank_is_empty() {
        assert!(Credential::new("  ").is_empty());
        assert!(!Credential::new("a=b").is_empty());
    }
}
