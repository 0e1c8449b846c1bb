//! Opaque credential carrier for remote model calls

use std::fmt;

/// API token handed in by the caller
///
/// The engine only forwards it in request headers. `Debug` and `Display` are
/// redacted and the type is deliberately not serializable.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiToken(String);

impl ApiToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// The raw token, for building an authorization header
    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn bearer_header(&self) -> String {
        format!("Bearer {}", self.0)
    }
}

impl fmt::Debug for ApiToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiToken(***)")
    }
}

impl fmt::Display for ApiToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("***")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_is_redacted() {
        let token = ApiToken::new("hf_secret123");
        assert_eq!(format!("{:?}", token), "ApiToken(***)");
        assert_eq!(token.to_string(), "***");
        assert!(!format!("{:?}", Some(token.clone())).contains("secret"));
        assert_eq!(token.bearer_header(), "Bearer hf_secret123");
    }
}
