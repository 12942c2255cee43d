use serde::{Deserialize, Serialize};

/// Short-lived credential attached to authenticated API calls.
///
/// Deserialize-only: it arrives in auth responses and is never written
/// anywhere, so there is no `Serialize` impl to misuse.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AccessToken(<redacted>)")
    }
}

/// Long-lived credential kept in the secure store.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RefreshToken(String);

impl RefreshToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl std::fmt::Debug for RefreshToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("RefreshToken(<redacted>)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_is_redacted() {
        let access = AccessToken::new("at_secret");
        let refresh = RefreshToken::new("rt_secret");
        assert!(!format!("{access:?}").contains("at_secret"));
        assert!(!format!("{refresh:?}").contains("rt_secret"));
    }

    #[test]
    fn test_tokens_deserialize_transparently() {
        let access: AccessToken = serde_json::from_str(r#""at_123""#).unwrap();
        assert_eq!(access.as_str(), "at_123");

        let refresh: RefreshToken = serde_json::from_str(r#""rt_xyz""#).unwrap();
        assert_eq!(serde_json::to_string(&refresh).unwrap(), r#""rt_xyz""#);
    }

    #[test]
    fn test_refresh_token_is_empty() {
        assert!(RefreshToken::new("  ").is_empty());
        assert!(!RefreshToken::new("rt").is_empty());
    }
}
