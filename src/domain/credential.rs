//! Credentials supplied by the caller for private sources

use serde::Deserialize;
use std::fmt;

/// A credential matched by host when fetching from a private source
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct Credential {
    /// Credential kind, e.g. `git_source`
    #[serde(alias = "type", default)]
    pub kind: String,
    /// Host this credential authenticates against
    pub host: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(alias = "password", alias = "token")]
    pub secret: String,
}

impl Credential {
    /// Creates a new git source credential
    pub fn git_source(
        host: impl Into<String>,
        username: impl Into<String>,
        secret: impl Into<String>,
    ) -> Self {
        Self {
            kind: "git_source".to_string(),
            host: host.into(),
            username: Some(username.into()),
            secret: secret.into(),
        }
    }

    /// Returns true if this credential applies to requests sent to `host`
    pub fn applies_to(&self, host: &str) -> bool {
        let host = host.to_ascii_lowercase();
        let own = self.host.to_ascii_lowercase();
        host == own || host.ends_with(&format!(".{}", own))
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("kind", &self.kind)
            .field("host", &self.host)
            .field("username", &self.username)
            .field("secret", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_applies_to_host_and_subdomains() {
        let cred = Credential::git_source("github.com", "x-access-token", "token");
        assert!(cred.applies_to("github.com"));
        assert!(cred.applies_to("api.github.com"));
        assert!(cred.applies_to("API.GitHub.com"));
        assert!(!cred.applies_to("notgithub.com"));
        assert!(!cred.applies_to("cdn.cocoapods.org"));
    }

    #[test]
    fn test_debug_redacts_secret() {
        let cred = Credential::git_source("github.com", "x-access-token", "s3cret");
        let debug = format!("{:?}", cred);
        assert!(!debug.contains("s3cret"));
        assert!(debug.contains("redacted"));
    }

    #[test]
    fn test_deserialize_dependabot_shape() {
        let json = r#"{"type": "git_source", "host": "github.com",
                       "username": "x-access-token", "password": "token"}"#;
        let cred: Credential = serde_json::from_str(json).unwrap();
        assert_eq!(cred.kind, "git_source");
        assert_eq!(cred.username.as_deref(), Some("x-access-token"));
        assert_eq!(cred.secret, "token");
    }
}
