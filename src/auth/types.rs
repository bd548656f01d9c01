// Authentication types

use base64::{engine::general_purpose::STANDARD, Engine};
use serde::Deserialize;
use std::fmt;

/// Authorization scheme placed in front of the credential
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthScheme {
    /// `base64(client_id:client_secret)`, used for the token request
    Basic,

    /// OAuth2 access token, used for API requests
    Bearer,
}

impl AuthScheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthScheme::Basic => "Basic",
            AuthScheme::Bearer => "Bearer",
        }
    }
}

/// Per-request authorization, never stored on the client
#[derive(Clone, PartialEq, Eq)]
pub struct AuthDetails {
    pub scheme: AuthScheme,
    pub credential: String,
}

impl AuthDetails {
    pub fn basic(client_id: &str, client_secret: &str) -> Self {
        Self {
            scheme: AuthScheme::Basic,
            credential: STANDARD.encode(format!("{}:{}", client_id, client_secret)),
        }
    }

    pub fn bearer(token: impl Into<String>) -> Self {
        Self {
            scheme: AuthScheme::Bearer,
            credential: token.into(),
        }
    }

    /// Value of the `Authorization` header
    pub fn header_value(&self) -> String {
        format!("{} {}", self.scheme.as_str(), self.credential)
    }
}

impl fmt::Debug for AuthDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthDetails")
            .field("scheme", &self.scheme)
            .field("credential", &"<redacted>")
            .finish()
    }
}

/// Resource-owner and application credentials for the password grant
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
    pub client_id: String,
    pub client_secret: String,
}

impl Credentials {
    pub fn new(username: &str, password: &str, client_id: &str, client_secret: &str) -> Self {
        Self {
            username: username.to_string(),
            password: password.to_string(),
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

/// Password-grant token response; only the access token is used
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    #[serde(default)]
    pub access_token: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_header_value() {
        let auth = AuthDetails::basic("app", "secret");
        // base64("app:secret")
        assert_eq!(auth.header_value(), "Basic YXBwOnNlY3JldA==");
    }

    #[test]
    fn test_bearer_header_value() {
        let auth = AuthDetails::bearer("abc123");
        assert_eq!(auth.scheme, AuthScheme::Bearer);
        assert_eq!(auth.header_value(), "Bearer abc123");
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let creds = Credentials::new("user@example.com", "hunter2", "app", "topsecret");
        let printed = format!("{:?}", creds);
        assert!(printed.contains("user@example.com"));
        assert!(!printed.contains("hunter2"));
        assert!(!printed.contains("topsecret"));

        let printed = format!("{:?}", AuthDetails::bearer("abc123"));
        assert!(!printed.contains("abc123"));
    }

    #[test]
    fn test_token_response_missing_field() {
        let parsed: TokenResponse = serde_json::from_str(r#"{"token_type":"bearer"}"#).unwrap();
        assert!(parsed.access_token.is_none());

        let parsed: TokenResponse =
            serde_json::from_str(r#"{"access_token":"tok","expires_in":3600}"#).unwrap();
        assert_eq!(parsed.access_token.as_deref(), Some("tok"));
    }
}
