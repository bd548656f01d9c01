use anyhow::{Context, Result};
use clap::Parser;
use reqwest::Method;
use std::collections::HashMap;
use std::time::Duration;

use crate::auth::Credentials;

/// OAuth2 password-grant endpoint of the Toggl Plan API
pub const DEFAULT_TOKEN_URL: &str = "https://api.plan.toggl.com/api/v5/authenticate/token";

/// Retry limits for one logical request
#[derive(Clone, Debug, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, the first one included
    pub max_attempts: u32,

    /// Lower bound for the delay between attempts
    pub wait_min: Duration,

    /// Upper bound for the delay between attempts
    pub wait_max: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            wait_min: Duration::from_secs(1),
            wait_max: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `retry` (0-based): `wait_min * 2^retry`,
    /// clamped to `[wait_min, wait_max]`
    pub fn backoff_delay(&self, retry: u32) -> Duration {
        let factor = 2_u32.checked_pow(retry).unwrap_or(u32::MAX);
        let delay = self.wait_min.checked_mul(factor).unwrap_or(self.wait_max);
        delay.max(self.wait_min).min(self.wait_max)
    }

    /// Clamp a server-suggested delay (Retry-After) to the policy bounds
    pub fn clamp(&self, delay: Duration) -> Duration {
        delay.max(self.wait_min).min(self.wait_max)
    }
}

/// Library-side client configuration
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// Token endpoint used for the password grant
    pub token_url: String,

    /// Retry policy shared by token and API requests
    pub retry: RetryPolicy,

    /// TCP connect timeout
    pub connect_timeout: Duration,

    /// Timeout for a single attempt
    pub request_timeout: Duration,

    /// Drop the cached token and re-authenticate once when the API answers 401
    pub refresh_on_unauthorized: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            token_url: DEFAULT_TOKEN_URL.to_string(),
            retry: RetryPolicy::default(),
            connect_timeout: Duration::from_secs(30),
            request_timeout: Duration::from_secs(60),
            refresh_on_unauthorized: false,
        }
    }
}

impl ClientConfig {
    pub fn with_token_url(mut self, token_url: impl Into<String>) -> Self {
        self.token_url = token_url.into();
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_timeouts(mut self, connect_timeout: Duration, request_timeout: Duration) -> Self {
        self.connect_timeout = connect_timeout;
        self.request_timeout = request_timeout;
        self
    }

    pub fn with_refresh_on_unauthorized(mut self, enabled: bool) -> Self {
        self.refresh_on_unauthorized = enabled;
        self
    }
}

/// Toggl Plan API client - send one authenticated request
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// Request URL
    pub url: String,

    /// HTTP method
    #[arg(short = 'X', long, default_value = "GET")]
    pub method: String,

    /// Request body
    #[arg(short = 'd', long)]
    pub data: Option<String>,

    /// Extra request header, "Name: value" (repeatable)
    #[arg(short = 'H', long = "header")]
    pub headers: Vec<String>,

    /// Toggl Plan username
    #[arg(short = 'u', long, env = "TOGGL_PLAN_USERNAME")]
    pub username: String,

    /// Toggl Plan password
    #[arg(short = 'p', long, env = "TOGGL_PLAN_PASSWORD", hide_env_values = true)]
    pub password: String,

    /// Application client id
    #[arg(long, env = "TOGGL_PLAN_CLIENT_ID")]
    pub client_id: String,

    /// Application client secret
    #[arg(long, env = "TOGGL_PLAN_CLIENT_SECRET", hide_env_values = true)]
    pub client_secret: String,

    /// Previously obtained bearer token; skips the token request
    #[arg(short = 't', long, env = "TOGGL_PLAN_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Token endpoint
    #[arg(long, env = "TOGGL_PLAN_TOKEN_URL", default_value = DEFAULT_TOKEN_URL)]
    pub token_url: String,

    /// Total attempts per request
    #[arg(long, env = "HTTP_MAX_ATTEMPTS", default_value = "5")]
    pub max_attempts: u32,

    /// Re-authenticate once when the API answers 401
    #[arg(long)]
    pub refresh_on_unauthorized: bool,

    /// Print the bearer token to stderr after the request
    #[arg(long)]
    pub print_token: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "warn")]
    pub log_level: String,
}

impl CliArgs {
    /// Load arguments with priority: CLI > ENV (including .env) > defaults
    pub fn load() -> Self {
        // Load .env file if it exists
        dotenvy::dotenv().ok();

        CliArgs::parse()
    }

    pub fn credentials(&self) -> Credentials {
        Credentials::new(
            &self.username,
            &self.password,
            &self.client_id,
            &self.client_secret,
        )
    }

    pub fn client_config(&self) -> ClientConfig {
        ClientConfig::default()
            .with_token_url(self.token_url.clone())
            .with_retry(RetryPolicy {
                max_attempts: self.max_attempts,
                ..RetryPolicy::default()
            })
            .with_refresh_on_unauthorized(self.refresh_on_unauthorized)
    }

    pub fn method(&self) -> Result<Method> {
        Method::from_bytes(self.method.to_uppercase().as_bytes())
            .with_context(|| format!("Invalid HTTP method: {}", self.method))
    }

    pub fn header_map(&self) -> Result<HashMap<String, String>> {
        self.headers.iter().map(|h| parse_header(h)).collect()
    }
}

/// Parse a "Name: value" header argument
fn parse_header(raw: &str) -> Result<(String, String)> {
    let (name, value) = raw
        .split_once(':')
        .with_context(|| format!("Header must look like \"Name: value\": {}", raw))?;

    let name = name.trim();
    if name.is_empty() {
        anyhow::bail!("Header name is empty: {}", raw);
    }

    Ok((name.to_string(), value.trim().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_retry_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 5);
        assert_eq!(policy.wait_min, Duration::from_secs(1));
        assert_eq!(policy.wait_max, Duration::from_secs(30));
    }

    #[test]
    fn test_backoff_sequence() {
        let policy = RetryPolicy::default();
        let delays: Vec<u64> = (0..7).map(|n| policy.backoff_delay(n).as_secs()).collect();
        assert_eq!(delays, vec![1, 2, 4, 8, 16, 30, 30]);
    }

    #[test]
    fn test_backoff_does_not_overflow() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff_delay(40), Duration::from_secs(30));
        assert_eq!(policy.backoff_delay(u32::MAX), Duration::from_secs(30));
    }

    #[test]
    fn test_clamp_retry_after() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.clamp(Duration::from_secs(120)), Duration::from_secs(30));
        assert_eq!(policy.clamp(Duration::ZERO), Duration::from_secs(1));
        assert_eq!(policy.clamp(Duration::from_secs(7)), Duration::from_secs(7));
    }

    #[test]
    fn test_default_client_config() {
        let config = ClientConfig::default();
        assert_eq!(config.token_url, DEFAULT_TOKEN_URL);
        assert!(!config.refresh_on_unauthorized);
        assert_eq!(config.retry, RetryPolicy::default());
    }

    #[test]
    fn test_client_config_builders() {
        let config = ClientConfig::default()
            .with_token_url("http://localhost/token")
            .with_refresh_on_unauthorized(true)
            .with_timeouts(Duration::from_secs(1), Duration::from_secs(2));

        assert_eq!(config.token_url, "http://localhost/token");
        assert!(config.refresh_on_unauthorized);
        assert_eq!(config.connect_timeout, Duration::from_secs(1));
        assert_eq!(config.request_timeout, Duration::from_secs(2));
    }

    #[test]
    fn test_parse_header() {
        let (name, value) = parse_header("X-Workspace: 42").unwrap();
        assert_eq!(name, "X-Workspace");
        assert_eq!(value, "42");

        // Only the first colon separates name and value
        let (name, value) = parse_header("X-Time:12:30").unwrap();
        assert_eq!(name, "X-Time");
        assert_eq!(value, "12:30");
    }

    #[test]
    fn test_parse_header_invalid() {
        assert!(parse_header("no-colon").is_err());
        assert!(parse_header(": value").is_err());
    }

    #[test]
    fn test_cli_args_parsing() {
        let args = CliArgs::try_parse_from([
            "togglplan",
            "https://api.plan.toggl.com/api/v5/me",
            "-X",
            "post",
            "-H",
            "Accept: text/plain",
            "-u",
            "user@example.com",
            "-p",
            "secret",
            "--client-id",
            "app",
            "--client-secret",
            "shh",
            "--max-attempts",
            "3",
        ])
        .unwrap();

        assert_eq!(args.method().unwrap(), Method::POST);
        assert_eq!(
            args.header_map().unwrap().get("Accept").map(String::as_str),
            Some("text/plain")
        );

        let config = args.client_config();
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.retry.wait_max, Duration::from_secs(30));
    }
}
