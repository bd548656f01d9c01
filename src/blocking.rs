//! Synchronous wrapper around [`crate::client::PlanClient`].
//!
//! Each call blocks the current thread until the request, including retries
//! and backoff sleeps, has finished. Do not use from inside an async runtime.

use anyhow::{Context, Result};
use reqwest::Method;
use std::collections::HashMap;
use tokio::runtime::Runtime;

use crate::auth::Credentials;
use crate::config::ClientConfig;
use crate::error::ApiError;

/// Blocking Toggl Plan API client
pub struct PlanClient {
    inner: crate::client::PlanClient,
    runtime: Runtime,
}

impl PlanClient {
    pub fn new(
        username: &str,
        password: &str,
        client_id: &str,
        client_secret: &str,
        bearer_token: &str,
    ) -> Result<Self> {
        let credentials = Credentials::new(username, password, client_id, client_secret);
        Self::with_config(
            credentials,
            Some(bearer_token.to_string()),
            ClientConfig::default(),
        )
    }

    pub fn with_config(
        credentials: Credentials,
        bearer_token: Option<String>,
        config: ClientConfig,
    ) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .context("Failed to create runtime for blocking client")?;

        let inner = crate::client::PlanClient::with_config(credentials, bearer_token, config)?;

        Ok(Self { inner, runtime })
    }

    pub fn request(
        &mut self,
        url: &str,
        method: Method,
        body: &[u8],
        headers: &HashMap<String, String>,
    ) -> Result<String, ApiError> {
        self.runtime
            .block_on(self.inner.request(url, method, body, headers))
    }

    pub fn token(&self) -> Option<&str> {
        self.inner.token()
    }

    pub fn set_token(&mut self, token: impl Into<String>) {
        self.inner.set_token(token);
    }

    pub fn clear_token(&mut self) {
        self.inner.clear_token();
    }
}
