use anyhow::Result;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Method, Url};
use std::collections::HashMap;

use crate::auth::{fetch_token, AuthDetails, Credentials};
use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::http_client::PlanHttpClient;

/// Stateful Toggl Plan API client.
///
/// Holds the credentials and the cached bearer token. The token is fetched
/// on first use and then reused until [`PlanClient::clear_token`] is called;
/// a 401 does not clear it unless `refresh_on_unauthorized` is enabled.
/// Requests take `&mut self`, so one client serves one caller at a time.
pub struct PlanClient {
    credentials: Credentials,

    /// Cached bearer token, `None` until fetched or supplied
    bearer_token: Option<String>,

    token_url: String,

    refresh_on_unauthorized: bool,

    http: PlanHttpClient,
}

impl PlanClient {
    /// Create a client with the default configuration.
    /// An empty `bearer_token` forces a token fetch on the first request.
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
        let http = PlanHttpClient::new(&config)?;

        Ok(Self {
            credentials,
            bearer_token: bearer_token.filter(|t| !t.is_empty()),
            token_url: config.token_url,
            refresh_on_unauthorized: config.refresh_on_unauthorized,
            http,
        })
    }

    /// Send an authenticated request and return the response body as text.
    ///
    /// `headers` are applied over a default `Content-Type: application/json`;
    /// the `Authorization` header is always the bearer token.
    pub async fn request(
        &mut self,
        url: &str,
        method: Method,
        body: &[u8],
        headers: &HashMap<String, String>,
    ) -> Result<String, ApiError> {
        let url = Url::parse(url).map_err(|e| {
            ApiError::InvalidRequest(format!("Invalid URL {:?}: {}", url, e))
        })?;
        let headers = merge_headers(headers)?;
        let had_cached_token = self.bearer_token.is_some();
        let token = self.ensure_token().await?;

        let result = self
            .send(url.clone(), method.clone(), body, &headers, &token)
            .await;
        match result {
            Err(ApiError::Unauthorized) if self.refresh_on_unauthorized && had_cached_token => {
                tracing::warn!("Received 401 with cached token, refreshing token and retrying...");
                self.bearer_token = None;
                let token = self.ensure_token().await?;
                self.send(url, method, body, &headers, &token).await
            }
            result => result,
        }
    }

    /// Current bearer token, if one has been fetched or supplied
    pub fn token(&self) -> Option<&str> {
        self.bearer_token.as_deref()
    }

    /// Replace the cached token; an empty string clears it
    pub fn set_token(&mut self, token: impl Into<String>) {
        let token = token.into();
        self.bearer_token = if token.is_empty() { None } else { Some(token) };
    }

    /// Drop the cached token so the next request fetches a new one
    pub fn clear_token(&mut self) {
        self.bearer_token = None;
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Return the cached token, fetching and caching one if absent
    async fn ensure_token(&mut self) -> Result<String, ApiError> {
        if let Some(ref token) = self.bearer_token {
            return Ok(token.clone());
        }

        let token = fetch_token(&self.http, &self.token_url, &self.credentials).await?;
        self.bearer_token = Some(token.clone());
        Ok(token)
    }

    async fn send(
        &self,
        url: Url,
        method: Method,
        body: &[u8],
        headers: &HeaderMap,
        token: &str,
    ) -> Result<String, ApiError> {
        let auth = AuthDetails::bearer(token);
        let mut auth_value = HeaderValue::from_str(&auth.header_value())
            .map_err(|e| ApiError::InvalidRequest(format!("Invalid bearer token: {}", e)))?;
        auth_value.set_sensitive(true);

        let mut headers = headers.clone();
        headers.insert(AUTHORIZATION, auth_value);

        let mut builder = self.http.client().request(method, url).headers(headers);
        if !body.is_empty() {
            builder = builder.body(body.to_vec());
        }

        let request = builder
            .build()
            .map_err(|e| ApiError::invalid_request(&e))?;

        self.http.execute(request).await
    }
}

/// Merge caller headers over the defaults; caller values win.
/// Header names compare case-insensitively.
pub fn merge_headers(extra: &HashMap<String, String>) -> Result<HeaderMap, ApiError> {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

    for (name, value) in extra {
        let header_name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
            ApiError::InvalidRequest(format!("Invalid header name {:?}: {}", name, e))
        })?;
        let header_value = HeaderValue::from_str(value).map_err(|e| {
            ApiError::InvalidRequest(format!("Invalid value for header {}: {}", name, e))
        })?;
        headers.insert(header_name, header_value);
    }

    Ok(headers)
}
