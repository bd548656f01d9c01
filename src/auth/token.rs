// Password-grant token acquisition

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};

use super::types::{AuthDetails, Credentials, TokenResponse};
use crate::error::ApiError;
use crate::http_client::PlanHttpClient;

/// Exchange username/password for an access token.
///
/// Sends `grant_type=password` form-encoded with HTTP Basic client
/// authentication, through the same retrying executor as API calls.
/// A response without a non-empty `access_token` is an error, never an
/// empty token.
pub async fn fetch_token(
    http: &PlanHttpClient,
    token_url: &str,
    creds: &Credentials,
) -> Result<String, ApiError> {
    tracing::info!("Requesting Toggl Plan access token...");

    let auth = AuthDetails::basic(&creds.client_id, &creds.client_secret);
    let form = [
        ("grant_type", "password"),
        ("username", creds.username.as_str()),
        ("password", creds.password.as_str()),
    ];

    let request = http
        .client()
        .post(token_url)
        .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
        .header(AUTHORIZATION, auth.header_value())
        .form(&form)
        .build()
        .map_err(|e| ApiError::invalid_request(&e))?;

    let body = http.execute(request).await.map_err(|e| {
        tracing::error!("Token request failed: {}", e);
        ApiError::AuthError(format!("Couldn't request for a new bearer token: {}", e))
    })?;

    let data: TokenResponse = serde_json::from_str(&body).map_err(|e| {
        ApiError::AuthError(format!(
            "Couldn't parse authentication attempt response: {}",
            e
        ))
    })?;

    match data.access_token {
        Some(token) if !token.is_empty() => {
            tracing::info!("Access token acquired");
            Ok(token)
        }
        _ => Err(ApiError::AuthError(
            "access_token not found in response".to_string(),
        )),
    }
}
