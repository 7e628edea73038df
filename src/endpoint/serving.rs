//! Serving endpoint client
//!
//! Speaks the OpenAI-style `responses` API: POST `{base_url}/responses` with
//! the endpoint name as `model` and the conversation turns as `input`.

use super::{EndpointError, ReplyFetcher, ServingConfig, TokenSource};
use crate::reply::RawModelReply;
use crate::session::ConversationTurn;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(300);
/// Refresh OAuth tokens this long before they expire.
const TOKEN_EXPIRY_MARGIN: Duration = Duration::from_secs(60);

/// Production `ReplyFetcher` backed by a hosted serving endpoint.
pub struct ServingClient {
    client: Client,
    base_url: String,
    endpoint: String,
    token_source: Option<TokenSource>,
    cached_token: Mutex<Option<CachedToken>>,
}

struct CachedToken {
    token: String,
    expires_at: Instant,
}

impl ServingClient {
    pub fn new(config: &ServingConfig) -> Result<Self, EndpointError> {
        let base_url = config
            .base_url
            .clone()
            .ok_or_else(|| EndpointError::unknown("SERVING_BASE_URL is not set"))?;
        let endpoint = config
            .endpoint
            .clone()
            .ok_or_else(|| EndpointError::unknown("SERVING_ENDPOINT is not set"))?;

        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| EndpointError::unknown(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            endpoint,
            token_source: config.token_source(),
            cached_token: Mutex::new(None),
        })
    }

    /// Resolve the bearer token for one request. A forwarded token wins over
    /// the configured source; OAuth tokens are cached until near expiry.
    async fn bearer(&self, auth_override: Option<&str>) -> Result<String, EndpointError> {
        if let Some(token) = auth_override {
            return Ok(token.to_string());
        }

        match &self.token_source {
            Some(TokenSource::Static { token }) => Ok(token.clone()),
            Some(TokenSource::OAuthClientCredentials {
                client_id,
                client_secret,
                token_url,
            }) => {
                let mut cached = self.cached_token.lock().await;
                if let Some(entry) = cached.as_ref() {
                    if entry.expires_at > Instant::now() {
                        return Ok(entry.token.clone());
                    }
                }

                let (token, expires_in) = self
                    .exchange_client_credentials(client_id, client_secret, token_url)
                    .await?;
                let expires_at = Instant::now() + expires_in.saturating_sub(TOKEN_EXPIRY_MARGIN);
                *cached = Some(CachedToken {
                    token: token.clone(),
                    expires_at,
                });
                Ok(token)
            }
            None => Err(EndpointError::auth(
                "No serving token configured and no access token forwarded with the request",
            )),
        }
    }

    async fn exchange_client_credentials(
        &self,
        client_id: &str,
        client_secret: &str,
        token_url: &str,
    ) -> Result<(String, Duration), EndpointError> {
        tracing::debug!(token_url = %token_url, "Exchanging client credentials for a token");

        let response = self
            .client
            .post(token_url)
            .basic_auth(client_id, Some(client_secret))
            .form(&[("grant_type", "client_credentials"), ("scope", "all-apis")])
            .send()
            .await
            .map_err(|e| EndpointError::network(format!("Token exchange failed: {e}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| EndpointError::network(format!("Failed to read token response: {e}")))?;

        if !status.is_success() {
            return Err(EndpointError::from_status(
                status.as_u16(),
                format!("Token exchange failed: HTTP {status}: {body}"),
            ));
        }

        let token: TokenResponse = serde_json::from_str(&body).map_err(|e| {
            EndpointError::unknown(format!("Failed to parse token response: {e}"))
        })?;

        Ok((
            token.access_token,
            Duration::from_secs(token.expires_in.unwrap_or(3600)),
        ))
    }
}

#[async_trait]
impl ReplyFetcher for ServingClient {
    async fn fetch_reply(
        &self,
        turns: &[ConversationTurn],
        auth_override: Option<&str>,
    ) -> Result<RawModelReply, EndpointError> {
        let bearer = self.bearer(auth_override).await?;

        let request = ServingRequest {
            model: &self.endpoint,
            input: turns,
        };

        let url = format!("{}/responses", self.base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(bearer)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    EndpointError::network(format!("Request timeout: {e}"))
                } else if e.is_connect() {
                    EndpointError::network(format!("Connection failed: {e}"))
                } else {
                    EndpointError::unknown(format!("Request failed: {e}"))
                }
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| EndpointError::network(format!("Failed to read response: {e}")))?;

        if !status.is_success() {
            let message = extract_error_message(&body).unwrap_or_else(|| body.clone());
            return Err(EndpointError::from_status(
                status.as_u16(),
                format!("HTTP {status}: {message}"),
            ));
        }

        serde_json::from_str(&body).map_err(|e| {
            EndpointError::unknown(format!("Failed to parse reply: {e} - body: {body}"))
        })
    }
}

#[derive(Debug, Serialize)]
struct ServingRequest<'a> {
    model: &'a str,
    input: &'a [ConversationTurn],
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

/// Pull a human-readable message out of an error body. Serving platforms
/// disagree on the shape: some nest it under `error`, some put `message` at
/// the top level.
fn extract_error_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    value
        .pointer("/error/message")
        .or_else(|| value.get("message"))
        .or_else(|| value.get("error"))
        .and_then(|v| v.as_str())
        .map(ToString::to_string)
}
